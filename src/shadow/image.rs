//! Shadow image state, grounded on `CheekyLayer::device::image`.

use ash::vk;

#[derive(Debug, Clone)]
pub struct ImageState {
    pub image: vk::Image,
    pub create_info: ImageCreateInfoSnapshot,
    pub memory: vk::DeviceMemory,
    pub memory_offset: vk::DeviceSize,
    /// The first view created against this image, if any — sufficient for
    /// `imageViewToImage` reverse lookups since rules key on the image.
    pub view: Option<vk::ImageView>,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageCreateInfoSnapshot {
    pub image_type: vk::ImageType,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub usage: vk::ImageUsageFlags,
}

impl From<&vk::ImageCreateInfo> for ImageCreateInfoSnapshot {
    fn from(info: &vk::ImageCreateInfo) -> Self {
        ImageCreateInfoSnapshot {
            image_type: info.image_type,
            format: info.format,
            extent: info.extent,
            mip_levels: info.mip_levels,
            array_layers: info.array_layers,
            usage: info.usage,
        }
    }
}
