//! Shadow swapchain state, grounded on `CheekyLayer::device::swapchains`.

use ash::vk;

#[derive(Debug, Clone, Copy)]
pub struct SwapchainState {
    pub image_format: vk::Format,
    pub image_extent: vk::Extent2D,
    pub image_usage: vk::ImageUsageFlags,
    pub min_image_count: u32,
}

impl From<&vk::SwapchainCreateInfoKHR> for SwapchainState {
    fn from(info: &vk::SwapchainCreateInfoKHR) -> Self {
        SwapchainState {
            image_format: info.image_format,
            image_extent: info.image_extent,
            image_usage: info.image_usage,
            min_image_count: info.min_image_count,
        }
    }
}
