//! Shadow buffer state, grounded on `CheekyLayer::device::buffer`.

use ash::vk;

#[derive(Debug, Clone)]
pub struct BufferState {
    pub buffer: vk::Buffer,
    pub create_info: BufferCreateInfoSnapshot,
    pub memory: vk::DeviceMemory,
    pub memory_offset: vk::DeviceSize,
}

/// An owned copy of the fields of `VkBufferCreateInfo` the rule engine and
/// content hashing actually need; avoids keeping the create info's `pNext`
/// chain alive past the `vkCreateBuffer` call.
#[derive(Debug, Clone, Copy)]
pub struct BufferCreateInfoSnapshot {
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    pub sharing_mode: vk::SharingMode,
}

impl From<&vk::BufferCreateInfo> for BufferCreateInfoSnapshot {
    fn from(info: &vk::BufferCreateInfo) -> Self {
        BufferCreateInfoSnapshot { size: info.size, usage: info.usage, sharing_mode: info.sharing_mode }
    }
}
