//! Shadow memory-mapping state, grounded on `CheekyLayer::device::memory_map_info`.
//! Tracked so `CmdCopyBuffer`/`CmdCopyBufferToImage` can read the bytes a
//! transfer will write without doing an extra device-side readback.

use ash::vk;

#[derive(Debug, Clone, Copy)]
pub struct MemoryMapInfo {
    pub pointer: *mut std::ffi::c_void,
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
}

// SAFETY: the mapped pointer is only ever dereferenced while the owning
// `VkDeviceMemory` is mapped, under the same instance-wide lock that
// serializes every other shadow-map access.
unsafe impl Send for MemoryMapInfo {}
unsafe impl Sync for MemoryMapInfo {}
