//! Dispatch-key extraction and per-instance/per-device dispatch tables
//! (component: loader plumbing). A dispatchable Vulkan handle's first
//! pointer-sized word is the loader's dispatch pointer; dereferencing it is
//! the documented way a layer recovers the key the loader uses internally.

use ash::vk;

/// A process-wide-unique key identifying one `VkInstance`/`VkDevice`, used
/// to look its [`crate::instance::Instance`]/[`crate::device::Device`] back
/// up out of [`crate::registry`] from inside a hook that only received the
/// raw handle.
pub type DispatchKey = usize;

/// Reads the dispatch key out of any dispatchable handle.
///
/// # Safety
/// `handle` must be a live dispatchable Vulkan handle (`VkInstance`,
/// `VkPhysicalDevice`, `VkDevice`, `VkQueue`, or `VkCommandBuffer`) obtained
/// from the loader — its first word must be a valid loader dispatch pointer.
pub unsafe fn dispatch_key(handle: *const std::ffi::c_void) -> DispatchKey {
    *(handle as *const *const std::ffi::c_void) as DispatchKey
}

/// Extracts the dispatch key from a `vk::Instance`.
pub fn instance_key(instance: vk::Instance) -> DispatchKey {
    unsafe { dispatch_key(instance.as_raw() as *const std::ffi::c_void) }
}

/// Extracts the dispatch key from a `vk::Device`.
pub fn device_key(device: vk::Device) -> DispatchKey {
    unsafe { dispatch_key(device.as_raw() as *const std::ffi::c_void) }
}

/// Extracts the dispatch key from a `vk::Queue`. A queue's dispatch pointer
/// is the same one the loader assigned its owning device, so this key looks
/// the device registry up exactly like [`device_key`] does.
pub fn queue_key(queue: vk::Queue) -> DispatchKey {
    unsafe { dispatch_key(queue.as_raw() as *const std::ffi::c_void) }
}

/// Extracts the dispatch key from a `vk::CommandBuffer`, same rationale as
/// [`queue_key`].
pub fn command_buffer_key(command_buffer: vk::CommandBuffer) -> DispatchKey {
    unsafe { dispatch_key(command_buffer.as_raw() as *const std::ffi::c_void) }
}

/// Extracts the dispatch key from a `vk::PhysicalDevice`. A physical device
/// enumerated from an instance carries that instance's dispatch pointer, so
/// this key looks the instance registry up exactly like [`instance_key`]
/// does.
pub fn physical_device_key(physical_device: vk::PhysicalDevice) -> DispatchKey {
    unsafe { dispatch_key(physical_device.as_raw() as *const std::ffi::c_void) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_key_reads_first_word() {
        let dispatch_ptr: *const std::ffi::c_void = 0x1234 as *const std::ffi::c_void;
        let handle = Box::new(dispatch_ptr);
        let raw = Box::into_raw(handle) as *const std::ffi::c_void;
        let key = unsafe { dispatch_key(raw) };
        assert_eq!(key, 0x1234);
        unsafe {
            drop(Box::from_raw(raw as *mut *const std::ffi::c_void));
        }
    }
}
