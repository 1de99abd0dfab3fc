//! The Vulkan loader's layer-chaining ABI (`vk_layer.h`). `ash` only covers
//! the public Vulkan API, not the loader-internal structures a layer walks
//! to find the next link in the chain, so this module hand-rolls the fixed,
//! stable subset `CreateInstance`/`CreateDevice` need — grounded on
//! `original_source/vulkan_layer/src/layer.cpp`'s `get_chain_info` and the
//! `VkLayerInstanceCreateInfo`/`VkLayerDeviceCreateInfo` layout it walks.

use ash::vk;

pub const VK_STRUCTURE_TYPE_LOADER_INSTANCE_CREATE_INFO: i32 = 47;
pub const VK_STRUCTURE_TYPE_LOADER_DEVICE_CREATE_INFO: i32 = 48;

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum LayerFunction {
    LinkInfo = 0,
    LoaderDataCallback = 1,
    LoaderLayerCreateDeviceCallback = 2,
}

#[repr(C)]
pub struct LayerInstanceLink {
    pub p_next: *mut LayerInstanceLink,
    pub pfn_next_get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
}

#[repr(C)]
pub union LayerInstanceCreateInfoUnion {
    pub p_layer_info: *mut LayerInstanceLink,
    pub pfn_set_instance_loader_data: *const std::ffi::c_void,
    pub layer_device_callback: *const std::ffi::c_void,
}

#[repr(C)]
pub struct LayerInstanceCreateInfo {
    pub s_type: i32,
    pub p_next: *const std::ffi::c_void,
    pub function: LayerFunction,
    pub u: LayerInstanceCreateInfoUnion,
}

#[repr(C)]
pub struct LayerDeviceLink {
    pub p_next: *mut LayerDeviceLink,
    pub pfn_next_get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub pfn_next_get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr,
}

#[repr(C)]
pub union LayerDeviceCreateInfoUnion {
    pub p_layer_info: *mut LayerDeviceLink,
    pub pfn_set_device_loader_data: *const std::ffi::c_void,
}

#[repr(C)]
pub struct LayerDeviceCreateInfo {
    pub s_type: i32,
    pub p_next: *const std::ffi::c_void,
    pub function: LayerFunction,
    pub u: LayerDeviceCreateInfoUnion,
}

/// Walks `pNext` from `create_info` looking for the loader's
/// `VK_STRUCTURE_TYPE_LOADER_INSTANCE_CREATE_INFO`/`LINK_INFO` node, exactly
/// as `get_chain_info(const VkInstanceCreateInfo*, VK_LAYER_LINK_INFO)` does.
///
/// # Safety
/// `create_info.p_next` must be a well-formed pNext chain, as guaranteed by
/// the Vulkan loader calling `vkCreateInstance` on this layer.
pub unsafe fn find_instance_link_info(create_info: &vk::InstanceCreateInfo) -> Option<*mut LayerInstanceLink> {
    let mut node = create_info.p_next as *const LayerInstanceCreateInfo;
    while !node.is_null() {
        let n = &*node;
        if n.s_type == VK_STRUCTURE_TYPE_LOADER_INSTANCE_CREATE_INFO && n.function == LayerFunction::LinkInfo {
            return Some(n.u.p_layer_info);
        }
        node = n.p_next as *const LayerInstanceCreateInfo;
    }
    None
}

/// Device-side counterpart of [`find_instance_link_info`].
///
/// # Safety
/// Same contract as [`find_instance_link_info`].
pub unsafe fn find_device_link_info(create_info: &vk::DeviceCreateInfo) -> Option<*mut LayerDeviceLink> {
    let mut node = create_info.p_next as *const LayerDeviceCreateInfo;
    while !node.is_null() {
        let n = &*node;
        if n.s_type == VK_STRUCTURE_TYPE_LOADER_DEVICE_CREATE_INFO && n.function == LayerFunction::LinkInfo {
            return Some(n.u.p_layer_info);
        }
        node = n.p_next as *const LayerDeviceCreateInfo;
    }
    None
}
