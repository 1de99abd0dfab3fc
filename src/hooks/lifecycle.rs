//! `vkCreateInstance`/`vkDestroyInstance`/`vkCreateDevice`/`vkDestroyDevice`
//! (component L), grounded on `original_source/vulkan_layer/src/layer.cpp`'s
//! `CheekyLayer_CreateInstance`/`instance::CreateDevice`: pNext chain walk
//! for the loader's link info, forwarded create call, dispatch-table
//! bootstrap, dispatch-key registration, lifecycle selector fire.

use std::sync::Arc;

use ash::vk;

use crate::device::Device;
use crate::instance::{app_and_engine_name, Instance};
use crate::layer_abi::{find_device_link_info, find_instance_link_info};
use crate::rules::{AdditionalInfo, SelectorType};
use crate::Error;

/// # Safety
/// Called only from the loader's `vkCreateInstance` entry point, with a
/// well-formed pNext chain containing a `VK_LAYER_LINK_INFO` node.
pub unsafe fn create_instance(
    create_info: &vk::InstanceCreateInfo,
    allocator: Option<&vk::AllocationCallbacks>,
) -> Result<vk::Instance, Error> {
    let link = find_instance_link_info(create_info).ok_or(Error::NoLayerLinkInfo)?;
    let link = &mut *link;
    let get_instance_proc_addr = link.pfn_next_get_instance_proc_addr;
    // Advance the chain so the next layer down sees its own link info.
    link.p_next = (*link.p_next).p_next.cast();

    let static_fn = vk::StaticFn { get_instance_proc_addr };
    let entry = ash::Entry::from_static_fn(static_fn);
    let name = std::ffi::CString::new("vkCreateInstance").expect("no interior nul");
    let resolved = get_instance_proc_addr(vk::Instance::null(), name.as_ptr())
        .ok_or(Error::MissingDispatchEntry("vkCreateInstance"))?;
    let create_instance_fn: vk::PFN_vkCreateInstance = std::mem::transmute(resolved);

    let mut instance_handle = vk::Instance::null();
    let result = (create_instance_fn)(create_info, allocator.map_or(std::ptr::null(), |a| a), &mut instance_handle);
    if result != vk::Result::SUCCESS {
        return Err(Error::VkError(result));
    }

    let (app_name, engine_name) = app_and_engine_name(create_info);
    let instance = Instance::bootstrap(&entry, instance_handle, &app_name, &engine_name, get_instance_proc_addr)?;
    crate::registry::register_instance(crate::dispatch::instance_key(instance_handle), instance);
    Ok(instance_handle)
}

pub fn destroy_instance(instance: &Arc<Instance>) {
    let key = crate::dispatch::instance_key(instance.handle);
    {
        let mut globals = instance.globals.lock().expect("rule globals lock poisoned");
        let mut ctx = super::new_context(instance, None, &mut globals, 0, AdditionalInfo::None);
        crate::rules::execute_rules(&instance.rules, SelectorType::DeviceDestroy, 0, &mut ctx);
    }
    unsafe { instance.ash_instance.destroy_instance(None) };
    crate::registry::unregister_instance(key);
}

/// # Safety
/// Called only from the loader's `vkCreateDevice` entry point, with a
/// well-formed pNext chain containing a `VK_LAYER_LINK_INFO` node.
pub unsafe fn create_device(
    instance: &Arc<Instance>,
    physical_device: vk::PhysicalDevice,
    create_info: &vk::DeviceCreateInfo,
    allocator: Option<&vk::AllocationCallbacks>,
) -> Result<vk::Device, Error> {
    let link = find_device_link_info(create_info).ok_or(Error::NoLayerLinkInfo)?;
    let link = &mut *link;
    let get_instance_proc_addr = link.pfn_next_get_instance_proc_addr;
    let get_device_proc_addr = link.pfn_next_get_device_proc_addr;
    link.p_next = (*link.p_next).p_next.cast();

    let name = std::ffi::CString::new("vkCreateDevice").expect("no interior nul");
    let resolved = get_instance_proc_addr(instance.handle, name.as_ptr())
        .ok_or(Error::MissingDispatchEntry("vkCreateDevice"))?;
    let create_device_fn: vk::PFN_vkCreateDevice = std::mem::transmute(resolved);

    let mut device_handle = vk::Device::null();
    let result = (create_device_fn)(physical_device, create_info, allocator.map_or(std::ptr::null(), |a| a), &mut device_handle);
    if result != vk::Result::SUCCESS {
        return Err(Error::VkError(result));
    }

    let device = Device::bootstrap(instance.clone(), physical_device, device_handle, get_device_proc_addr);
    crate::registry::register_device(crate::dispatch::device_key(device_handle), device.clone());

    {
        let mut globals = instance.globals.lock().expect("rule globals lock poisoned");
        let mut ctx = super::new_context(instance, Some(device), &mut globals, device_handle.as_raw(), AdditionalInfo::None);
        crate::rules::execute_rules(&instance.rules, SelectorType::DeviceCreate, device_handle.as_raw(), &mut ctx);
    }

    Ok(device_handle)
}

pub fn destroy_device(device: &Arc<Device>) {
    let key = crate::dispatch::device_key(device.handle);
    unsafe { device.ash_device.destroy_device(None) };
    crate::registry::unregister_device(key);
}

/// Plain forward — the original additionally pins off a dedicated transfer
/// queue/command pool the first time a graphics queue is fetched, for
/// asynchronous buffer uploads; this port performs uploads synchronously on
/// the caller's queue instead (see `hooks::buffers`), so that bookkeeping
/// has no counterpart here.
pub unsafe fn get_device_queue(device: &Arc<Device>, queue_family_index: u32, queue_index: u32) -> vk::Queue {
    device.ash_device.get_device_queue(queue_family_index, queue_index)
}

pub unsafe fn get_physical_device_queue_family_properties(
    instance: &Arc<Instance>,
    physical_device: vk::PhysicalDevice,
) -> Vec<vk::QueueFamilyProperties> {
    instance.ash_instance.get_physical_device_queue_family_properties(physical_device)
}

pub unsafe fn get_physical_device_queue_family_properties2(
    instance: &Arc<Instance>,
    physical_device: vk::PhysicalDevice,
    out: &mut [vk::QueueFamilyProperties2],
) {
    instance.ash_instance.get_physical_device_queue_family_properties2(physical_device, out)
}

pub const LAYER_NAME: &str = "VK_LAYER_wiretap_interceptor";
pub const LAYER_DESCRIPTION: &str = "Rule-driven Vulkan interception and asset substitution layer";
const LAYER_IMPLEMENTATION_VERSION: u32 = 1;

fn fill_c_str(dst: &mut [std::os::raw::c_char], src: &str) {
    for (d, s) in dst.iter_mut().zip(src.bytes().chain(std::iter::once(0))) {
        *d = s as std::os::raw::c_char;
    }
}

/// `vkEnumerateInstanceLayerProperties` — this layer is the only one it
/// reports, matching the original's single-entry enumeration.
pub fn enumerate_instance_layer_properties(out: Option<&mut vk::LayerProperties>) -> vk::Result {
    if let Some(props) = out {
        fill_c_str(&mut props.layer_name, LAYER_NAME);
        fill_c_str(&mut props.description, LAYER_DESCRIPTION);
        props.implementation_version = LAYER_IMPLEMENTATION_VERSION;
        props.spec_version = vk::make_api_version(0, 1, 1, 0);
    }
    vk::Result::SUCCESS
}

pub fn enumerate_device_layer_properties(out: Option<&mut vk::LayerProperties>) -> vk::Result {
    enumerate_instance_layer_properties(out)
}

/// `vkEnumerateInstanceExtensionProperties` — exposes no extensions of its
/// own; queries not naming this layer get `VK_ERROR_LAYER_NOT_PRESENT`.
pub fn enumerate_instance_extension_properties(layer_name: Option<&str>) -> Result<u32, vk::Result> {
    match layer_name {
        Some(name) if name == LAYER_NAME => Ok(0),
        _ => Err(vk::Result::ERROR_LAYER_NOT_PRESENT),
    }
}

/// `vkEnumerateDeviceExtensionProperties`, grounded on
/// `CheekyLayer_EnumerateDeviceExtensionProperties`: queries naming this
/// layer report no extensions of its own, exactly as the instance-level
/// query does; any other query (including `pLayerName == NULL`, meaning
/// "all extensions visible at this point in the chain") is forwarded down
/// to the physical device's own enumeration.
///
/// # Safety
/// `physical_device` must be a live handle obtained from `instance`, as
/// guaranteed by the Vulkan loader calling this hook.
pub unsafe fn enumerate_device_extension_properties(
    instance: &Arc<Instance>,
    physical_device: vk::PhysicalDevice,
    layer_name: Option<&str>,
) -> Result<Vec<vk::ExtensionProperties>, vk::Result> {
    if let Some(name) = layer_name {
        if name == LAYER_NAME {
            return Ok(Vec::new());
        }
    }
    instance.ash_instance.enumerate_device_extension_properties(physical_device)
}
