//! `CreateSwapchainKHR`/`QueuePresentKHR` (component H), grounded on
//! `CheekyLayer::device`'s `CreateSwapchainKHR`/`QueuePresentKHR` handlers in
//! `draw.cpp`.

use std::sync::Arc;

use ash::vk;

use crate::device::Device;
use crate::rules::{AdditionalInfo, SelectorType};
use crate::shadow::SwapchainState;

/// # Safety
/// `create_info` must describe a live swapchain creation request, as
/// guaranteed by the Vulkan loader calling into this hook.
pub unsafe fn create_swapchain(
    device: &Arc<Device>,
    create_info: &vk::SwapchainCreateInfoKHR,
    allocator: Option<&vk::AllocationCallbacks>,
) -> Result<vk::SwapchainKHR, vk::Result> {
    let swapchain = device.khr_swapchain.create_swapchain(create_info, allocator)?;
    device.swapchains.lock().expect("device lock poisoned").insert(swapchain, SwapchainState::from(create_info));

    let instance = &device.instance;
    let ptr = create_info as *const vk::SwapchainCreateInfoKHR as *mut u8;
    let mut globals = instance.globals.lock().expect("rule globals lock poisoned");
    let mut ctx = super::new_context(
        instance,
        Some(device.clone()),
        &mut globals,
        swapchain.as_raw(),
        AdditionalInfo::Swapchain { create_info_ptr: ptr },
    );
    crate::rules::execute_rules(&instance.rules, SelectorType::SwapchainCreate, swapchain.as_raw(), &mut ctx);

    Ok(swapchain)
}

/// Forwards `vkQueuePresentKHR`, firing the `present` selector with the
/// forwarded call's result so rules can inspect (but not change) it. A
/// `cancel()` action here skips forwarding entirely and reports
/// `VK_SUCCESS` without presenting, matching the original's early-return
/// semantics for a canceled present.
pub fn queue_present(device: &Arc<Device>, queue: vk::Queue, present_info: &vk::PresentInfoKHR) -> vk::Result {
    let instance = &device.instance;
    let mut globals = instance.globals.lock().expect("rule globals lock poisoned");
    let mut ctx = super::new_context(instance, Some(device.clone()), &mut globals, 0, AdditionalInfo::Present { result: vk::Result::SUCCESS });
    crate::rules::execute_rules(&instance.rules, SelectorType::Present, 0, &mut ctx);
    let canceled = ctx.canceled;
    drop(globals);

    if canceled {
        return vk::Result::SUCCESS;
    }

    match unsafe { device.khr_swapchain.queue_present(queue, present_info) } {
        Ok(_suboptimal) => vk::Result::SUCCESS,
        Err(e) => e,
    }
}

pub fn destroy_swapchain(device: &Arc<Device>, swapchain: vk::SwapchainKHR, allocator: Option<&vk::AllocationCallbacks>) {
    device.swapchains.lock().expect("device lock poisoned").remove(&swapchain);
    unsafe { device.khr_swapchain.destroy_swapchain(swapchain, allocator) };
}
