//! Component L: per-`VkDevice` shadow state, grounded on
//! `CheekyLayer::device`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use ash::vk;

use crate::instance::Instance;
use crate::shadow::{
    BufferState, CommandBufferState, DescriptorState, FramebufferState, ImageState, MemoryMapInfo,
    PipelineLayoutInfo, PipelineState, SwapchainState,
};

/// The first synthetic handle minted for a substituted shader module,
/// matching the original's `currentCustomShaderHandle` starting value —
/// chosen to be unmistakably outside any real pointer-derived handle range.
const FIRST_CUSTOM_SHADER_HANDLE: u64 = 0xABC1_2300_00;

pub struct Device {
    pub handle: vk::Device,
    pub ash_device: ash::Device,
    pub instance: Arc<Instance>,
    pub physical_device: vk::PhysicalDevice,

    pub khr_swapchain: ash::extensions::khr::Swapchain,
    pub ext_transform_feedback: ash::extensions::ext::TransformFeedback,
    pub ext_extended_dynamic_state: ash::extensions::ext::ExtendedDynamicState,

    /// The next layer down's `vkGetDeviceProcAddr`, captured off the
    /// loader's link-info chain at `vkCreateDevice` time.
    pub next_get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr,

    pub buffers: Mutex<HashMap<vk::Buffer, BufferState>>,
    pub images: Mutex<HashMap<vk::Image, ImageState>>,
    pub image_view_to_image: Mutex<HashMap<vk::ImageView, vk::Image>>,
    pub framebuffers: Mutex<HashMap<vk::Framebuffer, FramebufferState>>,
    pub swapchains: Mutex<HashMap<vk::SwapchainKHR, SwapchainState>>,
    pub memory_mappings: Mutex<HashMap<vk::DeviceMemory, MemoryMapInfo>>,

    pub pipeline_layouts: Mutex<HashMap<vk::PipelineLayout, PipelineLayoutInfo>>,
    pub pipeline_states: Mutex<HashMap<vk::Pipeline, PipelineState>>,

    pub update_templates: Mutex<HashMap<vk::DescriptorUpdateTemplate, Vec<vk::DescriptorUpdateTemplateEntry>>>,
    pub descriptor_states: Mutex<HashMap<vk::DescriptorSet, DescriptorState>>,

    pub command_buffer_states: Mutex<HashMap<vk::CommandBuffer, CommandBufferState>>,

    custom_shader_handles: Mutex<HashMap<u64, u64>>,
    next_custom_shader_handle: AtomicU64,
}

impl Device {
    pub fn bootstrap(
        instance: Arc<Instance>,
        physical_device: vk::PhysicalDevice,
        handle: vk::Device,
        next_get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr,
    ) -> Arc<Device> {
        let ash_device = unsafe { ash::Device::load(instance.ash_instance.fp_v1_0(), handle) };
        let khr_swapchain = ash::extensions::khr::Swapchain::new(&instance.ash_instance, &ash_device);
        let ext_transform_feedback = ash::extensions::ext::TransformFeedback::new(&instance.ash_instance, &ash_device);
        let ext_extended_dynamic_state = ash::extensions::ext::ExtendedDynamicState::new(&instance.ash_instance, &ash_device);
        Arc::new(Device {
            handle,
            ash_device,
            instance,
            physical_device,
            khr_swapchain,
            ext_transform_feedback,
            ext_extended_dynamic_state,
            next_get_device_proc_addr,
            buffers: Mutex::new(HashMap::new()),
            images: Mutex::new(HashMap::new()),
            image_view_to_image: Mutex::new(HashMap::new()),
            framebuffers: Mutex::new(HashMap::new()),
            swapchains: Mutex::new(HashMap::new()),
            memory_mappings: Mutex::new(HashMap::new()),
            pipeline_layouts: Mutex::new(HashMap::new()),
            pipeline_states: Mutex::new(HashMap::new()),
            update_templates: Mutex::new(HashMap::new()),
            descriptor_states: Mutex::new(HashMap::new()),
            command_buffer_states: Mutex::new(HashMap::new()),
            custom_shader_handles: Mutex::new(HashMap::new()),
            next_custom_shader_handle: AtomicU64::new(FIRST_CUSTOM_SHADER_HANDLE),
        })
    }

    /// Mints a fresh synthetic handle for a shader module, keyed by the real
    /// `VkShaderModule` handle so later lookups (pipeline stages referencing
    /// the real module) can recover the synthetic handle rules fired against.
    pub fn mint_custom_shader_handle(&self, real_module: u64) -> u64 {
        let synthetic = self.next_custom_shader_handle.fetch_add(1, Ordering::Relaxed);
        self.custom_shader_handles.lock().expect("device lock poisoned").insert(real_module, synthetic);
        synthetic
    }

    /// The synthetic handle minted for a real shader module handle, if any.
    pub fn custom_shader_handle_for(&self, real_module: u64) -> Option<u64> {
        self.custom_shader_handles.lock().expect("device lock poisoned").get(&real_module).copied()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.instance.logger.line(&format!("device {:#x} destroyed", self.handle.as_raw()));
    }
}
