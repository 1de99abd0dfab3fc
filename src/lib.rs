//! A Vulkan implicit layer that intercepts a fixed set of entry points
//! (instance/device lifecycle, image/buffer/shader/descriptor creation and
//! content upload, draw-time state, presentation) and runs a rule engine
//! against each one, grounded on `original_source/vulkan_layer`'s
//! `CheekyLayer_*` dispatch split: [`dispatch`]/[`registry`] recover the
//! owning [`instance::Instance`]/[`device::Device`] from a dispatchable
//! handle, [`hooks`] holds the actual interception logic, and this module
//! is nothing but the `extern "system"` ABI boundary and the
//! `GetInstanceProcAddr`/`GetDeviceProcAddr` dispatch tables that resolve a
//! queried function name to one of the `hooks` trampolines below.
//!
//! Entry points not listed in [`resolve_instance_proc`]/[`resolve_device_proc`]
//! are forwarded unchanged to the next layer down, exactly as the original's
//! `InstanceHooks()`/`DeviceHooks()` macros fall through to
//! `dispatch.GetInstanceProcAddr`/`dispatch.GetDeviceProcAddr` for anything
//! they don't list.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::Arc;

use ash::vk;

pub mod assets;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod hash;
pub mod hooks;
pub mod instance;
pub mod ipc;
pub mod layer_abi;
pub mod logger;
pub mod prelude;
pub mod reflection;
pub mod registry;
pub mod rules;
pub mod shadow;

pub use error::Error;

use device::Device;
use instance::Instance;

/// Maps an [`Error`] onto the `VkResult` a `Result`-returning entry point
/// reports it as. Vulkan errors round-trip verbatim; everything else (parse
/// failures, I/O, poisoned locks) is reported as
/// `VK_ERROR_INITIALIZATION_FAILED`, since none of those have a
/// better-fitting `VkResult` of their own.
fn error_to_vk_result(e: &Error) -> vk::Result {
    match e {
        Error::VkError(result) => *result,
        other => {
            log::error!("wiretap: {}", other);
            vk::Result::ERROR_INITIALIZATION_FAILED
        }
    }
}

unsafe fn c_str_opt(p: *const c_char) -> Option<String> {
    if p.is_null() {
        None
    } else {
        Some(CStr::from_ptr(p).to_string_lossy().into_owned())
    }
}

/// Fills the loader's two-call enumeration protocol: a null `p_items`
/// reports the count only, otherwise up to `*p_count` entries are copied in
/// and `*p_count` is rewritten to how many actually were.
unsafe fn write_enumeration<T: Copy>(items: Vec<T>, p_count: *mut u32, p_items: *mut T) {
    if p_items.is_null() {
        *p_count = items.len() as u32;
        return;
    }
    let n = (*p_count as usize).min(items.len());
    std::ptr::copy_nonoverlapping(items.as_ptr(), p_items, n);
    *p_count = n as u32;
}

fn instance_for(handle: vk::Instance) -> Option<Arc<Instance>> {
    registry::lookup_instance(dispatch::instance_key(handle))
}

fn instance_for_physical_device(physical_device: vk::PhysicalDevice) -> Option<Arc<Instance>> {
    registry::lookup_instance(dispatch::physical_device_key(physical_device))
}

fn device_for(handle: vk::Device) -> Option<Arc<Device>> {
    registry::lookup_device(dispatch::device_key(handle))
}

fn device_for_queue(queue: vk::Queue) -> Option<Arc<Device>> {
    registry::lookup_device(dispatch::queue_key(queue))
}

fn device_for_command_buffer(command_buffer: vk::CommandBuffer) -> Option<Arc<Device>> {
    registry::lookup_device(dispatch::command_buffer_key(command_buffer))
}

// ---------------------------------------------------------------------
// Instance lifecycle
// ---------------------------------------------------------------------

unsafe extern "system" fn vk_create_instance(
    p_create_info: *const vk::InstanceCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    match hooks::lifecycle::create_instance(&*p_create_info, p_allocator.as_ref()) {
        Ok(handle) => {
            *p_instance = handle;
            vk::Result::SUCCESS
        }
        Err(e) => error_to_vk_result(&e),
    }
}

unsafe extern "system" fn vk_destroy_instance(instance: vk::Instance, _p_allocator: *const vk::AllocationCallbacks) {
    if let Some(inst) = instance_for(instance) {
        hooks::lifecycle::destroy_instance(&inst);
    }
}

unsafe extern "system" fn vk_create_device(
    physical_device: vk::PhysicalDevice,
    p_create_info: *const vk::DeviceCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_device: *mut vk::Device,
) -> vk::Result {
    let Some(instance) = instance_for_physical_device(physical_device) else {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    };
    match hooks::lifecycle::create_device(&instance, physical_device, &*p_create_info, p_allocator.as_ref()) {
        Ok(handle) => {
            *p_device = handle;
            vk::Result::SUCCESS
        }
        Err(e) => error_to_vk_result(&e),
    }
}

unsafe extern "system" fn vk_destroy_device(device: vk::Device, _p_allocator: *const vk::AllocationCallbacks) {
    if let Some(dev) = device_for(device) {
        hooks::lifecycle::destroy_device(&dev);
    }
}

unsafe extern "system" fn vk_get_device_queue(device: vk::Device, queue_family_index: u32, queue_index: u32, p_queue: *mut vk::Queue) {
    let Some(dev) = device_for(device) else { return };
    *p_queue = hooks::lifecycle::get_device_queue(&dev, queue_family_index, queue_index);
}

unsafe extern "system" fn vk_get_physical_device_queue_family_properties(
    physical_device: vk::PhysicalDevice,
    p_queue_family_property_count: *mut u32,
    p_queue_family_properties: *mut vk::QueueFamilyProperties,
) {
    let Some(instance) = instance_for_physical_device(physical_device) else { return };
    let props = hooks::lifecycle::get_physical_device_queue_family_properties(&instance, physical_device);
    write_enumeration(props, p_queue_family_property_count, p_queue_family_properties);
}

unsafe extern "system" fn vk_get_physical_device_queue_family_properties2(
    physical_device: vk::PhysicalDevice,
    p_queue_family_property_count: *mut u32,
    p_queue_family_properties: *mut vk::QueueFamilyProperties2,
) {
    let Some(instance) = instance_for_physical_device(physical_device) else { return };
    if p_queue_family_properties.is_null() {
        let count = instance.ash_instance.get_physical_device_queue_family_properties(physical_device).len();
        *p_queue_family_property_count = count as u32;
        return;
    }
    let out = std::slice::from_raw_parts_mut(p_queue_family_properties, *p_queue_family_property_count as usize);
    hooks::lifecycle::get_physical_device_queue_family_properties2(&instance, physical_device, out);
}

unsafe extern "system" fn vk_enumerate_instance_layer_properties(p_property_count: *mut u32, p_properties: *mut vk::LayerProperties) -> vk::Result {
    if p_properties.is_null() {
        *p_property_count = 1;
        return vk::Result::SUCCESS;
    }
    if *p_property_count == 0 {
        return vk::Result::INCOMPLETE;
    }
    let mut props = vk::LayerProperties::default();
    let result = hooks::lifecycle::enumerate_instance_layer_properties(Some(&mut props));
    *p_properties = props;
    *p_property_count = 1;
    result
}

unsafe extern "system" fn vk_enumerate_device_layer_properties(
    _physical_device: vk::PhysicalDevice,
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    if p_properties.is_null() {
        *p_property_count = 1;
        return vk::Result::SUCCESS;
    }
    if *p_property_count == 0 {
        return vk::Result::INCOMPLETE;
    }
    let mut props = vk::LayerProperties::default();
    let result = hooks::lifecycle::enumerate_device_layer_properties(Some(&mut props));
    *p_properties = props;
    *p_property_count = 1;
    result
}

unsafe extern "system" fn vk_enumerate_instance_extension_properties(
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    _p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    match hooks::lifecycle::enumerate_instance_extension_properties(c_str_opt(p_layer_name).as_deref()) {
        Ok(count) => {
            *p_property_count = count;
            vk::Result::SUCCESS
        }
        Err(e) => e,
    }
}

unsafe extern "system" fn vk_enumerate_device_extension_properties(
    physical_device: vk::PhysicalDevice,
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    let Some(instance) = instance_for_physical_device(physical_device) else {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    };
    match hooks::lifecycle::enumerate_device_extension_properties(&instance, physical_device, c_str_opt(p_layer_name).as_deref()) {
        Ok(props) => {
            write_enumeration(props, p_property_count, p_properties);
            vk::Result::SUCCESS
        }
        Err(e) => e,
    }
}

// ---------------------------------------------------------------------
// Images / buffers / shaders / descriptors
// ---------------------------------------------------------------------

unsafe extern "system" fn vk_create_image(
    device: vk::Device,
    p_create_info: *const vk::ImageCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_image: *mut vk::Image,
) -> vk::Result {
    let Some(dev) = device_for(device) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    match hooks::images::create_image(&dev, &*p_create_info, p_allocator.as_ref()) {
        Ok(image) => {
            *p_image = image;
            vk::Result::SUCCESS
        }
        Err(e) => e,
    }
}

unsafe extern "system" fn vk_bind_image_memory(device: vk::Device, image: vk::Image, memory: vk::DeviceMemory, memory_offset: vk::DeviceSize) -> vk::Result {
    let Some(dev) = device_for(device) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    match hooks::images::bind_image_memory(&dev, image, memory, memory_offset) {
        Ok(()) => vk::Result::SUCCESS,
        Err(e) => e,
    }
}

unsafe extern "system" fn vk_create_image_view(
    device: vk::Device,
    p_create_info: *const vk::ImageViewCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_view: *mut vk::ImageView,
) -> vk::Result {
    let Some(dev) = device_for(device) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    match hooks::images::create_image_view(&dev, &*p_create_info, p_allocator.as_ref()) {
        Ok(view) => {
            *p_view = view;
            vk::Result::SUCCESS
        }
        Err(e) => e,
    }
}

unsafe extern "system" fn vk_cmd_copy_buffer_to_image(
    command_buffer: vk::CommandBuffer,
    src_buffer: vk::Buffer,
    dst_image: vk::Image,
    dst_image_layout: vk::ImageLayout,
    region_count: u32,
    p_regions: *const vk::BufferImageCopy,
) {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return };
    let regions = std::slice::from_raw_parts(p_regions, region_count as usize);
    hooks::images::cmd_copy_buffer_to_image(&dev, command_buffer, src_buffer, dst_image, dst_image_layout, regions);
}

unsafe extern "system" fn vk_create_buffer(
    device: vk::Device,
    p_create_info: *const vk::BufferCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_buffer: *mut vk::Buffer,
) -> vk::Result {
    let Some(dev) = device_for(device) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    match hooks::buffers::create_buffer(&dev, &*p_create_info, p_allocator.as_ref()) {
        Ok(buffer) => {
            *p_buffer = buffer;
            vk::Result::SUCCESS
        }
        Err(e) => e,
    }
}

unsafe extern "system" fn vk_bind_buffer_memory(device: vk::Device, buffer: vk::Buffer, memory: vk::DeviceMemory, memory_offset: vk::DeviceSize) -> vk::Result {
    let Some(dev) = device_for(device) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    match hooks::buffers::bind_buffer_memory(&dev, buffer, memory, memory_offset) {
        Ok(()) => vk::Result::SUCCESS,
        Err(e) => e,
    }
}

unsafe extern "system" fn vk_map_memory(
    device: vk::Device,
    memory: vk::DeviceMemory,
    offset: vk::DeviceSize,
    size: vk::DeviceSize,
    flags: vk::MemoryMapFlags,
    pp_data: *mut *mut std::ffi::c_void,
) -> vk::Result {
    let Some(dev) = device_for(device) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    match hooks::buffers::map_memory(&dev, memory, offset, size, flags) {
        Ok(ptr) => {
            *pp_data = ptr;
            vk::Result::SUCCESS
        }
        Err(e) => e,
    }
}

unsafe extern "system" fn vk_unmap_memory(device: vk::Device, memory: vk::DeviceMemory) {
    let Some(dev) = device_for(device) else { return };
    hooks::buffers::unmap_memory(&dev, memory);
}

unsafe extern "system" fn vk_cmd_copy_buffer(
    command_buffer: vk::CommandBuffer,
    src_buffer: vk::Buffer,
    dst_buffer: vk::Buffer,
    region_count: u32,
    p_regions: *const vk::BufferCopy,
) {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return };
    let regions = std::slice::from_raw_parts(p_regions, region_count as usize);
    hooks::buffers::cmd_copy_buffer(&dev, command_buffer, src_buffer, dst_buffer, regions);
}

unsafe extern "system" fn vk_create_shader_module(
    device: vk::Device,
    p_create_info: *const vk::ShaderModuleCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_shader_module: *mut vk::ShaderModule,
) -> vk::Result {
    let Some(dev) = device_for(device) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    match hooks::shaders::create_shader_module(&dev, &*p_create_info, p_allocator.as_ref()) {
        Ok(module) => {
            *p_shader_module = module;
            vk::Result::SUCCESS
        }
        Err(e) => e,
    }
}

unsafe extern "system" fn vk_create_descriptor_update_template(
    device: vk::Device,
    p_create_info: *const vk::DescriptorUpdateTemplateCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_template: *mut vk::DescriptorUpdateTemplate,
) -> vk::Result {
    let Some(dev) = device_for(device) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    match hooks::descriptors::create_descriptor_update_template(&dev, &*p_create_info, p_allocator.as_ref()) {
        Ok(template) => {
            *p_template = template;
            vk::Result::SUCCESS
        }
        Err(e) => e,
    }
}

unsafe extern "system" fn vk_update_descriptor_set_with_template(
    device: vk::Device,
    descriptor_set: vk::DescriptorSet,
    descriptor_update_template: vk::DescriptorUpdateTemplate,
    p_data: *const std::ffi::c_void,
) {
    let Some(dev) = device_for(device) else { return };
    hooks::descriptors::update_descriptor_set_with_template(&dev, descriptor_set, descriptor_update_template, p_data);
}

// ---------------------------------------------------------------------
// Command buffers / framebuffers / pipelines / draw / present
// ---------------------------------------------------------------------

unsafe extern "system" fn vk_allocate_command_buffers(
    device: vk::Device,
    p_allocate_info: *const vk::CommandBufferAllocateInfo,
    p_command_buffers: *mut vk::CommandBuffer,
) -> vk::Result {
    let Some(dev) = device_for(device) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    let allocate_info = &*p_allocate_info;
    match hooks::draw::allocate_command_buffers(&dev, allocate_info) {
        Ok(buffers) => {
            std::ptr::copy_nonoverlapping(buffers.as_ptr(), p_command_buffers, buffers.len());
            vk::Result::SUCCESS
        }
        Err(e) => e,
    }
}

unsafe extern "system" fn vk_free_command_buffers(
    device: vk::Device,
    command_pool: vk::CommandPool,
    command_buffer_count: u32,
    p_command_buffers: *const vk::CommandBuffer,
) {
    let Some(dev) = device_for(device) else { return };
    let buffers = std::slice::from_raw_parts(p_command_buffers, command_buffer_count as usize);
    hooks::draw::free_command_buffers(&dev, command_pool, buffers);
}

unsafe extern "system" fn vk_create_framebuffer(
    device: vk::Device,
    p_create_info: *const vk::FramebufferCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_framebuffer: *mut vk::Framebuffer,
) -> vk::Result {
    let Some(dev) = device_for(device) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    match hooks::draw::create_framebuffer(&dev, &*p_create_info, p_allocator.as_ref()) {
        Ok(framebuffer) => {
            *p_framebuffer = framebuffer;
            vk::Result::SUCCESS
        }
        Err(e) => e,
    }
}

unsafe extern "system" fn vk_create_pipeline_layout(
    device: vk::Device,
    p_create_info: *const vk::PipelineLayoutCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_pipeline_layout: *mut vk::PipelineLayout,
) -> vk::Result {
    let Some(dev) = device_for(device) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    match hooks::draw::create_pipeline_layout(&dev, &*p_create_info, p_allocator.as_ref()) {
        Ok(layout) => {
            *p_pipeline_layout = layout;
            vk::Result::SUCCESS
        }
        Err(e) => e,
    }
}

unsafe extern "system" fn vk_create_graphics_pipelines(
    device: vk::Device,
    pipeline_cache: vk::PipelineCache,
    create_info_count: u32,
    p_create_infos: *const vk::GraphicsPipelineCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_pipelines: *mut vk::Pipeline,
) -> vk::Result {
    let Some(dev) = device_for(device) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    // `create_graphics_pipelines` mutates each entry's overridable fields in
    // place before forwarding, so the ABI's `const` create-info array is
    // copied into an owned, mutable buffer first.
    let mut create_infos = std::slice::from_raw_parts(p_create_infos, create_info_count as usize).to_vec();
    match hooks::draw::create_graphics_pipelines(&dev, pipeline_cache, &mut create_infos, p_allocator.as_ref()) {
        Ok(pipelines) => {
            std::ptr::copy_nonoverlapping(pipelines.as_ptr(), p_pipelines, pipelines.len());
            vk::Result::SUCCESS
        }
        Err(e) => e,
    }
}

unsafe extern "system" fn vk_cmd_bind_descriptor_sets(
    command_buffer: vk::CommandBuffer,
    pipeline_bind_point: vk::PipelineBindPoint,
    layout: vk::PipelineLayout,
    first_set: u32,
    descriptor_set_count: u32,
    p_descriptor_sets: *const vk::DescriptorSet,
    dynamic_offset_count: u32,
    p_dynamic_offsets: *const u32,
) {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return };
    let descriptor_sets = std::slice::from_raw_parts(p_descriptor_sets, descriptor_set_count as usize);
    let dynamic_offsets = std::slice::from_raw_parts(p_dynamic_offsets, dynamic_offset_count as usize);
    hooks::draw::cmd_bind_descriptor_sets(&dev, command_buffer, pipeline_bind_point, layout, first_set, descriptor_sets, dynamic_offsets);
}

unsafe extern "system" fn vk_cmd_bind_pipeline(command_buffer: vk::CommandBuffer, pipeline_bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return };
    hooks::draw::cmd_bind_pipeline(&dev, command_buffer, pipeline_bind_point, pipeline);
}

unsafe extern "system" fn vk_cmd_bind_vertex_buffers(
    command_buffer: vk::CommandBuffer,
    first_binding: u32,
    binding_count: u32,
    p_buffers: *const vk::Buffer,
    p_offsets: *const vk::DeviceSize,
) {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return };
    let buffers = std::slice::from_raw_parts(p_buffers, binding_count as usize);
    let offsets = std::slice::from_raw_parts(p_offsets, binding_count as usize);
    hooks::draw::cmd_bind_vertex_buffers(&dev, command_buffer, first_binding, buffers, offsets);
}

unsafe extern "system" fn vk_cmd_bind_vertex_buffers2_ext(
    command_buffer: vk::CommandBuffer,
    first_binding: u32,
    binding_count: u32,
    p_buffers: *const vk::Buffer,
    p_offsets: *const vk::DeviceSize,
    p_sizes: *const vk::DeviceSize,
    p_strides: *const vk::DeviceSize,
) {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return };
    let buffers = std::slice::from_raw_parts(p_buffers, binding_count as usize);
    let offsets = std::slice::from_raw_parts(p_offsets, binding_count as usize);
    let sizes = (!p_sizes.is_null()).then(|| std::slice::from_raw_parts(p_sizes, binding_count as usize));
    let strides = (!p_strides.is_null()).then(|| std::slice::from_raw_parts(p_strides, binding_count as usize));
    hooks::draw::cmd_bind_vertex_buffers2_ext(&dev, command_buffer, first_binding, buffers, offsets, sizes, strides);
}

unsafe extern "system" fn vk_cmd_bind_index_buffer(command_buffer: vk::CommandBuffer, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return };
    hooks::draw::cmd_bind_index_buffer(&dev, command_buffer, buffer, offset, index_type);
}

unsafe extern "system" fn vk_cmd_set_scissor(command_buffer: vk::CommandBuffer, first_scissor: u32, scissor_count: u32, p_scissors: *const vk::Rect2D) {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return };
    let scissors = std::slice::from_raw_parts(p_scissors, scissor_count as usize);
    hooks::draw::cmd_set_scissor(&dev, command_buffer, first_scissor, scissors);
}

unsafe extern "system" fn vk_cmd_begin_render_pass(
    command_buffer: vk::CommandBuffer,
    p_render_pass_begin: *const vk::RenderPassBeginInfo,
    contents: vk::SubpassContents,
) {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return };
    hooks::draw::cmd_begin_render_pass(&dev, command_buffer, &*p_render_pass_begin, contents);
}

unsafe extern "system" fn vk_cmd_end_render_pass(command_buffer: vk::CommandBuffer) {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return };
    hooks::draw::cmd_end_render_pass(&dev, command_buffer);
}

unsafe extern "system" fn vk_cmd_draw(
    command_buffer: vk::CommandBuffer,
    vertex_count: u32,
    instance_count: u32,
    first_vertex: u32,
    first_instance: u32,
) {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return };
    hooks::draw::cmd_draw(&dev, command_buffer, vertex_count, instance_count, first_vertex, first_instance);
}

unsafe extern "system" fn vk_cmd_draw_indexed(
    command_buffer: vk::CommandBuffer,
    index_count: u32,
    instance_count: u32,
    first_index: u32,
    vertex_offset: i32,
    first_instance: u32,
) {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return };
    hooks::draw::cmd_draw_indexed(&dev, command_buffer, index_count, instance_count, first_index, vertex_offset, first_instance);
}

unsafe extern "system" fn vk_cmd_begin_transform_feedback_ext(
    command_buffer: vk::CommandBuffer,
    first_counter_buffer: u32,
    counter_buffer_count: u32,
    p_counter_buffers: *const vk::Buffer,
    p_counter_buffer_offsets: *const vk::DeviceSize,
) {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return };
    let counter_buffers = std::slice::from_raw_parts(p_counter_buffers, counter_buffer_count as usize);
    let counter_buffer_offsets = std::slice::from_raw_parts(p_counter_buffer_offsets, counter_buffer_count as usize);
    hooks::draw::cmd_begin_transform_feedback_ext(&dev, command_buffer, first_counter_buffer, counter_buffers, counter_buffer_offsets);
}

unsafe extern "system" fn vk_cmd_bind_transform_feedback_buffers_ext(
    command_buffer: vk::CommandBuffer,
    first_binding: u32,
    binding_count: u32,
    p_buffers: *const vk::Buffer,
    p_offsets: *const vk::DeviceSize,
    p_sizes: *const vk::DeviceSize,
) {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return };
    let buffers = std::slice::from_raw_parts(p_buffers, binding_count as usize);
    let offsets = std::slice::from_raw_parts(p_offsets, binding_count as usize);
    let sizes = std::slice::from_raw_parts(p_sizes, binding_count as usize);
    hooks::draw::cmd_bind_transform_feedback_buffers_ext(&dev, command_buffer, first_binding, buffers, offsets, sizes);
}

unsafe extern "system" fn vk_cmd_end_transform_feedback_ext(
    command_buffer: vk::CommandBuffer,
    first_counter_buffer: u32,
    counter_buffer_count: u32,
    p_counter_buffers: *const vk::Buffer,
    p_counter_buffer_offsets: *const vk::DeviceSize,
) {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return };
    let counter_buffers = std::slice::from_raw_parts(p_counter_buffers, counter_buffer_count as usize);
    let counter_buffer_offsets = std::slice::from_raw_parts(p_counter_buffer_offsets, counter_buffer_count as usize);
    hooks::draw::cmd_end_transform_feedback_ext(&dev, command_buffer, first_counter_buffer, counter_buffers, counter_buffer_offsets);
}

unsafe extern "system" fn vk_end_command_buffer(command_buffer: vk::CommandBuffer) -> vk::Result {
    let Some(dev) = device_for_command_buffer(command_buffer) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    hooks::draw::end_command_buffer(&dev, command_buffer)
}

unsafe extern "system" fn vk_queue_submit(queue: vk::Queue, submit_count: u32, p_submits: *const vk::SubmitInfo, fence: vk::Fence) -> vk::Result {
    let Some(dev) = device_for_queue(queue) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    let submits = std::slice::from_raw_parts(p_submits, submit_count as usize);
    hooks::draw::queue_submit(&dev, queue, submits, fence)
}

unsafe extern "system" fn vk_queue_present_khr(queue: vk::Queue, p_present_info: *const vk::PresentInfoKHR) -> vk::Result {
    let Some(dev) = device_for_queue(queue) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    hooks::present::queue_present(&dev, queue, &*p_present_info)
}

unsafe extern "system" fn vk_create_swapchain_khr(
    device: vk::Device,
    p_create_info: *const vk::SwapchainCreateInfoKHR,
    p_allocator: *const vk::AllocationCallbacks,
    p_swapchain: *mut vk::SwapchainKHR,
) -> vk::Result {
    let Some(dev) = device_for(device) else { return vk::Result::ERROR_INITIALIZATION_FAILED };
    match hooks::present::create_swapchain(&dev, &*p_create_info, p_allocator.as_ref()) {
        Ok(swapchain) => {
            *p_swapchain = swapchain;
            vk::Result::SUCCESS
        }
        Err(e) => e,
    }
}

unsafe extern "system" fn vk_destroy_swapchain_khr(device: vk::Device, swapchain: vk::SwapchainKHR, p_allocator: *const vk::AllocationCallbacks) {
    let Some(dev) = device_for(device) else { return };
    hooks::present::destroy_swapchain(&dev, swapchain, p_allocator.as_ref());
}

// ---------------------------------------------------------------------
// GetInstanceProcAddr / GetDeviceProcAddr
// ---------------------------------------------------------------------

/// Resolves a name against this layer's own instance-level entry points,
/// transmuting the concrete trampoline's function pointer type to the
/// untyped `PFN_vkVoidFunction` the loader expects back — the same
/// reinterpret every Vulkan loader and layer performs when implementing
/// `GetInstanceProcAddr`, since the ABI has no typed equivalent.
unsafe fn resolve_instance_proc(name: &str) -> vk::PFN_vkVoidFunction {
    macro_rules! case {
        ($n:literal, $ty:ty, $f:expr) => {
            if name == $n {
                return std::mem::transmute::<$ty, vk::PFN_vkVoidFunction>(Some($f));
            }
        };
    }
    case!("vkGetInstanceProcAddr", vk::PFN_vkGetInstanceProcAddr, wiretap_GetInstanceProcAddr);
    case!("vkGetDeviceProcAddr", vk::PFN_vkGetDeviceProcAddr, wiretap_GetDeviceProcAddr);
    case!("vkCreateInstance", vk::PFN_vkCreateInstance, vk_create_instance);
    case!("vkDestroyInstance", vk::PFN_vkDestroyInstance, vk_destroy_instance);
    case!("vkCreateDevice", vk::PFN_vkCreateDevice, vk_create_device);
    case!(
        "vkGetPhysicalDeviceQueueFamilyProperties",
        vk::PFN_vkGetPhysicalDeviceQueueFamilyProperties,
        vk_get_physical_device_queue_family_properties
    );
    case!(
        "vkGetPhysicalDeviceQueueFamilyProperties2",
        vk::PFN_vkGetPhysicalDeviceQueueFamilyProperties2,
        vk_get_physical_device_queue_family_properties2
    );
    case!(
        "vkEnumerateInstanceLayerProperties",
        vk::PFN_vkEnumerateInstanceLayerProperties,
        vk_enumerate_instance_layer_properties
    );
    case!(
        "vkEnumerateInstanceExtensionProperties",
        vk::PFN_vkEnumerateInstanceExtensionProperties,
        vk_enumerate_instance_extension_properties
    );
    case!(
        "vkEnumerateDeviceLayerProperties",
        vk::PFN_vkEnumerateDeviceLayerProperties,
        vk_enumerate_device_layer_properties
    );
    case!(
        "vkEnumerateDeviceExtensionProperties",
        vk::PFN_vkEnumerateDeviceExtensionProperties,
        vk_enumerate_device_extension_properties
    );
    None
}

/// Resolves a name against this layer's own device-level entry points. See
/// [`resolve_instance_proc`] for the transmute rationale.
unsafe fn resolve_device_proc(name: &str) -> vk::PFN_vkVoidFunction {
    macro_rules! case {
        ($n:literal, $ty:ty, $f:expr) => {
            if name == $n {
                return std::mem::transmute::<$ty, vk::PFN_vkVoidFunction>(Some($f));
            }
        };
    }
    case!("vkGetDeviceProcAddr", vk::PFN_vkGetDeviceProcAddr, wiretap_GetDeviceProcAddr);
    case!("vkDestroyDevice", vk::PFN_vkDestroyDevice, vk_destroy_device);
    case!("vkGetDeviceQueue", vk::PFN_vkGetDeviceQueue, vk_get_device_queue);
    case!("vkCreateImage", vk::PFN_vkCreateImage, vk_create_image);
    case!("vkBindImageMemory", vk::PFN_vkBindImageMemory, vk_bind_image_memory);
    case!("vkCreateImageView", vk::PFN_vkCreateImageView, vk_create_image_view);
    case!("vkCmdCopyBufferToImage", vk::PFN_vkCmdCopyBufferToImage, vk_cmd_copy_buffer_to_image);
    case!("vkCreateBuffer", vk::PFN_vkCreateBuffer, vk_create_buffer);
    case!("vkBindBufferMemory", vk::PFN_vkBindBufferMemory, vk_bind_buffer_memory);
    case!("vkMapMemory", vk::PFN_vkMapMemory, vk_map_memory);
    case!("vkUnmapMemory", vk::PFN_vkUnmapMemory, vk_unmap_memory);
    case!("vkCmdCopyBuffer", vk::PFN_vkCmdCopyBuffer, vk_cmd_copy_buffer);
    case!("vkCreateShaderModule", vk::PFN_vkCreateShaderModule, vk_create_shader_module);
    case!(
        "vkCreateDescriptorUpdateTemplate",
        vk::PFN_vkCreateDescriptorUpdateTemplate,
        vk_create_descriptor_update_template
    );
    case!(
        "vkUpdateDescriptorSetWithTemplate",
        vk::PFN_vkUpdateDescriptorSetWithTemplate,
        vk_update_descriptor_set_with_template
    );
    case!("vkAllocateCommandBuffers", vk::PFN_vkAllocateCommandBuffers, vk_allocate_command_buffers);
    case!("vkFreeCommandBuffers", vk::PFN_vkFreeCommandBuffers, vk_free_command_buffers);
    case!("vkCreateFramebuffer", vk::PFN_vkCreateFramebuffer, vk_create_framebuffer);
    case!("vkCreatePipelineLayout", vk::PFN_vkCreatePipelineLayout, vk_create_pipeline_layout);
    case!("vkCreateGraphicsPipelines", vk::PFN_vkCreateGraphicsPipelines, vk_create_graphics_pipelines);
    case!("vkCmdBindDescriptorSets", vk::PFN_vkCmdBindDescriptorSets, vk_cmd_bind_descriptor_sets);
    case!("vkCmdBindPipeline", vk::PFN_vkCmdBindPipeline, vk_cmd_bind_pipeline);
    case!("vkCmdBindVertexBuffers", vk::PFN_vkCmdBindVertexBuffers, vk_cmd_bind_vertex_buffers);
    case!("vkCmdBindVertexBuffers2EXT", vk::PFN_vkCmdBindVertexBuffers2EXT, vk_cmd_bind_vertex_buffers2_ext);
    case!("vkCmdBindIndexBuffer", vk::PFN_vkCmdBindIndexBuffer, vk_cmd_bind_index_buffer);
    case!("vkCmdSetScissor", vk::PFN_vkCmdSetScissor, vk_cmd_set_scissor);
    case!("vkCmdBeginRenderPass", vk::PFN_vkCmdBeginRenderPass, vk_cmd_begin_render_pass);
    case!("vkCmdEndRenderPass", vk::PFN_vkCmdEndRenderPass, vk_cmd_end_render_pass);
    case!("vkCmdDraw", vk::PFN_vkCmdDraw, vk_cmd_draw);
    case!("vkCmdDrawIndexed", vk::PFN_vkCmdDrawIndexed, vk_cmd_draw_indexed);
    case!(
        "vkCmdBeginTransformFeedbackEXT",
        vk::PFN_vkCmdBeginTransformFeedbackEXT,
        vk_cmd_begin_transform_feedback_ext
    );
    case!(
        "vkCmdBindTransformFeedbackBuffersEXT",
        vk::PFN_vkCmdBindTransformFeedbackBuffersEXT,
        vk_cmd_bind_transform_feedback_buffers_ext
    );
    case!(
        "vkCmdEndTransformFeedbackEXT",
        vk::PFN_vkCmdEndTransformFeedbackEXT,
        vk_cmd_end_transform_feedback_ext
    );
    case!("vkEndCommandBuffer", vk::PFN_vkEndCommandBuffer, vk_end_command_buffer);
    case!("vkQueueSubmit", vk::PFN_vkQueueSubmit, vk_queue_submit);
    case!("vkQueuePresentKHR", vk::PFN_vkQueuePresentKHR, vk_queue_present_khr);
    case!("vkCreateSwapchainKHR", vk::PFN_vkCreateSwapchainKHR, vk_create_swapchain_khr);
    case!("vkDestroySwapchainKHR", vk::PFN_vkDestroySwapchainKHR, vk_destroy_swapchain_khr);
    None
}

/// The layer's own `vkGetInstanceProcAddr`. A name this layer intercepts
/// resolves to one of the trampolines above; anything else falls through to
/// the next layer's `GetInstanceProcAddr`, looked up via the registry.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn wiretap_GetInstanceProcAddr(instance: vk::Instance, p_name: *const c_char) -> vk::PFN_vkVoidFunction {
    let name = CStr::from_ptr(p_name).to_string_lossy();
    if let Some(f) = resolve_instance_proc(&name) {
        return Some(f);
    }
    let Some(inst) = instance_for(instance) else { return None };
    (inst.next_get_instance_proc_addr)(instance, p_name)
}

/// The layer's own `vkGetDeviceProcAddr`, same fallthrough discipline as
/// [`wiretap_GetInstanceProcAddr`].
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn wiretap_GetDeviceProcAddr(device: vk::Device, p_name: *const c_char) -> vk::PFN_vkVoidFunction {
    let name = CStr::from_ptr(p_name).to_string_lossy();
    if let Some(f) = resolve_device_proc(&name) {
        return Some(f);
    }
    let Some(dev) = device_for(device) else { return None };
    (dev.next_get_device_proc_addr)(device, p_name)
}

/// `vkEnumerateInstanceLayerProperties`, looked up by symbol name directly
/// by the loader before any instance exists — the layer manifest's
/// `functions` block points it at this prefixed export rather than the bare
/// `vkEnumerateInstanceLayerProperties` name, avoiding a clash with the real
/// loader trampoline of the same name.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn wiretap_EnumerateInstanceLayerProperties(p_property_count: *mut u32, p_properties: *mut vk::LayerProperties) -> vk::Result {
    vk_enumerate_instance_layer_properties(p_property_count, p_properties)
}

/// `vkEnumerateInstanceExtensionProperties`, same manifest-level rationale
/// as [`wiretap_EnumerateInstanceLayerProperties`].
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn wiretap_EnumerateInstanceExtensionProperties(
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    vk_enumerate_instance_extension_properties(p_layer_name, p_property_count, p_properties)
}

/// `vkEnumerateDeviceLayerProperties`, same manifest-level rationale as
/// [`wiretap_EnumerateInstanceLayerProperties`].
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn wiretap_EnumerateDeviceLayerProperties(
    physical_device: vk::PhysicalDevice,
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    vk_enumerate_device_layer_properties(physical_device, p_property_count, p_properties)
}

/// `vkEnumerateDeviceExtensionProperties`, same manifest-level rationale as
/// [`wiretap_EnumerateInstanceLayerProperties`].
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn wiretap_EnumerateDeviceExtensionProperties(
    physical_device: vk::PhysicalDevice,
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    vk_enumerate_device_extension_properties(physical_device, p_layer_name, p_property_count, p_properties)
}
