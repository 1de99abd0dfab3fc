//! `AllocateCommandBuffers`/`FreeCommandBuffers`/`CreateFramebuffer`/
//! `CreatePipelineLayout`/`CreateGraphicsPipelines`/the `CmdBind*`/
//! `CmdSetScissor`/render-pass/transform-feedback family/
//! `CmdDraw[Indexed]`/`EndCommandBuffer`/`QueueSubmit` (component H), grounded
//! on `CheekyLayer::device`'s handlers in `draw.cpp`.

use std::sync::Arc;

use ash::vk;

use crate::device::Device;
use crate::reflection::custom_structs::{VkCmdDraw, VkCmdDrawIndexed};
use crate::rules::action::BoxedAction;
use crate::rules::data::Value;
use crate::rules::{AdditionalInfo, Context, SelectorType};
use crate::shadow::{CommandBufferState, FramebufferState, PipelineLayoutInfo, PipelineState, ShaderInfo};

pub unsafe fn allocate_command_buffers(
    device: &Arc<Device>,
    allocate_info: &vk::CommandBufferAllocateInfo,
) -> Result<Vec<vk::CommandBuffer>, vk::Result> {
    let buffers = device.ash_device.allocate_command_buffers(allocate_info)?;
    device.instance.logger.verbose(&format!("AllocateCommandBuffers: {}", buffers.len()));

    let mut states = device.command_buffer_states.lock().expect("device lock poisoned");
    let mut globals = device.instance.globals.lock().expect("rule globals lock poisoned");
    for &cb in &buffers {
        states.insert(cb, CommandBufferState::default());
        globals.on_end_command_buffer.entry(cb).or_default();
        globals.on_queue_submit.entry(cb).or_default();
    }
    Ok(buffers)
}

pub fn free_command_buffers(device: &Arc<Device>, command_pool: vk::CommandPool, command_buffers: &[vk::CommandBuffer]) {
    device.instance.logger.verbose(&format!("FreeCommandBuffers: {}", command_buffers.len()));
    {
        let mut states = device.command_buffer_states.lock().expect("device lock poisoned");
        let mut globals = device.instance.globals.lock().expect("rule globals lock poisoned");
        for cb in command_buffers {
            states.remove(cb);
            globals.on_end_command_buffer.remove(cb);
            globals.on_queue_submit.remove(cb);
            globals.on_end_render_pass.remove(cb);
        }
    }
    unsafe { device.ash_device.free_command_buffers(command_pool, command_buffers) };
}

pub unsafe fn create_framebuffer(
    device: &Arc<Device>,
    create_info: &vk::FramebufferCreateInfo,
    allocator: Option<&vk::AllocationCallbacks>,
) -> Result<vk::Framebuffer, vk::Result> {
    let framebuffer = device.ash_device.create_framebuffer(create_info, allocator)?;
    device
        .framebuffers
        .lock()
        .expect("device lock poisoned")
        .insert(framebuffer, FramebufferState::from_create_info(create_info));
    Ok(framebuffer)
}

pub unsafe fn create_pipeline_layout(
    device: &Arc<Device>,
    create_info: &vk::PipelineLayoutCreateInfo,
    allocator: Option<&vk::AllocationCallbacks>,
) -> Result<vk::PipelineLayout, vk::Result> {
    let layout = device.ash_device.create_pipeline_layout(create_info, allocator)?;
    let set_layouts = std::slice::from_raw_parts(create_info.p_set_layouts, create_info.set_layout_count as usize).to_vec();
    let push_constant_ranges =
        std::slice::from_raw_parts(create_info.p_push_constant_ranges, create_info.push_constant_range_count as usize).to_vec();
    device
        .pipeline_layouts
        .lock()
        .expect("device lock poisoned")
        .insert(layout, PipelineLayoutInfo { set_layouts, push_constant_ranges });
    Ok(layout)
}

/// # Safety
/// `create_infos` must contain `create_infos.len()` valid
/// `VkGraphicsPipelineCreateInfo`s, as guaranteed by the Vulkan loader.
/// Each entry's `pVertexInputState` must be non-null — true of every
/// graphics pipeline that doesn't use mesh shaders, which this layer does
/// not claim to support.
pub unsafe fn create_graphics_pipelines(
    device: &Arc<Device>,
    pipeline_cache: vk::PipelineCache,
    create_infos: &mut [vk::GraphicsPipelineCreateInfo],
    allocator: Option<&vk::AllocationCallbacks>,
) -> Result<Vec<vk::Pipeline>, vk::Result> {
    let instance = &device.instance;
    let mut callbacks_per_pipeline: Vec<Vec<Box<dyn FnOnce(u64) + Send>>> = Vec::with_capacity(create_infos.len());

    for info in create_infos.iter_mut() {
        let stages = std::slice::from_raw_parts(info.p_stages, info.stage_count as usize);
        let shader_handles: Vec<Value> = stages
            .iter()
            .filter_map(|s| device.custom_shader_handle_for(s.module.as_raw()))
            .map(Value::Handle)
            .collect();

        let ptr = info as *mut vk::GraphicsPipelineCreateInfo as *mut u8;
        let mut globals = instance.globals.lock().expect("rule globals lock poisoned");
        let mut ctx = super::new_context(instance, Some(device.clone()), &mut globals, 0, AdditionalInfo::Pipeline { create_info_ptr: ptr });
        ctx.locals.insert("with:shader".to_owned(), Value::List(shader_handles));
        crate::rules::execute_rules(&instance.rules, SelectorType::Pipeline, 0, &mut ctx);

        for o in &ctx.overrides {
            if let Err(e) = crate::reflection::assign(o, ptr, "VkGraphicsPipelineCreateInfo") {
                instance.logger.error(&format!("failed to process override \"{}\": {}", o, e));
            }
        }
        callbacks_per_pipeline.push(std::mem::take(&mut ctx.creation_callbacks));
    }

    let result = device.ash_device.create_graphics_pipelines(pipeline_cache, create_infos, allocator);
    let pipelines = match result {
        Ok(pipelines) => pipelines,
        Err((pipelines, err)) => {
            instance.logger.warn(&format!("CreateGraphicsPipelines: partial failure: {:?}", err));
            pipelines
        }
    };

    {
        let mut pipeline_states = device.pipeline_states.lock().expect("device lock poisoned");
        let globals = instance.globals.lock().expect("rule globals lock poisoned");
        for (i, &pipeline) in pipelines.iter().enumerate() {
            if pipeline == vk::Pipeline::null() {
                continue;
            }
            let info = &create_infos[i];
            let stages = std::slice::from_raw_parts(info.p_stages, info.stage_count as usize);
            let state_stages = stages
                .iter()
                .map(|s| {
                    let custom_handle = device.custom_shader_handle_for(s.module.as_raw());
                    let hash = custom_handle.and_then(|h| globals.content_hashes.get(&h).cloned()).unwrap_or_else(|| "unknown".to_owned());
                    ShaderInfo {
                        stage: s.stage,
                        module: s.module,
                        custom_handle,
                        hash,
                        entry_point: std::ffi::CStr::from_ptr(s.p_name).to_string_lossy().into_owned(),
                    }
                })
                .collect();
            let vi = &*info.p_vertex_input_state;
            let vertex_bindings = std::slice::from_raw_parts(vi.p_vertex_binding_descriptions, vi.vertex_binding_description_count as usize).to_vec();
            let vertex_attributes =
                std::slice::from_raw_parts(vi.p_vertex_attribute_descriptions, vi.vertex_attribute_description_count as usize).to_vec();
            pipeline_states.insert(pipeline, PipelineState { stages: state_stages, vertex_bindings, vertex_attributes });
        }
        drop(globals);
        drop(pipeline_states);
    }

    for (&pipeline, callbacks) in pipelines.iter().zip(callbacks_per_pipeline) {
        if pipeline == vk::Pipeline::null() {
            continue;
        }
        for cb in callbacks {
            cb(pipeline.as_raw());
        }
    }

    Ok(pipelines)
}

pub fn cmd_bind_descriptor_sets(
    device: &Arc<Device>,
    command_buffer: vk::CommandBuffer,
    pipeline_bind_point: vk::PipelineBindPoint,
    layout: vk::PipelineLayout,
    first_set: u32,
    descriptor_sets: &[vk::DescriptorSet],
    dynamic_offsets: &[u32],
) {
    {
        let mut states = device.command_buffer_states.lock().expect("device lock poisoned");
        let state = states.entry(command_buffer).or_default();
        state.bind_descriptor_sets(first_set, descriptor_sets, dynamic_offsets);
    }
    unsafe {
        device.ash_device.cmd_bind_descriptor_sets(
            command_buffer,
            pipeline_bind_point,
            layout,
            first_set,
            descriptor_sets,
            dynamic_offsets,
        )
    };
}

pub fn cmd_bind_pipeline(device: &Arc<Device>, command_buffer: vk::CommandBuffer, pipeline_bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
    device.command_buffer_states.lock().expect("device lock poisoned").entry(command_buffer).or_default().pipeline = pipeline;
    unsafe { device.ash_device.cmd_bind_pipeline(command_buffer, pipeline_bind_point, pipeline) };
}

fn resize_for(len: usize, first: u32, count: usize) -> usize {
    let _ = len;
    first as usize + count
}

pub unsafe fn cmd_bind_vertex_buffers(
    device: &Arc<Device>,
    command_buffer: vk::CommandBuffer,
    first_binding: u32,
    buffers: &[vk::Buffer],
    offsets: &[vk::DeviceSize],
) {
    {
        let mut states = device.command_buffer_states.lock().expect("device lock poisoned");
        let state = states.entry(command_buffer).or_default();
        let needed = resize_for(state.vertex_buffers.len(), first_binding, buffers.len());
        if state.vertex_buffers.len() < needed {
            state.vertex_buffers.resize(needed, vk::Buffer::null());
            state.vertex_buffer_offsets.resize(needed, 0);
        }
        state.vertex_buffers[first_binding as usize..needed].copy_from_slice(buffers);
        state.vertex_buffer_offsets[first_binding as usize..needed].copy_from_slice(offsets);
    }
    device.ash_device.cmd_bind_vertex_buffers(command_buffer, first_binding, buffers, offsets);
}

/// `vkCmdBindVertexBuffers2EXT` — `pSizes`/`pStrides` are forwarded but not
/// tracked in shadow state, matching the original (it records only buffers
/// and offsets for this variant too).
pub unsafe fn cmd_bind_vertex_buffers2_ext(
    device: &Arc<Device>,
    command_buffer: vk::CommandBuffer,
    first_binding: u32,
    buffers: &[vk::Buffer],
    offsets: &[vk::DeviceSize],
    sizes: Option<&[vk::DeviceSize]>,
    strides: Option<&[vk::DeviceSize]>,
) {
    {
        let mut states = device.command_buffer_states.lock().expect("device lock poisoned");
        let state = states.entry(command_buffer).or_default();
        let needed = resize_for(state.vertex_buffers.len(), first_binding, buffers.len());
        if state.vertex_buffers.len() < needed {
            state.vertex_buffers.resize(needed, vk::Buffer::null());
            state.vertex_buffer_offsets.resize(needed, 0);
        }
        state.vertex_buffers[first_binding as usize..needed].copy_from_slice(buffers);
        state.vertex_buffer_offsets[first_binding as usize..needed].copy_from_slice(offsets);
    }
    device.ext_extended_dynamic_state.cmd_bind_vertex_buffers2(
        command_buffer,
        first_binding,
        buffers,
        offsets,
        sizes,
        strides,
    );
}

pub fn cmd_bind_index_buffer(device: &Arc<Device>, command_buffer: vk::CommandBuffer, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) {
    {
        let mut states = device.command_buffer_states.lock().expect("device lock poisoned");
        let state = states.entry(command_buffer).or_default();
        state.index_buffer = buffer;
        state.index_buffer_offset = offset;
        state.index_type = index_type;
    }
    unsafe { device.ash_device.cmd_bind_index_buffer(command_buffer, buffer, offset, index_type) };
}

pub unsafe fn cmd_set_scissor(device: &Arc<Device>, command_buffer: vk::CommandBuffer, first_scissor: u32, scissors: &[vk::Rect2D]) {
    {
        let mut states = device.command_buffer_states.lock().expect("device lock poisoned");
        let state = states.entry(command_buffer).or_default();
        let needed = resize_for(state.scissors.len(), first_scissor, scissors.len());
        if state.scissors.len() < needed {
            state.scissors.resize(needed, vk::Rect2D::default());
        }
        state.scissors[first_scissor as usize..needed].copy_from_slice(scissors);
    }
    device.ash_device.cmd_set_scissor(command_buffer, first_scissor, scissors);
}

pub fn cmd_begin_render_pass(device: &Arc<Device>, command_buffer: vk::CommandBuffer, begin_info: &vk::RenderPassBeginInfo, contents: vk::SubpassContents) {
    {
        let mut states = device.command_buffer_states.lock().expect("device lock poisoned");
        let state = states.entry(command_buffer).or_default();
        state.render_pass = begin_info.render_pass;
        state.framebuffer = begin_info.framebuffer;
    }
    unsafe { device.ash_device.cmd_begin_render_pass(command_buffer, begin_info, contents) };
}

pub fn cmd_end_render_pass(device: &Arc<Device>, command_buffer: vk::CommandBuffer) {
    drain_deferred(device, command_buffer, DeferredList::EndRenderPass);
    {
        let mut states = device.command_buffer_states.lock().expect("device lock poisoned");
        let state = states.entry(command_buffer).or_default();
        state.render_pass = vk::RenderPass::null();
        state.framebuffer = vk::Framebuffer::null();
    }
    unsafe { device.ash_device.cmd_end_render_pass(command_buffer) };
}

fn gather_draw_candidates(device: &Arc<Device>, state: &CommandBufferState) -> (Vec<Value>, Vec<Value>) {
    let descriptor_states = device.descriptor_states.lock().expect("device lock poisoned");
    let mut images = Vec::new();
    for &set in &state.descriptor_sets {
        if set == vk::DescriptorSet::null() {
            continue;
        }
        let Some(ds) = descriptor_states.get(&set) else { continue };
        for binding in ds.bindings.values() {
            if binding.selector_type == SelectorType::Image {
                images.extend(binding.array_elements.iter().map(|e| Value::Handle(e.handle)));
            }
        }
    }

    let pipeline_states = device.pipeline_states.lock().expect("device lock poisoned");
    let shaders = pipeline_states
        .get(&state.pipeline)
        .map(|p| p.stages.iter().filter_map(|s| s.custom_handle).map(Value::Handle).collect())
        .unwrap_or_default();
    (images, shaders)
}

fn fire_draw(
    device: &Arc<Device>,
    command_buffer: vk::CommandBuffer,
    draw_struct_ptr: *mut u8,
    draw_struct_type: &'static str,
    extra_buffers: &[vk::Buffer],
) -> bool {
    let instance = &device.instance;
    let mut state_clone = device.command_buffer_states.lock().expect("device lock poisoned").get(&command_buffer).cloned().unwrap_or_default();

    let (images, shaders) = gather_draw_candidates(device, &state_clone);
    let mut buffers: Vec<Value> = extra_buffers.iter().map(|b| Value::Handle(b.as_raw())).collect();
    buffers.extend(state_clone.vertex_buffers.iter().map(|b| Value::Handle(b.as_raw())));

    let mut globals = instance.globals.lock().expect("rule globals lock poisoned");
    let mut ctx = super::new_context(
        instance,
        Some(device.clone()),
        &mut globals,
        0,
        AdditionalInfo::Draw { draw_struct_ptr, draw_struct_type },
    );
    ctx.command_buffer_handle = Some(command_buffer);
    ctx.command_buffer = Some(&mut state_clone);
    ctx.locals.insert("with:image".to_owned(), Value::List(images));
    ctx.locals.insert("with:shader".to_owned(), Value::List(shaders));
    ctx.locals.insert("with:buffer".to_owned(), Value::List(buffers));

    crate::rules::execute_rules(&instance.rules, SelectorType::Draw, 0, &mut ctx);
    !ctx.canceled
}

pub unsafe fn cmd_draw(
    device: &Arc<Device>,
    command_buffer: vk::CommandBuffer,
    vertex_count: u32,
    instance_count: u32,
    first_vertex: u32,
    first_instance: u32,
) {
    let mut draw_struct = VkCmdDraw { vertex_count, instance_count, first_vertex, first_instance };
    let forward = fire_draw(device, command_buffer, &mut draw_struct as *mut VkCmdDraw as *mut u8, "VkCmdDraw", &[]);
    if forward {
        device.ash_device.cmd_draw(command_buffer, vertex_count, instance_count, first_vertex, first_instance);
    }
}

pub unsafe fn cmd_draw_indexed(
    device: &Arc<Device>,
    command_buffer: vk::CommandBuffer,
    index_count: u32,
    instance_count: u32,
    first_index: u32,
    vertex_offset: i32,
    first_instance: u32,
) {
    let index_buffer = device.command_buffer_states.lock().expect("device lock poisoned").get(&command_buffer).map(|s| s.index_buffer).unwrap_or_default();
    let mut draw_struct = VkCmdDrawIndexed { index_count, instance_count, first_index, vertex_offset, first_instance };
    let forward = fire_draw(device, command_buffer, &mut draw_struct as *mut VkCmdDrawIndexed as *mut u8, "VkCmdDrawIndexed", &[index_buffer]);
    if forward {
        device.ash_device.cmd_draw_indexed(command_buffer, index_count, instance_count, first_index, vertex_offset, first_instance);
    }
}

pub unsafe fn cmd_begin_transform_feedback_ext(
    device: &Arc<Device>,
    command_buffer: vk::CommandBuffer,
    first_counter_buffer: u32,
    counter_buffers: &[vk::Buffer],
    counter_buffer_offsets: &[vk::DeviceSize],
) {
    device.command_buffer_states.lock().expect("device lock poisoned").entry(command_buffer).or_default().transform_feedback = true;
    device.ext_transform_feedback.cmd_begin_transform_feedback(
        command_buffer,
        first_counter_buffer,
        counter_buffers,
        counter_buffer_offsets,
    );
}

pub unsafe fn cmd_bind_transform_feedback_buffers_ext(
    device: &Arc<Device>,
    command_buffer: vk::CommandBuffer,
    first_binding: u32,
    buffers: &[vk::Buffer],
    offsets: &[vk::DeviceSize],
    sizes: &[vk::DeviceSize],
) {
    {
        let mut states = device.command_buffer_states.lock().expect("device lock poisoned");
        let state = states.entry(command_buffer).or_default();
        let needed = first_binding as usize + buffers.len();
        if state.transform_feedback_buffers.len() < needed {
            state.transform_feedback_buffers.resize(needed, crate::shadow::command_buffer::BufferBinding { buffer: vk::Buffer::null(), offset: 0, size: 0 });
        }
        for i in 0..buffers.len() {
            state.transform_feedback_buffers[first_binding as usize + i] =
                crate::shadow::command_buffer::BufferBinding { buffer: buffers[i], offset: offsets[i], size: sizes[i] };
        }
    }
    device.ext_transform_feedback.cmd_bind_transform_feedback_buffers(
        command_buffer,
        first_binding,
        buffers,
        offsets,
        Some(sizes),
    );
}

pub unsafe fn cmd_end_transform_feedback_ext(
    device: &Arc<Device>,
    command_buffer: vk::CommandBuffer,
    first_counter_buffer: u32,
    counter_buffers: &[vk::Buffer],
    counter_buffer_offsets: &[vk::DeviceSize],
) {
    {
        let mut states = device.command_buffer_states.lock().expect("device lock poisoned");
        let state = states.entry(command_buffer).or_default();
        state.transform_feedback = false;
        state.transform_feedback_buffers.clear();
    }
    device.ext_transform_feedback.cmd_end_transform_feedback(
        command_buffer,
        first_counter_buffer,
        counter_buffers,
        counter_buffer_offsets,
    );
}

pub fn end_command_buffer(device: &Arc<Device>, command_buffer: vk::CommandBuffer) -> vk::Result {
    if let Some(state) = device.command_buffer_states.lock().expect("device lock poisoned").get_mut(&command_buffer) {
        state.transform_feedback = false;
    }
    drain_deferred(device, command_buffer, DeferredList::EndCommandBuffer);
    match unsafe { device.ash_device.end_command_buffer(command_buffer) } {
        Ok(()) => vk::Result::SUCCESS,
        Err(e) => e,
    }
}

pub fn queue_submit(device: &Arc<Device>, queue: vk::Queue, submits: &[vk::SubmitInfo], fence: vk::Fence) -> vk::Result {
    for submit in submits {
        let command_buffers = unsafe { std::slice::from_raw_parts(submit.p_command_buffers, submit.command_buffer_count as usize) };
        for &cb in command_buffers {
            drain_deferred(device, cb, DeferredList::QueueSubmit);
        }
    }
    match unsafe { device.ash_device.queue_submit(queue, submits, fence) } {
        Ok(()) => vk::Result::SUCCESS,
        Err(e) => e,
    }
}

enum DeferredList {
    EndCommandBuffer,
    QueueSubmit,
    EndRenderPass,
}

/// Drains one command buffer's deferred-callback list against a fresh
/// [`Context`], logging (not propagating) any action error, matching the
/// original's per-callback `try`/`catch`.
fn drain_deferred(device: &Arc<Device>, command_buffer: vk::CommandBuffer, which: DeferredList) {
    let instance = &device.instance;
    let mut globals = instance.globals.lock().expect("rule globals lock poisoned");
    let actions: Vec<BoxedAction> = match which {
        DeferredList::EndCommandBuffer => globals.on_end_command_buffer.get_mut(&command_buffer).map(std::mem::take),
        DeferredList::QueueSubmit => globals.on_queue_submit.get_mut(&command_buffer).map(std::mem::take),
        DeferredList::EndRenderPass => globals.on_end_render_pass.get_mut(&command_buffer).map(std::mem::take),
    }
    .unwrap_or_default();
    if actions.is_empty() {
        return;
    }

    let mut state_clone = device.command_buffer_states.lock().expect("device lock poisoned").get(&command_buffer).cloned().unwrap_or_default();
    let mut ctx = Context {
        logger: &instance.logger,
        instance: instance.clone(),
        device: Some(device.clone()),
        command_buffer_handle: Some(command_buffer),
        command_buffer: Some(&mut state_clone),
        globals: &mut globals,
        additional_info: AdditionalInfo::None,
        primary_handle: 0,
        locals: Default::default(),
        reduction_stack: Vec::new(),
        canceled: false,
        overrides: Vec::new(),
        creation_callbacks: Vec::new(),
        custom_tag: None,
    };
    for action in &actions {
        if let Err(e) = action.execute(&mut ctx) {
            instance.logger.error(&format!("deferred callback on command buffer {:?} failed: {}", command_buffer, e));
        }
    }
}
