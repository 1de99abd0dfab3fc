//! Synthetic reflection structs that have no native Vulkan counterpart:
//! draw-time snapshots assembled by `hooks::draw` so rules can inspect a
//! draw call the same way they inspect a `Vk*CreateInfo`.

use ash::vk;

/// Mirrors `vkCmdDraw`'s non-dispatchable arguments.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VkCmdDraw {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

/// Mirrors `vkCmdDrawIndexed`'s non-dispatchable arguments.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VkCmdDrawIndexed {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

/// A minimal snapshot of `shadow::command_buffer::CommandBufferState` at
/// draw time, embedded in the `VkCmdDraw[Indexed]` rule struct so
/// `vkstruct(...)` paths can reach bound-state fields without a second
/// selector kind.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VkCommandBufferState {
    pub bound_pipeline: vk::Pipeline,
    pub bound_index_buffer: vk::Buffer,
    pub scissor_count: u32,
    pub current_render_pass: vk::RenderPass,
    pub current_framebuffer: vk::Framebuffer,
}
