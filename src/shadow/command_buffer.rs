//! Shadow command-buffer state, grounded on `CheekyLayer::command_buffer_state`.
//! Rebuilt incrementally by `hooks::draw`'s `CmdBind*`/`CmdSetScissor`/
//! `CmdBeginRenderPass` wrappers, and is what `vkstruct()`'s `draw`
//! `additional_info` and `vkdescriptor()` read against.

use ash::vk;

use crate::device::Device;
use crate::shadow::descriptor::DescriptorState;

#[derive(Debug, Clone, Copy)]
pub struct BufferBinding {
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
}

#[derive(Debug, Clone, Default)]
pub struct CommandBufferState {
    pub pipeline: vk::Pipeline,
    /// Descriptor sets bound per set index (sparse: unbound slots are
    /// `vk::DescriptorSet::null()`).
    pub descriptor_sets: Vec<vk::DescriptorSet>,
    pub descriptor_dynamic_offsets: Vec<u32>,

    pub vertex_buffers: Vec<vk::Buffer>,
    pub vertex_buffer_offsets: Vec<vk::DeviceSize>,

    pub index_buffer: vk::Buffer,
    pub index_buffer_offset: vk::DeviceSize,
    pub index_type: vk::IndexType,

    pub scissors: Vec<vk::Rect2D>,

    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,

    pub transform_feedback: bool,
    pub transform_feedback_buffers: Vec<BufferBinding>,
}

impl CommandBufferState {
    pub fn bind_descriptor_sets(&mut self, first_set: u32, sets: &[vk::DescriptorSet], dynamic_offsets: &[u32]) {
        let needed = first_set as usize + sets.len();
        if self.descriptor_sets.len() < needed {
            self.descriptor_sets.resize(needed, vk::DescriptorSet::null());
        }
        for (i, &set) in sets.iter().enumerate() {
            self.descriptor_sets[first_set as usize + i] = set;
        }
        self.descriptor_dynamic_offsets = dynamic_offsets.to_vec();
    }
}

/// Resolves the handle currently bound at `(set, binding, arr_index)` for
/// the given command buffer, by following its bound `VkDescriptorSet` into
/// `device`'s shadow descriptor-state map.
pub fn resolve_bound_descriptor(
    cb: &CommandBufferState,
    device: &Device,
    set: u32,
    binding: u32,
    arr_index: u32,
) -> Option<u64> {
    let descriptor_set = *cb.descriptor_sets.get(set as usize)?;
    if descriptor_set == vk::DescriptorSet::null() {
        return None;
    }
    let states = device.descriptor_states.lock().expect("device lock poisoned");
    let state: &DescriptorState = states.get(&descriptor_set)?;
    state.handle_at(binding, arr_index)
}
