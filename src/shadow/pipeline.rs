//! Shadow pipeline and pipeline-layout state, grounded on
//! `CheekyLayer::pipeline_state`/`pipeline_layout_info`.

use ash::vk;

#[derive(Debug, Clone)]
pub struct ShaderInfo {
    pub stage: vk::ShaderStageFlags,
    pub module: vk::ShaderModule,
    /// The synthetic handle assigned if this stage's module was substituted
    /// by an override (see `assets::shader_compile`); `None` otherwise.
    pub custom_handle: Option<u64>,
    pub hash: String,
    pub entry_point: String,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub stages: Vec<ShaderInfo>,
    pub vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineLayoutInfo {
    pub set_layouts: Vec<vk::DescriptorSetLayout>,
    pub push_constant_ranges: Vec<vk::PushConstantRange>,
}
