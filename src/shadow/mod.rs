//! The shadow object store (component: per-device state mirror). Each
//! submodule holds one native-handle-keyed map mirroring the subset of
//! `Vk*CreateInfo` state the rule engine and asset substitution path need
//! after the real object has already been created by the next layer down.

pub mod buffer;
pub mod command_buffer;
pub mod descriptor;
pub mod framebuffer;
pub mod image;
pub mod memory;
pub mod pipeline;
pub mod swapchain;

pub use buffer::BufferState;
pub use command_buffer::CommandBufferState;
pub use descriptor::{DescriptorBinding, DescriptorElement, DescriptorElementInfo, DescriptorState};
pub use framebuffer::FramebufferState;
pub use image::ImageState;
pub use memory::MemoryMapInfo;
pub use pipeline::{PipelineLayoutInfo, PipelineState, ShaderInfo};
pub use swapchain::SwapchainState;
