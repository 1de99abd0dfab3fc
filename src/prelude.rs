//! Re-exports the types most call sites need, so a plugin or test only has
//! to `use wiretap::prelude::*;`.

pub use ash::vk;

pub use crate::config::Config;
pub use crate::device::Device;
pub use crate::dispatch::DispatchKey;
pub use crate::error::Error;
pub use crate::instance::Instance;
pub use crate::rules::{
    execute_rules, load_rules, parse, AdditionalInfo, Context, GlobalRuleContext, ParsedFile, Rule, Selector, SelectorType, Value,
};
pub use crate::shadow::{
    BufferState, CommandBufferState, DescriptorBinding, DescriptorElement, DescriptorElementInfo, DescriptorState, FramebufferState, ImageState,
    MemoryMapInfo, PipelineLayoutInfo, PipelineState, ShaderInfo, SwapchainState,
};
