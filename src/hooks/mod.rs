//! The intercepted Vulkan entry points (components E/F/G/H). Each function
//! here is the logic a `lib.rs` trampoline calls into after looking up the
//! owning [`crate::instance::Instance`]/[`crate::device::Device`] from
//! [`crate::registry`]; none of them are `#[no_mangle]` themselves.

pub mod buffers;
pub mod descriptors;
pub mod draw;
pub mod images;
pub mod lifecycle;
pub mod present;
pub mod shaders;

/// Builds a fresh per-call [`crate::rules::Context`] against `instance`,
/// optionally scoped to `device`/`command_buffer`. Every hook constructs one
/// of these right before firing a selector.
pub fn new_context<'a>(
    instance: &'a std::sync::Arc<crate::instance::Instance>,
    device: Option<std::sync::Arc<crate::device::Device>>,
    globals: &'a mut crate::rules::GlobalRuleContext,
    primary_handle: u64,
    additional_info: crate::rules::AdditionalInfo,
) -> crate::rules::Context<'a> {
    crate::rules::Context {
        logger: &instance.logger,
        instance: instance.clone(),
        device,
        command_buffer_handle: None,
        command_buffer: None,
        globals,
        additional_info,
        primary_handle,
        locals: std::collections::HashMap::new(),
        reduction_stack: Vec::new(),
        canceled: false,
        overrides: Vec::new(),
        creation_callbacks: Vec::new(),
        custom_tag: None,
    }
}
