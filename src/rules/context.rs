//! Evaluation context for the rule evaluator (component D).

use std::collections::HashMap;
use std::sync::Arc;

use ash::vk;

use crate::device::Device;
use crate::instance::Instance;
use crate::logger::InstanceLogger;
use crate::rules::data::Value;
use crate::shadow::command_buffer::CommandBufferState;

/// Selector-type-specific payload carried alongside the common `Context`
/// fields. Spec calls this the `additional_info` variant.
pub enum AdditionalInfo {
    None,
    Draw { draw_struct_ptr: *mut u8, draw_struct_type: &'static str },
    Pipeline { create_info_ptr: *mut u8 },
    Swapchain { create_info_ptr: *mut u8 },
    Present { result: vk::Result },
    Receive { bytes: Vec<u8> },
}

impl AdditionalInfo {
    pub fn receive_bytes(&self) -> Option<&[u8]> {
        match self {
            AdditionalInfo::Receive { bytes } => Some(bytes),
            _ => None,
        }
    }
}

/// Global (instance-wide) rule context: marks, content hashes, global
/// variables, and the deferred-callback lists. Lives inside [`Instance`]
/// and is reached only through the instance lock.
#[derive(Default)]
pub struct GlobalRuleContext {
    pub marks: HashMap<u64, std::collections::HashSet<String>>,
    pub content_hashes: HashMap<u64, String>,
    pub variables: HashMap<String, Value>,
    pub on_end_command_buffer: HashMap<vk::CommandBuffer, Vec<crate::rules::action::BoxedAction>>,
    pub on_queue_submit: HashMap<vk::CommandBuffer, Vec<crate::rules::action::BoxedAction>>,
    pub on_end_render_pass: HashMap<vk::CommandBuffer, Vec<crate::rules::action::BoxedAction>>,
}

/// A scoped stack entry for nested `map`/`reduce` evaluation.
#[derive(Clone)]
pub struct ReductionFrame {
    pub current_element: Value,
    pub current_index: Option<usize>,
    pub current_reduction: Option<Value>,
}

/// Per-evaluation context passed to every condition/action/data-expression
/// node. Bundles the logger, active instance/device, command buffer state
/// when applicable, the selector payload, and the mutable rule-visible
/// slots (`canceled`, `overrides`, `creation_callbacks`, `custom_tag`) plus
/// scoped locals.
pub struct Context<'a> {
    pub logger: &'a InstanceLogger,
    pub instance: Arc<Instance>,
    pub device: Option<Arc<Device>>,
    pub command_buffer_handle: Option<vk::CommandBuffer>,
    pub command_buffer: Option<&'a mut CommandBufferState>,
    pub globals: &'a mut GlobalRuleContext,
    pub additional_info: AdditionalInfo,
    pub primary_handle: u64,
    pub locals: HashMap<String, Value>,
    pub reduction_stack: Vec<ReductionFrame>,
    pub canceled: bool,
    pub overrides: Vec<String>,
    pub creation_callbacks: Vec<Box<dyn FnOnce(u64) + Send>>,
    pub custom_tag: Option<String>,
}

impl<'a> Context<'a> {
    pub fn current_element(&self) -> Option<&Value> {
        self.reduction_stack.last().map(|f| &f.current_element)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.reduction_stack.last().and_then(|f| f.current_index)
    }

    pub fn current_reduction(&self) -> Option<&Value> {
        self.reduction_stack.last().and_then(|f| f.current_reduction.as_ref())
    }
}

/// RAII guard restoring a local variable's previous binding on scope exit,
/// matching every call-style action's save/restore discipline (including on
/// error paths, since `Drop` runs during unwinding too).
pub struct LocalScopeGuard<'a> {
    locals: &'a mut HashMap<String, Value>,
    name: String,
    previous: Option<Value>,
}

impl<'a> LocalScopeGuard<'a> {
    pub fn enter(locals: &'a mut HashMap<String, Value>, name: String, value: Value) -> Self {
        let previous = locals.insert(name.clone(), value);
        LocalScopeGuard { locals, name, previous }
    }
}

impl<'a> Drop for LocalScopeGuard<'a> {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(v) => {
                self.locals.insert(self.name.clone(), v);
            }
            None => {
                self.locals.remove(&self.name);
            }
        }
    }
}
