//! The rule AST: selector types, the `Rule` node, and the `Condition` trait
//! (component C).

use crate::rules::action::BoxedAction;
use crate::rules::context::Context;
use crate::Error;

/// The closed set of selector types a rule can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorType {
    Image,
    Buffer,
    Shader,
    Draw,
    Pipeline,
    Init,
    Receive,
    DeviceCreate,
    DeviceDestroy,
    Present,
    SwapchainCreate,
    Custom,
}

impl SelectorType {
    pub fn name(self) -> &'static str {
        match self {
            SelectorType::Image => "image",
            SelectorType::Buffer => "buffer",
            SelectorType::Shader => "shader",
            SelectorType::Draw => "draw",
            SelectorType::Pipeline => "pipeline",
            SelectorType::Init => "init",
            SelectorType::Receive => "receive",
            SelectorType::DeviceCreate => "device_create",
            SelectorType::DeviceDestroy => "device_destroy",
            SelectorType::Present => "present",
            SelectorType::SwapchainCreate => "swapchain_create",
            SelectorType::Custom => "custom",
        }
    }

    pub fn from_name(name: &str) -> Option<SelectorType> {
        Some(match name {
            "image" => SelectorType::Image,
            "buffer" => SelectorType::Buffer,
            "shader" => SelectorType::Shader,
            "draw" => SelectorType::Draw,
            "pipeline" => SelectorType::Pipeline,
            "init" => SelectorType::Init,
            "receive" => SelectorType::Receive,
            "device_create" => SelectorType::DeviceCreate,
            "device_destroy" => SelectorType::DeviceDestroy,
            "present" => SelectorType::Present,
            "swapchain_create" => SelectorType::SwapchainCreate,
            "custom" => SelectorType::Custom,
            _ => return None,
        })
    }
}

/// A selector: a type plus (for `custom`) a routing tag matched by the
/// `custom(tag)` condition on the *firing* side, not here — the selector
/// itself only names the event class.
#[derive(Debug, Clone)]
pub struct Selector {
    pub ty: SelectorType,
}

/// A condition narrows a selector match. Evaluated against the firing
/// handle and context; `or`/`not`/`with`/`custom`/`hash`/`mark`/`compare`
/// all implement this.
pub trait Condition: Send + Sync {
    fn matches(&self, handle: u64, ctx: &mut Context) -> Result<bool, Error>;
}

pub type BoxedCondition = Box<dyn Condition>;

/// One parsed `selector { conditions } -> action` rule, plus the source
/// position it was parsed at (used in rule-error messages) and a runtime
/// `disabled` flag flipped by the `disable()` action.
pub struct Rule {
    pub selector: Selector,
    pub conditions: Vec<BoxedCondition>,
    pub action: BoxedAction,
    pub line: u32,
    pub col: u32,
    pub disabled: std::sync::atomic::AtomicBool,
}

impl Rule {
    /// All conditions must match (implicit conjunction within `{ }`).
    pub fn matches(&self, handle: u64, ctx: &mut Context) -> Result<bool, Error> {
        if self.disabled.load(std::sync::atomic::Ordering::Relaxed) {
            return Ok(false);
        }
        for c in &self.conditions {
            if !c.matches(handle, ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
