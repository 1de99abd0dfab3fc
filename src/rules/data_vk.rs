//! The two data expressions that reach into live Vulkan state:
//! `vkstruct(path)` (walks the selector's attached create-info/draw struct
//! via [`crate::reflection`]) and `vkdescriptor(set, binding, arr_index)`
//! (reads a bound descriptor out of the shadow descriptor-set store).

use crate::reflection;
use crate::rules::context::{AdditionalInfo, Context};
use crate::rules::data::{DataExpr, Value};
use crate::Error;

fn root_ptr_and_type(ctx: &Context) -> Result<(*mut u8, &'static str), Error> {
    match ctx.additional_info {
        AdditionalInfo::Draw { draw_struct_ptr, draw_struct_type } => Ok((draw_struct_ptr, draw_struct_type)),
        AdditionalInfo::Pipeline { create_info_ptr } => Ok((create_info_ptr, "VkGraphicsPipelineCreateInfo")),
        AdditionalInfo::Swapchain { create_info_ptr } => Ok((create_info_ptr, "VkSwapchainCreateInfoKHR")),
        _ => Err(Error::UnknownName {
            name: "vkstruct()".to_owned(),
            available: "only valid for draw/pipeline/swapchain_create selectors".to_owned(),
        }),
    }
}

/// `vkstruct(path)` — reflective read against the selector's attached
/// struct. `path` is a member-access expression like
/// `pDepthStencilState->depthCompareOp`.
pub struct VkStruct(pub String);
impl DataExpr for VkStruct {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        let (ptr, ty) = root_ptr_and_type(ctx)?;
        // SAFETY: `ptr` is the live create-info/draw struct the firing hook
        // attached to `additional_info` for the duration of this rule
        // evaluation; `ty` names its registered reflection descriptor.
        unsafe { reflection::get(&self.0, ptr, ty) }
    }
}

/// `vkdescriptor(set, binding, arr_index)` — the handle currently bound at
/// that descriptor slot, read from the shadow descriptor-set store attached
/// to the active command buffer.
pub struct VkDescriptor {
    pub set: u32,
    pub binding: u32,
    pub arr_index: u32,
}
impl DataExpr for VkDescriptor {
    fn eval(&self, ctx: &mut Context) -> Result<Value, Error> {
        let cb = ctx.command_buffer.as_deref().ok_or_else(|| Error::UnknownName {
            name: "vkdescriptor()".to_owned(),
            available: "only valid for draw selectors".to_owned(),
        })?;
        let device = ctx.device.as_deref().ok_or_else(|| Error::UnknownName {
            name: "vkdescriptor()".to_owned(),
            available: "only valid for draw selectors".to_owned(),
        })?;
        let handle = crate::shadow::command_buffer::resolve_bound_descriptor(
            cb,
            device,
            self.set,
            self.binding,
            self.arr_index,
        )
        .ok_or_else(|| Error::ReflectionError {
            path: format!("set {} binding {} [{}]", self.set, self.binding, self.arr_index),
            type_name: "descriptor".to_owned(),
            message: "no descriptor bound at that slot".to_owned(),
        })?;
        Ok(Value::Handle(handle))
    }
}
