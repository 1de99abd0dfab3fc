//! The reflection registry (component B): a static table of struct layouts
//! and enum value maps, a path parser, and typed `get`/`set`/`assign` over
//! raw `Vk*CreateInfo` pointers.
//!
//! All `unsafe` pointer arithmetic in the crate is centralised here, behind
//! the safe `get`/`set`/`assign`/`get_string`/`get_type` boundary, per the
//! design note that raw struct walks "must remain `unsafe` but should be
//! centralised in one small module with `debug_assert`-backed invariants".

pub mod custom_structs;
pub mod enums;
pub mod path;
pub mod tables;

use std::mem::size_of;

use ash::vk;

use crate::rules::data::Value;
use crate::Error;
use path::Accessor;
use tables::{FieldDescriptor, FieldKind, FieldType, STRUCTS};

/// Cursor state while walking a path against a live struct instance.
enum Cursor<'a> {
    /// Positioned at the start of a struct instance, ready for a `.field`/
    /// first bare-field access.
    Struct { base: *mut u8, name: &'a str },
    /// Positioned at a pointer-typed field, not yet dereferenced; the next
    /// accessor must be `Deref`.
    PointerSlot { slot_addr: *mut u8, pointee_type: &'a str },
    /// Positioned at an array-typed field, not yet indexed; the next
    /// accessor must be `Index`.
    ArraySlot {
        owner_base: *mut u8,
        owner_name: &'a str,
        field: &'static FieldDescriptor,
    },
    /// Positioned at a primitive leaf.
    Leaf { ptr: *mut u8, ty: FieldType },
}

fn struct_desc(name: &str, path: &str) -> Result<&'static tables::StructDescriptor, Error> {
    STRUCTS.get(name).copied().ok_or_else(|| Error::ReflectionError {
        path: path.to_owned(),
        type_name: name.to_owned(),
        message: format!("unknown struct type `{}`", name),
    })
}

fn find_field<'a>(
    desc: &'a tables::StructDescriptor,
    name: &str,
    path: &str,
) -> Result<&'a FieldDescriptor, Error> {
    desc.field(name).ok_or_else(|| Error::ReflectionError {
        path: path.to_owned(),
        type_name: desc.name.to_owned(),
        message: format!("struct `{}` has no member `{}`", desc.name, name),
    })
}

/// Byte size of a struct named by the reflection tables. Kept as a small
/// match rather than stored per-descriptor, since `size_of` is already a
/// compile-time fact for every type the tables reference.
fn struct_byte_size(name: &str) -> usize {
    match name {
        "VkExtent2D" => size_of::<vk::Extent2D>(),
        "VkExtent3D" => size_of::<vk::Extent3D>(),
        "VkOffset2D" => size_of::<vk::Offset2D>(),
        "VkOffset3D" => size_of::<vk::Offset3D>(),
        "VkRect2D" => size_of::<vk::Rect2D>(),
        "VkPipelineDepthStencilStateCreateInfo" => size_of::<vk::PipelineDepthStencilStateCreateInfo>(),
        "VkPipelineViewportStateCreateInfo" => size_of::<vk::PipelineViewportStateCreateInfo>(),
        "VkGraphicsPipelineCreateInfo" => size_of::<vk::GraphicsPipelineCreateInfo>(),
        "VkImageCreateInfo" => size_of::<vk::ImageCreateInfo>(),
        "VkBufferCreateInfo" => size_of::<vk::BufferCreateInfo>(),
        "VkBufferImageCopy" => size_of::<vk::BufferImageCopy>(),
        "VkCmdDraw" => size_of::<custom_structs::VkCmdDraw>(),
        "VkCmdDrawIndexed" => size_of::<custom_structs::VkCmdDrawIndexed>(),
        "VkCommandBufferState" => size_of::<custom_structs::VkCommandBufferState>(),
        _ => 0,
    }
}

fn field_type_byte_size(ty: FieldType) -> usize {
    match ty {
        FieldType::I8 | FieldType::U8 => 1,
        FieldType::I16 | FieldType::U16 => 2,
        FieldType::I32 | FieldType::U32 | FieldType::F32 | FieldType::Bool32 => 4,
        FieldType::I64 | FieldType::U64 | FieldType::F64 | FieldType::Handle => 8,
        FieldType::Enum(_) | FieldType::Flags(_) => 4,
        FieldType::Struct(name) => struct_byte_size(name),
    }
}

/// Advances a [`Struct`](Cursor::Struct) cursor through a `.field`
/// (`Accessor::Field`) access, without touching memory — used by both the
/// live walk and `get_type`.
fn step_field<'a>(
    path: &str,
    base: *mut u8,
    struct_name: &'a str,
    field_name: &str,
) -> Result<Cursor<'a>, Error> {
    let desc = struct_desc(struct_name, path)?;
    let field = find_field(desc, field_name, path)?;
    let field_addr = unsafe { base.add(field.offset) };
    Ok(match field.kind {
        FieldKind::Value(FieldType::Struct(s)) => Cursor::Struct { base: field_addr, name: s },
        FieldKind::Value(ty) => Cursor::Leaf { ptr: field_addr, ty },
        FieldKind::Pointer(FieldType::Struct(s)) => {
            Cursor::PointerSlot { slot_addr: field_addr, pointee_type: s }
        }
        FieldKind::Pointer(ty) => Cursor::Leaf { ptr: field_addr, ty },
        FieldKind::Array { .. } => Cursor::ArraySlot { owner_base: base, owner_name: struct_name, field },
    })
}

fn step_deref<'a>(
    path: &str,
    slot_addr: *mut u8,
    pointee_type: &'a str,
    field_name: &str,
) -> Result<Cursor<'a>, Error> {
    let raw_ptr = unsafe { *(slot_addr as *const *mut u8) };
    if raw_ptr.is_null() {
        return Err(Error::ReflectionError {
            path: path.to_owned(),
            type_name: pointee_type.to_owned(),
            message: "dereferenced a null pointer member".to_owned(),
        });
    }
    step_field(path, raw_ptr, pointee_type, field_name)
}

fn step_index<'a>(
    path: &str,
    owner_base: *mut u8,
    owner_name: &'a str,
    field: &'static FieldDescriptor,
    idx: usize,
) -> Result<Cursor<'a>, Error> {
    let FieldKind::Array { element, length_field, pointer } = field.kind else {
        unreachable!("ArraySlot always carries an Array field");
    };
    let owner_desc = struct_desc(owner_name, path)?;
    let length_desc = find_field(owner_desc, length_field, path)?;
    let length_value = unsafe { *(owner_base.add(length_desc.offset) as *const u32) };
    if idx >= length_value as usize {
        return Err(Error::ReflectionError {
            path: path.to_owned(),
            type_name: owner_name.to_owned(),
            message: format!(
                "array index {} for member \"{}\" exceeds its length of {} which can be found in member \"{}\"",
                idx, field.name, length_value, length_field
            ),
        });
    }
    let array_base = if pointer {
        unsafe { *(owner_base.add(field.offset) as *const *mut u8) }
    } else {
        unsafe { owner_base.add(field.offset) }
    };
    let element_size = field_type_byte_size(element);
    let element_addr = unsafe { array_base.add(idx * element_size) };
    Ok(match element {
        FieldType::Struct(s) => Cursor::Struct { base: element_addr, name: s },
        ty => Cursor::Leaf { ptr: element_addr, ty },
    })
}

fn walk<'a>(path: &str, accessors: &[Accessor], root_ptr: *mut u8, root_type: &'a str) -> Result<Cursor<'a>, Error> {
    let mut cursor = Cursor::Struct { base: root_ptr, name: root_type };
    for accessor in accessors {
        cursor = match (cursor, accessor) {
            (Cursor::Struct { base, name }, Accessor::Field(f)) => step_field(path, base, name, f)?,
            (Cursor::PointerSlot { slot_addr, pointee_type }, Accessor::Deref(f)) => {
                step_deref(path, slot_addr, pointee_type, f)?
            }
            (Cursor::ArraySlot { owner_base, owner_name, field }, Accessor::Index(i)) => {
                step_index(path, owner_base, owner_name, field, *i)?
            }
            (cur, accessor) => {
                return Err(Error::ReflectionError {
                    path: path.to_owned(),
                    type_name: root_type.to_owned(),
                    message: format!("accessor {:?} not valid at this point in the path ({})", accessor, cursor_kind(&cur)),
                })
            }
        };
    }
    Ok(cursor)
}

fn cursor_kind(cursor: &Cursor) -> &'static str {
    match cursor {
        Cursor::Struct { .. } => "expected `.field`",
        Cursor::PointerSlot { .. } => "expected `->field`",
        Cursor::ArraySlot { .. } => "expected `[index]`",
        Cursor::Leaf { .. } => "path already reached a leaf",
    }
}

unsafe fn read_leaf(ptr: *const u8, ty: FieldType) -> Value {
    match ty {
        FieldType::I8 => Value::Number(*(ptr as *const i8) as f64),
        FieldType::U8 => Value::Number(*(ptr as *const u8) as f64),
        FieldType::I16 => Value::Number(*(ptr as *const i16) as f64),
        FieldType::U16 => Value::Number(*(ptr as *const u16) as f64),
        FieldType::I32 => Value::Number(*(ptr as *const i32) as f64),
        FieldType::U32 => Value::Number(*(ptr as *const u32) as f64),
        FieldType::I64 => Value::Number(*(ptr as *const i64) as f64),
        FieldType::U64 => Value::Number(*(ptr as *const u64) as f64),
        FieldType::F32 => Value::Number(*(ptr as *const f32) as f64),
        FieldType::F64 => Value::Number(*(ptr as *const f64)),
        FieldType::Bool32 => Value::Number(if *(ptr as *const u32) != 0 { 1.0 } else { 0.0 }),
        FieldType::Enum(_) | FieldType::Flags(_) => Value::Number(*(ptr as *const i32) as f64),
        FieldType::Handle => Value::Handle(*(ptr as *const u64)),
        FieldType::Struct(_) => unreachable!("structs are not leaves"),
    }
}

unsafe fn write_leaf(ptr: *mut u8, ty: FieldType, value: &Value) -> Result<(), Error> {
    let as_number = |v: &Value| -> Option<f64> {
        match v {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    };
    match ty {
        FieldType::I8 => *(ptr as *mut i8) = as_number(value).ok_or_else(type_err)? as i8,
        FieldType::U8 => *(ptr as *mut u8) = as_number(value).ok_or_else(type_err)? as u8,
        FieldType::I16 => *(ptr as *mut i16) = as_number(value).ok_or_else(type_err)? as i16,
        FieldType::U16 => *(ptr as *mut u16) = as_number(value).ok_or_else(type_err)? as u16,
        FieldType::I32 => *(ptr as *mut i32) = as_number(value).ok_or_else(type_err)? as i32,
        FieldType::U32 => *(ptr as *mut u32) = as_number(value).ok_or_else(type_err)? as u32,
        FieldType::I64 => *(ptr as *mut i64) = as_number(value).ok_or_else(type_err)? as i64,
        FieldType::U64 => *(ptr as *mut u64) = as_number(value).ok_or_else(type_err)? as u64,
        FieldType::F32 => *(ptr as *mut f32) = as_number(value).ok_or_else(type_err)? as f32,
        FieldType::F64 => *(ptr as *mut f64) = as_number(value).ok_or_else(type_err)?,
        FieldType::Bool32 => {
            *(ptr as *mut u32) = if as_number(value).ok_or_else(type_err)? != 0.0 { 1 } else { 0 }
        }
        FieldType::Enum(_) | FieldType::Flags(_) => {
            *(ptr as *mut i32) = as_number(value).ok_or_else(type_err)? as i32
        }
        FieldType::Handle => {
            let Value::Handle(h) = value else { return Err(type_err()) };
            *(ptr as *mut u64) = *h;
        }
        FieldType::Struct(_) => unreachable!("structs are not leaves"),
    }
    Ok(())
}

fn type_err() -> Error {
    Error::ReflectionError {
        path: String::new(),
        type_name: String::new(),
        message: "value does not match the leaf's static type".to_owned(),
    }
}

/// Walks `path` from `root_ptr` (a pointer to a live `root_type` instance)
/// and reads the primitive leaf it names.
///
/// # Safety
/// `root_ptr` must point to a live, correctly-typed instance of `root_type`
/// for the lifetime of the call.
pub unsafe fn get(path: &str, root_ptr: *mut u8, root_type: &str) -> Result<Value, Error> {
    let accessors = path::parse_path(path)?;
    match walk(path, &accessors, root_ptr, root_type)? {
        Cursor::Leaf { ptr, ty } => Ok(read_leaf(ptr, ty)),
        cur => Err(Error::ReflectionError {
            path: path.to_owned(),
            type_name: root_type.to_owned(),
            message: format!("path does not reach a primitive leaf ({})", cursor_kind(&cur)),
        }),
    }
}

/// The static companion of [`get`]: resolves `path`'s leaf type without
/// touching any memory.
pub fn get_type(path: &str, root_type: &str) -> Result<FieldType, Error> {
    let accessors = path::parse_path(path)?;
    let mut cursor = Cursor::Struct { base: std::ptr::null_mut(), name: root_type };
    for accessor in &accessors {
        cursor = match (cursor, accessor) {
            (Cursor::Struct { base, name }, Accessor::Field(f)) => step_field(path, base, name, f)?,
            (Cursor::PointerSlot { slot_addr, pointee_type }, Accessor::Deref(f)) => {
                // Type-only walk: no pointer is actually dereferenced, the
                // pointee's type is already static metadata.
                step_field(path, slot_addr, pointee_type, f)?
            }
            (Cursor::ArraySlot { field, .. }, Accessor::Index(_)) => {
                let FieldKind::Array { element, .. } = field.kind else { unreachable!() };
                match element {
                    FieldType::Struct(s) => Cursor::Struct { base: std::ptr::null_mut(), name: s },
                    ty => Cursor::Leaf { ptr: std::ptr::null_mut(), ty },
                }
            }
            (cur, accessor) => {
                return Err(Error::ReflectionError {
                    path: path.to_owned(),
                    type_name: root_type.to_owned(),
                    message: format!("accessor {:?} not valid at this point in the path ({})", accessor, cursor_kind(&cur)),
                })
            }
        };
    }
    match cursor {
        Cursor::Leaf { ty, .. } => Ok(ty),
        cur => Err(Error::ReflectionError {
            path: path.to_owned(),
            type_name: root_type.to_owned(),
            message: format!("path does not reach a primitive leaf ({})", cursor_kind(&cur)),
        }),
    }
}

/// Inverse of [`get`] for primitive leaves.
///
/// # Safety
/// Same contract as [`get`].
pub unsafe fn set(path: &str, root_ptr: *mut u8, root_type: &str, value: &Value) -> Result<(), Error> {
    let accessors = path::parse_path(path)?;
    match walk(path, &accessors, root_ptr, root_type)? {
        Cursor::Leaf { ptr, ty } => write_leaf(ptr, ty, value),
        cur => Err(Error::ReflectionError {
            path: path.to_owned(),
            type_name: root_type.to_owned(),
            message: format!("path does not reach a primitive leaf ({})", cursor_kind(&cur)),
        }),
    }
}

/// Renders the primitive/enum/boolean leaf at `path` to its canonical
/// textual form (`VK_COMPARE_OP_ALWAYS`, `VK_TRUE`, `42`, …).
///
/// # Safety
/// Same contract as [`get`].
pub unsafe fn get_string(path: &str, root_ptr: *mut u8, root_type: &str) -> Result<String, Error> {
    let accessors = path::parse_path(path)?;
    let (ptr, ty) = match walk(path, &accessors, root_ptr, root_type)? {
        Cursor::Leaf { ptr, ty } => (ptr, ty),
        cur => {
            return Err(Error::ReflectionError {
                path: path.to_owned(),
                type_name: root_type.to_owned(),
                message: format!("path does not reach a primitive leaf ({})", cursor_kind(&cur)),
            })
        }
    };
    Ok(match ty {
        FieldType::Bool32 => {
            if *(ptr as *const u32) != 0 { "VK_TRUE".to_owned() } else { "VK_FALSE".to_owned() }
        }
        FieldType::Enum(type_name) | FieldType::Flags(type_name) => {
            let raw = *(ptr as *const i32);
            enums::name_of(type_name, raw).map(str::to_owned).unwrap_or_else(|| raw.to_string())
        }
        FieldType::F32 => (*(ptr as *const f32)).to_string(),
        FieldType::F64 => (*(ptr as *const f64)).to_string(),
        FieldType::Handle => (*(ptr as *const u64)).to_string(),
        other => match read_leaf(ptr, other) {
            Value::Number(n) => {
                if n.fract() == 0.0 { format!("{}", n as i64) } else { n.to_string() }
            }
            _ => unreachable!(),
        },
    })
}

/// Parses `LHS = RHS` and applies it to the struct at `root_ptr`. `RHS` is
/// evaluated against the static type of `LHS` (integer/float literals,
/// `VK_TRUE`/`VK_FALSE`, an enum identifier, or a `|`-chain of flag
/// identifiers with an integer fallback for unrecognised terms).
///
/// # Safety
/// Same contract as [`get`].
pub unsafe fn assign(expression: &str, root_ptr: *mut u8, root_type: &str) -> Result<(), Error> {
    let (lhs, rhs) = expression.split_once('=').ok_or_else(|| Error::ParseError {
        file: "<assign>".to_owned(),
        line: 0,
        col: 0,
        message: format!("expected `LHS = RHS` in `{}`", expression),
    })?;
    let lhs = lhs.trim();
    let rhs = rhs.trim();
    let ty = get_type(lhs, root_type)?;
    let value = parse_rhs(rhs, ty)?;
    set(lhs, root_ptr, root_type, &value)
}

fn parse_rhs(rhs: &str, ty: FieldType) -> Result<Value, Error> {
    if rhs == "VK_TRUE" {
        return Ok(Value::Number(1.0));
    }
    if rhs == "VK_FALSE" {
        return Ok(Value::Number(0.0));
    }
    if let FieldType::Handle = ty {
        if let Ok(h) = rhs.trim_start_matches("0x").parse::<u64>() {
            return Ok(Value::Handle(h));
        }
    }
    if let (FieldType::Enum(type_name) | FieldType::Flags(type_name), false) = (ty, rhs.contains('|')) {
        if let Some(v) = enums::value_of(type_name, rhs) {
            return Ok(Value::Number(v as f64));
        }
    }
    if let FieldType::Flags(type_name) = ty {
        if rhs.contains('|') {
            let mut acc: i64 = 0;
            for term in rhs.split('|') {
                let term = term.trim();
                if let Some(v) = enums::value_of(type_name, term) {
                    acc |= v as i64;
                } else {
                    acc |= term.parse::<i64>().map_err(|_| Error::ParseError {
                        file: "<assign>".to_owned(),
                        line: 0,
                        col: 0,
                        message: format!("unrecognised flag term `{}`", term),
                    })?;
                }
            }
            return Ok(Value::Number(acc as f64));
        }
    }
    if let Ok(n) = rhs.parse::<f64>() {
        return Ok(Value::Number(n));
    }
    Err(Error::ParseError {
        file: "<assign>".to_owned(),
        line: 0,
        col: 0,
        message: format!("could not parse `{}` as a value of type {:?}", rhs, ty),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_compare_op_round_trips_through_set_and_get() {
        let mut info = vk::PipelineDepthStencilStateCreateInfo::default();
        let ptr = &mut info as *mut _ as *mut u8;
        unsafe {
            set("depthCompareOp", ptr, "VkPipelineDepthStencilStateCreateInfo", &Value::Number(
                vk::CompareOp::ALWAYS.as_raw() as f64,
            ))
            .unwrap();
            let v = get("depthCompareOp", ptr, "VkPipelineDepthStencilStateCreateInfo").unwrap();
            assert_eq!(v, Value::Number(vk::CompareOp::ALWAYS.as_raw() as f64));
        }
    }

    #[test]
    fn assign_is_idempotent_via_canonical_string() {
        let mut info = vk::PipelineDepthStencilStateCreateInfo {
            depth_compare_op: vk::CompareOp::LESS,
            ..Default::default()
        };
        let ptr = &mut info as *mut _ as *mut u8;
        unsafe {
            let s = get_string("depthCompareOp", ptr, "VkPipelineDepthStencilStateCreateInfo").unwrap();
            assert_eq!(s, "VK_COMPARE_OP_LESS");
            assign(&format!("depthCompareOp = {}", s), ptr, "VkPipelineDepthStencilStateCreateInfo").unwrap();
            assert_eq!(info.depth_compare_op, vk::CompareOp::LESS);
        }
    }

    #[test]
    fn assign_through_override_action_scenario() {
        // Concrete end-to-end scenario #3: override(pDepthStencilState->depthCompareOp, VK_COMPARE_OP_ALWAYS)
        let mut depth_stencil = vk::PipelineDepthStencilStateCreateInfo {
            depth_compare_op: vk::CompareOp::LESS,
            ..Default::default()
        };
        let mut pipeline_info = vk::GraphicsPipelineCreateInfo {
            p_depth_stencil_state: &depth_stencil,
            ..Default::default()
        };
        let ptr = &mut pipeline_info as *mut _ as *mut u8;
        unsafe {
            assign(
                "pDepthStencilState->depthCompareOp = VK_COMPARE_OP_ALWAYS",
                ptr,
                "VkGraphicsPipelineCreateInfo",
            )
            .unwrap();
        }
        assert_eq!(depth_stencil.depth_compare_op, vk::CompareOp::ALWAYS);
    }

    #[test]
    fn array_bounds_error_matches_scenario_four() {
        let scissors = [vk::Rect2D::default(), vk::Rect2D::default()];
        let viewport_state = vk::PipelineViewportStateCreateInfo {
            scissor_count: 2,
            p_scissors: scissors.as_ptr(),
            ..Default::default()
        };
        let ptr = &viewport_state as *const _ as *mut u8;
        let err = unsafe { get("pScissors[2].extent.width", ptr, "VkPipelineViewportStateCreateInfo") }.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("array index 2 for member \"pScissors\" exceeds its length of 2 which can be found in member \"scissorCount\""));
    }

    #[test]
    fn non_primitive_leaf_cannot_be_returned() {
        let info = vk::GraphicsPipelineCreateInfo::default();
        let ptr = &info as *const _ as *mut u8;
        let err = unsafe { get("pDepthStencilState", ptr, "VkGraphicsPipelineCreateInfo") };
        assert!(err.is_err());
    }
}
