//! The static struct-layout table (component B): for a closed set of
//! `Vk*CreateInfo` structs (plus the synthetic structs in
//! [`crate::reflection::custom_structs`]), every member's name, type,
//! pointer/array-ness, array-length member name, and byte offset.
//!
//! Field `name`s are the *rule-facing* Vulkan C names (`pDepthStencilState`,
//! `depthCompareOp`, …) exactly as they appear in the original struct
//! definitions, since that is what rule authors write in path expressions.
//! Offsets are computed against `ash`'s (Rust-cased) field names with
//! [`memoffset::offset_of`], so a layout change in `ash` is caught by the
//! compiler rather than silently producing a wrong offset.

use memoffset::offset_of;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use ash::vk;

use super::custom_structs::{VkCmdDraw, VkCmdDrawIndexed, VkCommandBufferState};

/// The type of a primitive leaf, or a named enum/flags type, or a further
/// struct to descend into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Bool32,
    Handle,
    /// Named enum type, resolved against [`super::enums::enum_values`].
    Enum(&'static str),
    /// Named bitmask/flags type, same enum-value table as `Enum` but
    /// `assign` accepts `|`-chains of identifiers.
    Flags(&'static str),
    /// A further struct to descend into; cannot be returned as a leaf.
    Struct(&'static str),
}

/// How a field is stored relative to its offset.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Stored inline, by value.
    Value(FieldType),
    /// A pointer to a single value of this type (`->field` dereferences it).
    Pointer(FieldType),
    /// A pointer to a contiguous array of `element`, whose length is given
    /// by the sibling field named `length_field`. `pointer` is `true` when
    /// the member itself is a pointer (e.g. `pScissors`), `false` when it is
    /// an inline fixed-size array.
    Array {
        element: FieldType,
        length_field: &'static str,
        pointer: bool,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub offset: usize,
    pub kind: FieldKind,
}

#[derive(Debug)]
pub struct StructDescriptor {
    pub name: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl StructDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

macro_rules! descriptor {
    ($name:expr, [$($f:expr),* $(,)?]) => {
        StructDescriptor { name: $name, fields: &[$($f),*] }
    };
}

static EXTENT2D: StructDescriptor = descriptor!(
    "VkExtent2D",
    [
        FieldDescriptor { name: "width", offset: offset_of!(vk::Extent2D, width), kind: FieldKind::Value(FieldType::U32) },
        FieldDescriptor { name: "height", offset: offset_of!(vk::Extent2D, height), kind: FieldKind::Value(FieldType::U32) },
    ]
);

static EXTENT3D: StructDescriptor = descriptor!(
    "VkExtent3D",
    [
        FieldDescriptor { name: "width", offset: offset_of!(vk::Extent3D, width), kind: FieldKind::Value(FieldType::U32) },
        FieldDescriptor { name: "height", offset: offset_of!(vk::Extent3D, height), kind: FieldKind::Value(FieldType::U32) },
        FieldDescriptor { name: "depth", offset: offset_of!(vk::Extent3D, depth), kind: FieldKind::Value(FieldType::U32) },
    ]
);

static OFFSET2D: StructDescriptor = descriptor!(
    "VkOffset2D",
    [
        FieldDescriptor { name: "x", offset: offset_of!(vk::Offset2D, x), kind: FieldKind::Value(FieldType::I32) },
        FieldDescriptor { name: "y", offset: offset_of!(vk::Offset2D, y), kind: FieldKind::Value(FieldType::I32) },
    ]
);

static RECT2D: StructDescriptor = descriptor!(
    "VkRect2D",
    [
        FieldDescriptor { name: "offset", offset: offset_of!(vk::Rect2D, offset), kind: FieldKind::Value(FieldType::Struct("VkOffset2D")) },
        FieldDescriptor { name: "extent", offset: offset_of!(vk::Rect2D, extent), kind: FieldKind::Value(FieldType::Struct("VkExtent2D")) },
    ]
);

static PIPELINE_DEPTH_STENCIL_STATE: StructDescriptor = descriptor!(
    "VkPipelineDepthStencilStateCreateInfo",
    [
        FieldDescriptor {
            name: "depthTestEnable",
            offset: offset_of!(vk::PipelineDepthStencilStateCreateInfo, depth_test_enable),
            kind: FieldKind::Value(FieldType::Bool32),
        },
        FieldDescriptor {
            name: "depthWriteEnable",
            offset: offset_of!(vk::PipelineDepthStencilStateCreateInfo, depth_write_enable),
            kind: FieldKind::Value(FieldType::Bool32),
        },
        FieldDescriptor {
            name: "depthCompareOp",
            offset: offset_of!(vk::PipelineDepthStencilStateCreateInfo, depth_compare_op),
            kind: FieldKind::Value(FieldType::Enum("VkCompareOp")),
        },
    ]
);

static PIPELINE_VIEWPORT_STATE: StructDescriptor = descriptor!(
    "VkPipelineViewportStateCreateInfo",
    [
        FieldDescriptor {
            name: "viewportCount",
            offset: offset_of!(vk::PipelineViewportStateCreateInfo, viewport_count),
            kind: FieldKind::Value(FieldType::U32),
        },
        FieldDescriptor {
            name: "scissorCount",
            offset: offset_of!(vk::PipelineViewportStateCreateInfo, scissor_count),
            kind: FieldKind::Value(FieldType::U32),
        },
        FieldDescriptor {
            name: "pScissors",
            offset: offset_of!(vk::PipelineViewportStateCreateInfo, p_scissors),
            kind: FieldKind::Array { element: FieldType::Struct("VkRect2D"), length_field: "scissorCount", pointer: true },
        },
    ]
);

static GRAPHICS_PIPELINE_CREATE_INFO: StructDescriptor = descriptor!(
    "VkGraphicsPipelineCreateInfo",
    [
        FieldDescriptor {
            name: "stageCount",
            offset: offset_of!(vk::GraphicsPipelineCreateInfo, stage_count),
            kind: FieldKind::Value(FieldType::U32),
        },
        FieldDescriptor {
            name: "pViewportState",
            offset: offset_of!(vk::GraphicsPipelineCreateInfo, p_viewport_state),
            kind: FieldKind::Pointer(FieldType::Struct("VkPipelineViewportStateCreateInfo")),
        },
        FieldDescriptor {
            name: "pDepthStencilState",
            offset: offset_of!(vk::GraphicsPipelineCreateInfo, p_depth_stencil_state),
            kind: FieldKind::Pointer(FieldType::Struct("VkPipelineDepthStencilStateCreateInfo")),
        },
    ]
);

static IMAGE_CREATE_INFO: StructDescriptor = descriptor!(
    "VkImageCreateInfo",
    [
        FieldDescriptor { name: "format", offset: offset_of!(vk::ImageCreateInfo, format), kind: FieldKind::Value(FieldType::Enum("VkFormat")) },
        FieldDescriptor { name: "extent", offset: offset_of!(vk::ImageCreateInfo, extent), kind: FieldKind::Value(FieldType::Struct("VkExtent3D")) },
        FieldDescriptor { name: "mipLevels", offset: offset_of!(vk::ImageCreateInfo, mip_levels), kind: FieldKind::Value(FieldType::U32) },
        FieldDescriptor { name: "arrayLayers", offset: offset_of!(vk::ImageCreateInfo, array_layers), kind: FieldKind::Value(FieldType::U32) },
    ]
);

static BUFFER_CREATE_INFO: StructDescriptor = descriptor!(
    "VkBufferCreateInfo",
    [
        FieldDescriptor { name: "size", offset: offset_of!(vk::BufferCreateInfo, size), kind: FieldKind::Value(FieldType::U64) },
        FieldDescriptor { name: "usage", offset: offset_of!(vk::BufferCreateInfo, usage), kind: FieldKind::Value(FieldType::Flags("VkBufferUsageFlags")) },
    ]
);

static BUFFER_IMAGE_COPY: StructDescriptor = descriptor!(
    "VkBufferImageCopy",
    [
        FieldDescriptor { name: "bufferOffset", offset: offset_of!(vk::BufferImageCopy, buffer_offset), kind: FieldKind::Value(FieldType::U64) },
        FieldDescriptor { name: "bufferRowLength", offset: offset_of!(vk::BufferImageCopy, buffer_row_length), kind: FieldKind::Value(FieldType::U32) },
        FieldDescriptor { name: "bufferImageHeight", offset: offset_of!(vk::BufferImageCopy, buffer_image_height), kind: FieldKind::Value(FieldType::U32) },
        FieldDescriptor { name: "imageOffset", offset: offset_of!(vk::BufferImageCopy, image_offset), kind: FieldKind::Value(FieldType::Struct("VkOffset3D")) },
        FieldDescriptor { name: "imageExtent", offset: offset_of!(vk::BufferImageCopy, image_extent), kind: FieldKind::Value(FieldType::Struct("VkExtent3D")) },
    ]
);

static OFFSET3D: StructDescriptor = descriptor!(
    "VkOffset3D",
    [
        FieldDescriptor { name: "x", offset: offset_of!(vk::Offset3D, x), kind: FieldKind::Value(FieldType::I32) },
        FieldDescriptor { name: "y", offset: offset_of!(vk::Offset3D, y), kind: FieldKind::Value(FieldType::I32) },
        FieldDescriptor { name: "z", offset: offset_of!(vk::Offset3D, z), kind: FieldKind::Value(FieldType::I32) },
    ]
);

static CMD_DRAW: StructDescriptor = descriptor!(
    "VkCmdDraw",
    [
        FieldDescriptor { name: "vertexCount", offset: offset_of!(VkCmdDraw, vertex_count), kind: FieldKind::Value(FieldType::U32) },
        FieldDescriptor { name: "instanceCount", offset: offset_of!(VkCmdDraw, instance_count), kind: FieldKind::Value(FieldType::U32) },
        FieldDescriptor { name: "firstVertex", offset: offset_of!(VkCmdDraw, first_vertex), kind: FieldKind::Value(FieldType::U32) },
        FieldDescriptor { name: "firstInstance", offset: offset_of!(VkCmdDraw, first_instance), kind: FieldKind::Value(FieldType::U32) },
    ]
);

static CMD_DRAW_INDEXED: StructDescriptor = descriptor!(
    "VkCmdDrawIndexed",
    [
        FieldDescriptor { name: "indexCount", offset: offset_of!(VkCmdDrawIndexed, index_count), kind: FieldKind::Value(FieldType::U32) },
        FieldDescriptor { name: "instanceCount", offset: offset_of!(VkCmdDrawIndexed, instance_count), kind: FieldKind::Value(FieldType::U32) },
        FieldDescriptor { name: "firstIndex", offset: offset_of!(VkCmdDrawIndexed, first_index), kind: FieldKind::Value(FieldType::U32) },
        FieldDescriptor { name: "vertexOffset", offset: offset_of!(VkCmdDrawIndexed, vertex_offset), kind: FieldKind::Value(FieldType::I32) },
        FieldDescriptor { name: "firstInstance", offset: offset_of!(VkCmdDrawIndexed, first_instance), kind: FieldKind::Value(FieldType::U32) },
    ]
);

static COMMAND_BUFFER_STATE: StructDescriptor = descriptor!(
    "VkCommandBufferState",
    [
        FieldDescriptor { name: "boundPipeline", offset: offset_of!(VkCommandBufferState, bound_pipeline), kind: FieldKind::Value(FieldType::Handle) },
        FieldDescriptor { name: "boundIndexBuffer", offset: offset_of!(VkCommandBufferState, bound_index_buffer), kind: FieldKind::Value(FieldType::Handle) },
        FieldDescriptor { name: "scissorCount", offset: offset_of!(VkCommandBufferState, scissor_count), kind: FieldKind::Value(FieldType::U32) },
        FieldDescriptor { name: "currentRenderPass", offset: offset_of!(VkCommandBufferState, current_render_pass), kind: FieldKind::Value(FieldType::Handle) },
        FieldDescriptor { name: "currentFramebuffer", offset: offset_of!(VkCommandBufferState, current_framebuffer), kind: FieldKind::Value(FieldType::Handle) },
    ]
);

/// All struct descriptors, keyed by their rule-facing Vulkan type name.
pub static STRUCTS: Lazy<HashMap<&'static str, &'static StructDescriptor>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for d in [
        &EXTENT2D,
        &EXTENT3D,
        &OFFSET2D,
        &OFFSET3D,
        &RECT2D,
        &PIPELINE_DEPTH_STENCIL_STATE,
        &PIPELINE_VIEWPORT_STATE,
        &GRAPHICS_PIPELINE_CREATE_INFO,
        &IMAGE_CREATE_INFO,
        &BUFFER_CREATE_INFO,
        &BUFFER_IMAGE_COPY,
        &CMD_DRAW,
        &CMD_DRAW_INDEXED,
        &COMMAND_BUFFER_STATE,
    ] {
        m.insert(d.name, d);
    }
    m
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_struct() {
        let d = STRUCTS.get("VkGraphicsPipelineCreateInfo").unwrap();
        assert!(d.field("pDepthStencilState").is_some());
        assert!(d.field("doesNotExist").is_none());
    }

    #[test]
    fn depth_stencil_field_is_enum() {
        let d = STRUCTS.get("VkPipelineDepthStencilStateCreateInfo").unwrap();
        let f = d.field("depthCompareOp").unwrap();
        assert!(matches!(f.kind, FieldKind::Value(FieldType::Enum("VkCompareOp"))));
    }
}
