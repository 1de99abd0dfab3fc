//! Named-value tables for Vulkan enum and flag-bits types, used by
//! `get_string` (render) and `assign` (parse `VK_COMPARE_OP_ALWAYS` etc.).

use once_cell::sync::Lazy;
use std::collections::HashMap;

use ash::vk;

static COMPARE_OP: &[(i32, &str)] = &[
    (vk::CompareOp::NEVER.as_raw(), "VK_COMPARE_OP_NEVER"),
    (vk::CompareOp::LESS.as_raw(), "VK_COMPARE_OP_LESS"),
    (vk::CompareOp::EQUAL.as_raw(), "VK_COMPARE_OP_EQUAL"),
    (vk::CompareOp::LESS_OR_EQUAL.as_raw(), "VK_COMPARE_OP_LESS_OR_EQUAL"),
    (vk::CompareOp::GREATER.as_raw(), "VK_COMPARE_OP_GREATER"),
    (vk::CompareOp::NOT_EQUAL.as_raw(), "VK_COMPARE_OP_NOT_EQUAL"),
    (vk::CompareOp::GREATER_OR_EQUAL.as_raw(), "VK_COMPARE_OP_GREATER_OR_EQUAL"),
    (vk::CompareOp::ALWAYS.as_raw(), "VK_COMPARE_OP_ALWAYS"),
];

static FORMAT: &[(i32, &str)] = &[
    (vk::Format::R8G8B8A8_UNORM.as_raw(), "VK_FORMAT_R8G8B8A8_UNORM"),
    (vk::Format::R8G8B8A8_SRGB.as_raw(), "VK_FORMAT_R8G8B8A8_SRGB"),
    (vk::Format::B8G8R8A8_UNORM.as_raw(), "VK_FORMAT_B8G8R8A8_UNORM"),
    (vk::Format::BC1_RGBA_UNORM_BLOCK.as_raw(), "VK_FORMAT_BC1_RGBA_UNORM_BLOCK"),
    (vk::Format::BC3_UNORM_BLOCK.as_raw(), "VK_FORMAT_BC3_UNORM_BLOCK"),
    (vk::Format::BC4_UNORM_BLOCK.as_raw(), "VK_FORMAT_BC4_UNORM_BLOCK"),
    (vk::Format::BC5_UNORM_BLOCK.as_raw(), "VK_FORMAT_BC5_UNORM_BLOCK"),
    (vk::Format::BC7_UNORM_BLOCK.as_raw(), "VK_FORMAT_BC7_UNORM_BLOCK"),
];

static BUFFER_USAGE_FLAGS: &[(i32, &str)] = &[
    (vk::BufferUsageFlags::TRANSFER_SRC.as_raw(), "VK_BUFFER_USAGE_TRANSFER_SRC_BIT"),
    (vk::BufferUsageFlags::TRANSFER_DST.as_raw(), "VK_BUFFER_USAGE_TRANSFER_DST_BIT"),
    (vk::BufferUsageFlags::VERTEX_BUFFER.as_raw(), "VK_BUFFER_USAGE_VERTEX_BUFFER_BIT"),
    (vk::BufferUsageFlags::INDEX_BUFFER.as_raw(), "VK_BUFFER_USAGE_INDEX_BUFFER_BIT"),
    (vk::BufferUsageFlags::UNIFORM_BUFFER.as_raw(), "VK_BUFFER_USAGE_UNIFORM_BUFFER_BIT"),
    (vk::BufferUsageFlags::STORAGE_BUFFER.as_raw(), "VK_BUFFER_USAGE_STORAGE_BUFFER_BIT"),
];

/// All enum/flags tables, keyed by their rule-facing Vulkan type name.
pub static ENUMS: Lazy<HashMap<&'static str, &'static [(i32, &'static str)]>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("VkCompareOp", COMPARE_OP);
    m.insert("VkFormat", FORMAT);
    m.insert("VkBufferUsageFlags", BUFFER_USAGE_FLAGS);
    m
});

/// Looks up the canonical name for a raw enum/flag-bit value.
pub fn name_of(type_name: &str, raw: i32) -> Option<&'static str> {
    ENUMS
        .get(type_name)
        .and_then(|values| values.iter().find(|(v, _)| *v == raw))
        .map(|(_, name)| *name)
}

/// Looks up the raw value for a canonical enum/flag-bit identifier.
pub fn value_of(type_name: &str, name: &str) -> Option<i32> {
    ENUMS
        .get(type_name)
        .and_then(|values| values.iter().find(|(_, n)| *n == name))
        .map(|(v, _)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_name_and_value() {
        let raw = value_of("VkCompareOp", "VK_COMPARE_OP_ALWAYS").unwrap();
        assert_eq!(name_of("VkCompareOp", raw), Some("VK_COMPARE_OP_ALWAYS"));
    }

    #[test]
    fn unknown_identifier_is_none() {
        assert_eq!(value_of("VkCompareOp", "VK_COMPARE_OP_BOGUS"), None);
    }
}
