//! Shadow descriptor-set state, grounded on `CheekyLayer::descriptor_state`/
//! `descriptor_binding`/`descriptor_element`.

use std::collections::BTreeMap;

use ash::vk;

use crate::rules::ast::SelectorType;

/// The two payload shapes a descriptor slot's native info can carry —
/// the Rust rendering of the original's `std::variant<BufferInfo, ImageInfo>`.
#[derive(Debug, Clone, Copy)]
pub enum DescriptorElementInfo {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
}

#[derive(Debug, Clone, Copy)]
pub struct DescriptorElement {
    pub handle: u64,
    pub info: DescriptorElementInfo,
}

#[derive(Debug, Clone)]
pub struct DescriptorBinding {
    pub selector_type: SelectorType,
    pub exact_type: vk::DescriptorType,
    pub array_elements: Vec<DescriptorElement>,
}

#[derive(Debug, Clone, Default)]
pub struct DescriptorState {
    pub bindings: BTreeMap<u32, DescriptorBinding>,
}

impl DescriptorState {
    pub fn handle_at(&self, binding: u32, arr_index: u32) -> Option<u64> {
        self.bindings.get(&binding)?.array_elements.get(arr_index as usize).map(|e| e.handle)
    }
}
