//! `vkCreateDescriptorUpdateTemplate`/`vkUpdateDescriptorSetWithTemplate`
//! (component G), grounded on `CheekyLayer::device`'s handlers in
//! `descriptors.cpp`.
//!
//! The original's `UpdateDescriptorSetWithTemplate` crosses its own
//! `Buffer`/`Image` branches — the `Buffer` case reads a
//! `VkDescriptorImageInfo` and vice versa. Treated as a bug, not a behaviour
//! to reproduce (see DESIGN.md): this implementation reads buffer info for
//! buffer-like descriptor types and image info for image-like ones.

use std::ffi::c_void;
use std::sync::Arc;

use ash::vk;

use crate::device::Device;
use crate::rules::ast::SelectorType;
use crate::shadow::descriptor::{DescriptorBinding, DescriptorElement, DescriptorElementInfo};

/// Classifies a descriptor type the same way the original's
/// `from_descriptorType` does; `None` for types the rule engine does not
/// track (samplers, acceleration structures, …).
fn selector_for_descriptor_type(ty: vk::DescriptorType) -> Option<SelectorType> {
    match ty {
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER
        | vk::DescriptorType::SAMPLED_IMAGE
        | vk::DescriptorType::STORAGE_IMAGE
        | vk::DescriptorType::INPUT_ATTACHMENT => Some(SelectorType::Image),
        vk::DescriptorType::UNIFORM_BUFFER
        | vk::DescriptorType::STORAGE_BUFFER
        | vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
        | vk::DescriptorType::STORAGE_BUFFER_DYNAMIC => Some(SelectorType::Buffer),
        _ => None,
    }
}

/// # Safety
/// `create_info.p_descriptor_update_entries` must point to
/// `descriptor_update_entry_count` valid entries, as guaranteed by the
/// Vulkan loader calling this hook.
pub unsafe fn create_descriptor_update_template(
    device: &Arc<Device>,
    create_info: &vk::DescriptorUpdateTemplateCreateInfo,
    allocator: Option<&vk::AllocationCallbacks>,
) -> Result<vk::DescriptorUpdateTemplate, vk::Result> {
    let template = device.ash_device.create_descriptor_update_template(create_info, allocator)?;
    let entries = std::slice::from_raw_parts(
        create_info.p_descriptor_update_entries,
        create_info.descriptor_update_entry_count as usize,
    )
    .to_vec();
    device.instance.logger.verbose(&format!(
        "CreateDescriptorUpdateTemplate: {} entries -> {:?}",
        entries.len(),
        template
    ));
    device.update_templates.lock().expect("device lock poisoned").insert(template, entries);
    Ok(template)
}

/// # Safety
/// `data` must point to the update-template-described byte layout
/// `descriptor_update_template` was created against, as guaranteed by the
/// Vulkan loader calling this hook.
pub unsafe fn update_descriptor_set_with_template(
    device: &Arc<Device>,
    descriptor_set: vk::DescriptorSet,
    descriptor_update_template: vk::DescriptorUpdateTemplate,
    data: *const c_void,
) {
    device.ash_device.update_descriptor_set_with_template(descriptor_set, descriptor_update_template, data);

    let entries = match device.update_templates.lock().expect("device lock poisoned").get(&descriptor_update_template) {
        Some(entries) => entries.clone(),
        None => return,
    };
    let image_view_to_image = device.image_view_to_image.lock().expect("device lock poisoned").clone();

    let mut descriptor_states = device.descriptor_states.lock().expect("device lock poisoned");
    let state = descriptor_states.entry(descriptor_set).or_default();

    for entry in &entries {
        let Some(selector_type) = selector_for_descriptor_type(entry.descriptor_type) else { continue };

        let binding = state.bindings.entry(entry.dst_binding).or_insert_with(|| DescriptorBinding {
            selector_type,
            exact_type: entry.descriptor_type,
            array_elements: Vec::new(),
        });
        binding.selector_type = selector_type;
        binding.exact_type = entry.descriptor_type;

        let needed = (entry.dst_array_element + entry.descriptor_count) as usize;
        if binding.array_elements.len() < needed {
            binding.array_elements.resize(
                needed,
                DescriptorElement { handle: 0, info: DescriptorElementInfo::Buffer(vk::DescriptorBufferInfo::default()) },
            );
        }

        for j in 0..entry.descriptor_count {
            let byte_offset = entry.offset + (j as usize) * entry.stride;
            let field_ptr = (data as *const u8).add(byte_offset);
            let element = match selector_type {
                SelectorType::Buffer => {
                    let info = *(field_ptr as *const vk::DescriptorBufferInfo);
                    DescriptorElement { handle: info.buffer.as_raw(), info: DescriptorElementInfo::Buffer(info) }
                }
                SelectorType::Image => {
                    let info = *(field_ptr as *const vk::DescriptorImageInfo);
                    let image = image_view_to_image.get(&info.image_view).copied().unwrap_or(vk::Image::null());
                    DescriptorElement { handle: image.as_raw(), info: DescriptorElementInfo::Image(info) }
                }
                _ => unreachable!("selector_for_descriptor_type only returns Buffer/Image"),
            };
            binding.array_elements[(entry.dst_array_element + j) as usize] = element;
        }
    }
}
