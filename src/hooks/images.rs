//! `vkCreateImage`/`vkBindImageMemory`/`vkCreateImageView`/
//! `vkCmdCopyBufferToImage` (component G), grounded on
//! `CheekyLayer::device`'s image handlers in `images.cpp`. Only the highest
//! mip level (`mipLevel == 0`) is hashed and fired against the `image`
//! selector, matching the original's `is_high_res` gate.

use std::sync::Arc;

use ash::vk;

use crate::assets::codec_for;
use crate::device::Device;
use crate::hash::{sha256_hex, OverrideKind};
use crate::rules::data::Value;
use crate::rules::{AdditionalInfo, SelectorType};
use crate::shadow::ImageState;

pub unsafe fn create_image(
    device: &Arc<Device>,
    create_info: &vk::ImageCreateInfo,
    allocator: Option<&vk::AllocationCallbacks>,
) -> Result<vk::Image, vk::Result> {
    let image = device.ash_device.create_image(create_info, allocator)?;
    device.images.lock().expect("device lock poisoned").insert(
        image,
        ImageState { image, create_info: create_info.into(), memory: vk::DeviceMemory::null(), memory_offset: 0, view: None },
    );
    Ok(image)
}

pub fn bind_image_memory(
    device: &Arc<Device>,
    image: vk::Image,
    memory: vk::DeviceMemory,
    memory_offset: vk::DeviceSize,
) -> Result<(), vk::Result> {
    if let Some(state) = device.images.lock().expect("device lock poisoned").get_mut(&image) {
        state.memory = memory;
        state.memory_offset = memory_offset;
    }
    unsafe { device.ash_device.bind_image_memory(image, memory, memory_offset) }
}

pub unsafe fn create_image_view(
    device: &Arc<Device>,
    create_info: &vk::ImageViewCreateInfo,
    allocator: Option<&vk::AllocationCallbacks>,
) -> Result<vk::ImageView, vk::Result> {
    let view = device.ash_device.create_image_view(create_info, allocator)?;
    if let Some(state) = device.images.lock().expect("device lock poisoned").get_mut(&create_info.image) {
        state.view = Some(view);
    }
    device.image_view_to_image.lock().expect("device lock poisoned").insert(view, create_info.image);
    Ok(view)
}

fn buffer_copy_size(extent: vk::Extent3D, unit_size: u32) -> u64 {
    let z_copies = extent.depth.max(1) as u64;
    if extent.width == 0 || extent.height == 0 || z_copies == 0 {
        return 0;
    }
    let mut size = (z_copies - 1) * extent.height as u64 * extent.width as u64;
    size += (extent.height as u64 - 1) * extent.width as u64 + extent.width as u64;
    size * unit_size as u64
}

/// # Safety
/// `regions` must contain at least one valid `VkBufferImageCopy`; only the
/// first region is hashed/inspected, matching the original's single-region
/// handling.
pub unsafe fn cmd_copy_buffer_to_image(
    device: &Arc<Device>,
    command_buffer: vk::CommandBuffer,
    src_buffer: vk::Buffer,
    dst_image: vk::Image,
    dst_image_layout: vk::ImageLayout,
    regions: &[vk::BufferImageCopy],
) {
    let instance = &device.instance;
    let Some(region) = regions.first() else { return };

    let (format, src_memory, offset, is_high_res) = {
        let images = device.images.lock().expect("device lock poisoned");
        let buffers = device.buffers.lock().expect("device lock poisoned");
        let (Some(image), Some(buffer)) = (images.get(&dst_image), buffers.get(&src_buffer)) else { return };
        (image.create_info.format, buffer.memory, buffer.memory_offset + region.buffer_offset, region.image_subresource.mip_level == 0)
    };

    // Approximate element size: 4 bytes/texel for uncompressed formats, the
    // codec's block size where one is registered for `format`.
    let unit_size = codec_for(format).map(|_| 16).unwrap_or(4);
    let size = buffer_copy_size(region.image_extent, unit_size);
    if size == 0 {
        device.ash_device.cmd_copy_buffer_to_image(command_buffer, src_buffer, dst_image, dst_image_layout, regions);
        return;
    }

    match device.ash_device.map_memory(src_memory, offset, size, vk::MemoryMapFlags::empty()) {
        Ok(data) => {
            let bytes = std::slice::from_raw_parts(data as *const u8, size as usize);
            let hash = sha256_hex(bytes);
            instance.logger.line(&format!(
                "CmdCopyBufferToImage: src={:?} dst={:?} {}x{} format={:?} size={} hash={}",
                src_buffer, dst_image, region.image_extent.width, region.image_extent.height, format, size, hash
            ));

            if is_high_res {
                let mut globals = instance.globals.lock().expect("rule globals lock poisoned");
                globals.content_hashes.insert(dst_image.as_raw(), hash.clone());
                let mut ctx = super::new_context(instance, Some(device.clone()), &mut globals, dst_image.as_raw(), AdditionalInfo::None);
                ctx.locals.insert("image:hash".to_owned(), Value::String(hash.clone()));
                ctx.locals.insert("image:width".to_owned(), Value::Number(region.image_extent.width as f64));
                ctx.locals.insert("image:height".to_owned(), Value::Number(region.image_extent.height as f64));
                ctx.locals.insert("image:format".to_owned(), Value::Number(format.as_raw() as f64));
                ctx.locals.insert("image:size".to_owned(), Value::Number(size as f64));
                crate::rules::execute_rules(&instance.rules, SelectorType::Image, dst_image.as_raw(), &mut ctx);
            }

            if instance.config.get_bool("dump") {
                dump_image(instance, &hash, bytes);
            }
            if instance.config.get_bool("override") && instance.override_cache.has_override(OverrideKind::Image, &hash) {
                apply_override(instance, &hash, format, data as *mut u8, size as usize, region.image_extent);
            }

            device.ash_device.unmap_memory(src_memory);
        }
        Err(e) => instance.logger.warn(&format!("CmdCopyBufferToImage: cannot map source memory: {:?}", e)),
    }

    device.ash_device.cmd_copy_buffer_to_image(command_buffer, src_buffer, dst_image, dst_image_layout, regions);
}

fn dump_image(instance: &crate::instance::Instance, hash: &str, bytes: &[u8]) {
    let dir = std::path::Path::new(instance.config.get("dumpDirectory")).join("images");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        instance.logger.warn(&format!("could not create image dump directory: {}", e));
        return;
    }
    let path = dir.join(format!("{}.image", hash));
    if let Err(e) = std::fs::write(&path, bytes) {
        instance.logger.warn(&format!("could not dump image {}: {}", hash, e));
    }
}

/// Applies an image override. A `<hash>.image` file is raw bytes already in
/// `format`, copied in directly. A `<hash>.rgba` file is a plain RGBA8
/// buffer, re-encoded into `format` through the registered [`BlockCodec`]
/// (the substitute for the original's PNG import path, since this crate
/// does not carry a PNG container codec — see DESIGN.md).
///
/// [`BlockCodec`]: crate::assets::BlockCodec
unsafe fn apply_override(
    instance: &crate::instance::Instance,
    hash: &str,
    format: vk::Format,
    data: *mut u8,
    size: usize,
    extent: vk::Extent3D,
) {
    let raw_path = format!("{}/images/{}.image", instance.config.get("overrideDirectory"), hash);
    if let Ok(bytes) = std::fs::read(&raw_path) {
        instance.logger.line(&format!("found image override at {}", raw_path));
        let n = bytes.len().min(size);
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), data, n);
        return;
    }

    let rgba_path = format!("{}/images/{}.rgba", instance.config.get("overrideDirectory"), hash);
    match std::fs::read(&rgba_path) {
        Ok(rgba) => match codec_for(format) {
            Some(codec) if codec.compression_supported(format) => {
                let encoded = codec.compress(format, &rgba, extent.width, extent.height);
                let n = encoded.len().min(size);
                std::ptr::copy_nonoverlapping(encoded.as_ptr(), data, n);
                instance.logger.line(&format!("found and re-encoded image override for {}", hash));
            }
            _ => instance.logger.warn(&format!("cannot encode image override for {:?}: no codec supports it", format)),
        },
        Err(_) => {}
    }
}
