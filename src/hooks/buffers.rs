//! `vkCreateBuffer`/`vkBindBufferMemory`/`vkMapMemory`/`vkUnmapMemory`/
//! `vkCmdCopyBuffer` (component G), grounded on `CheekyLayer::device`'s
//! buffer handlers in `buffers.cpp`: shadow-state bookkeeping, then (for
//! `CmdCopyBuffer`) content hash, optional dump, optional override
//! substitution, `buffer` selector fire.

use std::sync::Arc;

use ash::vk;

use crate::device::Device;
use crate::hash::{sha256_hex, OverrideKind};
use crate::rules::data::Value;
use crate::rules::{AdditionalInfo, SelectorType};
use crate::shadow::BufferState;

pub unsafe fn create_buffer(
    device: &Arc<Device>,
    create_info: &vk::BufferCreateInfo,
    allocator: Option<&vk::AllocationCallbacks>,
) -> Result<vk::Buffer, vk::Result> {
    let buffer = device.ash_device.create_buffer(create_info, allocator)?;
    device.buffers.lock().expect("device lock poisoned").insert(
        buffer,
        BufferState { buffer, create_info: create_info.into(), memory: vk::DeviceMemory::null(), memory_offset: 0 },
    );
    Ok(buffer)
}

pub fn bind_buffer_memory(
    device: &Arc<Device>,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    memory_offset: vk::DeviceSize,
) -> Result<(), vk::Result> {
    if let Some(state) = device.buffers.lock().expect("device lock poisoned").get_mut(&buffer) {
        state.memory = memory;
        state.memory_offset = memory_offset;
    }
    unsafe { device.ash_device.bind_buffer_memory(buffer, memory, memory_offset) }
}

/// # Safety
/// `memory` must be a live, currently-unmapped `VkDeviceMemory` bound to
/// host-visible memory, as guaranteed by the Vulkan loader calling this hook.
pub unsafe fn map_memory(
    device: &Arc<Device>,
    memory: vk::DeviceMemory,
    offset: vk::DeviceSize,
    size: vk::DeviceSize,
    flags: vk::MemoryMapFlags,
) -> Result<*mut std::ffi::c_void, vk::Result> {
    let pointer = device.ash_device.map_memory(memory, offset, size, flags)?;
    device
        .memory_mappings
        .lock()
        .expect("device lock poisoned")
        .insert(memory, crate::shadow::MemoryMapInfo { pointer, offset, size });
    Ok(pointer)
}

pub fn unmap_memory(device: &Arc<Device>, memory: vk::DeviceMemory) {
    unsafe { device.ash_device.unmap_memory(memory) };
    device.memory_mappings.lock().expect("device lock poisoned").remove(&memory);
}

/// # Safety
/// `regions` must contain at least one valid `VkBufferCopy`, as guaranteed
/// by the Vulkan loader; only the first region is hashed/inspected, matching
/// the original's single-region handling.
pub unsafe fn cmd_copy_buffer(
    device: &Arc<Device>,
    command_buffer: vk::CommandBuffer,
    src_buffer: vk::Buffer,
    dst_buffer: vk::Buffer,
    regions: &[vk::BufferCopy],
) {
    let instance = &device.instance;
    let Some(region) = regions.first() else { return };

    let (src_memory, offset) = {
        let buffers = device.buffers.lock().expect("device lock poisoned");
        let Some(src) = buffers.get(&src_buffer) else { return };
        (src.memory, src.memory_offset + region.src_offset)
    };

    match device.ash_device.map_memory(src_memory, offset, region.size, vk::MemoryMapFlags::empty()) {
        Ok(data) => {
            let bytes = std::slice::from_raw_parts(data as *const u8, region.size as usize);
            let hash = sha256_hex(bytes);
            instance.logger.line(&format!(
                "CmdCopyBuffer: src={:?}@{:#x} dst={:?}@{:#x} hash={}",
                src_buffer, region.src_offset, dst_buffer, region.dst_offset, hash
            ));

            if instance.config.get_bool("dump") {
                dump_buffer(instance, &hash, bytes);
            }
            if instance.config.get_bool("override") && instance.override_cache.has_override(OverrideKind::Buffer, &hash) {
                apply_override(instance, &hash, data as *mut u8, region.size as usize);
            }

            {
                let mut globals = instance.globals.lock().expect("rule globals lock poisoned");
                globals.content_hashes.insert(dst_buffer.as_raw(), hash.clone());
                let mut ctx = super::new_context(instance, Some(device.clone()), &mut globals, dst_buffer.as_raw(), AdditionalInfo::None);
                ctx.locals.insert("buffer:hash".to_owned(), Value::String(hash));
                ctx.locals.insert("buffer:size".to_owned(), Value::Number(region.size as f64));
                crate::rules::execute_rules(&instance.rules, SelectorType::Buffer, dst_buffer.as_raw(), &mut ctx);
            }

            device.ash_device.unmap_memory(src_memory);
        }
        Err(e) => instance.logger.warn(&format!("CmdCopyBuffer: cannot map source memory: {:?}", e)),
    }

    device.ash_device.cmd_copy_buffer(command_buffer, src_buffer, dst_buffer, regions);
}

fn dump_buffer(instance: &crate::instance::Instance, hash: &str, bytes: &[u8]) {
    let dir = std::path::Path::new(instance.config.get("dumpDirectory")).join("buffers");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        instance.logger.warn(&format!("could not create buffer dump directory: {}", e));
        return;
    }
    let path = dir.join(format!("{}.buf", hash));
    if let Err(e) = std::fs::write(&path, bytes) {
        instance.logger.warn(&format!("could not dump buffer {}: {}", hash, e));
    }
}

unsafe fn apply_override(instance: &crate::instance::Instance, hash: &str, data: *mut u8, size: usize) {
    let path = format!("{}/buffers/{}.buf", instance.config.get("overrideDirectory"), hash);
    match std::fs::read(&path) {
        Ok(bytes) => {
            instance.logger.line(&format!("found buffer override for {}", hash));
            let n = bytes.len().min(size);
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), data, n);
            if n < size {
                std::ptr::write_bytes(data.add(n), 0, size - n);
            }
        }
        Err(e) => instance.logger.warn(&format!("buffer override {} listed but unreadable: {}", path, e)),
    }
}
