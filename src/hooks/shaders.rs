//! `vkCreateShaderModule` (component F), grounded on
//! `CheekyLayer::device::CreateShaderModule`: content hash, optional dump,
//! optional override substitution, synthetic handle mint, `shader` selector.

use std::sync::Arc;

use ash::vk;

use crate::assets::shader_compile::ShaderStage;
use crate::device::Device;
use crate::hash::{sha256_hex, OverrideKind};
use crate::rules::{AdditionalInfo, SelectorType};

/// # Safety
/// `create_info` must describe a live `pCode`/`codeSize` pair, as guaranteed
/// by the Vulkan loader calling into this hook.
pub unsafe fn create_shader_module(
    device: &Arc<Device>,
    create_info: &vk::ShaderModuleCreateInfo,
    allocator: Option<&vk::AllocationCallbacks>,
) -> Result<vk::ShaderModule, vk::Result> {
    let instance = &device.instance;
    let code_bytes = std::slice::from_raw_parts(create_info.p_code as *const u8, create_info.code_size as usize);
    let hash = sha256_hex(code_bytes);

    if instance.config.get_bool("dump") {
        dump_shader(instance, &hash, code_bytes);
    }

    let mut override_info = *create_info;
    // Keeps the override bytes alive for the duration of the real
    // create call; `override_info.p_code` points into it when set.
    let mut override_buffer: Option<Vec<u8>> = None;
    if instance.config.get_bool("override") && instance.override_cache.has_override(OverrideKind::Shader, &hash) {
        let path = format!("{}/shaders/{}.spv", instance.config.get("overrideDirectory"), hash);
        match std::fs::read(&path) {
            Ok(bytes) => {
                instance.logger.line(&format!("found shader override for {} ({} bytes)", hash, bytes.len()));
                override_buffer = Some(bytes);
            }
            Err(_) => {
                if let Some(words) = compile_glsl_override(instance, &hash) {
                    let mut bytes = Vec::with_capacity(words.len() * 4);
                    for w in &words {
                        bytes.extend_from_slice(&w.to_le_bytes());
                    }
                    override_buffer = Some(bytes);
                }
            }
        }
        if let Some(bytes) = &override_buffer {
            override_info.p_code = bytes.as_ptr() as *const u32;
            override_info.code_size = bytes.len();
        }
    }

    let module = device.ash_device.create_shader_module(&override_info, allocator)?;
    drop(override_buffer);

    let synthetic = device.mint_custom_shader_handle(module.as_raw());

    let mut globals = instance.globals.lock().expect("rule globals lock poisoned");
    globals.content_hashes.insert(synthetic, hash);
    let mut ctx = super::new_context(instance, Some(device.clone()), &mut globals, synthetic, AdditionalInfo::None);
    crate::rules::execute_rules(&instance.rules, SelectorType::Shader, synthetic, &mut ctx);

    Ok(module)
}

/// Falls back to a `<hash>.{vert,frag,comp}` GLSL source override, compiled
/// through the instance's [`ShaderCompiler`](crate::assets::ShaderCompiler)
/// and cached by hash so repeated reloads don't recompile.
fn compile_glsl_override(instance: &crate::instance::Instance, hash: &str) -> Option<Vec<u32>> {
    for suffix in ["vert", "frag", "comp"] {
        let path = format!("{}/shaders/{}.{}", instance.config.get("overrideDirectory"), hash, suffix);
        let Ok(source) = std::fs::read_to_string(&path) else { continue };
        let stage = ShaderStage::from_suffix(suffix).expect("suffix is one of the three listed");
        let mut cache = instance.shader_compile_cache.lock().expect("shader compile cache lock poisoned");
        return match cache.get_or_compile(hash, stage, &source, instance.shader_compiler.as_ref()) {
            Ok(words) => {
                instance.logger.line(&format!("found and compiled GLSL shader override for {} ({} words)", hash, words.len()));
                Some(words.to_vec())
            }
            Err(e) => {
                instance.logger.error(&format!("GLSL shader override {} failed to compile: {}", path, e));
                None
            }
        };
    }
    None
}

fn dump_shader(instance: &crate::instance::Instance, hash: &str, bytes: &[u8]) {
    let dir = std::path::Path::new(instance.config.get("dumpDirectory")).join("shaders");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        instance.logger.warn(&format!("could not create shader dump directory: {}", e));
        return;
    }
    let path = dir.join(format!("{}.spv", hash));
    if path.exists() {
        return;
    }
    if let Err(e) = std::fs::write(&path, bytes) {
        instance.logger.warn(&format!("could not dump shader {}: {}", hash, e));
    }
}
