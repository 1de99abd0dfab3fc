//! On-demand GLSL-to-SPIR-V compilation for shader overrides, plus a
//! hash-keyed compile cache. Grounded on the teacher's own optional
//! `shaderc` dependency (used there at `build.rs` time for example shaders);
//! here the same crate compiles override source at runtime, since overrides
//! arrive as files discovered during a running instance rather than at
//! compile time, and on the teacher's `cache.rs` `Cache<R: Resource>` TTL
//! pattern, narrowed to a flat hash-keyed map since compiled overrides have
//! no device-scoped resources to release.

use std::collections::HashMap;

use crate::Error;

/// The shader stages an override source file can declare via its filename
/// suffix (`<hash>.vert`, `<hash>.frag`, `<hash>.comp`), mirroring the
/// original's `string_to_stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub fn from_suffix(suffix: &str) -> Option<ShaderStage> {
        Some(match suffix {
            "vert" => ShaderStage::Vertex,
            "frag" => ShaderStage::Fragment,
            "comp" => ShaderStage::Compute,
            _ => return None,
        })
    }
}

/// Compiles one GLSL source string for a given stage into SPIR-V words.
pub trait ShaderCompiler: Send + Sync {
    fn compile(&self, stage: ShaderStage, source: &str) -> Result<Vec<u32>, Error>;
}

#[cfg(feature = "shaderc")]
pub struct ShadercCompiler {
    compiler: shaderc::Compiler,
}

#[cfg(feature = "shaderc")]
impl ShadercCompiler {
    pub fn new() -> Result<Self, Error> {
        let compiler = shaderc::Compiler::new().ok_or(Error::Uncategorized("failed to initialize shaderc"))?;
        Ok(ShadercCompiler { compiler })
    }
}

#[cfg(feature = "shaderc")]
impl ShaderCompiler for ShadercCompiler {
    fn compile(&self, stage: ShaderStage, source: &str) -> Result<Vec<u32>, Error> {
        let kind = match stage {
            ShaderStage::Vertex => shaderc::ShaderKind::Vertex,
            ShaderStage::Fragment => shaderc::ShaderKind::Fragment,
            ShaderStage::Compute => shaderc::ShaderKind::Compute,
        };
        let artifact = self
            .compiler
            .compile_into_spirv(source, kind, "<override>", "main", None)
            .map_err(|e| Error::ShaderCompileFailed(e.to_string()))?;
        Ok(artifact.as_binary().to_vec())
    }
}

/// Without the `shaderc` feature, overrides written as GLSL source can't be
/// compiled; only pre-built `.spv` overrides work. Kept so
/// `hooks::shaders` always has a `ShaderCompiler` to hold, feature or not.
pub struct UnsupportedCompiler;
impl ShaderCompiler for UnsupportedCompiler {
    fn compile(&self, _stage: ShaderStage, _source: &str) -> Result<Vec<u32>, Error> {
        Err(Error::Uncategorized("GLSL override compilation requires the `shaderc` feature"))
    }
}

/// A hash-keyed cache of already-compiled override shaders, so reloading
/// the same override source (e.g. across repeated rule-file reloads) does
/// not recompile it.
#[derive(Default)]
pub struct CompileCache {
    store: HashMap<String, Vec<u32>>,
}

impl CompileCache {
    pub fn get_or_compile(
        &mut self,
        hash: &str,
        stage: ShaderStage,
        source: &str,
        compiler: &dyn ShaderCompiler,
    ) -> Result<&[u32], Error> {
        if !self.store.contains_key(hash) {
            let compiled = compiler.compile(stage, source)?;
            self.store.insert(hash.to_owned(), compiled);
        }
        Ok(self.store.get(hash).expect("just inserted"))
    }
}
