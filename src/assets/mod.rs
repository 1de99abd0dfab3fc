//! The asset substitution pipeline (component I): block-compressed texture
//! codecs and on-demand GLSL shader compilation, both sitting behind the
//! override-file lookup in `hooks::images`/`hooks::shaders`.

pub mod codec;
pub mod shader_compile;

pub use codec::{codec_for, BlockCodec};
pub use shader_compile::{CompileCache, ShaderCompiler, ShaderStage};
