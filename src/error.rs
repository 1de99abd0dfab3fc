//! Exposes the wiretap error type

use std::ffi::NulError;
use std::sync::PoisonError;

use ash;
use thiserror::Error;

/// Error type that wiretap can return.
///
/// Taxonomy mirrors the error handling design: parse errors, reflection
/// errors, type mismatches, propagated Vulkan errors, I/O errors, and rule
/// execution errors all have a dedicated variant so callers can match on the
/// failure class without string-sniffing a message.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load the Vulkan library.
    #[error("Failed to load Vulkan.")]
    LoadFailed(ash::LoadingError),
    /// Could not convert a Rust string to a C string because it has null bytes.
    #[error("Invalid C string")]
    InvalidString(NulError),
    /// Generic Vulkan error type, propagated verbatim from the next layer.
    #[error("Vulkan error: `{0}`")]
    VkError(ash::vk::Result),
    /// Underlying filesystem or socket I/O failure. Always non-fatal to the
    /// Vulkan call that triggered it; logged as a warning by the caller.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The pNext chain did not contain a `VK_LAYER_LINK_INFO`/
    /// `VK_LAYER_DEVICE_LINK_INFO` node for this layer.
    #[error("No layer link info found in pNext chain.")]
    NoLayerLinkInfo,
    /// A required next-layer function pointer was not resolved.
    #[error("Missing dispatch entry for `{0}`.")]
    MissingDispatchEntry(&'static str),
    /// Looked up a dispatch key with no registered instance or device.
    #[error("No instance or device registered for this dispatch key.")]
    UnknownDispatchKey,

    /// Rule or assignment-expression parse error: `file:line:col: message`.
    #[error("{file}:{line}:{col}: {message}")]
    ParseError {
        file: String,
        line: u32,
        col: u32,
        message: String,
    },
    /// Reflection lookup failed: unknown field, wrong accessor kind,
    /// out-of-range index, or a non-assignable leaf.
    #[error("reflection error on path `{path}` (type `{type_name}`): {message}")]
    ReflectionError {
        path: String,
        type_name: String,
        message: String,
    },
    /// A data expression produced a different `DataType` than the one the
    /// caller asked for.
    #[error("type mismatch: expected `{expected:?}`, got `{actual:?}`")]
    TypeMismatch {
        expected: crate::rules::data::DataType,
        actual: crate::rules::data::DataType,
    },
    /// Referenced a global/local variable, named function, or registered
    /// factory identifier that does not exist.
    #[error("unknown name `{name}`, available: [{available}]")]
    UnknownName { name: String, available: String },
    /// A rule action or data expression failed during evaluation. Carries
    /// the source position of the rule that raised it.
    #[error("rule error at {line}:{col}: {message}")]
    RuleError { line: u32, col: u32, message: String },

    /// Plugin failed to load or did not export the expected entry point.
    #[error("plugin `{0}` failed to load: {1}")]
    PluginLoadFailed(String, String),
    /// GLSL-to-SPIR-V override compilation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompileFailed(String),
    /// Poisoned mutex: some other thread panicked while holding the instance lock.
    #[error("Poisoned mutex")]
    PoisonError,
    /// Uncategorized error.
    #[error("Uncategorized error: `{0}`")]
    Uncategorized(&'static str),
}

impl From<ash::LoadingError> for Error {
    fn from(value: ash::LoadingError) -> Self {
        Error::LoadFailed(value)
    }
}

impl From<NulError> for Error {
    fn from(value: NulError) -> Self {
        Error::InvalidString(value)
    }
}

impl From<ash::vk::Result> for Error {
    fn from(value: ash::vk::Result) -> Self {
        Error::VkError(value)
    }
}

impl From<libloading::Error> for Error {
    fn from(value: libloading::Error) -> Self {
        Error::PluginLoadFailed(String::new(), value.to_string())
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::PoisonError
    }
}
