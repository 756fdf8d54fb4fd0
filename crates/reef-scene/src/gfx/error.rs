use std::fmt;

use super::handle::Resource;
use super::types::ShaderStage;

/// Failure reported by a device or device-context call.
///
/// Every variant is fatal for the load or frame that issued the call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// Shader bytecode was empty or not accepted for the requested stage.
    InvalidBytecode { stage: ShaderStage, reason: String },
    /// A handle referred to an object that was never created or already released.
    UnknownHandle(Resource),
    /// A shader created for one stage was bound to another.
    StageMismatch { expected: ShaderStage, actual: ShaderStage },
    /// A creation descriptor or upload did not satisfy the device's rules.
    InvalidDescriptor(String),
    /// Texture file data could not be turned into a texture.
    InvalidTexture(String),
    /// A draw or bind needed a resource that is not present.
    MissingResource(&'static str),
    /// The device rejected the call for a backend-specific reason.
    Rejected(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::InvalidBytecode { stage, reason } => {
                write!(f, "invalid {stage} bytecode: {reason}")
            }
            DeviceError::UnknownHandle(r) => write!(f, "unknown device handle {r:?}"),
            DeviceError::StageMismatch { expected, actual } => {
                write!(f, "shader for stage {actual} bound to stage {expected}")
            }
            DeviceError::InvalidDescriptor(msg) => write!(f, "invalid descriptor: {msg}"),
            DeviceError::InvalidTexture(msg) => write!(f, "invalid texture data: {msg}"),
            DeviceError::MissingResource(what) => write!(f, "missing resource: {what}"),
            DeviceError::Rejected(msg) => write!(f, "device rejected call: {msg}"),
        }
    }
}

impl std::error::Error for DeviceError {}
