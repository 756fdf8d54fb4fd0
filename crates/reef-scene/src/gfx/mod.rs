//! Device abstraction for a fixed-function, stateful graphics API.
//!
//! The scene talks to [`GraphicsDevice`] for object creation and to
//! [`DeviceContext`] for binding and drawing. [`recorder`] provides the
//! backend used by tests and the demo's frame trace.

pub mod desc;
pub mod device;
pub mod error;
pub mod handle;
pub mod recorder;
pub mod state;
pub mod types;

pub use desc::*;
pub use device::{DeviceContext, DeviceResult, GraphicsDevice};
pub use error::DeviceError;
pub use handle::*;
pub use recorder::{
    encode_dds_header, Command, CommandKind, DrawRecord, RecordingContext, RecordingDevice,
};
pub use state::{IndexBufferBinding, PipelineState, StageBindings, VertexBufferBinding};
pub use types::*;
