//! GPU device + surface management.
//!
//! Creates the wgpu device and queue, configures the window surface and keeps
//! a depth buffer sized to it. The scene itself never touches wgpu; the demo
//! uses this layer to clear and present the window each frame.

mod frame;
mod gpu;
mod surface;

pub use frame::{DepthBuffer, GpuFrame, DEPTH_FORMAT};
pub use gpu::{Gpu, GpuInit};
pub use surface::SurfaceErrorAction;
