//! Reef engine crate.
//!
//! Platform and GPU runtime pieces for the reef demo: the winit window loop,
//! the wgpu surface with its depth buffer, keyboard state and frame timing.

pub mod core;
pub mod device;
pub mod input;
pub mod logging;
pub mod time;
pub mod window;
