//! Reef scene: the render-pass scheduler and dependency-gated asset loader
//! behind the reef demo.
//!
//! The scene drives a stateful, immediate-mode graphics device through the
//! [`gfx::GraphicsDevice`] / [`gfx::DeviceContext`] traits. Start with
//! [`SceneRenderer`]: create device resources, poll loading each frame, then
//! `update` + `render`.

pub mod camera;
pub mod config;
pub mod constants;
pub mod family;
pub mod geometry;
pub mod gfx;
pub mod loader;
pub mod renderer;
pub mod shaders;
pub mod states;

pub use camera::{
    Camera, CameraController, FrameTiming, InputError, InputFlag, Lens, MovementInput, OutputInfo,
    INPUT_FLAG_COUNT,
};
pub use config::{ConfigError, SceneConfig, DEFAULT_CONFIG_PATH};
pub use family::{PassFamily, TextureSlot};
pub use geometry::MeshKind;
pub use loader::{AssetSource, DirectorySource, LoadError, LoadState, MemorySource};
pub use renderer::{FrameTargets, SceneError, SceneRenderer, UnderwaterTarget, UNDERWATER_INDEX_COUNT};
