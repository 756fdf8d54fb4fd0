//! Keyboard input.
//!
//! Public API is platform-agnostic and does not expose winit types; the
//! runtime translates window events through [`platform`].

mod frame;
pub(crate) mod platform;
mod state;
mod types;

pub use frame::InputFrame;
pub use state::InputState;
pub use types::{InputEvent, Key, KeyState};
