//! Time subsystem.
//!
//! One `StepTimer` per render loop; call `tick()` once per presented frame.

mod step_timer;

pub use step_timer::{StepTime, StepTimer};
