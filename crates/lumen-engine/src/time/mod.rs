//! Time subsystem.
//!
//! - `FrameClock`: one per render loop, `tick()` once per presented frame
//! - `Timer`: named stage durations shared with the overlay's profile view

mod frame_clock;
mod timer;

pub use frame_clock::{FrameClock, FrameTime};
pub use timer::{Timer, TimerScope};
