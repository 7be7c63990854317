#![forbid(unsafe_code)]

//! Domain types and pure scheduling math for the 50-step program.
//!
//! Everything in this crate is synchronous and free of I/O. Persistence
//! lives in `storage`, timers and orchestration in `services`.

pub mod model;
pub mod next_fire;
pub mod schedule;
pub mod time;

pub use next_fire::next_fire_instant;
pub use schedule::{FINAL_STEP, Schedule, ScheduleError};
pub use time::Clock;
