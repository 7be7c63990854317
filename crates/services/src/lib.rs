#![forbid(unsafe_code)]

pub mod dispatch;
pub mod error;
pub mod program;
pub mod scheduler;
pub mod timer;

pub use course_core::Clock;

pub use dispatch::{LoggingDispatcher, NotificationDispatcher, StepNotification};
pub use error::{DispatchError, ProgramError, SchedulerError};
pub use program::{ProgramService, ProgramStatus};
pub use scheduler::Scheduler;
pub use timer::TimerRegistry;
