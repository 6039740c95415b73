pub mod scheduler;
pub mod timer;

pub use scheduler::{start_scheduler, Cycles, RunningScheduler, Triggers};
pub use timer::{DelayPolicy, DelayableTimer, TimerSchedule};
