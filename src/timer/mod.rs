pub mod controller;
pub mod state;

pub use controller::TimerController;
pub use state::{TickOutcome, TimerState, DEFAULT_BREAK_MS, DEFAULT_WORK_MS};
