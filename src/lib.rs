//! Core engine for a Pomodoro task timer: the work/break state machine,
//! session accounting, and category storage. Presentation stays behind the
//! [`App`] boundary, consuming observable state and issuing intents.

mod accountant;
mod app;
pub mod db;
mod scheduler;
mod settings;
pub mod timer;

pub use accountant::SessionAccountant;
pub use app::App;
pub use db::{Category, Database, Session};
pub use db::models::{DEFAULT_CATEGORY_COLOR, DEFAULT_CATEGORY_TITLE};
pub use scheduler::{BackgroundScheduler, KeepAlivePayload, ScheduleHandle};
pub use settings::{SettingsStore, TimerSettings};
pub use timer::{TimerController, TimerState, DEFAULT_BREAK_MS, DEFAULT_WORK_MS};

/// Initialize logging for hosts that do not bring their own logger.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
