use serde::{Deserialize, Serialize};

/// Default work phase length: 25 minutes.
pub const DEFAULT_WORK_MS: u64 = 25 * 60 * 1000;

/// Default break phase length: 5 minutes.
pub const DEFAULT_BREAK_MS: u64 = 5 * 60 * 1000;

/// Result of applying one tick quantum to an active clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The clock still has time left.
    Running,
    /// A work phase just hit zero.
    WorkComplete,
    /// A break phase just hit zero.
    BreakComplete,
}

/// The single source of truth for presentation.
///
/// Exactly one value of this type exists per running application instance; it
/// is mutated only by the timer controller and published to observers on
/// every change. Everything the UI derives from it (progress, clock strings)
/// is a pure function below, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Time remaining in the current phase, in milliseconds.
    pub time_left_ms: u64,
    /// Full length of the current phase, in milliseconds.
    pub total_time_ms: u64,
    pub is_break: bool,
    pub is_running: bool,
    pub is_paused: bool,
    pub active_category_title: Option<String>,
    /// Work time accumulated this session. Ticks during a break never touch it.
    pub session_time_spent_ms: u64,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::idle(DEFAULT_WORK_MS)
    }
}

impl TimerState {
    /// The fully-idle state: a work phase loaded but not started. This is the
    /// only state where `is_running` and `is_paused` are both false.
    pub fn idle(work_ms: u64) -> Self {
        Self {
            time_left_ms: work_ms,
            total_time_ms: work_ms,
            is_break: false,
            is_running: false,
            is_paused: false,
            active_category_title: None,
            session_time_spent_ms: 0,
        }
    }

    /// Start a fresh work phase running for `category_title`.
    pub fn begin_work(&mut self, work_ms: u64, category_title: String) {
        *self = Self {
            time_left_ms: work_ms,
            total_time_ms: work_ms,
            is_break: false,
            is_running: true,
            is_paused: false,
            active_category_title: Some(category_title),
            session_time_spent_ms: 0,
        };
    }

    /// Load the break duration, paused. The user resumes it explicitly; the
    /// session counter is left alone so the finished work total stays visible
    /// through the break.
    pub fn begin_break_pending(&mut self, break_ms: u64) {
        self.time_left_ms = break_ms;
        self.total_time_ms = break_ms;
        self.is_break = true;
        self.is_running = false;
        self.is_paused = true;
    }

    /// Reload a full work phase, paused, keeping the active category.
    pub fn reset_work_paused(&mut self, work_ms: u64) {
        self.time_left_ms = work_ms;
        self.total_time_ms = work_ms;
        self.is_break = false;
        self.is_running = false;
        self.is_paused = true;
        self.session_time_spent_ms = 0;
    }

    pub fn reset_idle(&mut self, work_ms: u64) {
        *self = Self::idle(work_ms);
    }

    pub fn pause(&mut self) {
        self.is_running = false;
        self.is_paused = true;
    }

    pub fn resume(&mut self) {
        self.is_running = true;
        self.is_paused = false;
    }

    /// Apply one tick quantum: decrement the clock, and credit the session
    /// counter iff this is a work phase.
    pub fn apply_tick(&mut self, quantum_ms: u64) -> TickOutcome {
        self.time_left_ms = self.time_left_ms.saturating_sub(quantum_ms);
        if !self.is_break {
            self.session_time_spent_ms += quantum_ms;
        }

        if self.time_left_ms > 0 {
            TickOutcome::Running
        } else if self.is_break {
            TickOutcome::BreakComplete
        } else {
            TickOutcome::WorkComplete
        }
    }

    /// Progress through the current phase as a whole percentage, 0-100.
    pub fn progress_percent(&self) -> u32 {
        if self.total_time_ms == 0 {
            return 0;
        }
        let done = self.total_time_ms.saturating_sub(self.time_left_ms);
        ((done * 100) / self.total_time_ms).min(100) as u32
    }

    /// Remaining time as `MM:SS`.
    pub fn formatted_time(&self) -> String {
        let total_seconds = self.time_left_ms / 1000;
        format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
    }

    /// Accumulated session time as `HH:MM:SS`.
    pub fn formatted_session_time(&self) -> String {
        let total_seconds = self.session_time_spent_ms / 1000;
        format!(
            "{:02}:{:02}:{:02}",
            total_seconds / 3600,
            (total_seconds % 3600) / 60,
            total_seconds % 60
        )
    }

    /// Timer controls are shown whenever a clock is active.
    pub fn should_show_controls(&self) -> bool {
        self.is_running || self.is_paused
    }
}
