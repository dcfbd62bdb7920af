//! Keep-alive scheduling for timers that must outlive the foreground app.
//!
//! Modeled as "run for this duration, then notify". The state machine never
//! depends on it: a lost keep-alive degrades to a silent no-op, not a broken
//! timer.

use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};
use tokio::{task::JoinHandle, time};

/// What a scheduled run is standing in for, echoed back when it completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeepAlivePayload {
    pub category_id: i64,
    pub duration_ms: u64,
}

/// Handle to a scheduled run; dropping it leaves the run alive.
pub struct ScheduleHandle {
    task: JoinHandle<()>,
}

impl ScheduleHandle {
    pub fn cancel(self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, Default)]
pub struct BackgroundScheduler;

impl BackgroundScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Fire-and-forget: sleep out the hinted duration, then report completion.
    pub fn schedule(&self, duration_hint: Duration, payload: KeepAlivePayload) -> ScheduleHandle {
        let task = tokio::spawn(async move {
            time::sleep(duration_hint).await;
            info!(
                "Keep-alive for category {} elapsed after {} ms",
                payload.category_id, payload.duration_ms
            );
        });

        ScheduleHandle { task }
    }
}
