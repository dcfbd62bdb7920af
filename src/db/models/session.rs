//! Session data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One durable record of a single work phase.
///
/// A session is open while `ended_at == started_at`; the accountant closes it
/// exactly once, either at the committed end time or back onto the sentinel
/// when the phase is discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i64,
    pub category_id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Calendar day the session started, formatted `YYYY-MM-DD`.
    pub date: String,
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.ended_at == self.started_at
    }

    pub fn duration_ms(&self) -> u64 {
        (self.ended_at - self.started_at).num_milliseconds().max(0) as u64
    }
}
