//! Bridges timer transitions to durable category/session records.
//!
//! Every write is enqueued on the database worker and never awaited: the
//! in-memory state transition already happened and is never rolled back, so
//! storage failures degrade to lost accounting, not lost responsiveness.
//! The worker's FIFO order serializes writes from sequential transitions.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Duration, Local, Utc};
use log::warn;

use crate::db::{
    connection::Database,
    models::Category,
    repositories::{close_session_row, credit_category_row, insert_session_row},
};

struct OpenSession {
    /// Row id, assigned on the database worker. Later tasks read it through
    /// this slot; the FIFO queue guarantees the insert filled it first.
    id: Arc<OnceLock<i64>>,
    category_id: i64,
    started_at: DateTime<Utc>,
}

/// Opens a session record when a work phase starts and closes it exactly
/// once when the phase ends, folding the elapsed time into the owning
/// category's running total.
pub struct SessionAccountant {
    db: Database,
    open: Option<OpenSession>,
}

impl SessionAccountant {
    pub fn new(db: Database) -> Self {
        Self { db, open: None }
    }

    pub fn has_open_session(&self) -> bool {
        self.open.is_some()
    }

    /// Open a session for `category`, stamped with the current instant and
    /// the local calendar day.
    pub fn open_session(&mut self, category: &Category) {
        if self.open.is_some() {
            // The engine finalizes before reopening; landing here means a
            // transition was lost somewhere upstream.
            warn!("Opening a session while one is already open; discarding the stale one");
            self.discard_session();
        }

        let started_at = Utc::now();
        let date = started_at
            .with_timezone(&Local)
            .format("%Y-%m-%d")
            .to_string();
        let id_slot = Arc::new(OnceLock::new());
        let category_id = category.id;

        let slot = id_slot.clone();
        self.db.execute_detached(move |conn| {
            let session_id = insert_session_row(conn, category_id, started_at, &date)?;
            let _ = slot.set(session_id);
            Ok(())
        });

        self.open = Some(OpenSession {
            id: id_slot,
            category_id,
            started_at,
        });
    }

    /// Close the open session with `elapsed_ms` of tracked work and credit
    /// the owning category. No-op when no session is open.
    ///
    /// The end time is `started_at + elapsed_ms`, so a closed row's span
    /// always equals exactly what was credited to the category.
    pub fn commit_session(&mut self, elapsed_ms: u64) {
        let Some(open) = self.open.take() else {
            return;
        };

        let ended_at = open.started_at + Duration::milliseconds(elapsed_ms as i64);
        let category_id = open.category_id;

        // One task for both writes, so no reader sees a closed session
        // without the matching category credit.
        self.db.execute_detached(move |conn| {
            match open.id.get() {
                Some(&session_id) => {
                    close_session_row(conn, session_id, ended_at)?;
                }
                None => warn!("Committing a session whose insert never completed"),
            }

            let credited = credit_category_row(conn, category_id, elapsed_ms)?;
            if credited == 0 {
                warn!("Category {category_id} is gone; dropping {elapsed_ms} ms of tracked time");
            }
            Ok(())
        });
    }

    /// Close the open session as zero-duration without crediting the
    /// category. No-op when no session is open.
    pub fn discard_session(&mut self) {
        let Some(open) = self.open.take() else {
            return;
        };

        let started_at = open.started_at;
        self.db.execute_detached(move |conn| {
            if let Some(&session_id) = open.id.get() {
                close_session_row(conn, session_id, started_at)?;
            }
            Ok(())
        });
    }
}
