use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{connection::Database, helpers::parse_datetime, models::Session};

fn row_to_session(row: &Row) -> Result<Session> {
    let started_at: String = row.get("started_at")?;
    let ended_at: String = row.get("ended_at")?;

    Ok(Session {
        id: row.get("id")?,
        category_id: row.get("category_id")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_datetime(&ended_at, "ended_at")?,
        date: row.get("date")?,
    })
}

/// Insert an open session row (`ended_at == started_at`) and return the
/// assigned id.
pub(crate) fn insert_session_row(
    conn: &Connection,
    category_id: i64,
    started_at: DateTime<Utc>,
    date: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO sessions (category_id, started_at, ended_at, date)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            category_id,
            started_at.to_rfc3339(),
            started_at.to_rfc3339(),
            date,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Write a session's end time, clearing the open sentinel. Returns the number
/// of rows touched.
pub(crate) fn close_session_row(
    conn: &Connection,
    session_id: i64,
    ended_at: DateTime<Utc>,
) -> Result<usize> {
    let affected = conn.execute(
        "UPDATE sessions SET ended_at = ?1 WHERE id = ?2",
        params![ended_at.to_rfc3339(), session_id],
    )?;
    Ok(affected)
}

impl Database {
    /// Open a new session for a category. Returns the assigned id.
    pub async fn insert_session(
        &self,
        category_id: i64,
        started_at: DateTime<Utc>,
        date: String,
    ) -> Result<i64> {
        self.execute(move |conn| insert_session_row(conn, category_id, started_at, &date))
            .await
    }

    /// Close a session at `ended_at`. Returns the number of rows affected.
    pub async fn update_session_end(
        &self,
        session_id: i64,
        ended_at: DateTime<Utc>,
    ) -> Result<usize> {
        self.execute(move |conn| close_session_row(conn, session_id, ended_at))
            .await
    }

    /// All sessions booked against a category, newest first.
    pub async fn sessions_for_category(&self, category_id: i64) -> Result<Vec<Session>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, category_id, started_at, ended_at, date
                 FROM sessions
                 WHERE category_id = ?1
                 ORDER BY started_at DESC",
            )?;

            let mut rows = stmt.query(params![category_id])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }

    /// Sum of closed session durations for a category. Instants are stored as
    /// RFC 3339 text, so the arithmetic happens here rather than in SQL.
    pub async fn total_session_time_for_category(&self, category_id: i64) -> Result<u64> {
        let sessions = self.sessions_for_category(category_id).await?;
        Ok(sessions.iter().map(Session::duration_ms).sum())
    }
}
