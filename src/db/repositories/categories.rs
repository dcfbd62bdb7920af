use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{to_i64, to_u64},
    models::Category,
};

fn row_to_category(row: &Row) -> Result<Category> {
    let deleted: i64 = row.get("deleted")?;
    let total_time_spent_ms: i64 = row.get("total_time_spent_ms")?;

    Ok(Category {
        id: row.get("id")?,
        title: row.get("title")?,
        color: row.get("color")?,
        deleted: deleted != 0,
        total_time_spent_ms: to_u64(total_time_spent_ms, "total_time_spent_ms")?,
    })
}

/// Fold committed work time into the category accumulator. Returns the number
/// of rows touched; zero means the category no longer exists and the caller
/// decides whether that matters.
pub(crate) fn credit_category_row(
    conn: &Connection,
    category_id: i64,
    elapsed_ms: u64,
) -> Result<usize> {
    let affected = conn.execute(
        "UPDATE categories
         SET total_time_spent_ms = total_time_spent_ms + ?1
         WHERE id = ?2",
        params![to_i64(elapsed_ms)?, category_id],
    )?;
    Ok(affected)
}

impl Database {
    /// Create a category and return it with its assigned id.
    pub async fn create_category(&self, title: String, color: String) -> Result<Category> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO categories (title, color) VALUES (?1, ?2)",
                params![title, color],
            )?;

            let category_id = conn.last_insert_rowid();
            let mut stmt = conn.prepare(
                "SELECT id, title, color, deleted, total_time_spent_ms
                 FROM categories
                 WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![category_id])?;
            match rows.next()? {
                Some(row) => row_to_category(row),
                None => Err(anyhow!("category not found after insert")),
            }
        })
        .await
    }

    /// All categories that have not been soft-deleted, oldest first.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, color, deleted, total_time_spent_ms
                 FROM categories
                 WHERE deleted = 0
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut categories = Vec::new();
            while let Some(row) = rows.next()? {
                categories.push(row_to_category(row)?);
            }

            Ok(categories)
        })
        .await
    }

    pub async fn get_category(&self, category_id: i64) -> Result<Option<Category>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, color, deleted, total_time_spent_ms
                 FROM categories
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![category_id])?;
            match rows.next()? {
                Some(row) => row_to_category(row).map(Some),
                None => Ok(None),
            }
        })
        .await
    }

    /// Insert-or-replace, used for edits coming back from the category cards.
    pub async fn upsert_category(&self, category: Category) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO categories (id, title, color, deleted, total_time_spent_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    category.id,
                    category.title,
                    category.color,
                    category.deleted as i64,
                    to_i64(category.total_time_spent_ms)?,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Hide a category without touching its historical sessions. Returns the
    /// number of rows affected (zero when it was already hidden or missing).
    pub async fn soft_delete_category(&self, category_id: i64) -> Result<usize> {
        self.execute(move |conn| {
            let affected = conn.execute(
                "UPDATE categories SET deleted = 1 WHERE id = ?1 AND deleted = 0",
                params![category_id],
            )?;
            Ok(affected)
        })
        .await
    }

    /// Permanently remove a category. Its sessions cascade away with it.
    pub async fn delete_category(&self, category_id: i64) -> Result<()> {
        self.execute(move |conn| {
            conn.execute("DELETE FROM categories WHERE id = ?1", params![category_id])?;
            Ok(())
        })
        .await
    }

    /// Awaited variant of the accountant's commit credit, for callers outside
    /// the timer path.
    pub async fn add_time_to_category(&self, category_id: i64, elapsed_ms: u64) -> Result<usize> {
        self.execute(move |conn| credit_category_row(conn, category_id, elapsed_ms))
            .await
    }

    /// Total committed time for a category, straight from the accumulator.
    pub async fn total_time_for_category(&self, category_id: i64) -> Result<Option<u64>> {
        self.execute(move |conn| {
            let total: Option<i64> = conn
                .query_row(
                    "SELECT total_time_spent_ms FROM categories WHERE id = ?1",
                    params![category_id],
                    |row| row.get(0),
                )
                .optional()?;

            total
                .map(|value| to_u64(value, "total_time_spent_ms"))
                .transpose()
        })
        .await
    }
}
