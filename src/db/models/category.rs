//! Category data models.

use serde::{Deserialize, Serialize};

/// Title given to a category created from the quick-add action.
pub const DEFAULT_CATEGORY_TITLE: &str = "New category";

/// Display color given to a freshly created category.
pub const DEFAULT_CATEGORY_COLOR: &str = "#FF5733";

/// A user-defined activity that work sessions are booked against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub color: String,
    /// Soft-delete flag. Hidden rows are kept so historical sessions
    /// retain a valid foreign key.
    pub deleted: bool,
    /// Accumulated committed work time in milliseconds. Mutated only when a
    /// work session is committed; never decreases.
    pub total_time_spent_ms: u64,
}
