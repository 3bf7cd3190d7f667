use crate::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Parses a calendar date in the wire format `YYYY-MM-DD`.
///
/// Due dates carry no time-of-day component; anything that is not a plain
/// calendar date is rejected as invalid input.
pub fn parse_due_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidInput(format!("Invalid due date: {}", raw)))
}

/// Represents a task entity as stored in the database and returned by the API.
///
/// A task moves through three lifecycle states: active (`is_deleted = false`),
/// recycled (`is_deleted = true`), and purged (row removed). Only recycled
/// tasks may be purged.
#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for the task.
    pub id: i32,
    /// The title of the task.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Calendar due date (`YYYY-MM-DD` on the wire, no time-of-day).
    pub due_date: NaiveDate,
    /// Free-text category.
    pub category: String,
    /// Comma-separated tag string.
    pub tags: String,
    /// Whether the task has been completed.
    pub completed: bool,
    /// Recycle-bin flag. Recycled tasks stay visible in listings so the
    /// client can render the bin; only a purge removes the row.
    pub is_deleted: bool,
    /// Identifier of the user who owns the task.
    pub user_id: i32,
    /// Timestamp of when the task was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update to the task.
    pub updated_at: DateTime<Utc>,
}

/// Input structure for creating a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    /// The title of the task. Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Due date as a `YYYY-MM-DD` string. Parsed, not stored verbatim.
    pub due_date: String,
    /// Optional description. Maximum length of 1000 characters if provided.
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    /// Optional free-text category.
    pub category: Option<String>,
    /// Optional comma-separated tag string.
    pub tags: Option<String>,
    /// Optional initial completion flag.
    pub completed: Option<bool>,
}

/// Partial update for a task. Absent or empty string fields leave the stored
/// value unchanged, with two exceptions: `tags` is always overwritten verbatim
/// (including to empty), and `is_deleted` / `completed` apply only when
/// explicitly present.
#[derive(Debug, Serialize, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[validate(length(max = 200))]
    pub title: Option<String>,
    pub due_date: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub is_deleted: Option<bool>,
    pub completed: Option<bool>,
}

impl Task {
    /// Applies a partial update in place, enforcing the merge semantics
    /// described on [`TaskUpdate`]. Fails only when a present `dueDate`
    /// does not parse as a calendar date.
    pub fn apply_update(&mut self, update: &TaskUpdate) -> Result<(), AppError> {
        if let Some(title) = &update.title {
            if !title.is_empty() {
                self.title = title.clone();
            }
        }
        if let Some(due_date) = &update.due_date {
            if !due_date.is_empty() {
                self.due_date = parse_due_date(due_date)?;
            }
        }
        if let Some(description) = &update.description {
            if !description.is_empty() {
                self.description = description.clone();
            }
        }
        if let Some(category) = &update.category {
            if !category.is_empty() {
                self.category = category.clone();
            }
        }
        // Tags are overwritten verbatim; an absent field clears them.
        self.tags = update.tags.clone().unwrap_or_default();
        if let Some(is_deleted) = update.is_deleted {
            self.is_deleted = is_deleted;
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}
