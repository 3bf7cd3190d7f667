use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// File attachment belonging to a task.
///
/// Created by upload, never updated. Rows (and their stored files) are removed
/// explicitly when the owning task is purged; soft-deleting a task leaves its
/// attachments in place so a restore gets them back.
#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskResource {
    pub id: i32,
    pub task_id: i32,
    /// Original filename as supplied by the client.
    pub file_name: String,
    /// Server-side storage path with a generated, collision-free name.
    pub file_path: String,
    /// Size in bytes as written to storage.
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}
