use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-user display preferences, keyed 1:1 to a user.
///
/// A row is created with defaults the first time the user reads or writes
/// their settings.
#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSetting {
    pub user_id: i32,
    pub font_family: String,
    pub font_size: i32,
    pub background_image: String,
    pub theme: String,
    pub updated_at: DateTime<Utc>,
}

/// Partial settings update; absent fields keep their stored value.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub font_family: Option<String>,
    pub font_size: Option<i32>,
    pub background_image: Option<String>,
    pub theme: Option<String>,
}
