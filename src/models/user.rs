use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Full user record as stored in the database.
///
/// Never serialized to clients directly: the password hash stays server-side.
/// Handlers respond with [`Profile`] instead.
#[derive(Debug, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub nickname: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Client-facing view of a user record.
#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub username: String,
    pub nickname: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// Partial profile update. Absent or empty fields leave the stored value
/// unchanged; both username and email are checked for uniqueness against
/// other users before being applied.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 32))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}
