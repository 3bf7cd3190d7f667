use crate::{
    auth::{hash_password, verify_password, AuthenticatedUserId, ChangePasswordRequest},
    config::Config,
    error::AppError,
    models::{Profile, UpdateProfileRequest, UpdateSettingsRequest, UserSetting},
    uploads,
};
use actix_multipart::Multipart;
use actix_web::{get, post, put, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

const SETTINGS_COLUMNS: &str = "user_id, font_family, font_size, background_image, theme, updated_at";

/// Returns the authenticated user's profile fields.
///
/// ## Responses:
/// - `200 OK`: username, nickname, email, and avatar URL as JSON.
/// - `401 Unauthorized`: If the request lacks a valid session token.
/// - `404 Not Found`: If the subject row no longer exists.
#[get("/profile")]
pub async fn get_profile(
    pool: web::Data<PgPool>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let profile = sqlx::query_as::<_, Profile>(
        "SELECT username, nickname, email, avatar_url FROM users WHERE id = $1",
    )
    .bind(user.0)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(profile))
}

/// Applies a partial update to the authenticated user's profile.
///
/// Absent or empty fields are left unchanged. A username or email already
/// held by another user is rejected as a conflict.
///
/// ## Responses:
/// - `200 OK`: Returns the updated profile as JSON.
/// - `400 Bad Request`: On a duplicate username/email (`conflict`).
/// - `401 Unauthorized`: If the request lacks a valid session token.
/// - `404 Not Found`: If the subject row no longer exists.
#[put("/profile")]
pub async fn update_profile(
    pool: web::Data<PgPool>,
    user: AuthenticatedUserId,
    profile_data: web::Json<UpdateProfileRequest>,
) -> Result<impl Responder, AppError> {
    profile_data.validate()?;

    let mut profile = sqlx::query_as::<_, Profile>(
        "SELECT username, nickname, email, avatar_url FROM users WHERE id = $1",
    )
    .bind(user.0)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if let Some(username) = &profile_data.username {
        if !username.is_empty() {
            let taken = sqlx::query_as::<_, (i32,)>(
                "SELECT id FROM users WHERE username = $1 AND id != $2",
            )
            .bind(username)
            .bind(user.0)
            .fetch_optional(&**pool)
            .await?;
            if taken.is_some() {
                return Err(AppError::Conflict("Username already taken".into()));
            }
            profile.username = username.clone();
        }
    }

    if let Some(email) = &profile_data.email {
        if !email.is_empty() {
            let taken =
                sqlx::query_as::<_, (i32,)>("SELECT id FROM users WHERE email = $1 AND id != $2")
                    .bind(email)
                    .bind(user.0)
                    .fetch_optional(&**pool)
                    .await?;
            if taken.is_some() {
                return Err(AppError::Conflict("Email already registered".into()));
            }
            profile.email = Some(email.clone());
        }
    }

    let profile = sqlx::query_as::<_, Profile>(
        "UPDATE users SET username = $1, email = $2 WHERE id = $3 \
         RETURNING username, nickname, email, avatar_url",
    )
    .bind(&profile.username)
    .bind(&profile.email)
    .bind(user.0)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(profile))
}

/// Stores an uploaded avatar image and records its path on the user.
///
/// ## Responses:
/// - `200 OK`: `{"avatarUrl": "<stored path>"}`.
/// - `400 Bad Request`: If the multipart payload carries no `file` field.
/// - `401 Unauthorized`: If the request lacks a valid session token.
/// - `404 Not Found`: If the subject row no longer exists.
#[post("/avatar")]
pub async fn upload_avatar(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    user: AuthenticatedUserId,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    let dir = format!("{}/avatars", config.upload_dir);
    let saved = uploads::save_upload(payload, &dir).await?;

    let result = sqlx::query("UPDATE users SET avatar_url = $1 WHERE id = $2")
        .bind(&saved.file_path)
        .bind(user.0)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        // The subject row is gone; don't keep orphaned bytes around.
        uploads::remove_stored_file(&saved.file_path);
        return Err(AppError::NotFound("User not found".into()));
    }

    Ok(HttpResponse::Ok().json(json!({ "avatarUrl": saved.file_path })))
}

/// Replaces the authenticated user's password.
///
/// The stored hash is only replaced after the old password verifies.
///
/// ## Responses:
/// - `200 OK`: `{"code": 0}` once the new hash is persisted.
/// - `400 Bad Request`: If the old password does not match
///   (`invalid_credentials`).
/// - `401 Unauthorized`: If the request lacks a valid session token.
/// - `404 Not Found`: If the subject row no longer exists.
#[post("/password")]
pub async fn change_password(
    pool: web::Data<PgPool>,
    user: AuthenticatedUserId,
    password_data: web::Json<ChangePasswordRequest>,
) -> Result<impl Responder, AppError> {
    password_data.validate()?;

    let row = sqlx::query_as::<_, (String,)>("SELECT password_hash FROM users WHERE id = $1")
        .bind(user.0)
        .fetch_optional(&**pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if !verify_password(&password_data.old_password, &row.0)? {
        return Err(AppError::IncorrectPassword);
    }

    let new_hash = hash_password(&password_data.new_password)?;

    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(&new_hash)
        .bind(user.0)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "code": 0 })))
}

/// Returns the authenticated user's display settings, creating the row with
/// defaults on first read.
#[get("/settings")]
pub async fn get_settings(
    pool: web::Data<PgPool>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    sqlx::query("INSERT INTO user_settings (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user.0)
        .execute(&**pool)
        .await?;

    let sql = format!(
        "SELECT {} FROM user_settings WHERE user_id = $1",
        SETTINGS_COLUMNS
    );
    let settings = sqlx::query_as::<_, UserSetting>(&sql)
        .bind(user.0)
        .fetch_one(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(settings))
}

/// Applies a partial update to the authenticated user's display settings,
/// creating the row on first customization. Absent fields keep their stored
/// (or default) value.
#[put("/settings")]
pub async fn update_settings(
    pool: web::Data<PgPool>,
    user: AuthenticatedUserId,
    settings_data: web::Json<UpdateSettingsRequest>,
) -> Result<impl Responder, AppError> {
    let sql = format!(
        "INSERT INTO user_settings (user_id, font_family, font_size, background_image, theme) \
         VALUES ($1, COALESCE($2, 'Arial'), COALESCE($3, 14), COALESCE($4, ''), COALESCE($5, 'light')) \
         ON CONFLICT (user_id) DO UPDATE SET \
             font_family = COALESCE($2, user_settings.font_family), \
             font_size = COALESCE($3, user_settings.font_size), \
             background_image = COALESCE($4, user_settings.background_image), \
             theme = COALESCE($5, user_settings.theme), \
             updated_at = now() \
         RETURNING {}",
        SETTINGS_COLUMNS
    );
    let settings = sqlx::query_as::<_, UserSetting>(&sql)
        .bind(user.0)
        .bind(&settings_data.font_family)
        .bind(settings_data.font_size)
        .bind(&settings_data.background_image)
        .bind(&settings_data.theme)
        .fetch_one(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(settings))
}
