use crate::{
    auth::{
        generate_token, hash_password, verify_password, AuthResponse, LoginRequest,
        RegisterRequest, UserSummary,
    },
    error::AppError,
    models::User,
};
use actix_web::{post, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

/// Register a new user
///
/// Creates a new user account. The nickname defaults to the username when
/// absent; username and (when provided) email must be unique.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    // Validate input
    register_data.validate()?;

    // Check if username already exists
    let existing_user =
        sqlx::query_as::<_, (i32,)>("SELECT id FROM users WHERE username = $1")
            .bind(&register_data.username)
            .fetch_optional(&**pool)
            .await?;

    if existing_user.is_some() {
        return Err(AppError::Conflict("Username already taken".into()));
    }

    // Email uniqueness only applies when an email was supplied
    if let Some(email) = &register_data.email {
        let existing_email = sqlx::query_as::<_, (i32,)>("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&**pool)
            .await?;
        if existing_email.is_some() {
            return Err(AppError::Conflict("Email already registered".into()));
        }
    }

    // Hash password
    let password_hash = hash_password(&register_data.password)?;

    let nickname = register_data
        .nickname
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| register_data.username.clone());

    sqlx::query(
        "INSERT INTO users (username, password_hash, nickname, email) VALUES ($1, $2, $3, $4)",
    )
    .bind(&register_data.username)
    .bind(&password_hash)
    .bind(&nickname)
    .bind(&register_data.email)
    .execute(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "code": 0 })))
}

/// Login user
///
/// Authenticates a user and returns a session token. An unknown username and
/// a wrong password produce the identical error so usernames cannot be
/// enumerated through this endpoint.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    // Validate input
    login_data.validate()?;

    // Get user from database
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password_hash, nickname, email, avatar_url, created_at
         FROM users WHERE username = $1",
    )
    .bind(&login_data.username)
    .fetch_optional(&**pool)
    .await?
    .ok_or(AppError::InvalidCredentials)?;

    // Verify password
    if !verify_password(&login_data.password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    // Generate token
    let token = generate_token(user.id)?;

    Ok(HttpResponse::Ok().json(json!({
        "code": 0,
        "data": AuthResponse {
            token,
            user: UserSummary {
                id: user.id,
                username: user.username,
                nickname: user.nickname,
            },
        }
    })))
}
