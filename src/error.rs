//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the
//! application. Every failure a handler can produce maps to one variant, and
//! each variant carries a stable machine code alongside a human-readable
//! message so clients can branch on failures without parsing prose.
//!
//! `AppError` implements `actix_web::error::ResponseError` to convert
//! application errors into HTTP responses with JSON bodies of the shape
//! `{"code": "...", "message": "..."}`. `From` implementations for
//! `sqlx::Error`, `validator::ValidationErrors`, `jsonwebtoken::errors::Error`,
//! `bcrypt::BcryptError`, and `std::io::Error` allow conversion via `?`.

use actix_web::{error::ResponseError, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Missing, malformed, mis-signed, or expired session token (HTTP 401).
    Unauthenticated(String),
    /// Unknown username or wrong password at login (HTTP 401).
    /// Both cases produce this same variant so usernames cannot be enumerated.
    InvalidCredentials,
    /// Wrong current password on a password change (HTTP 400).
    /// Shares the login failure's machine code but not its status: the
    /// caller already holds a session, so this is bad input, not a missing
    /// one.
    IncorrectPassword,
    /// Malformed or missing request fields (HTTP 400).
    InvalidInput(String),
    /// Uniqueness violation, e.g. a duplicate username or email (HTTP 400).
    Conflict(String),
    /// Operation not permitted in the record's current lifecycle state,
    /// e.g. purging a task that has not been recycled (HTTP 400).
    InvalidState(String),
    /// Requested record missing, or owned by a different user (HTTP 404).
    /// Ownership mismatches are deliberately indistinguishable from absence.
    NotFound(String),
    /// Error originating from the persistent store (HTTP 500).
    /// Kept separate from logic errors; details are logged, not surfaced.
    DatabaseError(String),
    /// Any other unexpected server-side failure (HTTP 500).
    InternalServerError(String),
    /// Failed input validation from the `validator` crate (HTTP 400).
    ValidationError(String),
}

impl AppError {
    /// Stable machine code included in every error response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::IncorrectPassword => "invalid_credentials",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidState(_) => "invalid_state",
            AppError::NotFound(_) => "not_found",
            AppError::DatabaseError(_) => "internal",
            AppError::InternalServerError(_) => "internal",
            AppError::ValidationError(_) => "invalid_input",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            AppError::InvalidCredentials => write!(f, "Invalid username or password"),
            AppError::IncorrectPassword => write!(f, "Old password is incorrect"),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
///
/// This implementation allows Actix Web to automatically translate `AppError`
/// results from handlers into the correct HTTP status codes and JSON bodies.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let code = self.code();
        match self {
            AppError::Unauthenticated(msg) => HttpResponse::Unauthorized().json(json!({
                "code": code,
                "message": msg
            })),
            AppError::InvalidCredentials => HttpResponse::Unauthorized().json(json!({
                "code": code,
                "message": "Invalid username or password"
            })),
            AppError::IncorrectPassword => HttpResponse::BadRequest().json(json!({
                "code": code,
                "message": "Old password is incorrect"
            })),
            AppError::InvalidInput(msg)
            | AppError::Conflict(msg)
            | AppError::InvalidState(msg)
            | AppError::ValidationError(msg) => HttpResponse::BadRequest().json(json!({
                "code": code,
                "message": msg
            })),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(json!({
                "code": code,
                "message": msg
            })),
            // Store and internal failures get a generic outward message;
            // the specifics only go to the server log.
            AppError::DatabaseError(msg) | AppError::InternalServerError(msg) => {
                log::error!("internal error: {}", msg);
                HttpResponse::InternalServerError().json(json!({
                    "code": code,
                    "message": "Internal server error"
                }))
            }
        }
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `RowNotFound` maps to `NotFound`. Unique-constraint violations map to
/// `Conflict`: handlers pre-check for duplicates to give a precise message,
/// but a concurrent insert can still land on the constraint and must surface
/// as the same conflict, not a 500. Everything else becomes `DatabaseError`
/// so transient failures stay distinguishable from logic errors.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                AppError::Conflict("Record already exists".into())
            }
            sqlx::Error::Database(e) => AppError::DatabaseError(e.to_string()),
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// JWT processing failures (bad signature, expiry) are authentication failures.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthenticated(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

/// Filesystem failures while persisting uploads surface as internal errors.
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let error = AppError::Unauthenticated("Missing token".into());
        assert_eq!(error.error_response().status(), 401);

        let error = AppError::InvalidCredentials;
        assert_eq!(error.error_response().status(), 401);

        // Same machine code as a login failure, but the caller is already
        // authenticated, so the status is 400.
        let error = AppError::IncorrectPassword;
        assert_eq!(error.error_response().status(), 400);

        let error = AppError::InvalidInput("Missing title".into());
        assert_eq!(error.error_response().status(), 400);

        let error = AppError::Conflict("Username already taken".into());
        assert_eq!(error.error_response().status(), 400);

        let error = AppError::InvalidState("Task is not in the recycle bin".into());
        assert_eq!(error.error_response().status(), 400);

        let error = AppError::NotFound("Task not found".into());
        assert_eq!(error.error_response().status(), 404);

        let error = AppError::DatabaseError("connection reset".into());
        assert_eq!(error.error_response().status(), 500);
    }

    #[test]
    fn test_machine_codes() {
        assert_eq!(AppError::InvalidCredentials.code(), "invalid_credentials");
        assert_eq!(AppError::IncorrectPassword.code(), "invalid_credentials");
        assert_eq!(AppError::Conflict("x".into()).code(), "conflict");
        assert_eq!(AppError::InvalidState("x".into()).code(), "invalid_state");
        // Store errors must not leak their own code to clients.
        assert_eq!(AppError::DatabaseError("x".into()).code(), "internal");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let error = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(error, AppError::NotFound(_)));
    }
}
