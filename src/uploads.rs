//!
//! # Multipart upload persistence
//!
//! Streams a `multipart/form-data` file field to local storage. Used by the
//! avatar and task-attachment endpoints. Stored files get a generated
//! UUID-prefixed name so concurrent uploads of the same filename never
//! collide and client-supplied path components never reach the filesystem.

use crate::error::AppError;
use actix_multipart::Multipart;
use actix_web::web;
use futures::TryStreamExt;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

/// Metadata of a file persisted from a multipart request.
#[derive(Debug)]
pub struct SavedFile {
    /// Original filename as supplied by the client (sanitized).
    pub file_name: String,
    /// Path the bytes were written to, relative to the process working dir.
    pub file_path: String,
    /// Number of bytes written.
    pub file_size: i64,
}

/// Strips any client-supplied directory components from an uploaded filename.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = Path::new(raw)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("");
    if base.is_empty() || base == "." || base == ".." {
        "file".to_string()
    } else {
        base.to_string()
    }
}

/// Saves the first `file` field of a multipart payload under `dir`.
///
/// Fails with `AppError::InvalidInput` when the payload carries no `file`
/// field, and `AppError::InternalServerError` on filesystem errors.
pub async fn save_upload(mut payload: Multipart, dir: &str) -> Result<SavedFile, AppError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed multipart payload: {}", e)))?
    {
        if field.name() != "file" {
            continue;
        }

        let file_name = field
            .content_disposition()
            .get_filename()
            .map(sanitize_file_name)
            .unwrap_or_else(|| "file".to_string());

        let stored_name = format!("{}-{}", Uuid::new_v4(), file_name);
        let file_path = format!("{}/{}", dir.trim_end_matches('/'), stored_name);

        // Blocking filesystem work goes through web::block so the worker
        // threads stay free for request handling.
        let target_dir = dir.to_string();
        let write_path = file_path.clone();
        let mut file = web::block(move || {
            std::fs::create_dir_all(&target_dir)?;
            std::fs::File::create(write_path)
        })
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))??;

        let mut file_size: i64 = 0;
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read upload: {}", e)))?
        {
            file_size += chunk.len() as i64;
            file = web::block(move || file.write_all(&chunk).map(|_| file))
                .await
                .map_err(|e| AppError::InternalServerError(e.to_string()))??;
        }

        return Ok(SavedFile {
            file_name,
            file_path,
            file_size,
        });
    }

    Err(AppError::InvalidInput("File is required".into()))
}

/// Best-effort removal of a stored file; a miss is not an error.
pub fn remove_stored_file(path: &str) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("failed to remove stored file {}: {}", path, e);
        }
    }
}
