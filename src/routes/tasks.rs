use crate::{
    auth::AuthenticatedUserId,
    config::Config,
    error::AppError,
    models::{parse_due_date, Task, TaskInput, TaskResource, TaskUpdate},
    uploads,
};
use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

const TASK_COLUMNS: &str =
    "id, title, description, due_date, category, tags, completed, is_deleted, \
     user_id, created_at, updated_at";

/// Fetches a task scoped by (id, owner). A task owned by someone else is
/// indistinguishable from a missing one.
async fn task_for_owner(pool: &PgPool, task_id: i32, owner_id: i32) -> Result<Task, AppError> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
        TASK_COLUMNS
    );
    sqlx::query_as::<_, Task>(&sql)
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))
}

/// Retrieves all tasks owned by the authenticated user.
///
/// Both active and recycled tasks are returned, ordered by due date
/// ascending; the client renders the recycle bin from the `isDeleted` flag.
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of `Task` objects.
/// - `401 Unauthorized`: If the request lacks a valid session token.
/// - `500 Internal Server Error`: For database errors.
#[get("")]
pub async fn list_tasks(
    pool: web::Data<PgPool>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE user_id = $1 ORDER BY due_date ASC",
        TASK_COLUMNS
    );
    let tasks = sqlx::query_as::<_, Task>(&sql)
        .bind(user.0)
        .fetch_all(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task for the authenticated user.
///
/// Expects a JSON payload conforming to `TaskInput`. The owner is always the
/// session subject and a fresh task always starts active (`isDeleted` false).
///
/// ## Responses:
/// - `200 OK`: Returns the newly created `Task` object as JSON.
/// - `400 Bad Request`: If the title is missing/empty or the due date does
///   not parse as `YYYY-MM-DD`.
/// - `401 Unauthorized`: If the request lacks a valid session token.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUserId,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let due_date = parse_due_date(&task_data.due_date)?;

    let sql = format!(
        "INSERT INTO tasks (title, description, due_date, category, tags, completed, user_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {}",
        TASK_COLUMNS
    );
    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(&task_data.title)
        .bind(task_data.description.clone().unwrap_or_default())
        .bind(due_date)
        .bind(task_data.category.clone().unwrap_or_default())
        .bind(task_data.tags.clone().unwrap_or_default())
        .bind(task_data.completed.unwrap_or(false))
        .bind(user.0)
        .fetch_one(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(task))
}

/// Applies a partial update to a task owned by the authenticated user.
///
/// Absent or empty string fields keep their stored value; `tags` is always
/// overwritten verbatim (including to empty) and `isDeleted` applies only
/// when explicitly present, which doubles as the restore path out of the
/// recycle bin.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `Task` object as JSON.
/// - `400 Bad Request`: If a present `dueDate` does not parse.
/// - `401 Unauthorized`: If the request lacks a valid session token.
/// - `404 Not Found`: If no task matches (id, owner).
#[put("/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUserId,
    task_id: web::Path<i32>,
    task_data: web::Json<TaskUpdate>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let mut task = task_for_owner(&pool, task_id.into_inner(), user.0).await?;
    task.apply_update(&task_data)?;

    let sql = format!(
        "UPDATE tasks \
         SET title = $1, description = $2, due_date = $3, category = $4, tags = $5, \
             completed = $6, is_deleted = $7, updated_at = now() \
         WHERE id = $8 AND user_id = $9 \
         RETURNING {}",
        TASK_COLUMNS
    );
    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.due_date)
        .bind(&task.category)
        .bind(&task.tags)
        .bind(task.completed)
        .bind(task.is_deleted)
        .bind(task.id)
        .bind(user.0)
        .fetch_one(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(task))
}

/// Moves a task into the recycle bin (soft delete).
///
/// Idempotent: recycling an already-recycled task is a no-op success.
///
/// ## Responses:
/// - `200 OK`: `{"code": 0}` once the task is recycled.
/// - `401 Unauthorized`: If the request lacks a valid session token.
/// - `404 Not Found`: If no task matches (id, owner).
#[delete("/{id}")]
pub async fn soft_delete_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUserId,
    task_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let task = task_for_owner(&pool, task_id.into_inner(), user.0).await?;

    if !task.is_deleted {
        sqlx::query("UPDATE tasks SET is_deleted = true, updated_at = now() WHERE id = $1")
            .bind(task.id)
            .execute(&**pool)
            .await?;
    }

    Ok(HttpResponse::Ok().json(json!({ "code": 0 })))
}

/// Permanently removes a recycled task (purge).
///
/// Strict policy: only tasks already in the recycle bin may be purged.
/// Attachment rows are removed in the same transaction as the task row, and
/// their stored files are cleaned up best-effort after commit.
///
/// ## Responses:
/// - `200 OK`: `{"code": 0}` once the row is gone.
/// - `400 Bad Request`: If the task is still active (`invalid_state`).
/// - `401 Unauthorized`: If the request lacks a valid session token.
/// - `404 Not Found`: If no task matches (id, owner).
#[delete("/permanent/{id}")]
pub async fn purge_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUserId,
    task_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let task = task_for_owner(&pool, task_id.into_inner(), user.0).await?;

    if !task.is_deleted {
        return Err(AppError::InvalidState(
            "Only recycled tasks can be permanently deleted".into(),
        ));
    }

    let mut tx = pool.begin().await?;

    let file_paths =
        sqlx::query_as::<_, (String,)>("SELECT file_path FROM task_resources WHERE task_id = $1")
            .bind(task.id)
            .fetch_all(&mut *tx)
            .await?;

    sqlx::query("DELETE FROM task_resources WHERE task_id = $1")
        .bind(task.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
        .bind(task.id)
        .bind(user.0)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    // Stored bytes are cleaned up only after the rows are durably gone.
    for (path,) in &file_paths {
        uploads::remove_stored_file(path);
    }

    Ok(HttpResponse::Ok().json(json!({ "code": 0 })))
}

/// Attaches an uploaded file to a task owned by the authenticated user.
///
/// ## Responses:
/// - `201 Created`: Returns the recorded `TaskResource` metadata as JSON.
/// - `400 Bad Request`: If the multipart payload carries no `file` field.
/// - `401 Unauthorized`: If the request lacks a valid session token.
/// - `404 Not Found`: If no task matches (id, owner).
#[post("/{id}/resource")]
pub async fn attach_resource(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    user: AuthenticatedUserId,
    task_id: web::Path<i32>,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    let task = task_for_owner(&pool, task_id.into_inner(), user.0).await?;

    let dir = format!("{}/tasks", config.upload_dir);
    let saved = uploads::save_upload(payload, &dir).await?;

    let resource = sqlx::query_as::<_, TaskResource>(
        "INSERT INTO task_resources (task_id, file_name, file_path, file_size) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, task_id, file_name, file_path, file_size, created_at",
    )
    .bind(task.id)
    .bind(&saved.file_name)
    .bind(&saved.file_path)
    .bind(saved.file_size)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(resource))
}
