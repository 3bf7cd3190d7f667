pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

/// Registers the canonical route table under the `/api` scope.
///
/// Registration and login are mounted here too; `AuthMiddleware` skips them
/// by path so they stay reachable without a session.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(auth::register)
        .service(auth::login)
        .service(
            web::scope("/tasks")
                .service(tasks::list_tasks)
                .service(tasks::create_task)
                .service(tasks::update_task)
                .service(tasks::purge_task)
                .service(tasks::soft_delete_task)
                .service(tasks::attach_resource),
        )
        .service(
            web::scope("/user")
                .service(users::get_profile)
                .service(users::update_profile)
                .service(users::upload_avatar)
                .service(users::change_password)
                .service(users::get_settings)
                .service(users::update_settings),
        );
}
