use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use sqlx::PgPool;

use taskbin::auth::AuthMiddleware;
use taskbin::config::Config;
use taskbin::routes::{self, health};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    std::fs::create_dir_all(format!("{}/avatars", config.upload_dir))
        .expect("Failed to create upload directory");
    std::fs::create_dir_all(format!("{}/tasks", config.upload_dir))
        .expect("Failed to create upload directory");

    let bind_addr = (config.server_host.clone(), config.server_port);
    log::info!("Starting TaskBin server at {}", config.server_url());

    let pool_data = web::Data::new(pool);
    let config_data = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .app_data(pool_data.clone())
            .app_data(config_data.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
