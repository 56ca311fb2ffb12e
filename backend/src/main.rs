use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;

mod config;
mod handlers;
mod middleware;
mod models;
mod providers;
mod services;

use config::Config;
use providers::{HttpIdentity, HttpPayments, HttpStorage};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    log::info!("Starting server at {}:{}", config.host, config.port);

    // Create database pool
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to create database pool");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    log::info!("Database migrations completed");

    // Shared HTTP client for the provider adapters
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client");

    let identity = Arc::new(HttpIdentity::new(
        http_client.clone(),
        config.identity_base_url.clone(),
    ));
    let payments = Arc::new(HttpPayments::new(
        http_client.clone(),
        config.payments_base_url.clone(),
        config.payments_api_key.clone(),
    ));
    let storage = Arc::new(HttpStorage::new(
        http_client,
        config.storage_base_url.clone(),
        config.storage_bucket.clone(),
        config.storage_api_key.clone(),
    ));

    // Rate limiter for session exchanges (5 attempts per 15 minutes)
    let session_rate_limiter = Arc::new(middleware::RateLimiter::new(5, 15 * 60));

    // Create app state
    let app_state = web::Data::new(models::AppState {
        db: pool,
        config: config.clone(),
        session_rate_limiter,
        identity,
        payments,
        storage,
    });

    // Start HTTP server
    HttpServer::new(move || {
        let allowed_origins = config.cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origin_str = origin.to_str().unwrap_or("");
                allowed_origins.iter().any(|allowed| origin_str.starts_with(allowed))
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type"])
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            // Uploads are size-checked by the document service, the payload
            // cap just needs to sit above its 5 MiB limit
            .app_data(web::PayloadConfig::new(6 * 1024 * 1024))
            .wrap(Logger::default())
            .wrap(cors)
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
