use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use amor::app_state::{build_pipeline, AppState};
use amor::auth::TokenVerifier;
use amor::config::AppConfig;
use amor::db::{self, PgStore};
use amor::routes;
use amor::services::queue::JobQueue;
use amor::telemetry;

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    // Configuration problems are fatal at startup
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing amor API server");

    let prometheus_handle =
        Arc::new(telemetry::init_metrics().expect("Failed to install Prometheus metrics recorder"));

    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Connecting to Redis job queue");
    let queue = JobQueue::new(&config.redis_url).expect("Failed to initialize job queue");

    // The API only uses the pipeline for manual status checks
    let pipeline = build_pipeline(&config, PgStore::new(db_pool.clone()))
        .expect("Failed to initialize song pipeline");

    let state = AppState::new(
        db_pool,
        queue,
        Arc::new(pipeline),
        TokenVerifier::new(&config.jwt_secret),
    );

    let app = routes::router(state, prometheus_handle)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
