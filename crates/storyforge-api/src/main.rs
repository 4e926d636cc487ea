//! Storyforge API server entry point.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use storyforge_api::config::AppConfig;
use storyforge_api::error::AppError;
use storyforge_api::state::AppState;
use storyforge_api::{build_router, telemetry};
use storyforge_core::clock::SystemClock;
use storyforge_generator::OpenAiGenerator;
use storyforge_store::pg_job_repository::PgJobRepository;
use storyforge_store::pg_story_repository::PgStoryRepository;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    info!("Starting Storyforge API server");
    let result = serve(config).await;
    if let Err(err) = &result {
        error!(error = %err, "server exited with error");
    }

    telemetry.shutdown();
    result
}

async fn serve(config: AppConfig) -> Result<(), AppError> {
    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    if config.run_migrations {
        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!("database migrations applied");
    }

    let generator = OpenAiGenerator::new(config.openai.clone())
        .map_err(|e| AppError::Config(e.to_string()))?;

    // Build application state.
    let app_state = AppState::new(
        Arc::new(SystemClock),
        Arc::new(PgJobRepository::new(pool.clone())),
        Arc::new(PgStoryRepository::new(pool)),
        Arc::new(generator),
    );
    let app = build_router(app_state);

    // Start server.
    let addr = config.bind_addr()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
