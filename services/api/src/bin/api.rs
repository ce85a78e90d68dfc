//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, OpenAiEstimateAdapter, OpenAiLayoutAdapter},
    config::Config,
    error::ApiError,
    web::{self, auth::hash_password, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::Router;
use buildestimate_core::{
    registry::{install_seed, FallbackRegistry, SeedData},
    EstimateEngine, Marketplace,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // The demo accounts and project are written into an empty database so they
    // can log in and be quoted on. Reads still fall back to them if the database fails.
    let seed = SeedData::bundled();
    let seed_hash = hash_password(&config.seed_password)
        .map_err(|e| ApiError::Internal(format!("Failed to hash the seed password: {}", e)))?;
    let installed = install_seed(&*db_adapter, &seed, &seed_hash).await?;
    if installed > 0 {
        info!("Database was empty; installed {} demo records.", installed);
    }
    let registry = Arc::new(FallbackRegistry::new(db_adapter, seed));

    // --- 3. Initialize Service Adapters ---
    let mut openai_config = OpenAIConfig::new().with_api_key(config.ai_api_key.clone());
    if let Some(base) = &config.ai_api_base {
        openai_config = openai_config.with_api_base(base.clone());
    }
    let openai_client = Client::with_config(openai_config);

    let estimate_adapter = Arc::new(OpenAiEstimateAdapter::new(
        openai_client.clone(),
        config.estimate_model.clone(),
    ));
    let layout_adapter = Arc::new(OpenAiLayoutAdapter::new(
        openai_client,
        config.layout_model.clone(),
    ));
    info!(
        "Generative models: estimates={}, layouts={}",
        config.estimate_model, config.layout_model
    );

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        marketplace: Marketplace::new(registry),
        engine: EstimateEngine::new(estimate_adapter, layout_adapter, config.ai_timeout),
        config: config.clone(),
    });

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(web::router(app_state)?)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
