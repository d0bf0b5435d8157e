use axum::{routing::{get, post}, Router};
use std::sync::Arc;
use supplement_audit::{api, AppConfig, ComparisonService};
use tower::ServiceBuilder;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging with local timestamps
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config ({}), using defaults", e);
        AppConfig::default()
    });
    info!("Starting server with config: {:?}", config);

    let service = Arc::new(ComparisonService::new(&config.analysis));

    let compare_routes = Router::new()
        .route("/api/compare", post(api::compare))
        .route("/api/compare/batch", post(api::compare_batch))
        .with_state(service);

    let app = Router::new()
        .route("/health", get(api::health_check))
        .merge(compare_routes)
        .layer(ServiceBuilder::new());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/compare        - single claim");
    info!("  POST /api/compare/batch  - many claims, results in request order");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
