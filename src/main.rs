//src/main.rs

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;

fn build_router(app_state: AppState) -> Router {
    let upload_limit = app_state.config.max_upload_bytes;

    let analysis_routes = Router::new()
        .route("/upload", post(handlers::upload::upload_file))
        .route("/clear", post(handlers::upload::clear_results))
        // Folga para o envelope multipart; o tamanho do arquivo é conferido no handler
        .layer(DefaultBodyLimit::max(upload_limit + 64 * 1024));

    let results_routes = Router::new()
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .route("/quality", get(handlers::dashboard::get_quality))
        .route("/customers", get(handlers::dashboard::get_customers))
        .route("/collections", get(handlers::dashboard::get_collections))
        .route("/projections", get(handlers::dashboard::get_projections))
        .route("/{view}", get(handlers::dashboard::get_view));

    let export_routes = Router::new()
        .route("/plans.csv", get(handlers::export::export_plans_csv))
        .route("/collections.csv", get(handlers::export::export_collections_csv))
        .route("/projections.csv", get(handlers::export::export_projections_csv));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(handlers::upload::health))
        .route("/api/classes", get(handlers::dashboard::get_classes))
        .route("/api/plans/{plan_id}", get(handlers::dashboard::get_plan))
        .nest("/api", analysis_routes)
        .nest("/api/results", results_routes)
        .nest("/api/export", export_routes)
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Sem configuração válida a aplicação não sobe
    let app_state = AppState::new()?;
    let addr = app_state.config.bind_address();

    let app = build_router(app_state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    tracing::info!("📚 Documentação em http://{}/swagger-ui", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
