// src/handlers/export.rs

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::dashboard::{current_snapshot, ClassQuery},
    models::dashboard::ProjectionScenario,
    services::{collections_service, dashboard_service::projection_rows, export_service, normalizer_service::customer_key},
};

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProjectionExportQuery {
    #[validate(length(max = 100, message = "A classe pode ter no máximo 100 caracteres."))]
    pub class: Option<String>,

    /// Só este cliente (sem diferenciar maiúsculas); vazio = todos
    #[validate(length(max = 200, message = "O nome pode ter no máximo 200 caracteres."))]
    pub customer: Option<String>,

    #[validate(range(min = 1, max = 120, message = "O horizonte deve estar entre 1 e 120 meses."))]
    pub months: Option<u32>,

    pub scenario: Option<ProjectionScenario>,
}

fn csv_response(file_name: &str, body: Vec<u8>) -> impl IntoResponse + use<> {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        body,
    )
}

// GET /api/export/plans.csv
#[utoipa::path(
    get,
    path = "/api/export/plans.csv",
    tag = "Exportação",
    params(ClassQuery),
    responses(
        (status = 200, description = "Tabela plano + métricas, uma linha por plano", content_type = "text/csv", body = String),
        (status = 404, description = "Nenhuma análise carregada")
    )
)]
pub async fn export_plans_csv(
    State(app_state): State<AppState>,
    Query(query): Query<ClassQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let snapshot = current_snapshot(&app_state)?;

    let rows = app_state.dashboard_service.export_rows(&snapshot, query.class.as_deref());
    let body = export_service::to_csv(&rows)?;

    tracing::info!("📤 Exportados {} planos", rows.len());
    Ok(csv_response("plans.csv", body))
}

// GET /api/export/collections.csv
#[utoipa::path(
    get,
    path = "/api/export/collections.csv",
    tag = "Exportação",
    params(ClassQuery),
    responses(
        (status = 200, description = "Lista de cobrança priorizada", content_type = "text/csv", body = String),
        (status = 404, description = "Nenhuma análise carregada")
    )
)]
pub async fn export_collections_csv(
    State(app_state): State<AppState>,
    Query(query): Query<ClassQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let snapshot = current_snapshot(&app_state)?;

    let plans = app_state.dashboard_service.filter_plans(&snapshot, query.class.as_deref());
    let entries = collections_service::prioritize(&plans);
    let body = export_service::to_csv(&entries)?;

    Ok(csv_response("collections.csv", body))
}

// GET /api/export/projections.csv
#[utoipa::path(
    get,
    path = "/api/export/projections.csv",
    tag = "Exportação",
    params(ProjectionExportQuery),
    responses(
        (status = 200, description = "Linha do tempo projetada, uma linha por cliente e mês", content_type = "text/csv", body = String),
        (status = 404, description = "Nenhuma análise carregada ou cliente sem projeção")
    )
)]
pub async fn export_projections_csv(
    State(app_state): State<AppState>,
    Query(query): Query<ProjectionExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let snapshot = current_snapshot(&app_state)?;

    let scenario = query.scenario.unwrap_or_default();
    let view = app_state
        .dashboard_service
        .projections(&snapshot, query.class.as_deref(), query.months, scenario);

    let wanted = query.customer.as_deref().map(customer_key).filter(|key| !key.is_empty());
    let customers: Vec<_> = view
        .customers
        .iter()
        .filter(|c| wanted.as_deref().is_none_or(|key| customer_key(&c.customer_name) == key))
        .collect();

    if wanted.is_some() && customers.is_empty() {
        let name = query.customer.unwrap_or_default();
        return Err(AppError::CustomerNotFound(name.trim().to_string()));
    }

    let rows: Vec<_> = customers.into_iter().flat_map(|c| projection_rows(c, scenario)).collect();
    let body = export_service::to_csv(&rows)?;

    let file_name = format!("projections_{}.csv", scenario.as_str());
    Ok(csv_response(&file_name, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::loaded_state;

    #[tokio::test]
    async fn plans_export_is_a_csv_attachment() {
        let state = loaded_state().await;
        let response = export_plans_csv(State(state), Query(ClassQuery::default()))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
        assert!(response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().contains("plans.csv"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(text.lines().count(), 5);
    }

    #[tokio::test]
    async fn collections_export_filters_by_class() {
        let state = loaded_state().await;
        let response = export_collections_csv(State(state), Query(ClassQuery { class: Some("Retail".into()) }))
            .await
            .unwrap()
            .into_response();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("Acme Corp"));
        assert!(!text.contains("Globex"));
    }

    #[tokio::test]
    async fn projection_export_for_one_customer() {
        let state = loaded_state().await;
        let query = ProjectionExportQuery {
            customer: Some("  globex ".into()),
            months: Some(4),
            scenario: Some(ProjectionScenario::Restart),
            ..Default::default()
        };
        let response = export_projections_csv(State(state), Query(query)).await.unwrap().into_response();

        assert!(response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().contains("projections_restart.csv"));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        // cabeçalho + 4 meses
        assert_eq!(text.lines().count(), 5);
        assert!(text.lines().skip(1).all(|line| line.starts_with("Globex,restart,")));
    }

    #[tokio::test]
    async fn projection_export_for_unknown_customer_is_not_found() {
        let state = loaded_state().await;
        let query = ProjectionExportQuery { customer: Some("Nowhere Inc".into()), ..Default::default() };
        let err = export_projections_csv(State(state), Query(query)).await.err().unwrap();
        assert!(matches!(err, AppError::CustomerNotFound(_)));
    }
}
