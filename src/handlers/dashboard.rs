// src/handlers/dashboard.rs

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        compliance::PlanStatus,
        dashboard::{
            ClassesResponse, CollectionsView, CustomerFilter, CustomerSort, CustomersView, DashboardView,
            PlanDetail, ProjectionScenario, ProjectionsView, QualityView, SortOrder, ViewKind, ViewPayload,
        },
        snapshot::AnalysisSnapshot,
    },
};

// ---
// Parâmetros de consulta
// ---
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ClassQuery {
    /// Classe (vazio ou "all" = todas)
    #[validate(length(max = 100, message = "A classe pode ter no máximo 100 caracteres."))]
    pub class: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProjectionsQuery {
    #[validate(length(max = 100, message = "A classe pode ter no máximo 100 caracteres."))]
    pub class: Option<String>,

    /// Horizonte da projeção em meses
    #[validate(range(min = 1, max = 120, message = "O horizonte deve estar entre 1 e 120 meses."))]
    pub months: Option<u32>,

    /// current: atrasados não pagam; restart (padrão): todos voltam a pagar
    pub scenario: Option<ProjectionScenario>,
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CustomersQuery {
    #[validate(length(max = 100, message = "A classe pode ter no máximo 100 caracteres."))]
    pub class: Option<String>,

    pub status: Option<PlanStatus>,

    /// Busca por nome (sem diferenciar maiúsculas)
    #[validate(length(max = 200, message = "A busca pode ter no máximo 200 caracteres."))]
    pub search: Option<String>,

    pub sort: Option<CustomerSort>,
    pub order: Option<SortOrder>,

    #[validate(range(min = 1, message = "A página começa em 1."))]
    pub page: Option<usize>,

    #[validate(range(min = 1, max = 100, message = "perPage deve estar entre 1 e 100."))]
    pub per_page: Option<usize>,
}

impl From<CustomersQuery> for CustomerFilter {
    fn from(query: CustomersQuery) -> Self {
        Self {
            class_filter: query.class,
            status: query.status,
            search: query.search,
            sort: query.sort.unwrap_or_default(),
            order: query.order.unwrap_or_default(),
            page: query.page.unwrap_or(1),
            per_page: query.per_page.unwrap_or(25),
        }
    }
}

pub(crate) fn current_snapshot(app_state: &AppState) -> Result<Arc<AnalysisSnapshot>, AppError> {
    app_state.snapshot_store.get().ok_or(AppError::NoAnalysisData)
}

// GET /api/results/dashboard
#[utoipa::path(
    get,
    path = "/api/results/dashboard",
    tag = "Resultados",
    params(ClassQuery),
    responses(
        (status = 200, description = "Resumo da carteira", body = DashboardView),
        (status = 404, description = "Nenhuma análise carregada")
    )
)]
pub async fn get_dashboard(
    State(app_state): State<AppState>,
    Query(query): Query<ClassQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let snapshot = current_snapshot(&app_state)?;
    let view = app_state.dashboard_service.dashboard(&snapshot, query.class.as_deref());
    Ok((StatusCode::OK, Json(view)))
}

// GET /api/results/quality
#[utoipa::path(
    get,
    path = "/api/results/quality",
    tag = "Resultados",
    params(ClassQuery),
    responses(
        (status = 200, description = "Problemas de qualidade dos dados", body = QualityView),
        (status = 404, description = "Nenhuma análise carregada")
    )
)]
pub async fn get_quality(
    State(app_state): State<AppState>,
    Query(query): Query<ClassQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let snapshot = current_snapshot(&app_state)?;
    let view = app_state.dashboard_service.quality(&snapshot, query.class.as_deref());
    Ok((StatusCode::OK, Json(view)))
}

// GET /api/results/customers
#[utoipa::path(
    get,
    path = "/api/results/customers",
    tag = "Resultados",
    params(CustomersQuery),
    responses(
        (status = 200, description = "Clientes com filtro, ordenação e paginação", body = CustomersView),
        (status = 400, description = "Parâmetros inválidos"),
        (status = 404, description = "Nenhuma análise carregada")
    )
)]
pub async fn get_customers(
    State(app_state): State<AppState>,
    Query(query): Query<CustomersQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let snapshot = current_snapshot(&app_state)?;
    let view = app_state.dashboard_service.customers(&snapshot, &CustomerFilter::from(query));
    Ok((StatusCode::OK, Json(view)))
}

// GET /api/results/collections
#[utoipa::path(
    get,
    path = "/api/results/collections",
    tag = "Resultados",
    params(ClassQuery),
    responses(
        (status = 200, description = "Planos em atraso por prioridade de cobrança", body = CollectionsView),
        (status = 404, description = "Nenhuma análise carregada")
    )
)]
pub async fn get_collections(
    State(app_state): State<AppState>,
    Query(query): Query<ClassQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let snapshot = current_snapshot(&app_state)?;
    let view = app_state.dashboard_service.collections(&snapshot, query.class.as_deref());
    Ok((StatusCode::OK, Json(view)))
}

// GET /api/results/projections
#[utoipa::path(
    get,
    path = "/api/results/projections",
    tag = "Resultados",
    params(ProjectionsQuery),
    responses(
        (status = 200, description = "Fluxo de caixa mensal projetado e linha do tempo por cliente", body = ProjectionsView),
        (status = 404, description = "Nenhuma análise carregada")
    )
)]
pub async fn get_projections(
    State(app_state): State<AppState>,
    Query(query): Query<ProjectionsQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let snapshot = current_snapshot(&app_state)?;
    let view = app_state
        .dashboard_service
        .projections(&snapshot, query.class.as_deref(), query.months, query.scenario.unwrap_or_default());
    Ok((StatusCode::OK, Json(view)))
}

// GET /api/results/{view}
#[utoipa::path(
    get,
    path = "/api/results/{view}",
    tag = "Resultados",
    params(
        ("view" = String, Path, description = "dashboard | quality | customers | collections | projections"),
        ClassQuery
    ),
    responses(
        (status = 200, description = "Visão solicitada, envelopada com o nome", body = ViewPayload),
        (status = 404, description = "Visão desconhecida ou nenhuma análise carregada")
    )
)]
pub async fn get_view(
    State(app_state): State<AppState>,
    Path(view): Path<String>,
    Query(query): Query<ClassQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate()?;
    let kind = ViewKind::parse(&view).ok_or(AppError::UnknownView(view))?;
    let snapshot = current_snapshot(&app_state)?;
    let payload = app_state.dashboard_service.render(&snapshot, kind, query.class.as_deref());
    Ok((StatusCode::OK, Json(payload)))
}

// GET /api/classes
#[utoipa::path(
    get,
    path = "/api/classes",
    tag = "Resultados",
    responses(
        (status = 200, description = "Classes presentes na análise", body = ClassesResponse),
        (status = 404, description = "Nenhuma análise carregada")
    )
)]
pub async fn get_classes(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let snapshot = current_snapshot(&app_state)?;
    let classes = app_state.dashboard_service.available_classes(&snapshot);
    Ok((StatusCode::OK, Json(ClassesResponse { classes })))
}

// GET /api/plans/{plan_id}
#[utoipa::path(
    get,
    path = "/api/plans/{plan_id}",
    tag = "Resultados",
    params(
        ("plan_id" = Uuid, Path, description = "ID do plano")
    ),
    responses(
        (status = 200, description = "Plano com métricas, problemas e cronograma", body = PlanDetail),
        (status = 404, description = "Plano não encontrado")
    )
)]
pub async fn get_plan(
    State(app_state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = current_snapshot(&app_state)?;
    let detail = app_state
        .dashboard_service
        .plan_detail(&snapshot, plan_id)
        .ok_or(AppError::PlanNotFound)?;
    Ok((StatusCode::OK, Json(detail)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::{body_json, loaded_state, test_state};

    #[tokio::test]
    async fn views_without_data_report_no_data() {
        let state = test_state();
        let err = get_dashboard(State(state), Query(ClassQuery::default())).await.err().unwrap();
        assert!(matches!(err, AppError::NoAnalysisData));
    }

    #[tokio::test]
    async fn dashboard_respects_class_filter() {
        let state = loaded_state().await;

        let response = get_dashboard(State(state.clone()), Query(ClassQuery { class: Some("kl".into()) }))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["classFilter"], "kl");
        assert_eq!(body["totalPlans"], 2);
        assert_eq!(body["plans"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_filter_yields_empty_but_valid_view() {
        let state = loaded_state().await;
        let response = get_collections(State(state), Query(ClassQuery { class: Some("Nowhere".into()) }))
            .await
            .unwrap()
            .into_response();

        let body = body_json(response).await;
        assert_eq!(body["totalBehindPlans"], 0);
        assert_eq!(body["entries"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn generic_view_route_wraps_payload() {
        let state = loaded_state().await;
        let response = get_view(State(state.clone()), Path("Projections".into()), Query(ClassQuery::default()))
            .await
            .unwrap()
            .into_response();

        let body = body_json(response).await;
        assert_eq!(body["view"], "projections");
        assert_eq!(body["data"]["months"].as_array().unwrap().len(), 12);

        let err = get_view(State(state), Path("charts".into()), Query(ClassQuery::default()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::UnknownView(_)));
    }

    #[tokio::test]
    async fn projections_accept_a_scenario() {
        let state = loaded_state().await;
        let query = ProjectionsQuery { months: Some(3), scenario: Some(ProjectionScenario::Current), ..Default::default() };
        let body = body_json(get_projections(State(state), Query(query)).await.unwrap().into_response()).await;

        assert_eq!(body["scenario"], "current");
        assert_eq!(body["summary"]["plansWithheld"], 2);
        assert_eq!(body["customers"][0]["renegotiationNeeded"], true);
        assert_eq!(body["customers"][0]["timeline"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn customers_query_is_validated() {
        let state = loaded_state().await;
        let query = CustomersQuery { per_page: Some(500), ..Default::default() };
        let err = get_customers(State(state), Query(query)).await.err().unwrap();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn customers_search_and_pagination() {
        let state = loaded_state().await;
        let query = CustomersQuery { search: Some("GLO".into()), ..Default::default() };
        let body = body_json(get_customers(State(state), Query(query)).await.unwrap().into_response()).await;

        assert_eq!(body["pagination"]["totalItems"], 1);
        assert_eq!(body["customers"][0]["customerName"], "Globex");
        assert_eq!(body["customers"][0]["status"], "behind");
    }

    #[tokio::test]
    async fn plan_detail_includes_schedule() {
        let state = loaded_state().await;
        let plan_id = state.snapshot_store.get().unwrap().plans[0].plan.plan_id;

        let body = body_json(get_plan(State(state.clone()), Path(plan_id)).await.unwrap().into_response()).await;
        assert_eq!(body["plan"]["customerName"], "Acme Corp");
        assert_eq!(body["schedule"].as_array().unwrap().len(), 5);

        let err = get_plan(State(state), Path(Uuid::nil())).await.err().unwrap();
        assert!(matches!(err, AppError::PlanNotFound));
    }

    #[tokio::test]
    async fn classes_are_sorted() {
        let state = loaded_state().await;
        let body = body_json(get_classes(State(state)).await.unwrap().into_response()).await;
        assert_eq!(body["classes"], serde_json::json!(["KL", "Retail"]));
    }
}
