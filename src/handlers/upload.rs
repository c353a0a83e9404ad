// src/handlers/upload.rs

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState};

// Só para documentar o formulário multipart no Swagger
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub analysis_id: Uuid,
    #[schema(example = "open_invoices.csv")]
    pub source_name: String,
    #[schema(value_type = String, format = Date)]
    pub as_of: NaiveDate,
    pub total_rows: usize,
    pub total_plans: usize,
    pub total_customers: usize,
    pub data_quality_score: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub has_data: bool,
    pub analysis_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    // false quando não havia análise carregada
    pub cleared: bool,
}

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Sistema",
    responses(
        (status = 200, description = "Serviço no ar", body = HealthResponse)
    )
)]
pub async fn health(State(app_state): State<AppState>) -> impl IntoResponse {
    let snapshot = app_state.snapshot_store.get();
    Json(HealthResponse {
        status: "ok".to_string(),
        has_data: snapshot.is_some(),
        analysis_id: snapshot.map(|s| s.analysis_id),
    })
}

/// Analisa o arquivo fora do runtime assíncrono e, só em caso de sucesso,
/// substitui o snapshot atual.
pub async fn analyze_and_store(
    app_state: &AppState,
    bytes: Vec<u8>,
    source_name: String,
) -> Result<UploadResponse, AppError> {
    let service = app_state.analysis_service.clone();
    let as_of = app_state.as_of();

    let snapshot =
        tokio::task::spawn_blocking(move || service.analyze_csv(&bytes, &source_name, as_of)).await??;

    let snapshot = app_state.snapshot_store.replace(snapshot);

    Ok(UploadResponse {
        analysis_id: snapshot.analysis_id,
        source_name: snapshot.source_name.clone(),
        as_of: snapshot.as_of,
        total_rows: snapshot.quality.total_rows_processed,
        total_plans: snapshot.quality.total_plans,
        total_customers: snapshot.quality.total_customers,
        data_quality_score: snapshot.quality.data_quality_score,
    })
}

// POST /api/upload
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "Análise",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Arquivo analisado; snapshot substituído", body = UploadResponse),
        (status = 400, description = "Arquivo ilegível ou vazio"),
        (status = 413, description = "Arquivo acima do limite de linhas"),
        (status = 422, description = "Colunas obrigatórias ausentes")
    )
)]
pub async fn upload_file(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("upload.csv").to_string();
            let data = field.bytes().await?;
            upload = Some((file_name, data.to_vec()));
            break;
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::InvalidUpload("campo 'file' ausente no formulário".to_string()))?;

    if !file_name.to_lowercase().ends_with(".csv") {
        return Err(AppError::InvalidUpload(format!("apenas arquivos .csv são aceitos ({file_name})")));
    }
    if bytes.len() > app_state.config.max_upload_bytes {
        return Err(AppError::InvalidUpload(format!(
            "arquivo com {} bytes excede o limite de {}",
            bytes.len(),
            app_state.config.max_upload_bytes
        )));
    }

    tracing::info!("📥 Upload recebido: {} ({} bytes)", file_name, bytes.len());

    let response = analyze_and_store(&app_state, bytes, file_name).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// POST /api/clear
#[utoipa::path(
    post,
    path = "/api/clear",
    tag = "Análise",
    responses(
        (status = 200, description = "Snapshot descartado", body = ClearResponse)
    )
)]
pub async fn clear_results(State(app_state): State<AppState>) -> impl IntoResponse {
    let cleared = app_state.snapshot_store.clear();
    if cleared {
        tracing::info!("🗑️ Análise descartada");
    }
    (StatusCode::OK, Json(ClearResponse { cleared }))
}
