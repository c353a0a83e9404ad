use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Erros de arquivo: os únicos fatais de uma análise. Nenhum snapshot é produzido.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("O arquivo está vazio")]
    Empty,

    #[error("O arquivo não é texto UTF-8 válido")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),

    #[error("CSV malformado: {0}")]
    Csv(#[from] csv::Error),

    #[error("Colunas obrigatórias ausentes: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("O arquivo passa de {limit} linhas")]
    TooManyRows { limit: usize },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Nenhuma análise disponível")]
    NoAnalysisData,

    #[error("Plano não encontrado")]
    PlanNotFound,

    #[error("Cliente não encontrado: {0}")]
    CustomerNotFound(String),

    #[error("Visão desconhecida: {0}")]
    UnknownView(String),

    #[error("Upload inválido: {0}")]
    InvalidUpload(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalServerError(anyhow::anyhow!("Tarefa de análise falhou: {err}"))
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::InvalidUpload(err.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais parâmetros são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::NoAnalysisData => (
                StatusCode::NOT_FOUND,
                "no data: nenhum arquivo foi analisado ainda.".to_string(),
            ),
            AppError::PlanNotFound => (StatusCode::NOT_FOUND, "Plano não encontrado.".to_string()),
            ref e @ (AppError::UnknownView(_) | AppError::CustomerNotFound(_)) => (StatusCode::NOT_FOUND, e.to_string()),
            ref e @ AppError::InvalidUpload(_) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Ingest(ref e) => {
                tracing::warn!("⚠️ Arquivo rejeitado: {}", e);
                let status = match e {
                    IngestError::MissingColumns(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    IngestError::TooManyRows { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, e.to_string())
            }
            // O `tracing` loga a mensagem detalhada; o cliente recebe só a genérica.
            AppError::InternalServerError(ref e) => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.".to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
