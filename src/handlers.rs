pub mod dashboard;
pub mod export;
pub mod upload;

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use axum::response::Response;
    use chrono::NaiveDate;

    use crate::{
        config::{AnalysisSettings, AppConfig, AppState},
        db::InMemorySnapshotStore,
        handlers::upload::analyze_and_store,
        services::analysis_service::tests::sample_csv,
    };

    pub(crate) fn test_state() -> AppState {
        let config = AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            max_upload_bytes: 1024 * 1024,
            as_of_override: NaiveDate::from_ymd_opt(2026, 10, 19),
            analysis: AnalysisSettings::default(),
        };
        AppState::with_store(config, Arc::new(InMemorySnapshotStore::new()))
    }

    pub(crate) async fn loaded_state() -> AppState {
        let state = test_state();
        analyze_and_store(&state, sample_csv().into_bytes(), "sample.csv".into())
            .await
            .unwrap();
        state
    }

    pub(crate) async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
