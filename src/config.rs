// src/config.rs

use std::{env, fmt::Display, str::FromStr, sync::Arc};

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::{
    db::{InMemorySnapshotStore, SnapshotStore},
    models::invoice::ColumnMapping,
    services::{
        analysis_service::AnalysisService, compliance_service::ComplianceCalculator,
        dashboard_service::DashboardService,
    },
};

// Parâmetros do pipeline de análise
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub columns: ColumnMapping,
    pub max_rows: usize,
    pub future_tolerance_days: u64,
    // Diferença relativa a partir da qual dois valores de parcela divergem
    pub conflict_tolerance: Decimal,
    pub projection_months: u32,
    pub payment_day: u32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            max_rows: 50_000,
            future_tolerance_days: 7,
            conflict_tolerance: Decimal::new(1, 2),
            projection_months: 12,
            payment_day: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    // Data de referência fixa (execuções reproduzíveis); None = hoje (UTC)
    pub as_of_override: Option<NaiveDate>,
    pub analysis: AnalysisSettings,
}

fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Valor inválido para {name}: {raw:?}")),
        _ => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = AnalysisSettings::default();

        let analysis = AnalysisSettings {
            columns: ColumnMapping::default(),
            max_rows: env_or("MAX_UPLOAD_ROWS", defaults.max_rows)?,
            future_tolerance_days: env_or("FUTURE_DATE_TOLERANCE_DAYS", defaults.future_tolerance_days)?,
            conflict_tolerance: env_or("TERMS_CONFLICT_TOLERANCE", defaults.conflict_tolerance)?,
            projection_months: env_or("PROJECTION_MONTHS", defaults.projection_months)?,
            payment_day: env_or("PAYMENT_DAY", defaults.payment_day)?,
        };

        if analysis.max_rows == 0 {
            bail!("MAX_UPLOAD_ROWS deve ser maior que zero");
        }
        if !(1..=28).contains(&analysis.payment_day) {
            bail!("PAYMENT_DAY deve estar entre 1 e 28");
        }
        if !(1..=120).contains(&analysis.projection_months) {
            bail!("PROJECTION_MONTHS deve estar entre 1 e 120");
        }
        if analysis.conflict_tolerance < Decimal::ZERO || analysis.conflict_tolerance >= Decimal::ONE {
            bail!("TERMS_CONFLICT_TOLERANCE deve estar em [0, 1)");
        }

        let as_of_override = match env::var("ANALYSIS_AS_OF") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .with_context(|| format!("ANALYSIS_AS_OF deve ser YYYY-MM-DD, veio {raw:?}"))?,
            ),
            _ => None,
        };

        Ok(Self {
            host: env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("APP_PORT", 3000)?,
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
            as_of_override,
            analysis,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub snapshot_store: Arc<dyn SnapshotStore>,
    pub analysis_service: AnalysisService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = AppConfig::from_env()?;
        tracing::info!("✅ Configuração carregada (limite de {} linhas)", config.analysis.max_rows);

        Ok(Self::with_store(config, Arc::new(InMemorySnapshotStore::new())))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_store(config: AppConfig, snapshot_store: Arc<dyn SnapshotStore>) -> Self {
        let analysis_service = AnalysisService::new(config.analysis.clone());
        let dashboard_service = DashboardService::new(
            config.analysis.projection_months,
            ComplianceCalculator::new(config.analysis.payment_day),
        );

        Self { config: Arc::new(config), snapshot_store, analysis_service, dashboard_service }
    }

    /// Data de referência das análises.
    pub fn as_of(&self) -> NaiveDate {
        self.config.as_of_override.unwrap_or_else(|| Utc::now().date_naive())
    }
}
