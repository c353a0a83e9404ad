// src/models/snapshot.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{
    compliance::ComplianceMetric,
    payment_plan::PaymentPlan,
    quality::{IssueKind, QualityIssue, QualityReport},
};

// Plano + métricas + problemas: a unidade que todas as visões consomem
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanAnalysis {
    pub plan: PaymentPlan,
    pub metric: ComplianceMetric,
    pub issues: Vec<QualityIssue>,
}

impl PlanAnalysis {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|issue| issue.kind == kind)
    }
}

/// Resultado imutável de uma análise. Substituído por inteiro a cada upload.
#[derive(Debug, Clone)]
pub struct AnalysisSnapshot {
    pub analysis_id: Uuid,
    pub source_name: String,
    pub as_of: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub plans: Vec<PlanAnalysis>,
    pub quality: QualityReport,
}

impl AnalysisSnapshot {
    pub fn find_plan(&self, plan_id: Uuid) -> Option<&PlanAnalysis> {
        self.plans.iter().find(|analysis| analysis.plan.plan_id == plan_id)
    }
}

// Linha achatada plano + métrica, entrada única da exportação tabular
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanExportRow {
    pub plan_id: Uuid,
    pub customer_name: String,
    pub class_field: String,
    pub frequency: String,
    pub period_amount: Decimal,
    pub open_balance: Decimal,
    pub original_balance: Decimal,
    pub percent_paid: Option<Decimal>,
    pub months_behind: Decimal,
    pub status: String,
    pub severity: String,
    pub projected_completion_date: Option<NaiveDate>,
    pub invoice_count: usize,
    pub issue_count: usize,
    pub issues: String,
}

// Uma linha por cliente e mês da linha do tempo projetada
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerProjectionRow {
    pub customer_name: String,
    pub scenario: String,
    pub month_index: u32,
    pub month: String,
    pub due_date: NaiveDate,
    pub expected_payment: Decimal,
    pub active_plans: usize,
    pub renegotiation_needed: bool,
    // "plan_id: valor (n/total)" separados por ";"
    pub plan_payments: String,
}
