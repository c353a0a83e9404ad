// src/models/dashboard.rs

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{
    compliance::{CollectionSeverity, ComplianceMetric, PlanStatus, ScheduledPayment},
    payment_plan::{PaymentFrequency, PaymentPlan},
    quality::{IssueKind, IssueSeverity, QualityIssue, QualityReport},
};

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Dashboard,
    Quality,
    Customers,
    Collections,
    Projections,
}

impl ViewKind {
    pub const ALL: [ViewKind; 5] = [
        ViewKind::Dashboard,
        ViewKind::Quality,
        ViewKind::Customers,
        ViewKind::Collections,
        ViewKind::Projections,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str().eq_ignore_ascii_case(name.trim()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViewKind::Dashboard => "dashboard",
            ViewKind::Quality => "quality",
            ViewKind::Customers => "customers",
            ViewKind::Collections => "collections",
            ViewKind::Projections => "projections",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CustomerSort {
    #[default]
    MonthsBehind,
    Balance,
    Name,
    Payment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

// --- Linhas compartilhadas ---

// Linha achatada de um plano para as tabelas das visões
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanRow {
    pub plan_id: Uuid,
    #[schema(example = "Acme Corp")]
    pub customer_name: String,
    pub class_field: Option<String>,
    pub frequency: PaymentFrequency,
    pub period_amount: Decimal,
    pub monthly_equivalent: Decimal,
    pub total_open_balance: Decimal,
    pub status: PlanStatus,
    pub months_behind: Decimal,
    pub percent_paid: Option<Decimal>,
    #[schema(value_type = Option<String>, format = Date)]
    pub projected_completion_date: Option<NaiveDate>,
    pub invoice_count: usize,
    pub issues: Vec<IssueKind>,
}

// --- Dashboard ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub class_filter: Option<String>,
    #[schema(value_type = String, format = Date)]
    pub as_of: NaiveDate,

    pub total_plans: usize,
    pub total_customers: usize,
    #[schema(example = "125000.00")]
    pub total_outstanding: Decimal,
    // Soma dos equivalentes mensais dos planos não concluídos
    pub expected_monthly: Decimal,
    // Soma das diferenças positivas (esperado - pago)
    pub total_amount_behind: Decimal,

    pub plans_behind: usize,
    pub plans_current: usize,
    pub plans_completed: usize,
    #[schema(example = "12.5")]
    pub percentage_behind: Decimal,
    pub average_percent_paid: Option<Decimal>,

    pub data_quality_score: Decimal,
    pub clean_plans: usize,
    pub problematic_plans: usize,

    #[schema(example = json!({"monthly": 40, "quarterly": 3}))]
    pub frequency_breakdown: BTreeMap<String, usize>,
    pub plans: Vec<PlanRow>,
}

// --- Qualidade ---

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueCount {
    pub kind: IssueKind,
    pub severity: IssueSeverity,
    pub plan_count: usize,
    pub invoice_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerIssues {
    pub plan_id: Uuid,
    pub customer_name: String,
    pub class_field: Option<String>,
    pub total_open_balance: Decimal,
    pub issues: Vec<QualityIssue>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QualityView {
    pub class_filter: Option<String>,
    pub data_quality_score: Decimal,
    pub total_plans: usize,
    pub clean_plans: usize,
    pub problematic_plans: usize,
    pub critical_issues: usize,
    pub warning_issues: usize,
    pub info_issues: usize,
    pub issue_breakdown: Vec<IssueCount>,
    pub problematic_customers: Vec<CustomerIssues>,
    // Estatísticas do arquivo inteiro, sem filtro
    pub file_report: QualityReport,
}

// --- Clientes ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerFilter {
    pub class_filter: Option<String>,
    pub status: Option<PlanStatus>,
    pub search: Option<String>,
    pub sort: CustomerSort,
    pub order: SortOrder,
    pub page: usize,
    pub per_page: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub customer_name: String,
    pub classes: Vec<String>,
    pub plan_count: usize,
    pub total_open_balance: Decimal,
    pub monthly_equivalent: Decimal,
    // Pior status entre os planos
    pub status: PlanStatus,
    pub months_behind: Decimal,
    pub issue_count: usize,
    pub plans: Vec<PlanRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomersView {
    pub class_filter: Option<String>,
    pub customers: Vec<CustomerSummary>,
    pub pagination: Pagination,
}

// --- Cobrança ---

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEntry {
    pub rank: usize,
    pub plan_id: Uuid,
    pub customer_name: String,
    pub class_field: Option<String>,
    pub severity: CollectionSeverity,
    pub months_behind: Decimal,
    pub total_open_balance: Decimal,
    pub frequency: PaymentFrequency,
    pub period_amount: Decimal,
    pub payment_difference: Decimal,
    // Proposta de renegociação: saldo em 30 parcelas
    pub suggested_monthly_payment: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectionsView {
    pub class_filter: Option<String>,
    pub total_behind_plans: usize,
    pub total_amount_behind: Decimal,
    pub total_balance_at_risk: Decimal,
    #[schema(example = json!({"critical": 2, "severe": 5, "behind": 11}))]
    pub severity_counts: BTreeMap<String, usize>,
    pub entries: Vec<CollectionEntry>,
}

// --- Projeções ---

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyProjection {
    pub month_index: u32,
    #[schema(example = "2026-11")]
    pub month: String,
    pub expected_payment: Decimal,
    pub active_customers: usize,
    pub completing_customers: usize,
    pub cumulative_total: Decimal,
}

/// Hipótese sobre os planos em atraso durante a projeção.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionScenario {
    /// Planos em atraso continuam sem pagar até serem renegociados.
    Current,
    /// Todo plano com saldo volta a pagar a partir do mês seguinte.
    #[default]
    Restart,
}

impl ProjectionScenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionScenario::Current => "current",
            ProjectionScenario::Restart => "restart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub scenario: ProjectionScenario,
    pub horizon_months: u32,
    pub plans_included: usize,
    // Concluídos ou sem termos utilizáveis
    pub plans_excluded: usize,
    // Em atraso e fora do fluxo no cenário `current`
    pub plans_withheld: usize,
    pub total_expected_collection: Decimal,
    pub average_monthly: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedPayment {
    pub plan_id: Uuid,
    pub class_field: Option<String>,
    pub payment_number: u32,
    pub total_payments: u32,
    pub amount: Decimal,
    pub remaining_balance: Decimal,
    pub is_final_payment: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProjectionMonth {
    pub month_index: u32,
    #[schema(example = "2026-11")]
    pub month: String,
    #[schema(value_type = String, format = Date)]
    pub due_date: NaiveDate,
    pub expected_payment: Decimal,
    pub active_plans: usize,
    pub payments: Vec<ProjectedPayment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProjection {
    pub customer_name: String,
    pub plan_count: usize,
    pub total_monthly_payment: Decimal,
    pub total_owed: Decimal,
    pub status: PlanStatus,
    pub months_behind: Decimal,
    pub renegotiation_needed: bool,
    /// Mês da última parcela, se cair dentro do horizonte e todos os planos estiverem pagando.
    pub completion_month: Option<u32>,
    pub timeline: Vec<CustomerProjectionMonth>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionsView {
    pub class_filter: Option<String>,
    pub scenario: ProjectionScenario,
    pub months: Vec<MonthlyProjection>,
    pub summary: ProjectionSummary,
    pub customers: Vec<CustomerProjection>,
}

// --- Envelope genérico (/api/results/{view}) ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "view", content = "data", rename_all = "snake_case")]
pub enum ViewPayload {
    Dashboard(DashboardView),
    Quality(QualityView),
    Customers(CustomersView),
    Collections(CollectionsView),
    Projections(ProjectionsView),
}

// --- Detalhe do plano ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanDetail {
    pub plan: PaymentPlan,
    pub metric: ComplianceMetric,
    pub issues: Vec<QualityIssue>,
    pub schedule: Vec<ScheduledPayment>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassesResponse {
    #[schema(example = json!(["BR", "KL"]))]
    pub classes: Vec<String>,
}
