// src/models/quality.rs

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

// --- Enums ---

// Conjunto fechado de problemas de qualidade. A ordem aqui é a ordem de exibição.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingCustomerName,
    InvalidAmounts,
    NoPaymentTerms,
    AssumedFrequency,
    MultiplePaymentTerms,
    MissingClass,
    FutureDated,
    InvalidDateFormat,
    TypoPaymentTerms,
    MultipleClasses,
}

impl IssueKind {
    pub const ALL: [IssueKind; 10] = [
        IssueKind::MissingCustomerName,
        IssueKind::InvalidAmounts,
        IssueKind::NoPaymentTerms,
        IssueKind::AssumedFrequency,
        IssueKind::MultiplePaymentTerms,
        IssueKind::MissingClass,
        IssueKind::FutureDated,
        IssueKind::InvalidDateFormat,
        IssueKind::TypoPaymentTerms,
        IssueKind::MultipleClasses,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::MissingCustomerName => "missing_customer_name",
            IssueKind::InvalidAmounts => "invalid_amounts",
            IssueKind::NoPaymentTerms => "no_payment_terms",
            IssueKind::AssumedFrequency => "assumed_frequency",
            IssueKind::MultiplePaymentTerms => "multiple_payment_terms",
            IssueKind::MissingClass => "missing_class",
            IssueKind::FutureDated => "future_dated",
            IssueKind::InvalidDateFormat => "invalid_date_format",
            IssueKind::TypoPaymentTerms => "typo_payment_terms",
            IssueKind::MultipleClasses => "multiple_classes",
        }
    }

    pub fn severity(self) -> IssueSeverity {
        match self {
            IssueKind::InvalidAmounts | IssueKind::NoPaymentTerms => IssueSeverity::Critical,
            IssueKind::MissingCustomerName
            | IssueKind::AssumedFrequency
            | IssueKind::MultiplePaymentTerms
            | IssueKind::MissingClass
            | IssueKind::FutureDated
            | IssueKind::InvalidDateFormat => IssueSeverity::Warning,
            IssueKind::TypoPaymentTerms | IssueKind::MultipleClasses => IssueSeverity::Info,
        }
    }

    // Coluna de origem do problema, usada para destacar o campo no relatório
    pub fn field_name(self) -> Option<&'static str> {
        match self {
            IssueKind::MissingCustomerName => Some("Customer"),
            IssueKind::InvalidAmounts => Some("Open Balance"),
            IssueKind::NoPaymentTerms
            | IssueKind::AssumedFrequency
            | IssueKind::MultiplePaymentTerms
            | IssueKind::TypoPaymentTerms => Some("FOB"),
            IssueKind::MissingClass | IssueKind::MultipleClasses => Some("Class"),
            IssueKind::FutureDated | IssueKind::InvalidDateFormat => Some("Date"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Critical,
    Warning,
    Info,
}

impl IssueSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueSeverity::Critical => "critical",
            IssueSeverity::Warning => "warning",
            IssueSeverity::Info => "info",
        }
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QualityIssue {
    pub kind: IssueKind,
    pub severity: IssueSeverity,

    #[schema(example = "2 faturas sem classe definida")]
    pub description: String,

    // Número da fatura, ou "row N" quando a fatura não tem número
    #[schema(example = json!(["INV-1001", "row 14"]))]
    pub affected_invoices: Vec<String>,

    #[schema(example = "Class")]
    pub field_name: Option<String>,
}

impl QualityIssue {
    pub fn new(kind: IssueKind, description: impl Into<String>, affected_invoices: Vec<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            description: description.into(),
            affected_invoices,
            field_name: kind.field_name().map(str::to_string),
        }
    }
}

// Estatísticas do arquivo inteiro (independem de filtro de classe)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub total_rows_processed: usize,
    pub invoice_rows: usize,
    pub non_invoice_rows: usize,
    pub invoices_with_open_balance: usize,
    // Faturas quitadas (saldo zero) que não entram em nenhum plano
    pub invoices_ignored: usize,

    pub total_customers: usize,
    pub total_plans: usize,
    pub clean_plans: usize,
    pub problematic_plans: usize,

    #[schema(example = "87.5")]
    pub data_quality_score: Decimal,

    // Contagem por linha: quantas linhas carregam cada tipo de problema
    pub record_issue_counts: BTreeMap<String, usize>,

    #[schema(example = json!(["BR", "KL", "TSA"]))]
    pub classes_found: Vec<String>,
}
