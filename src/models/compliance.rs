// src/models/compliance.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Current,
    Behind,
    Completed,
}

impl PlanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanStatus::Current => "current",
            PlanStatus::Behind => "behind",
            PlanStatus::Completed => "completed",
        }
    }

    // behind > current > completed
    fn rank(self) -> u8 {
        match self {
            PlanStatus::Completed => 0,
            PlanStatus::Current => 1,
            PlanStatus::Behind => 2,
        }
    }

    /// Status mais grave entre dois planos do mesmo cliente.
    pub fn worst(self, other: PlanStatus) -> PlanStatus {
        if other.rank() > self.rank() { other } else { self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OriginalBalanceSource {
    // Soma da coluna Amount das faturas do plano
    InvoiceAmount,
    // Número inteiro de períodos × valor do período
    Inferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CollectionSeverity {
    Behind,
    Severe,
    Critical,
}

impl CollectionSeverity {
    pub fn from_months_behind(months_behind: Decimal) -> Option<Self> {
        if months_behind >= Decimal::from(6) {
            Some(CollectionSeverity::Critical)
        } else if months_behind >= Decimal::from(3) {
            Some(CollectionSeverity::Severe)
        } else if months_behind > Decimal::ZERO {
            Some(CollectionSeverity::Behind)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionSeverity::Behind => "behind",
            CollectionSeverity::Severe => "severe",
            CollectionSeverity::Critical => "critical",
        }
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceMetric {
    pub status: PlanStatus,

    #[schema(example = "4")]
    pub months_behind: Decimal,

    // None quando o plano não tem termos utilizáveis
    #[schema(example = "16.7")]
    pub percent_paid: Option<Decimal>,

    #[schema(value_type = Option<String>, format = Date, example = "2027-03-19")]
    pub projected_completion_date: Option<NaiveDate>,

    // false => plano fora dos cálculos de atraso/percentual (termos ausentes)
    pub metrics_available: bool,

    pub original_balance: Decimal,
    pub original_balance_source: OriginalBalanceSource,

    pub months_elapsed: u32,
    pub periods_elapsed: u32,
    pub expected_paid_to_date: Decimal,
    pub actual_paid: Decimal,
    // expected - actual; positivo significa atraso
    pub payment_difference: Decimal,

    pub remaining_payments: u32,
    pub months_remaining: u32,
    pub monthly_equivalent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPayment {
    pub payment_number: u32,

    #[schema(value_type = String, format = Date, example = "2026-11-15")]
    pub due_date: NaiveDate,

    pub expected_payment: Decimal,
    pub remaining_balance: Decimal,
}
