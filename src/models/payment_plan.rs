// src/models/payment_plan.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::quality::IssueKind;

// --- Enums ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFrequency {
    #[default]
    Monthly,
    Bimonthly, // A cada 2 meses
    Quarterly, // A cada 3 meses
}

impl PaymentFrequency {
    // Quantos meses cabem em um período de pagamento
    pub fn months_per_period(self) -> u32 {
        match self {
            PaymentFrequency::Monthly => 1,
            PaymentFrequency::Bimonthly => 2,
            PaymentFrequency::Quarterly => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentFrequency::Monthly => "monthly",
            PaymentFrequency::Bimonthly => "bimonthly",
            PaymentFrequency::Quarterly => "quarterly",
        }
    }
}

// --- Structs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTerms {
    pub frequency: PaymentFrequency,

    #[schema(example = "500.00")]
    pub period_amount: Decimal,
}

impl PaymentTerms {
    pub fn new(frequency: PaymentFrequency, period_amount: Decimal) -> Self {
        Self { frequency, period_amount: period_amount.max(Decimal::ZERO) }
    }

    // Termos vazios: mensal, valor zero
    pub fn none() -> Self {
        Self::new(PaymentFrequency::Monthly, Decimal::ZERO)
    }

    pub fn is_usable(&self) -> bool {
        self.period_amount > Decimal::ZERO
    }

    // Valor normalizado para um mês (trimestral / 3, bimestral / 2)
    pub fn monthly_equivalent(&self) -> Decimal {
        self.period_amount / Decimal::from(self.frequency.months_per_period())
    }

    /// Dois termos divergem de forma material quando a frequência muda ou quando os
    /// valores diferem mais que `tolerance` (relativo ao maior dos dois).
    pub fn materially_differs(&self, other: &PaymentTerms, tolerance: Decimal) -> bool {
        if self.frequency != other.frequency {
            return true;
        }

        let larger = self.period_amount.max(other.period_amount);
        if larger.is_zero() {
            return false;
        }

        (self.period_amount - other.period_amount).abs() > larger * tolerance
    }
}

// Fatura que compõe um plano (cópia enxuta do registro normalizado)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanInvoice {
    pub row_number: usize,

    #[schema(example = "INV-1001")]
    pub invoice_number: Option<String>,

    #[schema(value_type = Option<String>, format = Date, example = "2026-05-19")]
    pub invoice_date: Option<NaiveDate>,

    pub open_balance: Decimal,
    pub original_amount: Option<Decimal>,

    #[schema(example = "$500/month")]
    pub payment_terms_raw: String,
    pub terms: PaymentTerms,

    // Problemas detectados na linha de origem
    pub flags: Vec<IssueKind>,
}

impl PlanInvoice {
    pub fn identity(&self) -> String {
        match &self.invoice_number {
            Some(number) => number.clone(),
            None => format!("row {}", self.row_number),
        }
    }

    pub fn has_flag(&self, kind: IssueKind) -> bool {
        self.flags.contains(&kind)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPlan {
    #[schema(example = "6f1c1f1e-3c55-5b1a-9d2e-6e8f0c7a1b2c")]
    pub plan_id: Uuid,

    #[schema(example = "Acme Corp")]
    pub customer_name: String,

    // Chave de agrupamento (minúsculas, espaços colapsados)
    #[serde(skip)]
    #[schema(ignore)]
    pub customer_key: String,

    #[schema(example = "Retail")]
    pub class_field: Option<String>,

    #[schema(example = "2500.00")]
    pub total_open_balance: Decimal,
    // Soma da coluna Amount, zero quando o export não traz essa coluna
    pub total_original_amount: Decimal,

    pub terms: PaymentTerms,
    // Texto dos termos escolhidos (da fatura que definiu os termos)
    #[schema(example = "$500/month")]
    pub payment_terms_raw: String,
    pub terms_source_row: usize,
    pub has_conflicting_terms: bool,

    pub member_invoice_count: usize,

    #[schema(value_type = Option<String>, format = Date)]
    pub earliest_invoice_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Date)]
    pub latest_invoice_date: Option<NaiveDate>,

    pub invoices: Vec<PlanInvoice>,
}

impl PaymentPlan {
    pub fn terms_source(&self) -> Option<&PlanInvoice> {
        self.invoices.iter().find(|inv| inv.row_number == self.terms_source_row)
    }

    pub fn matches_class(&self, class_filter: &str) -> bool {
        self.class_field
            .as_deref()
            .is_some_and(|class| class.trim().eq_ignore_ascii_case(class_filter.trim()))
    }
}
