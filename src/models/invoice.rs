// src/models/invoice.rs

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{payment_plan::PaymentTerms, quality::IssueKind};

// Nomes das colunas no export de faturas em aberto.
// As colunas de cliente vêm sem cabeçalho; o leitor CSV nomeia como "_<índice>".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub primary_name: String,
    pub secondary_name: String,
    pub invoice_type: String,
    pub payment_terms: String,
    pub open_balance: String,
    pub class_field: String,
    pub date: String,
    // Opcionais
    pub invoice_number: String,
    pub amount: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            primary_name: "_1".to_string(),
            secondary_name: "_2".to_string(),
            invoice_type: "Type".to_string(),
            payment_terms: "FOB".to_string(),
            open_balance: "Open Balance".to_string(),
            class_field: "Class".to_string(),
            date: "Date".to_string(),
            invoice_number: "Num".to_string(),
            amount: "Amount".to_string(),
        }
    }
}

impl ColumnMapping {
    pub fn required(&self) -> [&str; 7] {
        [
            &self.primary_name,
            &self.secondary_name,
            &self.invoice_type,
            &self.payment_terms,
            &self.open_balance,
            &self.class_field,
            &self.date,
        ]
    }
}

// Linha crua, exatamente como veio do arquivo. Descartada após a normalização.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    // Numeração de planilha (1 = primeira linha de dados)
    pub row_number: usize,
    pub primary_name: String,
    pub secondary_name: String,
    pub invoice_type: String,
    pub payment_terms: String,
    pub open_balance: String,
    pub class_field: String,
    pub date: String,
    pub invoice_number: String,
    pub amount: String,
}

impl RawRow {
    pub fn from_columns(row_number: usize, columns: &HashMap<String, String>, mapping: &ColumnMapping) -> Self {
        let get = |name: &str| columns.get(name).cloned().unwrap_or_default();

        Self {
            row_number,
            primary_name: get(&mapping.primary_name),
            secondary_name: get(&mapping.secondary_name),
            invoice_type: get(&mapping.invoice_type),
            payment_terms: get(&mapping.payment_terms),
            open_balance: get(&mapping.open_balance),
            class_field: get(&mapping.class_field),
            date: get(&mapping.date),
            invoice_number: get(&mapping.invoice_number),
            amount: get(&mapping.amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub row_number: usize,

    // Forma de exibição preservada
    pub customer_name: String,
    // Forma de comparação
    pub customer_key: String,

    pub is_invoice: bool,
    pub invoice_number: Option<String>,

    // Nunca negativo. Falha de leitura = zero + InvalidAmounts
    pub open_balance: Decimal,
    pub original_amount: Option<Decimal>,

    pub payment_terms_raw: String,
    pub terms: PaymentTerms,

    pub class_field: Option<String>,
    pub invoice_date: Option<NaiveDate>,

    pub flags: Vec<IssueKind>,
}

impl NormalizedRecord {
    pub fn has_flag(&self, kind: IssueKind) -> bool {
        self.flags.contains(&kind)
    }

    pub fn identity(&self) -> String {
        match &self.invoice_number {
            Some(number) => number.clone(),
            None => format!("row {}", self.row_number),
        }
    }
}
