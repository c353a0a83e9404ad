// src/services/normalizer_service.rs

use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::{
    common::numbers::is_plausible_amount,
    models::{
        invoice::{NormalizedRecord, RawRow},
        payment_plan::PaymentTerms,
        quality::IssueKind,
    },
    services::term_parser_service::TermParser,
};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y", "%m/%d/%y", "%m-%d-%y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedAmount {
    Blank,
    Value(Decimal),
    Invalid,
}

/// Aceita "$1,234.50", "(123.45)" e "-50"; "#REF!", resíduos não numéricos e
/// valores acima de `MAX_AMOUNT` são inválidos.
pub fn parse_amount(text: &str) -> ParsedAmount {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParsedAmount::Blank;
    }
    if trimmed.contains("#REF!") {
        return ParsedAmount::Invalid;
    }

    let negative_parens = trimmed.starts_with('(') && trimmed.ends_with(')');
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '(' | ')') && !c.is_whitespace())
        .collect();

    match Decimal::from_str(&cleaned) {
        Ok(value) if !is_plausible_amount(value) => ParsedAmount::Invalid,
        Ok(value) if negative_parens => ParsedAmount::Value(-value.abs()),
        Ok(value) => ParsedAmount::Value(value),
        Err(_) => ParsedAmount::Invalid,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    Blank,
    Value(NaiveDate),
    Invalid,
}

pub fn parse_date(text: &str) -> ParsedDate {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParsedDate::Blank;
    }

    // %Y aceita "24" como ano 24; exige ano de 4 dígitos para cair no formato %y
    let plausible = |date: &NaiveDate| date.year() >= 1000;

    DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .find(plausible)
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .filter_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
                .find(plausible)
        })
        .map_or(ParsedDate::Invalid, ParsedDate::Value)
}

pub fn customer_key(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

// Linhas de subtotal ("Total Acme Corp") fecham a seção do cliente
fn is_total_text(text: &str) -> bool {
    text.trim().to_lowercase().starts_with("total")
}

fn non_blank(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn push_flag(flags: &mut Vec<IssueKind>, kind: IssueKind) {
    if !flags.contains(&kind) {
        flags.push(kind);
    }
}

pub struct RecordNormalizer {
    term_parser: TermParser,
    as_of: NaiveDate,
    future_tolerance_days: u64,
}

impl RecordNormalizer {
    pub fn new(as_of: NaiveDate, future_tolerance_days: u64) -> Self {
        Self { term_parser: TermParser::new(), as_of, future_tolerance_days }
    }

    /// Normaliza uma linha isolada, sem contexto de seção.
    pub fn normalize_row(&self, raw: &RawRow) -> NormalizedRecord {
        self.normalize_in_section(raw, None)
    }

    /// Normaliza o arquivo inteiro. Linhas sem nome herdam o cliente do cabeçalho
    /// de seção mais recente; uma linha "Total ..." encerra a seção.
    pub fn normalize_all(&self, rows: &[RawRow]) -> Vec<NormalizedRecord> {
        let mut section: Option<String> = None;
        let mut records = Vec::with_capacity(rows.len());

        for raw in rows {
            let is_invoice = raw.invoice_type.trim().eq_ignore_ascii_case("invoice");

            if !is_invoice {
                let named = non_blank(&raw.primary_name).or_else(|| non_blank(&raw.secondary_name));
                match named {
                    Some(name) if is_total_text(name) => section = None,
                    Some(name) => section = Some(name.to_string()),
                    None => {}
                }
            }

            records.push(self.normalize_in_section(raw, section.as_deref()));
        }

        records
    }

    fn normalize_in_section(&self, raw: &RawRow, section: Option<&str>) -> NormalizedRecord {
        let mut flags = Vec::new();
        let is_invoice = raw.invoice_type.trim().eq_ignore_ascii_case("invoice");

        // --- Nome ---
        let own_name = non_blank(&raw.primary_name)
            .or_else(|| non_blank(&raw.secondary_name))
            .filter(|name| !(is_invoice && is_total_text(name)));

        let customer_name = match (own_name, section) {
            (Some(name), _) => name.to_string(),
            (None, Some(inherited)) => inherited.to_string(),
            _ => {
                push_flag(&mut flags, IssueKind::MissingCustomerName);
                format!("Unnamed customer (row {})", raw.row_number)
            }
        };

        // --- Valores ---
        let open_balance = match parse_amount(&raw.open_balance) {
            ParsedAmount::Blank => Decimal::ZERO,
            ParsedAmount::Value(value) if value >= Decimal::ZERO => value,
            ParsedAmount::Value(_) => {
                // Pagamentos e créditos têm saldo negativo legítimo
                if is_invoice {
                    push_flag(&mut flags, IssueKind::InvalidAmounts);
                }
                Decimal::ZERO
            }
            ParsedAmount::Invalid => {
                push_flag(&mut flags, IssueKind::InvalidAmounts);
                Decimal::ZERO
            }
        };

        let original_amount = match parse_amount(&raw.amount) {
            ParsedAmount::Blank => None,
            ParsedAmount::Value(value) if value >= Decimal::ZERO || !is_invoice => Some(value),
            ParsedAmount::Value(_) | ParsedAmount::Invalid => {
                push_flag(&mut flags, IssueKind::InvalidAmounts);
                None
            }
        };

        if is_invoice
            && original_amount.is_some_and(|original| original > Decimal::ZERO && open_balance > original)
        {
            push_flag(&mut flags, IssueKind::InvalidAmounts);
        }

        // --- Data ---
        let invoice_date = match parse_date(&raw.date) {
            ParsedDate::Blank => None,
            ParsedDate::Value(date) => {
                let limit = self
                    .as_of
                    .checked_add_days(Days::new(self.future_tolerance_days))
                    .unwrap_or(NaiveDate::MAX);
                if date > limit {
                    push_flag(&mut flags, IssueKind::FutureDated);
                }
                Some(date)
            }
            ParsedDate::Invalid => {
                push_flag(&mut flags, IssueKind::InvalidDateFormat);
                None
            }
        };

        // --- Termos e classe (só importam para faturas) ---
        let payment_terms_raw = raw.payment_terms.trim().to_string();
        let class_field = non_blank(&raw.class_field).map(str::to_string);

        let terms = if is_invoice {
            let parsed = self.term_parser.parse(&payment_terms_raw);
            for flag in parsed.flags {
                push_flag(&mut flags, flag);
            }
            if class_field.is_none() {
                push_flag(&mut flags, IssueKind::MissingClass);
            }
            parsed.terms
        } else {
            PaymentTerms::none()
        };

        NormalizedRecord {
            row_number: raw.row_number,
            customer_key: customer_key(&customer_name),
            customer_name,
            is_invoice,
            invoice_number: non_blank(&raw.invoice_number).map(str::to_string),
            open_balance,
            original_amount,
            payment_terms_raw,
            terms,
            class_field,
            invoice_date,
            flags,
        }
    }
}
