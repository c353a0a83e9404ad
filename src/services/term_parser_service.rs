// src/services/term_parser_service.rs

use std::{str::FromStr, sync::OnceLock};

use regex::Regex;
use rust_decimal::Decimal;

use crate::{
    common::numbers::{is_plausible_amount, MIN_PERIOD_AMOUNT},
    models::{
        payment_plan::{PaymentFrequency, PaymentTerms},
        quality::IssueKind,
    },
};

// Erros de digitação recorrentes no campo FOB
const TYPO_CORRECTIONS: &[(&str, &str)] = &[
    ("monthl;y", "monthly"),
    ("quaterly", "quarterly"),
    ("quartely", "quarterly"),
    ("bimontly", "bimonthly"),
    ("montly", "monthly"),
    ("mothly", "monthly"),
];

fn bimonthly_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(bi-?monthly|every\s+(2|two)\s+months?|every\s+other\s+month)\b")
            .expect("regex bimestral válida")
    })
}

fn quarterly_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(quarterly|qtrly|quarter|every\s+(3|three)\s+months?)\b").expect("regex trimestral válida")
    })
}

fn monthly_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(monthly|months?|mo|mth|mthly)\b").expect("regex mensal válida"))
}

// "every 3 months" carrega um número que não é valor
fn interval_phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"every\s+\w+\s+months?").expect("regex de intervalo válida"))
}

fn currency_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)").expect("regex de moeda válida"))
}

fn bare_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([0-9][0-9,]*(?:\.[0-9]+)?)").expect("regex numérica válida"))
}

// Texto dos termos já pré-processado, compartilhado por todas as regras
#[derive(Debug, Clone, PartialEq)]
pub struct TermsText {
    pub normalized: String,
    pub amount: Option<Decimal>,
    pub frequency: Option<PaymentFrequency>,
    pub typo_corrected: bool,
}

impl TermsText {
    pub fn prepare(raw: &str) -> Self {
        let mut normalized = raw.trim().to_lowercase();

        let mut typo_corrected = false;
        for (typo, correction) in TYPO_CORRECTIONS {
            if normalized.contains(typo) {
                normalized = normalized.replace(typo, correction);
                typo_corrected = true;
            }
        }

        let frequency = detect_frequency(&normalized);
        let amount = extract_amount(&normalized);

        Self { normalized, amount, frequency, typo_corrected }
    }
}

fn detect_frequency(text: &str) -> Option<PaymentFrequency> {
    if bimonthly_re().is_match(text) {
        Some(PaymentFrequency::Bimonthly)
    } else if quarterly_re().is_match(text) {
        Some(PaymentFrequency::Quarterly)
    } else if monthly_re().is_match(text) {
        Some(PaymentFrequency::Monthly)
    } else {
        None
    }
}

/// Primeiro número precedido de `$`; sem `$`, o primeiro número do texto.
/// Valores absurdos são descartados e frações de centavo viram zero.
fn extract_amount(text: &str) -> Option<Decimal> {
    let without_intervals = interval_phrase_re().replace_all(text, " ");

    let captured = currency_amount_re()
        .captures(&without_intervals)
        .or_else(|| bare_amount_re().captures(&without_intervals))?;

    let digits = captured.get(1)?.as_str().replace(',', "");
    let amount = Decimal::from_str(&digits).ok().filter(|value| is_plausible_amount(*value))?;
    Some(if amount < MIN_PERIOD_AMOUNT { Decimal::ZERO } else { amount })
}

pub struct TermRule {
    pub name: &'static str,
    matcher: fn(&TermsText) -> Option<PaymentTerms>,
    flag: Option<IssueKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTerms {
    pub terms: PaymentTerms,
    pub flags: Vec<IssueKind>,
    // Nome da regra que casou
    pub rule: &'static str,
}

pub struct TermParser {
    rules: Vec<TermRule>,
}

impl Default for TermParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TermParser {
    pub fn new() -> Self {
        // A ordem é a prioridade: a primeira regra que casa vence.
        let rules = vec![
            TermRule {
                name: "explicit_frequency",
                matcher: |text| Some(PaymentTerms::new(text.frequency?, text.amount?)),
                flag: None,
            },
            TermRule {
                name: "amount_only",
                matcher: |text| Some(PaymentTerms::new(PaymentFrequency::Monthly, text.amount?)),
                flag: Some(IssueKind::AssumedFrequency),
            },
            TermRule {
                name: "no_terms",
                matcher: |_| Some(PaymentTerms::none()),
                flag: Some(IssueKind::NoPaymentTerms),
            },
        ];

        Self { rules }
    }

    pub fn parse(&self, raw: &str) -> ParsedTerms {
        let text = TermsText::prepare(raw);

        let (rule, terms) = self
            .rules
            .iter()
            .find_map(|rule| (rule.matcher)(&text).map(|terms| (rule, terms)))
            .map(|(rule, terms)| (Some(rule), terms))
            .unwrap_or((None, PaymentTerms::none()));

        let mut flags = Vec::new();
        if text.typo_corrected {
            flags.push(IssueKind::TypoPaymentTerms);
        }
        if let Some(flag) = rule.and_then(|r| r.flag) {
            flags.push(flag);
        }
        // "$0/month" casa a primeira regra mas não é um termo utilizável
        if !terms.is_usable() && !flags.contains(&IssueKind::NoPaymentTerms) {
            flags.push(IssueKind::NoPaymentTerms);
        }

        ParsedTerms { terms, flags, rule: rule.map_or("no_terms", |r| r.name) }
    }
}
