// src/services/plan_builder_service.rs

use std::{cmp::Reverse, collections::HashMap};

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::numbers::saturating_sum,
    models::{
        invoice::NormalizedRecord,
        payment_plan::{PaymentPlan, PaymentTerms, PlanInvoice},
        quality::IssueKind,
    },
};

// Namespace fixo: o mesmo arquivo gera sempre os mesmos plan_ids
const PLAN_NAMESPACE: Uuid = Uuid::from_u128(0x8e1c_4a52_7b3d_4f0e_9a61_2d5c_b8f4_e037);

fn class_key(class_field: Option<&str>) -> String {
    class_field.map(|c| c.trim().to_lowercase()).unwrap_or_default()
}

/// Faturas com saldo em aberto, mais as que tiveram saldo ilegível (viram planos quitados).
pub fn is_plan_member(record: &NormalizedRecord) -> bool {
    record.is_invoice && (record.open_balance > Decimal::ZERO || record.has_flag(IssueKind::InvalidAmounts))
}

impl From<&NormalizedRecord> for PlanInvoice {
    fn from(record: &NormalizedRecord) -> Self {
        Self {
            row_number: record.row_number,
            invoice_number: record.invoice_number.clone(),
            invoice_date: record.invoice_date,
            open_balance: record.open_balance,
            original_amount: record.original_amount,
            payment_terms_raw: record.payment_terms_raw.clone(),
            terms: record.terms,
            flags: record.flags.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanBuilder {
    conflict_tolerance: Decimal,
}

impl PlanBuilder {
    pub fn new(conflict_tolerance: Decimal) -> Self {
        Self { conflict_tolerance }
    }

    /// Agrupa as faturas por (cliente, classe), na ordem da primeira aparição.
    pub fn build(&self, records: &[NormalizedRecord]) -> Vec<PaymentPlan> {
        let mut order: Vec<(String, String)> = Vec::new();
        let mut groups: HashMap<(String, String), Vec<&NormalizedRecord>> = HashMap::new();

        for record in records.iter().filter(|r| is_plan_member(r)) {
            let key = (record.customer_key.clone(), class_key(record.class_field.as_deref()));
            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(record);
        }

        order
            .into_iter()
            .filter_map(|key| {
                let members = groups.remove(&key)?;
                Some(self.build_plan(&key.0, &key.1, &members))
            })
            .collect()
    }

    /// Termos conflitam quando dois membros com termos utilizáveis divergem materialmente.
    pub fn has_conflict(&self, terms: &[PaymentTerms]) -> bool {
        let usable: Vec<&PaymentTerms> = terms.iter().filter(|t| t.is_usable()).collect();
        usable
            .iter()
            .enumerate()
            .any(|(i, a)| usable[i + 1..].iter().any(|b| a.materially_differs(b, self.conflict_tolerance)))
    }

    fn build_plan(&self, customer_key: &str, class_key: &str, members: &[&NormalizedRecord]) -> PaymentPlan {
        // `members` nunca é vazio: o grupo nasce com a primeira fatura
        let first = members[0];

        let plan_id = Uuid::new_v5(
            &PLAN_NAMESPACE,
            format!("{customer_key}|{class_key}|{}", first.identity()).as_bytes(),
        );

        // Mais recente; empate pelo maior saldo; depois a primeira linha
        let source = members
            .iter()
            .filter(|r| r.terms.is_usable())
            .max_by_key(|r| (r.invoice_date, r.open_balance, Reverse(r.row_number)))
            .copied()
            .unwrap_or(first);

        let member_terms: Vec<PaymentTerms> = members.iter().map(|r| r.terms).collect();

        PaymentPlan {
            plan_id,
            customer_name: first.customer_name.clone(),
            customer_key: customer_key.to_string(),
            class_field: first.class_field.clone(),
            total_open_balance: saturating_sum(members.iter().map(|r| r.open_balance)),
            total_original_amount: saturating_sum(members.iter().filter_map(|r| r.original_amount)),
            terms: source.terms,
            payment_terms_raw: source.payment_terms_raw.clone(),
            terms_source_row: source.row_number,
            has_conflicting_terms: self.has_conflict(&member_terms),
            member_invoice_count: members.len(),
            earliest_invoice_date: members.iter().filter_map(|r| r.invoice_date).min(),
            latest_invoice_date: members.iter().filter_map(|r| r.invoice_date).max(),
            invoices: members.iter().map(|r| PlanInvoice::from(*r)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{invoice::RawRow, payment_plan::PaymentFrequency},
        services::normalizer_service::RecordNormalizer,
    };
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn records(rows: &[(&str, &str, &str, &str, &str)]) -> Vec<NormalizedRecord> {
        let raw: Vec<RawRow> = rows
            .iter()
            .enumerate()
            .map(|(i, (name, terms, balance, class, date))| RawRow {
                row_number: i + 1,
                primary_name: name.to_string(),
                invoice_type: "Invoice".into(),
                payment_terms: terms.to_string(),
                open_balance: balance.to_string(),
                class_field: class.to_string(),
                date: date.to_string(),
                invoice_number: format!("INV-{}", i + 1),
                ..Default::default()
            })
            .collect();
        RecordNormalizer::new(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), 7).normalize_all(&raw)
    }

    fn builder() -> PlanBuilder {
        PlanBuilder::new(dec("0.01"))
    }

    #[test]
    fn single_invoice_becomes_one_plan() {
        let plans = builder().build(&records(&[("Acme Corp", "$500/month", "2500.00", "Retail", "2026-05-19")]));

        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_eq!(plan.customer_name, "Acme Corp");
        assert_eq!(plan.total_open_balance, dec("2500.00"));
        assert_eq!(plan.terms.period_amount, dec("500"));
        assert_eq!(plan.member_invoice_count, 1);
        assert!(!plan.has_conflicting_terms);
    }

    #[test]
    fn conflicting_terms_keep_most_recent_invoice() {
        let plans = builder().build(&records(&[
            ("Acme Corp", "$300/month", "900", "Retail", "2026-01-10"),
            ("acme  corp", "$450/month", "1800", "Retail", "2026-03-10"),
        ]));

        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert!(plan.has_conflicting_terms);
        assert_eq!(plan.terms.period_amount, dec("450"));
        assert_eq!(plan.terms_source_row, 2);
        assert_eq!(plan.total_open_balance, dec("2700"));
        assert_eq!(plan.member_invoice_count, 2);
    }

    #[test]
    fn frequency_only_difference_conflicts() {
        let plans = builder().build(&records(&[
            ("Acme Corp", "$300/month", "900", "Retail", "2026-01-10"),
            ("Acme Corp", "$300 quarterly", "900", "Retail", "2026-02-10"),
        ]));

        assert!(plans[0].has_conflicting_terms);
        assert_eq!(plans[0].terms.frequency, PaymentFrequency::Quarterly);
        assert_eq!(plans[0].terms_source_row, 2);
    }

    #[test]
    fn oversized_balances_do_not_abort_grouping() {
        let plans = builder().build(&records(&[
            ("Acme Corp", "$500/month", "70000000000000000000000000000", "Retail", "2026-01-10"),
            ("Acme Corp", "$500/month", "70000000000000000000000000000", "Retail", "2026-02-10"),
            ("Acme Corp", "$500/month", "1500", "Retail", "2026-03-10"),
        ]));

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].total_open_balance, dec("1500"));
        assert_eq!(plans[0].member_invoice_count, 3);
    }

    #[test]
    fn same_date_conflict_prefers_larger_balance() {
        let plans = builder().build(&records(&[
            ("Acme Corp", "$300/month", "3000", "Retail", "2026-03-10"),
            ("Acme Corp", "$450/month", "900", "Retail", "2026-03-10"),
        ]));
        assert_eq!(plans[0].terms.period_amount, dec("300"));
    }

    #[test]
    fn amounts_within_tolerance_do_not_conflict() {
        let plans = builder().build(&records(&[
            ("Acme Corp", "$500/month", "900", "Retail", "2026-01-10"),
            ("Acme Corp", "$500.00 per month", "900", "Retail", "2026-02-10"),
        ]));
        assert!(!plans[0].has_conflicting_terms);
    }

    #[test]
    fn different_classes_split_the_customer() {
        let plans = builder().build(&records(&[
            ("Acme Corp", "$500/month", "900", "Retail", "2026-01-10"),
            ("Acme Corp", "$500/month", "900", "Wholesale", "2026-01-10"),
        ]));
        assert_eq!(plans.len(), 2);
        assert_ne!(plans[0].plan_id, plans[1].plan_id);
    }

    #[test]
    fn paid_off_and_non_invoice_rows_are_not_members() {
        let mut rows = records(&[
            ("Acme Corp", "$500/month", "0", "Retail", "2026-01-10"),
            ("Acme Corp", "$500/month", "100", "Retail", "2026-01-10"),
        ]);
        rows[1].is_invoice = false;
        assert!(builder().build(&rows).is_empty());
    }

    #[test]
    fn unreadable_balance_still_forms_a_plan() {
        let plans = builder().build(&records(&[("Acme Corp", "$500/month", "abc", "Retail", "2026-01-10")]));
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].total_open_balance, Decimal::ZERO);
    }

    #[test]
    fn plan_ids_are_deterministic() {
        let input = [
            ("Acme Corp", "$500/month", "900", "Retail", "2026-01-10"),
            ("Globex", "$100/month", "300", "KL", "2026-02-10"),
        ];
        let first: Vec<Uuid> = builder().build(&records(&input)).iter().map(|p| p.plan_id).collect();
        let second: Vec<Uuid> = builder().build(&records(&input)).iter().map(|p| p.plan_id).collect();
        assert_eq!(first, second);
    }
}
