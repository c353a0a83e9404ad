// src/services/compliance_service.rs

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};

use crate::{
    common::numbers::{money, one_decimal, periods_to_cover},
    models::{
        compliance::{ComplianceMetric, OriginalBalanceSource, PlanStatus, ScheduledPayment},
        payment_plan::PaymentPlan,
    },
};

// Duração média de um mês em dias
const AVERAGE_MONTH_DAYS: Decimal = Decimal::from_parts(3044, 0, 0, false, 2);
const MAX_SCHEDULED_PAYMENTS: u32 = 60;

/// Meses inteiros entre `start` e `as_of` (arredondamento comercial), nunca negativo.
pub fn months_between(start: NaiveDate, as_of: NaiveDate) -> u32 {
    let days = (as_of - start).num_days().max(0);
    (Decimal::from(days) / AVERAGE_MONTH_DAYS)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(u32::MAX)
}

// Saldo original: soma da coluna Amount quando coerente; senão, o menor múltiplo
// inteiro do valor do período estritamente acima do saldo em aberto.
fn original_balance(plan: &PaymentPlan) -> (Decimal, OriginalBalanceSource) {
    let open = plan.total_open_balance;
    let invoiced = plan.total_original_amount;

    if invoiced > Decimal::ZERO && invoiced >= open {
        return (invoiced, OriginalBalanceSource::InvoiceAmount);
    }

    let amount = plan.terms.period_amount;
    if amount <= Decimal::ZERO {
        return (open, OriginalBalanceSource::Inferred);
    }

    let inferred = open
        .checked_div(amount)
        .and_then(|periods| periods.floor().checked_add(Decimal::ONE))
        .and_then(|whole_periods| whole_periods.checked_mul(amount))
        .unwrap_or(open);
    (inferred, OriginalBalanceSource::Inferred)
}

#[derive(Debug, Clone)]
pub struct ComplianceCalculator {
    payment_day: u32,
}

impl ComplianceCalculator {
    pub fn new(payment_day: u32) -> Self {
        Self { payment_day }
    }

    pub fn payment_day(&self) -> u32 {
        self.payment_day
    }

    pub fn calculate(&self, plan: &PaymentPlan, as_of: NaiveDate) -> ComplianceMetric {
        let open = plan.total_open_balance;
        let terms = plan.terms;
        let months_per_period = terms.frequency.months_per_period();

        let inception = plan.earliest_invoice_date.unwrap_or(as_of);
        let months_elapsed = months_between(inception, as_of);
        let periods_elapsed = months_elapsed / months_per_period;

        let (original, source) = original_balance(plan);
        let actual_paid = original.saturating_sub(open).max(Decimal::ZERO);

        if !terms.is_usable() {
            // Sem termos: fora de atraso, percentual e projeção
            return ComplianceMetric {
                status: if open <= Decimal::ZERO { PlanStatus::Completed } else { PlanStatus::Current },
                months_behind: Decimal::ZERO,
                percent_paid: None,
                projected_completion_date: None,
                metrics_available: false,
                original_balance: money(original),
                original_balance_source: source,
                months_elapsed,
                periods_elapsed,
                expected_paid_to_date: Decimal::ZERO,
                actual_paid: money(actual_paid),
                payment_difference: Decimal::ZERO,
                remaining_payments: 0,
                months_remaining: 0,
                monthly_equivalent: Decimal::ZERO,
            };
        }

        let amount = terms.period_amount;
        let expected = Decimal::from(periods_elapsed).saturating_mul(amount).min(original);
        let payment_difference = expected.saturating_sub(actual_paid);

        // O déficit nunca passa do que ainda é devido
        let deficit = payment_difference.max(Decimal::ZERO).min(open);
        let periods_behind = periods_to_cover(deficit, amount);
        let months_behind = Decimal::from(periods_behind.saturating_mul(months_per_period));

        let status = if open <= Decimal::ZERO {
            PlanStatus::Completed
        } else if months_behind > Decimal::ZERO {
            PlanStatus::Behind
        } else {
            PlanStatus::Current
        };

        let percent_paid = if original > Decimal::ZERO {
            open.checked_div(original).map(|ratio| {
                let paid = Decimal::ONE_HUNDRED * (Decimal::ONE - ratio.min(Decimal::ONE));
                one_decimal(paid.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED))
            })
        } else {
            None
        };

        let remaining_payments = periods_to_cover(open, amount);
        let months_remaining = remaining_payments.saturating_mul(months_per_period);

        ComplianceMetric {
            status,
            months_behind,
            percent_paid,
            projected_completion_date: as_of.checked_add_months(Months::new(months_remaining)),
            metrics_available: true,
            original_balance: money(original),
            original_balance_source: source,
            months_elapsed,
            periods_elapsed,
            expected_paid_to_date: money(expected),
            actual_paid: money(actual_paid),
            payment_difference: money(payment_difference),
            remaining_payments,
            months_remaining,
            monthly_equivalent: money(terms.monthly_equivalent()),
        }
    }

    /// Próximos pagamentos até quitar o saldo (no máximo 60), sempre no dia de pagamento.
    pub fn schedule(&self, plan: &PaymentPlan, as_of: NaiveDate) -> Vec<ScheduledPayment> {
        let amount = plan.terms.period_amount;
        if !plan.terms.is_usable() || plan.total_open_balance <= Decimal::ZERO {
            return Vec::new();
        }

        let months_per_period = plan.terms.frequency.months_per_period();
        let count = periods_to_cover(plan.total_open_balance, amount).min(MAX_SCHEDULED_PAYMENTS);

        let mut remaining = plan.total_open_balance;
        let mut payments = Vec::with_capacity(count as usize);

        for payment_number in 1..=count {
            let Some(due_date) = as_of
                .checked_add_months(Months::new(payment_number * months_per_period))
                .and_then(|date| date.with_day(self.payment_day.min(28)))
            else {
                break;
            };

            let expected_payment = amount.min(remaining);
            remaining -= expected_payment;

            payments.push(ScheduledPayment {
                payment_number,
                due_date,
                expected_payment: money(expected_payment),
                remaining_balance: money(remaining),
            });
        }

        payments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payment_plan::{PaymentFrequency, PaymentTerms};
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn as_of() -> NaiveDate {
        date(2026, 10, 19)
    }

    fn plan(balance: &str, frequency: PaymentFrequency, amount: &str, inception: Option<NaiveDate>) -> PaymentPlan {
        PaymentPlan {
            plan_id: Uuid::nil(),
            customer_name: "Acme Corp".into(),
            customer_key: "acme corp".into(),
            class_field: Some("Retail".into()),
            total_open_balance: dec(balance),
            total_original_amount: Decimal::ZERO,
            terms: PaymentTerms::new(frequency, dec(amount)),
            payment_terms_raw: String::new(),
            terms_source_row: 1,
            has_conflicting_terms: false,
            member_invoice_count: 1,
            earliest_invoice_date: inception,
            latest_invoice_date: inception,
            invoices: Vec::new(),
        }
    }

    #[test]
    fn five_months_into_a_monthly_plan() {
        let plan = plan("2500.00", PaymentFrequency::Monthly, "500", Some(date(2026, 5, 19)));
        let metric = ComplianceCalculator::new(15).calculate(&plan, as_of());

        assert_eq!(metric.original_balance, dec("3000"));
        assert_eq!(metric.original_balance_source, OriginalBalanceSource::Inferred);
        assert_eq!(metric.months_elapsed, 5);
        assert_eq!(metric.expected_paid_to_date, dec("2500"));
        assert_eq!(metric.actual_paid, dec("500"));
        assert_eq!(metric.months_behind, dec("4"));
        assert_eq!(metric.status, PlanStatus::Behind);
        assert_eq!(metric.percent_paid, Some(dec("16.7")));
        assert_eq!(metric.remaining_payments, 5);
        assert_eq!(metric.projected_completion_date, Some(date(2027, 3, 19)));
    }

    #[test]
    fn zero_balance_is_completed() {
        let metric = ComplianceCalculator::new(15).calculate(
            &plan("0", PaymentFrequency::Monthly, "500", Some(date(2026, 1, 1))),
            as_of(),
        );
        assert_eq!(metric.status, PlanStatus::Completed);
        assert_eq!(metric.months_behind, Decimal::ZERO);
        assert_eq!(metric.percent_paid, Some(dec("100")));
    }

    #[test]
    fn missing_terms_are_excluded_from_metrics() {
        let metric = ComplianceCalculator::new(15).calculate(
            &plan("900", PaymentFrequency::Monthly, "0", Some(date(2025, 1, 1))),
            as_of(),
        );
        assert!(!metric.metrics_available);
        assert_eq!(metric.status, PlanStatus::Current);
        assert_eq!(metric.months_behind, Decimal::ZERO);
        assert_eq!(metric.percent_paid, None);
        assert_eq!(metric.projected_completion_date, None);
    }

    #[test]
    fn brand_new_plan_is_current() {
        let metric = ComplianceCalculator::new(15)
            .calculate(&plan("1200", PaymentFrequency::Quarterly, "300", None), as_of());
        assert_eq!(metric.months_elapsed, 0);
        assert_eq!(metric.status, PlanStatus::Current);
        assert_eq!(metric.months_remaining, 12);
        assert_eq!(metric.monthly_equivalent, dec("100"));
    }

    #[test]
    fn quarterly_deficit_counts_in_month_equivalents() {
        // 7 meses => 2 trimestres esperados (600); original inferido 1200, pago 300
        let metric = ComplianceCalculator::new(15).calculate(
            &plan("900", PaymentFrequency::Quarterly, "300", Some(date(2026, 3, 19))),
            as_of(),
        );
        assert_eq!(metric.periods_elapsed, 2);
        assert_eq!(metric.payment_difference, dec("300"));
        assert_eq!(metric.months_behind, dec("3"));
    }

    #[test]
    fn deficit_is_capped_at_open_balance() {
        let mut plan = plan("200", PaymentFrequency::Monthly, "100", Some(date(2024, 10, 19)));
        plan.total_original_amount = dec("5000");
        let metric = ComplianceCalculator::new(15).calculate(&plan, as_of());

        assert_eq!(metric.original_balance_source, OriginalBalanceSource::InvoiceAmount);
        // esperado 2400, pago 4800: adiantado
        assert_eq!(metric.months_behind, Decimal::ZERO);
        assert_eq!(metric.status, PlanStatus::Current);

        let mut late = plan.clone();
        late.total_original_amount = dec("250");
        let metric = ComplianceCalculator::new(15).calculate(&late, as_of());
        // esperado 250, pago 50: déficit 200 limitado ao saldo de 200
        assert_eq!(metric.months_behind, dec("2"));
    }

    #[test]
    fn bimonthly_deficit_counts_in_month_equivalents() {
        // 5 meses => 2 bimestres esperados (800); original inferido 1200, pago 400
        let metric = ComplianceCalculator::new(15).calculate(
            &plan("800", PaymentFrequency::Bimonthly, "400", Some(date(2026, 5, 19))),
            as_of(),
        );
        assert_eq!(metric.periods_elapsed, 2);
        assert_eq!(metric.payment_difference, dec("400"));
        assert_eq!(metric.months_behind, dec("2"));
        assert_eq!(metric.months_remaining, 4);
        assert_eq!(metric.monthly_equivalent, dec("200"));
    }

    #[test]
    fn tiny_period_amounts_saturate_instead_of_overflowing() {
        let plan = plan("1000000", PaymentFrequency::Quarterly, "0.0001", Some(date(2026, 5, 19)));
        let metric = ComplianceCalculator::new(15).calculate(&plan, as_of());

        assert_eq!(metric.remaining_payments, u32::MAX);
        assert_eq!(metric.months_remaining, u32::MAX);
        assert_eq!(metric.projected_completion_date, None);
        assert_eq!(metric.status, PlanStatus::Current);
    }

    #[test]
    fn huge_period_amounts_do_not_abort() {
        let plan = plan("900", PaymentFrequency::Monthly, "70000000000000000000000000000", Some(date(2025, 5, 19)));
        let metric = ComplianceCalculator::new(15).calculate(&plan, as_of());

        assert_eq!(metric.months_elapsed, 17);
        assert_eq!(metric.remaining_payments, 1);
        assert_eq!(metric.months_behind, dec("1"));
        assert_eq!(metric.status, PlanStatus::Behind);
    }

    #[test]
    fn schedule_ends_with_partial_payment() {
        let schedule = ComplianceCalculator::new(15)
            .schedule(&plan("1250", PaymentFrequency::Monthly, "500", None), as_of());

        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule[0].due_date, date(2026, 11, 15));
        assert_eq!(schedule[2].due_date, date(2027, 1, 15));
        assert_eq!(schedule[2].expected_payment, dec("250"));
        assert_eq!(schedule[2].remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn schedule_is_capped_and_empty_without_terms() {
        let calc = ComplianceCalculator::new(15);
        assert_eq!(calc.schedule(&plan("100000", PaymentFrequency::Monthly, "10", None), as_of()).len(), 60);
        assert!(calc.schedule(&plan("500", PaymentFrequency::Monthly, "0", None), as_of()).is_empty());
    }
}
