// src/services/collections_service.rs

use std::{cmp::Reverse, collections::HashMap};

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;

use crate::{
    common::numbers::{money, saturating_sum},
    models::{
        compliance::{CollectionSeverity, PlanStatus},
        dashboard::{
            CollectionEntry, CustomerProjection, CustomerProjectionMonth, MonthlyProjection, ProjectedPayment,
            ProjectionScenario, ProjectionSummary,
        },
        snapshot::PlanAnalysis,
    },
};

// Renegociação sugerida: saldo dividido em 30 parcelas mensais
const RENEGOTIATION_MONTHS: u32 = 30;

/// Planos em atraso, do mais grave ao menos grave.
pub fn prioritize(plans: &[&PlanAnalysis]) -> Vec<CollectionEntry> {
    let mut behind: Vec<&PlanAnalysis> = plans
        .iter()
        .copied()
        .filter(|analysis| analysis.metric.status == PlanStatus::Behind)
        .collect();

    behind.sort_by_key(|analysis| {
        (
            Reverse(analysis.metric.months_behind),
            Reverse(analysis.plan.total_open_balance),
            analysis.plan.plan_id,
        )
    });

    behind
        .into_iter()
        .enumerate()
        .filter_map(|(index, analysis)| {
            let severity = CollectionSeverity::from_months_behind(analysis.metric.months_behind)?;
            let plan = &analysis.plan;
            Some(CollectionEntry {
                rank: index + 1,
                plan_id: plan.plan_id,
                customer_name: plan.customer_name.clone(),
                class_field: plan.class_field.clone(),
                severity,
                months_behind: analysis.metric.months_behind,
                total_open_balance: plan.total_open_balance,
                frequency: plan.terms.frequency,
                period_amount: plan.terms.period_amount,
                payment_difference: analysis.metric.payment_difference,
                suggested_monthly_payment: money(plan.total_open_balance / Decimal::from(RENEGOTIATION_MONTHS)),
            })
        })
        .collect()
}

// Um plano entra na projeção se ainda deve e tem termos utilizáveis
fn projectable(analysis: &PlanAnalysis) -> bool {
    analysis.metric.status != PlanStatus::Completed && analysis.plan.terms.is_usable()
}

// No cenário `current`, planos em atraso ficam fora do fluxo
fn pays_in_scenario(analysis: &PlanAnalysis, scenario: ProjectionScenario) -> bool {
    projectable(analysis) && !(scenario == ProjectionScenario::Current && analysis.metric.status == PlanStatus::Behind)
}

fn last_payment_month(analysis: &PlanAnalysis) -> u32 {
    analysis
        .metric
        .remaining_payments
        .saturating_mul(analysis.plan.terms.frequency.months_per_period())
}

fn month_start(as_of: NaiveDate, offset: u32) -> Option<NaiveDate> {
    as_of.with_day(1).and_then(|first| first.checked_add_months(Months::new(offset)))
}

fn month_label(as_of: NaiveDate, offset: u32) -> String {
    month_start(as_of, offset)
        .map(|month| month.format("%Y-%m").to_string())
        .unwrap_or_default()
}

/// Parcela do plano que vence no mês `month_index` (1 = mês seguinte à referência).
/// Os pagamentos caem a cada `months_per_period` meses e o último é parcial.
pub fn payment_in_month(analysis: &PlanAnalysis, month_index: u32) -> Option<ProjectedPayment> {
    let plan = &analysis.plan;
    let months_per_period = plan.terms.frequency.months_per_period();
    if month_index == 0 || month_index % months_per_period != 0 {
        return None;
    }

    let payment_number = month_index / months_per_period;
    let total_payments = analysis.metric.remaining_payments;
    if payment_number > total_payments {
        return None;
    }

    let amount = plan.terms.period_amount;
    let already_paid = Decimal::from(payment_number - 1).saturating_mul(amount);
    let outstanding = plan.total_open_balance.saturating_sub(already_paid).max(Decimal::ZERO);
    let payment = amount.min(outstanding);

    Some(ProjectedPayment {
        plan_id: plan.plan_id,
        class_field: plan.class_field.clone(),
        payment_number,
        total_payments,
        amount: money(payment),
        remaining_balance: money(outstanding.saturating_sub(payment)),
        is_final_payment: payment_number == total_payments,
    })
}

/// Fluxo de caixa esperado para os próximos `horizon` meses.
/// O mês 1 é o mês seguinte ao da data de referência.
pub fn project(
    plans: &[&PlanAnalysis],
    as_of: NaiveDate,
    horizon: u32,
    scenario: ProjectionScenario,
) -> (Vec<MonthlyProjection>, ProjectionSummary) {
    let included = plans.iter().filter(|a| projectable(a)).count();
    let paying: Vec<&PlanAnalysis> = plans.iter().copied().filter(|a| pays_in_scenario(a, scenario)).collect();

    let mut months = Vec::with_capacity(horizon as usize);
    let mut cumulative_total = Decimal::ZERO;

    for month_index in 1..=horizon {
        let mut expected_payment = Decimal::ZERO;
        let mut active_customers = 0;
        let mut completing_customers = 0;

        for analysis in &paying {
            let last_month = last_payment_month(analysis);
            if month_index > last_month {
                continue;
            }
            active_customers += 1;
            if month_index == last_month {
                completing_customers += 1;
            }

            if let Some(payment) = payment_in_month(analysis, month_index) {
                expected_payment = expected_payment.saturating_add(payment.amount);
            }
        }

        cumulative_total = cumulative_total.saturating_add(expected_payment);
        months.push(MonthlyProjection {
            month_index,
            month: month_label(as_of, month_index),
            expected_payment: money(expected_payment),
            active_customers,
            completing_customers,
            cumulative_total: money(cumulative_total),
        });
    }

    let average_monthly = if horizon == 0 {
        Decimal::ZERO
    } else {
        money(cumulative_total / Decimal::from(horizon))
    };

    let summary = ProjectionSummary {
        scenario,
        horizon_months: horizon,
        plans_included: paying.len(),
        plans_excluded: plans.len() - included,
        plans_withheld: included - paying.len(),
        total_expected_collection: money(cumulative_total),
        average_monthly,
    };

    (months, summary)
}

/// Linha do tempo por cliente: renegociação necessária primeiro, depois maior
/// parcela mensal.
pub fn project_customers(
    plans: &[&PlanAnalysis],
    as_of: NaiveDate,
    horizon: u32,
    scenario: ProjectionScenario,
    payment_day: u32,
) -> Vec<CustomerProjection> {
    let mut order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, Vec<&PlanAnalysis>> = HashMap::new();
    for analysis in plans.iter().copied().filter(|a| projectable(a)) {
        let key = analysis.plan.customer_key.as_str();
        grouped
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(analysis);
    }

    let mut projections: Vec<CustomerProjection> = order
        .into_iter()
        .filter_map(|key| grouped.get(key))
        .map(|group| project_customer(group, as_of, horizon, scenario, payment_day))
        .collect();

    projections.sort_by(|a, b| {
        b.renegotiation_needed
            .cmp(&a.renegotiation_needed)
            .then_with(|| b.total_monthly_payment.cmp(&a.total_monthly_payment))
            .then_with(|| a.customer_name.cmp(&b.customer_name))
    });
    projections
}

fn project_customer(
    group: &[&PlanAnalysis],
    as_of: NaiveDate,
    horizon: u32,
    scenario: ProjectionScenario,
    payment_day: u32,
) -> CustomerProjection {
    let first = group[0];
    let paying: Vec<&PlanAnalysis> = group.iter().copied().filter(|a| pays_in_scenario(a, scenario)).collect();

    let months_behind = group.iter().map(|a| a.metric.months_behind).max().unwrap_or(Decimal::ZERO);
    let status = group
        .iter()
        .map(|a| a.metric.status)
        .reduce(PlanStatus::worst)
        .unwrap_or(first.metric.status);

    let completion_month = (paying.len() == group.len())
        .then(|| paying.iter().map(|a| last_payment_month(a)).max().unwrap_or(0))
        .filter(|month| *month <= horizon);

    let mut timeline = Vec::with_capacity(horizon as usize);
    for month_index in 1..=horizon {
        let Some(due_date) =
            month_start(as_of, month_index).and_then(|month| month.with_day(payment_day.clamp(1, 28)))
        else {
            break;
        };

        let payments: Vec<ProjectedPayment> =
            paying.iter().filter_map(|a| payment_in_month(a, month_index)).collect();

        timeline.push(CustomerProjectionMonth {
            month_index,
            month: month_label(as_of, month_index),
            due_date,
            expected_payment: money(saturating_sum(payments.iter().map(|p| p.amount))),
            active_plans: paying.iter().filter(|a| month_index <= last_payment_month(a)).count(),
            payments,
        });
    }

    CustomerProjection {
        customer_name: first.plan.customer_name.clone(),
        plan_count: group.len(),
        total_monthly_payment: money(saturating_sum(group.iter().map(|a| a.metric.monthly_equivalent))),
        total_owed: money(saturating_sum(group.iter().map(|a| a.plan.total_open_balance))),
        status,
        months_behind,
        renegotiation_needed: scenario == ProjectionScenario::Current && months_behind > Decimal::ZERO,
        completion_month,
        timeline,
    }
}
