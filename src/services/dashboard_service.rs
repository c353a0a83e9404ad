// src/services/dashboard_service.rs

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::numbers::{money, one_decimal, percentage},
    models::{
        compliance::{CollectionSeverity, PlanStatus},
        dashboard::{
            CollectionsView, CustomerFilter, CustomerIssues, CustomerSort, CustomerSummary, CustomersView,
            CustomerProjection, DashboardView, IssueCount, Pagination, PlanDetail, PlanRow, ProjectionScenario,
            ProjectionsView, QualityView, SortOrder, ViewKind, ViewPayload,
        },
        quality::{IssueKind, IssueSeverity},
        snapshot::{AnalysisSnapshot, CustomerProjectionRow, PlanAnalysis, PlanExportRow},
    },
    services::{collections_service, compliance_service::ComplianceCalculator},
};

pub const MAX_PER_PAGE: usize = 100;

/// Filtro de classe normalizado: vazio ou "all" significa sem filtro.
pub fn normalize_class_filter(class_filter: Option<&str>) -> Option<String> {
    class_filter
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
        .map(str::to_string)
}

pub fn plan_row(analysis: &PlanAnalysis) -> PlanRow {
    let plan = &analysis.plan;
    PlanRow {
        plan_id: plan.plan_id,
        customer_name: plan.customer_name.clone(),
        class_field: plan.class_field.clone(),
        frequency: plan.terms.frequency,
        period_amount: plan.terms.period_amount,
        monthly_equivalent: analysis.metric.monthly_equivalent,
        total_open_balance: plan.total_open_balance,
        status: analysis.metric.status,
        months_behind: analysis.metric.months_behind,
        percent_paid: analysis.metric.percent_paid,
        projected_completion_date: analysis.metric.projected_completion_date,
        invoice_count: plan.member_invoice_count,
        issues: analysis.issues.iter().map(|issue| issue.kind).collect(),
    }
}

/// Achata a linha do tempo de um cliente: uma linha por mês.
pub fn projection_rows(projection: &CustomerProjection, scenario: ProjectionScenario) -> Vec<CustomerProjectionRow> {
    projection
        .timeline
        .iter()
        .map(|month| CustomerProjectionRow {
            customer_name: projection.customer_name.clone(),
            scenario: scenario.as_str().to_string(),
            month_index: month.month_index,
            month: month.month.clone(),
            due_date: month.due_date,
            expected_payment: month.expected_payment,
            active_plans: month.active_plans,
            renegotiation_needed: projection.renegotiation_needed,
            plan_payments: month
                .payments
                .iter()
                .map(|p| format!("{}: {} ({}/{})", p.plan_id, p.amount, p.payment_number, p.total_payments))
                .collect::<Vec<_>>()
                .join(";"),
        })
        .collect()
}

pub fn export_row(analysis: &PlanAnalysis) -> PlanExportRow {
    let plan = &analysis.plan;
    let metric = &analysis.metric;
    PlanExportRow {
        plan_id: plan.plan_id,
        customer_name: plan.customer_name.clone(),
        class_field: plan.class_field.clone().unwrap_or_default(),
        frequency: plan.terms.frequency.as_str().to_string(),
        period_amount: plan.terms.period_amount,
        open_balance: plan.total_open_balance,
        original_balance: metric.original_balance,
        percent_paid: metric.percent_paid,
        months_behind: metric.months_behind,
        status: metric.status.as_str().to_string(),
        severity: CollectionSeverity::from_months_behind(metric.months_behind)
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        projected_completion_date: metric.projected_completion_date,
        invoice_count: plan.member_invoice_count,
        issue_count: analysis.issues.len(),
        issues: analysis.issues.iter().map(|i| i.kind.as_str()).collect::<Vec<_>>().join(";"),
    }
}

// Valor que o plano ainda deve por mês (zero se quitado ou sem termos)
fn active_monthly(analysis: &PlanAnalysis) -> Decimal {
    if analysis.metric.status == PlanStatus::Completed || !analysis.metric.metrics_available {
        Decimal::ZERO
    } else {
        analysis.metric.monthly_equivalent
    }
}

fn amount_behind(analysis: &PlanAnalysis) -> Decimal {
    analysis
        .metric
        .payment_difference
        .max(Decimal::ZERO)
        .min(analysis.plan.total_open_balance)
}

fn quality_score(clean: usize, total: usize) -> Decimal {
    if total == 0 { Decimal::ONE_HUNDRED } else { percentage(clean, total) }
}

#[derive(Debug, Clone)]
pub struct DashboardService {
    projection_months: u32,
    calculator: ComplianceCalculator,
}

impl DashboardService {
    pub fn new(projection_months: u32, calculator: ComplianceCalculator) -> Self {
        Self { projection_months, calculator }
    }

    /// Aplica o filtro de classe antes de qualquer agregação.
    pub fn filter_plans<'a>(&self, snapshot: &'a AnalysisSnapshot, class_filter: Option<&str>) -> Vec<&'a PlanAnalysis> {
        match normalize_class_filter(class_filter) {
            Some(class) => snapshot.plans.iter().filter(|a| a.plan.matches_class(&class)).collect(),
            None => snapshot.plans.iter().collect(),
        }
    }

    /// Visão pelo nome. Clientes saem na primeira página de `MAX_PER_PAGE`
    /// (a paginação informa o total; `/api/results/customers` pagina o resto) e
    /// projeções no cenário padrão.
    pub fn render(&self, snapshot: &AnalysisSnapshot, view: ViewKind, class_filter: Option<&str>) -> ViewPayload {
        match view {
            ViewKind::Dashboard => ViewPayload::Dashboard(self.dashboard(snapshot, class_filter)),
            ViewKind::Quality => ViewPayload::Quality(self.quality(snapshot, class_filter)),
            ViewKind::Customers => ViewPayload::Customers(self.customers(
                snapshot,
                &CustomerFilter {
                    class_filter: class_filter.map(str::to_string),
                    page: 1,
                    per_page: MAX_PER_PAGE,
                    ..Default::default()
                },
            )),
            ViewKind::Collections => ViewPayload::Collections(self.collections(snapshot, class_filter)),
            ViewKind::Projections => ViewPayload::Projections(self.projections(
                snapshot,
                class_filter,
                None,
                ProjectionScenario::default(),
            )),
        }
    }

    pub fn dashboard(&self, snapshot: &AnalysisSnapshot, class_filter: Option<&str>) -> DashboardView {
        let plans = self.filter_plans(snapshot, class_filter);

        let count_status = |status: PlanStatus| plans.iter().filter(|a| a.metric.status == status).count();
        let plans_behind = count_status(PlanStatus::Behind);

        let percents: Vec<Decimal> = plans.iter().filter_map(|a| a.metric.percent_paid).collect();
        let average_percent_paid = (!percents.is_empty())
            .then(|| one_decimal(percents.iter().sum::<Decimal>() / Decimal::from(percents.len())));

        let clean_plans = plans.iter().filter(|a| a.is_clean()).count();

        let mut frequency_breakdown: BTreeMap<String, usize> = BTreeMap::new();
        for analysis in &plans {
            let key = if analysis.plan.terms.is_usable() {
                analysis.plan.terms.frequency.as_str()
            } else {
                "unspecified"
            };
            *frequency_breakdown.entry(key.to_string()).or_default() += 1;
        }

        DashboardView {
            class_filter: normalize_class_filter(class_filter),
            as_of: snapshot.as_of,
            total_plans: plans.len(),
            total_customers: plans.iter().map(|a| a.plan.customer_key.as_str()).collect::<BTreeSet<_>>().len(),
            total_outstanding: money(plans.iter().map(|a| a.plan.total_open_balance).sum()),
            expected_monthly: money(plans.iter().map(|a| active_monthly(a)).sum()),
            total_amount_behind: money(plans.iter().map(|a| amount_behind(a)).sum()),
            plans_behind,
            plans_current: count_status(PlanStatus::Current),
            plans_completed: count_status(PlanStatus::Completed),
            percentage_behind: percentage(plans_behind, plans.len()),
            average_percent_paid,
            data_quality_score: quality_score(clean_plans, plans.len()),
            clean_plans,
            problematic_plans: plans.len() - clean_plans,
            frequency_breakdown,
            plans: plans.iter().map(|a| plan_row(a)).collect(),
        }
    }

    pub fn quality(&self, snapshot: &AnalysisSnapshot, class_filter: Option<&str>) -> QualityView {
        let plans = self.filter_plans(snapshot, class_filter);
        let clean_plans = plans.iter().filter(|a| a.is_clean()).count();

        let issue_breakdown: Vec<IssueCount> = IssueKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let matching: Vec<_> = plans
                    .iter()
                    .flat_map(|a| a.issues.iter())
                    .filter(|issue| issue.kind == kind)
                    .collect();
                (!matching.is_empty()).then(|| IssueCount {
                    kind,
                    severity: kind.severity(),
                    plan_count: matching.len(),
                    invoice_count: matching.iter().map(|issue| issue.affected_invoices.len()).sum(),
                })
            })
            .collect();

        let count_severity = |severity: IssueSeverity| {
            plans
                .iter()
                .flat_map(|a| a.issues.iter())
                .filter(|issue| issue.severity == severity)
                .count()
        };

        let problematic_customers = plans
            .iter()
            .filter(|a| !a.is_clean())
            .map(|a| CustomerIssues {
                plan_id: a.plan.plan_id,
                customer_name: a.plan.customer_name.clone(),
                class_field: a.plan.class_field.clone(),
                total_open_balance: a.plan.total_open_balance,
                issues: a.issues.clone(),
            })
            .collect();

        QualityView {
            class_filter: normalize_class_filter(class_filter),
            data_quality_score: quality_score(clean_plans, plans.len()),
            total_plans: plans.len(),
            clean_plans,
            problematic_plans: plans.len() - clean_plans,
            critical_issues: count_severity(IssueSeverity::Critical),
            warning_issues: count_severity(IssueSeverity::Warning),
            info_issues: count_severity(IssueSeverity::Info),
            issue_breakdown,
            problematic_customers,
            file_report: snapshot.quality.clone(),
        }
    }

    pub fn customers(&self, snapshot: &AnalysisSnapshot, filter: &CustomerFilter) -> CustomersView {
        let plans = self.filter_plans(snapshot, filter.class_filter.as_deref());

        // Agrupa por cliente na ordem da primeira aparição
        let mut order: Vec<&str> = Vec::new();
        let mut grouped: BTreeMap<&str, Vec<&PlanAnalysis>> = BTreeMap::new();
        for analysis in plans.iter().copied() {
            let key = analysis.plan.customer_key.as_str();
            grouped
                .entry(key)
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(analysis);
        }

        let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase);

        let mut customers: Vec<CustomerSummary> = order
            .into_iter()
            .filter_map(|key| grouped.get(key))
            .map(|group| summarize_customer(group))
            .filter(|c| filter.status.is_none_or(|status| c.status == status))
            .filter(|c| search.as_deref().is_none_or(|s| c.customer_name.to_lowercase().contains(s)))
            .collect();

        customers.sort_by(|a, b| {
            let ordering = match filter.sort {
                CustomerSort::MonthsBehind => a.months_behind.cmp(&b.months_behind),
                CustomerSort::Balance => a.total_open_balance.cmp(&b.total_open_balance),
                CustomerSort::Name => a.customer_name.to_lowercase().cmp(&b.customer_name.to_lowercase()),
                CustomerSort::Payment => a.monthly_equivalent.cmp(&b.monthly_equivalent),
            };
            let ordering = if filter.order == SortOrder::Desc { ordering.reverse() } else { ordering };
            ordering.then_with(|| a.customer_name.to_lowercase().cmp(&b.customer_name.to_lowercase()))
        });

        let page = filter.page.max(1);
        let per_page = filter.per_page.clamp(1, MAX_PER_PAGE);
        let total_items = customers.len();

        let customers = customers.into_iter().skip((page - 1) * per_page).take(per_page).collect();

        CustomersView {
            class_filter: normalize_class_filter(filter.class_filter.as_deref()),
            customers,
            pagination: Pagination { page, per_page, total_items, total_pages: total_items.div_ceil(per_page) },
        }
    }

    pub fn collections(&self, snapshot: &AnalysisSnapshot, class_filter: Option<&str>) -> CollectionsView {
        let plans = self.filter_plans(snapshot, class_filter);
        let entries = collections_service::prioritize(&plans);

        let mut severity_counts: BTreeMap<String, usize> = [
            CollectionSeverity::Critical,
            CollectionSeverity::Severe,
            CollectionSeverity::Behind,
        ]
        .into_iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
        for entry in &entries {
            *severity_counts.entry(entry.severity.as_str().to_string()).or_default() += 1;
        }

        let behind_plans: Vec<&PlanAnalysis> = plans
            .iter()
            .copied()
            .filter(|a| a.metric.status == PlanStatus::Behind)
            .collect();

        CollectionsView {
            class_filter: normalize_class_filter(class_filter),
            total_behind_plans: entries.len(),
            total_amount_behind: money(behind_plans.iter().map(|a| amount_behind(a)).sum()),
            total_balance_at_risk: money(entries.iter().map(|e| e.total_open_balance).sum()),
            severity_counts,
            entries,
        }
    }

    pub fn projections(
        &self,
        snapshot: &AnalysisSnapshot,
        class_filter: Option<&str>,
        months: Option<u32>,
        scenario: ProjectionScenario,
    ) -> ProjectionsView {
        let plans = self.filter_plans(snapshot, class_filter);
        let horizon = months.unwrap_or(self.projection_months);
        let (months, summary) = collections_service::project(&plans, snapshot.as_of, horizon, scenario);
        let customers = collections_service::project_customers(
            &plans,
            snapshot.as_of,
            horizon,
            scenario,
            self.calculator.payment_day(),
        );

        ProjectionsView { class_filter: normalize_class_filter(class_filter), scenario, months, summary, customers }
    }

    pub fn plan_detail(&self, snapshot: &AnalysisSnapshot, plan_id: Uuid) -> Option<PlanDetail> {
        let analysis = snapshot.find_plan(plan_id)?;
        Some(PlanDetail {
            plan: analysis.plan.clone(),
            metric: analysis.metric.clone(),
            issues: analysis.issues.clone(),
            schedule: self.calculator.schedule(&analysis.plan, snapshot.as_of),
        })
    }

    /// Classes presentes nos planos, em ordem alfabética.
    pub fn available_classes(&self, snapshot: &AnalysisSnapshot) -> Vec<String> {
        snapshot
            .plans
            .iter()
            .filter_map(|a| a.plan.class_field.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn export_rows(&self, snapshot: &AnalysisSnapshot, class_filter: Option<&str>) -> Vec<PlanExportRow> {
        self.filter_plans(snapshot, class_filter).into_iter().map(export_row).collect()
    }
}

fn summarize_customer(group: &[&PlanAnalysis]) -> CustomerSummary {
    let first = group[0];
    let status = group
        .iter()
        .map(|a| a.metric.status)
        .reduce(PlanStatus::worst)
        .unwrap_or(first.metric.status);

    let classes: BTreeSet<String> = group.iter().filter_map(|a| a.plan.class_field.clone()).collect();

    CustomerSummary {
        customer_name: first.plan.customer_name.clone(),
        classes: classes.into_iter().collect(),
        plan_count: group.len(),
        total_open_balance: money(group.iter().map(|a| a.plan.total_open_balance).sum()),
        monthly_equivalent: money(group.iter().map(|a| active_monthly(a)).sum()),
        status,
        months_behind: group.iter().map(|a| a.metric.months_behind).max().unwrap_or(Decimal::ZERO),
        issue_count: group.iter().map(|a| a.issues.len()).sum(),
        plans: group.iter().map(|a| plan_row(a)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analysis_service::tests::{as_of, sample_csv, service};

    fn snapshot() -> AnalysisSnapshot {
        service().analyze_csv(sample_csv().as_bytes(), "sample.csv", as_of()).unwrap()
    }

    fn dashboard_service() -> DashboardService {
        DashboardService::new(12, ComplianceCalculator::new(15))
    }

    #[test]
    fn class_filter_is_applied_before_aggregation() {
        let snapshot = snapshot();
        let view = dashboard_service().dashboard(&snapshot, Some("retail"));

        assert_eq!(view.class_filter.as_deref(), Some("retail"));
        assert_eq!(view.total_plans, 2);
        assert_eq!(
            view.total_outstanding,
            view.plans.iter().map(|row| row.total_open_balance).sum::<Decimal>()
        );
        assert!(view.plans.iter().all(|row| row.class_field.as_deref() == Some("Retail")));
    }

    #[test]
    fn all_or_blank_means_no_filter() {
        let snapshot = snapshot();
        let service = dashboard_service();

        let unfiltered = service.dashboard(&snapshot, None);
        assert_eq!(unfiltered.total_plans, 4);
        assert_eq!(service.dashboard(&snapshot, Some("All")).total_plans, 4);
        assert_eq!(service.dashboard(&snapshot, Some("  ")).total_plans, 4);
        assert_eq!(unfiltered.total_customers, 4);
    }

    #[test]
    fn quality_view_splits_clean_and_problematic_plans() {
        let snapshot = snapshot();
        let view = dashboard_service().quality(&snapshot, None);

        assert_eq!(view.clean_plans + view.problematic_plans, view.total_plans);
        assert_eq!(view.problematic_customers.len(), view.problematic_plans);
        assert!(view.issue_breakdown.iter().any(|c| c.kind == IssueKind::MultiplePaymentTerms));
    }

    #[test]
    fn customers_are_sorted_and_paginated() {
        let snapshot = snapshot();
        let filter = CustomerFilter {
            sort: CustomerSort::Name,
            order: SortOrder::Asc,
            page: 2,
            per_page: 1,
            ..Default::default()
        };
        let view = dashboard_service().customers(&snapshot, &filter);

        assert_eq!(view.pagination.total_items, 4);
        assert_eq!(view.pagination.total_pages, 4);
        assert_eq!(view.customers.len(), 1);
        assert_eq!(view.customers[0].customer_name, "Globex");
    }

    #[test]
    fn rendered_customers_view_is_the_first_full_page() {
        let snapshot = snapshot();
        let ViewPayload::Customers(view) = dashboard_service().render(&snapshot, ViewKind::Customers, None) else {
            panic!("visão de clientes esperada");
        };

        assert_eq!(view.pagination.page, 1);
        assert_eq!(view.pagination.per_page, MAX_PER_PAGE);
        assert_eq!(view.pagination.total_items, 4);
        assert_eq!(view.customers.len(), 4);
    }

    #[test]
    fn customer_search_is_case_insensitive() {
        let snapshot = snapshot();
        let filter = CustomerFilter { search: Some("ACME".into()), page: 1, per_page: 25, ..Default::default() };
        let view = dashboard_service().customers(&snapshot, &filter);

        assert_eq!(view.customers.len(), 1);
        assert_eq!(view.customers[0].customer_name, "Acme Corp");
    }

    #[test]
    fn classes_come_sorted_from_plans() {
        let snapshot = snapshot();
        assert_eq!(dashboard_service().available_classes(&snapshot), vec!["KL".to_string(), "Retail".to_string()]);
    }

    #[test]
    fn unknown_plan_has_no_detail() {
        let snapshot = snapshot();
        assert!(dashboard_service().plan_detail(&snapshot, Uuid::nil()).is_none());

        let known = snapshot.plans[0].plan.plan_id;
        let detail = dashboard_service().plan_detail(&snapshot, known).unwrap();
        assert!(!detail.schedule.is_empty());
    }

    #[test]
    fn projections_carry_scenario_and_customer_timelines() {
        let snapshot = snapshot();
        let service = dashboard_service();

        let restart = service.projections(&snapshot, None, Some(6), ProjectionScenario::Restart);
        assert_eq!(restart.months.len(), 6);
        assert_eq!(restart.summary.plans_withheld, 0);
        assert!(restart.customers.iter().all(|c| !c.renegotiation_needed && c.timeline.len() == 6));

        let current = service.projections(&snapshot, None, Some(6), ProjectionScenario::Current);
        assert_eq!(current.scenario, ProjectionScenario::Current);
        assert_eq!(current.summary.plans_withheld, 2);
        assert!(current.customers[0].renegotiation_needed);

        let rows = projection_rows(&current.customers[0], current.scenario);
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].scenario, "current");
    }
}
