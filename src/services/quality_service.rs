// src/services/quality_service.rs

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rust_decimal::Decimal;

use crate::{
    common::numbers::percentage,
    models::{
        invoice::NormalizedRecord,
        payment_plan::{PaymentPlan, PlanInvoice},
        quality::{IssueKind, QualityIssue, QualityReport},
    },
    services::plan_builder_service::is_plan_member,
};

// Problemas de linha que sobem para o plano tal como estão
const RECORD_LEVEL_KINDS: [IssueKind; 6] = [
    IssueKind::MissingCustomerName,
    IssueKind::InvalidAmounts,
    IssueKind::MissingClass,
    IssueKind::FutureDated,
    IssueKind::InvalidDateFormat,
    IssueKind::TypoPaymentTerms,
];

fn describe(kind: IssueKind, count: usize) -> String {
    match kind {
        IssueKind::MissingCustomerName => format!("{count} fatura(s) sem nome de cliente"),
        IssueKind::InvalidAmounts => format!("{count} fatura(s) com valores ilegíveis ou inconsistentes"),
        IssueKind::NoPaymentTerms => "Plano sem termos de pagamento utilizáveis".to_string(),
        IssueKind::AssumedFrequency => "Frequência não informada; assumida mensal".to_string(),
        IssueKind::MultiplePaymentTerms => format!("{count} fatura(s) com termos de pagamento divergentes"),
        IssueKind::MissingClass => format!("{count} fatura(s) sem classe"),
        IssueKind::FutureDated => format!("{count} fatura(s) com data no futuro"),
        IssueKind::InvalidDateFormat => format!("{count} fatura(s) com data em formato inválido"),
        IssueKind::TypoPaymentTerms => format!("{count} fatura(s) com erro de digitação nos termos"),
        IssueKind::MultipleClasses => "Cliente dividido em mais de uma classe".to_string(),
    }
}

fn issue_for(kind: IssueKind, affected: Vec<String>) -> QualityIssue {
    QualityIssue::new(kind, describe(kind, affected.len()), affected)
}

fn identities<'a>(invoices: impl Iterator<Item = &'a PlanInvoice>) -> Vec<String> {
    invoices.map(PlanInvoice::identity).collect()
}

#[derive(Debug, Clone)]
pub struct QualityAnalysis {
    // Mesma ordem dos planos recebidos
    pub plan_issues: Vec<Vec<QualityIssue>>,
    pub report: QualityReport,
}

#[derive(Debug, Clone)]
pub struct QualityAnalyzer {
    conflict_tolerance: Decimal,
}

impl QualityAnalyzer {
    pub fn new(conflict_tolerance: Decimal) -> Self {
        Self { conflict_tolerance }
    }

    pub fn analyze(&self, records: &[NormalizedRecord], plans: &[PaymentPlan]) -> QualityAnalysis {
        let mut plans_per_customer: HashMap<&str, usize> = HashMap::new();
        for plan in plans {
            *plans_per_customer.entry(plan.customer_key.as_str()).or_default() += 1;
        }

        let plan_issues: Vec<Vec<QualityIssue>> = plans
            .iter()
            .map(|plan| {
                let customer_plans = plans_per_customer.get(plan.customer_key.as_str()).copied().unwrap_or(1);
                self.plan_issues(plan, customer_plans)
            })
            .collect();

        let clean_plans = plan_issues.iter().filter(|issues| issues.is_empty()).count();
        let report = self.build_report(records, plans, clean_plans);

        tracing::info!(
            "🔎 Qualidade: {} planos, {} limpos, score {}",
            report.total_plans,
            report.clean_plans,
            report.data_quality_score
        );

        QualityAnalysis { plan_issues, report }
    }

    /// Problemas de um plano, ordenados pela ordem canônica de `IssueKind`.
    pub fn plan_issues(&self, plan: &PaymentPlan, customer_plan_count: usize) -> Vec<QualityIssue> {
        let mut issues = Vec::new();

        for kind in RECORD_LEVEL_KINDS {
            let affected = identities(plan.invoices.iter().filter(|inv| inv.has_flag(kind)));
            if !affected.is_empty() {
                issues.push(issue_for(kind, affected));
            }
        }

        if !plan.terms.is_usable() {
            issues.push(issue_for(IssueKind::NoPaymentTerms, identities(plan.invoices.iter())));
        } else if plan.terms_source().is_some_and(|inv| inv.has_flag(IssueKind::AssumedFrequency)) {
            let affected = identities(plan.terms_source().into_iter());
            issues.push(issue_for(IssueKind::AssumedFrequency, affected));
        }

        if self.terms_diverge(plan) {
            let affected = identities(plan.invoices.iter().filter(|inv| inv.terms.is_usable()));
            issues.push(issue_for(IssueKind::MultiplePaymentTerms, affected));
        }

        if customer_plan_count > 1 {
            issues.push(issue_for(IssueKind::MultipleClasses, identities(plan.invoices.iter())));
        }

        issues.sort_by_key(|issue| issue.kind);
        issues
    }

    // Verificação própria, independente do construtor de planos
    fn terms_diverge(&self, plan: &PaymentPlan) -> bool {
        let distinct: Vec<_> = plan.invoices.iter().map(|inv| inv.terms).filter(|t| t.is_usable()).collect();
        distinct.iter().any(|a| distinct.iter().any(|b| a.materially_differs(b, self.conflict_tolerance)))
    }

    fn build_report(&self, records: &[NormalizedRecord], plans: &[PaymentPlan], clean_plans: usize) -> QualityReport {
        let invoice_rows = records.iter().filter(|r| r.is_invoice).count();
        let invoices_with_open_balance = records
            .iter()
            .filter(|r| r.is_invoice && r.open_balance > Decimal::ZERO)
            .count();
        let invoices_ignored = records.iter().filter(|r| r.is_invoice && !is_plan_member(r)).count();

        let total_customers = plans.iter().map(|p| p.customer_key.as_str()).collect::<HashSet<_>>().len();

        let mut record_issue_counts: BTreeMap<String, usize> =
            IssueKind::ALL.iter().map(|kind| (kind.as_str().to_string(), 0)).collect();
        for flag in records.iter().flat_map(|r| r.flags.iter()) {
            *record_issue_counts.entry(flag.as_str().to_string()).or_default() += 1;
        }

        let classes_found: BTreeSet<String> = records
            .iter()
            .filter(|r| r.is_invoice)
            .filter_map(|r| r.class_field.clone())
            .collect();

        let data_quality_score = if plans.is_empty() {
            Decimal::ONE_HUNDRED
        } else {
            percentage(clean_plans, plans.len())
        };

        QualityReport {
            total_rows_processed: records.len(),
            invoice_rows,
            non_invoice_rows: records.len() - invoice_rows,
            invoices_with_open_balance,
            invoices_ignored,
            total_customers,
            total_plans: plans.len(),
            clean_plans,
            problematic_plans: plans.len() - clean_plans,
            data_quality_score,
            record_issue_counts,
            classes_found: classes_found.into_iter().collect(),
        }
    }
}
