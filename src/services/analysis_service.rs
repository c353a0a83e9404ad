// src/services/analysis_service.rs

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    common::error::IngestError,
    config::AnalysisSettings,
    models::{
        invoice::RawRow,
        snapshot::{AnalysisSnapshot, PlanAnalysis},
    },
    services::{
        compliance_service::ComplianceCalculator, normalizer_service::RecordNormalizer, plan_builder_service::PlanBuilder,
        quality_service::QualityAnalyzer,
    },
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone)]
pub struct AnalysisService {
    settings: AnalysisSettings,
}

impl AnalysisService {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Lê o CSV exportado. Falhas aqui são as únicas fatais da análise.
    pub fn read_csv(&self, bytes: &[u8]) -> Result<Vec<RawRow>, IngestError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let text = String::from_utf8(bytes.to_vec())?;
        if text.trim().is_empty() {
            return Err(IngestError::Empty);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        // Colunas sem cabeçalho recebem o nome "_<índice>"
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(idx, name)| if name.is_empty() { format!("_{idx}") } else { name.to_string() })
            .collect();

        let mapping = &self.settings.columns;
        let missing: Vec<String> = mapping
            .required()
            .into_iter()
            .filter(|column| !headers.iter().any(|h| h == column))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns(missing));
        }

        let limit = self.settings.max_rows;
        let mut rows = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            // Para na primeira linha além do limite, sem ler o resto do arquivo
            if rows.len() == limit {
                return Err(IngestError::TooManyRows { limit });
            }

            let columns: HashMap<String, String> = headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect();

            rows.push(RawRow::from_columns(row_idx + 1, &columns, mapping));
        }

        if rows.is_empty() {
            return Err(IngestError::Empty);
        }

        Ok(rows)
    }

    /// Roda o pipeline completo sobre linhas já lidas. Nunca falha.
    pub fn analyze_rows(&self, rows: &[RawRow], source_name: &str, as_of: NaiveDate) -> AnalysisSnapshot {
        let settings = &self.settings;

        let records = RecordNormalizer::new(as_of, settings.future_tolerance_days).normalize_all(rows);
        tracing::info!("🧹 {} linhas normalizadas", records.len());

        let plans = PlanBuilder::new(settings.conflict_tolerance).build(&records);
        tracing::info!("📋 {} planos de pagamento montados", plans.len());

        let quality = QualityAnalyzer::new(settings.conflict_tolerance).analyze(&records, &plans);

        let calculator = ComplianceCalculator::new(settings.payment_day);
        let analyses: Vec<PlanAnalysis> = plans
            .into_iter()
            .zip(quality.plan_issues)
            .map(|(plan, issues)| PlanAnalysis { metric: calculator.calculate(&plan, as_of), plan, issues })
            .collect();

        let snapshot = AnalysisSnapshot {
            analysis_id: Uuid::new_v4(),
            source_name: source_name.to_string(),
            as_of,
            generated_at: Utc::now(),
            plans: analyses,
            quality: quality.report,
        };

        tracing::info!(
            "✅ Análise {} concluída: {} planos, referência {}",
            snapshot.analysis_id,
            snapshot.plans.len(),
            as_of
        );

        snapshot
    }

    pub fn analyze_csv(&self, bytes: &[u8], source_name: &str, as_of: NaiveDate) -> Result<AnalysisSnapshot, IngestError> {
        let rows = self.read_csv(bytes)?;
        Ok(self.analyze_rows(&rows, source_name, as_of))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{compliance::PlanStatus, quality::IssueKind};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    pub(crate) const HEADER: &str = ",_1,_2,Type,Date,Num,FOB,Class,Amount,Open Balance";

    pub(crate) fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    // Export típico: cabeçalhos de seção, faturas, linhas de total
    pub(crate) fn sample_csv() -> String {
        [
            HEADER,
            ",Acme Corp,,,,,,,,",
            ",,,Invoice,05/19/2026,1001,$500/month,Retail,,2500.00",
            ",Total Acme Corp,,,,,,,,2500.00",
            ",Globex,,,,,,,,",
            ",,,Invoice,01/10/2026,2001,$300/month,KL,,900.00",
            ",,,Invoice,03/10/2026,2002,$450/month,KL,,1800.00",
            ",,,Payment,03/15/2026,,,KL,,(450.00)",
            ",Total Globex,,,,,,,,2250.00",
            ",Initech,,Invoice,08/01/2026,3001,,Retail,,700.00",
            ",Umbrella,,Invoice,09/01/2026,4001,$100 quarterly,KL,,abc",
        ]
        .join("\n")
    }

    pub(crate) fn service() -> AnalysisService {
        AnalysisService::new(AnalysisSettings::default())
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn full_pipeline_on_sample_export() {
        let snapshot = service().analyze_csv(sample_csv().as_bytes(), "sample.csv", as_of()).unwrap();

        // Linhas em = registros processados
        assert_eq!(snapshot.quality.total_rows_processed, 10);
        assert_eq!(snapshot.plans.len(), 4);

        let acme = &snapshot.plans[0];
        assert_eq!(acme.plan.customer_name, "Acme Corp");
        assert_eq!(acme.metric.original_balance, dec("3000"));
        assert_eq!(acme.metric.status, PlanStatus::Behind);
        assert!(acme.is_clean());

        let globex = &snapshot.plans[1];
        assert_eq!(globex.plan.terms.period_amount, dec("450"));
        assert!(globex.has_issue(IssueKind::MultiplePaymentTerms));

        let initech = &snapshot.plans[2];
        assert!(initech.has_issue(IssueKind::NoPaymentTerms));
        assert_eq!(initech.metric.projected_completion_date, None);

        let umbrella = &snapshot.plans[3];
        assert!(umbrella.has_issue(IssueKind::InvalidAmounts));
        assert_eq!(umbrella.metric.status, PlanStatus::Completed);
    }

    #[test]
    fn extreme_amounts_are_flagged_without_aborting() {
        let csv = [
            HEADER,
            ",Acme,,Invoice,2026-05-19,1,$0.0001 quarterly,Retail,,1000000",
            ",Globex,,Invoice,2026-05-19,2,$500/month,KL,,70000000000000000000000000000",
            ",Globex,,Invoice,2026-06-19,3,$500/month,KL,,70000000000000000000000000000",
            ",Initech,,Invoice,2025-05-19,4,$70000000000000000000000000000/month,Retail,,900",
        ]
        .join("\n");

        let snapshot = service().analyze_csv(csv.as_bytes(), "extremes.csv", as_of()).unwrap();
        assert_eq!(snapshot.plans.len(), 3);

        let acme = &snapshot.plans[0];
        assert!(acme.has_issue(IssueKind::NoPaymentTerms));
        assert_eq!(acme.metric.projected_completion_date, None);

        let globex = &snapshot.plans[1];
        assert!(globex.has_issue(IssueKind::InvalidAmounts));
        assert_eq!(globex.plan.total_open_balance, Decimal::ZERO);
        assert_eq!(globex.metric.status, PlanStatus::Completed);

        let initech = &snapshot.plans[2];
        assert!(initech.has_issue(IssueKind::NoPaymentTerms));
        assert_eq!(initech.plan.total_open_balance, dec("900"));
    }

    #[test]
    fn analysis_is_deterministic() {
        let a = service().analyze_csv(sample_csv().as_bytes(), "a.csv", as_of()).unwrap();
        let b = service().analyze_csv(sample_csv().as_bytes(), "b.csv", as_of()).unwrap();

        let ids = |s: &AnalysisSnapshot| s.plans.iter().map(|p| p.plan.plan_id).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
        assert_ne!(a.analysis_id, b.analysis_id);
    }

    #[test]
    fn missing_required_columns_are_reported() {
        let csv = "Customer,Type,Open Balance\nAcme,Invoice,100";
        match service().read_csv(csv.as_bytes()) {
            Err(IngestError::MissingColumns(columns)) => {
                assert!(columns.contains(&"FOB".to_string()));
                assert!(columns.contains(&"_1".to_string()));
            }
            other => panic!("esperado MissingColumns, veio {other:?}"),
        }
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert!(matches!(service().read_csv(b""), Err(IngestError::Empty)));
        assert!(matches!(service().read_csv(HEADER.as_bytes()), Err(IngestError::Empty)));
        assert!(matches!(service().read_csv(&[0xff, 0xfe, 0x00]), Err(IngestError::InvalidEncoding(_))));
    }

    #[test]
    fn row_limit_is_enforced() {
        let settings = AnalysisSettings { max_rows: 3, ..AnalysisSettings::default() };
        let result = AnalysisService::new(settings).read_csv(sample_csv().as_bytes());
        assert!(matches!(result, Err(IngestError::TooManyRows { limit: 3 })));
    }

    #[test]
    fn one_row_over_the_limit_is_rejected() {
        let settings = AnalysisSettings { max_rows: 9, ..AnalysisSettings::default() };
        let result = AnalysisService::new(settings).read_csv(sample_csv().as_bytes());
        assert!(matches!(result, Err(IngestError::TooManyRows { limit: 9 })));
    }

    #[test]
    fn exactly_the_limit_is_accepted() {
        let settings = AnalysisSettings { max_rows: 10, ..AnalysisSettings::default() };
        let rows = AnalysisService::new(settings).read_csv(sample_csv().as_bytes()).unwrap();
        assert_eq!(rows.len(), 10);
    }

    #[test]
    fn bom_and_blank_lines_are_ignored() {
        let csv = format!("\u{feff}{HEADER}\n,,,,,,,,,\n,Acme,,Invoice,2026-05-19,1,$500/month,Retail,,2500");
        let rows = service().read_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].primary_name, "Acme");
        assert_eq!(rows[0].open_balance, "2500");
    }
}
