// src/docs.rs

use utoipa::OpenApi;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payment Plan Tracker",
        description = "Análise de conformidade de planos de pagamento a partir do export de faturas em aberto"
    ),
    paths(
        // --- Sistema ---
        handlers::upload::health,

        // --- Análise ---
        handlers::upload::upload_file,
        handlers::upload::clear_results,

        // --- Resultados ---
        handlers::dashboard::get_dashboard,
        handlers::dashboard::get_quality,
        handlers::dashboard::get_customers,
        handlers::dashboard::get_collections,
        handlers::dashboard::get_projections,
        handlers::dashboard::get_view,
        handlers::dashboard::get_classes,
        handlers::dashboard::get_plan,

        // --- Exportação ---
        handlers::export::export_plans_csv,
        handlers::export::export_collections_csv,
        handlers::export::export_projections_csv,
    ),
    components(
        schemas(
            // --- Planos ---
            models::payment_plan::PaymentFrequency,
            models::payment_plan::PaymentTerms,
            models::payment_plan::PlanInvoice,
            models::payment_plan::PaymentPlan,

            // --- Conformidade ---
            models::compliance::PlanStatus,
            models::compliance::OriginalBalanceSource,
            models::compliance::CollectionSeverity,
            models::compliance::ComplianceMetric,
            models::compliance::ScheduledPayment,

            // --- Qualidade ---
            models::quality::IssueKind,
            models::quality::IssueSeverity,
            models::quality::QualityIssue,
            models::quality::QualityReport,

            // --- Visões ---
            models::dashboard::ViewKind,
            models::dashboard::CustomerSort,
            models::dashboard::SortOrder,
            models::dashboard::PlanRow,
            models::dashboard::DashboardView,
            models::dashboard::IssueCount,
            models::dashboard::CustomerIssues,
            models::dashboard::QualityView,
            models::dashboard::CustomerSummary,
            models::dashboard::Pagination,
            models::dashboard::CustomersView,
            models::dashboard::CollectionEntry,
            models::dashboard::CollectionsView,
            models::dashboard::MonthlyProjection,
            models::dashboard::ProjectionSummary,
            models::dashboard::ProjectionScenario,
            models::dashboard::ProjectedPayment,
            models::dashboard::CustomerProjectionMonth,
            models::dashboard::CustomerProjection,
            models::dashboard::ProjectionsView,
            models::dashboard::ViewPayload,
            models::dashboard::PlanDetail,
            models::dashboard::ClassesResponse,

            // --- Payloads ---
            handlers::upload::UploadForm,
            handlers::upload::UploadResponse,
            handlers::upload::HealthResponse,
            handlers::upload::ClearResponse,
        )
    ),
    tags(
        (name = "Sistema", description = "Saúde do serviço"),
        (name = "Análise", description = "Upload do CSV e descarte da análise"),
        (name = "Resultados", description = "Visões calculadas sobre a última análise"),
        (name = "Exportação", description = "Tabelas para planilha")
    )
)]
pub struct ApiDoc;
