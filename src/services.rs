pub mod analysis_service;
pub mod collections_service;
pub mod compliance_service;
pub mod dashboard_service;
pub mod export_service;
pub mod normalizer_service;
pub mod plan_builder_service;
pub mod quality_service;
pub mod term_parser_service;
