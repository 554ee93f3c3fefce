//! Assessment module - payload normalization, models, and orchestration.

mod assessment_errors;
mod assessment_model;
mod assessment_service;
mod assessment_traits;
mod normalizer;


pub use assessment_errors::AssessmentError;
pub use assessment_model::{
    AssessmentResult, DamageFinding, DamageType, ImagePayload, Location, NewSavedReport,
    PartKind, PartOption, RepairCosts, SavedReport, Severity,
};
pub use assessment_service::AssessmentService;
pub use assessment_traits::{AssessmentServiceTrait, DamageAnalysisProvider, ReportRepositoryTrait};
pub use normalizer::{normalize, normalize_with};
