//! Assessment provider, repository and service traits.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use super::assessment_model::{ImagePayload, NewSavedReport, SavedReport};
use crate::errors::Result;

/// The external damage analysis service.
///
/// Given an image, returns a JSON payload in the provider's response schema
/// or fails with `Error::AnalysisProvider`. The payload is untrusted and goes
/// through the normalizer before anything else sees it.
#[async_trait]
pub trait DamageAnalysisProvider: Send + Sync {
    async fn analyze(&self, image: &ImagePayload) -> Result<Value>;
}

/// Persistence of saved reports. Reports are immutable once written.
#[async_trait]
pub trait ReportRepositoryTrait: Send + Sync {
    /// Stores a new report.
    async fn create(&self, new_report: NewSavedReport) -> Result<SavedReport>;

    /// Retrieves a report by its id.
    fn get_by_id(&self, report_id: &str) -> Result<SavedReport>;

    /// Lists the reports of an account, newest first.
    fn list_by_account(&self, account_id: &str) -> Result<Vec<SavedReport>>;
}

/// Orchestrates one analysis: reserve a credit, call the provider, normalize
/// and persist, refunding the credit on any failure.
#[async_trait]
pub trait AssessmentServiceTrait: Send + Sync {
    async fn run_assessment(&self, account_id: &str, image: ImagePayload) -> Result<SavedReport>;

    /// Like `run_assessment`, but gives up with `Error::Cancelled` as soon as
    /// `cancel` resolves.
    async fn run_assessment_cancellable(
        &self,
        account_id: &str,
        image: ImagePayload,
        cancel: BoxFuture<'static, ()>,
    ) -> Result<SavedReport>;

    fn get_report(&self, report_id: &str) -> Result<SavedReport>;

    fn list_reports(&self, account_id: &str) -> Result<Vec<SavedReport>>;
}
