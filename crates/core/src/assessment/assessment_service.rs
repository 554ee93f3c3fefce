use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::{self, BoxFuture};
use log::{debug, error, info, warn};
use uuid::Uuid;

use super::assessment_model::{ImagePayload, NewSavedReport, SavedReport};
use super::assessment_traits::{
    AssessmentServiceTrait, DamageAnalysisProvider, ReportRepositoryTrait,
};
use super::normalizer::normalize_with;
use crate::credits::CreditLedgerTrait;
use crate::errors::{Error, Result, ValidationError};

/// Only PNG snapshots can be embedded when a report is exported.
const SNAPSHOT_MIME_TYPE: &str = "image/png";

/// Service running analyses against the credit ledger.
pub struct AssessmentService {
    ledger: Arc<dyn CreditLedgerTrait>,
    provider: Arc<dyn DamageAnalysisProvider>,
    reports: Arc<dyn ReportRepositoryTrait>,
}

impl AssessmentService {
    pub fn new(
        ledger: Arc<dyn CreditLedgerTrait>,
        provider: Arc<dyn DamageAnalysisProvider>,
        reports: Arc<dyn ReportRepositoryTrait>,
    ) -> Self {
        Self {
            ledger,
            provider,
            reports,
        }
    }

    async fn analyze_and_store(
        &self,
        account_id: &str,
        image: &ImagePayload,
        cancel: BoxFuture<'static, ()>,
    ) -> Result<SavedReport> {
        let raw = tokio::select! {
            biased;
            _ = cancel => return Err(Error::Cancelled),
            raw = self.provider.analyze(image) => raw?,
        };

        // Every run is a new report, whatever id the provider echoed back.
        let assessment = normalize_with(&raw, Uuid::new_v4().to_string(), Utc::now())?;
        debug!(
            "Assessment {} normalized with total {}",
            assessment.id, assessment.total_estimated_cost
        );

        self.reports
            .create(NewSavedReport {
                account_id: account_id.to_string(),
                image_ref: image.to_data_url(),
                assessment,
            })
            .await
    }

    async fn refund_after_failure(&self, account_id: &str, cause: &Error) {
        match cause {
            Error::Cancelled => info!("Assessment for {} cancelled, refunding", account_id),
            Error::Assessment(e) => warn!("Assessment for {} rejected: {}", account_id, e),
            other => warn!("Assessment for {} failed: {}", account_id, other),
        }
        if let Err(e) = self.ledger.refund(account_id).await {
            error!(
                "Failed to refund reserved credit for {}: {}",
                account_id, e
            );
        }
    }
}

#[async_trait]
impl AssessmentServiceTrait for AssessmentService {
    async fn run_assessment(&self, account_id: &str, image: ImagePayload) -> Result<SavedReport> {
        self.run_assessment_cancellable(account_id, image, Box::pin(future::pending::<()>()))
            .await
    }

    async fn run_assessment_cancellable(
        &self,
        account_id: &str,
        image: ImagePayload,
        cancel: BoxFuture<'static, ()>,
    ) -> Result<SavedReport> {
        if image.mime_type != SNAPSHOT_MIME_TYPE {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unsupported image type {}: only PNG snapshots can be assessed",
                image.mime_type
            ))));
        }

        let reservation = self.ledger.reserve(account_id).await?;
        debug!(
            "Reserved a credit for {} ({} left)",
            account_id, reservation.remaining
        );
        let mut guard = ReservationGuard::new(self.ledger.clone(), account_id);

        let outcome = self.analyze_and_store(account_id, &image, cancel).await;

        match outcome {
            Ok(report) => {
                guard.disarm();
                info!(
                    "Saved report {} for {} with {} finding(s)",
                    report.id(),
                    account_id,
                    report.assessment.damages.len()
                );
                Ok(report)
            }
            Err(err) => {
                self.refund_after_failure(account_id, &err).await;
                guard.disarm();
                Err(err)
            }
        }
    }

    fn get_report(&self, report_id: &str) -> Result<SavedReport> {
        self.reports.get_by_id(report_id)
    }

    fn list_reports(&self, account_id: &str) -> Result<Vec<SavedReport>> {
        self.reports.list_by_account(account_id)
    }
}

/// Refunds a reservation whose assessment future was dropped before it
/// finished.
struct ReservationGuard {
    ledger: Arc<dyn CreditLedgerTrait>,
    account_id: String,
    armed: bool,
}

impl ReservationGuard {
    fn new(ledger: Arc<dyn CreditLedgerTrait>, account_id: &str) -> Self {
        Self {
            ledger,
            account_id: account_id.to_string(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ReservationGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let ledger = self.ledger.clone();
        let account_id = std::mem::take(&mut self.account_id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("Assessment for {} abandoned, refunding", account_id);
                handle.spawn(async move {
                    if let Err(e) = ledger.refund(&account_id).await {
                        error!("Failed to refund abandoned reservation for {}: {}", account_id, e);
                    }
                });
            }
            Err(_) => error!(
                "Assessment for {} abandoned outside a runtime; reserved credit not refunded",
                account_id
            ),
        }
    }
}
