//! Database model for saved reports.

use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use rust_decimal::Decimal;

use autoclaim_core::assessment::{AssessmentResult, DamageFinding, NewSavedReport, SavedReport};
use autoclaim_core::errors::{DatabaseError, Error, Result};

/// Findings are stored as one JSON document; the total as decimal text so it
/// reads back exactly.
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::saved_reports)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SavedReportDB {
    pub id: String,
    pub account_id: String,
    pub image_ref: String,
    pub vehicle_type: String,
    pub summary: String,
    pub confidence_score: f64,
    pub total_estimated_cost: String,
    pub damages_json: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<NewSavedReport> for SavedReportDB {
    type Error = Error;

    fn try_from(domain: NewSavedReport) -> Result<Self> {
        let assessment = domain.assessment;
        Ok(Self {
            id: assessment.id,
            account_id: domain.account_id,
            image_ref: domain.image_ref,
            vehicle_type: assessment.vehicle_type,
            summary: assessment.summary,
            confidence_score: assessment.confidence_score,
            total_estimated_cost: assessment.total_estimated_cost.to_string(),
            damages_json: serde_json::to_string(&assessment.damages)?,
            created_at: assessment.created_at.naive_utc(),
        })
    }
}

impl TryFrom<SavedReportDB> for SavedReport {
    type Error = Error;

    fn try_from(db: SavedReportDB) -> Result<Self> {
        let damages: Vec<DamageFinding> = serde_json::from_str(&db.damages_json).map_err(|e| {
            Error::Database(DatabaseError::Internal(format!(
                "Stored findings of report {} are unreadable: {}",
                db.id, e
            )))
        })?;
        let total_estimated_cost = Decimal::from_str(&db.total_estimated_cost)?;

        Ok(Self {
            account_id: db.account_id,
            image_ref: db.image_ref,
            assessment: AssessmentResult {
                id: db.id,
                vehicle_type: db.vehicle_type,
                damages,
                total_estimated_cost,
                summary: db.summary,
                confidence_score: db.confidence_score,
                created_at: db.created_at.and_utc(),
            },
        })
    }
}
