use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use log::debug;
use std::sync::Arc;

use autoclaim_core::assessment::{NewSavedReport, ReportRepositoryTrait, SavedReport};
use autoclaim_core::errors::{DatabaseError, Error, Result};

use super::model::SavedReportDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::saved_reports;
use crate::schema::saved_reports::dsl::*;

/// Repository for saved reports. Rows are written once and never updated.
pub struct ReportRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl ReportRepository {
    pub fn new(pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl ReportRepositoryTrait for ReportRepository {
    async fn create(&self, new_report: NewSavedReport) -> Result<SavedReport> {
        new_report.validate()?;
        let report_db = SavedReportDB::try_from(new_report)?;

        self.writer
            .exec(move |conn| {
                diesel::insert_into(saved_reports::table)
                    .values(&report_db)
                    .execute(conn)
                    .into_core()?;
                debug!(
                    "Saved report {} for account {}",
                    report_db.id, report_db.account_id
                );
                SavedReport::try_from(report_db)
            })
            .await
    }

    fn get_by_id(&self, report_id: &str) -> Result<SavedReport> {
        let mut conn = get_connection(&self.pool)?;

        let report = saved_reports
            .select(SavedReportDB::as_select())
            .find(report_id)
            .first::<SavedReportDB>(&mut conn)
            .optional()
            .into_core()?
            .ok_or_else(|| {
                Error::Database(DatabaseError::NotFound(format!(
                    "Report {} not found",
                    report_id
                )))
            })?;

        SavedReport::try_from(report)
    }

    fn list_by_account(&self, account_id_param: &str) -> Result<Vec<SavedReport>> {
        let mut conn = get_connection(&self.pool)?;

        saved_reports
            .select(SavedReportDB::as_select())
            .filter(account_id.eq(account_id_param))
            .order((created_at.desc(), id.desc()))
            .load::<SavedReportDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(SavedReport::try_from)
            .collect()
    }
}
