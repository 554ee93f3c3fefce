//! SQLite storage for saved reports.

mod model;
mod repository;

pub use model::SavedReportDB;
pub use repository::ReportRepository;
