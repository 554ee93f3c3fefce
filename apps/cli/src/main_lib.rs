use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use autoclaim_core::assessment::{AssessmentService, DamageAnalysisProvider};
use autoclaim_core::fx::CurrencyConverter;
use autoclaim_report_pdf::ReportExporter;
use autoclaim_storage_sqlite::{
    db::{self, write_actor},
    CreditRepository, ReportRepository,
};

use crate::config::Config;

pub struct AppState {
    pub ledger: Arc<CreditRepository>,
    pub reports: Arc<ReportRepository>,
    pub converter: CurrencyConverter,
    pub exporter: ReportExporter,
    pub export_dir: PathBuf,
    pub db_path: String,
}

impl AppState {
    /// Wires an assessment service around the given analysis provider.
    pub fn assessment_service(&self, provider: Arc<dyn DamageAnalysisProvider>) -> AssessmentService {
        AssessmentService::new(self.ledger.clone(), provider, self.reports.clone())
    }
}

pub fn init_tracing() {
    let log_format = std::env::var("AUTOCLAIM_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // Output goes to stderr so command output on stdout stays clean.
    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    // Keep DATABASE_URL aligned with AUTOCLAIM_DB_PATH so storage opens the right file
    std::env::set_var("DATABASE_URL", &config.db_path);
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = write_actor::spawn_writer((*pool).clone());

    let ledger = Arc::new(
        CreditRepository::new(pool.clone(), writer.clone())
            .with_starting_credits(config.starting_credits),
    );
    let reports = Arc::new(ReportRepository::new(pool.clone(), writer));

    Ok(AppState {
        ledger,
        reports,
        converter: CurrencyConverter::default(),
        exporter: ReportExporter::default(),
        export_dir: PathBuf::from(&config.export_dir),
        db_path,
    })
}
