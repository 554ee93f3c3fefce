use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{error, info};

use autoclaim_core::assessment::{ImagePayload, SavedReport};
use autoclaim_core::fx::CurrencyCode;
use autoclaim_core::report::{report_file_name, RenderError, ReportDocument, ReportPaginator};
use autoclaim_core::Result;

use crate::renderer::render_pdf;

/// Renders `document` and writes it into `dir` under the timestamped report
/// file name. Returns the path of the written file.
pub fn export_report(document: &ReportDocument, dir: &Path, exported_at: DateTime<Utc>) -> Result<PathBuf> {
    let bytes = render_pdf(document)?;

    fs::create_dir_all(dir).map_err(|e| {
        error!("Failed to create export directory {}: {}", dir.display(), e);
        RenderError::WriteFailed(e.to_string())
    })?;

    let path = dir.join(report_file_name(exported_at));
    fs::write(&path, &bytes).map_err(|e| {
        error!("Failed to write report {}: {}", path.display(), e);
        RenderError::WriteFailed(e.to_string())
    })?;

    info!(
        "Exported report {} to {} ({} pages)",
        document.report_id,
        path.display(),
        document.page_count()
    );
    Ok(path)
}

/// Turns saved reports into PDF files.
#[derive(Debug, Clone, Default)]
pub struct ReportExporter {
    paginator: ReportPaginator,
}

impl ReportExporter {
    pub fn new(paginator: ReportPaginator) -> Self {
        Self { paginator }
    }

    /// Lays out a saved report with its embedded snapshot.
    pub fn paginate(&self, report: &SavedReport, currency: CurrencyCode) -> Result<ReportDocument> {
        let image = ImagePayload::from_data_url(&report.image_ref)
            .map_err(|e| RenderError::UnreadableSnapshot(e.to_string()))?;
        self.paginator
            .paginate(&report.assessment, currency, &image.bytes)
    }

    pub fn render(&self, report: &SavedReport, currency: CurrencyCode) -> Result<Vec<u8>> {
        render_pdf(&self.paginate(report, currency)?)
    }

    pub fn export(
        &self,
        report: &SavedReport,
        currency: CurrencyCode,
        dir: &Path,
        exported_at: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let document = self.paginate(report, currency)?;
        export_report(&document, dir, exported_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoclaim_core::assessment::AssessmentResult;
    use autoclaim_core::Error;
    use chrono::TimeZone;
    use lopdf::Document;
    use rust_decimal::Decimal;
    use tempfile::tempdir;

    /// Wide enough that the snapshot leaves room for the rest of the report
    /// on the first page.
    fn png_bytes() -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, 8, 2);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&[90; 48]).unwrap();
        }
        out
    }

    fn saved_report(image_ref: String) -> SavedReport {
        SavedReport {
            account_id: "acc-1".to_string(),
            image_ref,
            assessment: AssessmentResult {
                id: "report-1".to_string(),
                vehicle_type: "Suzuki Mehran".to_string(),
                damages: vec![],
                total_estimated_cost: Decimal::ZERO,
                summary: "No visible damage.".to_string(),
                confidence_score: 1.0,
                created_at: Utc.with_ymd_and_hms(2025, 1, 5, 8, 0, 0).unwrap(),
            },
        }
    }

    fn exported_at() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_736_064_000_000).unwrap()
    }

    #[test]
    fn test_export_writes_timestamped_file() {
        let dir = tempdir().unwrap();
        let report = saved_report(ImagePayload::new(png_bytes(), "image/png").to_data_url());

        let path = ReportExporter::default()
            .export(&report, CurrencyCode::Pkr, dir.path(), exported_at())
            .unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "AutoClaim_Report_1736064000000.pdf"
        );
        let document = ReportExporter::default()
            .paginate(&report, CurrencyCode::Pkr)
            .unwrap();
        let pdf = Document::load(&path).unwrap();
        assert_eq!(document.page_count(), 1);
        assert_eq!(pdf.get_pages().len(), 1);
    }

    #[test]
    fn test_export_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("exports").join("2025");
        let report = saved_report(ImagePayload::new(png_bytes(), "image/png").to_data_url());
        let document = ReportExporter::default()
            .paginate(&report, CurrencyCode::Usd)
            .unwrap();

        let path = export_report(&document, &target, exported_at()).unwrap();
        assert!(path.starts_with(&target));
        assert!(path.exists());
    }

    #[test]
    fn test_unreadable_image_ref_is_render_failure() {
        let report = saved_report("https://example.invalid/car.png".to_string());
        let err = ReportExporter::default()
            .render(&report, CurrencyCode::Pkr)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Render(RenderError::UnreadableSnapshot(_))
        ));
        assert_eq!(err.user_message(), "Export failed, please retry export.");
    }

    #[test]
    fn test_unwritable_directory_is_render_failure() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();
        let report = saved_report(ImagePayload::new(png_bytes(), "image/png").to_data_url());
        let document = ReportExporter::default()
            .paginate(&report, CurrencyCode::Pkr)
            .unwrap();

        let err = export_report(&document, &blocker, exported_at()).unwrap_err();
        assert!(matches!(err, Error::Render(RenderError::WriteFailed(_))));
    }
}
