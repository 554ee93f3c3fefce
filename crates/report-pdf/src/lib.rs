//! PDF output for AutoClaim reports.
//!
//! `render_pdf` turns a paginated `ReportDocument` into PDF bytes; the
//! exporter ties pagination, rendering and the export file together.

mod encoding;
mod exporter;
mod renderer;

pub use encoding::encode_win_ansi;
pub use exporter::{export_report, ReportExporter};
pub use renderer::render_pdf;
