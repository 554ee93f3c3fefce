//! Report module - paginated document composition for exports.

mod document;
mod layout;
mod paginator;
mod report_errors;
mod snapshot;


pub use document::{
    report_file_name, Align, BlockKind, DrawOp, Page, PlacedBlock, ReportDocument, Rgb, TextStyle,
};
pub use layout::{fit_text, text_width, wrap_text, PageLayout, MM_PER_PT};
pub use paginator::{LayoutCursor, ReportPaginator};
pub use report_errors::RenderError;
pub use snapshot::RasterImage;
