//! Paginated report document model.
//!
//! Coordinates are millimetres measured from the top-left corner of the
//! page. Text positions are baselines.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::layout::PageLayout;
use super::snapshot::RasterImage;
use crate::constants::REPORT_FILE_PREFIX;
use crate::fx::CurrencyCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components scaled to the 0-1 range.
    pub fn unit(&self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextStyle {
    pub size_pt: f32,
    pub color: Rgb,
    pub bold: bool,
}

impl TextStyle {
    pub const fn regular(size_pt: f32, color: Rgb) -> Self {
        Self {
            size_pt,
            color,
            bold: false,
        }
    }

    pub const fn bold(size_pt: f32, color: Rgb) -> Self {
        Self {
            size_pt,
            color,
            bold: true,
        }
    }
}

/// Horizontal anchoring of a text run. For `Right` the x coordinate is the
/// right edge of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Align {
    Left,
    Right,
}

/// One primitive drawing instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        text: String,
        style: TextStyle,
        align: Align,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: Rgb,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
    },
    /// Draws `ReportDocument::images[image]` into the rectangle.
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BlockKind {
    Title,
    Metadata,
    Summary,
    Snapshot,
    TableHeading,
    FindingRow { finding_id: String },
    Totals,
}

/// An atomic block placed on a page. Blocks never straddle pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedBlock {
    pub kind: BlockKind,
    /// Cursor position the block was placed at.
    pub top: f32,
    pub height: f32,
    pub ops: Vec<DrawOp>,
}

impl PlacedBlock {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Concatenated text of the block, in draw order.
    pub fn text(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub blocks: Vec<PlacedBlock>,
}

/// A report laid out on fixed-size pages, ready to be rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub report_id: String,
    pub currency: CurrencyCode,
    pub layout: PageLayout,
    pub pages: Vec<Page>,
    #[serde(skip)]
    pub images: Vec<RasterImage>,
}

impl ReportDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every block with the zero-based index of its page.
    pub fn blocks(&self) -> impl Iterator<Item = (usize, &PlacedBlock)> {
        self.pages
            .iter()
            .enumerate()
            .flat_map(|(i, page)| page.blocks.iter().map(move |b| (i, b)))
    }

    /// Page index and block of the first block of the given kind.
    pub fn find_block(&self, kind: &BlockKind) -> Option<(usize, &PlacedBlock)> {
        self.blocks().find(|(_, b)| &b.kind == kind)
    }
}

/// File name of an exported report, derived from the export time.
pub fn report_file_name(exported_at: DateTime<Utc>) -> String {
    format!(
        "{}_{}.pdf",
        REPORT_FILE_PREFIX,
        exported_at.timestamp_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_report_file_name_uses_millis() {
        let at = Utc.timestamp_millis_opt(1_710_408_600_123).unwrap();
        assert_eq!(report_file_name(at), "AutoClaim_Report_1710408600123.pdf");
    }

    #[test]
    fn test_rgb_unit() {
        assert_eq!(Rgb::new(255, 0, 51).unit(), [1.0, 0.0, 0.2]);
    }
}
