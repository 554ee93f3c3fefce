//! Lays an assessment out on fixed-size pages.
//!
//! Every section is built as a self-contained block whose height is known
//! before it is placed. A `LayoutCursor` threads through the writers and
//! starts a new page whenever the next block would cross the bottom margin,
//! so blocks are never split.

use log::{debug, warn};
use rust_decimal::Decimal;

use super::document::{
    Align, BlockKind, DrawOp, Page, PlacedBlock, ReportDocument, Rgb, TextStyle,
};
use super::layout::{fit_text, wrap_text, PageLayout};
use super::snapshot::RasterImage;
use crate::assessment::{AssessmentResult, DamageFinding};
use crate::constants::{REPORT_SUBTITLE, REPORT_TITLE};
use crate::errors::Result;
use crate::fx::{CurrencyCode, CurrencyConverter};
use crate::overlay::overlay_for;

const INK: Rgb = Rgb::new(15, 23, 42);
const MUTED: Rgb = Rgb::new(100, 116, 139);
const META: Rgb = Rgb::new(71, 85, 105);
const BODY: Rgb = Rgb::new(51, 65, 85);
const RULE: Rgb = Rgb::new(226, 232, 240);
const TABLE_BAND: Rgb = Rgb::new(241, 245, 249);
const PANEL: Rgb = Rgb::new(248, 250, 252);
const COST: Rgb = Rgb::new(22, 163, 74);
const TOTAL: Rgb = Rgb::new(37, 99, 235);

const SECTION_HEADING: TextStyle = TextStyle::bold(14.0, INK);
const BODY_TEXT: TextStyle = TextStyle::regular(10.0, BODY);
const DETAIL_TEXT: TextStyle = TextStyle::regular(9.0, BODY);

const SUMMARY_LINE_HEIGHT: f32 = 5.0;
const DETAIL_LINE_HEIGHT: f32 = 5.0;
const DESCRIPTION_LINE_HEIGHT: f32 = 4.0;
/// Descriptions are wrapped this much narrower than the content width.
const DESCRIPTION_INSET: f32 = 40.0;
const SECTION_GAP: f32 = 8.0;

/// A block that has been measured but not yet placed. Draw operations are
/// relative to the block's top edge.
struct BlockDraft {
    kind: BlockKind,
    height: f32,
    ops: Vec<DrawOp>,
}

impl BlockDraft {
    fn new(kind: BlockKind, height: f32) -> Self {
        Self {
            kind,
            height,
            ops: Vec::new(),
        }
    }

    fn text(&mut self, x: f32, y: f32, text: impl Into<String>, style: TextStyle, align: Align) {
        self.ops.push(DrawOp::Text {
            x,
            y,
            text: text.into(),
            style,
            align,
        });
    }

    fn line(&mut self, x1: f32, x2: f32, y: f32, color: Rgb) {
        self.ops.push(DrawOp::Line {
            x1,
            y1: y,
            x2,
            y2: y,
            color,
        });
    }

    fn into_placed(self, top: f32) -> PlacedBlock {
        let ops = self
            .ops
            .into_iter()
            .map(|op| match op {
                DrawOp::Text {
                    x,
                    y,
                    text,
                    style,
                    align,
                } => DrawOp::Text {
                    x,
                    y: y + top,
                    text,
                    style,
                    align,
                },
                DrawOp::Line {
                    x1,
                    y1,
                    x2,
                    y2,
                    color,
                } => DrawOp::Line {
                    x1,
                    y1: y1 + top,
                    x2,
                    y2: y2 + top,
                    color,
                },
                DrawOp::Rect {
                    x,
                    y,
                    width,
                    height,
                    fill,
                    stroke,
                } => DrawOp::Rect {
                    x,
                    y: y + top,
                    width,
                    height,
                    fill,
                    stroke,
                },
                DrawOp::Image {
                    x,
                    y,
                    width,
                    height,
                    image,
                } => DrawOp::Image {
                    x,
                    y: y + top,
                    width,
                    height,
                    image,
                },
            })
            .collect();
        PlacedBlock {
            kind: self.kind,
            top,
            height: self.height,
            ops,
        }
    }
}

/// Vertical write position across a growing list of pages.
pub struct LayoutCursor {
    layout: PageLayout,
    pages: Vec<Page>,
    y: f32,
    force_break: bool,
}

impl LayoutCursor {
    pub fn new(layout: PageLayout) -> Self {
        Self {
            layout,
            pages: vec![Page::default()],
            y: layout.top(),
            force_break: false,
        }
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn page_index(&self) -> usize {
        self.pages.len() - 1
    }

    fn page_is_empty(&self) -> bool {
        self.pages.last().map_or(true, |p| p.blocks.is_empty())
    }

    pub fn fits(&self, height: f32) -> bool {
        self.y + height <= self.layout.bottom_limit()
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = self.layout.top();
        self.force_break = false;
    }

    /// Starts a new page unless `height` still fits on the current one. An
    /// empty page is never abandoned.
    pub fn ensure_room(&mut self, height: f32) {
        if self.page_is_empty() {
            self.y = self.layout.top();
            self.force_break = false;
            return;
        }
        if self.force_break || !self.fits(height) {
            self.new_page();
        }
    }

    pub fn advance(&mut self, dy: f32) {
        self.y += dy;
    }

    fn place(&mut self, draft: BlockDraft) {
        let oversized = draft.height > self.layout.usable_height();
        if oversized {
            warn!(
                "Report block {:?} is {:.1} mm tall, more than a page; placing it on its own page",
                draft.kind, draft.height
            );
        }
        self.ensure_room(draft.height);
        let top = self.y;
        self.y += draft.height;
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(draft.into_placed(top));
        }
        if oversized {
            self.force_break = true;
        }
    }

    pub fn finish(mut self) -> Vec<Page> {
        if self.pages.len() > 1 && self.page_is_empty() {
            self.pages.pop();
        }
        self.pages
    }
}

/// Composes report documents from assessments.
#[derive(Debug, Clone, Default)]
pub struct ReportPaginator {
    converter: CurrencyConverter,
    layout: PageLayout,
}

impl ReportPaginator {
    pub fn new(converter: CurrencyConverter, layout: PageLayout) -> Self {
        Self { converter, layout }
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Lays out a report, decoding the visualizer snapshot from PNG bytes.
    pub fn paginate(
        &self,
        result: &AssessmentResult,
        currency: CurrencyCode,
        snapshot_png: &[u8],
    ) -> Result<ReportDocument> {
        let image = RasterImage::from_png(snapshot_png)?;
        self.paginate_with_image(result, currency, Some(&image))
    }

    /// Lays out a report. Without an image the snapshot section is omitted.
    pub fn paginate_with_image(
        &self,
        result: &AssessmentResult,
        currency: CurrencyCode,
        image: Option<&RasterImage>,
    ) -> Result<ReportDocument> {
        let money = |amount: Decimal| self.converter.to_display(amount, currency);

        let mut cursor = LayoutCursor::new(self.layout);
        let mut images = Vec::new();

        cursor.place(self.title_block());
        cursor.advance(4.0);
        cursor.place(self.metadata_block(result, currency));
        cursor.advance(SECTION_GAP);
        cursor.place(self.summary_block(&result.summary));
        cursor.advance(SECTION_GAP);

        if let Some(image) = image {
            images.push(image.clone());
            cursor.place(self.snapshot_block(image, images.len() - 1, &result.damages));
            cursor.advance(SECTION_GAP);
        }

        let rows = result
            .damages
            .iter()
            .map(|finding| self.finding_block(finding, &money))
            .collect::<Result<Vec<_>>>()?;

        let heading = self.table_heading_block(rows.is_empty());
        // The heading travels with the first row.
        let first_row_height = rows.first().map_or(0.0, |r| r.height);
        cursor.ensure_room(heading.height + first_row_height);
        cursor.place(heading);
        for row in rows {
            cursor.place(row);
        }

        cursor.advance(5.0);
        cursor.place(self.totals_block(&money(result.total_estimated_cost)?));

        let pages = cursor.finish();
        debug!(
            "Paginated report {} onto {} page(s) in {}",
            result.id,
            pages.len(),
            currency
        );

        Ok(ReportDocument {
            report_id: result.id.clone(),
            currency,
            layout: self.layout,
            pages,
            images,
        })
    }

    fn title_block(&self) -> BlockDraft {
        let l = &self.layout;
        let mut block = BlockDraft::new(BlockKind::Title, 26.0);
        block.text(l.margin, 8.0, REPORT_TITLE, TextStyle::bold(22.0, INK), Align::Left);
        block.text(
            l.margin,
            16.0,
            REPORT_SUBTITLE,
            TextStyle::regular(12.0, MUTED),
            Align::Left,
        );
        block.line(l.margin, l.right_edge(), 24.0, RULE);
        block
    }

    fn metadata_block(&self, result: &AssessmentResult, currency: CurrencyCode) -> BlockDraft {
        let l = &self.layout;
        let style = TextStyle::regular(10.0, META);
        let mut block = BlockDraft::new(BlockKind::Metadata, 7.0);
        block.text(
            l.margin,
            5.0,
            format!("Date: {}", result.created_at.format("%Y-%m-%d")),
            style,
            Align::Left,
        );
        block.text(
            l.margin + 55.0,
            5.0,
            fit_text(
                &format!("Vehicle Type: {}", result.vehicle_type),
                78.0,
                style.size_pt,
                false,
            ),
            style,
            Align::Left,
        );
        block.text(
            l.margin + 140.0,
            5.0,
            format!("Currency: {}", currency),
            style,
            Align::Left,
        );
        block
    }

    fn summary_block(&self, summary: &str) -> BlockDraft {
        let l = &self.layout;
        let lines = wrap_text(summary, l.content_width(), BODY_TEXT.size_pt, false);
        let height = 10.0 + lines.len() as f32 * SUMMARY_LINE_HEIGHT;
        let mut block = BlockDraft::new(BlockKind::Summary, height);
        block.text(l.margin, 6.0, "Assessment Summary", SECTION_HEADING, Align::Left);
        for (i, line) in lines.into_iter().enumerate() {
            block.text(
                l.margin,
                13.0 + i as f32 * SUMMARY_LINE_HEIGHT,
                line,
                BODY_TEXT,
                Align::Left,
            );
        }
        block
    }

    /// Scales the snapshot to the content width, shrinking it further when it
    /// would not fit on a single page. Each finding's box is outlined on top
    /// of the image in its severity colour.
    fn snapshot_block(
        &self,
        image: &RasterImage,
        index: usize,
        damages: &[DamageFinding],
    ) -> BlockDraft {
        let l = &self.layout;
        let heading_height = 10.0;
        let padding = 2.0;
        let max_image_height = l.usable_height() - heading_height - padding;

        let mut width = l.content_width();
        let mut height = width * image.aspect_ratio();
        if height > max_image_height {
            height = max_image_height;
            width = height / image.aspect_ratio();
        }

        let mut block = BlockDraft::new(BlockKind::Snapshot, heading_height + height + padding);
        block.text(l.margin, 6.0, "Damage Localization", SECTION_HEADING, Align::Left);
        let image_x = l.margin + (l.content_width() - width) / 2.0;
        block.ops.push(DrawOp::Image {
            x: image_x,
            y: heading_height,
            width,
            height,
            image: index,
        });
        for finding in damages {
            let overlay = overlay_for(finding);
            let rect = overlay.to_pixels(f64::from(width), f64::from(height));
            block.ops.push(DrawOp::Rect {
                x: image_x + rect.x as f32,
                y: heading_height + rect.y as f32,
                width: rect.width as f32,
                height: rect.height as f32,
                fill: None,
                stroke: Some(overlay.style().stroke),
            });
        }
        block
    }

    fn table_heading_block(&self, empty: bool) -> BlockDraft {
        let l = &self.layout;
        let header = TextStyle::bold(10.0, INK);
        let mut block = BlockDraft::new(BlockKind::TableHeading, if empty { 27.0 } else { 21.0 });
        block.text(l.margin, 6.0, "Detailed Damage Analysis", SECTION_HEADING, Align::Left);
        block.ops.push(DrawOp::Rect {
            x: l.margin,
            y: 10.0,
            width: l.content_width(),
            height: 8.0,
            fill: Some(TABLE_BAND),
            stroke: None,
        });
        block.text(l.margin + 2.0, 15.5, "Type / Severity", header, Align::Left);
        block.text(l.right_edge() - 2.0, 15.5, "Cost Est.", header, Align::Right);
        if empty {
            block.text(
                l.margin + 2.0,
                24.0,
                "No damage was detected.",
                TextStyle::regular(10.0, MUTED),
                Align::Left,
            );
        }
        block
    }

    fn finding_block<F>(&self, finding: &DamageFinding, money: &F) -> Result<BlockDraft>
    where
        F: Fn(Decimal) -> std::result::Result<String, crate::fx::FxError>,
    {
        let l = &self.layout;
        let costs = &finding.repair_costs;
        let mut description = wrap_text(
            &finding.description,
            l.content_width() - DESCRIPTION_INSET,
            DETAIL_TEXT.size_pt,
            false,
        );

        let parts_end = 15.0 + costs.parts.len() as f32 * DETAIL_LINE_HEIGHT;
        let description_start = parts_end + DETAIL_LINE_HEIGHT;

        // A row never outgrows a page: cut the description and mark the cut.
        let max_lines = ((l.usable_height() - description_start - 2.0) / DESCRIPTION_LINE_HEIGHT)
            .floor()
            .max(1.0) as usize;
        if description.len() > max_lines {
            warn!(
                "Description of finding {} needs {} lines, truncating to {}",
                finding.id,
                description.len(),
                max_lines
            );
            description.truncate(max_lines - 1);
            description.push("...".to_string());
        }
        let height = description_start + description.len() as f32 * DESCRIPTION_LINE_HEIGHT + 2.0;

        let mut block = BlockDraft::new(
            BlockKind::FindingRow {
                finding_id: finding.id.clone(),
            },
            height,
        );
        block.text(
            l.margin + 2.0,
            5.0,
            format!("{} ({})", finding.damage_type, finding.severity),
            TextStyle::bold(11.0, INK),
            Align::Left,
        );
        block.text(
            l.right_edge() - 2.0,
            5.0,
            money(finding.estimated_cost)?,
            TextStyle::bold(11.0, COST),
            Align::Right,
        );
        block.text(
            l.margin + 10.0,
            10.0,
            format!("Labor: {}", money(costs.labor)?),
            DETAIL_TEXT,
            Align::Left,
        );
        block.text(l.margin + 10.0, 15.0, "Parts Options:", DETAIL_TEXT, Align::Left);
        for (i, option) in costs.parts.iter().enumerate() {
            let mut line = format!("- {}: {}", option.kind.report_label(), money(option.price)?);
            if let Some(availability) = &option.availability {
                line.push_str(&format!(" ({})", availability));
            }
            if i == costs.best_option_index {
                line.push_str("  [best option]");
            }
            block.text(
                l.margin + 15.0,
                15.0 + (i + 1) as f32 * DETAIL_LINE_HEIGHT,
                line,
                TextStyle::regular(9.0, META),
                Align::Left,
            );
        }
        for (i, line) in description.into_iter().enumerate() {
            block.text(
                l.margin + 2.0,
                description_start + i as f32 * DESCRIPTION_LINE_HEIGHT,
                line,
                TextStyle::regular(9.0, MUTED),
                Align::Left,
            );
        }
        block.line(l.margin, l.right_edge(), height - 0.5, TABLE_BAND);
        Ok(block)
    }

    fn totals_block(&self, total: &str) -> BlockDraft {
        let l = &self.layout;
        let mut block = BlockDraft::new(BlockKind::Totals, 20.0);
        block.ops.push(DrawOp::Rect {
            x: l.margin,
            y: 0.0,
            width: l.content_width(),
            height: 20.0,
            fill: Some(PANEL),
            stroke: Some(RULE),
        });
        block.text(
            l.margin + 5.0,
            12.0,
            "Total Estimated Repair Cost",
            TextStyle::bold(12.0, INK),
            Align::Left,
        );
        block.text(
            l.right_edge() - 5.0,
            12.5,
            total,
            TextStyle::bold(16.0, TOTAL),
            Align::Right,
        );
        block
    }
}
