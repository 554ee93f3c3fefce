use serde::{Deserialize, Serialize};

use crate::assessment::Severity;
use crate::report::Rgb;

/// A finding's location as percentages of the displayed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayRect {
    pub finding_id: String,
    pub severity: Severity,
    pub top_pct: f64,
    pub left_pct: f64,
    pub height_pct: f64,
    pub width_pct: f64,
}

impl OverlayRect {
    pub fn bottom_pct(&self) -> f64 {
        self.top_pct + self.height_pct
    }

    pub fn right_pct(&self) -> f64 {
        self.left_pct + self.width_pct
    }

    /// Hit test with inclusive edges.
    pub fn contains(&self, x_pct: f64, y_pct: f64) -> bool {
        x_pct >= self.left_pct
            && x_pct <= self.right_pct()
            && y_pct >= self.top_pct
            && y_pct <= self.bottom_pct()
    }

    /// Projects the overlay onto an image of known pixel size.
    pub fn to_pixels(&self, image_width: f64, image_height: f64) -> PixelRect {
        PixelRect {
            x: self.left_pct / 100.0 * image_width,
            y: self.top_pct / 100.0 * image_height,
            width: self.width_pct / 100.0 * image_width,
            height: self.height_pct / 100.0 * image_height,
        }
    }

    pub fn style(&self) -> SeverityStyle {
        SeverityStyle::for_severity(self.severity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// An overlay in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct StackedOverlay<'a> {
    pub overlay: &'a OverlayRect,
    pub z_index: u32,
    pub hovered: bool,
}

impl StackedOverlay<'_> {
    pub fn opacity(&self) -> f32 {
        let style = self.overlay.style();
        if self.hovered {
            style.hovered_opacity
        } else {
            style.idle_opacity
        }
    }
}

/// Colors used to draw an overlay of a given severity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityStyle {
    pub stroke: Rgb,
    pub fill: Rgb,
    pub fill_opacity: f32,
    pub idle_opacity: f32,
    pub hovered_opacity: f32,
}

impl SeverityStyle {
    pub fn for_severity(severity: Severity) -> Self {
        let (color, fill_opacity) = match severity {
            Severity::Low => (Rgb::new(250, 204, 21), 0.2),
            Severity::Medium => (Rgb::new(249, 115, 22), 0.2),
            Severity::High => (Rgb::new(239, 68, 68), 0.2),
            Severity::Critical => (Rgb::new(185, 28, 28), 0.3),
        };
        Self {
            stroke: color,
            fill: color,
            fill_opacity,
            idle_opacity: 0.7,
            hovered_opacity: 1.0,
        }
    }
}
