use log::trace;

use super::overlay_model::{OverlayRect, StackedOverlay};
use crate::assessment::{AssessmentResult, DamageFinding};
use crate::constants::LOCATION_SCALE;

fn to_percent(value: f64) -> f64 {
    value / LOCATION_SCALE * 100.0
}

/// Maps one finding's 0-1000 location onto percentages of the image.
pub fn overlay_for(finding: &DamageFinding) -> OverlayRect {
    let loc = &finding.location;
    OverlayRect {
        finding_id: finding.id.clone(),
        severity: finding.severity,
        top_pct: to_percent(loc.top),
        left_pct: to_percent(loc.left),
        height_pct: to_percent(loc.height()),
        width_pct: to_percent(loc.width()),
    }
}

/// Overlays for every finding, in detection order.
pub fn map_overlays(result: &AssessmentResult) -> Vec<OverlayRect> {
    result.damages.iter().map(overlay_for).collect()
}

/// Which overlay, if any, is under the pointer. At most one is active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlaySelection {
    hovered: Option<String>,
}

impl OverlaySelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn is_hovered(&self, finding_id: &str) -> bool {
        self.hovered.as_deref() == Some(finding_id)
    }

    /// The pointer entered an overlay; it replaces any active one.
    pub fn enter(&mut self, finding_id: &str) {
        self.hovered = Some(finding_id.to_string());
    }

    /// The pointer left an overlay. Leaving an overlay that is not the
    /// active one changes nothing.
    pub fn leave(&mut self, finding_id: &str) {
        if self.is_hovered(finding_id) {
            self.hovered = None;
        }
    }

    /// The pointer left the image entirely.
    pub fn pointer_left(&mut self) {
        self.hovered = None;
    }

    /// Re-evaluates the hover at a pointer position given in image
    /// percentages. The active overlay stays active while the pointer is still
    /// over it; otherwise the topmost overlay under the pointer wins.
    pub fn pointer_moved(&mut self, overlays: &[OverlayRect], x_pct: f64, y_pct: f64) -> Option<&str> {
        let still_inside = self.hovered.as_deref().is_some_and(|id| {
            overlays
                .iter()
                .any(|o| o.finding_id == id && o.contains(x_pct, y_pct))
        });
        if !still_inside {
            self.hovered = overlays
                .iter()
                .rev()
                .find(|o| o.contains(x_pct, y_pct))
                .map(|o| o.finding_id.clone());
            trace!("Overlay hover moved to {:?}", self.hovered);
        }
        self.hovered.as_deref()
    }
}

/// Draw order for the overlays: detection order, with the hovered overlay
/// moved last so it renders above any overlay it intersects.
pub fn stacking<'a>(overlays: &'a [OverlayRect], selection: &OverlaySelection) -> Vec<StackedOverlay<'a>> {
    let (hovered, mut rest): (Vec<&OverlayRect>, Vec<&OverlayRect>) = overlays
        .iter()
        .partition(|o| selection.is_hovered(&o.finding_id));
    rest.extend(hovered);
    rest.into_iter()
        .enumerate()
        .map(|(z, overlay)| StackedOverlay {
            overlay,
            z_index: z as u32,
            hovered: selection.is_hovered(&overlay.finding_id),
        })
        .collect()
}
