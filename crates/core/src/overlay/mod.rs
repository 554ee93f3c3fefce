//! Overlay module - image-relative damage rectangles and hover state.

mod overlay_mapper;
mod overlay_model;

pub use overlay_mapper::{map_overlays, overlay_for, stacking, OverlaySelection};
pub use overlay_model::{OverlayRect, PixelRect, SeverityStyle, StackedOverlay};
