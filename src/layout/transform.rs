//! # Coordinate Transform
//!
//! Field boxes are stored against a fixed canonical page raster of
//! 1240×1754 pixels (A4 at 150 DPI). Every surface draws them through a
//! single scalar factor:
//!
//! ```text
//! canonical (1240 × 1754) ──× scale──▶ surface
//!
//!   interactive zoom   0.3 ..= 2.5
//!   print              0.64  (1240 px → ~794 px, A4 width at 96 DPI)
//! ```
//!
//! The transform itself never clamps; zoom clamping is the caller's job
//! ([`clamp_zoom`]).

use serde::{Deserialize, Serialize};

use crate::field::FieldBox;

/// Canonical page image width in pixels.
pub const CANONICAL_WIDTH: f64 = 1240.0;

/// Canonical page image height in pixels.
pub const CANONICAL_HEIGHT: f64 = 1754.0;

/// Fixed scale for print output.
pub const PRINT_SCALE: f64 = 0.64;

/// Smallest interactive zoom.
pub const MIN_ZOOM: f64 = 0.3;

/// Largest interactive zoom.
pub const MAX_ZOOM: f64 = 2.5;

/// Zoom increment for zoom in/out controls.
pub const ZOOM_STEP: f64 = 0.1;

/// A box on a rendered surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Map back to canonical page space.
    pub fn to_canonical(&self, scale: f64) -> FieldBox {
        FieldBox {
            x: self.left / scale,
            y: self.top / scale,
            width: self.width / scale,
            height: self.height / scale,
        }
    }

    /// Snap edges to whole pixels for crisp borders.
    ///
    /// Edges are rounded independently so each one stays within 0.5 px of the
    /// ideal position and sizes within 1 px, without accumulating drift.
    pub fn snapped(&self) -> ScreenRect {
        let left = self.left.round();
        let top = self.top.round();
        ScreenRect {
            left,
            top,
            width: self.right().round() - left,
            height: self.bottom().round() - top,
        }
    }

    /// Point-in-rect test (half-open on the right/bottom edges).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }
}

/// Map a canonical field box onto a surface drawn at `scale`.
pub fn transform(rect: &FieldBox, scale: f64) -> ScreenRect {
    ScreenRect {
        left: rect.x * scale,
        top: rect.y * scale,
        width: rect.width * scale,
        height: rect.height * scale,
    }
}

/// Size of the whole page at `scale`.
pub fn page_size(scale: f64) -> (f64, f64) {
    (CANONICAL_WIDTH * scale, CANONICAL_HEIGHT * scale)
}

/// Clamp an interactive zoom level to the supported range.
///
/// Non-finite input resets to 1.0.
pub fn clamp_zoom(zoom: f64) -> f64 {
    if !zoom.is_finite() {
        return 1.0;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Next zoom level up, rounded to the step grid.
pub fn zoom_in(zoom: f64) -> f64 {
    clamp_zoom(((zoom + ZOOM_STEP) * 10.0).round() / 10.0)
}

/// Next zoom level down, rounded to the step grid.
pub fn zoom_out(zoom: f64) -> f64 {
    clamp_zoom(((zoom - ZOOM_STEP) * 10.0).round() / 10.0)
}

/// `object-fit: contain` placement of an `image_w × image_h` image in `rect`.
///
/// The image is scaled to fit entirely inside the box, aspect ratio kept,
/// and centered on the free axis. Degenerate image sizes fill the box.
pub fn contain(rect: &ScreenRect, image_w: f64, image_h: f64) -> ScreenRect {
    if image_w <= 0.0 || image_h <= 0.0 || rect.width <= 0.0 || rect.height <= 0.0 {
        return *rect;
    }
    let factor = (rect.width / image_w).min(rect.height / image_h);
    let width = image_w * factor;
    let height = image_h * factor;
    ScreenRect {
        left: rect.left + (rect.width - width) / 2.0,
        top: rect.top + (rect.height - height) / 2.0,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zoom_levels() -> impl Iterator<Item = f64> {
        (0..=44).map(|i| MIN_ZOOM + i as f64 * 0.05)
    }

    #[test]
    fn test_transform_scales_all_components() {
        let rect = transform(&FieldBox::new(100.0, 200.0, 50.0, 20.0), 0.5);
        assert_eq!(rect, ScreenRect::new(50.0, 100.0, 25.0, 10.0));
    }

    #[test]
    fn test_transform_does_not_clamp() {
        let rect = transform(&FieldBox::new(10.0, 10.0, 10.0, 10.0), 10.0);
        assert_eq!(rect.left, 100.0);
    }

    #[test]
    fn test_inverse_round_trip_within_one_unit() {
        let original = FieldBox::new(123.0, 987.0, 311.0, 47.0);
        for scale in zoom_levels() {
            let back = transform(&original, scale).snapped().to_canonical(scale);
            assert!((back.x - original.x).abs() <= 1.0 / scale, "x at {}", scale);
            assert!((back.y - original.y).abs() <= 1.0 / scale, "y at {}", scale);
            // Unsnapped inverse is exact up to float error
            let exact = transform(&original, scale).to_canonical(scale);
            assert!((exact.x - original.x).abs() < 1.0);
            assert!((exact.width - original.width).abs() < 1.0);
            assert!((exact.height - original.height).abs() < 1.0);
        }
    }

    #[test]
    fn test_snapped_drift_under_one_pixel() {
        let boxes = [
            FieldBox::new(0.0, 0.0, 1240.0, 1754.0),
            FieldBox::new(333.0, 77.0, 13.0, 9.0),
            FieldBox::new(1.0, 1.0, 1.0, 1.0),
        ];
        for scale in zoom_levels().chain([PRINT_SCALE]) {
            for field_box in &boxes {
                let ideal = transform(field_box, scale);
                let snapped = ideal.snapped();
                assert!((snapped.left - ideal.left).abs() <= 0.5);
                assert!((snapped.top - ideal.top).abs() <= 0.5);
                assert!((snapped.width - ideal.width).abs() <= 1.0);
                assert!((snapped.height - ideal.height).abs() <= 1.0);
            }
        }
    }

    #[test]
    fn test_print_page_size() {
        let (w, h) = page_size(PRINT_SCALE);
        assert!((w - 793.6).abs() < 1e-9);
        assert!((h - 1122.56).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_zoom() {
        assert_eq!(clamp_zoom(0.1), MIN_ZOOM);
        assert_eq!(clamp_zoom(3.0), MAX_ZOOM);
        assert_eq!(clamp_zoom(1.2), 1.2);
        assert_eq!(clamp_zoom(f64::NAN), 1.0);
    }

    #[test]
    fn test_zoom_steps() {
        assert_eq!(zoom_in(1.0), 1.1);
        assert_eq!(zoom_out(1.0), 0.9);
        assert_eq!(zoom_in(2.5), 2.5);
        assert_eq!(zoom_out(0.3), 0.3);
    }

    #[test]
    fn test_contain_wide_image() {
        let rect = ScreenRect::new(0.0, 0.0, 100.0, 100.0);
        let fit = contain(&rect, 200.0, 100.0);
        assert_eq!(fit, ScreenRect::new(0.0, 25.0, 100.0, 50.0));
    }

    #[test]
    fn test_contain_tall_image() {
        let rect = ScreenRect::new(10.0, 10.0, 100.0, 50.0);
        let fit = contain(&rect, 50.0, 100.0);
        assert_eq!(fit, ScreenRect::new(47.5, 10.0, 25.0, 50.0));
    }

    #[test]
    fn test_contain_degenerate_image() {
        let rect = ScreenRect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(contain(&rect, 0.0, 5.0), rect);
    }

    #[test]
    fn test_contains_half_open() {
        let rect = ScreenRect::new(10.0, 10.0, 10.0, 10.0);
        assert!(rect.contains(10.0, 10.0));
        assert!(rect.contains(19.9, 19.9));
        assert!(!rect.contains(20.0, 15.0));
        assert!(!rect.contains(9.9, 15.0));
    }
}
