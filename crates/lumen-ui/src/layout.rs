//! Placement of the overlay widgets for a given overlay size.

use crate::geometry::Rect;
use crate::style::{FONT_SIZE, MARGIN};

/// Largest preview, in pixels.
const PREVIEW_MAX: (f32, f32) = (800.0, 600.0);

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OverlayLayout {
    pub help: Rect,
    pub profile: Rect,
    pub log: Rect,
    pub graph: Rect,
    pub camera: Rect,
}

impl OverlayLayout {
    /// Help and profile stack down the top-left corner, the camera preview
    /// sits top-right, log and graph share the bottom quarter.
    pub fn compute(width: f32, height: f32) -> Self {
        let help = Rect::new(MARGIN, MARGIN, FONT_SIZE * 48.0, FONT_SIZE * 2.0 * 10.0 + 8.0);
        let profile = Rect::new(
            MARGIN,
            help.max().y + MARGIN,
            FONT_SIZE * 36.0,
            FONT_SIZE * 2.0 * 7.0 + 8.0,
        );

        let bottom_w = (width / 2.0 - 16.0).max(0.0);
        let bottom_h = (height / 4.0 - 16.0).max(0.0);
        let bottom_y = height - MARGIN - bottom_h;
        let log = Rect::new(MARGIN, bottom_y, bottom_w, bottom_h);
        let graph = Rect::new(width - MARGIN - bottom_w, bottom_y, bottom_w, bottom_h);

        // 4:3 preview, at most half the width and above the bottom row.
        let max_w = PREVIEW_MAX.0.min(width / 2.0 - 16.0);
        let max_h = PREVIEW_MAX.1.min(bottom_y - 2.0 * MARGIN);
        let preview_w = max_w.min(max_h * 4.0 / 3.0).max(0.0);
        let preview_h = preview_w * 3.0 / 4.0;
        let camera = Rect::new(width - MARGIN - preview_w, MARGIN, preview_w, preview_h);

        Self {
            help,
            profile,
            log,
            graph,
            camera,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_row_hugs_edges() {
        let l = OverlayLayout::compute(640.0, 480.0);
        assert_eq!(l.log, Rect::new(8.0, 368.0, 304.0, 104.0));
        assert_eq!(l.graph, Rect::new(328.0, 368.0, 304.0, 104.0));
        assert_eq!(l.log.max().y, 472.0);
        assert_eq!(l.graph.max().x, 632.0);
    }

    #[test]
    fn preview_stays_right_and_above_bottom_row() {
        for (w, h) in [(640.0, 480.0), (1920.0, 1080.0), (300.0, 200.0)] {
            let l = OverlayLayout::compute(w, h);
            assert!(l.camera.size.x >= 0.0);
            assert!(l.camera.max().x <= w - MARGIN + 1e-3);
            assert!(l.camera.max().y <= l.log.origin.y);
            if !l.camera.is_empty() {
                assert!((l.camera.size.x / l.camera.size.y - 4.0 / 3.0).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn large_overlay_caps_preview() {
        let l = OverlayLayout::compute(3840.0, 2160.0);
        assert_eq!(l.camera, Rect::new(3840.0 - 8.0 - 800.0, 8.0, 800.0, 600.0));
        assert_eq!(l.profile.origin.y, 8.0 + 168.0 + 8.0);
    }
}
