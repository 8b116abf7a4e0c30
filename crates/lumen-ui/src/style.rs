//! Overlay metrics and colors.

use crate::geometry::Color;

/// Base unit of the overlay layout, in pixels.
pub const FONT_SIZE: f32 = 8.0;
/// Pixel size text is rasterized at.
pub const TEXT_SIZE: f32 = FONT_SIZE * 1.5;
/// Baseline-to-baseline distance of text boxes.
pub const LINE_HEIGHT: f32 = FONT_SIZE * 2.0;
/// Gap between widgets and the overlay edges.
pub const MARGIN: f32 = 8.0;
/// Inner padding of a widget frame.
pub const PADDING: f32 = 4.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Style {
    pub frame: Color,
    pub background: Color,
    pub text: Color,
    pub accent: Color,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            frame: Color::from_straight(1.0, 0.5, 0.2, 0.7),
            background: Color::from_straight(0.0, 0.0, 0.0, 0.55),
            text: Color::from_straight(1.0, 1.0, 1.0, 0.9),
            accent: Color::from_straight(1.0, 0.5, 0.2, 0.35),
        }
    }
}
