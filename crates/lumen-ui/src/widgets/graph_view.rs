use std::collections::VecDeque;

use glam::Vec2;
use lumen_engine::time::Timer;

use crate::geometry::{Color, Rect};
use crate::painter::Painter;
use crate::style::{LINE_HEIGHT, PADDING};
use crate::widget::{FrameInfo, Widget};

/// Stages plotted, with their curve colors.
const SERIES: [(&str, [f32; 3]); 4] = [
    ("worldLoop", [1.0, 1.0, 1.0]),
    ("cameras", [0.3, 0.8, 1.0]),
    ("guis", [1.0, 0.5, 0.2]),
    ("upload", [0.4, 1.0, 0.4]),
];

/// Shortest vertical range plotted, in milliseconds.
const MIN_RANGE_MS: f32 = 1.0;

/// Fixed-length history of the plotted stage durations, in milliseconds.
#[derive(Debug, Clone)]
pub struct History {
    capacity: usize,
    series: Vec<VecDeque<f32>>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(2),
            series: vec![VecDeque::new(); SERIES.len()],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.series.first().map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, timer: &Timer) {
        for (samples, (key, _)) in self.series.iter_mut().zip(SERIES) {
            if samples.len() == self.capacity {
                samples.pop_front();
            }
            samples.push_back(timer.get(key) as f32 * 0.001);
        }
    }

    /// Largest sample on record, never below [`MIN_RANGE_MS`].
    pub fn range(&self) -> f32 {
        self.series
            .iter()
            .flatten()
            .copied()
            .fold(MIN_RANGE_MS, f32::max)
    }

    pub fn series(&self, index: usize) -> Option<&VecDeque<f32>> {
        self.series.get(index)
    }
}

/// Scrolling plot of recent stage durations.
#[derive(Debug)]
pub struct GraphView {
    rect: Rect,
    history: History,
}

impl Default for GraphView {
    fn default() -> Self {
        Self {
            rect: Rect::default(),
            history: History::new(256),
        }
    }
}

impl GraphView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}

impl Widget for GraphView {
    fn rect(&self) -> Rect {
        self.rect
    }

    fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    fn paint(&mut self, painter: &mut Painter<'_>, frame: &FrameInfo<'_>) {
        if frame.timer.is_enabled() {
            self.history.push(frame.timer);
        }
        painter.frame(self.rect);

        let inner = self.rect.inset(PADDING);
        let plot = Rect::new(
            inner.origin.x,
            inner.origin.y + LINE_HEIGHT,
            inner.size.x,
            inner.size.y - LINE_HEIGHT,
        );
        if plot.is_empty() {
            return;
        }

        let range = self.history.range();
        let step = plot.size.x / (self.history.capacity() - 1) as f32;
        painter.push_clip(plot);
        for (index, (_, rgb)) in SERIES.iter().enumerate() {
            let Some(samples) = self.history.series(index) else { continue };
            let color = Color::from_straight(rgb[0], rgb[1], rgb[2], 0.9);
            // Newest sample sits on the right edge.
            let x0 = plot.max().x - (samples.len().saturating_sub(1)) as f32 * step;
            for (i, ms) in samples.iter().enumerate() {
                let y = plot.max().y - (ms / range).min(1.0) * plot.size.y;
                painter.fill_rect(Rect::new(x0 + i as f32 * step - 1.0, y - 1.0, 2.0, 2.0), color);
            }
        }
        painter.pop_clip();

        let mut x = inner.origin.x;
        for (key, rgb) in SERIES {
            let label = format!("{key} ");
            let color = Color::from_straight(rgb[0], rgb[1], rgb[2], 1.0);
            painter.text(label.as_str(), Vec2::new(x, inner.origin.y), color);
            x += painter.measure_text(&label).x;
        }
        let text_color = painter.style.text;
        painter.text(format!("{range:.1} ms"), Vec2::new(x, inner.origin.y), text_color);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn history_is_bounded() {
        let timer = Timer::new();
        let mut h = History::new(3);
        for _ in 0..5 {
            h.push(&timer);
        }
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn range_tracks_largest_sample() {
        let timer = Timer::new();
        let mut h = History::new(8);
        h.push(&timer);
        assert_eq!(h.range(), MIN_RANGE_MS);

        timer.record("cameras", Duration::from_micros(4_000));
        h.push(&timer);
        assert!((h.range() - 4.0).abs() < 1e-6);
    }
}
