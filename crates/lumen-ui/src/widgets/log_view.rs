use lumen_engine::logging::LogLevel;

use crate::event::{EventResult, UiEvent};
use crate::geometry::Rect;
use crate::painter::Painter;
use crate::widget::{FrameInfo, Widget};

use super::text_box::{rows_for_height, visible_window};

/// Tail of the captured log (messages, warnings and errors). The wheel
/// scrolls back through history.
#[derive(Debug, Default)]
pub struct LogView {
    rect: Rect,
    scroll: usize,
}

impl LogView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }
}

impl Widget for LogView {
    fn rect(&self) -> Rect {
        self.rect
    }

    fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    fn paint(&mut self, painter: &mut Painter<'_>, frame: &FrameInfo<'_>) {
        painter.frame(self.rect);

        let lines = frame.logs.logs(&LogLevel::VISIBLE);
        let rows = rows_for_height(self.rect.size.y);
        let (start, scroll) = visible_window(lines.len(), rows, self.scroll);
        self.scroll = scroll;

        let text: Vec<String> = lines[start..].iter().map(ToString::to_string).collect();
        painter.text_lines(self.rect, text.iter().map(String::as_str));
    }

    fn on_event(&mut self, event: &UiEvent) -> EventResult {
        match *event {
            UiEvent::Scroll { delta, pos, .. } if self.rect.contains(pos) => {
                let step = delta.round() as i64;
                self.scroll = (self.scroll as i64 + step).max(0) as usize;
                EventResult::Consumed
            }
            _ => EventResult::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use lumen_engine::input::Modifiers;

    use super::*;

    fn scroll(delta: f32, x: f32) -> UiEvent {
        UiEvent::Scroll {
            delta,
            pos: Vec2::new(x, 5.0),
            modifiers: Modifiers::NONE,
        }
    }

    #[test]
    fn wheel_scrolls_only_inside() {
        let mut view = LogView::new();
        view.set_rect(Rect::new(0.0, 0.0, 100.0, 100.0));

        assert!(view.on_event(&scroll(2.0, 10.0)).is_consumed());
        assert_eq!(view.scroll(), 2);
        assert!(view.on_event(&scroll(-5.0, 10.0)).is_consumed());
        assert_eq!(view.scroll(), 0);
        assert!(!view.on_event(&scroll(1.0, 200.0)).is_consumed());
    }
}
