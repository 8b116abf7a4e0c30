use crate::geometry::Rect;
use crate::painter::Painter;
use crate::widget::{FrameInfo, Widget};

const HELP: [&str; 7] = [
    "Tab: show / hide this GUI",
    "Escape: quit",
    "B: compute the blending between all cameras",
    "Ctrl+S: save the scene",
    "Camera view:",
    " drag: orbit around the target",
    " wheel: move closer / further",
];

/// Keyboard and mouse shortcuts.
#[derive(Debug, Default)]
pub struct HelpView {
    rect: Rect,
}

impl HelpView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines() -> &'static [&'static str] {
        &HELP
    }
}

impl Widget for HelpView {
    fn rect(&self) -> Rect {
        self.rect
    }

    fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    fn paint(&mut self, painter: &mut Painter<'_>, _frame: &FrameInfo<'_>) {
        painter.frame(self.rect);
        painter.text_lines(self.rect, HELP);
    }
}
