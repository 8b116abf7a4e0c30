use glam::Vec2;
use lumen_engine::text::{FontId, FontSystem};

use crate::draw::{DrawCmd, DrawList};
use crate::geometry::{Color, Rect};
use crate::style::{Style, LINE_HEIGHT, PADDING, TEXT_SIZE};

/// Drawing surface passed to [`Widget::paint`](crate::widget::Widget::paint).
///
/// Wraps the overlay's [`DrawList`] with widget-level helpers. Text is skipped
/// when no font is loaded.
pub struct Painter<'a> {
    list: &'a mut DrawList,
    fonts: &'a FontSystem,
    font: Option<FontId>,
    pub style: Style,
}

impl<'a> Painter<'a> {
    pub fn new(list: &'a mut DrawList, fonts: &'a FontSystem, font: Option<FontId>, style: Style) -> Self {
        Self { list, fonts, font, style }
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        if rect.is_empty() || color.a <= 0.0 {
            return;
        }
        self.list.push(DrawCmd::Rect { rect, color });
    }

    /// One-pixel-wide outline drawn inside `rect`.
    pub fn stroke_rect(&mut self, rect: Rect, color: Color) {
        let Rect { origin: o, size: s } = rect;
        self.fill_rect(Rect::new(o.x, o.y, s.x, 1.0), color);
        self.fill_rect(Rect::new(o.x, o.y + s.y - 1.0, s.x, 1.0), color);
        self.fill_rect(Rect::new(o.x, o.y + 1.0, 1.0, s.y - 2.0), color);
        self.fill_rect(Rect::new(o.x + s.x - 1.0, o.y + 1.0, 1.0, s.y - 2.0), color);
    }

    /// Background plus outline in the current style.
    pub fn frame(&mut self, rect: Rect) {
        self.fill_rect(rect, self.style.background);
        self.stroke_rect(rect, self.style.frame);
    }

    pub fn text(&mut self, text: impl Into<String>, origin: Vec2, color: Color) {
        if self.font.is_none() {
            return;
        }
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.list.push(DrawCmd::Text {
            text,
            origin,
            size: TEXT_SIZE,
            color,
        });
    }

    /// Lines stacked from the top of `rect`'s padded area, clipped to it.
    pub fn text_lines<'s>(&mut self, rect: Rect, lines: impl IntoIterator<Item = &'s str>) {
        let inner = rect.inset(PADDING);
        let color = self.style.text;
        self.push_clip(inner);
        for (i, line) in lines.into_iter().enumerate() {
            let y = inner.origin.y + i as f32 * LINE_HEIGHT;
            if y >= inner.max().y {
                break;
            }
            self.text(line, Vec2::new(inner.origin.x, y), color);
        }
        self.pop_clip();
    }

    pub fn image(&mut self, view: &wgpu::TextureView, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        self.list.push(DrawCmd::Image { view: view.clone(), rect });
    }

    pub fn measure_text(&self, text: &str) -> Vec2 {
        match self.font {
            Some(font) => self.fonts.measure_text(text, font, TEXT_SIZE, None),
            None => Vec2::ZERO,
        }
    }

    pub fn push_clip(&mut self, rect: Rect) {
        self.list.push_clip(rect);
    }

    pub fn pop_clip(&mut self) {
        self.list.pop_clip();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_font_is_dropped() {
        let mut list = DrawList::new();
        let fonts = FontSystem::new();
        let mut p = Painter::new(&mut list, &fonts, None, Style::default());
        p.text("hello", Vec2::ZERO, Color::WHITE);
        p.frame(Rect::new(0.0, 0.0, 20.0, 10.0));
        // background + four edges
        assert_eq!(list.len(), 5);
        assert!(list.items().iter().all(|i| matches!(i.cmd, DrawCmd::Rect { .. })));
    }
}
