use glam::Vec2;

use crate::geometry::{Color, Rect};

/// One overlay primitive.
#[derive(Debug, Clone)]
pub enum DrawCmd {
    Rect { rect: Rect, color: Color },
    /// One line of text; `origin` is the top-left of the line box.
    Text {
        text: String,
        origin: Vec2,
        size: f32,
        color: Color,
    },
    /// A GPU texture stretched over `rect`.
    Image { view: wgpu::TextureView, rect: Rect },
}

/// A command plus the scissor rect active when it was pushed.
#[derive(Debug, Clone)]
pub struct DrawItem {
    pub cmd: DrawCmd,
    /// `None` draws everywhere.
    pub clip: Option<Rect>,
}

/// Recorded overlay draw stream for one frame, in paint order.
///
/// Clips nest: each [`push_clip`](Self::push_clip) is intersected with the
/// current one, and an empty intersection clips everything.
#[derive(Debug, Default)]
pub struct DrawList {
    items: Vec<DrawItem>,
    clip_stack: Vec<Rect>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops recorded items, keeping capacity.
    pub fn clear(&mut self) {
        self.items.clear();
        self.clip_stack.clear();
    }

    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, cmd: DrawCmd) {
        self.items.push(DrawItem {
            cmd,
            clip: self.clip_stack.last().copied(),
        });
    }

    pub fn push_clip(&mut self, rect: Rect) {
        let effective = match self.clip_stack.last() {
            None => rect,
            Some(&parent) => parent.intersect(rect).unwrap_or_default(),
        };
        self.clip_stack.push(effective);
    }

    pub fn pop_clip(&mut self) {
        debug_assert!(!self.clip_stack.is_empty(), "pop_clip without push_clip");
        self.clip_stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_cmd() -> DrawCmd {
        DrawCmd::Rect {
            rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            color: Color::WHITE,
        }
    }

    #[test]
    fn clips_nest_by_intersection() {
        let mut list = DrawList::new();
        list.push(rect_cmd());
        list.push_clip(Rect::new(0.0, 0.0, 10.0, 10.0));
        list.push_clip(Rect::new(5.0, 5.0, 10.0, 10.0));
        list.push(rect_cmd());
        list.pop_clip();
        list.push(rect_cmd());
        list.push_clip(Rect::new(50.0, 50.0, 1.0, 1.0));
        list.push(rect_cmd());

        let clips: Vec<_> = list.items().iter().map(|i| i.clip).collect();
        assert_eq!(
            clips,
            [
                None,
                Some(Rect::new(5.0, 5.0, 5.0, 5.0)),
                Some(Rect::new(0.0, 0.0, 10.0, 10.0)),
                Some(Rect::default()),
            ]
        );
    }

    #[test]
    fn clear_resets_clip_stack() {
        let mut list = DrawList::new();
        list.push_clip(Rect::new(0.0, 0.0, 1.0, 1.0));
        list.clear();
        list.push(rect_cmd());
        assert!(list.items()[0].clip.is_none());
    }
}
