use glam::Vec2;
use lumen_engine::input::MouseButton;

use crate::event::{EventResult, UiEvent};
use crate::geometry::{Color, Rect};
use crate::painter::Painter;
use crate::style::PADDING;
use crate::widget::{FrameInfo, Widget};

/// Radians of orbit per dragged pixel.
const ORBIT_SPEED: f32 = 0.01;
/// Distance factor per wheel line.
const DOLLY_STEP: f32 = 0.9;

/// Navigation requested through the preview since the last
/// [`CameraView::take_navigation`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Navigation {
    /// Yaw and pitch in radians.
    pub orbit: Vec2,
    /// Multiplier applied to the eye-target distance.
    pub dolly: f32,
}

impl Default for Navigation {
    fn default() -> Self {
        Self {
            orbit: Vec2::ZERO,
            dolly: 1.0,
        }
    }
}

impl Navigation {
    pub fn is_identity(&self) -> bool {
        self.orbit == Vec2::ZERO && self.dolly == 1.0
    }
}

/// Live preview of a camera's color output. Left-drag orbits, the wheel
/// dollies; the overlay applies the result to the previewed camera.
#[derive(Debug, Default)]
pub struct CameraView {
    rect: Rect,
    dragging: bool,
    pending: Navigation,
}

impl CameraView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_navigation(&mut self) -> Navigation {
        std::mem::take(&mut self.pending)
    }

}

/// Largest rect of the `width` / `height` aspect centered in `area`.
fn letterbox(area: Rect, width: u32, height: u32) -> Rect {
    if width == 0 || height == 0 || area.size.x <= 0.0 || area.size.y <= 0.0 {
        return area;
    }
    let aspect = width as f32 / height as f32;
    let size = if area.size.x / area.size.y > aspect {
        Vec2::new(area.size.y * aspect, area.size.y)
    } else {
        Vec2::new(area.size.x, area.size.x / aspect)
    };
    let origin = area.origin + (area.size - size) * 0.5;
    Rect::new(origin.x, origin.y, size.x, size.y)
}

impl Widget for CameraView {
    fn rect(&self) -> Rect {
        self.rect
    }

    fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    fn paint(&mut self, painter: &mut Painter<'_>, frame: &FrameInfo<'_>) {
        painter.frame(self.rect);
        let inner = self.rect.inset(PADDING);
        painter.fill_rect(inner, Color::from_straight(0.1, 0.1, 0.1, 1.0));
        if let Some(preview) = frame.preview {
            painter.image(preview.view, letterbox(inner, preview.width, preview.height));
        }
        if self.dragging {
            let accent = painter.style.accent;
            painter.stroke_rect(inner, accent);
        }
    }

    fn on_event(&mut self, event: &UiEvent) -> EventResult {
        match *event {
            UiEvent::MouseDown { button: MouseButton::Left, pos, .. } if self.rect.contains(pos) => {
                self.dragging = true;
                EventResult::Consumed
            }
            UiEvent::MouseDrag { button: MouseButton::Left, delta, .. } if self.dragging => {
                self.pending.orbit += delta * ORBIT_SPEED;
                EventResult::Consumed
            }
            UiEvent::MouseUp { button: MouseButton::Left, .. } if self.dragging => {
                self.dragging = false;
                EventResult::Consumed
            }
            UiEvent::Scroll { delta, pos, .. } if self.rect.contains(pos) => {
                self.pending.dolly *= DOLLY_STEP.powf(delta);
                EventResult::Consumed
            }
            _ => EventResult::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use lumen_engine::input::Modifiers;

    use super::*;

    fn view() -> CameraView {
        let mut v = CameraView::new();
        v.set_rect(Rect::new(10.0, 10.0, 100.0, 50.0));
        v
    }

    #[test]
    fn drag_started_inside_orbits_even_outside() {
        let mut v = view();
        let down = UiEvent::MouseDown {
            button: MouseButton::Left,
            pos: Vec2::new(20.0, 20.0),
            modifiers: Modifiers::NONE,
        };
        assert!(v.on_event(&down).is_consumed());

        let drag = UiEvent::MouseDrag {
            button: MouseButton::Left,
            pos: Vec2::new(500.0, 20.0),
            delta: Vec2::new(100.0, -50.0),
        };
        assert!(v.on_event(&drag).is_consumed());

        let nav = v.take_navigation();
        assert!((nav.orbit - Vec2::new(1.0, -0.5)).length() < 1e-6);
        assert!(v.take_navigation().is_identity());
    }

    #[test]
    fn drag_started_outside_is_ignored() {
        let mut v = view();
        let drag = UiEvent::MouseDrag {
            button: MouseButton::Left,
            pos: Vec2::new(20.0, 20.0),
            delta: Vec2::ONE,
        };
        assert!(!v.on_event(&drag).is_consumed());
    }

    #[test]
    fn wheel_dollies() {
        let mut v = view();
        let scroll = UiEvent::Scroll {
            delta: 1.0,
            pos: Vec2::new(20.0, 20.0),
            modifiers: Modifiers::NONE,
        };
        v.on_event(&scroll);
        assert!((v.take_navigation().dolly - DOLLY_STEP).abs() < 1e-6);
    }

    #[test]
    fn letterbox_keeps_image_aspect() {
        let close = |a: Rect, b: Rect| {
            (a.origin - b.origin).abs().max_element() < 1e-3 && (a.size - b.size).abs().max_element() < 1e-3
        };
        let area = Rect::new(0.0, 0.0, 400.0, 300.0);
        assert!(close(letterbox(area, 1280, 720), Rect::new(0.0, 37.5, 400.0, 225.0)));
        assert!(close(letterbox(area, 100, 200), Rect::new(125.0, 0.0, 150.0, 300.0)));
        assert!(close(letterbox(area, 640, 480), area));
        assert_eq!(letterbox(area, 0, 480), area);
    }
}
