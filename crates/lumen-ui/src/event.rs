use glam::Vec2;
use lumen_engine::input::{ButtonState, InputEvent, Key, KeyAction, MouseButton};

pub use lumen_engine::input::Modifiers;

/// Input events routed to overlay widgets. Positions are overlay pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Key pressed or auto-repeated.
    KeyDown { key: Key, modifiers: Modifiers },
    KeyUp { key: Key, modifiers: Modifiers },
    MouseDown { button: MouseButton, pos: Vec2, modifiers: Modifiers },
    MouseUp { button: MouseButton, pos: Vec2, modifiers: Modifiers },
    /// Pointer moved with no button held.
    MouseMove { pos: Vec2 },
    /// Pointer moved while `button` is held; `delta` is the motion since the
    /// previous pointer event.
    MouseDrag { button: MouseButton, pos: Vec2, delta: Vec2 },
    /// Wheel motion in lines, positive away from the user.
    Scroll { delta: f32, pos: Vec2, modifiers: Modifiers },
}

impl UiEvent {
    /// Where the pointer was for pointer events.
    pub fn pos(&self) -> Option<Vec2> {
        match self {
            UiEvent::MouseDown { pos, .. }
            | UiEvent::MouseUp { pos, .. }
            | UiEvent::MouseMove { pos }
            | UiEvent::MouseDrag { pos, .. }
            | UiEvent::Scroll { pos, .. } => Some(*pos),
            UiEvent::KeyDown { .. } | UiEvent::KeyUp { .. } => None,
        }
    }
}

/// Result returned by [`Widget::on_event`](crate::widget::Widget::on_event).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Event was handled; stop routing.
    Consumed,
    Ignored,
}

impl EventResult {
    #[inline]
    pub fn is_consumed(self) -> bool {
        self == EventResult::Consumed
    }
}

/// Turns engine input into [`UiEvent`]s, tracking pointer position, held
/// buttons and modifiers between events.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    pos: Vec2,
    held: Option<MouseButton>,
    modifiers: Modifiers,
    /// Engine positions are logical; the overlay works in physical pixels.
    scale: f32,
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            held: None,
            modifiers: Modifiers::NONE,
            scale: 1.0,
        }
    }
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = if scale > 0.0 { scale } else { 1.0 };
    }

    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Converts one engine event. Events carrying no change (repeated pointer
    /// positions, focus) produce `None`.
    pub fn translate(&mut self, event: &InputEvent) -> Option<UiEvent> {
        match *event {
            InputEvent::ModifiersChanged(m) => {
                self.modifiers = m;
                None
            }
            InputEvent::Key { key, action, modifiers } => {
                self.modifiers = modifiers;
                Some(match action {
                    KeyAction::Press | KeyAction::Repeat => UiEvent::KeyDown { key, modifiers },
                    KeyAction::Release => UiEvent::KeyUp { key, modifiers },
                })
            }
            InputEvent::PointerMoved { x, y } => {
                let pos = Vec2::new(x, y) * self.scale;
                if pos == self.pos {
                    return None;
                }
                let delta = pos - self.pos;
                self.pos = pos;
                Some(match self.held {
                    Some(button) => UiEvent::MouseDrag { button, pos, delta },
                    None => UiEvent::MouseMove { pos },
                })
            }
            InputEvent::PointerButton { button, state, x, y, modifiers } => {
                self.pos = Vec2::new(x, y) * self.scale;
                self.modifiers = modifiers;
                let pos = self.pos;
                Some(match state {
                    ButtonState::Pressed => {
                        self.held = Some(button);
                        UiEvent::MouseDown { button, pos, modifiers }
                    }
                    ButtonState::Released => {
                        if self.held == Some(button) {
                            self.held = None;
                        }
                        UiEvent::MouseUp { button, pos, modifiers }
                    }
                })
            }
            InputEvent::Wheel { dy, modifiers, .. } => {
                self.modifiers = modifiers;
                (dy != 0.0).then_some(UiEvent::Scroll {
                    delta: dy,
                    pos: self.pos,
                    modifiers,
                })
            }
            InputEvent::PointerLeft => {
                self.held = None;
                None
            }
            InputEvent::Focused(_) => {
                self.held = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moved(x: f32, y: f32) -> InputEvent {
        InputEvent::PointerMoved { x, y }
    }

    fn button(state: ButtonState, x: f32, y: f32) -> InputEvent {
        InputEvent::PointerButton {
            button: MouseButton::Left,
            state,
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    #[test]
    fn motion_becomes_drag_while_held() {
        let mut t = PointerTracker::new();
        assert_eq!(t.translate(&moved(1.0, 1.0)), Some(UiEvent::MouseMove { pos: Vec2::ONE }));
        assert_eq!(t.translate(&moved(1.0, 1.0)), None);

        t.translate(&button(ButtonState::Pressed, 1.0, 1.0));
        assert_eq!(
            t.translate(&moved(4.0, 5.0)),
            Some(UiEvent::MouseDrag {
                button: MouseButton::Left,
                pos: Vec2::new(4.0, 5.0),
                delta: Vec2::new(3.0, 4.0),
            })
        );

        t.translate(&button(ButtonState::Released, 4.0, 5.0));
        assert!(matches!(t.translate(&moved(0.0, 0.0)), Some(UiEvent::MouseMove { .. })));
    }

    #[test]
    fn positions_are_scaled() {
        let mut t = PointerTracker::new();
        t.set_scale(2.0);
        t.translate(&moved(3.0, 4.0));
        assert_eq!(t.pos(), Vec2::new(6.0, 8.0));
    }

    #[test]
    fn keys_keep_action_and_modifiers() {
        let mut t = PointerTracker::new();
        let ev = t.translate(&InputEvent::Key {
            key: Key::S,
            action: KeyAction::Repeat,
            modifiers: Modifiers::CTRL,
        });
        assert_eq!(ev, Some(UiEvent::KeyDown { key: Key::S, modifiers: Modifiers::CTRL }));
        assert_eq!(t.modifiers(), Modifiers::CTRL);
    }
}
