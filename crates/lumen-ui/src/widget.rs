use lumen_engine::logging::LogSink;
use lumen_engine::time::Timer;

use crate::event::{EventResult, UiEvent};
use crate::geometry::Rect;
use crate::painter::Painter;

/// Per-frame data widgets read while painting.
pub struct FrameInfo<'a> {
    /// Nominal frame time handed to animated widgets, in seconds.
    pub dt: f32,
    pub logs: &'a LogSink,
    pub timer: &'a Timer,
    /// Color output of the camera shown in the preview, once rendered.
    pub preview: Option<PreviewImage<'a>>,
}

/// A camera output and its size in pixels.
#[derive(Clone, Copy)]
pub struct PreviewImage<'a> {
    pub view: &'a wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

/// Common interface of overlay widgets.
///
/// Widgets are placed by the overlay layout with [`set_rect`](Self::set_rect).
/// Every event is offered to every widget in turn until one consumes it, so a
/// widget checks its own rect (and may keep a drag it started).
pub trait Widget {
    fn rect(&self) -> Rect;

    fn set_rect(&mut self, rect: Rect);

    fn paint(&mut self, painter: &mut Painter<'_>, frame: &FrameInfo<'_>);

    fn on_event(&mut self, _event: &UiEvent) -> EventResult {
        EventResult::Ignored
    }
}
