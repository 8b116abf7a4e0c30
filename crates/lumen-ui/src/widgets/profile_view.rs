use lumen_engine::time::Timer;

use crate::geometry::Rect;
use crate::painter::Painter;
use crate::widget::{FrameInfo, Widget};

/// Share of the previous value kept per nominal frame.
const KEEP: f32 = 0.95;
const NOMINAL_DT: f32 = 0.016;

/// Exponentially smoothed stage timings.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Smoothed {
    pub fps: f32,
    pub upload_ms: f32,
    pub cameras_ms: f32,
    pub guis_ms: f32,
    pub deserialize_ms: f32,
    pub windows_ms: f32,
    pub swap_ms: f32,
    pub events_ms: f32,
}

impl Smoothed {
    /// Folds the timer's latest samples in, `dt` seconds after the previous
    /// update. At the nominal 16 ms this keeps 0.95 of the old value.
    pub fn update(&mut self, timer: &Timer, dt: f32) {
        fn ms(timer: &Timer, key: &str) -> f32 {
            timer.get(key) as f32 * 0.001
        }
        let keep = KEEP.powf(dt.max(0.0) / NOMINAL_DT);
        let mix = |old: f32, new: f32| old * keep + new * (1.0 - keep);

        self.fps = mix(self.fps, 1e6 / timer.get("worldLoop").max(1) as f32);
        self.upload_ms = mix(self.upload_ms, ms(timer, "upload"));
        self.cameras_ms = mix(self.cameras_ms, ms(timer, "cameras"));
        self.guis_ms = mix(self.guis_ms, ms(timer, "guis"));
        self.deserialize_ms = mix(self.deserialize_ms, ms(timer, "buffer object update"));
        self.windows_ms = mix(self.windows_ms, ms(timer, "windows"));
        self.swap_ms = mix(self.swap_ms, ms(timer, "swap"));
        self.events_ms = mix(self.events_ms, ms(timer, "events"));
    }

    pub fn lines(&self) -> [String; 7] {
        [
            format!("Framerate: {:.2} fps", self.fps),
            format!("Buffers upload: {:.3} ms", self.upload_ms),
            format!("Cameras rendering: {:.3} ms", self.cameras_ms),
            format!("GUI rendering: {:.3} ms", self.guis_ms),
            format!("Buffers deserialize: {:.3} ms", self.deserialize_ms),
            format!("Windows rendering: {:.3} ms", self.windows_ms),
            format!("Swapping and events: {:.3} ms", self.swap_ms + self.events_ms),
        ]
    }
}

/// Framerate and per-stage durations of the world loop.
#[derive(Debug, Default)]
pub struct ProfileView {
    rect: Rect,
    smoothed: Smoothed,
}

impl ProfileView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn smoothed(&self) -> &Smoothed {
        &self.smoothed
    }
}

impl Widget for ProfileView {
    fn rect(&self) -> Rect {
        self.rect
    }

    fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    fn paint(&mut self, painter: &mut Painter<'_>, frame: &FrameInfo<'_>) {
        self.smoothed.update(frame.timer, frame.dt);
        painter.frame(self.rect);
        let lines = self.smoothed.lines();
        painter.text_lines(self.rect, lines.iter().map(String::as_str));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn samples_blend_in_slowly() {
        let timer = Timer::new();
        timer.record("worldLoop", Duration::from_micros(10_000));
        timer.record("upload", Duration::from_micros(2_000));

        let mut s = Smoothed::default();
        s.update(&timer, NOMINAL_DT);
        assert!((s.fps - 5.0).abs() < 1e-3);
        assert!((s.upload_ms - 0.1).abs() < 1e-5);

        s.update(&timer, NOMINAL_DT);
        assert!((s.fps - (5.0 * 0.95 + 5.0)).abs() < 1e-3);
    }

    #[test]
    fn longer_frames_blend_faster() {
        let timer = Timer::new();
        timer.record("upload", Duration::from_micros(1_000));

        let mut nominal = Smoothed::default();
        nominal.update(&timer, NOMINAL_DT);
        let mut slow = Smoothed::default();
        slow.update(&timer, NOMINAL_DT * 2.0);
        assert!((slow.upload_ms - (1.0 - 0.95 * 0.95)).abs() < 1e-5);
        assert!(slow.upload_ms > nominal.upload_ms);

        let mut paused = Smoothed::default();
        paused.update(&timer, 0.0);
        assert_eq!(paused.upload_ms, 0.0);
    }

    #[test]
    fn missing_loop_sample_does_not_divide_by_zero() {
        let mut s = Smoothed::default();
        s.update(&Timer::new(), NOMINAL_DT);
        assert!(s.fps.is_finite());
        assert_eq!(s.lines().len(), 7);
    }
}
