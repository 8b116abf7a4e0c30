use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

struct TimerState {
    enabled: bool,
    running: HashMap<String, Instant>,
    samples: HashMap<String, u64>,
}

/// Named duration samples, in microseconds.
///
/// Shared between the world loop (which records stage durations) and the
/// overlay (which reads them). Recording is a no-op while disabled.
pub struct Timer {
    state: RwLock<TimerState>,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TimerState {
                enabled: true,
                running: HashMap::new(),
                samples: HashMap::new(),
            }),
        }
    }

    pub fn start(&self, name: &str) {
        let mut s = self.state.write();
        if s.enabled {
            s.running.insert(name.to_owned(), Instant::now());
        }
    }

    /// Ends a measurement started with [`Timer::start`] and stores it.
    pub fn stop(&self, name: &str) -> Option<Duration> {
        let mut s = self.state.write();
        let started = s.running.remove(name)?;
        let elapsed = started.elapsed();
        if s.enabled {
            s.samples.insert(name.to_owned(), elapsed.as_micros() as u64);
        }
        Some(elapsed)
    }

    pub fn record(&self, name: &str, duration: Duration) {
        let mut s = self.state.write();
        if s.enabled {
            s.samples.insert(name.to_owned(), duration.as_micros() as u64);
        }
    }

    /// Measures until the returned guard is dropped.
    pub fn scope<'a>(&'a self, name: &'a str) -> TimerScope<'a> {
        TimerScope {
            timer: self,
            name,
            started: Instant::now(),
        }
    }

    /// Last sample for `name` in microseconds, 0 when absent.
    pub fn get(&self, name: &str) -> u64 {
        self.state.read().samples.get(name).copied().unwrap_or(0)
    }

    /// Snapshot of every sample, sorted by name.
    pub fn samples(&self) -> Vec<(String, u64)> {
        let mut out: Vec<_> = self
            .state
            .read()
            .samples
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn set_enabled(&self, enabled: bool) {
        let mut s = self.state.write();
        s.enabled = enabled;
        if !enabled {
            s.running.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.read().enabled
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.state.read();
        f.debug_struct("Timer")
            .field("enabled", &s.enabled)
            .field("samples", &s.samples)
            .finish()
    }
}

/// Guard returned by [`Timer::scope`].
pub struct TimerScope<'a> {
    timer: &'a Timer,
    name: &'a str,
    started: Instant,
}

impl Drop for TimerScope<'_> {
    fn drop(&mut self) {
        self.timer.record(self.name, self.started.elapsed());
    }
}
