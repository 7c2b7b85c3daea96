use crate::error::{ProfilerError, Result};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of timestamps for the registry.
///
/// Timestamps are offsets from a clock-specific origin. Only differences
/// between two readings of the same clock are meaningful.
pub trait Clock: Send + Sync {
    fn now(&self) -> Result<Duration>;
}

/// Monotonic wall-clock time backed by `Instant`
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Result<Duration> {
        Instant::now()
            .checked_duration_since(self.origin)
            .ok_or_else(|| ProfilerError::ClockError("monotonic clock went backwards".to_string()))
    }
}

/// Manually driven clock for deterministic measurements.
///
/// Clones share the same reading, so a test can keep a handle and advance
/// time while the registry owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    failing: bool,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.now += by;
        }
    }

    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }

    /// Jump to an absolute reading, which may be earlier than the current one
    pub fn set(&self, at: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.now = at;
        }
    }

    /// Make subsequent readings fail until cleared
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.failing = failing;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Result<Duration> {
        let state = self
            .state
            .lock()
            .map_err(|_| ProfilerError::ClockError("manual clock lock poisoned".to_string()))?;
        if state.failing {
            return Err(ProfilerError::ClockError(
                "time source unavailable".to_string(),
            ));
        }
        Ok(state.now)
    }
}
