//! Polled tick clocks
//!
//! Nothing in the firmware waits on a timer interrupt. Periodic work asks a
//! [`FrequencyClock`] whether its interval has elapsed and ticks it after
//! doing the work. Time comes from a [`TimeSource`] so tests can drive it
//! by hand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::Rng;

/// Monotonic millisecond time source
pub trait TimeSource: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall time since the clock was created
#[derive(Debug, Clone, Copy)]
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

impl TimeSource for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven time source; clones share the same counter
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: u64) -> Self {
        let clock = Self::new();
        clock.set(ms);
        clock
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Interval tracker driven by explicit `tick` calls
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrequencyClock {
    /// Ticks per second; 0 means "always elapsed"
    pub frequency_hz: f64,
    last_tick_ms: u64,
    started: bool,
}

impl FrequencyClock {
    pub fn new(frequency_hz: f64) -> Self {
        Self {
            frequency_hz,
            last_tick_ms: 0,
            started: false,
        }
    }

    /// Interval length in milliseconds (0 for a zero frequency)
    pub fn period_ms(&self) -> u64 {
        if self.frequency_hz <= 0.0 {
            0
        } else {
            (1000.0 / self.frequency_hz) as u64
        }
    }

    pub fn started(&self) -> bool {
        self.started
    }

    /// Whether the interval has passed since the last tick.
    ///
    /// A clock that was never ticked is elapsed. With `stagger`, the first
    /// query instead backdates the last tick by a random fraction of one
    /// period, so clocks created together do not all fire on the same call.
    pub fn elapsed(&mut self, now_ms: u64, stagger: bool) -> bool {
        let period = self.period_ms();
        if !self.started && stagger && period > 0 {
            let jitter = rand::thread_rng().gen_range(0..period);
            self.last_tick_ms = now_ms.saturating_sub(jitter);
            self.started = true;
        }

        !self.started || period == 0 || now_ms.saturating_sub(self.last_tick_ms) >= period
    }

    pub fn tick(&mut self, now_ms: u64) {
        self.last_tick_ms = now_ms;
        self.started = true;
    }

    /// Forget the last tick, keeping the frequency
    pub fn reset(&mut self) {
        self.last_tick_ms = 0;
        self.started = false;
    }
}
