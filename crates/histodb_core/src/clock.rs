//! Time sources for validity intervals.

use histodb_codec::Timestamp;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};

/// Supplies the timestamp stamped on each mutation.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> Timestamp;
}

/// Wall clock that never repeats or goes backwards.
///
/// Returns `max(wall, last + 1ms)`, so two mutations never share an instant
/// and every archived validity interval is non-empty. The guarantee holds
/// per instance; collections writing the same records must read the same
/// instance, which [`SystemClock::shared`] provides.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl SystemClock {
    /// Creates a system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide system clock, used by every default configuration.
    #[must_use]
    pub fn shared() -> Arc<SystemClock> {
        static SHARED: OnceLock<Arc<SystemClock>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(SystemClock::new())))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = Timestamp::now().as_millis();
        let mut prev = self.last.load(Ordering::SeqCst);
        loop {
            let next = wall.max(prev.saturating_add(1));
            match self
                .last
                .compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return Timestamp::from_millis(next),
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Manually driven clock for deterministic tests.
///
/// Each reading advances the clock by `step` milliseconds afterwards
/// (0 keeps it still).
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
    step: i64,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self::ticking(start, 0)
    }

    /// Creates a clock that advances by `step` ms after every reading.
    #[must_use]
    pub fn ticking(start: Timestamp, step: i64) -> Self {
        Self {
            now: AtomicI64::new(start.as_millis()),
            step,
        }
    }

    /// Moves the clock to `at`.
    pub fn set(&self, at: Timestamp) {
        self.now.store(at.as_millis(), Ordering::SeqCst);
    }

    /// Moves the clock forward.
    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    /// Returns the current reading without advancing.
    #[must_use]
    pub fn peek(&self) -> Timestamp {
        Timestamp::from_millis(self.now.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now.fetch_add(self.step, Ordering::SeqCst))
    }
}
