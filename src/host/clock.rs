//! Time sources.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic time in seconds, shared by every replica of a machine.
///
/// Timer expiry and replay horizons are plain comparisons against this
/// value; nothing sleeps or waits on it.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// Hand-driven clock for deterministic stepping.
///
/// Clones share the same time, so an authority and its observers in a test
/// can be fed one clock.
///
/// # Example
///
/// ```rust
/// use retrostate::host::{Clock, ManualClock};
///
/// let clock = ManualClock::new(0.0);
/// let observer = clock.clone();
///
/// clock.advance(0.25);
/// assert_eq!(observer.now(), 0.25);
/// ```
#[derive(Clone, Debug)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(start.to_bits())),
        }
    }

    pub fn set(&self, now: f64) {
        self.bits.store(now.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, dt: f64) {
        self.set(self.now() + dt);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// Wall clock measuring seconds since its creation.
#[derive(Clone, Debug)]
pub struct SystemClock {
    origin: DateTime<Utc>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Utc::now() }
    }

    /// Clock whose zero is `origin`, so replicas agreeing on an origin
    /// agree on time.
    pub fn starting_at(origin: DateTime<Utc>) -> Self {
        Self { origin }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        let elapsed = Utc::now().signed_duration_since(self.origin);
        elapsed
            .num_microseconds()
            .map_or(elapsed.num_milliseconds() as f64 / 1e3, |us| us as f64 / 1e6)
    }
}
