//! Virtual countdowns: timed rules and explicit delayed transitions.
//!
//! No timer here owns a thread or a callback. Each one stores the clock time
//! it started at and is compared against the shared clock when polled.

use serde::{Deserialize, Serialize};

/// Automatic transition `from -> to` after spending `duration` seconds in
/// `from`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimedTransitionRule {
    pub from: i32,
    pub to: i32,
    pub duration: f64,
}

/// A started countdown toward `target`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    pub target: i32,
    pub started_at: f64,
    pub duration: f64,
}

impl Countdown {
    pub fn new(target: i32, started_at: f64, duration: f64) -> Self {
        Self {
            target,
            started_at,
            duration,
        }
    }

    pub fn elapsed(&self, now: f64) -> f64 {
        (now - self.started_at).max(0.0)
    }

    pub fn is_expired(&self, now: f64) -> bool {
        self.elapsed(now) >= self.duration
    }

    /// Elapsed time over duration, clamped into `0.0..=1.0`.
    pub fn progress(&self, now: f64) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed(now) / self.duration).clamp(0.0, 1.0) as f32
    }
}

/// Kind of the single outstanding explicit delayed transition.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DelayedTransition {
    #[default]
    None,
    Timer(Countdown),
}

impl DelayedTransition {
    pub fn countdown(&self) -> Option<&Countdown> {
        match self {
            Self::None => None,
            Self::Timer(countdown) => Some(countdown),
        }
    }

    pub fn target(&self) -> Option<i32> {
        self.countdown().map(|c| c.target)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Timer(_))
    }

    /// Take the countdown out if it has expired, leaving `None` behind.
    pub fn take_expired(&mut self, now: f64) -> Option<Countdown> {
        match *self {
            Self::Timer(countdown) if countdown.is_expired(now) => {
                *self = Self::None;
                Some(countdown)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_expires_at_duration() {
        let countdown = Countdown::new(3, 1.0, 0.5);
        assert!(!countdown.is_expired(1.49));
        assert!(countdown.is_expired(1.5));
        assert!(countdown.is_expired(2.0));
    }

    #[test]
    fn progress_is_normalized_and_clamped() {
        let countdown = Countdown::new(3, 0.0, 2.0);
        assert_eq!(countdown.progress(-1.0), 0.0);
        assert_eq!(countdown.progress(1.0), 0.5);
        assert_eq!(countdown.progress(5.0), 1.0);
        assert_eq!(Countdown::new(3, 0.0, 0.0).progress(0.0), 1.0);
    }

    #[test]
    fn take_expired_clears_the_slot() {
        let mut delayed = DelayedTransition::Timer(Countdown::new(4, 0.0, 1.0));
        assert_eq!(delayed.take_expired(0.5), None);
        assert!(delayed.is_pending());

        let fired = delayed.take_expired(1.0);
        assert_eq!(fired.map(|c| c.target), Some(4));
        assert_eq!(delayed, DelayedTransition::None);
        assert_eq!(delayed.take_expired(2.0), None);
    }
}
