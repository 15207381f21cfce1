//! Bounded transition log with a monotonic change counter.
//!
//! A [`StateBuffer`] holds the most recent `C` committed states (index 0 is
//! the current one) together with the number of transitions ever committed.
//! Together they form a single-writer replicated log: the authority appends
//! with [`StateBuffer::commit`], and every observer catches up with
//! [`StateBuffer::reconcile`] using its own cursor into the change counter.
//!
//! Only the newest `C` records survive, so observers that fall further
//! behind lose the older steps permanently. The buffer is a catch-up
//! window, not an audit trail.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest supported buffer capacity.
pub const MAX_CAPACITY: usize = 4;

/// A state together with the clock time it was entered.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub state: i32,
    pub timestamp: f64,
}

/// One transition to replay on an observer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReplayEntry {
    pub from: i32,
    pub to: i32,
    /// Clock time at which `to` was committed.
    pub timestamp: f64,
    /// Seconds between the commit and the reconciliation.
    pub age: f64,
}

/// The replicated portion of a buffer, as shipped by the host transport.
///
/// # Example
///
/// ```rust
/// use retrostate::core::StateBuffer;
///
/// let mut authority = StateBuffer::new(4, 0, 0.0);
/// authority.commit(1, 0.5);
///
/// let payload = authority.snapshot();
/// let json = serde_json::to_string(&payload).unwrap();
///
/// let mut replica = StateBuffer::new(4, 0, 0.0);
/// replica.restore(serde_json::from_str(&json).unwrap()).unwrap();
/// assert_eq!(replica.current(), 1);
/// assert_eq!(replica.change_count(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplicatedState {
    pub change_count: u64,
    pub records: Vec<StateRecord>,
}

/// Errors raised when adopting a replicated payload.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReplicationError {
    #[error("Replicated buffer holds {found} records, expected {expected}")]
    CapacityMismatch { expected: usize, found: usize },

    #[error(transparent)]
    State(#[from] crate::core::StateError),
}

/// Fixed-capacity ring of recent states plus the committed-transition count.
#[derive(Clone, Debug, PartialEq)]
pub struct StateBuffer {
    records: Vec<StateRecord>,
    change_count: u64,
}

impl StateBuffer {
    /// Create a buffer with every slot holding `default_state`.
    ///
    /// `capacity` is clamped into `1..=MAX_CAPACITY`.
    pub fn new(capacity: usize, default_state: i32, timestamp: f64) -> Self {
        let capacity = capacity.clamp(1, MAX_CAPACITY);
        Self {
            records: vec![
                StateRecord {
                    state: default_state,
                    timestamp,
                };
                capacity
            ],
            change_count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    pub fn current(&self) -> i32 {
        self.records[0].state
    }

    pub fn current_record(&self) -> StateRecord {
        self.records[0]
    }

    /// The state before the current one, or the current one when the
    /// buffer only has a single slot.
    pub fn previous(&self) -> i32 {
        self.records.get(1).unwrap_or(&self.records[0]).state
    }

    pub fn records(&self) -> &[StateRecord] {
        &self.records
    }

    /// Refill every slot with `default_state` without touching the counter.
    pub fn fill(&mut self, default_state: i32, timestamp: f64) {
        for record in &mut self.records {
            *record = StateRecord {
                state: default_state,
                timestamp,
            };
        }
    }

    /// Append `state`, shifting older records down and dropping the oldest.
    ///
    /// Returns `false` without changing anything when `state` is already
    /// the current state.
    pub fn commit(&mut self, state: i32, timestamp: f64) -> bool {
        if state == self.current() {
            return false;
        }
        self.records.rotate_right(1);
        self.records[0] = StateRecord { state, timestamp };
        self.change_count += 1;
        true
    }

    /// Nearest earlier state that is neither `blocked` nor rejected by
    /// `is_blocked`.
    pub fn fallback_for(&self, blocked: i32, is_blocked: impl Fn(i32) -> bool) -> Option<i32> {
        self.records
            .iter()
            .skip(1)
            .map(|record| record.state)
            .find(|&state| state != blocked && !is_blocked(state))
    }

    /// Compute the transitions an observer has not processed yet.
    ///
    /// `local_change_count` is the observer's cursor and `observed` the last
    /// state it dispatched, used as the source of the oldest entry once its
    /// predecessor has been evicted. Intermediate entries older than
    /// `horizon` seconds are dropped; the entry leading into the current
    /// state is always kept. Entries come back oldest first.
    pub fn reconcile(
        &self,
        local_change_count: u64,
        observed: i32,
        horizon: f64,
        now: f64,
    ) -> Vec<ReplayEntry> {
        let lag = self.change_count.saturating_sub(local_change_count);
        let missed = lag.min(self.capacity() as u64) as usize;

        let mut entries = Vec::with_capacity(missed);
        for i in (0..missed).rev() {
            let record = self.records[i];
            let from = self.records.get(i + 1).map_or(observed, |prev| prev.state);
            if from == record.state {
                continue;
            }

            let age = now - record.timestamp;
            if i > 0 && age > horizon {
                tracing::debug!(
                    from,
                    to = record.state,
                    age,
                    horizon,
                    "dropping stale transition from replay"
                );
                continue;
            }

            entries.push(ReplayEntry {
                from,
                to: record.state,
                timestamp: record.timestamp,
                age,
            });
        }
        entries
    }

    pub fn snapshot(&self) -> ReplicatedState {
        ReplicatedState {
            change_count: self.change_count,
            records: self.records.clone(),
        }
    }

    /// Adopt a replicated payload.
    ///
    /// Payloads that would move the counter backwards are stale and are
    /// ignored, returning `Ok(false)`.
    pub fn restore(&mut self, payload: ReplicatedState) -> Result<bool, ReplicationError> {
        if payload.records.len() != self.capacity() {
            return Err(ReplicationError::CapacityMismatch {
                expected: self.capacity(),
                found: payload.records.len(),
            });
        }
        if payload.change_count < self.change_count {
            return Ok(false);
        }
        self.records = payload.records;
        self.change_count = payload.change_count;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: i32 = 0;
    const RUN: i32 = 1;
    const JUMP: i32 = 2;

    fn scenario() -> StateBuffer {
        let mut buffer = StateBuffer::new(4, IDLE, 0.0);
        assert!(buffer.commit(RUN, 0.0));
        assert!(buffer.commit(JUMP, 0.1));
        assert!(buffer.commit(IDLE, 0.2));
        buffer
    }

    fn pairs(entries: &[ReplayEntry]) -> Vec<(i32, i32)> {
        entries.iter().map(|e| (e.from, e.to)).collect()
    }

    #[test]
    fn new_buffer_is_prefilled() {
        let buffer = StateBuffer::new(3, 7, 1.5);
        assert_eq!(buffer.capacity(), 3);
        assert_eq!(buffer.change_count(), 0);
        assert!(buffer.records().iter().all(|r| r.state == 7 && r.timestamp == 1.5));
    }

    #[test]
    fn capacity_is_clamped() {
        assert_eq!(StateBuffer::new(0, IDLE, 0.0).capacity(), 1);
        assert_eq!(StateBuffer::new(9, IDLE, 0.0).capacity(), MAX_CAPACITY);
    }

    #[test]
    fn commit_shifts_and_counts() {
        let buffer = scenario();
        let states: Vec<i32> = buffer.records().iter().map(|r| r.state).collect();
        assert_eq!(states, vec![IDLE, JUMP, RUN, IDLE]);
        assert_eq!(buffer.change_count(), 3);
        assert_eq!(buffer.current(), IDLE);
        assert_eq!(buffer.previous(), JUMP);
    }

    #[test]
    fn commit_to_current_is_a_no_op() {
        let mut buffer = StateBuffer::new(4, IDLE, 0.0);
        let before = buffer.clone();
        assert!(!buffer.commit(IDLE, 3.0));
        assert_eq!(buffer, before);
    }

    #[test]
    fn commit_drops_oldest_record() {
        let mut buffer = StateBuffer::new(2, IDLE, 0.0);
        buffer.commit(RUN, 1.0);
        buffer.commit(JUMP, 2.0);
        let states: Vec<i32> = buffer.records().iter().map(|r| r.state).collect();
        assert_eq!(states, vec![JUMP, RUN]);
    }

    #[test]
    fn reconcile_replays_everything_within_horizon() {
        let buffer = scenario();
        let entries = buffer.reconcile(0, IDLE, 7.0, 0.25);
        assert_eq!(pairs(&entries), vec![(IDLE, RUN), (RUN, JUMP), (JUMP, IDLE)]);
    }

    #[test]
    fn reconcile_drops_stale_intermediates_but_keeps_current() {
        let buffer = scenario();
        let entries = buffer.reconcile(0, IDLE, 0.05, 0.25);
        assert_eq!(pairs(&entries), vec![(JUMP, IDLE)]);
        assert!((entries[0].age - 0.05).abs() < 1e-9);
    }

    #[test]
    fn current_entry_survives_any_horizon() {
        let buffer = scenario();
        let entries = buffer.reconcile(2, JUMP, 0.0, 100.0);
        assert_eq!(pairs(&entries), vec![(JUMP, IDLE)]);
    }

    #[test]
    fn reconcile_only_returns_unseen_transitions() {
        let buffer = scenario();
        let entries = buffer.reconcile(1, RUN, 7.0, 0.25);
        assert_eq!(pairs(&entries), vec![(RUN, JUMP), (JUMP, IDLE)]);
        assert!(buffer.reconcile(3, IDLE, 7.0, 0.25).is_empty());
    }

    #[test]
    fn evicted_predecessor_falls_back_to_observed_state() {
        let mut buffer = StateBuffer::new(2, IDLE, 0.0);
        buffer.commit(RUN, 0.0);
        buffer.commit(JUMP, 0.1);
        buffer.commit(IDLE, 0.2);
        // Records are [IDLE, JUMP]; RUN is gone.
        let entries = buffer.reconcile(0, IDLE, 7.0, 0.3);
        assert_eq!(pairs(&entries), vec![(IDLE, JUMP), (JUMP, IDLE)]);
    }

    #[test]
    fn single_slot_buffer_still_delivers_current_state() {
        let mut buffer = StateBuffer::new(1, IDLE, 0.0);
        buffer.commit(RUN, 0.0);
        buffer.commit(JUMP, 0.1);
        let entries = buffer.reconcile(0, IDLE, 7.0, 0.2);
        assert_eq!(pairs(&entries), vec![(IDLE, JUMP)]);
    }

    #[test]
    fn fallback_skips_blocked_states() {
        let buffer = scenario();
        assert_eq!(buffer.fallback_for(IDLE, |_| false), Some(JUMP));
        assert_eq!(buffer.fallback_for(IDLE, |s| s == JUMP), Some(RUN));
        let degenerate = StateBuffer::new(4, IDLE, 0.0);
        assert_eq!(degenerate.fallback_for(IDLE, |_| false), None);
    }

    #[test]
    fn restore_rejects_wrong_capacity_and_stale_payloads() {
        let authority = scenario();
        let mut replica = StateBuffer::new(4, IDLE, 0.0);
        assert_eq!(replica.restore(authority.snapshot()), Ok(true));
        assert_eq!(replica, authority);

        let mut stale = authority.snapshot();
        stale.change_count = 1;
        assert_eq!(replica.restore(stale), Ok(false));
        assert_eq!(replica.change_count(), 3);

        let mut small = StateBuffer::new(2, IDLE, 0.0);
        assert_eq!(
            small.restore(authority.snapshot()),
            Err(ReplicationError::CapacityMismatch {
                expected: 2,
                found: 4
            })
        );
    }
}
