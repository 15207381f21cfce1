//! The typed state machine.
//!
//! [`StateMachine`] wraps the untyped [`Engine`] with a caller-supplied enum
//! implementing [`StateId`]. Writes (`transition_to`, `block`, ...) are only
//! honoured on the authority; refused writes return `false` and are logged.
//!
//! # Example
//!
//! ```rust
//! use retrostate::host::ManualClock;
//! use retrostate::{state_enum, StateMachine};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! state_enum! {
//!     pub enum Player {
//!         Idle = 0,
//!         Run = 1,
//!         Jump = 2,
//!     }
//! }
//!
//! let clock = ManualClock::new(0.0);
//! let mut machine = StateMachine::builder()
//!     .default_state(Player::Idle)
//!     .clock(clock.clone())
//!     .build()
//!     .unwrap();
//!
//! let jumps = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&jumps);
//! machine.on_enter(Player::Jump, move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//! machine.add_state_transition_after(Player::Jump, Player::Idle, 0.5);
//!
//! machine.transition_to(Player::Jump);
//! assert_eq!(machine.get_current_state(), Player::Jump);
//! assert_eq!(jumps.load(Ordering::SeqCst), 1);
//!
//! clock.advance(0.5);
//! machine.tick(0.5);
//! assert_eq!(machine.get_current_state(), Player::Idle);
//! assert_eq!(machine.get_last_state(), Player::Jump);
//! ```

pub mod config;
mod engine;

pub use config::{ConfigError, MachineConfig, ReplicationMode, DEFAULT_RETROACTIVE_HORIZON};
pub use engine::Engine;

use crate::builder::StateMachineBuilder;
use crate::core::{decode, MachineId, ReplicatedState, ReplicationError, StateId, StateRecord, Target};
use crate::rules::Condition;
use std::marker::PhantomData;
use tracing::warn;

pub struct StateMachine<T: StateId> {
    engine: Engine,
    default: T,
}

impl<T: StateId> StateMachine<T> {
    pub fn builder() -> StateMachineBuilder<T> {
        StateMachineBuilder::new()
    }

    /// Assemble a machine from an engine whose states all belong to `T`.
    pub(crate) fn from_engine(engine: Engine, default: T) -> Self {
        Self { engine, default }
    }

    fn decode_or_default(&self, value: i32) -> T {
        T::from_i32(value).unwrap_or(self.default)
    }

    pub fn id(&self) -> MachineId {
        self.engine.id()
    }

    pub fn config(&self) -> &MachineConfig {
        self.engine.config()
    }

    pub fn has_authority(&self) -> bool {
        self.engine.has_authority()
    }

    /// Refill the history with `state`. Accepted only before the first
    /// transition.
    pub fn set_default_state(&mut self, state: T) -> bool {
        let accepted = self.engine.set_default_state(state.to_i32());
        if accepted {
            self.default = state;
        }
        accepted
    }

    pub fn get_current_state(&self) -> T {
        self.decode_or_default(self.engine.current())
    }

    pub fn get_last_state(&self) -> T {
        self.decode_or_default(self.engine.previous())
    }

    /// Target of the pending delayed transition, or the current state.
    pub fn get_queued_state(&self) -> T {
        self.decode_or_default(self.engine.queued())
    }

    pub fn transition_to(&mut self, state: T) -> bool {
        self.engine.transition_to(state.to_i32())
    }

    pub fn transition_to_after(&mut self, state: T, delay: f64) -> bool {
        self.engine.transition_to_after(state.to_i32(), delay)
    }

    pub fn cancel_delayed_transitions(&mut self) -> bool {
        self.engine.cancel_delayed_transitions()
    }

    /// Progress of the pending delayed transition in `0.0..=1.0`.
    pub fn pending_delay_progress(&self) -> Option<f32> {
        let now = self.engine.now();
        self.engine.pending_delay().map(|c| c.progress(now))
    }

    pub fn block(&mut self, state: T) -> bool {
        self.engine.block(state.to_i32())
    }

    pub fn unblock(&mut self, state: T) -> bool {
        self.engine.unblock(state.to_i32())
    }

    pub fn is_blocked(&self, state: T) -> bool {
        self.engine.is_blocked(state.to_i32())
    }

    /// Move `from -> to` as soon as `predicate` holds. A missing predicate
    /// always holds.
    pub fn add_state_transition<F>(&mut self, from: T, to: T, predicate: Option<F>)
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.engine
            .add_conditional_rule(from.to_i32(), to.to_i32(), Condition::from(predicate));
    }

    /// Move `from -> to` once the machine has spent `delay` seconds in
    /// `from`.
    pub fn add_state_transition_after(&mut self, from: T, to: T, delay: f64) {
        self.engine.add_timed_rule(from.to_i32(), to.to_i32(), delay);
    }

    pub fn conditional_rule_count(&self) -> usize {
        self.engine.rules().conditional_count()
    }

    pub fn timed_rule_count(&self) -> usize {
        self.engine.rules().timed_count()
    }

    /// Register callbacks that only run on the given roles.
    pub fn for_target(&mut self, target: Target) -> CallbackScope<'_, T> {
        CallbackScope {
            engine: &mut self.engine,
            target,
            _state: PhantomData,
        }
    }

    pub fn on_enter<F>(&mut self, state: T, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.for_target(Target::Everyone).on_enter(state, callback);
    }

    pub fn on_exit<F>(&mut self, state: T, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.for_target(Target::Everyone).on_exit(state, callback);
    }

    pub fn on_update<F>(&mut self, state: T, callback: F)
    where
        F: FnMut(f64) + Send + 'static,
    {
        self.for_target(Target::Everyone).on_update(state, callback);
    }

    pub fn on_transition_once<F>(&mut self, from: T, to: T, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.for_target(Target::Everyone)
            .on_transition_once(from, to, callback);
    }

    pub fn on_transition_tick<F>(&mut self, from: T, to: T, callback: F)
    where
        F: FnMut(f32) + Send + 'static,
    {
        self.for_target(Target::Everyone)
            .on_transition_tick(from, to, callback);
    }

    pub fn on_state_changed<F>(&mut self, callback: F)
    where
        F: FnMut(T, T) + Send + 'static,
    {
        self.for_target(Target::Everyone).on_state_changed(callback);
    }

    /// Drive one frame.
    pub fn tick(&mut self, dt: f64) {
        self.engine.tick(dt);
    }

    /// Catch up on replicated changes without evaluating rules.
    pub fn late_tick(&mut self) {
        self.engine.late_tick();
    }

    pub fn change_count(&self) -> u64 {
        self.engine.change_count()
    }

    pub fn local_change_count(&self) -> u64 {
        self.engine.local_change_count()
    }

    pub fn records(&self) -> &[StateRecord] {
        self.engine.records()
    }

    /// Payload the host replicates from the authority to every reader.
    pub fn replicated_state(&self) -> ReplicatedState {
        self.engine.replicated_state()
    }

    /// Change notification for the replicated buffer. Every state in the
    /// payload must be a variant of `T`. Returns the number of transitions
    /// dispatched.
    pub fn apply_replicated_state(
        &mut self,
        payload: ReplicatedState,
    ) -> Result<usize, ReplicationError> {
        self.check_payload(&payload)?;
        self.engine.apply_replicated(payload)
    }

    /// Store a replicated buffer without dispatching. For hosts that deliver
    /// replicated fields mid-frame and catch up in [`late_tick`](Self::late_tick).
    pub fn write_replicated_state(
        &mut self,
        payload: ReplicatedState,
    ) -> Result<bool, ReplicationError> {
        self.check_payload(&payload)?;
        self.engine.write_replicated(payload)
    }

    fn check_payload(&self, payload: &ReplicatedState) -> Result<(), ReplicationError> {
        for record in &payload.records {
            decode::<T>(record.state).inspect_err(|err| {
                warn!(machine = %self.id(), error = %err, "rejecting replicated state");
            })?;
        }
        Ok(())
    }

    pub fn is_destroyed(&self) -> bool {
        self.engine.is_destroyed()
    }

    /// Tear the machine down: unsubscribe from ticks and drop every
    /// callback and rule. Also happens on drop.
    pub fn destroy(&mut self) {
        self.engine.destroy();
    }
}

/// Callback registration bound to one [`Target`].
pub struct CallbackScope<'a, T: StateId> {
    engine: &'a mut Engine,
    target: Target,
    _state: PhantomData<T>,
}

impl<T: StateId> CallbackScope<'_, T> {
    pub fn on_enter<F>(&mut self, state: T, callback: F) -> &mut Self
    where
        F: FnMut() + Send + 'static,
    {
        self.engine
            .callbacks_mut()
            .on_enter(state.to_i32(), self.target, Box::new(callback));
        self
    }

    pub fn on_exit<F>(&mut self, state: T, callback: F) -> &mut Self
    where
        F: FnMut() + Send + 'static,
    {
        self.engine
            .callbacks_mut()
            .on_exit(state.to_i32(), self.target, Box::new(callback));
        self
    }

    pub fn on_update<F>(&mut self, state: T, callback: F) -> &mut Self
    where
        F: FnMut(f64) + Send + 'static,
    {
        self.engine
            .callbacks_mut()
            .on_update(state.to_i32(), self.target, Box::new(callback));
        self
    }

    pub fn on_transition_once<F>(&mut self, from: T, to: T, callback: F) -> &mut Self
    where
        F: FnMut() + Send + 'static,
    {
        self.engine.callbacks_mut().on_transition_once(
            from.to_i32(),
            to.to_i32(),
            self.target,
            Box::new(callback),
        );
        self
    }

    pub fn on_transition_tick<F>(&mut self, from: T, to: T, callback: F) -> &mut Self
    where
        F: FnMut(f32) + Send + 'static,
    {
        self.engine.callbacks_mut().on_transition_tick(
            from.to_i32(),
            to.to_i32(),
            self.target,
            Box::new(callback),
        );
        self
    }

    pub fn on_state_changed<F>(&mut self, mut callback: F) -> &mut Self
    where
        F: FnMut(T, T) + Send + 'static,
    {
        self.engine.callbacks_mut().on_state_changed(
            self.target,
            Box::new(move |from: i32, to: i32| {
                if let (Some(from), Some(to)) = (T::from_i32(from), T::from_i32(to)) {
                    callback(from, to);
                }
            }),
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ManualClock, SharedAuthority};
    use crate::state_enum;
    use std::sync::{Arc, Mutex};

    state_enum! {
        enum Door {
            Closed = 0,
            Opening = 1,
            Open = 2,
            Locked = 3,
        }
    }

    fn machine(clock: &ManualClock) -> StateMachine<Door> {
        StateMachine::builder()
            .default_state(Door::Closed)
            .clock(clock.clone())
            .build()
            .unwrap()
    }

    #[test]
    fn typed_accessors_follow_transitions() {
        let clock = ManualClock::new(0.0);
        let mut door = machine(&clock);
        assert_eq!(door.get_current_state(), Door::Closed);
        assert_eq!(door.get_last_state(), Door::Closed);

        assert!(door.transition_to(Door::Opening));
        assert_eq!(door.get_current_state(), Door::Opening);
        assert_eq!(door.get_last_state(), Door::Closed);
        assert_eq!(door.get_queued_state(), Door::Opening);
    }

    #[test]
    fn queued_state_reports_delayed_target() {
        let clock = ManualClock::new(0.0);
        let mut door = machine(&clock);
        door.transition_to_after(Door::Open, 2.0);
        assert_eq!(door.get_queued_state(), Door::Open);

        clock.advance(0.5);
        assert_eq!(door.pending_delay_progress(), Some(0.25));

        door.cancel_delayed_transitions();
        assert_eq!(door.get_queued_state(), Door::Closed);
        assert_eq!(door.pending_delay_progress(), None);
    }

    #[test]
    fn scoped_callbacks_respect_role() {
        let clock = ManualClock::new(0.0);
        let authority = SharedAuthority::new(true);
        let mut door = StateMachine::builder()
            .default_state(Door::Closed)
            .config(MachineConfig::replicated())
            .clock(clock.clone())
            .authority(authority.clone())
            .build()
            .unwrap();

        let log: Arc<Mutex<Vec<&'static str>>> = Arc::default();
        let (remote, writer) = (Arc::clone(&log), Arc::clone(&log));
        door.for_target(Target::Remote)
            .on_enter(Door::Open, move || remote.lock().unwrap().push("remote"));
        door.for_target(Target::Authority)
            .on_enter(Door::Open, move || writer.lock().unwrap().push("authority"));

        door.transition_to(Door::Open);
        assert_eq!(*log.lock().unwrap(), vec!["authority"]);
    }

    #[test]
    fn state_changed_receives_typed_states() {
        let clock = ManualClock::new(0.0);
        let mut door = machine(&clock);
        let seen: Arc<Mutex<Vec<(Door, Door)>>> = Arc::default();
        let sink = Arc::clone(&seen);
        door.on_state_changed(move |from, to| sink.lock().unwrap().push((from, to)));

        door.transition_to(Door::Opening);
        door.transition_to(Door::Open);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(Door::Closed, Door::Opening), (Door::Opening, Door::Open)]
        );
    }

    #[test]
    fn conditional_rule_without_predicate_fires_on_next_tick() {
        let clock = ManualClock::new(0.0);
        let mut door = machine(&clock);
        door.add_state_transition(Door::Closed, Door::Locked, None::<fn() -> bool>);
        assert_eq!(door.conditional_rule_count(), 1);

        door.tick(0.016);
        assert_eq!(door.get_current_state(), Door::Locked);
    }

    #[test]
    fn apply_replicated_state_rejects_unknown_states() {
        let clock = ManualClock::new(0.0);
        let mut reader = StateMachine::builder()
            .default_state(Door::Closed)
            .config(MachineConfig::replicated())
            .clock(clock.clone())
            .authority(false)
            .build()
            .unwrap();

        let mut payload = reader.replicated_state();
        payload.change_count = 1;
        payload.records[0].state = 99;

        let err = reader.apply_replicated_state(payload).unwrap_err();
        assert!(matches!(err, ReplicationError::State(_)));
        assert_eq!(reader.change_count(), 0);
    }

    #[test]
    fn set_default_state_updates_fallback_decode() {
        let clock = ManualClock::new(0.0);
        let mut door = machine(&clock);
        assert!(door.set_default_state(Door::Locked));
        assert_eq!(door.get_current_state(), Door::Locked);
        assert_eq!(door.get_last_state(), Door::Locked);
    }
}
