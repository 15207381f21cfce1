//! The untyped engine behind [`StateMachine`](crate::StateMachine).
//!
//! States are plain `i32` identifiers here. The engine owns the buffer, the
//! observer cursor, the callback registry and the rules, and implements the
//! per-tick driver:
//!
//! 1. Catch up on any committed-but-unprocessed transitions.
//! 2. Run `on_update` callbacks for the current state.
//! 3. Report countdown progress to `on_transition_tick` callbacks.
//! 4. On the authority only: conditional rules, then timed rules, then the
//!    delayed transition. The first one that fires commits and ends the
//!    tick.
//!
//! Every commit is followed by a reconciliation on the committing replica,
//! so the writer observes its own transitions immediately.

use super::config::{MachineConfig, ReplicationMode};
use crate::callbacks::{invoke_guarded, CallbackRegistry, DispatchContext, Phase};
use crate::core::{MachineId, ReplayEntry, ReplicatedState, ReplicationError, StateBuffer, StateRecord};
use crate::host::{AuthorityOracle, Clock, TickSource};
use crate::rules::{Condition, Countdown, TimedTransitionRule, TransitionRules};
use tracing::{debug, trace, warn};

pub struct Engine {
    id: MachineId,
    config: MachineConfig,
    clock: Box<dyn Clock>,
    authority: Box<dyn AuthorityOracle>,
    tick_source: Box<dyn TickSource>,
    buffer: StateBuffer,
    local_change_count: u64,
    observed: i32,
    callbacks: CallbackRegistry,
    rules: TransitionRules,
    destroyed: bool,
}

impl Engine {
    /// Create an engine sitting in `default_state` and subscribe it to the
    /// tick source.
    ///
    /// `config` is expected to be validated; an out-of-range capacity is
    /// clamped by the buffer.
    pub fn new(
        config: MachineConfig,
        default_state: i32,
        clock: Box<dyn Clock>,
        authority: Box<dyn AuthorityOracle>,
        mut tick_source: Box<dyn TickSource>,
    ) -> Self {
        let id = MachineId::new();
        let buffer = StateBuffer::new(config.capacity, default_state, clock.now());
        tick_source.subscribe(id);
        debug!(
            machine = %id,
            default_state,
            capacity = buffer.capacity(),
            mode = ?config.mode,
            "state machine created"
        );
        Self {
            id,
            config,
            clock,
            authority,
            tick_source,
            buffer,
            local_change_count: 0,
            observed: default_state,
            callbacks: CallbackRegistry::new(),
            rules: TransitionRules::new(),
            destroyed: false,
        }
    }

    pub fn id(&self) -> MachineId {
        self.id
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn has_authority(&self) -> bool {
        match self.config.mode {
            ReplicationMode::Local => true,
            ReplicationMode::Replicated => self.authority.has_authority(),
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn current(&self) -> i32 {
        self.buffer.current()
    }

    pub fn previous(&self) -> i32 {
        self.buffer.previous()
    }

    /// Target of the pending delayed transition, or the current state.
    pub fn queued(&self) -> i32 {
        self.rules
            .delayed()
            .target()
            .unwrap_or_else(|| self.buffer.current())
    }

    pub fn change_count(&self) -> u64 {
        self.buffer.change_count()
    }

    pub fn local_change_count(&self) -> u64 {
        self.local_change_count
    }

    pub fn records(&self) -> &[StateRecord] {
        self.buffer.records()
    }

    pub fn pending_delay(&self) -> Option<&Countdown> {
        self.rules.delayed().countdown()
    }

    pub fn is_blocked(&self, state: i32) -> bool {
        self.rules.is_blocked(state)
    }

    pub fn rules(&self) -> &TransitionRules {
        &self.rules
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut CallbackRegistry {
        &mut self.callbacks
    }

    fn context(&self) -> DispatchContext {
        DispatchContext {
            machine: self.id,
            has_authority: self.has_authority(),
        }
    }

    fn require_authority(&self, operation: &'static str) -> bool {
        if self.destroyed {
            warn!(machine = %self.id, operation, "ignoring call on destroyed state machine");
            return false;
        }
        if !self.has_authority() {
            warn!(machine = %self.id, operation, "refusing mutation without authority");
            return false;
        }
        true
    }

    /// Refill the buffer with a new default. Only possible before the
    /// first transition.
    pub fn set_default_state(&mut self, state: i32) -> bool {
        if self.buffer.change_count() > 0 {
            warn!(
                machine = %self.id,
                state,
                change_count = self.buffer.change_count(),
                "default state can only be set before the first transition"
            );
            return false;
        }
        let now = self.clock.now();
        self.buffer.fill(state, now);
        self.observed = state;
        self.rules.arm_timers(state, now);
        true
    }

    pub fn transition_to(&mut self, state: i32) -> bool {
        self.require_authority("transition_to") && self.commit(state)
    }

    /// Schedule a transition `delay` seconds from now, replacing any
    /// pending one.
    pub fn transition_to_after(&mut self, state: i32, delay: f64) -> bool {
        if !self.require_authority("transition_to_after") {
            return false;
        }
        if self.rules.is_blocked(state) || state == self.buffer.current() {
            return false;
        }
        if delay <= 0.0 {
            return self.commit(state);
        }
        let now = self.clock.now();
        self.rules.set_delayed(Countdown::new(state, now, delay));
        debug!(machine = %self.id, target = state, delay, "delayed transition scheduled");
        true
    }

    pub fn cancel_delayed_transitions(&mut self) -> bool {
        self.require_authority("cancel_delayed_transitions") && self.rules.cancel_delayed()
    }

    /// Forbid `state` as a target. If the machine currently sits in it,
    /// fall back to the nearest earlier state that is allowed.
    pub fn block(&mut self, state: i32) -> bool {
        if !self.require_authority("block") {
            return false;
        }
        self.rules.blocked_mut().block(state);
        if self.buffer.current() != state {
            return true;
        }

        match self
            .buffer
            .fallback_for(state, |candidate| self.rules.is_blocked(candidate))
        {
            Some(fallback) => {
                debug!(machine = %self.id, blocked = state, fallback, "leaving blocked state");
                self.commit(fallback);
            }
            None => {
                debug!(
                    machine = %self.id,
                    blocked = state,
                    "no fallback in history, staying in blocked state"
                );
            }
        }
        true
    }

    pub fn unblock(&mut self, state: i32) -> bool {
        self.require_authority("unblock") && self.rules.blocked_mut().unblock(state)
    }

    pub fn add_conditional_rule(&mut self, from: i32, to: i32, condition: Condition) {
        self.rules.add_conditional(from, to, condition);
    }

    /// Register a timed rule. When the machine already sits in `from`, its
    /// countdown starts now rather than at the time `from` was entered.
    pub fn add_timed_rule(&mut self, from: i32, to: i32, duration: f64) {
        let rule = TimedTransitionRule { from, to, duration };
        self.rules.add_timed(rule);
        if self.buffer.current() == from {
            let now = self.clock.now();
            self.rules.arm_timer(&rule, now);
        }
    }

    /// Append `state` to the log. Rejects the current state and blocked
    /// states without any side effect.
    fn commit(&mut self, state: i32) -> bool {
        if self.rules.is_blocked(state) {
            debug!(machine = %self.id, state, "transition to blocked state ignored");
            return false;
        }
        let from = self.buffer.current();
        let now = self.clock.now();
        if !self.buffer.commit(state, now) {
            return false;
        }
        self.rules.cancel_delayed();
        debug!(
            machine = %self.id,
            from,
            to = state,
            change_count = self.buffer.change_count(),
            "transition committed"
        );
        self.reconcile();
        true
    }

    /// Replay every committed transition this replica has not dispatched
    /// yet. Returns the number of transitions dispatched.
    pub fn reconcile(&mut self) -> usize {
        if self.local_change_count == self.buffer.change_count() {
            return 0;
        }
        let entries = self.buffer.reconcile(
            self.local_change_count,
            self.observed,
            self.config.retroactive_horizon,
            self.clock.now(),
        );
        self.local_change_count = self.buffer.change_count();
        self.observed = self.buffer.current();

        if !entries.is_empty() {
            debug!(
                machine = %self.id,
                count = entries.len(),
                change_count = self.local_change_count,
                "replaying transitions"
            );
        }
        for entry in &entries {
            self.dispatch(entry);
        }
        // A skipped self transition still re-entered the current state.
        if entries.last().map(|entry| entry.to) != Some(self.observed) {
            let entered_at = self.buffer.current_record().timestamp;
            self.rules.arm_timers(self.observed, entered_at);
        }
        entries.len()
    }

    fn dispatch(&mut self, entry: &ReplayEntry) {
        let ctx = self.context();
        self.callbacks.dispatch_transition(&ctx, entry.from, entry.to);
        let armed = self.rules.arm_timers(entry.to, entry.timestamp);
        if armed > 0 {
            trace!(machine = %self.id, state = entry.to, armed, "timed rules armed");
        }
    }

    /// Adopt the replicated buffer and counter published by the authority
    /// without dispatching anything. Returns `true` if the payload was
    /// adopted; the next `tick` or `late_tick` catches up on it.
    pub fn write_replicated(&mut self, payload: ReplicatedState) -> Result<bool, ReplicationError> {
        if self.destroyed {
            return Ok(false);
        }
        if self.has_authority() {
            warn!(machine = %self.id, "authority ignores replicated state");
            return Ok(false);
        }
        let restored = self.buffer.restore(payload).inspect_err(|err| {
            warn!(machine = %self.id, error = %err, "rejecting replicated state");
        })?;
        if !restored {
            debug!(machine = %self.id, "stale replicated state ignored");
        }
        Ok(restored)
    }

    /// [`write_replicated`](Self::write_replicated) followed by an
    /// immediate catch-up. Returns the number of transitions dispatched.
    pub fn apply_replicated(&mut self, payload: ReplicatedState) -> Result<usize, ReplicationError> {
        if !self.write_replicated(payload)? {
            return Ok(0);
        }
        Ok(self.reconcile())
    }

    pub fn replicated_state(&self) -> ReplicatedState {
        self.buffer.snapshot()
    }

    /// Run one frame of the driver.
    pub fn tick(&mut self, dt: f64) {
        if self.destroyed {
            return;
        }
        self.reconcile();

        let ctx = self.context();
        let now = self.clock.now();
        let current = self.buffer.current();

        self.callbacks.dispatch_update(&ctx, current, dt);

        let countdowns: Vec<(i32, f32)> = self
            .rules
            .armed()
            .iter()
            .chain(self.rules.delayed().countdown())
            .map(|countdown| (countdown.target, countdown.progress(now)))
            .collect();
        for (target, progress) in countdowns {
            self.callbacks.dispatch_progress(&ctx, current, target, progress);
        }

        if !ctx.has_authority {
            return;
        }

        let satisfied = self.rules.first_satisfied(current, |rule| {
            let mut holds = false;
            invoke_guarded(&ctx, Phase::Condition, rule.from, rule.to, || {
                holds = rule.condition.check();
            });
            holds
        });
        if let Some(target) = satisfied {
            trace!(machine = %self.id, from = current, to = target, "conditional rule satisfied");
            self.commit(target);
            return;
        }

        if let Some(countdown) = self.rules.take_expired_timer(now) {
            trace!(machine = %self.id, from = current, to = countdown.target, "timed rule expired");
            self.commit(countdown.target);
            return;
        }

        if let Some(countdown) = self.rules.delayed_mut().take_expired(now) {
            trace!(machine = %self.id, from = current, to = countdown.target, "delayed transition expired");
            self.commit(countdown.target);
        }
    }

    /// Late-frame hook: only catches up on replicated changes.
    pub fn late_tick(&mut self) {
        if !self.destroyed {
            self.reconcile();
        }
    }

    /// Unsubscribe from the tick source and drop every registration.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.tick_source.unsubscribe(self.id);
        self.callbacks.clear();
        self.rules.clear();
        self.destroyed = true;
        debug!(machine = %self.id, "state machine destroyed");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.destroy();
    }
}
