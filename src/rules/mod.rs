//! Automatic transition rules and blocked-state overrides.
//!
//! Three sources can move a machine on their own, evaluated in this order
//! on every authority tick:
//!
//! 1. Conditional rules for the current state, in registration order; the
//!    first true predicate wins.
//! 2. Timed rules for the current state; the first expired countdown wins.
//! 3. The single explicit delayed transition, if it expired.
//!
//! Only one of them fires per tick. Blocked states are rejected as targets
//! regardless of which source proposed them.

mod blocked;
mod condition;
mod timed;

pub use blocked::BlockedStates;
pub use condition::Condition;
pub use timed::{Countdown, DelayedTransition, TimedTransitionRule};

use std::collections::HashMap;

/// Transition `from -> to` taken as soon as `condition` holds.
#[derive(Debug)]
pub struct ConditionalTransitionRule {
    pub from: i32,
    pub to: i32,
    pub condition: Condition,
}

/// All rule state owned by one machine.
#[derive(Debug, Default)]
pub struct TransitionRules {
    conditional: HashMap<i32, Vec<ConditionalTransitionRule>>,
    timed: HashMap<i32, Vec<TimedTransitionRule>>,
    armed: Vec<Countdown>,
    delayed: DelayedTransition,
    blocked: BlockedStates,
}

impl TransitionRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_conditional(&mut self, from: i32, to: i32, condition: Condition) {
        self.conditional
            .entry(from)
            .or_default()
            .push(ConditionalTransitionRule {
                from,
                to,
                condition,
            });
    }

    pub fn add_timed(&mut self, rule: TimedTransitionRule) {
        self.timed.entry(rule.from).or_default().push(rule);
    }

    pub fn conditional_count(&self) -> usize {
        self.conditional.values().map(Vec::len).sum()
    }

    pub fn timed_count(&self) -> usize {
        self.timed.values().map(Vec::len).sum()
    }

    /// Target of the first conditional rule for `current` that `holds`
    /// accepts. The engine passes a guarded predicate check here.
    pub fn first_satisfied(
        &self,
        current: i32,
        mut holds: impl FnMut(&ConditionalTransitionRule) -> bool,
    ) -> Option<i32> {
        self.conditional
            .get(&current)?
            .iter()
            .find(|rule| holds(rule))
            .map(|rule| rule.to)
    }

    /// Start one countdown per timed rule leaving `state`, replacing any
    /// countdowns of the previous state.
    pub fn arm_timers(&mut self, state: i32, started_at: f64) -> usize {
        self.armed = self
            .timed
            .get(&state)
            .map(|rules| {
                rules
                    .iter()
                    .map(|rule| Countdown::new(rule.to, started_at, rule.duration))
                    .collect()
            })
            .unwrap_or_default();
        self.armed.len()
    }

    /// Start the countdown of a single, newly registered rule.
    pub fn arm_timer(&mut self, rule: &TimedTransitionRule, started_at: f64) {
        self.armed
            .push(Countdown::new(rule.to, started_at, rule.duration));
    }

    pub fn armed(&self) -> &[Countdown] {
        &self.armed
    }

    /// Remove and return the first expired countdown, so it fires once.
    pub fn take_expired_timer(&mut self, now: f64) -> Option<Countdown> {
        let index = self.armed.iter().position(|c| c.is_expired(now))?;
        Some(self.armed.remove(index))
    }

    pub fn delayed(&self) -> &DelayedTransition {
        &self.delayed
    }

    pub fn delayed_mut(&mut self) -> &mut DelayedTransition {
        &mut self.delayed
    }

    pub fn set_delayed(&mut self, countdown: Countdown) {
        self.delayed = DelayedTransition::Timer(countdown);
    }

    /// Returns `true` if a delayed transition was pending.
    pub fn cancel_delayed(&mut self) -> bool {
        std::mem::take(&mut self.delayed).is_pending()
    }

    pub fn blocked_mut(&mut self) -> &mut BlockedStates {
        &mut self.blocked
    }

    pub fn is_blocked(&self, state: i32) -> bool {
        self.blocked.contains(state)
    }

    pub fn clear(&mut self) {
        self.conditional.clear();
        self.timed.clear();
        self.armed.clear();
        self.delayed = DelayedTransition::None;
        self.blocked.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_registered_satisfied_rule_wins() {
        let mut rules = TransitionRules::new();
        rules.add_conditional(0, 1, Condition::new(|| false));
        rules.add_conditional(0, 2, Condition::always());
        rules.add_conditional(0, 3, Condition::always());

        let check = |rule: &ConditionalTransitionRule| rule.condition.check();
        assert_eq!(rules.first_satisfied(0, check), Some(2));
        assert_eq!(rules.first_satisfied(1, check), None);
        assert_eq!(rules.conditional_count(), 3);
    }

    #[test]
    fn arming_replaces_previous_countdowns() {
        let mut rules = TransitionRules::new();
        rules.add_timed(TimedTransitionRule {
            from: 0,
            to: 1,
            duration: 1.0,
        });
        rules.add_timed(TimedTransitionRule {
            from: 1,
            to: 2,
            duration: 0.5,
        });

        assert_eq!(rules.arm_timers(0, 0.0), 1);
        assert_eq!(rules.armed()[0].target, 1);

        assert_eq!(rules.arm_timers(1, 2.0), 1);
        assert_eq!(rules.armed()[0].target, 2);

        assert_eq!(rules.arm_timers(2, 3.0), 0);
        assert!(rules.armed().is_empty());
    }

    #[test]
    fn expired_timer_fires_once() {
        let mut rules = TransitionRules::new();
        rules.add_timed(TimedTransitionRule {
            from: 0,
            to: 1,
            duration: 1.0,
        });
        rules.arm_timers(0, 0.0);

        assert!(rules.take_expired_timer(0.5).is_none());
        assert_eq!(rules.take_expired_timer(1.0).map(|c| c.target), Some(1));
        assert!(rules.take_expired_timer(5.0).is_none());
    }

    #[test]
    fn cancel_reports_whether_anything_was_pending() {
        let mut rules = TransitionRules::new();
        assert!(!rules.cancel_delayed());
        rules.set_delayed(Countdown::new(2, 0.0, 1.0));
        assert_eq!(rules.delayed().target(), Some(2));
        assert!(rules.cancel_delayed());
        assert!(!rules.delayed().is_pending());
    }

    #[test]
    fn clear_drops_everything() {
        let mut rules = TransitionRules::new();
        rules.add_conditional(0, 1, Condition::always());
        rules.add_timed(TimedTransitionRule {
            from: 0,
            to: 1,
            duration: 1.0,
        });
        rules.arm_timers(0, 0.0);
        rules.set_delayed(Countdown::new(1, 0.0, 1.0));
        rules.blocked_mut().block(3);

        rules.clear();
        assert_eq!(rules.conditional_count(), 0);
        assert_eq!(rules.timed_count(), 0);
        assert!(rules.armed().is_empty());
        assert!(!rules.delayed().is_pending());
        assert!(!rules.is_blocked(3));
    }
}
