//! Per-state and per-pair callback collections.

use super::boundary::{invoke_guarded, DispatchContext, Phase};
use crate::core::{Target, TransitionKey};
use std::collections::HashMap;

/// Callback run on entering or leaving a state, or once per transition.
pub type StateCallback = Box<dyn FnMut() + Send>;

/// Callback run every tick with the tick delta in seconds.
pub type UpdateCallback = Box<dyn FnMut(f64) + Send>;

/// Callback run every tick while a timed transition counts down, with the
/// normalized progress in `0.0..=1.0`.
pub type ProgressCallback = Box<dyn FnMut(f32) + Send>;

/// Callback run for every dispatched `(from, to)` transition.
pub type ChangeCallback = Box<dyn FnMut(i32, i32) + Send>;

struct Registered<F> {
    target: Target,
    callback: F,
}

/// Callback storage for one machine.
///
/// Each list keeps registration order, and every callback carries a
/// [`Target`] consulted against the role at dispatch time.
#[derive(Default)]
pub struct CallbackRegistry {
    enter: HashMap<i32, Vec<Registered<StateCallback>>>,
    exit: HashMap<i32, Vec<Registered<StateCallback>>>,
    update: HashMap<i32, Vec<Registered<UpdateCallback>>>,
    once: HashMap<TransitionKey, Vec<Registered<StateCallback>>>,
    progress: HashMap<TransitionKey, Vec<Registered<ProgressCallback>>>,
    changed: Vec<Registered<ChangeCallback>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_enter(&mut self, state: i32, target: Target, callback: StateCallback) {
        self.enter
            .entry(state)
            .or_default()
            .push(Registered { target, callback });
    }

    pub fn on_exit(&mut self, state: i32, target: Target, callback: StateCallback) {
        self.exit
            .entry(state)
            .or_default()
            .push(Registered { target, callback });
    }

    pub fn on_update(&mut self, state: i32, target: Target, callback: UpdateCallback) {
        self.update
            .entry(state)
            .or_default()
            .push(Registered { target, callback });
    }

    pub fn on_transition_once(
        &mut self,
        from: i32,
        to: i32,
        target: Target,
        callback: StateCallback,
    ) {
        self.once
            .entry(TransitionKey::pack(from, to))
            .or_default()
            .push(Registered { target, callback });
    }

    pub fn on_transition_tick(
        &mut self,
        from: i32,
        to: i32,
        target: Target,
        callback: ProgressCallback,
    ) {
        self.progress
            .entry(TransitionKey::pack(from, to))
            .or_default()
            .push(Registered { target, callback });
    }

    pub fn on_state_changed(&mut self, target: Target, callback: ChangeCallback) {
        self.changed.push(Registered { target, callback });
    }

    /// Run the callbacks of one transition: exits of `from`, then the
    /// pair callbacks, then enters of `to`, then the generic change hooks.
    pub fn dispatch_transition(&mut self, ctx: &DispatchContext, from: i32, to: i32) {
        if let Some(list) = self.exit.get_mut(&from) {
            run_all(ctx, Phase::Exit, from, to, list, |cb| cb());
        }
        if let Some(list) = self.once.get_mut(&TransitionKey::pack(from, to)) {
            run_all(ctx, Phase::Transition, from, to, list, |cb| cb());
        }
        if let Some(list) = self.enter.get_mut(&to) {
            run_all(ctx, Phase::Enter, from, to, list, |cb| cb());
        }
        run_all(ctx, Phase::StateChanged, from, to, &mut self.changed, |cb| {
            cb(from, to)
        });
    }

    pub fn dispatch_update(&mut self, ctx: &DispatchContext, state: i32, dt: f64) {
        if let Some(list) = self.update.get_mut(&state) {
            run_all(ctx, Phase::Update, state, state, list, |cb| cb(dt));
        }
    }

    pub fn dispatch_progress(&mut self, ctx: &DispatchContext, from: i32, to: i32, progress: f32) {
        if let Some(list) = self.progress.get_mut(&TransitionKey::pack(from, to)) {
            run_all(ctx, Phase::Progress, from, to, list, |cb| cb(progress));
        }
    }

    /// Total number of registered callbacks.
    pub fn len(&self) -> usize {
        fn count<K, F>(map: &HashMap<K, Vec<Registered<F>>>) -> usize {
            map.values().map(Vec::len).sum()
        }
        count(&self.enter)
            + count(&self.exit)
            + count(&self.update)
            + count(&self.once)
            + count(&self.progress)
            + self.changed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.enter.clear();
        self.exit.clear();
        self.update.clear();
        self.once.clear();
        self.progress.clear();
        self.changed.clear();
    }
}

fn run_all<F>(
    ctx: &DispatchContext,
    phase: Phase,
    from: i32,
    to: i32,
    list: &mut [Registered<F>],
    mut call: impl FnMut(&mut F),
) {
    for entry in list.iter_mut().filter(|e| e.target.matches(ctx.has_authority)) {
        invoke_guarded(ctx, phase, from, to, || call(&mut entry.callback));
    }
}
