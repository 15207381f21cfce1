//! Collaborators supplied by the hosting engine.
//!
//! The machine never reads real time, never decides its own role and never
//! schedules itself. Those concerns come in through three small traits
//! injected at construction:
//!
//! - [`Clock`]: monotonic shared time in seconds
//! - [`AuthorityOracle`]: whether this replica may write
//! - [`TickSource`]: the per-tick hook the machine subscribes to
//!
//! Deterministic implementations ([`ManualClock`], [`SharedAuthority`],
//! [`ManualTickSource`]) make lock-step tests trivial.

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use crate::core::MachineId;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Answers whether the local replica is the single writer.
pub trait AuthorityOracle: Send + Sync {
    fn has_authority(&self) -> bool;
}

impl AuthorityOracle for bool {
    fn has_authority(&self) -> bool {
        *self
    }
}

impl<A: AuthorityOracle + ?Sized> AuthorityOracle for Arc<A> {
    fn has_authority(&self) -> bool {
        (**self).has_authority()
    }
}

/// Oracle for a process that is both writer and reader.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalAuthority;

impl AuthorityOracle for LocalAuthority {
    fn has_authority(&self) -> bool {
        true
    }
}

/// Authority flag that the host can flip at runtime, e.g. on ownership
/// transfer.
#[derive(Clone, Debug, Default)]
pub struct SharedAuthority {
    flag: Arc<AtomicBool>,
}

impl SharedAuthority {
    pub fn new(has_authority: bool) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(has_authority)),
        }
    }

    pub fn set(&self, has_authority: bool) {
        self.flag.store(has_authority, Ordering::SeqCst);
    }
}

impl AuthorityOracle for SharedAuthority {
    fn has_authority(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Per-tick hook a machine registers with for its lifetime.
///
/// The host calls [`StateMachine::tick`](crate::StateMachine::tick) for
/// every subscribed machine once per frame.
pub trait TickSource: Send {
    fn subscribe(&mut self, machine: MachineId);
    fn unsubscribe(&mut self, machine: MachineId);
}

/// Tick source for hosts that drive machines directly.
impl TickSource for () {
    fn subscribe(&mut self, _machine: MachineId) {}
    fn unsubscribe(&mut self, _machine: MachineId) {}
}

/// Shared subscription list for manual stepping.
#[derive(Clone, Debug, Default)]
pub struct ManualTickSource {
    subscribers: Arc<Mutex<BTreeSet<MachineId>>>,
}

impl ManualTickSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self, machine: MachineId) -> bool {
        self.lock().contains(&machine)
    }

    pub fn subscribers(&self) -> Vec<MachineId> {
        self.lock().iter().copied().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<MachineId>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl TickSource for ManualTickSource {
    fn subscribe(&mut self, machine: MachineId) {
        self.lock().insert(machine);
    }

    fn unsubscribe(&mut self, machine: MachineId) {
        self.lock().remove(&machine);
    }
}
