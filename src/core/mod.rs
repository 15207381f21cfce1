//! Core value types of the replicated state machine.
//!
//! This module contains the leaf building blocks:
//! - State identity via the `StateId` trait
//! - Packed `(from, to)` keys for pair-scoped maps
//! - The bounded state buffer and its reconciliation algorithm
//! - Role targeting for callbacks
//! - Machine identity for diagnostics
//!
//! Nothing in here performs I/O or talks to the host; the clock time is
//! always passed in by the caller.

mod buffer;
mod id;
mod key;
mod state;
mod target;

pub use buffer::{
    ReplayEntry, ReplicatedState, ReplicationError, StateBuffer, StateRecord, MAX_CAPACITY,
};
pub use id::MachineId;
pub use key::TransitionKey;
pub use state::{decode, StateError, StateId};
pub use target::Target;
