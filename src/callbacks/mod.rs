//! Callback registration and ordered, failure-isolated dispatch.
//!
//! For a single `(from, to)` transition callbacks always run in this order:
//!
//! 1. `on_exit(from)`
//! 2. `on_transition_once(from, to)`
//! 3. `on_enter(to)`
//! 4. `on_state_changed`
//!
//! each group in registration order. A callback that panics is logged and
//! skipped; the rest of the batch still runs.

mod boundary;
mod registry;

pub use boundary::{invoke_guarded, DispatchContext, Phase};
pub use registry::{
    CallbackRegistry, ChangeCallback, ProgressCallback, StateCallback, UpdateCallback,
};
