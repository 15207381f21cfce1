//! Per-callback failure boundary.
//!
//! A panicking user callback must not take down the dispatch batch it runs
//! in. Every invocation goes through [`invoke_guarded`], which catches the
//! unwind, logs it with the machine and state context, and lets the caller
//! move on to the next callback.

use crate::core::MachineId;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Dispatch stage a callback belongs to, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Exit,
    Transition,
    Enter,
    StateChanged,
    Update,
    Progress,
    Condition,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Exit => "exit",
            Self::Transition => "transition",
            Self::Enter => "enter",
            Self::StateChanged => "state_changed",
            Self::Update => "update",
            Self::Progress => "progress",
            Self::Condition => "condition",
        };
        f.write_str(name)
    }
}

/// Where a dispatch is happening.
#[derive(Clone, Copy, Debug)]
pub struct DispatchContext {
    pub machine: MachineId,
    pub has_authority: bool,
}

/// Run `callback`, converting a panic into a logged `false`.
pub fn invoke_guarded<F>(ctx: &DispatchContext, phase: Phase, from: i32, to: i32, callback: F) -> bool
where
    F: FnOnce(),
{
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(()) => true,
        Err(payload) => {
            tracing::error!(
                machine = %ctx.machine,
                %phase,
                from,
                to,
                authority = ctx.has_authority,
                "user callback panicked: {}",
                panic_message(&*payload)
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
