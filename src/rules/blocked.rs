//! States that may never be committed to.

use std::collections::BTreeSet;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockedStates {
    states: BTreeSet<i32>,
}

impl BlockedStates {
    /// Returns `true` if the state was not blocked before.
    pub fn block(&mut self, state: i32) -> bool {
        self.states.insert(state)
    }

    /// Returns `true` if the state was blocked before.
    pub fn unblock(&mut self, state: i32) -> bool {
        self.states.remove(&state)
    }

    pub fn contains(&self, state: i32) -> bool {
        self.states.contains(&state)
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}
