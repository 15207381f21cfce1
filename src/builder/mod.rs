//! Builder API for ergonomic state machine construction.
//!
//! This module provides a fluent builder and the `state_enum!` macro for
//! creating machines with minimal boilerplate while keeping the enum
//! conversion checked.

pub mod error;
pub mod machine;
pub mod macros;

pub use error::BuildError;
pub use machine::StateMachineBuilder;

use crate::core::StateId;
use crate::machine::StateMachine;

/// Build a local machine with a system clock and no tick source.
///
/// # Example
///
/// ```
/// use retrostate::builder::local_machine;
/// use retrostate::state_enum;
///
/// state_enum! {
///     enum Light {
///         Off,
///         On,
///     }
/// }
///
/// let mut light = local_machine(Light::Off).unwrap();
/// assert!(light.transition_to(Light::On));
/// assert_eq!(light.get_current_state(), Light::On);
/// ```
pub fn local_machine<T: StateId>(default: T) -> Result<StateMachine<T>, BuildError> {
    StateMachineBuilder::new().default_state(default).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_enum;

    state_enum! {
        enum TestState {
            Start,
            Middle,
            End,
        }
    }

    #[test]
    fn local_machine_builds() {
        let mut machine = local_machine(TestState::Start).unwrap();

        assert!(machine.has_authority());
        assert!(machine.transition_to(TestState::Middle));
        assert!(machine.transition_to(TestState::End));
        assert_eq!(machine.get_last_state(), TestState::Middle);
    }
}
