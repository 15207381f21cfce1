//! State identity and checked enum conversion.
//!
//! The engine stores every state as an opaque `i32` and never assigns
//! meaning to the value. Callers work with their own enums through the
//! [`StateId`] trait, which converts in both directions without any
//! memory reinterpretation.

use std::fmt::Debug;
use thiserror::Error;

/// Trait for enums usable as machine states.
///
/// The contract is value identity: `S::from_i32(s.to_i32()) == Some(s)`
/// for every variant listed in [`StateId::variants`]. Machines check this
/// for every variant when they are constructed, so a broken implementation
/// is reported as a [`StateError`] up front instead of desynchronising
/// replicas later.
///
/// Implement it by hand or derive it with [`state_enum!`](crate::state_enum).
///
/// # Example
///
/// ```rust
/// use retrostate::core::StateId;
///
/// #[derive(Clone, Copy, PartialEq, Debug)]
/// enum Door {
///     Closed,
///     Open,
/// }
///
/// impl StateId for Door {
///     fn to_i32(self) -> i32 {
///         self as i32
///     }
///
///     fn from_i32(value: i32) -> Option<Self> {
///         match value {
///             0 => Some(Self::Closed),
///             1 => Some(Self::Open),
///             _ => None,
///         }
///     }
///
///     fn variants() -> &'static [Self] {
///         &[Self::Closed, Self::Open]
///     }
/// }
///
/// assert_eq!(Door::from_i32(Door::Open.to_i32()), Some(Door::Open));
/// assert!(Door::verify_round_trip().is_ok());
/// ```
pub trait StateId: Copy + PartialEq + Debug + Send + Sync + 'static {
    /// Encode this variant as its 32-bit identifier.
    fn to_i32(self) -> i32;

    /// Decode an identifier, returning `None` for values outside the enum.
    fn from_i32(value: i32) -> Option<Self>;

    /// Every valid variant, used to validate the conversion pair.
    fn variants() -> &'static [Self];

    /// Human readable name for logs. Defaults to the `Debug` rendering.
    fn name(&self) -> String {
        format!("{self:?}")
    }

    /// Check that every variant survives `to_i32` followed by `from_i32`.
    fn verify_round_trip() -> Result<(), StateError> {
        for &variant in Self::variants() {
            let id = variant.to_i32();
            if Self::from_i32(id) != Some(variant) {
                return Err(StateError::RoundTrip {
                    type_name: std::any::type_name::<Self>(),
                    variant: variant.name(),
                    id,
                });
            }
        }
        Ok(())
    }
}

/// Errors raised while converting between enums and state identifiers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StateError {
    #[error("Value {value} is not a variant of {type_name}")]
    UnknownState {
        type_name: &'static str,
        value: i32,
    },

    #[error("Variant {variant} of {type_name} encodes to {id} but does not decode back")]
    RoundTrip {
        type_name: &'static str,
        variant: String,
        id: i32,
    },
}

/// Decode `value` into `S`, reporting the offending value on failure.
pub fn decode<S: StateId>(value: i32) -> Result<S, StateError> {
    S::from_i32(value).ok_or(StateError::UnknownState {
        type_name: std::any::type_name::<S>(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Debug)]
    enum TestState {
        Idle,
        Run,
        Jump,
    }

    impl StateId for TestState {
        fn to_i32(self) -> i32 {
            self as i32
        }

        fn from_i32(value: i32) -> Option<Self> {
            match value {
                0 => Some(Self::Idle),
                1 => Some(Self::Run),
                2 => Some(Self::Jump),
                _ => None,
            }
        }

        fn variants() -> &'static [Self] {
            &[Self::Idle, Self::Run, Self::Jump]
        }
    }

    #[derive(Clone, Copy, PartialEq, Debug)]
    enum Broken {
        A,
        B,
    }

    impl StateId for Broken {
        fn to_i32(self) -> i32 {
            self as i32
        }

        fn from_i32(_value: i32) -> Option<Self> {
            Some(Self::A)
        }

        fn variants() -> &'static [Self] {
            &[Self::A, Self::B]
        }
    }

    #[test]
    fn round_trip_holds_for_every_variant() {
        assert!(TestState::verify_round_trip().is_ok());
        for &state in TestState::variants() {
            assert_eq!(TestState::from_i32(state.to_i32()), Some(state));
        }
    }

    #[test]
    fn broken_conversion_is_reported() {
        let err = Broken::verify_round_trip().unwrap_err();
        assert!(matches!(err, StateError::RoundTrip { id: 1, .. }));
    }

    #[test]
    fn decode_rejects_values_outside_the_enum() {
        assert_eq!(decode::<TestState>(2), Ok(TestState::Jump));
        assert!(matches!(
            decode::<TestState>(42),
            Err(StateError::UnknownState { value: 42, .. })
        ));
    }

    #[test]
    fn name_defaults_to_debug() {
        assert_eq!(TestState::Run.name(), "Run");
    }
}
