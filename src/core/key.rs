//! Packed `(from, to)` keys for pair-scoped lookups.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Two state identifiers packed into one `u64`.
///
/// The target occupies the high 32 bits and the source the low 32 bits:
/// `(to as u64) << 32 | (from as u32 as u64)`.
///
/// # Example
///
/// ```rust
/// use retrostate::core::TransitionKey;
///
/// let key = TransitionKey::pack(-1, 7);
/// assert_eq!(key.separate(), (-1, 7));
/// assert_eq!(key.raw(), (7u64 << 32) | 0xFFFF_FFFF);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionKey(u64);

impl TransitionKey {
    pub fn pack(from: i32, to: i32) -> Self {
        Self(((to as u32 as u64) << 32) | (from as u32 as u64))
    }

    /// Inverse of [`TransitionKey::pack`], returning `(from, to)`.
    pub fn separate(self) -> (i32, i32) {
        (self.from_state(), self.to_state())
    }

    pub fn from_state(self) -> i32 {
        self.0 as u32 as i32
    }

    pub fn to_state(self) -> i32 {
        (self.0 >> 32) as u32 as i32
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TransitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransitionKey({} -> {})", self.from_state(), self.to_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separate_inverts_pack() {
        for &(from, to) in &[(0, 0), (1, 2), (-5, 9), (i32::MIN, i32::MAX), (-1, -1)] {
            assert_eq!(TransitionKey::pack(from, to).separate(), (from, to));
        }
    }

    #[test]
    fn direction_matters() {
        assert_ne!(TransitionKey::pack(1, 2), TransitionKey::pack(2, 1));
    }

    #[test]
    fn layout_puts_target_in_high_bits() {
        assert_eq!(TransitionKey::pack(3, 1).raw(), (1u64 << 32) | 3);
    }

    #[test]
    fn negative_source_does_not_leak_into_target() {
        let key = TransitionKey::pack(-1, 0);
        assert_eq!(key.to_state(), 0);
        assert_eq!(key.from_state(), -1);
    }
}
