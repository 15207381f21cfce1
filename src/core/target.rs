//! Role targeting for callbacks.

use serde::{Deserialize, Serialize};

/// Which roles a callback runs on.
///
/// One shared registration set can drive the writer and the readers
/// differently, e.g. gameplay logic on the authority and effects on
/// remotes only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// Only on the role that commits transitions.
    Authority,
    /// Only on pure readers.
    Remote,
    #[default]
    Everyone,
}

impl Target {
    /// Whether a callback with this target runs for the given role.
    pub fn matches(self, has_authority: bool) -> bool {
        match self {
            Self::Authority => has_authority,
            Self::Remote => !has_authority,
            Self::Everyone => true,
        }
    }
}
