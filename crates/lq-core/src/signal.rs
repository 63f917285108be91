//! Signal identities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one signal slot in the generated engine.
///
/// All producers share a single namespace; the engine's signal array is
/// sized to one past the largest identity in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalId(pub u32);

impl SignalId {
    /// Largest usable identity. One past it still fits a `u32` signal count.
    pub const MAX: SignalId = SignalId(u32::MAX - 1);

    /// The raw index.
    pub fn index(self) -> u32 {
        self.0
    }

    /// The identity after this one, or `None` past [`SignalId::MAX`].
    pub fn checked_next(self) -> Option<SignalId> {
        if self >= SignalId::MAX {
            return None;
        }
        Some(SignalId(self.0 + 1))
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SignalId {
    fn from(raw: u32) -> Self {
        SignalId(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_and_display() {
        let a = SignalId(3);
        assert!(Some(a) < a.checked_next());
        assert_eq!(a.checked_next().map(SignalId::index), Some(4));
        assert_eq!(a.to_string(), "3");
    }

    #[test]
    fn counter_stops_at_max() {
        assert_eq!(SignalId(u32::MAX - 2).checked_next(), Some(SignalId::MAX));
        assert_eq!(SignalId::MAX.checked_next(), None);
        assert_eq!(SignalId(u32::MAX).checked_next(), None);
    }

    #[test]
    fn serializes_as_bare_integer() {
        let json = serde_json::to_string(&SignalId(7)).unwrap();
        assert_eq!(json, "7");
    }
}
