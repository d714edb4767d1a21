//! Identity types for anchors, edges, scopes and pulses

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the ID as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_id!(
    /// Name of a point in overlay space, stable within a scope
    ///
    /// Layout providers tag regions with this identifier; edges and pulses
    /// refer to anchors by it.
    AnchorId
);

string_id!(
    /// Identifier of a configured flow edge
    EdgeId
);

string_id!(
    /// Identifier of a declared sub-region that bounds anchor discovery
    ScopeId
);

impl EdgeId {
    /// Conventional edge id for a `from -> to` pair
    pub fn between(from: &AnchorId, to: &AnchorId) -> Self {
        Self(format!("{}->{}", from, to))
    }
}

/// Unique identifier for one emitted pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PulseId(pub u64);

impl PulseId {
    /// Create a new pulse ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PulseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pulse:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_id() {
        let id = PulseId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{}", id), "pulse:42");
    }

    #[test]
    fn test_anchor_id() {
        let id = AnchorId::new("WH");
        assert_eq!(id.as_str(), "WH");
        assert_eq!(format!("{}", id), "WH");
        assert_eq!(id, "WH");
    }

    #[test]
    fn test_edge_id_between() {
        let id = EdgeId::between(&AnchorId::from("A"), &AnchorId::from("B"));
        assert_eq!(id.as_str(), "A->B");
    }

    #[test]
    fn test_ids_deserialize_transparently() {
        let id: ScopeId = ron::from_str("\"board\"").unwrap();
        assert_eq!(id, ScopeId::new("board"));
    }
}
