//! Type-safe identifiers for protocol entities.
//!
//! Newtype wrappers keep the different correlation keys apart at compile
//! time: a network [`RequestId`] can never be passed where a [`ScriptId`]
//! is expected, and bridge [`CommandId`]s never collide with either.
//!
//! | Type | Origin | Purpose |
//! |------|--------|---------|
//! | [`RequestId`] | Inspected page | Correlates network events |
//! | [`ScriptId`] | Inspected page | Fetch key for script sources |
//! | [`FrameId`] | Inspected page | Frame owning a resource |
//! | [`CommandId`] | Local end | Bridge request/response correlation |
//! | [`NodeId`] | Local end | Index into the source tree |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// Opaque String Identifiers
// ============================================================================

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            #[inline]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the raw identifier.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

opaque_id!(
    /// Network request identifier assigned by the inspected page.
    ///
    /// Unique for the lifetime of one network exchange, but may be reused
    /// across navigations.
    RequestId
);

opaque_id!(
    /// Script identifier reported by `Debugger.scriptParsed`.
    ScriptId
);

opaque_id!(
    /// Frame identifier from the page resource tree.
    FrameId
);

// ============================================================================
// CommandId
// ============================================================================

/// Global counter for bridge command ids. Starts at 1.
static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier correlating a bridge command with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    /// Allocates the next command id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the numeric value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for CommandId {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// NodeId
// ============================================================================

/// Index of a node in a [`SourceTree`](crate::model::SourceTree).
///
/// Nodes are never evicted, so an id stays valid for the life of the
/// sources model that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The synthetic tree root.
    pub const ROOT: Self = Self(0);

    /// Returns `true` for the tree root.
    #[inline]
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.0 == 0
    }

    /// Returns the arena index.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_ids_are_unique() {
        let a = CommandId::next();
        let b = CommandId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_request_id_is_transparent_in_json() {
        let id = RequestId::new("1000.42");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"1000.42\"");

        let back: RequestId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn test_display() {
        assert_eq!(ScriptId::from("17").to_string(), "17");
        assert_eq!(NodeId::ROOT.to_string(), "node#0");
        assert!(NodeId::ROOT.is_root());
    }
}
