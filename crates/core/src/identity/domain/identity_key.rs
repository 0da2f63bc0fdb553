use std::fmt;

use serde::{Serialize, Serializer};

use crate::shared::constants::UNKNOWN_IDENTITY;

/// Key under which a person's smoothing history is kept.
///
/// `Resolved` keys come from face identification and recur across frames.
/// `Ephemeral` keys render as `Unknown_<frame>_<index>` and belong to a
/// single detection. [`IdentityKey::resolved`] refuses names that could
/// render the same as an ephemeral key, so the two families never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityKey {
    Resolved(String),
    Ephemeral { frame: usize, index: usize },
}

impl IdentityKey {
    /// Wraps an identifier's answer. Returns `None` for the `Unknown`
    /// sentinel, empty names, and anything shaped like an ephemeral key.
    pub fn resolved(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed == UNKNOWN_IDENTITY || looks_ephemeral(trimmed) {
            return None;
        }
        Some(IdentityKey::Resolved(trimmed.to_string()))
    }

    pub fn ephemeral(frame: usize, index: usize) -> Self {
        IdentityKey::Ephemeral { frame, index }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, IdentityKey::Ephemeral { .. })
    }
}

fn looks_ephemeral(name: &str) -> bool {
    name.strip_prefix(UNKNOWN_IDENTITY)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some()
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Resolved(name) => f.write_str(name),
            IdentityKey::Ephemeral { frame, index } => {
                write!(f, "{UNKNOWN_IDENTITY}_{frame}_{index}")
            }
        }
    }
}

impl Serialize for IdentityKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
