//! Identifiers for buffs and entities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque buff identifier: CRC-32 of the lower-cased buff name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuffId(u32);

impl BuffId {
    /// Hash a buff name. Names are case-insensitive.
    pub fn from_name(name: &str) -> Self {
        Self(crc32fast::hash(name.to_lowercase().as_bytes()))
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BuffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<&str> for BuffId {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

/// World object id of a creature (player or NPC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
