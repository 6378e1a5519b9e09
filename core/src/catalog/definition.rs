//! Buff definition types
//!
//! Definitions are immutable templates loaded from TOML files that
//! describe how long a buff lasts, what it conflicts with and what it
//! does to the creature holding it.

use serde::{Deserialize, Serialize};

use crate::buffs::BuffCallback;
use crate::ids::BuffId;

/// A buff carries at most this many effect slots.
pub const MAX_EFFECT_SLOTS: usize = 5;

// ═══════════════════════════════════════════════════════════════════════════
// Effect Slots
// ═══════════════════════════════════════════════════════════════════════════

/// One `(name, value)` effect descriptor.
///
/// The name resolves either to a grantable command (when `value` is
/// exactly 1.0) or to a skill modifier key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EffectSlot {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub value: f64,
}

impl EffectSlot {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Buff Definitions
// ═══════════════════════════════════════════════════════════════════════════

/// Definition of a buff (loaded from config)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuffDefinition {
    /// Buff name; its lower-cased CRC is the [`BuffId`]
    pub name: String,

    // ─── Duration ───────────────────────────────────────────────────────────
    /// Lifetime in logical seconds (negative = never expires)
    pub duration: i64,

    // ─── Conflict Resolution ────────────────────────────────────────────────
    /// Higher wins; an incoming buff also wins ties
    #[serde(default)]
    pub priority: i32,

    /// Mutual-exclusion group (None = never conflicts)
    #[serde(default)]
    pub group: Option<String>,

    // ─── Effects ────────────────────────────────────────────────────────────
    #[serde(default)]
    pub effects: Vec<EffectSlot>,

    /// Client effect file played on the receiver when applied
    #[serde(default)]
    pub particle: Option<String>,

    /// Hook run when the buff is removed
    #[serde(default)]
    pub callback: Option<BuffCallback>,
}

impl BuffDefinition {
    pub fn new(name: impl Into<String>, duration: i64) -> Self {
        Self {
            name: name.into(),
            duration,
            priority: 0,
            group: None,
            effects: Vec::new(),
            particle: None,
            callback: None,
        }
    }

    pub fn id(&self) -> BuffId {
        BuffId::from_name(&self.name)
    }

    pub fn is_infinite(&self) -> bool {
        self.duration < 0
    }

    /// True when both definitions carry the same mutual-exclusion group.
    /// Ungrouped definitions never share a group, not even with each other.
    pub fn shares_group_with(&self, other: &BuffDefinition) -> bool {
        matches!((&self.group, &other.group), (Some(a), Some(b)) if a == b)
    }

    /// Non-empty effect slots, capped at [`MAX_EFFECT_SLOTS`]
    pub fn effect_slots(&self) -> impl Iterator<Item = &EffectSlot> {
        self.effects
            .iter()
            .take(MAX_EFFECT_SLOTS)
            .filter(|slot| !slot.is_empty())
    }

    /// Particle file, if set and non-empty
    pub fn particle(&self) -> Option<&str> {
        self.particle.as_deref().filter(|p| !p.is_empty())
    }

    // ─── Builders (static data tooling and tests) ───────────────────────────

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_effect(mut self, name: impl Into<String>, value: f64) -> Self {
        self.effects.push(EffectSlot::new(name, value));
        self
    }

    pub fn with_particle(mut self, particle: impl Into<String>) -> Self {
        self.particle = Some(particle.into());
        self
    }

    pub fn with_callback(mut self, callback: BuffCallback) -> Self {
        self.callback = Some(callback);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Config File Structure
// ═══════════════════════════════════════════════════════════════════════════

/// Root structure for buff definition files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionConfig {
    /// Buff definitions in this file
    #[serde(default, rename = "buff")]
    pub buffs: Vec<BuffDefinition>,

    /// Command names an effect slot may grant
    #[serde(default)]
    pub commands: Vec<String>,
}
