//! Named hooks run when a buff is removed.
//!
//! The set of hooks is closed: definitions name one of the
//! [`BuffCallback`] variants, and an unknown name fails at load time
//! instead of silently meaning "no callback".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::EntityRecord;
use crate::events::{BuffNotification, Notifier};

/// Movement scale of a creature with no movement modifiers.
pub const BASE_MOVEMENT_SCALE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuffCallback {
    /// Burst run ended: drop the sprint movement scale
    RemoveBurstRun,
}

impl BuffCallback {
    pub const ALL: &'static [BuffCallback] = &[BuffCallback::RemoveBurstRun];

    pub fn name(self) -> &'static str {
        match self {
            Self::RemoveBurstRun => "removeBurstRun",
        }
    }
}

impl fmt::Display for BuffCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown buff callback '{0}'")]
pub struct UnknownCallback(pub String);

impl FromStr for BuffCallback {
    type Err = UnknownCallback;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|cb| cb.name() == s)
            .ok_or_else(|| UnknownCallback(s.to_string()))
    }
}

/// Dispatches removal hooks to their handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallbackRegistry;

impl CallbackRegistry {
    /// Run the handler for `callback` against `entity`.
    ///
    /// Called after the entity's buff-set guard is released, so handlers
    /// may lock the entity or call back into the engine.
    pub fn dispatch(&self, callback: BuffCallback, entity: &EntityRecord, notifier: &Notifier) {
        tracing::trace!(entity = %entity.id(), %callback, "Running buff callback");
        match callback {
            BuffCallback::RemoveBurstRun => remove_burst_run(entity, notifier),
        }
    }
}

fn remove_burst_run(entity: &EntityRecord, notifier: &Notifier) {
    entity.set_movement_scale(BASE_MOVEMENT_SCALE);
    notifier.send(BuffNotification::MovementScaleChanged {
        entity: entity.id(),
        scale: BASE_MOVEMENT_SCALE,
    });
}
