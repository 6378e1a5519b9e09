//! Buff lifecycle
//!
//! This module provides:
//! - **Active buffs**: per-entity runtime instances keyed by buff id
//! - **Effects**: translation of definition effect slots into command
//!   grants and skill-modifier deltas
//! - **Callbacks**: closed set of removal hooks
//! - **Engine**: add / replace / refresh / remove decisions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  BuffDefinition (TOML config)                    │
//! │   "burstRun: 15s, group movement, +50 movement, removeBurstRun"  │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                    BuffSignal::ApplyBuff
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    ActiveBuff (runtime state)                    │
//! │        "Han holds burstRun until play time 4815, #12"           │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!               ExpirationScheduler / explicit remove
//!                              │
//!                              ▼
//!          revoke effects → callback → BuffRemoved notification
//! ```

mod active;
mod callbacks;
mod effects;
pub mod engine;


pub use active::{ActiveBuff, EntityBuffSet};
pub use callbacks::{BASE_MOVEMENT_SCALE, BuffCallback, CallbackRegistry, UnknownCallback};
pub use effects::{EffectApplier, EffectDirection, EffectKind};
pub use engine::{AddOutcome, BuffEngine, CheckOutcome};

use crate::events::BuffNotification;
use crate::scheduler::ScheduledCheck;

/// Work produced inside an entity's critical section and run after the
/// guard is released, in order.
#[derive(Debug)]
pub(crate) enum Followup {
    Notify(BuffNotification),
    Callback(BuffCallback),
    Schedule(ScheduledCheck),
}

#[derive(Debug, Default)]
pub(crate) struct Followups(Vec<Followup>);

impl Followups {
    pub(crate) fn notify(&mut self, notification: BuffNotification) {
        self.0.push(Followup::Notify(notification));
    }

    pub(crate) fn callback(&mut self, callback: BuffCallback) {
        self.0.push(Followup::Callback(callback));
    }

    pub(crate) fn schedule(&mut self, check: ScheduledCheck) {
        self.0.push(Followup::Schedule(check));
    }
}

impl IntoIterator for Followups {
    type Item = Followup;
    type IntoIter = std::vec::IntoIter<Followup>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
