//! Buff add / replace / refresh / remove decisions.
//!
//! Every decision that reads or changes an entity's buff set runs under
//! that entity's guard, from the conflict scan through the final insert.
//! Notifications, callbacks and expiration scheduling are collected while
//! the guard is held and run once it is released.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{ActiveBuff, CallbackRegistry, EffectApplier, Followup, Followups};
use crate::catalog::{BuffCatalog, BuffDefinition, CommandLookup};
use crate::clock::{LogicalTime, WorldClock};
use crate::entity::{EntityRecord, EntityRegistry, EntityState};
use crate::error::BuffError;
use crate::events::{BuffNotification, Notifier};
use crate::ids::{BuffId, EntityId};
use crate::scheduler::{ScheduledCheck, SchedulerHandle};

/// What an add request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Nothing conflicted; the buff is now held
    Applied,
    /// The same buff was held; its timer restarted
    Refreshed,
    /// A buff of the same group with lower or equal priority was removed first
    Replaced { previous: BuffId },
    /// The same infinite buff was held; it is now removed
    ToggledOff,
    /// A buff of the same group with higher priority is held; nothing changed
    Dropped { holder: BuffId },
}

/// Result of one expiration check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The checked instance is no longer held (or its entity is gone)
    Gone,
    /// Still held and not yet expired; check again later
    Pending,
    /// Expired and removed by this check
    Expired,
    /// Expired, but the catalog could not be reached to revoke its effects.
    /// The buff stays held until a later check finds the catalog again.
    CatalogUnavailable,
}

pub struct BuffEngine {
    catalog: Arc<dyn BuffCatalog>,
    entities: EntityRegistry,
    clock: Arc<dyn WorldClock>,
    effects: EffectApplier,
    callbacks: CallbackRegistry,
    notifier: Notifier,
    scheduler: SchedulerHandle,
    next_instance: AtomicU64,
}

impl BuffEngine {
    pub fn new(
        catalog: Arc<dyn BuffCatalog>,
        commands: Arc<dyn CommandLookup>,
        entities: EntityRegistry,
        clock: Arc<dyn WorldClock>,
        notifier: Notifier,
        scheduler: SchedulerHandle,
    ) -> Self {
        Self {
            catalog,
            entities,
            clock,
            effects: EffectApplier::new(commands),
            callbacks: CallbackRegistry,
            notifier,
            scheduler,
            next_instance: AtomicU64::new(1),
        }
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn clock(&self) -> &dyn WorldClock {
        self.clock.as_ref()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Look up a definition, treating a missing one as an error.
    pub fn definition(&self, id: BuffId) -> Result<Arc<BuffDefinition>, BuffError> {
        self.catalog.lookup(id)?.ok_or(BuffError::UnknownBuff(id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Add
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply `buff` to `receiver` on behalf of `source`.
    ///
    /// Resolution against what the receiver already holds:
    /// - same buff, finite duration: removed and re-applied (timer restarts)
    /// - same buff, infinite duration: removed (toggle off)
    /// - same group, new priority >= held priority: held buff replaced
    /// - same group, new priority lower: request dropped
    pub fn add(
        &self,
        receiver: EntityId,
        buff: BuffId,
        source: EntityId,
    ) -> Result<AddOutcome, BuffError> {
        let def = match self.catalog.lookup(buff)? {
            Some(def) => def,
            None => {
                tracing::error!(entity = %receiver, %buff, %source, "Buff could not be looked up");
                return Err(BuffError::UnknownBuff(buff));
            }
        };
        let record = self
            .entities
            .get(receiver)
            .filter(|record| record.is_alive())
            .ok_or(BuffError::UnknownEntity(receiver))?;

        let mut out = Followups::default();
        let outcome = {
            let mut state = record.lock();
            let now = record.logical_time(self.clock.as_ref());

            match self.find_conflict(&state, &def)? {
                None => {
                    self.apply_locked(&record, &mut state, &def, source, now, &mut out);
                    AddOutcome::Applied
                }
                Some(held) if held.id() == def.id() => {
                    self.remove_locked(receiver, &mut state, &held, &mut out);
                    if def.is_infinite() {
                        AddOutcome::ToggledOff
                    } else {
                        self.apply_locked(&record, &mut state, &def, source, now, &mut out);
                        AddOutcome::Refreshed
                    }
                }
                Some(held) if def.priority >= held.priority => {
                    self.remove_locked(receiver, &mut state, &held, &mut out);
                    self.apply_locked(&record, &mut state, &def, source, now, &mut out);
                    AddOutcome::Replaced {
                        previous: held.id(),
                    }
                }
                Some(held) => {
                    tracing::trace!(
                        entity = %receiver,
                        buff = %def.name,
                        holder = %held.name,
                        priority = def.priority,
                        held_priority = held.priority,
                        "Buff dropped, higher priority buff held"
                    );
                    AddOutcome::Dropped {
                        holder: held.id(),
                    }
                }
            }
        };

        self.flush(&record, out);
        Ok(outcome)
    }

    /// The held buff the new one collides with: the same buff, or one
    /// sharing its group. Held buffs whose definition has disappeared are
    /// skipped.
    fn find_conflict(
        &self,
        state: &EntityState,
        def: &Arc<BuffDefinition>,
    ) -> Result<Option<Arc<BuffDefinition>>, BuffError> {
        if state.buffs.contains(def.id()) {
            return Ok(Some(Arc::clone(def)));
        }
        if def.group.is_none() {
            return Ok(None);
        }
        for held in state.buffs.iter() {
            if let Some(held_def) = self.catalog.lookup(held.buff_id)?
                && held_def.shares_group_with(def)
            {
                return Ok(Some(held_def));
            }
        }
        Ok(None)
    }

    fn apply_locked(
        &self,
        record: &EntityRecord,
        state: &mut EntityState,
        def: &BuffDefinition,
        source: EntityId,
        now: LogicalTime,
        out: &mut Followups,
    ) {
        let entity = record.id();
        let buff = def.id();
        let instance = self.next_instance.fetch_add(1, Ordering::Relaxed);
        let expires_at = (!def.is_infinite()).then(|| now.saturating_add(def.duration));

        tracing::trace!(
            %entity,
            receiver = record.name(),
            buff = %def.name,
            %source,
            apply_time = now,
            duration = def.duration,
            "Buff applied"
        );

        self.effects.apply(entity, def, state, out);
        state.buffs.insert(ActiveBuff {
            buff_id: buff,
            source,
            applied_at: now,
            expires_at,
            instance,
        });
        out.notify(BuffNotification::BuffApplied {
            entity,
            buff,
            particle: def.particle().map(str::to_string),
        });
        if expires_at.is_some() {
            out.schedule(ScheduledCheck {
                entity,
                buff,
                instance,
            });
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Remove
    // ─────────────────────────────────────────────────────────────────────────

    /// Remove `buff` from `entity`. Returns false when it was not held.
    pub fn remove(&self, entity: EntityId, buff: BuffId) -> Result<bool, BuffError> {
        let Some(record) = self.entities.get(entity) else {
            tracing::debug!(%entity, %buff, "Remove for unknown entity ignored");
            return Ok(false);
        };

        let mut out = Followups::default();
        {
            let mut state = record.lock();
            if !state.buffs.contains(buff) {
                return Ok(false);
            }
            let def = match self.catalog.lookup(buff)? {
                Some(def) => def,
                None => {
                    tracing::error!(%entity, %buff, "Unable to remove buff, definition could not be looked up");
                    return Err(BuffError::UnknownBuff(buff));
                }
            };
            let removed = self.remove_locked(entity, &mut state, &def, &mut out);
            debug_assert!(removed.is_some(), "held buff vanished under the entity guard");
        }

        self.flush(&record, out);
        Ok(true)
    }

    /// Remove every buff `entity` holds. Failures are logged and skipped.
    pub fn remove_all(&self, entity: EntityId) -> usize {
        let Some(record) = self.entities.get(entity) else {
            return 0;
        };
        let held = record.lock().buffs.ids();

        let mut removed = 0;
        for buff in held {
            match self.remove(entity, buff) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => tracing::error!(%entity, %buff, error = %e, "Failed to remove buff"),
            }
        }
        if removed > 0 {
            tracing::debug!(%entity, removed, "Removed all buffs");
        }
        removed
    }

    fn remove_locked(
        &self,
        entity: EntityId,
        state: &mut EntityState,
        def: &BuffDefinition,
        out: &mut Followups,
    ) -> Option<ActiveBuff> {
        let buff = def.id();
        let removed = state.buffs.remove(buff)?;
        self.effects.revoke(entity, def, state, out);
        if let Some(callback) = def.callback {
            out.callback(callback);
        }
        out.notify(BuffNotification::BuffRemoved { entity, buff });
        tracing::trace!(%entity, buff = %def.name, instance = removed.instance, "Buff removed");
        Some(removed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expiration
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether the buff `entity` holds is past its end. None when not held.
    pub fn is_buff_expired(&self, entity: EntityId, buff: BuffId) -> Option<bool> {
        let record = self.entities.get(entity)?;
        let held = record.active_buff(buff)?;
        Some(held.is_expired(record.logical_time(self.clock.as_ref())))
    }

    /// Run one expiration check. Only the exact instance named by `check`
    /// can be removed; a re-applied buff carries a new instance.
    pub fn check_expiry(&self, check: ScheduledCheck) -> CheckOutcome {
        let ScheduledCheck {
            entity,
            buff,
            instance,
        } = check;
        let Some(record) = self.entities.get(entity).filter(|r| r.is_alive()) else {
            return CheckOutcome::Gone;
        };

        let mut out = Followups::default();
        {
            let mut state = record.lock();
            let Some(held) = state.buffs.get(buff).copied() else {
                return CheckOutcome::Gone;
            };
            if held.instance != instance {
                return CheckOutcome::Gone;
            }
            if !held.is_expired(record.logical_time(self.clock.as_ref())) {
                return CheckOutcome::Pending;
            }
            let def = match self.catalog.lookup(buff) {
                Ok(Some(def)) => def,
                Ok(None) => {
                    tracing::error!(%entity, %buff, "Expired buff could not be looked up");
                    return CheckOutcome::Gone;
                }
                Err(e) => {
                    tracing::warn!(%entity, %buff, error = %e, "Catalog unavailable, expired buff left in place");
                    return CheckOutcome::CatalogUnavailable;
                }
            };
            self.remove_locked(entity, &mut state, &def, &mut out);
        }

        tracing::debug!(%entity, %buff, instance, "Buff expired");
        self.flush(&record, out);
        CheckOutcome::Expired
    }

    /// Check every buff `entity` holds and remove the expired ones.
    pub fn sweep_expired(&self, entity: EntityId) -> usize {
        let Some(record) = self.entities.get(entity) else {
            return 0;
        };
        let checks: Vec<ScheduledCheck> = record
            .lock()
            .buffs
            .iter()
            .map(|held| ScheduledCheck {
                entity,
                buff: held.buff_id,
                instance: held.instance,
            })
            .collect();

        checks
            .into_iter()
            .filter(|check| self.check_expiry(*check) == CheckOutcome::Expired)
            .count()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Side effects
    // ─────────────────────────────────────────────────────────────────────────

    fn flush(&self, record: &EntityRecord, out: Followups) {
        for followup in out {
            match followup {
                Followup::Notify(notification) => self.notifier.send(notification),
                Followup::Callback(callback) => {
                    self.callbacks.dispatch(callback, record, &self.notifier)
                }
                Followup::Schedule(check) => self.scheduler.schedule(check),
            }
        }
    }
}
