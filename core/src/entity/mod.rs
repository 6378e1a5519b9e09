//! Creature records the buff engine operates on
//!
//! The world model proper (position, inventory, ownership) lives
//! elsewhere. The engine only needs the per-creature buff set, the
//! aggregate effects it applies and the creature's logical time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use hashbrown::HashMap;
use parking_lot::{Mutex, MutexGuard};

use crate::buffs::{ActiveBuff, EntityBuffSet};
use crate::clock::{LogicalTime, PlayTime, WorldClock};
use crate::ids::{BuffId, EntityId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Npc,
}

/// Mutable per-creature state guarded by the record's mutex.
///
/// Buff set membership and the effects it implies are changed under the
/// same guard, so they are never observed out of step.
#[derive(Debug)]
pub struct EntityState {
    pub(crate) buffs: EntityBuffSet,
    /// Aggregate skill modifiers contributed by buffs (zero totals are dropped)
    pub(crate) modifiers: HashMap<String, i32>,
    /// Commands granted by buffs, with the number of held buffs granting each
    pub(crate) commands: HashMap<String, u32>,
    pub(crate) movement_scale: f32,
}

impl Default for EntityState {
    fn default() -> Self {
        Self {
            buffs: EntityBuffSet::new(),
            modifiers: HashMap::new(),
            commands: HashMap::new(),
            movement_scale: 1.0,
        }
    }
}

impl EntityState {
    pub fn buffs(&self) -> &EntityBuffSet {
        &self.buffs
    }

    pub fn modifiers(&self) -> &HashMap<String, i32> {
        &self.modifiers
    }

    pub fn commands(&self) -> &HashMap<String, u32> {
        &self.commands
    }
}

/// A creature known to the engine.
#[derive(Debug)]
pub struct EntityRecord {
    id: EntityId,
    name: String,
    kind: EntityKind,
    alive: AtomicBool,
    state: Mutex<EntityState>,
    play_time: Mutex<PlayTime>,
}

impl EntityRecord {
    /// A connected player character with `play_time` seconds already banked.
    pub fn player(id: EntityId, name: impl Into<String>, play_time: LogicalTime, now: LogicalTime) -> Self {
        Self::new(id, name.into(), EntityKind::Player, PlayTime::connected(play_time, now))
    }

    pub fn npc(id: EntityId, name: impl Into<String>) -> Self {
        Self::new(id, name.into(), EntityKind::Npc, PlayTime::default())
    }

    fn new(id: EntityId, name: String, kind: EntityKind, play_time: PlayTime) -> Self {
        Self {
            id,
            name,
            kind,
            alive: AtomicBool::new(true),
            state: Mutex::new(EntityState::default()),
            play_time: Mutex::new(play_time),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player
    }

    /// False once the entity has been destroyed
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub(crate) fn mark_destroyed(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// Lock the buff set and applied effects.
    pub(crate) fn lock(&self) -> MutexGuard<'_, EntityState> {
        self.state.lock()
    }

    // ─── Logical Time ───────────────────────────────────────────────────────

    /// Current logical time: play time for players, world time for NPCs.
    pub fn logical_time(&self, clock: &dyn WorldClock) -> LogicalTime {
        let now = clock.now();
        match self.kind {
            EntityKind::Player => self.play_time.lock().current(now),
            EntityKind::Npc => now,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.play_time.lock().is_connected()
    }

    pub fn connect(&self, clock: &dyn WorldClock) {
        if self.is_player() {
            self.play_time.lock().connect(clock.now());
        }
    }

    pub fn disconnect(&self, clock: &dyn WorldClock) {
        if self.is_player() {
            self.play_time.lock().disconnect(clock.now());
        }
    }

    // ─── Read Accessors ─────────────────────────────────────────────────────

    pub fn has_buff(&self, id: BuffId) -> bool {
        self.state.lock().buffs.contains(id)
    }

    pub fn active_buff(&self, id: BuffId) -> Option<ActiveBuff> {
        self.state.lock().buffs.get(id).copied()
    }

    pub fn active_buffs(&self) -> Vec<ActiveBuff> {
        self.state.lock().buffs.iter().copied().collect()
    }

    pub fn buff_count(&self) -> usize {
        self.state.lock().buffs.len()
    }

    /// Aggregate buff contribution to a skill modifier (0 when none)
    pub fn skill_modifier(&self, name: &str) -> i32 {
        self.state.lock().modifiers.get(name).copied().unwrap_or(0)
    }

    pub fn skill_modifiers(&self) -> HashMap<String, i32> {
        self.state.lock().modifiers.clone()
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.state.lock().commands.contains_key(name)
    }

    pub fn commands(&self) -> Vec<String> {
        let mut commands: Vec<_> = self.state.lock().commands.keys().cloned().collect();
        commands.sort();
        commands
    }

    pub fn movement_scale(&self) -> f32 {
        self.state.lock().movement_scale
    }

    /// Written by the movement system when an ability such as burst run
    /// speeds the creature up. The engine never raises it; buff callbacks
    /// put it back to the base scale when the granting buff goes away.
    pub fn set_movement_scale(&self, scale: f32) {
        self.state.lock().movement_scale = scale;
    }
}

/// Concurrent map of live entities.
///
/// Sharded, so lookups for unrelated entities do not contend; each record
/// carries its own buff-set mutex.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: Arc<DashMap<EntityId, Arc<EntityRecord>>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity, replacing (and retiring) any record with the same id.
    pub fn insert(&self, record: EntityRecord) -> Arc<EntityRecord> {
        let record = Arc::new(record);
        if let Some(old) = self.entities.insert(record.id(), Arc::clone(&record)) {
            old.mark_destroyed();
        }
        record
    }

    pub fn get(&self, id: EntityId) -> Option<Arc<EntityRecord>> {
        self.entities.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Unregister an entity. Outstanding handles observe it as dead.
    pub fn remove(&self, id: EntityId) -> Option<Arc<EntityRecord>> {
        let (_, record) = self.entities.remove(&id)?;
        record.mark_destroyed();
        Some(record)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
