//! Tests for signal routing and the running service

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use buffkeep_types::EngineConfig;

use super::BuffService;
use crate::buffs::BuffEngine;
use crate::catalog::{BuffDefinition, DefinitionSet};
use crate::clock::{ManualClock, TokioWorldClock, WorldClock};
use crate::entity::{EntityRecord, EntityRegistry};
use crate::error::ServiceError;
use crate::events::{BuffNotification, BuffSignal, Notifier, SignalHandler};
use crate::ids::{BuffId, EntityId};
use crate::scheduler::{ScheduledCheck, SchedulerHandle};

const HAN: EntityId = EntityId(1);
const RANCOR: EntityId = EntityId(2);
const SOURCE: EntityId = EntityId(99);

fn make_definitions() -> Arc<DefinitionSet> {
    let mut set = DefinitionSet::new();
    set.insert(BuffDefinition::new("shortBuff", 10).with_effect("armor", 20.0));
    set.insert(BuffDefinition::new("longBuff", 600));
    set.insert(BuffDefinition::new("aura", -1));
    Arc::new(set)
}

fn make_entities(now: i64) -> EntityRegistry {
    let entities = EntityRegistry::new();
    entities.insert(EntityRecord::player(HAN, "Han", 0, now));
    entities.insert(EntityRecord::npc(RANCOR, "rancor"));
    entities
}

// ─────────────────────────────────────────────────────────────────────────────
// Routing (no runtime)
// ─────────────────────────────────────────────────────────────────────────────

struct Routed {
    engine: BuffEngine,
    clock: Arc<ManualClock>,
    _notifications: UnboundedReceiver<BuffNotification>,
    _checks: UnboundedReceiver<ScheduledCheck>,
}

fn make_routed() -> Routed {
    let defs = make_definitions();
    let clock = Arc::new(ManualClock::new(0));
    let (notifier, notifications) = Notifier::channel();
    let (scheduler, checks) = SchedulerHandle::channel();
    let engine = BuffEngine::new(
        defs.clone(),
        defs,
        make_entities(clock.now()),
        clock.clone(),
        notifier,
        scheduler,
    );
    Routed {
        engine,
        clock,
        _notifications: notifications,
        _checks: checks,
    }
}

#[test]
fn test_apply_and_remove_signals() {
    let r = make_routed();
    r.engine.handle_signal(&BuffSignal::apply(HAN, "shortBuff", SOURCE));
    let han = r.engine.entities().get(HAN).unwrap();
    assert!(han.has_buff(BuffId::from_name("shortBuff")));
    assert_eq!(han.skill_modifier("armor"), 20);

    r.engine.handle_signal(&BuffSignal::remove(HAN, "shortBuff"));
    assert_eq!(han.buff_count(), 0);
    assert_eq!(han.skill_modifier("armor"), 0);
}

#[test]
fn test_failed_requests_are_absorbed() {
    let r = make_routed();
    r.engine.handle_signal(&BuffSignal::apply(HAN, "noSuchBuff", SOURCE));
    r.engine.handle_signal(&BuffSignal::apply(EntityId(404), "shortBuff", SOURCE));
    r.engine.handle_signal(&BuffSignal::remove(EntityId(404), "shortBuff"));
    assert_eq!(r.engine.entities().get(HAN).unwrap().buff_count(), 0);
}

#[test]
fn test_death_removes_every_buff() {
    let r = make_routed();
    for name in ["shortBuff", "longBuff", "aura"] {
        r.engine.handle_signal(&BuffSignal::apply(RANCOR, name, SOURCE));
    }
    r.engine.handle_signal(&BuffSignal::EntityDied { entity: RANCOR });

    let rancor = r.engine.entities().get(RANCOR).unwrap();
    assert_eq!(rancor.buff_count(), 0);
    assert!(rancor.is_alive());
}

#[test]
fn test_reconnect_sweeps_expired_buffs() {
    let r = make_routed();
    r.engine.handle_signal(&BuffSignal::apply(HAN, "shortBuff", SOURCE));
    r.engine.handle_signal(&BuffSignal::apply(HAN, "longBuff", SOURCE));
    r.engine.handle_signal(&BuffSignal::apply(HAN, "aura", SOURCE));

    // Expired while connected but never checked
    r.clock.advance(10);
    r.engine.handle_signal(&BuffSignal::EntityDisconnected { entity: HAN });
    r.clock.advance(3600);
    r.engine.handle_signal(&BuffSignal::EntityReconnected { entity: HAN });

    let han = r.engine.entities().get(HAN).unwrap();
    assert!(han.is_connected());
    assert!(!han.has_buff(BuffId::from_name("shortBuff")));
    assert!(han.has_buff(BuffId::from_name("longBuff")));
    assert!(han.has_buff(BuffId::from_name("aura")));
    assert_eq!(han.logical_time(r.clock.as_ref()), 10);
}

#[test]
fn test_destroy_unregisters_entity() {
    let r = make_routed();
    r.engine.handle_signal(&BuffSignal::apply(RANCOR, "longBuff", SOURCE));
    let rancor = r.engine.entities().get(RANCOR).unwrap();

    r.engine.handle_signal(&BuffSignal::EntityDestroyed { entity: RANCOR });
    assert_eq!(rancor.buff_count(), 0);
    assert!(!rancor.is_alive());
    assert!(!r.engine.entities().contains(RANCOR));
}

// ─────────────────────────────────────────────────────────────────────────────
// Running Service
// ─────────────────────────────────────────────────────────────────────────────

fn spawn_service() -> BuffService {
    let defs = make_definitions();
    let config = EngineConfig::default();
    let clock = Arc::new(TokioWorldClock::new(0));
    BuffService::spawn(&config, defs.clone(), defs, clock, make_entities(0))
}

/// Receive notifications until one matches `pred`
async fn recv_until(
    rx: &mut UnboundedReceiver<BuffNotification>,
    pred: impl Fn(&BuffNotification) -> bool,
) -> Vec<BuffNotification> {
    let mut seen = Vec::new();
    while let Some(n) = rx.recv().await {
        let done = pred(&n);
        seen.push(n);
        if done {
            break;
        }
    }
    seen
}

#[tokio::test(start_paused = true)]
async fn test_buff_expires_on_schedule() {
    let mut service = spawn_service();
    let handle = service.handle.clone();

    handle.apply_buff(RANCOR, "shortBuff", SOURCE).await.unwrap();
    recv_until(&mut service.notifications, |n| {
        matches!(n, BuffNotification::BuffApplied { .. })
    })
    .await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(handle.engine().entities().get(RANCOR).unwrap().has_buff(BuffId::from_name("shortBuff")));

    tokio::time::sleep(Duration::from_secs(6)).await;
    let seen = recv_until(&mut service.notifications, |n| {
        matches!(n, BuffNotification::BuffRemoved { .. })
    })
    .await;
    assert!(seen.contains(&BuffNotification::SkillModifierChanged {
        entity: RANCOR,
        name: "armor".to_string(),
        delta: -20,
    }));
    assert_eq!(handle.engine().entities().get(RANCOR).unwrap().buff_count(), 0);

    handle.shutdown();
    service.tasks.join().await;
}

#[tokio::test(start_paused = true)]
async fn test_disconnected_player_keeps_buff() {
    let mut service = spawn_service();
    let handle = service.handle.clone();

    handle.apply_buff(HAN, "shortBuff", SOURCE).await.unwrap();
    handle.entity_disconnected(HAN).await.unwrap();
    recv_until(&mut service.notifications, |n| {
        matches!(n, BuffNotification::BuffApplied { .. })
    })
    .await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    let han = handle.engine().entities().get(HAN).unwrap();
    assert!(han.has_buff(BuffId::from_name("shortBuff")));

    handle.entity_reconnected(HAN).await.unwrap();
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert!(!han.has_buff(BuffId::from_name("shortBuff")));

    handle.shutdown();
    service.tasks.join().await;
}

#[tokio::test(start_paused = true)]
async fn test_send_after_shutdown_fails() {
    let service = spawn_service();
    let handle = service.handle.clone();

    handle.shutdown();
    service.tasks.join().await;

    assert_eq!(
        handle.entity_died(RANCOR).await,
        Err(ServiceError::Stopped)
    );
}
