use std::sync::Arc;

use buffkeep_core::catalog::DefinitionSet;
use buffkeep_core::{
    BuffNotification, BuffServiceHandle, EntityId, EntityKind, EntityRecord, WorldClock,
};
use buffkeep_types::formatting::{format_duration, format_remaining, format_signed};

pub struct AppState {
    pub service: BuffServiceHandle,
    pub definitions: Arc<DefinitionSet>,
}

impl AppState {
    fn record(&self, id: i64) -> Result<Arc<EntityRecord>, String> {
        self.service
            .engine()
            .entities()
            .get(EntityId(id))
            .ok_or_else(|| format!("no entity {id}\n"))
    }

    fn buff_name(&self, name: &str) -> Result<String, String> {
        self.definitions
            .get_by_name(name)
            .map(|def| def.name.clone())
            .ok_or_else(|| format!("unknown buff {name}\n"))
    }
}

pub fn spawn(state: &AppState, id: i64, name: &str, npc: bool, play_time: i64) -> Result<(), String> {
    let entities = state.service.engine().entities();
    if entities.contains(EntityId(id)) {
        return Err(format!("entity {id} already exists\n"));
    }
    let record = if npc {
        EntityRecord::npc(EntityId(id), name)
    } else {
        let now = state.service.engine().clock().now();
        EntityRecord::player(EntityId(id), name, play_time, now)
    };
    entities.insert(record);
    println!("spawned {name} ({id})");
    Ok(())
}

pub async fn apply(state: &AppState, target: i64, buff: &str, source: i64) -> Result<(), String> {
    let name = state.buff_name(buff)?;
    state.record(target)?;
    state
        .service
        .apply_buff(EntityId(target), &name, EntityId(source))
        .await
        .map_err(|e| e.to_string())
}

pub async fn remove(state: &AppState, target: i64, buff: &str) -> Result<(), String> {
    let name = state.buff_name(buff)?;
    state
        .service
        .remove_buff(EntityId(target), &name)
        .await
        .map_err(|e| e.to_string())
}

pub async fn kill(state: &AppState, target: i64) -> Result<(), String> {
    state.record(target)?;
    state
        .service
        .entity_died(EntityId(target))
        .await
        .map_err(|e| e.to_string())
}

pub async fn disconnect(state: &AppState, target: i64) -> Result<(), String> {
    state.record(target)?;
    state
        .service
        .entity_disconnected(EntityId(target))
        .await
        .map_err(|e| e.to_string())
}

pub async fn reconnect(state: &AppState, target: i64) -> Result<(), String> {
    state.record(target)?;
    state
        .service
        .entity_reconnected(EntityId(target))
        .await
        .map_err(|e| e.to_string())
}

pub async fn destroy(state: &AppState, target: i64) -> Result<(), String> {
    state.record(target)?;
    state
        .service
        .entity_destroyed(EntityId(target))
        .await
        .map_err(|e| e.to_string())
}

pub fn status(state: &AppState, target: i64) -> Result<(), String> {
    let record = state.record(target)?;
    let engine = state.service.engine();
    let kind = match record.kind() {
        EntityKind::Player if record.is_connected() => "player",
        EntityKind::Player => "player (disconnected)",
        EntityKind::Npc => "npc",
    };

    println!("{} ({}) {kind}", record.name(), record.id());
    println!("  logical time   {}", format_duration(record.logical_time(engine.clock())));
    println!("  buffs          {}", record.buff_count());
    println!("  movement scale {:.2}", record.movement_scale());

    let mut modifiers: Vec<_> = record.skill_modifiers().into_iter().collect();
    modifiers.sort();
    for (name, value) in modifiers {
        println!("  {name:<24} {}", format_signed(value));
    }
    for command in record.commands() {
        println!("  command        {command}");
    }
    Ok(())
}

pub fn buffs(state: &AppState, target: i64) -> Result<(), String> {
    let record = state.record(target)?;
    let now = record.logical_time(state.service.engine().clock());

    let mut held = record.active_buffs();
    held.sort_by_key(|buff| buff.applied_at);
    if held.is_empty() {
        println!("{} holds no buffs", record.name());
        return Ok(());
    }
    for buff in held {
        let name = state
            .definitions
            .get(buff.buff_id)
            .map(|def| def.name.clone())
            .unwrap_or_else(|| buff.buff_id.to_string());
        println!(
            "  {name:<24} {:>10}  from {}",
            format_remaining(buff.remaining(now)),
            buff.source
        );
    }
    Ok(())
}

/// Stand-in for the movement system, which owns the scale outside the engine
pub fn scale(state: &AppState, target: i64, scale: f32) -> Result<(), String> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(format!("invalid movement scale {scale}\n"));
    }
    let record = state.record(target)?;
    record.set_movement_scale(scale);
    tracing::debug!(entity = %record.id(), scale, "Movement scale set");
    println!("{} moves at {scale:.2}", record.name());
    Ok(())
}

pub fn definitions(state: &AppState) -> Result<(), String> {
    let mut defs: Vec<_> = state.definitions.definitions().collect();
    defs.sort_by(|a, b| a.name.cmp(&b.name));
    for def in defs {
        let duration = if def.is_infinite() {
            "toggle".to_string()
        } else {
            format_duration(def.duration)
        };
        println!(
            "  {:<24} {:>8}  {:<16} p{}",
            def.name,
            duration,
            def.group.as_deref().unwrap_or("-"),
            def.priority
        );
    }
    Ok(())
}

/// One line per notification, printed by the background listener
pub fn describe(notification: &BuffNotification, definitions: &DefinitionSet) -> String {
    let buff_name = |id| {
        definitions
            .get(id)
            .map(|def| def.name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    match notification {
        BuffNotification::BuffApplied {
            entity,
            buff,
            particle,
        } => match particle {
            Some(particle) => format!("[{entity}] + {} ({particle})", buff_name(*buff)),
            None => format!("[{entity}] + {}", buff_name(*buff)),
        },
        BuffNotification::BuffRemoved { entity, buff } => {
            format!("[{entity}] - {}", buff_name(*buff))
        }
        BuffNotification::SkillModifierChanged {
            entity,
            name,
            delta,
        } => format!("[{entity}]   {name} {}", format_signed(*delta)),
        BuffNotification::CommandGranted { entity, name } => {
            format!("[{entity}]   command {name} granted")
        }
        BuffNotification::CommandRevoked { entity, name } => {
            format!("[{entity}]   command {name} revoked")
        }
        BuffNotification::MovementScaleChanged { entity, scale } => {
            format!("[{entity}]   movement scale {scale:.2}")
        }
    }
}

pub fn exit() {
    println!("Exiting...");
}
