use crate::ids::{BuffId, EntityId};

/// Requests and lifecycle events consumed by the buff service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuffSignal {
    // Buff requests (raised by combat, commands, groups, quests, ...)
    ApplyBuff {
        receiver: EntityId,
        buff: BuffId,
        source: EntityId,
    },
    RemoveBuff {
        receiver: EntityId,
        buff: BuffId,
    },

    // Entity lifecycle
    EntityDied {
        entity: EntityId,
    },
    /// Player zoned back in; their play time resumes and stale buffs are swept
    EntityReconnected {
        entity: EntityId,
    },
    /// Player left the world; their play time stops counting
    EntityDisconnected {
        entity: EntityId,
    },
    /// Entity is about to be dropped from the world
    EntityDestroyed {
        entity: EntityId,
    },
}

impl BuffSignal {
    pub fn apply(receiver: EntityId, buff_name: &str, source: EntityId) -> Self {
        Self::ApplyBuff {
            receiver,
            buff: BuffId::from_name(buff_name),
            source,
        }
    }

    pub fn remove(receiver: EntityId, buff_name: &str) -> Self {
        Self::RemoveBuff {
            receiver,
            buff: BuffId::from_name(buff_name),
        }
    }

    /// The entity whose buff set this signal touches
    pub fn entity(&self) -> EntityId {
        match self {
            Self::ApplyBuff { receiver, .. } | Self::RemoveBuff { receiver, .. } => *receiver,
            Self::EntityDied { entity }
            | Self::EntityReconnected { entity }
            | Self::EntityDisconnected { entity }
            | Self::EntityDestroyed { entity } => *entity,
        }
    }
}

/// Consumer of [`BuffSignal`]s.
pub trait SignalHandler {
    fn handle_signal(&self, signal: &BuffSignal);
}
