use tokio::sync::mpsc;

use crate::ids::{BuffId, EntityId};

/// Changes published to observers of an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum BuffNotification {
    /// A buff started; observers play `particle` on the entity when set
    BuffApplied {
        entity: EntityId,
        buff: BuffId,
        particle: Option<String>,
    },
    BuffRemoved {
        entity: EntityId,
        buff: BuffId,
    },
    SkillModifierChanged {
        entity: EntityId,
        name: String,
        delta: i32,
    },
    CommandGranted {
        entity: EntityId,
        name: String,
    },
    CommandRevoked {
        entity: EntityId,
        name: String,
    },
    MovementScaleChanged {
        entity: EntityId,
        scale: f32,
    },
}

impl BuffNotification {
    pub fn entity(&self) -> EntityId {
        match self {
            Self::BuffApplied { entity, .. }
            | Self::BuffRemoved { entity, .. }
            | Self::SkillModifierChanged { entity, .. }
            | Self::CommandGranted { entity, .. }
            | Self::CommandRevoked { entity, .. }
            | Self::MovementScaleChanged { entity, .. } => *entity,
        }
    }
}

/// Outbound side of the notification channel.
///
/// Publishing never fails the engine: with no receiver left, notifications
/// are dropped.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<BuffNotification>,
}

impl Notifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BuffNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, notification: BuffNotification) {
        if let Err(e) = self.tx.send(notification) {
            tracing::trace!(notification = ?e.0, "No notification listener");
        }
    }
}
