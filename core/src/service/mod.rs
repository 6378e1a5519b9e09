//! Buff service
//!
//! Wires the engine to its inbound signal channel and the expiration
//! worker, and routes entity lifecycle events into engine operations:
//!
//! | Signal               | Effect                                         |
//! |----------------------|------------------------------------------------|
//! | `ApplyBuff`          | [`BuffEngine::add`]                            |
//! | `RemoveBuff`         | [`BuffEngine::remove`]                         |
//! | `EntityDied`         | every buff removed                             |
//! | `EntityDisconnected` | play time stops counting                       |
//! | `EntityReconnected`  | play time resumes, expired buffs swept         |
//! | `EntityDestroyed`    | every buff removed, entity unregistered        |

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use buffkeep_types::EngineConfig;

use crate::buffs::BuffEngine;
use crate::catalog::{BuffCatalog, CommandLookup};
use crate::clock::WorldClock;
use crate::entity::EntityRegistry;
use crate::error::ServiceError;
use crate::events::{BuffNotification, BuffSignal, Notifier, SignalHandler};
use crate::ids::EntityId;
use crate::scheduler::{ExpirationScheduler, SchedulerHandle};

// ─────────────────────────────────────────────────────────────────────────────
// Signal Routing
// ─────────────────────────────────────────────────────────────────────────────

impl SignalHandler for BuffEngine {
    fn handle_signal(&self, signal: &BuffSignal) {
        match *signal {
            BuffSignal::ApplyBuff {
                receiver,
                buff,
                source,
            } => match self.add(receiver, buff, source) {
                Ok(outcome) => tracing::trace!(entity = %receiver, %buff, ?outcome, "Buff request handled"),
                Err(e) => tracing::warn!(entity = %receiver, %buff, error = %e, "Buff request failed"),
            },
            BuffSignal::RemoveBuff { receiver, buff } => {
                if let Err(e) = self.remove(receiver, buff) {
                    tracing::warn!(entity = %receiver, %buff, error = %e, "Buff removal failed");
                }
            }
            BuffSignal::EntityDied { entity } => {
                self.remove_all(entity);
            }
            BuffSignal::EntityDisconnected { entity } => match self.entities().get(entity) {
                Some(record) => record.disconnect(self.clock()),
                None => tracing::debug!(%entity, "Disconnect for unknown entity"),
            },
            BuffSignal::EntityReconnected { entity } => match self.entities().get(entity) {
                Some(record) => {
                    record.connect(self.clock());
                    let expired = self.sweep_expired(entity);
                    if expired > 0 {
                        tracing::debug!(%entity, expired, "Expired buffs swept on reconnect");
                    }
                }
                None => tracing::debug!(%entity, "Reconnect for unknown entity"),
            },
            BuffSignal::EntityDestroyed { entity } => {
                self.remove_all(entity);
                self.entities().remove(entity);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to send signals to a running buff service and query its engine
#[derive(Clone)]
pub struct BuffServiceHandle {
    pub signal_tx: mpsc::Sender<BuffSignal>,
    engine: Arc<BuffEngine>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl BuffServiceHandle {
    pub fn engine(&self) -> &Arc<BuffEngine> {
        &self.engine
    }

    /// Queue a signal for the service's signal loop
    pub async fn send(&self, signal: BuffSignal) -> Result<(), ServiceError> {
        self.signal_tx
            .send(signal)
            .await
            .map_err(|_| ServiceError::Stopped)
    }

    pub async fn apply_buff(
        &self,
        receiver: EntityId,
        buff_name: &str,
        source: EntityId,
    ) -> Result<(), ServiceError> {
        self.send(BuffSignal::apply(receiver, buff_name, source)).await
    }

    pub async fn remove_buff(&self, receiver: EntityId, buff_name: &str) -> Result<(), ServiceError> {
        self.send(BuffSignal::remove(receiver, buff_name)).await
    }

    pub async fn entity_died(&self, entity: EntityId) -> Result<(), ServiceError> {
        self.send(BuffSignal::EntityDied { entity }).await
    }

    pub async fn entity_disconnected(&self, entity: EntityId) -> Result<(), ServiceError> {
        self.send(BuffSignal::EntityDisconnected { entity }).await
    }

    pub async fn entity_reconnected(&self, entity: EntityId) -> Result<(), ServiceError> {
        self.send(BuffSignal::EntityReconnected { entity }).await
    }

    pub async fn entity_destroyed(&self, entity: EntityId) -> Result<(), ServiceError> {
        self.send(BuffSignal::EntityDestroyed { entity }).await
    }

    /// Ask the signal loop and the expiration worker to stop
    pub fn shutdown(&self) {
        // Err only when both tasks are already gone
        let _ = self.shutdown_tx.send(true);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

/// A started buff service: its handle, the outbound notification stream
/// and the background tasks.
pub struct BuffService {
    pub handle: BuffServiceHandle,
    pub notifications: mpsc::UnboundedReceiver<BuffNotification>,
    pub tasks: ServiceTasks,
}

/// Background tasks of a started service
pub struct ServiceTasks(Vec<JoinHandle<()>>);

impl ServiceTasks {
    /// Wait for the tasks to finish (after [`BuffServiceHandle::shutdown`]).
    pub async fn join(self) {
        for task in self.0 {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Buff service task failed");
            }
        }
        tracing::info!("Buff service stopped");
    }
}

impl BuffService {
    /// Build the engine and start its tasks on the current tokio runtime.
    pub fn spawn(
        config: &EngineConfig,
        catalog: Arc<dyn BuffCatalog>,
        commands: Arc<dyn CommandLookup>,
        clock: Arc<dyn WorldClock>,
        entities: EntityRegistry,
    ) -> Self {
        let (notifier, notifications) = Notifier::channel();
        let (scheduler_handle, checks) = SchedulerHandle::channel();
        let engine = Arc::new(BuffEngine::new(
            catalog,
            commands,
            entities,
            clock,
            notifier,
            scheduler_handle,
        ));

        let (signal_tx, signal_rx) = mpsc::channel(config.signal_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let scheduler = ExpirationScheduler::new(engine.clone(), checks, config.poll_interval());
        let tasks = vec![
            tokio::spawn(scheduler.run(shutdown_rx.clone())),
            tokio::spawn(run_signals(engine.clone(), signal_rx, shutdown_rx)),
        ];

        tracing::info!(
            poll_interval_ms = config.poll_interval().as_millis() as u64,
            signal_capacity = config.signal_capacity,
            "Buff service started"
        );

        Self {
            handle: BuffServiceHandle {
                signal_tx,
                engine,
                shutdown_tx: Arc::new(shutdown_tx),
            },
            notifications,
            tasks: ServiceTasks(tasks),
        }
    }
}

async fn run_signals(
    engine: Arc<BuffEngine>,
    mut signals: mpsc::Receiver<BuffSignal>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            signal = signals.recv() => match signal {
                Some(signal) => engine.handle_signal(&signal),
                None => break,
            },
        }
    }

    // Signals accepted before shutdown are still honored
    signals.close();
    while let Ok(signal) = signals.try_recv() {
        engine.handle_signal(&signal);
    }
}

#[cfg(test)]
mod tests;
