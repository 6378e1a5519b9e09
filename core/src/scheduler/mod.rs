//! Expiration scheduler
//!
//! One recurring check per active buff instance. A single worker drains a
//! time-ordered queue; each firing asks the engine whether the buff is
//! still held, expired, or already gone, and re-queues it only while it is
//! still pending. Removal by any other path is the cancellation: the next
//! firing sees the instance gone and drops it.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::buffs::{BuffEngine, CheckOutcome};
use crate::ids::{BuffId, EntityId};

/// One pending expiration check for a specific buff instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduledCheck {
    pub entity: EntityId,
    pub buff: BuffId,
    pub instance: u64,
}

/// Sending side used by the engine to register new checks.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<ScheduledCheck>,
}

impl SchedulerHandle {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ScheduledCheck>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn schedule(&self, check: ScheduledCheck) {
        if self.tx.send(check).is_err() {
            tracing::warn!(
                entity = %check.entity,
                buff = %check.buff,
                "Expiration scheduler stopped, check dropped"
            );
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Time-ordered queue
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct QueuedCheck {
    due: Instant,
    /// Insertion order; keeps equal deadlines FIFO
    seq: u64,
    check: ScheduledCheck,
}

impl PartialEq for QueuedCheck {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for QueuedCheck {}

impl Ord for QueuedCheck {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, earliest deadline must pop first
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedCheck {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Checks ordered by deadline.
#[derive(Debug)]
pub struct ExpiryQueue {
    heap: BinaryHeap<QueuedCheck>,
    next_seq: u64,
    interval: Duration,
}

impl ExpiryQueue {
    pub fn new(interval: Duration) -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            interval,
        }
    }

    /// Queue `check` to fire one poll interval after `now`.
    pub fn push(&mut self, check: ScheduledCheck, now: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedCheck {
            due: now + self.interval,
            seq,
            check,
        });
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.heap.peek().map(|queued| queued.due)
    }

    /// Pop the earliest check if it is due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<ScheduledCheck> {
        if self.next_due()? <= now {
            self.heap.pop().map(|queued| queued.check)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker
// ─────────────────────────────────────────────────────────────────────────────

/// The dedicated worker that fires expiration checks.
pub struct ExpirationScheduler {
    engine: Arc<BuffEngine>,
    rx: mpsc::UnboundedReceiver<ScheduledCheck>,
    queue: ExpiryQueue,
}

impl ExpirationScheduler {
    pub fn new(
        engine: Arc<BuffEngine>,
        rx: mpsc::UnboundedReceiver<ScheduledCheck>,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            rx,
            queue: ExpiryQueue::new(interval),
        }
    }

    /// Checks waiting in the queue (not counting unread channel messages)
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Move every check waiting on the channel into the queue.
    pub fn drain_incoming(&mut self, now: Instant) {
        while let Ok(check) = self.rx.try_recv() {
            self.queue.push(check, now);
        }
    }

    /// Fire every check due at `now`. Returns how many fired.
    pub fn run_due(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        let mut still_pending = Vec::new();
        while let Some(check) = self.queue.pop_due(now) {
            fired += 1;
            match self.engine.check_expiry(check) {
                CheckOutcome::Pending | CheckOutcome::CatalogUnavailable => {
                    still_pending.push(check)
                }
                CheckOutcome::Expired | CheckOutcome::Gone => {}
            }
        }
        for check in still_pending {
            self.queue.push(check, now);
        }
        fired
    }

    /// Run until `shutdown` flips to true or every scheduler handle is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::debug!("Expiration scheduler started");
        loop {
            let next_due = self.queue.next_due();
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                incoming = self.rx.recv() => match incoming {
                    Some(check) => self.queue.push(check, Instant::now()),
                    None => break,
                },
                _ = sleep_until(next_due), if next_due.is_some() => {
                    self.run_due(Instant::now());
                }
            }
        }
        tracing::debug!(pending = self.queue.len(), "Expiration scheduler stopped");
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
