//! Logical time
//!
//! Buff expiry is measured in logical seconds, not wall-clock time. NPCs
//! follow the shared world clock; players follow their own accumulated
//! play time, which stops advancing while they are disconnected.

use std::sync::atomic::{AtomicI64, Ordering};

use tokio::time::Instant;

/// Logical time in seconds.
pub type LogicalTime = i64;

/// Source of the shared world time.
pub trait WorldClock: Send + Sync {
    fn now(&self) -> LogicalTime;
}

/// World clock driven by the tokio clock.
///
/// Reads `offset + whole seconds since construction`. Under a paused tokio
/// runtime it advances together with `tokio::time::advance`.
#[derive(Debug, Clone)]
pub struct TokioWorldClock {
    epoch: Instant,
    offset: LogicalTime,
}

impl TokioWorldClock {
    pub fn new(offset: LogicalTime) -> Self {
        Self {
            epoch: Instant::now(),
            offset,
        }
    }
}

impl WorldClock for TokioWorldClock {
    fn now(&self) -> LogicalTime {
        self.offset + self.epoch.elapsed().as_secs() as LogicalTime
    }
}

/// Externally stepped world clock.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start: LogicalTime) -> Self {
        Self(AtomicI64::new(start))
    }

    pub fn set(&self, now: LogicalTime) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: LogicalTime) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl WorldClock for ManualClock {
    fn now(&self) -> LogicalTime {
        self.0.load(Ordering::SeqCst)
    }
}

/// Accumulated connected time of one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayTime {
    /// Play time banked from finished sessions
    accumulated: LogicalTime,
    /// World time the current session started (None = disconnected)
    connected_at: Option<LogicalTime>,
}

impl PlayTime {
    /// Start counting from `accumulated`, connected at world time `now`.
    pub fn connected(accumulated: LogicalTime, now: LogicalTime) -> Self {
        Self {
            accumulated,
            connected_at: Some(now),
        }
    }

    /// A character that is not currently in the world.
    pub fn disconnected(accumulated: LogicalTime) -> Self {
        Self {
            accumulated,
            connected_at: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected_at.is_some()
    }

    /// Play time at world time `now`.
    pub fn current(&self, now: LogicalTime) -> LogicalTime {
        match self.connected_at {
            Some(start) => self.accumulated + (now - start).max(0),
            None => self.accumulated,
        }
    }

    /// Resume counting. No-op when already connected.
    pub fn connect(&mut self, now: LogicalTime) {
        if self.connected_at.is_none() {
            self.connected_at = Some(now);
        }
    }

    /// Bank the running session and stop counting.
    pub fn disconnect(&mut self, now: LogicalTime) {
        if self.connected_at.is_some() {
            self.accumulated = self.current(now);
            self.connected_at = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_time_pauses_while_disconnected() {
        let mut play = PlayTime::connected(100, 0);
        assert_eq!(play.current(10), 110);

        play.disconnect(10);
        assert!(!play.is_connected());
        assert_eq!(play.current(500), 110);

        play.connect(500);
        assert_eq!(play.current(505), 115);
    }

    #[test]
    fn repeated_connect_and_disconnect_are_idempotent() {
        let mut play = PlayTime::connected(0, 0);
        play.connect(50);
        assert_eq!(play.current(60), 60);

        play.disconnect(60);
        play.disconnect(90);
        assert_eq!(play.current(200), 60);
    }

    #[test]
    fn manual_clock_steps() {
        let clock = ManualClock::new(5);
        clock.advance(3);
        assert_eq!(clock.now(), 8);
        clock.set(100);
        assert_eq!(clock.now(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_follows_paused_time() {
        let clock = TokioWorldClock::new(1000);
        assert_eq!(clock.now(), 1000);
        tokio::time::advance(std::time::Duration::from_millis(2500)).await;
        assert_eq!(clock.now(), 1002);
    }
}
