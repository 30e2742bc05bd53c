//! Periodic timestamp sources.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::error::{Result, WiringError};
use crate::wire::OutputWire;

/// Vertex every heartbeat wire originates from.
pub(crate) const HEARTBEAT_VERTEX: &str = "heartbeat";

struct Heartbeat {
    period: Duration,
    wire: OutputWire<Instant>,
    next_due: Instant,
}

/// One background thread emitting every registered heartbeat at its period.
pub(crate) struct HeartbeatEngine {
    pending: Mutex<Vec<(Duration, OutputWire<Instant>)>>,
    stop: Mutex<Option<Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatEngine {
    pub(crate) fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            stop: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }

    pub(crate) fn register(&self, period: Duration, wire: OutputWire<Instant>) {
        self.pending.lock().push((period, wire));
    }

    pub(crate) fn start(&self) -> Result<()> {
        let start = Instant::now();
        let mut heartbeats: Vec<Heartbeat> = self
            .pending
            .lock()
            .drain(..)
            .map(|(period, wire)| Heartbeat {
                period,
                wire,
                next_due: start + period,
            })
            .collect();
        if heartbeats.is_empty() {
            return Ok(());
        }

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let handle = std::thread::Builder::new()
            .name(HEARTBEAT_VERTEX.to_string())
            .spawn(move || {
                loop {
                    let next_due = heartbeats
                        .iter()
                        .map(|h| h.next_due)
                        .min()
                        .unwrap_or_else(Instant::now);
                    let timeout = next_due.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(timeout) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    let now = Instant::now();
                    for heartbeat in heartbeats.iter_mut().filter(|h| h.next_due <= now) {
                        heartbeat.wire.forward(now);
                        heartbeat.next_due += heartbeat.period;
                        // Skip missed beats rather than bursting.
                        if heartbeat.next_due <= now {
                            heartbeat.next_due = now + heartbeat.period;
                        }
                    }
                }
            })
            .map_err(|e| WiringError::ThreadSpawn {
                name: HEARTBEAT_VERTEX.to_string(),
                reason: e.to_string(),
            })?;

        *self.stop.lock() = Some(stop_tx);
        *self.handle.lock() = Some(handle);
        tracing::debug!("heartbeat thread started");
        Ok(())
    }

    pub(crate) fn stop(&self) {
        drop(self.stop.lock().take());
        if let Some(handle) = self.handle.lock().take()
            && handle.join().is_err()
        {
            tracing::error!("heartbeat thread panicked");
        }
    }
}

/// A heartbeat driven by a simulated clock, stepped once per tick.
pub(crate) struct DeterministicHeartbeat {
    period: Duration,
    previous: Instant,
    wire: OutputWire<Instant>,
}

impl DeterministicHeartbeat {
    pub(crate) fn new(period: Duration, now: Instant, wire: OutputWire<Instant>) -> Self {
        Self {
            period,
            previous: now,
            wire,
        }
    }

    pub(crate) fn reset(&mut self, now: Instant) {
        self.previous = now;
    }

    /// Timestamps owed at `now`, one per whole elapsed period.
    pub(crate) fn due(&mut self, now: Instant) -> Vec<Instant> {
        let mut beats = Vec::new();
        while now.saturating_duration_since(self.previous) >= self.period {
            self.previous += self.period;
            beats.push(self.previous);
        }
        beats
    }

    pub(crate) fn wire(&self) -> &OutputWire<Instant> {
        &self.wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Weak;

    fn detached_wire() -> OutputWire<Instant> {
        OutputWire::new(HEARTBEAT_VERTEX, Weak::new())
    }

    #[test]
    fn deterministic_catches_up_whole_periods() {
        let t0 = Instant::now();
        let mut heartbeat = DeterministicHeartbeat::new(Duration::from_millis(10), t0, detached_wire());

        assert!(heartbeat.due(t0 + Duration::from_millis(9)).is_empty());
        let beats = heartbeat.due(t0 + Duration::from_millis(35));
        assert_eq!(
            beats,
            vec![
                t0 + Duration::from_millis(10),
                t0 + Duration::from_millis(20),
                t0 + Duration::from_millis(30),
            ]
        );
        assert_eq!(heartbeat.due(t0 + Duration::from_millis(40)).len(), 1);
    }

    #[test]
    fn reset_discards_owed_beats() {
        let t0 = Instant::now();
        let mut heartbeat = DeterministicHeartbeat::new(Duration::from_millis(10), t0, detached_wire());
        let later = t0 + Duration::from_secs(1);
        heartbeat.reset(later);
        assert!(heartbeat.due(later).is_empty());
    }
}
