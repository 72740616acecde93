//! Outbound telemetry: status, stats, lifecycle and activity events.
//!
//! Status and stats are coalesced per channel: the first event in an
//! interval goes out immediately, later ones collapse into a single
//! trailing-edge delivery of the latest value. Lifecycle and activity events
//! are never throttled.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use scrubber_config::ThrottleConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::trace;

use crate::debug::DebugConsole;
use crate::state::Stats;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Event sent to every telemetry subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum TelemetryEvent {
    UpdateStatus {
        status: String,
    },
    UpdateStats {
        stats: Stats,
    },
    CleaningStarted,
    CleaningStopped,
    CleaningCompleted {
        stats: Stats,
        #[serde(rename = "errorTypes")]
        error_types: BTreeMap<String, u64>,
    },
    LogActivity {
        message: String,
        level: LogLevel,
    },
}

struct ThrottleState {
    last_sent: Option<Instant>,
    pending: Option<TelemetryEvent>,
    timer_armed: bool,
}

/// Per-channel coalescing.
struct Throttle {
    interval: Duration,
    sender: broadcast::Sender<TelemetryEvent>,
    state: Arc<Mutex<ThrottleState>>,
}

impl Throttle {
    fn new(interval: Duration, sender: broadcast::Sender<TelemetryEvent>) -> Self {
        Self {
            interval,
            sender,
            state: Arc::new(Mutex::new(ThrottleState {
                last_sent: None,
                pending: None,
                timer_armed: false,
            })),
        }
    }

    fn emit(&self, event: TelemetryEvent) {
        let mut state = self.state.lock();
        let elapsed = state.last_sent.map(|t| t.elapsed());
        match elapsed {
            Some(elapsed) if elapsed < self.interval => {
                state.pending = Some(event);
                if state.timer_armed {
                    return;
                }
                state.timer_armed = true;
                let delay = self.interval - elapsed;
                let shared = self.state.clone();
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let mut state = shared.lock();
                    state.timer_armed = false;
                    if let Some(event) = state.pending.take() {
                        state.last_sent = Some(Instant::now());
                        let _ = sender.send(event);
                    }
                });
            }
            _ => {
                state.last_sent = Some(Instant::now());
                state.pending = None;
                let _ = self.sender.send(event);
            }
        }
    }

    fn flush(&self) {
        let mut state = self.state.lock();
        if let Some(event) = state.pending.take() {
            state.last_sent = Some(Instant::now());
            let _ = self.sender.send(event);
        }
    }
}

/// Fan-out point for everything the host UI displays.
pub struct TelemetryHub {
    sender: broadcast::Sender<TelemetryEvent>,
    status: Throttle,
    stats: Throttle,
    latest_status: Mutex<String>,
    latest_stats: Mutex<Stats>,
    debug: Arc<DebugConsole>,
}

impl TelemetryHub {
    pub fn new(config: &ThrottleConfig, debug: Arc<DebugConsole>) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            status: Throttle::new(config.status_update(), sender.clone()),
            stats: Throttle::new(config.stats_update(), sender.clone()),
            sender,
            latest_status: Mutex::new("Idle".to_string()),
            latest_stats: Mutex::new(Stats::default()),
            debug,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.sender.subscribe()
    }

    pub fn debug(&self) -> &Arc<DebugConsole> {
        &self.debug
    }

    pub fn update_status(&self, status: impl Into<String>) {
        let status = status.into();
        trace!(%status, "status update");
        *self.latest_status.lock() = status.clone();
        self.debug.record(LogLevel::Info, &status);
        self.status.emit(TelemetryEvent::UpdateStatus { status });
    }

    pub fn update_stats(&self, stats: &Stats) {
        *self.latest_stats.lock() = stats.clone();
        self.stats.emit(TelemetryEvent::UpdateStats {
            stats: stats.clone(),
        });
    }

    pub fn log_activity(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        self.debug.record(level, &message);
        self.send(TelemetryEvent::LogActivity { message, level });
    }

    pub fn started(&self) {
        self.send(TelemetryEvent::CleaningStarted);
    }

    pub fn stopped(&self) {
        self.flush();
        self.send(TelemetryEvent::CleaningStopped);
    }

    pub fn completed(&self, stats: &Stats, error_types: &BTreeMap<String, u64>) {
        self.flush();
        self.send(TelemetryEvent::CleaningCompleted {
            stats: stats.clone(),
            error_types: error_types.clone(),
        });
    }

    /// Deliver pending throttled events now.
    pub fn flush(&self) {
        self.status.flush();
        self.stats.flush();
    }

    pub fn latest_status(&self) -> String {
        self.latest_status.lock().clone()
    }

    pub fn latest_stats(&self) -> Stats {
        self.latest_stats.lock().clone()
    }

    fn send(&self, event: TelemetryEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
