//! Passive debug subscriber.
//!
//! While enabled, keeps the most recent log entries for the host's debug
//! panel and mirrors them to `tracing` under the `scrubber::debug` target.
//! It never influences the run.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::telemetry::LogLevel;

pub const MAX_DEBUG_ENTRIES: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugEntry {
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct DebugConsole {
    enabled: AtomicBool,
    entries: Mutex<VecDeque<DebugEntry>>,
}

impl DebugConsole {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            entries: Mutex::new(VecDeque::with_capacity(MAX_DEBUG_ENTRIES)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            tracing::info!(target: "scrubber::debug", enabled, "debug subscriber toggled");
        }
    }

    pub fn record(&self, level: LogLevel, message: &str) {
        if !self.is_enabled() {
            return;
        }
        match level {
            LogLevel::Error => tracing::error!(target: "scrubber::debug", "{}", message),
            LogLevel::Warning => tracing::warn!(target: "scrubber::debug", "{}", message),
            LogLevel::Info | LogLevel::Success => {
                tracing::debug!(target: "scrubber::debug", "{}", message)
            }
        }
        let mut entries = self.entries.lock();
        if entries.len() == MAX_DEBUG_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(DebugEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level,
            message: message.to_string(),
        });
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<DebugEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_records_nothing() {
        let console = DebugConsole::new(false);
        console.record(LogLevel::Info, "hello");
        assert!(console.entries().is_empty());
    }

    #[test]
    fn test_ring_buffer_keeps_latest() {
        let console = DebugConsole::new(true);
        for i in 0..150 {
            console.record(LogLevel::Info, &format!("entry {i}"));
        }
        let entries = console.entries();
        assert_eq!(entries.len(), MAX_DEBUG_ENTRIES);
        assert_eq!(entries[0].message, "entry 50");
        assert_eq!(entries[99].message, "entry 149");
    }

    #[test]
    fn test_toggle() {
        let console = DebugConsole::new(false);
        console.set_enabled(true);
        console.record(LogLevel::Warning, "careful");
        console.set_enabled(false);
        console.record(LogLevel::Warning, "ignored");
        assert_eq!(console.entries().len(), 1);

        console.clear();
        assert!(console.entries().is_empty());
    }
}
