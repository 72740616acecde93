//! Run state owned by the controller.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use scrubber_config::CleanerSettings;
use serde::{Deserialize, Serialize};

use crate::resurrection::ResurrectionTracker;

/// Final classification of one processed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Deleted,
    Skipped,
    /// A resurrected item, hidden instead of deleted. Counted as skipped.
    Zombie,
    Failed,
}

/// Progress counters sent to the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    pub deleted: u64,
    pub failed: u64,
    pub skipped: u64,
    pub zombies: u64,
    pub total: u64,
    /// Percentage of processed items that were deleted, unrounded.
    pub progress: f64,
    pub page_refreshes: u32,
}

impl Stats {
    /// Count one finalized item. `total` always moves with exactly one bucket.
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Deleted => self.deleted += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Zombie => {
                self.skipped += 1;
                self.zombies += 1;
            }
            Outcome::Failed => self.failed += 1,
        }
        self.total += 1;
        self.update_progress();
    }

    pub fn update_progress(&mut self) {
        self.progress = if self.total == 0 {
            0.0
        } else {
            self.deleted as f64 / self.total as f64 * 100.0
        };
    }

    /// Success rate as a percentage with one decimal, for summaries.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.deleted as f64 / self.total as f64 * 1000.0).round() / 10.0
        }
    }
}

/// Everything one run mutates. Only the controller task touches it.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub settings: CleanerSettings,
    pub stats: Stats,
    pub consecutive_failures: u32,
    pub page_refreshes: u32,
    pub error_types: BTreeMap<String, u64>,
    pub last_deleted: ResurrectionTracker,
    /// The single refresh allowed when only permanent items remain.
    pub permanent_refresh_used: bool,
}

impl RunState {
    /// Reset for a new run. The resurrection list survives.
    pub fn reset(&mut self, settings: CleanerSettings) {
        let last_deleted = std::mem::take(&mut self.last_deleted);
        *self = Self {
            settings,
            last_deleted,
            ..Self::default()
        };
    }

    pub fn record_error(&mut self, kind: &str) {
        *self.error_types.entry(kind.to_string()).or_insert(0) += 1;
    }

    pub fn set_page_refreshes(&mut self, count: u32) {
        self.page_refreshes = count;
        self.stats.page_refreshes = count;
    }
}

/// Flags shared between the gateway and the controller.
///
/// Flipping a flag never interrupts an item; the controller reads them only
/// between items.
#[derive(Debug, Default)]
pub struct RunFlags {
    running: AtomicBool,
    paused: AtomicBool,
}

impl RunFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Transition idle → running. Returns false when already running.
    pub fn try_start(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
        if !running {
            self.paused.store(false, Ordering::SeqCst);
        }
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }
}

/// Wall-clock epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Signature;

    #[test]
    fn test_total_is_sum_of_buckets() {
        let mut stats = Stats::default();
        for outcome in [
            Outcome::Deleted,
            Outcome::Skipped,
            Outcome::Zombie,
            Outcome::Failed,
            Outcome::Deleted,
        ] {
            stats.record(outcome);
            assert_eq!(stats.total, stats.deleted + stats.failed + stats.skipped);
        }
        assert_eq!(stats.zombies, 1);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.progress, 40.0);
    }

    #[test]
    fn test_success_rate() {
        let mut stats = Stats::default();
        assert_eq!(stats.success_rate(), 0.0);
        stats.record(Outcome::Deleted);
        stats.record(Outcome::Deleted);
        stats.record(Outcome::Failed);
        assert_eq!(stats.success_rate(), 66.7);
        assert!((stats.progress - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let stats = Stats {
            page_refreshes: 2,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["pageRefreshes"], 2);
    }

    #[test]
    fn test_reset_keeps_resurrection_list() {
        let mut state = RunState::default();
        state.stats.record(Outcome::Deleted);
        state.consecutive_failures = 2;
        state.record_error("Timeout");
        state.last_deleted.record_deletion(Signature::new("a", "", ""), 1);

        let mut settings = CleanerSettings::default();
        settings.max_page_refreshes = 1;
        state.reset(settings.clone());

        assert_eq!(state.stats, Stats::default());
        assert_eq!(state.consecutive_failures, 0);
        assert!(state.error_types.is_empty());
        assert_eq!(state.settings, settings);
        assert_eq!(state.last_deleted.len(), 1);
    }

    #[test]
    fn test_record_error_tallies() {
        let mut state = RunState::default();
        state.record_error("Timeout");
        state.record_error("Timeout");
        state.record_error("ScriptError");
        assert_eq!(state.error_types["Timeout"], 2);
        assert_eq!(state.error_types["ScriptError"], 1);
    }

    #[test]
    fn test_flags_try_start_is_exclusive() {
        let flags = RunFlags::new();
        assert!(flags.try_start());
        assert!(!flags.try_start());
        flags.set_paused(true);
        flags.set_running(false);
        assert!(!flags.is_paused());
        assert!(flags.try_start());
    }
}
