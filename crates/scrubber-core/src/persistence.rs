//! Cross-reload persistence protocol.
//!
//! Immediately before a forced reload the controller writes a snapshot of the
//! run. On load, a snapshot younger than the resume window is restored and
//! the run resumes; an older one only has its `isRunning` flag cleared.

use std::time::Duration;

use scrubber_config::CleanerSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::resurrection::{DeletionRecord, ResurrectionTracker};
use crate::state::{RunState, Stats};
use crate::store::Entries;

/// Persisted key names.
pub mod keys {
    pub const IS_RUNNING: &str = "isRunning";
    pub const SETTINGS: &str = "cleanerSettings";
    pub const STATS: &str = "cleanerStats";
    pub const PAGE_REFRESHES: &str = "pageRefreshes";
    pub const CONSECUTIVE_FAILURES: &str = "consecutiveFailures";
    pub const REFRESH_TIMESTAMP: &str = "refreshTimestamp";
    pub const DEBUG_ENABLED: &str = "debugEnabled";
    pub const DELETED_ACTIVITIES: &str = "deletedActivities";
    pub const PERMANENT_REFRESH_USED: &str = "permanentRefreshUsed";
}

/// Typed view over the persisted keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedRun {
    pub is_running: bool,
    #[serde(rename = "cleanerSettings", skip_serializing_if = "Option::is_none")]
    pub settings: Option<CleanerSettings>,
    #[serde(rename = "cleanerStats", skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
    pub page_refreshes: u32,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_timestamp: Option<i64>,
    pub debug_enabled: bool,
    pub deleted_activities: Vec<DeletionRecord>,
    pub permanent_refresh_used: bool,
}

impl PersistedRun {
    /// Parse stored entries. Unparseable values fall back to defaults key by
    /// key, so one corrupt entry does not lose the rest.
    pub fn from_entries(entries: &Entries) -> Self {
        if let Ok(run) = serde_json::from_value::<Self>(Value::Object(entries.clone())) {
            return run;
        }
        warn!("Persisted state is partially unreadable, recovering key by key");
        let mut recovered = Entries::new();
        for (key, value) in entries {
            let mut single = Entries::new();
            single.insert(key.clone(), value.clone());
            if serde_json::from_value::<Self>(Value::Object(single)).is_ok() {
                recovered.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(Value::Object(recovered)).unwrap_or_default()
    }

    /// Snapshot written immediately before a forced reload.
    pub fn snapshot(state: &RunState, now_ms: i64) -> Self {
        Self {
            is_running: true,
            settings: Some(state.settings.clone()),
            stats: Some(state.stats.clone()),
            page_refreshes: state.page_refreshes,
            consecutive_failures: state.consecutive_failures,
            refresh_timestamp: Some(now_ms),
            debug_enabled: false,
            deleted_activities: state.last_deleted.to_records(),
            permanent_refresh_used: state.permanent_refresh_used,
        }
    }

    /// Entries for the run-related keys. Leaves `debugEnabled` alone.
    pub fn run_entries(&self) -> Entries {
        let mut entries = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Entries::new(),
        };
        entries.remove(keys::DEBUG_ENABLED);
        entries
    }

    /// Write the restored values into a fresh run state.
    pub fn apply_to(&self, state: &mut RunState) {
        state.reset(self.settings.clone().unwrap_or_default());
        if let Some(stats) = &self.stats {
            state.stats = stats.clone();
        }
        state.set_page_refreshes(self.page_refreshes);
        state.consecutive_failures = self.consecutive_failures;
        state.permanent_refresh_used = self.permanent_refresh_used;
        state.last_deleted = ResurrectionTracker::from_records(self.deleted_activities.clone());
    }
}

/// Entries that mark the run as no longer in progress.
pub fn idle_entries() -> Entries {
    let mut entries = Entries::new();
    entries.insert(keys::IS_RUNNING.to_string(), Value::Bool(false));
    entries
}

/// What to do with persisted state on load.
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreDecision {
    /// A run was in flight within the resume window.
    Resume(Box<PersistedRun>),
    /// A run was in flight but the window elapsed; clear `isRunning`.
    Expired,
    /// Nothing to resume.
    Idle,
}

/// Decide whether a persisted run resumes.
pub fn decide_restore(persisted: &PersistedRun, now_ms: i64, window: Duration) -> RestoreDecision {
    if !persisted.is_running {
        return RestoreDecision::Idle;
    }
    let Some(refreshed_at) = persisted.refresh_timestamp else {
        return RestoreDecision::Expired;
    };
    let elapsed = now_ms.saturating_sub(refreshed_at);
    if elapsed >= 0 && (elapsed as u128) <= window.as_millis() {
        RestoreDecision::Resume(Box::new(persisted.clone()))
    } else {
        RestoreDecision::Expired
    }
}

#[cfg(test)]
#[path = "persistence_tests.rs"]
mod tests;
