//! Run settings: batch ceilings and per-step waits.
//!
//! These are the settings a start command carries. They are serialized into
//! the state file before a forced reload and restored afterwards, so every
//! field has a serde default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for one cleaning run.
///
/// Unknown keys are rejected so a misspelled override fails the start
/// instead of silently running with defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanerSettings {
    /// Items processed before the loop takes a `pause_interval` breather.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Breather between batches, in milliseconds.
    #[serde(default = "default_pause_interval")]
    pub pause_interval: u64,

    /// Per-step waits.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Consecutive empty discoveries tolerated before a page refresh.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Forced page reloads allowed per run.
    #[serde(default = "default_max_page_refreshes")]
    pub max_page_refreshes: u32,

    /// Re-attempts of a menu action whose confirmation was not observed.
    #[serde(default = "default_max_action_retries")]
    pub max_action_retries: u32,
}

impl Default for CleanerSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            pause_interval: default_pause_interval(),
            timing: TimingConfig::default(),
            max_consecutive_failures: default_max_consecutive_failures(),
            max_page_refreshes: default_max_page_refreshes(),
            max_action_retries: default_max_action_retries(),
        }
    }
}

impl CleanerSettings {
    pub fn pause_interval(&self) -> Duration {
        Duration::from_millis(self.pause_interval)
    }
}

fn default_batch_size() -> u32 {
    10
}

fn default_pause_interval() -> u64 {
    1000
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_max_page_refreshes() -> u32 {
    5
}

fn default_max_action_retries() -> u32 {
    2
}

/// Waits between DOM interactions, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// After clicking a trigger, before reading its menu.
    pub menu_wait: u64,
    /// After reading menu entries, and before re-checking for a dialog on retry.
    pub modal_wait: u64,
    /// After a confirmed action.
    pub action_complete: u64,
    /// Between items.
    pub next_item: u64,
    /// After a scroll with nothing found, and after a reload.
    pub page_load: u64,
    /// Before comparing the DOM against the pre-action baseline.
    pub no_modal_wait: u64,
    /// Between scroll-for-more attempts.
    pub scroll_wait: u64,
    /// After scrolling a trigger into view.
    pub element_scroll: u64,
    /// After closing a dialog, before a retry.
    pub retry_wait: u64,
    /// Poll interval while waiting for a hidden item's menu to close.
    pub hide_from_profile_check: u64,
    /// Upper bound on polling for a confirmation dialog.
    pub modal_timeout: u64,
    /// After pressing Escape to close a menu.
    pub close_wait: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            menu_wait: 300,
            modal_wait: 300,
            action_complete: 500,
            next_item: 300,
            page_load: 2000,
            no_modal_wait: 200,
            scroll_wait: 1500,
            element_scroll: 200,
            retry_wait: 200,
            hide_from_profile_check: 100,
            modal_timeout: 2000,
            close_wait: 800,
        }
    }
}

macro_rules! duration_getters {
    ($($name:ident),* $(,)?) => {
        impl TimingConfig {
            $(
                pub fn $name(&self) -> Duration {
                    Duration::from_millis(self.$name)
                }
            )*
        }
    };
}

duration_getters!(
    menu_wait,
    modal_wait,
    action_complete,
    next_item,
    page_load,
    no_modal_wait,
    scroll_wait,
    element_scroll,
    retry_wait,
    hide_from_profile_check,
    modal_timeout,
    close_wait,
);
