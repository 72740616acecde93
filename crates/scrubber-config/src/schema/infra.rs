//! Browser, throttling, caching and persistence configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Browser connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Chrome remote debugging port.
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    /// Launch Chrome when nothing listens on the debug port.
    #[serde(default = "default_true")]
    pub launch: bool,

    #[serde(default)]
    pub headless: bool,

    /// Profile directory for persistent login state.
    #[serde(default)]
    pub profile_dir: Option<String>,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Page opened when the attached tab is not an activity log.
    #[serde(default = "default_activity_log_url")]
    pub activity_log_url: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            debug_port: default_debug_port(),
            launch: true,
            headless: false,
            profile_dir: None,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            activity_log_url: default_activity_log_url(),
        }
    }
}

impl BrowserConfig {
    /// CDP HTTP endpoint.
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.debug_port)
    }

    /// Profile directory, defaulting to `~/.scrubber/browser-profile`.
    pub fn profile_dir(&self) -> PathBuf {
        match &self.profile_dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).to_string()),
            None => scrubber_home().join("browser-profile"),
        }
    }
}

fn default_debug_port() -> u16 {
    9222
}

fn default_true() -> bool {
    true
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    900
}

fn default_activity_log_url() -> String {
    "https://www.facebook.com/me/allactivity".to_string()
}

/// Outbound coalescing intervals, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub status_update: u64,
    pub stats_update: u64,
    pub storage_write: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            status_update: 500,
            stats_update: 1000,
            storage_write: 1000,
        }
    }
}

impl ThrottleConfig {
    pub fn status_update(&self) -> Duration {
        Duration::from_millis(self.status_update)
    }

    pub fn stats_update(&self) -> Duration {
        Duration::from_millis(self.stats_update)
    }

    pub fn storage_write(&self) -> Duration {
        Duration::from_millis(self.storage_write)
    }
}

/// DOM query cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// TTL for trigger queries, in milliseconds.
    pub ttl: u64,
    /// TTL for menu entries, which open and close constantly.
    pub menu_ttl: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: 1000,
            menu_ttl: 100,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl)
    }

    pub fn menu_ttl(&self) -> Duration {
        Duration::from_millis(self.menu_ttl)
    }
}

/// Cross-reload persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Durable key/value state file.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// How long after a forced reload a persisted run is still resumed, in milliseconds.
    #[serde(default = "default_resume_window")]
    pub resume_window: u64,

    /// Delay before a restored run resumes, in milliseconds.
    #[serde(default = "default_resume_delay")]
    pub resume_delay: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            resume_window: default_resume_window(),
            resume_delay: default_resume_delay(),
        }
    }
}

impl PersistenceConfig {
    pub fn state_file(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.state_file).to_string())
    }

    pub fn resume_window(&self) -> Duration {
        Duration::from_millis(self.resume_window)
    }

    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay)
    }
}

fn default_state_file() -> String {
    "~/.scrubber/state.json".to_string()
}

fn default_resume_window() -> u64 {
    30_000
}

fn default_resume_delay() -> u64 {
    3_000
}

/// The `~/.scrubber` directory.
pub fn scrubber_home() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".scrubber"))
        .unwrap_or_else(|| PathBuf::from(".scrubber"))
}
