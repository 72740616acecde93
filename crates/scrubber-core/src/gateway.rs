//! Command surface used by the host UI.
//!
//! [`ControlHandle`] is cheap to clone and safe to call from any task. Start
//! is guarded by an atomic transition so a second start is rejected without
//! touching the run; stop and pause only flip flags the controller reads
//! between items.

use std::sync::Arc;

use scrubber_config::{CleanerSettings, ConfigLoader, ConfigValidator};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use crate::debug::DebugEntry;
use crate::error::GatewayError;
use crate::persistence::keys;
use crate::state::{RunFlags, Stats};
use crate::store::StateWriter;
use crate::telemetry::{TelemetryEvent, TelemetryHub};

/// Messages from the gateway to the controller task.
#[derive(Debug, Clone)]
pub enum ControlCommand {
    Start(CleanerSettings),
    Resume,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
}

#[derive(Clone)]
pub struct ControlHandle {
    flags: Arc<RunFlags>,
    commands: mpsc::Sender<ControlCommand>,
    telemetry: Arc<TelemetryHub>,
    writer: Arc<dyn StateWriter>,
    defaults: CleanerSettings,
}

impl ControlHandle {
    pub(crate) fn new(
        flags: Arc<RunFlags>,
        commands: mpsc::Sender<ControlCommand>,
        telemetry: Arc<TelemetryHub>,
        writer: Arc<dyn StateWriter>,
        defaults: CleanerSettings,
    ) -> Self {
        Self {
            flags,
            commands,
            telemetry,
            writer,
            defaults,
        }
    }

    /// Start a run. `overrides` is a partial settings object merged over the
    /// configured defaults.
    pub async fn start(&self, overrides: Option<&Value>) -> CommandResponse {
        let settings =
            match ConfigLoader::merge_settings(&self.defaults, overrides.unwrap_or(&Value::Null)) {
                Ok(settings) => settings,
                Err(e) => return CommandResponse::rejected(format!("Invalid settings: {e}")),
            };
        if let Some(e) = ConfigValidator::validate_settings(&settings).into_error() {
            return CommandResponse::rejected(e.to_string());
        }

        if !self.flags.try_start() {
            info!("Start rejected: already running");
            return CommandResponse::rejected("Already running");
        }
        if self
            .commands
            .send(ControlCommand::Start(settings))
            .await
            .is_err()
        {
            self.flags.set_running(false);
            return CommandResponse::rejected(GatewayError::ControllerGone.to_string());
        }
        CommandResponse::ok_with("Cleaning started")
    }

    pub fn stop(&self) -> CommandResponse {
        self.flags.set_running(false);
        if self.commands.try_send(ControlCommand::Stop).is_err() {
            warn!("Stop command not queued; the flag alone will end the run");
        }
        CommandResponse::ok()
    }

    pub fn pause(&self) -> CommandResponse {
        if self.flags.is_running() {
            self.flags.set_paused(true);
        }
        CommandResponse::ok()
    }

    pub fn resume(&self) -> CommandResponse {
        self.flags.set_paused(false);
        if self.commands.try_send(ControlCommand::Resume).is_err() {
            warn!("Resume command not queued");
        }
        CommandResponse::ok()
    }

    pub fn ping(&self) -> PingResponse {
        PingResponse {
            status: "ok".to_string(),
        }
    }

    /// Enable or disable the debug subscriber. Independent of the run.
    pub async fn toggle_debug(&self, enabled: bool) -> CommandResponse {
        self.telemetry.debug().set_enabled(enabled);
        let mut entries = Map::new();
        entries.insert(keys::DEBUG_ENABLED.to_string(), Value::Bool(enabled));
        self.writer.write(entries).await;
        CommandResponse::ok_with(if enabled {
            "Debug mode enabled"
        } else {
            "Debug mode disabled"
        })
    }

    /// Entries held by the debug subscriber, oldest first.
    pub fn debug_entries(&self) -> Vec<DebugEntry> {
        self.telemetry.debug().entries()
    }

    pub fn clear_debug(&self) -> CommandResponse {
        self.telemetry.debug().clear();
        CommandResponse::ok()
    }

    pub fn is_running(&self) -> bool {
        self.flags.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.flags.is_paused()
    }

    pub fn stats(&self) -> Stats {
        self.telemetry.latest_stats()
    }

    pub fn status(&self) -> String {
        self.telemetry.latest_status()
    }

    pub fn telemetry(&self) -> &Arc<TelemetryHub> {
        &self.telemetry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.telemetry.subscribe()
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
