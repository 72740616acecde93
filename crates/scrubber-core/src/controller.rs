//! The batch control loop.
//!
//! A [`Controller`] is a single task that owns the [`RunState`]. It pulls
//! commands from the gateway channel, drives discovery and per-item
//! processing, and reloads the page when the visible list runs dry. Run
//! flags are consulted only between items.

use std::sync::Arc;
use std::time::Duration;

use scrubber_config::{CleanerSettings, Config, PersistenceConfig};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::debug::DebugConsole;
use crate::error::PageError;
use crate::gateway::{ControlCommand, ControlHandle};
use crate::modal::{ConfirmationResolver, DialogResolver};
use crate::page::{ElementHandle, PageAdapter, is_visible};
use crate::persistence::{PersistedRun, idle_entries, keys};
use crate::processor::ItemProcessor;
use crate::query::{CachedElementQuery, ElementQuery};
use crate::state::{Outcome, RunFlags, RunState};
use crate::store::{Entries, StateStore, StateWriter, ThrottledStateWriter};
use crate::telemetry::{LogLevel, TelemetryHub};

const COMMAND_BUFFER: usize = 32;

/// Settle time after a resume before discovery restarts.
const RESUME_SETTLE: Duration = Duration::from_millis(500);

const PERMANENT_ONLY: &str = "Reached maximum page refreshes. Only permanent posts remain.";
const NOTHING_LEFT: &str = "Reached maximum page refreshes. No more items to delete.";

/// Collaborators a controller is assembled from.
pub struct ControllerParts {
    pub page: Arc<dyn PageAdapter>,
    pub query: Arc<dyn ElementQuery>,
    pub resolver: Arc<dyn ConfirmationResolver>,
    pub store: Arc<dyn StateStore>,
    pub writer: Arc<dyn StateWriter>,
    pub telemetry: Arc<TelemetryHub>,
    pub persistence: PersistenceConfig,
    pub defaults: CleanerSettings,
}

impl ControllerParts {
    /// Wire the stock query cache, dialog resolver, throttled writer and
    /// telemetry hub around a page and a store.
    pub fn standard(page: Arc<dyn PageAdapter>, store: Arc<dyn StateStore>, config: &Config) -> Self {
        let query: Arc<dyn ElementQuery> =
            Arc::new(CachedElementQuery::new(page.clone(), config.cache.clone()));
        let resolver = Arc::new(DialogResolver::new(page.clone(), query.clone()));
        let writer = Arc::new(ThrottledStateWriter::new(
            store.clone(),
            config.throttle.storage_write(),
        ));
        let telemetry = Arc::new(TelemetryHub::new(
            &config.throttle,
            Arc::new(DebugConsole::new(false)),
        ));
        Self {
            page,
            query,
            resolver,
            store,
            writer,
            telemetry,
            persistence: config.persistence.clone(),
            defaults: config.cleaner.clone(),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RunEnd {
    Completed(String),
    Stopped,
}

/// Result of one discovery step.
#[derive(Debug)]
pub(crate) enum Step {
    /// Nothing processed; look again.
    Continue,
    /// One item was processed.
    Item(Outcome),
    /// The run is over.
    Done(String),
}

pub struct Controller {
    pub(crate) page: Arc<dyn PageAdapter>,
    pub(crate) query: Arc<dyn ElementQuery>,
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) writer: Arc<dyn StateWriter>,
    pub(crate) telemetry: Arc<TelemetryHub>,
    pub(crate) processor: ItemProcessor,
    pub(crate) flags: Arc<RunFlags>,
    pub(crate) commands: mpsc::Receiver<ControlCommand>,
    pub(crate) persistence: PersistenceConfig,
    pub(crate) state: RunState,
}

impl Controller {
    pub fn new(parts: ControllerParts) -> (Self, ControlHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let flags = Arc::new(RunFlags::new());
        let handle = ControlHandle::new(
            flags.clone(),
            tx,
            parts.telemetry.clone(),
            parts.writer.clone(),
            parts.defaults.clone(),
        );
        let processor = ItemProcessor::new(
            parts.page.clone(),
            parts.query.clone(),
            parts.resolver,
            parts.telemetry.clone(),
        );
        let controller = Self {
            page: parts.page,
            query: parts.query,
            store: parts.store,
            writer: parts.writer,
            telemetry: parts.telemetry,
            processor,
            flags,
            commands: rx,
            persistence: parts.persistence,
            state: RunState {
                settings: parts.defaults,
                ..RunState::default()
            },
        };
        (controller, handle)
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Serve commands until every [`ControlHandle`] is dropped.
    pub async fn run(mut self) {
        if self.restore_on_load(crate::state::now_ms()).await {
            sleep(self.persistence.resume_delay()).await;
            if self.flags.is_running() {
                self.drive().await;
            } else {
                self.finish(RunEnd::Stopped).await;
            }
        }

        while let Some(command) = self.commands.recv().await {
            match command {
                ControlCommand::Start(settings) => {
                    self.begin(settings).await;
                    self.drive().await;
                }
                ControlCommand::Resume => debug!("Resume with no paused run"),
                ControlCommand::Stop => debug!("Stop with no active run"),
            }
        }
        debug!("Command channel closed, controller exiting");
    }

    /// Reset state for a new run and announce it.
    pub(crate) async fn begin(&mut self, settings: CleanerSettings) {
        info!(?settings, "Starting activity cleaning");
        self.state.reset(settings);
        self.flags.set_running(true);
        self.flags.set_paused(false);
        self.query.invalidate();
        self.telemetry.started();
        self.telemetry.update_status("Starting activity cleaning...");
        self.telemetry.update_stats(&self.state.stats);

        let mut entries = PersistedRun::snapshot(&self.state, 0).run_entries();
        entries.insert(keys::REFRESH_TIMESTAMP.to_string(), Value::Null);
        self.persist(entries).await;
    }

    pub(crate) async fn drive(&mut self) {
        let end = self.run_loop().await;
        self.finish(end).await;
    }

    pub(crate) async fn run_loop(&mut self) -> RunEnd {
        loop {
            if let Some(end) = self.boundary().await {
                return end;
            }
            match self.step().await {
                Ok(Step::Continue) => {}
                Ok(Step::Item(outcome)) => self.finalize_item(outcome).await,
                Ok(Step::Done(message)) => return RunEnd::Completed(message),
                Err(e) => self.recover_from_error(e).await,
            }
        }
    }

    /// Apply queued commands and the run flags. Blocks while paused.
    async fn boundary(&mut self) -> Option<RunEnd> {
        loop {
            while let Ok(command) = self.commands.try_recv() {
                if let ControlCommand::Start(settings) = command {
                    self.restart(settings).await;
                }
            }
            if !self.flags.is_running() {
                return Some(RunEnd::Stopped);
            }
            if !self.flags.is_paused() {
                return None;
            }

            info!("Run paused");
            self.telemetry.update_status("Paused");
            match self.commands.recv().await {
                Some(ControlCommand::Resume) => {
                    info!("Run resumed");
                    self.telemetry.update_status("Resuming...");
                    sleep(RESUME_SETTLE).await;
                }
                Some(ControlCommand::Start(settings)) => self.restart(settings).await,
                Some(ControlCommand::Stop) => {}
                None => self.flags.set_running(false),
            }
        }
    }

    async fn restart(&mut self, settings: CleanerSettings) {
        info!("Start received while a run was ending, restarting");
        self.telemetry.stopped();
        self.begin(settings).await;
    }

    /// One discovery step: find the next eligible item and process it, or
    /// decide how to look for more.
    pub(crate) async fn step(&mut self) -> Result<Step, PageError> {
        let triggers = self.query.triggers().await?;
        if !triggers.is_empty() {
            self.state.consecutive_failures = 0;
            let Some(trigger) = self.first_visible(&triggers).await? else {
                debug!(count = triggers.len(), "No trigger fully visible, scrolling");
                self.scroll_for_more().await?;
                return Ok(Step::Continue);
            };
            let outcome = self
                .processor
                .process(&trigger, &self.state.settings, &mut self.state.last_deleted)
                .await?;
            return Ok(Step::Item(outcome));
        }

        let permanent = self.query.permanent_triggers().await?;
        if !permanent.is_empty() {
            return self.only_permanent_remain(permanent.len()).await;
        }
        self.nothing_found().await
    }

    async fn first_visible(
        &self,
        triggers: &[ElementHandle],
    ) -> Result<Option<ElementHandle>, PageError> {
        let viewport = self.page.viewport().await?;
        for trigger in triggers {
            if let Some(rect) = self.page.bounding_rect(trigger).await? {
                if is_visible(&rect, &viewport) {
                    return Ok(Some(trigger.clone()));
                }
            }
        }
        Ok(None)
    }

    async fn only_permanent_remain(&mut self, count: usize) -> Result<Step, PageError> {
        info!(count, "Only permanent items visible");
        self.telemetry
            .update_status("Only permanent items visible, scrolling for more...");
        if self.scroll_for_more().await? {
            return Ok(Step::Continue);
        }
        if !self.state.permanent_refresh_used
            && self.state.page_refreshes < self.state.settings.max_page_refreshes
        {
            self.state.permanent_refresh_used = true;
            self.refresh_page().await?;
            return Ok(Step::Continue);
        }
        Ok(Step::Done(PERMANENT_ONLY.to_string()))
    }

    async fn nothing_found(&mut self) -> Result<Step, PageError> {
        self.state.consecutive_failures += 1;
        let max_failures = self.state.settings.max_consecutive_failures;
        let page_load = self.state.settings.timing.page_load();
        debug!(
            consecutive = self.state.consecutive_failures,
            max = max_failures,
            "No items found"
        );
        if self.state.consecutive_failures >= max_failures {
            if self.state.page_refreshes < self.state.settings.max_page_refreshes {
                self.refresh_page().await?;
                return Ok(Step::Continue);
            }
            return Ok(Step::Done(NOTHING_LEFT.to_string()));
        }

        self.telemetry
            .update_status("No items found, scrolling to load more...");
        self.scroll_for_more().await?;
        sleep(page_load).await;
        Ok(Step::Continue)
    }

    /// Count the item exactly once and pace the next one.
    pub(crate) async fn finalize_item(&mut self, outcome: Outcome) {
        self.state.stats.record(outcome);
        debug!(?outcome, total = self.state.stats.total, "Item finalized");
        self.telemetry.update_stats(&self.state.stats);
        self.telemetry.update_status(format!(
            "Processed {} items ({} deleted)",
            self.state.stats.total, self.state.stats.deleted
        ));
        self.writer.write(self.progress_entries()).await;

        let settings = &self.state.settings;
        let next_item = settings.timing.next_item();
        let batch_size = u64::from(settings.batch_size);
        if batch_size > 0 && self.state.stats.total % batch_size == 0 {
            info!(
                total = self.state.stats.total,
                pause_ms = settings.pause_interval,
                "Batch complete, pausing"
            );
            sleep(settings.pause_interval()).await;
        }
        sleep(next_item).await;
    }

    /// Tally a caught error as one failed item and return the page to a
    /// neutral state.
    pub(crate) async fn recover_from_error(&mut self, e: PageError) {
        error!("Error processing item: {}", e);
        self.state.record_error(e.kind());
        self.telemetry
            .log_activity(LogLevel::Error, format!("Error: {e}"));
        let timing = self.state.settings.timing.clone();

        if let Err(e) = self.page.press_escape().await {
            warn!("Escape failed during recovery: {}", e);
        }
        sleep(timing.close_wait()).await;
        if let Err(e) = self.page.press_escape().await {
            warn!("Escape failed during recovery: {}", e);
        }
        self.query.invalidate();

        self.state.stats.record(Outcome::Failed);
        self.telemetry.update_stats(&self.state.stats);
        self.writer.write(self.progress_entries()).await;
        sleep(timing.next_item()).await;
    }

    pub(crate) async fn finish(&mut self, end: RunEnd) {
        self.flags.set_running(false);
        let stats = self.state.stats.clone();
        match &end {
            RunEnd::Completed(message) => {
                info!(
                    deleted = stats.deleted,
                    failed = stats.failed,
                    skipped = stats.skipped,
                    zombies = stats.zombies,
                    total = stats.total,
                    success_rate = stats.success_rate(),
                    page_refreshes = self.state.page_refreshes,
                    "{}",
                    message
                );
                for (kind, count) in &self.state.error_types {
                    info!(kind = %kind, count, "Error breakdown");
                }
                self.telemetry.update_status(message.clone());
                self.telemetry.log_activity(
                    LogLevel::Success,
                    format!(
                        "Cleaning completed: {} deleted, {} failed, {} skipped",
                        stats.deleted, stats.failed, stats.skipped
                    ),
                );
                self.telemetry.completed(&stats, &self.state.error_types);
            }
            RunEnd::Stopped => {
                info!(total = stats.total, "Cleaning stopped");
                self.telemetry.update_status("Cleaning stopped");
                self.telemetry.stopped();
            }
        }

        let mut entries = idle_entries();
        entries.extend(self.progress_entries());
        self.persist(entries).await;
    }

    /// Stats and counters written after every item.
    fn progress_entries(&self) -> Entries {
        let mut entries = Entries::new();
        if let Ok(stats) = serde_json::to_value(&self.state.stats) {
            entries.insert(keys::STATS.to_string(), stats);
        }
        entries.insert(
            keys::PAGE_REFRESHES.to_string(),
            Value::from(self.state.page_refreshes),
        );
        entries.insert(
            keys::CONSECUTIVE_FAILURES.to_string(),
            Value::from(self.state.consecutive_failures),
        );
        if let Ok(records) = serde_json::to_value(self.state.last_deleted.to_records()) {
            entries.insert(keys::DELETED_ACTIVITIES.to_string(), records);
        }
        entries
    }

    /// Write and flush immediately.
    pub(crate) async fn persist(&self, entries: Entries) {
        self.writer.write(entries).await;
        if let Err(e) = self.writer.flush().await {
            warn!("Failed to persist run state: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
