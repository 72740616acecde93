//! Scrolling, forced reloads and the resume half of the persistence protocol.

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::controller::Controller;
use crate::error::PageError;
use crate::persistence::{PersistedRun, RestoreDecision, decide_restore, idle_entries};
use crate::state::now_ms;

const SCROLL_STEP: f64 = 500.0;
const SCROLL_ATTEMPTS: u32 = 2;

impl Controller {
    /// Scroll down to trigger lazy loading. True when the document grew.
    pub(crate) async fn scroll_for_more(&self) -> Result<bool, PageError> {
        let before = self.page.document_height().await?;
        let wait = self.state.settings.timing.scroll_wait();
        for attempt in 1..=SCROLL_ATTEMPTS {
            self.page.scroll_by(SCROLL_STEP).await?;
            sleep(wait).await;
            self.query.invalidate();
            let height = self.page.document_height().await?;
            if height > before {
                debug!(attempt, before, height, "New content loaded");
                return Ok(true);
            }
        }
        debug!("Scrolling loaded nothing new");
        Ok(false)
    }

    /// Snapshot the run, reload the page and pick the run back up.
    pub(crate) async fn refresh_page(&mut self) -> Result<(), PageError> {
        let attempt = self.state.page_refreshes + 1;
        let max = self.state.settings.max_page_refreshes;
        self.state.set_page_refreshes(attempt);
        self.state.consecutive_failures = 0;
        info!(attempt, max, "Refreshing page");
        self.telemetry.update_status(format!(
            "Refreshing page to find more items. Refresh attempt {attempt}/{max}"
        ));
        self.telemetry.update_stats(&self.state.stats);

        let snapshot = PersistedRun::snapshot(&self.state, now_ms());
        self.persist(snapshot.run_entries()).await;

        self.page.reload().await?;
        self.query.invalidate();
        sleep(self.state.settings.timing.page_load()).await;
        self.resume_after_reload().await;
        Ok(())
    }

    async fn resume_after_reload(&mut self) {
        match self.store.get_all().await {
            Ok(entries) => {
                let persisted = PersistedRun::from_entries(&entries);
                match decide_restore(&persisted, now_ms(), self.persistence.resume_window()) {
                    RestoreDecision::Resume(run) => {
                        let error_types = std::mem::take(&mut self.state.error_types);
                        run.apply_to(&mut self.state);
                        self.state.error_types = error_types;
                        debug!(refreshes = self.state.page_refreshes, "Run state restored after reload");
                    }
                    other => warn!(?other, "Snapshot unusable after reload, continuing from memory"),
                }
            }
            Err(e) => warn!("Failed to read state after reload: {}", e),
        }
        self.telemetry.update_status("Resuming after page refresh...");
        sleep(self.persistence.resume_delay()).await;
    }

    /// Inspect persisted state at startup. Returns true when an interrupted
    /// run was restored and should continue.
    pub(crate) async fn restore_on_load(&mut self, now: i64) -> bool {
        let entries = match self.store.get_all().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read persisted state: {}", e);
                return false;
            }
        };
        let persisted = PersistedRun::from_entries(&entries);
        self.telemetry.debug().set_enabled(persisted.debug_enabled);

        match decide_restore(&persisted, now, self.persistence.resume_window()) {
            RestoreDecision::Resume(run) => {
                run.apply_to(&mut self.state);
                self.flags.set_running(true);
                info!(
                    refreshes = self.state.page_refreshes,
                    total = self.state.stats.total,
                    "Resuming interrupted run"
                );
                self.telemetry.started();
                self.telemetry.update_status("Resuming after page refresh...");
                self.telemetry.update_stats(&self.state.stats);
                true
            }
            RestoreDecision::Expired => {
                info!("Interrupted run is outside the resume window, clearing");
                self.persist(idle_entries()).await;
                false
            }
            RestoreDecision::Idle => false,
        }
    }
}
