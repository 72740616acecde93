//! Per-item processing: menu → action → confirmation, with bounded retries.
//!
//! The processor only classifies; the controller counts each item exactly
//! once from the returned [`Outcome`].

use std::sync::Arc;

use scrubber_config::{CleanerSettings, TimingConfig};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::PageError;
use crate::modal::{Baseline, ConfirmationResolver};
use crate::page::{ContainerSnapshot, ElementHandle, ItemTag, PageAdapter};
use crate::query::ElementQuery;
use crate::resurrection::{ResurrectionTracker, hide_and_badge};
use crate::signature::Signature;
use crate::state::{Outcome, now_ms};
use crate::telemetry::{LogLevel, TelemetryHub};

/// Menu entries that remove or neutralize an activity, matched by substring.
pub const TARGET_ACTIONS: [&str; 5] = [
    "Remove Tag",
    "Unlike",
    "Delete",
    "Move to trash",
    "Remove Reaction",
];

const ADD_TO_PROFILE: &str = "Add to profile";
const HIDE_FROM_PROFILE: &str = "Hide from profile";

/// Polls while waiting for a hidden item's menu to close.
const HIDE_CHECK_ITERATIONS: u32 = 10;

const HIDDEN_NOTE: &str = "Hidden from profile (cannot be deleted)";

type MenuEntry = (ElementHandle, String);

pub struct ItemProcessor {
    page: Arc<dyn PageAdapter>,
    query: Arc<dyn ElementQuery>,
    resolver: Arc<dyn ConfirmationResolver>,
    telemetry: Arc<TelemetryHub>,
}

impl ItemProcessor {
    pub fn new(
        page: Arc<dyn PageAdapter>,
        query: Arc<dyn ElementQuery>,
        resolver: Arc<dyn ConfirmationResolver>,
        telemetry: Arc<TelemetryHub>,
    ) -> Self {
        Self {
            page,
            query,
            resolver,
            telemetry,
        }
    }

    /// Remove or neutralize the activity behind `trigger`.
    pub async fn process(
        &self,
        trigger: &ElementHandle,
        settings: &CleanerSettings,
        tracker: &mut ResurrectionTracker,
    ) -> Result<Outcome, PageError> {
        let timing = &settings.timing;

        let snapshot = match self.page.read_container(trigger).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("Could not read activity container: {}", e);
                ContainerSnapshot::default()
            }
        };
        let signature = Signature::from_snapshot(&snapshot);
        self.telemetry
            .log_activity(LogLevel::Info, format!("Processing {}", snapshot.summary()));
        if let Some(link) = snapshot.view_link.as_deref() {
            debug!(link, "activity link");
        }

        if !signature.is_empty() && tracker.was_recently_deleted(&signature) {
            warn!(text = %signature.text_content, "item reappeared after deletion");
            hide_and_badge(self.page.as_ref(), trigger, &signature).await?;
            self.query.invalidate();
            self.telemetry.log_activity(
                LogLevel::Warning,
                "Activity cannot be removed - hiding instead",
            );
            return Ok(Outcome::Zombie);
        }

        let baseline = Baseline {
            trigger_count: self.query.triggers().await?.len(),
            url: self.page.current_url().await?,
        };

        self.page.scroll_into_view(trigger).await?;
        self.query.invalidate();
        sleep(timing.element_scroll()).await;
        self.open_menu(trigger, timing).await?;

        let untagged = match self.page.has_untagged_marker(trigger).await {
            Ok(untagged) => untagged,
            Err(e) => {
                debug!("Untagged check failed, treating as tagged: {}", e);
                false
            }
        };
        if untagged {
            info!("Untagged post, marking permanent");
            self.close_menu(timing).await?;
            self.tag(trigger, ItemTag::PermanentTag, None).await?;
            self.telemetry
                .log_activity(LogLevel::Info, "Skipped untagged post (cannot be removed)");
            return Ok(Outcome::Skipped);
        }

        let entries = self.read_menu().await?;
        if entries.is_empty() {
            warn!("No menu items found, closing menu");
            self.close_menu(timing).await?;
            return Ok(Outcome::Failed);
        }
        debug!(entries = ?entries.iter().map(|(_, t)| t).collect::<Vec<_>>(), "menu opened");

        if let [(entry, text)] = entries.as_slice() {
            if text.contains(ADD_TO_PROFILE) {
                info!("Profile change entry, marking permanent");
                self.close_menu(timing).await?;
                self.tag(trigger, ItemTag::PermanentProfileChange, None)
                    .await?;
                self.telemetry
                    .log_activity(LogLevel::Info, "Skipped profile change (cannot be removed)");
                return Ok(Outcome::Skipped);
            }
            if text.contains(HIDE_FROM_PROFILE) {
                return self.hide_from_profile(trigger, entry, timing).await;
            }
        }

        let Some((entry, action)) = find_target_action(&entries) else {
            info!("No removal action in menu, skipping");
            self.close_menu(timing).await?;
            return Ok(Outcome::Skipped);
        };

        sleep(timing.modal_wait()).await;
        info!(%action, "Clicking action");
        self.page.click(&entry).await?;
        self.query.invalidate();

        let resolution = self.resolver.resolve(&baseline, timing).await?;
        debug!(?resolution, "action resolved");
        if resolution.is_confirmed() {
            return Ok(self.deleted(signature, tracker, timing, &action).await);
        }

        for attempt in 1..=settings.max_action_retries {
            info!(attempt, max = settings.max_action_retries, %action, "Retrying action");
            if self.retry_action(trigger, &action, timing).await? {
                return Ok(self.deleted(signature, tracker, timing, &action).await);
            }
        }

        warn!(%action, "Action not confirmed after retries");
        self.telemetry.log_activity(
            LogLevel::Error,
            format!(
                "Failed to {} after {} retries",
                action.to_lowercase(),
                settings.max_action_retries
            ),
        );
        Ok(Outcome::Failed)
    }

    async fn open_menu(&self, trigger: &ElementHandle, timing: &TimingConfig) -> Result<(), PageError> {
        self.page.click(trigger).await?;
        self.query.invalidate();
        sleep(timing.menu_wait()).await;
        Ok(())
    }

    async fn close_menu(&self, timing: &TimingConfig) -> Result<(), PageError> {
        self.page.press_escape().await?;
        self.query.invalidate();
        sleep(timing.close_wait()).await;
        Ok(())
    }

    async fn tag(
        &self,
        trigger: &ElementHandle,
        tag: ItemTag,
        note: Option<&str>,
    ) -> Result<(), PageError> {
        self.page.tag_trigger(trigger, tag, note).await?;
        self.query.invalidate();
        Ok(())
    }

    async fn read_menu(&self) -> Result<Vec<MenuEntry>, PageError> {
        let handles = self.query.menu_items().await?;
        let mut entries = Vec::with_capacity(handles.len());
        for handle in handles {
            let text = match self.page.read_text(&handle).await {
                Ok(text) => text,
                Err(e) => {
                    debug!(entry = %handle, "Menu entry text unreadable: {}", e);
                    String::new()
                }
            };
            entries.push((handle, text));
        }
        Ok(entries)
    }

    /// Click "Hide from profile" and wait for the menu to close.
    async fn hide_from_profile(
        &self,
        trigger: &ElementHandle,
        entry: &ElementHandle,
        timing: &TimingConfig,
    ) -> Result<Outcome, PageError> {
        info!("Hide-only entry, hiding from profile");
        self.page.click(entry).await?;
        for _ in 0..HIDE_CHECK_ITERATIONS {
            sleep(timing.hide_from_profile_check()).await;
            self.query.invalidate_menu();
            if self.query.menu_items().await?.is_empty() {
                self.tag(trigger, ItemTag::PermanentProfileChange, Some(HIDDEN_NOTE))
                    .await?;
                self.telemetry
                    .log_activity(LogLevel::Success, "Hidden from profile (cannot be deleted)");
                return Ok(Outcome::Deleted);
            }
        }
        warn!("Menu stayed open after hiding");
        self.close_menu(timing).await?;
        Ok(Outcome::Skipped)
    }

    /// Re-open the menu, re-click the same action and check once for a dialog.
    async fn retry_action(
        &self,
        trigger: &ElementHandle,
        action: &str,
        timing: &TimingConfig,
    ) -> Result<bool, PageError> {
        self.page.press_escape().await?;
        self.query.invalidate();
        sleep(timing.retry_wait()).await;

        self.open_menu(trigger, timing).await?;
        let entries = self.read_menu().await?;
        let Some((entry, _)) = entries.iter().find(|(_, text)| text == action) else {
            debug!(action, "action missing on retry");
            self.close_menu(timing).await?;
            return Ok(false);
        };
        self.page.click(entry).await?;
        self.query.invalidate();
        sleep(timing.modal_wait()).await;

        if let Some(kind) = self.resolver.confirm_open_dialog().await? {
            debug!(?kind, "confirmed on retry");
            return Ok(true);
        }
        self.page.press_escape().await?;
        self.query.invalidate();
        Ok(false)
    }

    async fn deleted(
        &self,
        signature: Signature,
        tracker: &mut ResurrectionTracker,
        timing: &TimingConfig,
        action: &str,
    ) -> Outcome {
        if !signature.is_empty() {
            tracker.record_deletion(signature, now_ms());
        }
        self.telemetry
            .log_activity(LogLevel::Success, format!("Successfully completed: {action}"));
        sleep(timing.action_complete()).await;
        Outcome::Deleted
    }
}

/// First entry, in menu order, containing any target action.
fn find_target_action(entries: &[MenuEntry]) -> Option<MenuEntry> {
    entries
        .iter()
        .find(|(_, text)| TARGET_ACTIONS.iter().any(|action| text.contains(action)))
        .cloned()
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
