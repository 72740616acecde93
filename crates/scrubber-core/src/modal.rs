//! Confirmation dialog handling.
//!
//! The host page is not uniform: some actions ask for confirmation, others
//! complete silently. A missing dialog is therefore inconclusive, and the
//! resolver falls back to comparing the page against a pre-action baseline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scrubber_config::TimingConfig;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::error::PageError;
use crate::page::PageAdapter;
use crate::query::ElementQuery;

/// Interval between dialog polls.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Action a confirmation dialog performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Delete,
    Remove,
    RemoveTags,
    MoveToTrash,
}

/// One recognized confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModalConfig {
    pub dialog_label: &'static str,
    pub confirm_label: &'static str,
    pub action: ActionKind,
}

/// Recognized dialogs, checked in order.
pub const MODAL_CONFIGS: [ModalConfig; 4] = [
    ModalConfig {
        dialog_label: "Delete?",
        confirm_label: "Delete",
        action: ActionKind::Delete,
    },
    ModalConfig {
        dialog_label: "Remove?",
        confirm_label: "Remove",
        action: ActionKind::Remove,
    },
    ModalConfig {
        dialog_label: "Remove tags?",
        confirm_label: "Remove",
        action: ActionKind::RemoveTags,
    },
    ModalConfig {
        dialog_label: "Move to Trash?",
        confirm_label: "Move to Trash",
        action: ActionKind::MoveToTrash,
    },
];

/// Page state captured before an action, for DOM-delta inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub trigger_count: usize,
    pub url: String,
}

/// How an action was (or was not) confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A dialog appeared and its confirm control was clicked.
    Dialog(ActionKind),
    /// No dialog, but the trigger count dropped or the URL changed.
    DomDelta,
    /// No confirmation signal of any kind.
    Unconfirmed,
}

impl Resolution {
    pub fn is_confirmed(&self) -> bool {
        !matches!(self, Self::Unconfirmed)
    }
}

/// Capability interface for confirming a clicked action.
#[async_trait]
pub trait ConfirmationResolver: Send + Sync {
    /// Poll for a dialog within `timing.modal_timeout`, then fall back to the
    /// baseline comparison.
    async fn resolve(
        &self,
        baseline: &Baseline,
        timing: &TimingConfig,
    ) -> Result<Resolution, PageError>;

    /// Single check for an open dialog, confirming it when found. Used on
    /// retries, where no baseline applies.
    async fn confirm_open_dialog(&self) -> Result<Option<ActionKind>, PageError>;
}

/// Resolver over the fixed [`MODAL_CONFIGS`] table.
pub struct DialogResolver {
    page: Arc<dyn PageAdapter>,
    query: Arc<dyn ElementQuery>,
}

enum DialogCheck {
    Confirmed(ActionKind),
    MissingButton(&'static str),
    Absent,
}

impl DialogResolver {
    pub fn new(page: Arc<dyn PageAdapter>, query: Arc<dyn ElementQuery>) -> Self {
        Self { page, query }
    }

    async fn check_dialogs(&self) -> Result<DialogCheck, PageError> {
        for config in &MODAL_CONFIGS {
            let Some(dialog) = self.page.find_dialog(config.dialog_label).await? else {
                continue;
            };
            let Some(button) = self
                .page
                .find_dialog_button(&dialog, config.confirm_label)
                .await?
            else {
                return Ok(DialogCheck::MissingButton(config.dialog_label));
            };
            self.page.click(&button).await?;
            self.query.invalidate();
            debug!(dialog = config.dialog_label, "confirmed dialog");
            return Ok(DialogCheck::Confirmed(config.action));
        }
        Ok(DialogCheck::Absent)
    }

    async fn dom_delta(&self, baseline: &Baseline) -> Result<bool, PageError> {
        self.query.invalidate();
        let count = self.query.triggers().await?.len();
        let url = self.page.current_url().await?;
        debug!(
            before = baseline.trigger_count,
            after = count,
            url_changed = url != baseline.url,
            "no dialog, comparing against baseline"
        );
        Ok(count < baseline.trigger_count || url != baseline.url)
    }
}

#[async_trait]
impl ConfirmationResolver for DialogResolver {
    async fn resolve(
        &self,
        baseline: &Baseline,
        timing: &TimingConfig,
    ) -> Result<Resolution, PageError> {
        let deadline = Instant::now() + timing.modal_timeout();
        loop {
            match self.check_dialogs().await? {
                DialogCheck::Confirmed(action) => return Ok(Resolution::Dialog(action)),
                DialogCheck::MissingButton(label) => {
                    debug!(dialog = label, "dialog has no confirm control");
                    return Ok(Resolution::Unconfirmed);
                }
                DialogCheck::Absent => {}
            }
            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        tokio::time::sleep(timing.no_modal_wait()).await;
        if self.dom_delta(baseline).await? {
            Ok(Resolution::DomDelta)
        } else {
            Ok(Resolution::Unconfirmed)
        }
    }

    async fn confirm_open_dialog(&self) -> Result<Option<ActionKind>, PageError> {
        match self.check_dialogs().await? {
            DialogCheck::Confirmed(action) => Ok(Some(action)),
            DialogCheck::MissingButton(_) | DialogCheck::Absent => Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "modal_tests.rs"]
mod tests;
