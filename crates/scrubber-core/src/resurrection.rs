//! Resurrection ("zombie") detection.
//!
//! The host page sometimes restores an item right after reporting it deleted.
//! The tracker remembers the last two deletions; an item matching one of them
//! is hidden locally instead of being deleted again.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PageError;
use crate::page::{ElementHandle, PageAdapter};
use crate::signature::Signature;

/// Deletions remembered for zombie detection.
pub const MAX_TRACKED_DELETIONS: usize = 2;

/// Badge text inserted before a hidden zombie.
pub const ZOMBIE_BADGE: &str = "Activity cannot be removed - Hiding instead";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionRecord {
    #[serde(flatten)]
    pub signature: Signature,
    /// Epoch milliseconds.
    pub deleted_at: i64,
}

/// Most-recent-first list of at most [`MAX_TRACKED_DELETIONS`] deletions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResurrectionTracker {
    records: VecDeque<DeletionRecord>,
}

impl ResurrectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted records, keeping the bound.
    pub fn from_records(records: Vec<DeletionRecord>) -> Self {
        let mut records: VecDeque<_> = records.into();
        records.truncate(MAX_TRACKED_DELETIONS);
        Self { records }
    }

    pub fn record_deletion(&mut self, signature: Signature, deleted_at: i64) {
        self.records.push_front(DeletionRecord {
            signature,
            deleted_at,
        });
        self.records.truncate(MAX_TRACKED_DELETIONS);
    }

    pub fn was_recently_deleted(&self, signature: &Signature) -> bool {
        self.records
            .iter()
            .any(|record| record.signature.matches(signature))
    }

    pub fn records(&self) -> impl Iterator<Item = &DeletionRecord> {
        self.records.iter()
    }

    pub fn to_records(&self) -> Vec<DeletionRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Hide a zombie's container and annotate it for the user.
pub async fn hide_and_badge(
    page: &dyn PageAdapter,
    trigger: &ElementHandle,
    signature: &Signature,
) -> Result<(), PageError> {
    page.hide_and_badge(trigger, ZOMBIE_BADGE).await?;
    info!(text = %signature.text_content, "resurrected item hidden");
    Ok(())
}
