//! The page abstraction the control loop drives.
//!
//! Everything the loop knows about the activity log arrives through
//! [`PageAdapter`]. The browser-backed implementation lives in
//! `scrubber-cdp`; tests use a scripted in-memory page.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PageError;

/// Opaque reference to a live page element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounding rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Inner size of the browser window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Classification marker stored on a trigger element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemTag {
    Normal,
    /// "was untagged in" entries: structurally undeletable.
    PermanentTag,
    /// Profile-change entries: only "Add to profile" / "Hide from profile".
    PermanentProfileChange,
}

impl ItemTag {
    /// CSS class carried by tagged triggers; `None` for untagged ones.
    pub fn class_name(&self) -> Option<&'static str> {
        match self {
            Self::Normal => None,
            Self::PermanentTag => Some("fas-permanent-tag"),
            Self::PermanentProfileChange => Some("fas-permanent-profile-change"),
        }
    }

    pub fn is_permanent(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// Raw text read from an activity item's container.
///
/// The adapter only collects strings; normalization and pattern matching
/// happen in [`crate::signature`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerSnapshot {
    /// Text of the `span[dir="auto"]` inside the container's role=button element.
    pub description: Option<String>,
    /// Full text of the role=button element.
    pub button_text: Option<String>,
    /// Small text spans that may hold a timestamp, in document order.
    pub time_candidates: Vec<String>,
    /// `href` of every link in the container, in document order.
    pub links: Vec<String>,
    /// Date heading of the day group the item sits in.
    pub date: Option<String>,
    /// Activity type line, e.g. "You reacted to a post".
    pub activity_type: Option<String>,
    /// Activity content line.
    pub content: Option<String>,
    /// Target of the item's "View" link.
    pub view_link: Option<String>,
}

impl ContainerSnapshot {
    /// One-line description for activity logs.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(date) = self.date.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("[{date}]"));
        }
        if let Some(kind) = self.activity_type.as_deref().filter(|s| !s.is_empty()) {
            parts.push(kind.to_string());
        }
        if let Some(content) = self.content.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("\"{}\"", truncate(content, 80)));
        }
        if parts.is_empty() {
            "activity item".to_string()
        } else {
            parts.join(" ")
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

/// Capability interface over the live activity-log page.
#[async_trait]
pub trait PageAdapter: Send + Sync {
    /// Eligible "more options" triggers, in document order. Excludes tagged
    /// triggers and triggers inside containers hidden as zombies.
    async fn find_triggers(&self) -> Result<Vec<ElementHandle>, PageError>;

    /// Triggers already tagged permanent.
    async fn find_permanent_triggers(&self) -> Result<Vec<ElementHandle>, PageError>;

    /// Entries of the currently open context menu.
    async fn menu_items(&self) -> Result<Vec<ElementHandle>, PageError>;

    /// Trimmed text content of an element.
    async fn read_text(&self, element: &ElementHandle) -> Result<String, PageError>;

    /// Bounding rectangle, or `None` when the element left the document.
    async fn bounding_rect(&self, element: &ElementHandle) -> Result<Option<Rect>, PageError>;

    async fn viewport(&self) -> Result<Viewport, PageError>;

    async fn current_url(&self) -> Result<String, PageError>;

    async fn document_height(&self) -> Result<f64, PageError>;

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), PageError>;

    async fn scroll_by(&self, delta_y: f64) -> Result<(), PageError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), PageError>;

    /// Dispatch an Escape key press, closing any open menu or dialog.
    async fn press_escape(&self) -> Result<(), PageError>;

    /// Whether a bold name near the trigger is followed by " was untagged in ".
    async fn has_untagged_marker(&self, trigger: &ElementHandle) -> Result<bool, PageError>;

    /// Tag a trigger permanent, optionally with an explanatory note.
    async fn tag_trigger(
        &self,
        trigger: &ElementHandle,
        tag: ItemTag,
        note: Option<&str>,
    ) -> Result<(), PageError>;

    /// Read the raw text of the trigger's activity container.
    async fn read_container(&self, trigger: &ElementHandle) -> Result<ContainerSnapshot, PageError>;

    /// Open dialog whose accessible label is `label`.
    async fn find_dialog(&self, label: &str) -> Result<Option<ElementHandle>, PageError>;

    /// Button labelled `label` inside `dialog`.
    async fn find_dialog_button(
        &self,
        dialog: &ElementHandle,
        label: &str,
    ) -> Result<Option<ElementHandle>, PageError>;

    /// Hide the trigger's container and insert `message` as a badge before it.
    async fn hide_and_badge(&self, trigger: &ElementHandle, message: &str) -> Result<(), PageError>;

    /// Reload the page and wait for it to load.
    async fn reload(&self) -> Result<(), PageError>;
}

/// Strict visibility: positive size and fully inside the viewport.
pub fn is_visible(rect: &Rect, viewport: &Viewport) -> bool {
    rect.width > 0.0
        && rect.height > 0.0
        && rect.x >= 0.0
        && rect.y >= 0.0
        && rect.right() <= viewport.width
        && rect.bottom() <= viewport.height
}

/// Whether a URL points at an activity log.
pub fn is_activity_page(url: &str) -> bool {
    const PATTERNS: [&str; 4] = ["/me/allactivity", "/allactivity", "allactivity", "activity_log"];
    PATTERNS.iter().any(|p| url.contains(p))
}

#[cfg(test)]
#[path = "page_tests.rs"]
mod tests;
