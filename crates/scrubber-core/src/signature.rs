//! Semantic identity of an activity item.
//!
//! A signature is rebuilt from a [`ContainerSnapshot`] on every use and only
//! outlives that use inside the resurrection tracker.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::page::ContainerSnapshot;

static TIME_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i):|ago|AM|PM|\d+\s*(hour|minute|second|day|week|month|year)").ok()
});

/// Fallback description length when no description span exists.
const FALLBACK_TEXT_CHARS: usize = 200;

/// Marker that identifies profile links.
const PROFILE_LINK_MARKER: &str = "facebook.com/";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Signature {
    pub text_content: String,
    pub timestamp: String,
    pub profile_href: String,
}

impl Signature {
    pub fn new(
        text_content: impl Into<String>,
        timestamp: impl Into<String>,
        profile_href: impl Into<String>,
    ) -> Self {
        Self {
            text_content: text_content.into(),
            timestamp: timestamp.into(),
            profile_href: profile_href.into(),
        }
    }

    /// Derive a signature from raw container text. Missing pieces become
    /// empty strings.
    pub fn from_snapshot(snapshot: &ContainerSnapshot) -> Self {
        let text_content = match snapshot.description.as_deref() {
            Some(desc) if !desc.trim().is_empty() => normalize_text(desc),
            _ => snapshot
                .button_text
                .as_deref()
                .map(|text| {
                    normalize_text(text)
                        .chars()
                        .take(FALLBACK_TEXT_CHARS)
                        .collect::<String>()
                })
                .unwrap_or_default(),
        };

        Self {
            text_content,
            timestamp: extract_timestamp(&snapshot.time_candidates),
            profile_href: extract_profile_href(&snapshot.links),
        }
    }

    /// Lenient equality: text must match exactly; timestamp and profile link
    /// must match unless either side is empty.
    ///
    /// Blank timestamps make unrelated items with identical text collide.
    /// Accepted: a missed zombie costs more than a skipped item.
    pub fn matches(&self, other: &Signature) -> bool {
        self.text_content == other.text_content
            && lenient_eq(&self.timestamp, &other.timestamp)
            && lenient_eq(&self.profile_href, &other.profile_href)
    }

    pub fn is_empty(&self) -> bool {
        self.text_content.is_empty()
    }
}

fn lenient_eq(a: &str, b: &str) -> bool {
    a.is_empty() || b.is_empty() || a == b
}

/// Trim and collapse internal whitespace runs to single spaces.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Last candidate that looks like a time, scanning backward.
pub fn extract_timestamp(candidates: &[String]) -> String {
    let Some(pattern) = TIME_PATTERN.as_ref() else {
        return String::new();
    };
    candidates
        .iter()
        .rev()
        .map(|c| c.trim())
        .find(|c| pattern.is_match(c))
        .map(str::to_string)
        .unwrap_or_default()
}

/// First link that points at a profile.
pub fn extract_profile_href(links: &[String]) -> String {
    links
        .iter()
        .find(|href| href.contains(PROFILE_LINK_MARKER))
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
