//! Memoized structural queries over the page.
//!
//! Repeated trigger lookups are cheap to cache for about a second; the loop
//! invalidates after every click, key press, scroll, tag and reload. A stale
//! read costs at most one extra discovery cycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use scrubber_config::CacheConfig;
use tokio::time::Instant;
use tracing::trace;

use crate::error::PageError;
use crate::page::{ElementHandle, PageAdapter};

/// Capability interface for the queries the loop repeats.
#[async_trait]
pub trait ElementQuery: Send + Sync {
    /// Eligible triggers.
    async fn triggers(&self) -> Result<Vec<ElementHandle>, PageError>;

    /// Triggers tagged permanent.
    async fn permanent_triggers(&self) -> Result<Vec<ElementHandle>, PageError>;

    /// Entries of the open context menu.
    async fn menu_items(&self) -> Result<Vec<ElementHandle>, PageError>;

    /// Drop every cached result.
    fn invalidate(&self);

    /// Drop cached menu entries only.
    fn invalidate_menu(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum QueryKind {
    Triggers,
    PermanentTriggers,
    MenuItems,
}

struct CacheEntry {
    value: Vec<ElementHandle>,
    stored_at: Instant,
}

/// TTL cache in front of a [`PageAdapter`].
pub struct CachedElementQuery {
    page: Arc<dyn PageAdapter>,
    config: CacheConfig,
    entries: Mutex<HashMap<QueryKind, CacheEntry>>,
}

impl CachedElementQuery {
    pub fn new(page: Arc<dyn PageAdapter>, config: CacheConfig) -> Self {
        Self {
            page,
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn ttl(&self, kind: QueryKind) -> Duration {
        match kind {
            QueryKind::MenuItems => self.config.menu_ttl(),
            _ => self.config.ttl(),
        }
    }

    fn cached(&self, kind: QueryKind) -> Option<Vec<ElementHandle>> {
        if !self.config.enabled {
            return None;
        }
        let entries = self.entries.lock();
        let entry = entries.get(&kind)?;
        if entry.stored_at.elapsed() < self.ttl(kind) {
            trace!(?kind, "query cache hit");
            Some(entry.value.clone())
        } else {
            None
        }
    }

    fn store(&self, kind: QueryKind, value: &[ElementHandle]) {
        if !self.config.enabled {
            return;
        }
        self.entries.lock().insert(
            kind,
            CacheEntry {
                value: value.to_vec(),
                stored_at: Instant::now(),
            },
        );
    }

    async fn query(&self, kind: QueryKind) -> Result<Vec<ElementHandle>, PageError> {
        if let Some(hit) = self.cached(kind) {
            return Ok(hit);
        }
        let value = match kind {
            QueryKind::Triggers => self.page.find_triggers().await?,
            QueryKind::PermanentTriggers => self.page.find_permanent_triggers().await?,
            QueryKind::MenuItems => self.page.menu_items().await?,
        };
        self.store(kind, &value);
        Ok(value)
    }
}

#[async_trait]
impl ElementQuery for CachedElementQuery {
    async fn triggers(&self) -> Result<Vec<ElementHandle>, PageError> {
        self.query(QueryKind::Triggers).await
    }

    async fn permanent_triggers(&self) -> Result<Vec<ElementHandle>, PageError> {
        self.query(QueryKind::PermanentTriggers).await
    }

    async fn menu_items(&self) -> Result<Vec<ElementHandle>, PageError> {
        self.query(QueryKind::MenuItems).await
    }

    fn invalidate(&self) {
        self.entries.lock().clear();
    }

    fn invalidate_menu(&self) {
        self.entries.lock().remove(&QueryKind::MenuItems);
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
