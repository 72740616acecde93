//! # Scrubber Core
//!
//! The activity-processing control loop of the scrubber and everything it
//! leans on.
//!
//! ## Architecture
//!
//! ```text
//!   ControlHandle ──commands──▶ Controller ──▶ ItemProcessor
//!        ▲                         │               │
//!        │                         │               ├── ElementQuery (TTL cache)
//!   TelemetryHub ◀──events─────────┤               ├── ConfirmationResolver
//!                                  │               └── ResurrectionTracker
//!                                  └── StateWriter ──▶ StateStore
//!
//!                 all page access goes through PageAdapter
//! ```
//!
//! The [`Controller`] owns the [`RunState`]. Commands reach it through a
//! channel and two shared flags ([`RunFlags`]); stop and pause are only
//! observed between items, so an item's menu → action → confirmation sequence
//! is never torn.
//!
//! ## Key Components
//!
//! - [`PageAdapter`]: every DOM read and input event the loop needs
//! - [`ElementQuery`]: memoized trigger/menu queries with manual invalidation
//! - [`ConfirmationResolver`]: explicit dialog vs. implicit DOM-delta confirmation
//! - [`ResurrectionTracker`]: the last two deletions, for zombie detection
//! - [`StateStore`] / [`StateWriter`]: the cross-reload persistence protocol
//! - [`ControlHandle`] / [`TelemetryHub`]: the command and telemetry gateway

pub mod controller;
mod controller_refresh;
pub mod debug;
pub mod error;
pub mod gateway;
pub mod modal;
pub mod page;
pub mod persistence;
pub mod processor;
pub mod query;
pub mod resurrection;
pub mod signature;
pub mod state;
pub mod store;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{Controller, ControllerParts};
pub use debug::{DebugConsole, DebugEntry, MAX_DEBUG_ENTRIES};
pub use error::{GatewayError, PageError, StoreError};
pub use gateway::{CommandResponse, ControlCommand, ControlHandle, PingResponse};
pub use modal::{
    ActionKind, Baseline, ConfirmationResolver, DialogResolver, MODAL_CONFIGS, ModalConfig,
    Resolution,
};
pub use page::{
    ContainerSnapshot, ElementHandle, ItemTag, PageAdapter, Rect, Viewport, is_activity_page,
    is_visible,
};
pub use persistence::{PersistedRun, RestoreDecision, decide_restore, keys};
pub use processor::{ItemProcessor, TARGET_ACTIONS};
pub use query::{CachedElementQuery, ElementQuery};
pub use resurrection::{DeletionRecord, MAX_TRACKED_DELETIONS, ResurrectionTracker, ZOMBIE_BADGE};
pub use signature::Signature;
pub use state::{Outcome, RunFlags, RunState, Stats};
pub use store::{FileStateStore, MemoryStateStore, StateStore, StateWriter, ThrottledStateWriter};
pub use telemetry::{LogLevel, TelemetryEvent, TelemetryHub};
