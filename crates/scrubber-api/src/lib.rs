//! # Scrubber API
//!
//! HTTP and WebSocket front end for a [`scrubber_core::ControlHandle`].
//!
//! ```text
//! GET  /ping    liveness
//! GET  /stats   latest stats, status line and run flags
//! POST /start   start a run; optional JSON body of setting overrides
//! POST /stop    stop after the current item
//! POST /pause   pause after the current item
//! POST /resume  resume a paused run
//! POST /debug   {"enabled": bool}
//! GET  /debug   recent debug entries, oldest first
//! DELETE /debug clear the debug entries
//! GET  /ws      telemetry event stream
//! ```

mod error;
mod routes;
mod server;
mod websocket;

pub use error::ApiError;
pub use routes::{DebugRequest, StatsResponse, create_router};
pub use server::ApiServer;
