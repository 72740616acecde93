//! Error types for the core crate.

use thiserror::Error;

/// Failure of a page interaction.
///
/// Per-item errors never leave the control loop; [`PageError::kind`] is the
/// label tallied into the run's error breakdown.
#[derive(Debug, Error, Clone)]
pub enum PageError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Page disconnected: {0}")]
    Disconnected(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("{0}")]
    Other(String),
}

impl PageError {
    /// Error-kind label used in the `error_types` tally.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ElementNotFound(_) => "ElementNotFound",
            Self::Script(_) => "ScriptError",
            Self::Timeout(_) => "Timeout",
            Self::Disconnected(_) => "Disconnected",
            Self::Navigation(_) => "Navigation",
            Self::Other(_) => "Unknown",
        }
    }
}

/// Persistence failures. Logged, never fatal to a run.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid state data: {0}")]
    InvalidData(String),
}

/// Failures of the command gateway itself, as opposed to rejected commands.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Controller is not running")]
    ControllerGone,
}
