//! # Scrubber Config
//!
//! Configuration management for the activity scrubber: the TOML file layout,
//! the run settings sent with a start command, and validation.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
