//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::{CleanerSettings, Config};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// First error as a `ConfigError`, if any.
    pub fn into_error(self) -> Option<ConfigError> {
        self.errors
            .into_iter()
            .next()
            .map(|e| ConfigError::InvalidValue {
                field: e.path,
                message: e.message,
            })
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_browser(config, &mut result);
        Self::validate_settings_into("cleaner", &config.cleaner, &mut result);
        Self::validate_throttle(config, &mut result);
        Self::validate_persistence(config, &mut result);

        Ok(result)
    }

    /// Validate settings received with a start command.
    pub fn validate_settings(settings: &CleanerSettings) -> ValidationResult {
        let mut result = ValidationResult::default();
        Self::validate_settings_into("settings", settings, &mut result);
        result
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }

        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        if config.browser.debug_port == 0 {
            result.add_error(ValidationError::new(
                "browser.debug_port",
                "Debug port cannot be 0",
            ));
        }

        if url::Url::parse(&config.browser.activity_log_url).is_err() {
            result.add_error(ValidationError::new(
                "browser.activity_log_url",
                format!("Invalid URL: {}", config.browser.activity_log_url),
            ));
        }

        if config.browser.headless {
            result.add_warning(ValidationWarning::new(
                "browser.headless",
                "Headless browsers usually have no logged-in session to clean",
            ));
        }
    }

    fn validate_settings_into(prefix: &str, settings: &CleanerSettings, result: &mut ValidationResult) {
        if settings.batch_size == 0 {
            result.add_error(ValidationError::new(
                format!("{prefix}.batch_size"),
                "batch_size must be greater than 0",
            ));
        }

        if settings.max_consecutive_failures == 0 {
            result.add_error(ValidationError::new(
                format!("{prefix}.max_consecutive_failures"),
                "max_consecutive_failures must be greater than 0",
            ));
        }

        if settings.max_page_refreshes > 50 {
            result.add_warning(ValidationWarning::new(
                format!("{prefix}.max_page_refreshes"),
                "max_page_refreshes is very high (>50), a stuck page will reload for a long time",
            ));
        }

        if settings.max_action_retries > 10 {
            result.add_warning(ValidationWarning::new(
                format!("{prefix}.max_action_retries"),
                "max_action_retries is very high (>10)",
            ));
        }

        let timing = &settings.timing;
        if timing.modal_timeout == 0 {
            result.add_error(ValidationError::new(
                format!("{prefix}.timing.modal_timeout"),
                "modal_timeout must be greater than 0",
            ));
        }

        if timing.next_item < 100 || timing.menu_wait < 100 {
            result.add_warning(ValidationWarning::new(
                format!("{prefix}.timing"),
                "Waits under 100ms often outrun the page and cause failed items",
            ));
        }
    }

    fn validate_throttle(config: &Config, result: &mut ValidationResult) {
        if config.throttle.storage_write == 0 {
            result.add_warning(ValidationWarning::new(
                "throttle.storage_write",
                "storage_write of 0 writes the state file on every change",
            ));
        }
    }

    fn validate_persistence(config: &Config, result: &mut ValidationResult) {
        if config.persistence.state_file.trim().is_empty() {
            result.add_error(ValidationError::new(
                "persistence.state_file",
                "state_file cannot be empty",
            ));
        }

        if config.persistence.resume_delay >= config.persistence.resume_window {
            result.add_warning(ValidationWarning::new(
                "persistence.resume_delay",
                "resume_delay is not shorter than resume_window",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
