//! Configuration loader.

use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::schema::{CleanerSettings, Config};

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a file, falling back to defaults when it is missing.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Parse run settings sent with a start command.
    ///
    /// Missing fields fall back to `base`, so a partial payload such as
    /// `{"max_page_refreshes": 2}` only overrides what it names.
    pub fn merge_settings(
        base: &CleanerSettings,
        overrides: &serde_json::Value,
    ) -> Result<CleanerSettings, ConfigError> {
        if overrides.is_null() {
            return Ok(base.clone());
        }
        let mut merged = serde_json::to_value(base)?;
        merge_json(&mut merged, overrides);
        Ok(serde_json::from_value(merged)?)
    }

    /// Expand environment variables written as `${VAR}` or `${VAR:-default}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = regex::Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").map_err(|e| {
            ConfigError::InvalidValue {
                field: "env".to_string(),
                message: e.to_string(),
            }
        })?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = match (std::env::var(var_name), cap.get(2)) {
                (Ok(value), _) => value,
                (Err(_), Some(default)) => default.as_str().to_string(),
                (Err(_), None) => return Err(ConfigError::EnvVarNotSet(var_name.to_string())),
            };
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.scrubber`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

fn merge_json(target: &mut serde_json::Value, overrides: &serde_json::Value) {
    match (target, overrides) {
        (serde_json::Value::Object(target), serde_json::Value::Object(overrides)) => {
            for (key, value) in overrides {
                match target.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, value) => *target = value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.cleaner.max_page_refreshes, 5);
    }

    #[test]
    fn test_load_sections() {
        let content = r#"
            [server]
            host = "0.0.0.0"
            port = 3000

            [cleaner]
            max_page_refreshes = 2

            [cleaner.timing]
            menu_wait = 900
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.cleaner.max_page_refreshes, 2);
        assert_eq!(config.cleaner.timing.menu_wait, 900);
        // untouched fields keep their defaults
        assert_eq!(config.cleaner.timing.modal_wait, 300);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[browser]").unwrap();
        writeln!(file, "debug_port = 9333").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.browser.debug_port, 9333);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/scrubber.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config =
            ConfigLoader::load_or_default(Path::new("/nonexistent/path/scrubber.toml")).unwrap();
        assert_eq!(config.browser.debug_port, 9222);
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(result.is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test runs in isolation and sets a unique test-only env var
        unsafe {
            std::env::set_var("SCRUBBER_TEST_CONFIG_VAR", "test_value");
        }
        let content = "value = \"${SCRUBBER_TEST_CONFIG_VAR}\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert!(expanded.contains("test_value"));
        unsafe {
            std::env::remove_var("SCRUBBER_TEST_CONFIG_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_SCRUBBER_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_env_vars_default() {
        let content = "host = \"${NONEXISTENT_SCRUBBER_HOST:-127.0.0.1}\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert_eq!(expanded, "host = \"127.0.0.1\"");

        let config =
            ConfigLoader::load_str("[server]\nport = ${NONEXISTENT_SCRUBBER_PORT:-9001}\n").unwrap();
        assert_eq!(config.server.port, 9001);
    }

    #[test]
    fn test_expand_env_vars_prefers_set_value_over_default() {
        // SAFETY: unique test-only env var
        unsafe {
            std::env::set_var("SCRUBBER_TEST_DEFAULTED_VAR", "from_env");
        }
        let expanded =
            ConfigLoader::expand_env_vars("v = \"${SCRUBBER_TEST_DEFAULTED_VAR:-fallback}\"").unwrap();
        assert_eq!(expanded, "v = \"from_env\"");
        unsafe {
            std::env::remove_var("SCRUBBER_TEST_DEFAULTED_VAR");
        }
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = ConfigLoader::expand_path("~/test");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/test"));
    }

    #[test]
    fn test_merge_settings_partial() {
        let base = CleanerSettings::default();
        let overrides = serde_json::json!({
            "max_page_refreshes": 1,
            "timing": { "next_item": 50 }
        });
        let merged = ConfigLoader::merge_settings(&base, &overrides).unwrap();
        assert_eq!(merged.max_page_refreshes, 1);
        assert_eq!(merged.timing.next_item, 50);
        assert_eq!(merged.timing.menu_wait, base.timing.menu_wait);
        assert_eq!(merged.max_action_retries, base.max_action_retries);
    }

    #[test]
    fn test_merge_settings_empty_or_null_keeps_base() {
        let base = CleanerSettings::default();
        let merged = ConfigLoader::merge_settings(&base, &serde_json::json!({})).unwrap();
        assert_eq!(merged, base);
        let merged = ConfigLoader::merge_settings(&base, &serde_json::Value::Null).unwrap();
        assert_eq!(merged, base);
    }

    #[test]
    fn test_merge_settings_rejects_unknown_keys() {
        let base = CleanerSettings::default();
        let camel = serde_json::json!({"maxPageRefreshes": 0});
        assert!(matches!(
            ConfigLoader::merge_settings(&base, &camel),
            Err(ConfigError::Settings(_))
        ));
        let nested = serde_json::json!({"timing": {"menuWait": 50}});
        assert!(matches!(
            ConfigLoader::merge_settings(&base, &nested),
            Err(ConfigError::Settings(_))
        ));
    }
}
