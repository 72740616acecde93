//! `scrubber status`, `scrubber reset` and `scrubber check-config`.

use std::path::Path;

use scrubber_config::{Config, ConfigLoader, ConfigValidator};
use scrubber_core::{FileStateStore, PersistedRun, StateStore};

async fn open_store(config_path: &Path) -> Result<(Config, FileStateStore), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_or_default(config_path)?;
    let store = FileStateStore::new(config.persistence.state_file()).await?;
    Ok((config, store))
}

/// Human-readable summary of a persisted run.
pub(crate) fn describe(run: &PersistedRun) -> Vec<String> {
    let mut lines = vec![format!(
        "Running:              {}",
        if run.is_running { "yes" } else { "no" }
    )];
    if let Some(stats) = &run.stats {
        lines.push(format!(
            "Processed:            {} ({} deleted, {} failed, {} skipped, {} zombies)",
            stats.total, stats.deleted, stats.failed, stats.skipped, stats.zombies
        ));
        lines.push(format!("Success rate:         {:.1}%", stats.success_rate()));
    }
    lines.push(format!("Page refreshes:       {}", run.page_refreshes));
    lines.push(format!("Consecutive failures: {}", run.consecutive_failures));
    if let Some(ts) = run.refresh_timestamp {
        let when = chrono::DateTime::from_timestamp_millis(ts)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| ts.to_string());
        lines.push(format!("Last refresh:         {}", when));
    }
    lines.push(format!(
        "Tracked deletions:    {}",
        run.deleted_activities.len()
    ));
    lines.push(format!(
        "Debug mode:           {}",
        if run.debug_enabled { "on" } else { "off" }
    ));
    lines
}

pub(crate) async fn status(config_path: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (_, store) = open_store(config_path).await?;
    let entries = store.get_all().await?;
    println!("State file: {}", store.path().display());
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("No persisted run.");
    } else {
        for line in describe(&PersistedRun::from_entries(&entries)) {
            println!("{}", line);
        }
    }
    Ok(())
}

pub(crate) async fn reset(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (_, store) = open_store(config_path).await?;
    store.clear().await?;
    println!("Cleared {}", store.path().display());
    Ok(())
}

pub(crate) fn check_config(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load(config_path)?;
    let report = ConfigValidator::validate(&config)?;
    for warning in &report.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &report.errors {
        println!("error: {}: {}", error.path, error.message);
    }
    match report.into_error() {
        Some(error) => Err(error.into()),
        None => {
            println!("{} is valid", config_path.display());
            Ok(())
        }
    }
}
