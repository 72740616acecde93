//! `scrubber run`: attach to Chrome, serve the control API, clean.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use scrubber_api::ApiServer;
use scrubber_cdp::{BrowserLauncher, CdpPageAdapter};
use scrubber_config::{Config, ConfigLoader, ConfigValidator};
use scrubber_core::state::now_ms;
use scrubber_core::{
    Controller, ControllerParts, FileStateStore, PageAdapter, PersistedRun, RestoreDecision,
    StateStore, decide_restore,
};
use tracing::{info, warn};

/// Upper bound on waiting for the in-flight item after shutdown.
const CONTROLLER_DRAIN: Duration = Duration::from_secs(15);

pub(crate) fn load_config(
    path: &Path,
    host: Option<String>,
    port: Option<u16>,
) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = ConfigLoader::load_or_default(path)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let report = ConfigValidator::validate(&config)?;
    for warning in &report.warnings {
        warn!("Config warning at {}: {}", warning.path, warning.message);
    }
    if let Some(error) = report.into_error() {
        return Err(error.into());
    }
    Ok(config)
}

/// Whether the state file holds a run that the controller will pick up.
async fn has_resumable_run(store: &dyn StateStore, config: &Config) -> bool {
    match store.get_all().await {
        Ok(entries) => matches!(
            decide_restore(
                &PersistedRun::from_entries(&entries),
                now_ms(),
                config.persistence.resume_window(),
            ),
            RestoreDecision::Resume(_)
        ),
        Err(e) => {
            warn!("Could not read state file: {}", e);
            false
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

pub(crate) async fn run(
    config_path: &Path,
    auto_start: bool,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path, host, port)?;
    info!("Using config {}", config_path.display());

    let launcher = BrowserLauncher::new(config.browser.clone());
    let client = launcher.connect().await?;
    let session = launcher.open_activity_page(&client).await?;
    info!("Attached to activity log tab {}", session.target_id());

    let page: Arc<dyn PageAdapter> = Arc::new(CdpPageAdapter::new(session));
    let store: Arc<dyn StateStore> =
        Arc::new(FileStateStore::new(config.persistence.state_file()).await?);
    let resumable = has_resumable_run(store.as_ref(), &config).await;

    let (controller, handle) = Controller::new(ControllerParts::standard(page, store, &config));
    let controller_task = tokio::spawn(controller.run());

    if resumable {
        info!("Resuming the interrupted run");
    } else if auto_start {
        let response = handle.start(None).await;
        info!(
            success = response.success,
            "Auto start: {}",
            response.message.as_deref().unwrap_or("")
        );
    }

    let served = ApiServer::new(config.server.clone(), handle.clone())
        .run(shutdown_signal())
        .await;

    handle.stop();
    drop(handle);
    if tokio::time::timeout(CONTROLLER_DRAIN, controller_task)
        .await
        .is_err()
    {
        warn!("Controller did not finish within {:?}", CONTROLLER_DRAIN);
    }

    launcher.shutdown().await;
    drop(client);
    served?;
    Ok(())
}
