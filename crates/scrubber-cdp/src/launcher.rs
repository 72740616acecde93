//! Chrome process management and activity-log tab selection.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use scrubber_config::BrowserConfig;
use scrubber_core::is_activity_page;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::CdpClient;
use crate::error::CdpError;
use crate::protocol::PageInfo;
use crate::session::PageSession;

const STARTUP_POLL: Duration = Duration::from_millis(200);
const STARTUP_ATTEMPTS: u32 = 30;

/// Which tab the scrubber should drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PageChoice {
    /// An open tab already shows an activity log.
    Activity(String),
    /// Some other tab that must be navigated first.
    Navigate(String),
    /// No page targets at all.
    Open,
}

/// Prefer a tab already on the activity log, then any page tab.
pub(crate) fn pick_page(pages: &[PageInfo]) -> PageChoice {
    let tabs: Vec<&PageInfo> = pages.iter().filter(|p| p.is_page()).collect();
    if let Some(page) = tabs.iter().find(|p| is_activity_page(&p.url)) {
        return PageChoice::Activity(page.id.clone());
    }
    match tabs.first() {
        Some(page) => PageChoice::Navigate(page.id.clone()),
        None => PageChoice::Open,
    }
}

/// Launches or attaches to Chrome and finds the activity-log tab.
pub struct BrowserLauncher {
    config: BrowserConfig,
    /// Chrome process handle (if we launched it).
    chrome_process: Mutex<Option<Child>>,
}

impl BrowserLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            chrome_process: Mutex::new(None),
        }
    }

    /// Find Chrome executable path.
    pub fn find_chrome() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        let paths: &[&str] = &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ];

        #[cfg(target_os = "linux")]
        let paths: &[&str] = &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ];

        #[cfg(target_os = "windows")]
        let paths: &[&str] = &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        let paths: &[&str] = &[];

        paths.iter().map(PathBuf::from).find(|p| p.exists())
    }

    async fn is_chrome_running(&self) -> bool {
        reqwest::get(&format!("{}/json/version", self.config.endpoint()))
            .await
            .is_ok()
    }

    fn launch_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", self.config.debug_port),
            format!("--user-data-dir={}", self.config.profile_dir().display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-background-networking".to_string(),
            "--disable-sync".to_string(),
            "--disable-translate".to_string(),
            format!(
                "--window-size={},{}",
                self.config.viewport_width, self.config.viewport_height
            ),
        ];
        if self.config.headless {
            args.push("--headless=new".to_string());
        }
        args
    }

    async fn launch_chrome(&self) -> Result<Child, CdpError> {
        let chrome_path = Self::find_chrome().ok_or(CdpError::ChromeNotFound)?;
        let profile_dir = self.config.profile_dir();

        if let Err(e) = std::fs::create_dir_all(&profile_dir) {
            warn!("Failed to create profile directory: {}", e);
        }

        info!("Launching Chrome with profile at: {}", profile_dir.display());

        let child = Command::new(&chrome_path)
            .args(self.launch_args())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CdpError::LaunchFailed(e.to_string()))?;

        info!("Chrome launched with PID: {:?}", child.id());
        Ok(child)
    }

    /// Connect to the browser, launching it if allowed and necessary.
    pub async fn connect(&self) -> Result<CdpClient, CdpError> {
        if self.is_chrome_running().await {
            info!("Chrome already running on port {}", self.config.debug_port);
        } else if !self.config.launch {
            return Err(CdpError::ChromeNotAvailable(self.config.endpoint()));
        } else {
            info!(
                "Chrome not running on port {}, launching...",
                self.config.debug_port
            );
            let child = self.launch_chrome().await?;
            *self.chrome_process.lock().await = Some(child);

            let mut started = false;
            for _ in 0..STARTUP_ATTEMPTS {
                tokio::time::sleep(STARTUP_POLL).await;
                if self.is_chrome_running().await {
                    started = true;
                    break;
                }
            }
            if !started {
                return Err(CdpError::LaunchFailed(
                    "Chrome failed to start within timeout".to_string(),
                ));
            }
        }

        let client = CdpClient::connect(&self.config.endpoint()).await?;
        info!("Connected to Chrome at {}", self.config.endpoint());
        Ok(client)
    }

    /// Attach to the tab showing the activity log, navigating or opening
    /// one when none does.
    pub async fn open_activity_page(&self, client: &CdpClient) -> Result<PageSession, CdpError> {
        let target = Url::parse(&self.config.activity_log_url)?;
        let pages = client.list_pages().await?;

        let session = match pick_page(&pages) {
            PageChoice::Activity(id) => {
                debug!("Attaching to open activity log tab {}", id);
                client.attach_page(&id).await?
            }
            PageChoice::Navigate(id) => {
                info!("Navigating tab {} to {}", id, target);
                let session = client.attach_page(&id).await?;
                session.navigate(target.as_str()).await?;
                session
            }
            PageChoice::Open => {
                info!("Opening activity log at {}", target);
                let session = client.new_page(target.as_str()).await?;
                session.wait_for_load().await?;
                session
            }
        };

        if self.config.headless {
            session
                .set_viewport(self.config.viewport_width, self.config.viewport_height)
                .await?;
        }
        Ok(session)
    }

    /// Kill Chrome if we launched it.
    pub async fn shutdown(&self) {
        if let Some(mut child) = self.chrome_process.lock().await.take() {
            info!("Shutting down Chrome...");
            let _ = child.kill().await;
        }
    }
}
