//! Chrome DevTools Protocol (CDP) backend for the scrubber.
//!
//! Connects to Chrome/Chromium over its remote-debugging WebSocket, attaches
//! to the activity-log tab and exposes it as a
//! [`scrubber_core::PageAdapter`].
//!
//! ## Usage
//!
//! 1. Start Chrome with remote debugging (or let [`BrowserLauncher`] do it):
//!    ```bash
//!    chrome --remote-debugging-port=9222
//!    ```
//!
//! 2. Attach and drive:
//!    ```rust,ignore
//!    let launcher = BrowserLauncher::new(config.browser.clone());
//!    let client = launcher.connect().await?;
//!    let session = launcher.open_activity_page(&client).await?;
//!    let page = CdpPageAdapter::new(session);
//!    ```

mod adapter;
mod client;
mod error;
mod launcher;
mod protocol;
mod scripts;
mod session;

pub use adapter::CdpPageAdapter;
pub use client::CdpClient;
pub use error::CdpError;
pub use launcher::BrowserLauncher;
pub use protocol::*;
pub use session::PageSession;
