use super::*;
use crate::debug::DebugConsole;
use crate::store::{MemoryStateStore, StateStore, ThrottledStateWriter};
use scrubber_config::ThrottleConfig;
use serde_json::json;
use std::time::Duration;

struct Fixture {
    handle: ControlHandle,
    flags: Arc<RunFlags>,
    commands: mpsc::Receiver<ControlCommand>,
    store: Arc<MemoryStateStore>,
}

fn fixture() -> Fixture {
    let flags = Arc::new(RunFlags::new());
    let (tx, rx) = mpsc::channel(8);
    let telemetry = Arc::new(TelemetryHub::new(
        &ThrottleConfig::default(),
        Arc::new(DebugConsole::new(false)),
    ));
    let store = Arc::new(MemoryStateStore::new());
    let writer = Arc::new(ThrottledStateWriter::new(store.clone(), Duration::from_millis(1000)));
    let handle = ControlHandle::new(
        flags.clone(),
        tx,
        telemetry,
        writer,
        CleanerSettings::default(),
    );
    Fixture {
        handle,
        flags,
        commands: rx,
        store,
    }
}

#[tokio::test]
async fn test_start_sends_merged_settings() {
    let mut f = fixture();
    let response = f
        .handle
        .start(Some(&json!({"max_page_refreshes": 1})))
        .await;
    assert_eq!(response, CommandResponse::ok_with("Cleaning started"));
    assert!(f.flags.is_running());

    match f.commands.try_recv() {
        Ok(ControlCommand::Start(settings)) => assert_eq!(settings.max_page_refreshes, 1),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn test_start_while_running_is_rejected() {
    let mut f = fixture();
    f.flags.set_running(true);

    let response = f.handle.start(None).await;
    assert_eq!(response, CommandResponse::rejected("Already running"));
    assert!(f.commands.try_recv().is_err());
    assert!(f.flags.is_running());
}

#[tokio::test]
async fn test_start_with_invalid_settings_is_rejected() {
    let mut f = fixture();
    let response = f.handle.start(Some(&json!({"batch_size": 0}))).await;
    assert!(!response.success);
    assert!(!f.flags.is_running());
    assert!(f.commands.try_recv().is_err());

    let response = f.handle.start(Some(&json!({"batch_size": "ten"}))).await;
    assert!(!response.success);
    assert!(response.message.unwrap().starts_with("Invalid settings"));
}

#[tokio::test]
async fn test_start_with_unknown_keys_is_rejected() {
    let mut f = fixture();
    let response = f
        .handle
        .start(Some(&json!({"maxPageRefreshes": 0, "timing": {"menuWait": 50}})))
        .await;
    assert!(!response.success);
    assert!(response.message.unwrap().starts_with("Invalid settings"));
    assert!(!f.flags.is_running());
    assert!(f.commands.try_recv().is_err());
}

#[tokio::test]
async fn test_start_without_controller_resets_flag() {
    let f = fixture();
    drop(f.commands);
    let response = f.handle.start(None).await;
    assert!(!response.success);
    assert!(!f.flags.is_running());
}

#[tokio::test]
async fn test_stop_clears_flags_and_notifies() {
    let mut f = fixture();
    f.flags.set_running(true);
    f.flags.set_paused(true);

    assert_eq!(f.handle.stop(), CommandResponse::ok());
    assert!(!f.flags.is_running());
    assert!(!f.flags.is_paused());
    assert!(matches!(f.commands.try_recv(), Ok(ControlCommand::Stop)));
}

#[tokio::test]
async fn test_pause_only_while_running() {
    let mut f = fixture();
    f.handle.pause();
    assert!(!f.flags.is_paused());

    f.flags.set_running(true);
    f.handle.pause();
    assert!(f.handle.is_paused());

    f.handle.resume();
    assert!(!f.handle.is_paused());
    assert!(matches!(f.commands.try_recv(), Ok(ControlCommand::Resume)));
}

#[test]
fn test_ping() {
    let f = fixture();
    assert_eq!(f.handle.ping().status, "ok");
}

#[tokio::test]
async fn test_toggle_debug_persists_flag() {
    let f = fixture();
    let response = f.handle.toggle_debug(true).await;
    assert_eq!(response.message.as_deref(), Some("Debug mode enabled"));
    assert!(f.handle.telemetry().debug().is_enabled());
    assert_eq!(
        f.store.get_all().await.unwrap()[keys::DEBUG_ENABLED],
        true
    );
    assert!(!f.flags.is_running());
}

#[test]
fn test_response_wire_format() {
    let json = serde_json::to_value(CommandResponse::ok()).unwrap();
    assert_eq!(json, json!({"success": true}));
    let json = serde_json::to_value(CommandResponse::rejected("Already running")).unwrap();
    assert_eq!(json, json!({"success": false, "message": "Already running"}));
}
