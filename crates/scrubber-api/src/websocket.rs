//! Telemetry stream over WebSocket.
//!
//! Each connection first receives the current status and stats, then every
//! event the telemetry hub broadcasts, serialized as JSON text frames.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use scrubber_core::{ControlHandle, TelemetryEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(handle): State<ControlHandle>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, handle))
}

/// Events that bring a fresh subscriber up to date.
pub(crate) fn snapshot(handle: &ControlHandle) -> [TelemetryEvent; 2] {
    [
        TelemetryEvent::UpdateStatus {
            status: handle.status(),
        },
        TelemetryEvent::UpdateStats {
            stats: handle.stats(),
        },
    ]
}

async fn handle_socket(socket: WebSocket, handle: ControlHandle) {
    let connection_id = Uuid::new_v4().to_string();
    info!("Telemetry subscriber connected: {}", connection_id);

    // subscribe before the snapshot so nothing falls between them
    let mut events = handle.subscribe();
    let (mut sender, mut receiver) = socket.split();

    for event in snapshot(&handle) {
        if !send_event(&mut sender, &event).await {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if !send_event(&mut sender, &event).await {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscriber {} lagged, skipped {} events", connection_id, skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("WebSocket error on {}: {}", connection_id, e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    info!("Telemetry subscriber disconnected: {}", connection_id);
}

/// Returns false once the peer is gone.
async fn send_event<S>(sender: &mut S, event: &TelemetryEvent) -> bool
where
    S: futures::Sink<Message> + Unpin,
{
    let Ok(json) = serde_json::to_string(event) else {
        return true;
    };
    sender.send(Message::Text(json.into())).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;

    #[tokio::test]
    async fn test_send_event_writes_json_text() {
        let (mut tx, mut rx) = mpsc::unbounded::<Message>();
        let event = TelemetryEvent::UpdateStatus {
            status: "Paused".to_string(),
        };
        assert!(send_event(&mut tx, &event).await);

        let Some(Message::Text(text)) = rx.next().await else {
            panic!("expected a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(value["action"], "updateStatus");
        assert_eq!(value["status"], "Paused");
    }

    #[tokio::test]
    async fn test_send_event_reports_closed_peer() {
        let (mut tx, rx) = mpsc::unbounded::<Message>();
        drop(rx);
        assert!(!send_event(&mut tx, &TelemetryEvent::CleaningStarted).await);
    }
}
