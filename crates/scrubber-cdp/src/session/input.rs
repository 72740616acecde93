//! Trusted mouse and keyboard input for a page session.

use serde_json::json;
use tracing::trace;

use crate::error::CdpError;
use crate::protocol::{KeyDescriptor, KeyEventType, MouseButton, MouseEventType};

use super::core::PageSession;

impl PageSession {
    /// Move, press and release the left button at viewport coordinates.
    pub async fn click_at(&self, x: f64, y: f64) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": MouseEventType::MouseMoved,
                "x": x,
                "y": y,
                "button": MouseButton::None,
            })),
        )
        .await?;
        for event in [MouseEventType::MousePressed, MouseEventType::MouseReleased] {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": event,
                    "x": x,
                    "y": y,
                    "button": MouseButton::Left,
                    "clickCount": 1,
                })),
            )
            .await?;
        }
        trace!("Clicked at ({}, {})", x, y);
        Ok(())
    }

    /// Press and release a named key.
    pub async fn press_key(&self, key: KeyDescriptor) -> Result<(), CdpError> {
        for event in [KeyEventType::RawKeyDown, KeyEventType::KeyUp] {
            self.call("Input.dispatchKeyEvent", Some(Self::key_event(event, key)))
                .await?;
        }
        Ok(())
    }

    pub(super) fn key_event(event: KeyEventType, key: KeyDescriptor) -> serde_json::Value {
        json!({
            "type": event,
            "key": key.key,
            "code": key.code,
            "windowsVirtualKeyCode": key.key_code,
            "nativeVirtualKeyCode": key.key_code,
        })
    }
}
