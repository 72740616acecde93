//! [`PageAdapter`] over a live CDP page session.

use async_trait::async_trait;
use scrubber_core::{
    ContainerSnapshot, ElementHandle, ItemTag, PageAdapter, PageError, Rect, Viewport, is_visible,
};
use serde_json::Value;
use tracing::trace;

use crate::error::CdpError;
use crate::protocol::ESCAPE;
use crate::scripts;
use crate::session::PageSession;

/// Drives the activity-log tab through injected scripts and trusted input.
pub struct CdpPageAdapter {
    session: PageSession,
}

impl CdpPageAdapter {
    pub fn new(session: PageSession) -> Self {
        Self { session }
    }

    async fn eval(&self, script: String) -> Result<Value, CdpError> {
        self.session.evaluate(&script).await
    }

    /// Evaluate a script that yields `null` when `element` is gone.
    async fn eval_on(&self, element: &ElementHandle, script: String) -> Result<Value, CdpError> {
        let value = self.eval(script).await?;
        found(value, element)
    }
}

fn found(value: Value, element: &ElementHandle) -> Result<Value, CdpError> {
    if value.is_null() {
        Err(CdpError::ElementNotFound(element.to_string()))
    } else {
        Ok(value)
    }
}

fn parse_handles(value: Value) -> Result<Vec<ElementHandle>, CdpError> {
    let ids: Vec<String> = serde_json::from_value(value)?;
    Ok(ids.into_iter().map(ElementHandle::new).collect())
}

fn parse_handle(value: Value) -> Option<ElementHandle> {
    value.as_str().map(ElementHandle::new)
}

fn parse_rect(value: Value) -> Result<Option<Rect>, CdpError> {
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

#[async_trait]
impl PageAdapter for CdpPageAdapter {
    async fn find_triggers(&self) -> Result<Vec<ElementHandle>, PageError> {
        let value = self.eval(scripts::find_triggers()).await?;
        Ok(parse_handles(value)?)
    }

    async fn find_permanent_triggers(&self) -> Result<Vec<ElementHandle>, PageError> {
        let value = self.eval(scripts::find_permanent_triggers()).await?;
        Ok(parse_handles(value)?)
    }

    async fn menu_items(&self) -> Result<Vec<ElementHandle>, PageError> {
        let value = self.eval(scripts::menu_items()).await?;
        Ok(parse_handles(value)?)
    }

    async fn read_text(&self, element: &ElementHandle) -> Result<String, PageError> {
        let value = self
            .eval_on(element, scripts::read_text(element.as_str()))
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn bounding_rect(&self, element: &ElementHandle) -> Result<Option<Rect>, PageError> {
        let value = self.eval(scripts::bounding_rect(element.as_str())).await?;
        Ok(parse_rect(value)?)
    }

    async fn viewport(&self) -> Result<Viewport, PageError> {
        let value = self.eval(scripts::viewport()).await?;
        Ok(serde_json::from_value(value).map_err(CdpError::from)?)
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self.session.url().await?)
    }

    async fn document_height(&self) -> Result<f64, PageError> {
        let value = self.eval(scripts::document_height()).await?;
        Ok(value.as_f64().unwrap_or_default())
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), PageError> {
        self.eval_on(element, scripts::scroll_into_view(element.as_str()))
            .await?;
        Ok(())
    }

    async fn scroll_by(&self, delta_y: f64) -> Result<(), PageError> {
        self.eval(scripts::scroll_by(delta_y)).await?;
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), PageError> {
        let rect = self
            .bounding_rect(element)
            .await?
            .ok_or_else(|| PageError::ElementNotFound(element.to_string()))?;
        let viewport = self.viewport().await?;
        if is_visible(&rect, &viewport) {
            let (x, y) = rect.center();
            self.session.click_at(x, y).await?;
        } else {
            trace!("{} is off screen, clicking from script", element);
            self.eval_on(element, scripts::element_click(element.as_str()))
                .await?;
        }
        Ok(())
    }

    async fn press_escape(&self) -> Result<(), PageError> {
        Ok(self.session.press_key(ESCAPE).await?)
    }

    async fn has_untagged_marker(&self, trigger: &ElementHandle) -> Result<bool, PageError> {
        let value = self
            .eval_on(trigger, scripts::has_untagged_marker(trigger.as_str()))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn tag_trigger(
        &self,
        trigger: &ElementHandle,
        tag: ItemTag,
        note: Option<&str>,
    ) -> Result<(), PageError> {
        self.eval_on(trigger, scripts::tag_trigger(trigger.as_str(), tag, note))
            .await?;
        Ok(())
    }

    async fn read_container(&self, trigger: &ElementHandle) -> Result<ContainerSnapshot, PageError> {
        let value = self
            .eval_on(trigger, scripts::read_container(trigger.as_str()))
            .await?;
        Ok(serde_json::from_value(value).map_err(CdpError::from)?)
    }

    async fn find_dialog(&self, label: &str) -> Result<Option<ElementHandle>, PageError> {
        let value = self.eval(scripts::find_dialog(label)).await?;
        Ok(parse_handle(value))
    }

    async fn find_dialog_button(
        &self,
        dialog: &ElementHandle,
        label: &str,
    ) -> Result<Option<ElementHandle>, PageError> {
        let value = self
            .eval(scripts::find_dialog_button(dialog.as_str(), label))
            .await?;
        Ok(parse_handle(value))
    }

    async fn hide_and_badge(&self, trigger: &ElementHandle, message: &str) -> Result<(), PageError> {
        self.eval_on(trigger, scripts::hide_and_badge(trigger.as_str(), message))
            .await?;
        Ok(())
    }

    async fn reload(&self) -> Result<(), PageError> {
        Ok(self.session.reload().await?)
    }
}
