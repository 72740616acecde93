//! Scripted in-memory page for unit tests.

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};

use crate::error::PageError;
use crate::page::{ContainerSnapshot, ElementHandle, ItemTag, PageAdapter, Rect, Viewport};

/// What clicking an item's action entry does.
#[derive(Debug, Clone)]
pub(crate) enum Reaction {
    /// A confirmation dialog with this label opens.
    Dialog(&'static str),
    /// The item disappears without a dialog.
    Vanish,
    /// Nothing observable happens.
    Nothing,
}

#[derive(Debug, Clone)]
pub(crate) struct FakeItem {
    pub id: String,
    pub rect: Rect,
    pub tag: ItemTag,
    pub menu: Vec<String>,
    pub untagged: bool,
    pub snapshot: ContainerSnapshot,
    pub reaction: Reaction,
    /// Action clicks that do nothing before `reaction` applies.
    pub inert_attempts: u32,
    pub attempts: u32,
    pub hidden: bool,
    pub hide_closes_menu: bool,
}

impl FakeItem {
    /// Visible item with a single "Delete" entry that opens a "Delete?" dialog.
    pub fn deletable(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            rect: Rect::new(100.0, 100.0, 20.0, 20.0),
            tag: ItemTag::Normal,
            menu: vec!["Delete".to_string()],
            untagged: false,
            snapshot: ContainerSnapshot {
                description: Some(text.to_string()),
                time_candidates: vec!["2 hours ago".to_string()],
                links: vec!["https://www.facebook.com/someone".to_string()],
                ..Default::default()
            },
            reaction: Reaction::Dialog("Delete?"),
            inert_attempts: 0,
            attempts: 0,
            hidden: false,
            hide_closes_menu: true,
        }
    }

    pub fn with_menu(mut self, entries: &[&str]) -> Self {
        self.menu = entries.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_reaction(mut self, reaction: Reaction) -> Self {
        self.reaction = reaction;
        self
    }

    pub fn with_tag(mut self, tag: ItemTag) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn untagged(mut self) -> Self {
        self.untagged = true;
        self
    }

    pub fn inert_for(mut self, attempts: u32) -> Self {
        self.inert_attempts = attempts;
        self
    }
}

#[derive(Debug)]
pub(crate) struct FakeState {
    pub items: Vec<FakeItem>,
    pub open_menu: Option<String>,
    pub dialog: Option<(String, String)>,
    pub dialog_has_button: bool,
    pub url: String,
    pub viewport: Viewport,
    pub height: f64,
    /// Document height added by every `scroll_by`.
    pub scroll_growth: f64,
    pub reloads: u32,
    pub escapes: u32,
    /// Items present after the next reload.
    pub reload_items: Option<Vec<FakeItem>>,
    /// Upcoming clicks that fail with a script error.
    pub failing_clicks: u32,
    pub confirmed_dialogs: Vec<String>,
    pub badges: Vec<(String, String)>,
    pub notes: Vec<(String, ItemTag, Option<String>)>,
    pub trigger_queries: u32,
    /// Menu entry indices whose text read fails as if detached.
    pub unreadable_entries: Vec<usize>,
    pub untagged_check_fails: bool,
}

pub(crate) struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new(items: Vec<FakeItem>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                items,
                open_menu: None,
                dialog: None,
                dialog_has_button: true,
                url: "https://www.facebook.com/me/allactivity".to_string(),
                viewport: Viewport {
                    width: 1280.0,
                    height: 900.0,
                },
                height: 2000.0,
                scroll_growth: 0.0,
                reloads: 0,
                escapes: 0,
                reload_items: None,
                failing_clicks: 0,
                confirmed_dialogs: Vec::new(),
                badges: Vec::new(),
                notes: Vec::new(),
                trigger_queries: 0,
                unreadable_entries: Vec::new(),
                untagged_check_fails: false,
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock()
    }

    pub fn item(&self, id: &str) -> Option<FakeItem> {
        self.state.lock().items.iter().find(|i| i.id == id).cloned()
    }
}

fn menu_handle(item: &str, index: usize) -> ElementHandle {
    ElementHandle::new(format!("menu:{item}:{index}"))
}

fn parse_menu_handle(handle: &ElementHandle) -> Option<(String, usize)> {
    let rest = handle.as_str().strip_prefix("menu:")?;
    let (item, index) = rest.rsplit_once(':')?;
    Some((item.to_string(), index.parse().ok()?))
}

impl FakeState {
    fn item_mut(&mut self, id: &str) -> Option<&mut FakeItem> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    fn handles(&self, permanent: bool) -> Vec<ElementHandle> {
        self.items
            .iter()
            .filter(|i| !i.hidden && i.tag.is_permanent() == permanent)
            .map(|i| ElementHandle::new(i.id.clone()))
            .collect()
    }

    fn click_menu_entry(&mut self, item_id: &str, index: usize) -> Result<(), PageError> {
        self.open_menu = None;
        let Some(item) = self.item_mut(item_id) else {
            return Err(PageError::ElementNotFound(item_id.to_string()));
        };
        let text = item.menu.get(index).cloned().unwrap_or_default();
        if text.contains("Hide from profile") {
            if !item.hide_closes_menu {
                self.open_menu = Some(item_id.to_string());
            }
            return Ok(());
        }
        item.attempts += 1;
        if item.attempts <= item.inert_attempts {
            return Ok(());
        }
        match item.reaction.clone() {
            Reaction::Dialog(label) => {
                self.dialog = Some((label.to_string(), item_id.to_string()));
            }
            Reaction::Vanish => self.items.retain(|i| i.id != item_id),
            Reaction::Nothing => {}
        }
        Ok(())
    }
}

#[async_trait]
impl PageAdapter for FakePage {
    async fn find_triggers(&self) -> Result<Vec<ElementHandle>, PageError> {
        let mut state = self.state.lock();
        state.trigger_queries += 1;
        Ok(state.handles(false))
    }

    async fn find_permanent_triggers(&self) -> Result<Vec<ElementHandle>, PageError> {
        Ok(self.state.lock().handles(true))
    }

    async fn menu_items(&self) -> Result<Vec<ElementHandle>, PageError> {
        let state = self.state.lock();
        let Some(open) = state.open_menu.as_deref() else {
            return Ok(Vec::new());
        };
        let count = state
            .items
            .iter()
            .find(|i| i.id == open)
            .map(|i| i.menu.len())
            .unwrap_or(0);
        Ok((0..count).map(|idx| menu_handle(open, idx)).collect())
    }

    async fn read_text(&self, element: &ElementHandle) -> Result<String, PageError> {
        let state = self.state.lock();
        if let Some((item_id, index)) = parse_menu_handle(element) {
            if state.unreadable_entries.contains(&index) {
                return Err(PageError::ElementNotFound(element.to_string()));
            }
            return state
                .items
                .iter()
                .find(|i| i.id == item_id)
                .and_then(|i| i.menu.get(index).cloned())
                .ok_or_else(|| PageError::ElementNotFound(element.to_string()));
        }
        Ok(element.to_string())
    }

    async fn bounding_rect(&self, element: &ElementHandle) -> Result<Option<Rect>, PageError> {
        let state = self.state.lock();
        Ok(state
            .items
            .iter()
            .find(|i| i.id == element.as_str() && !i.hidden)
            .map(|i| i.rect))
    }

    async fn viewport(&self) -> Result<Viewport, PageError> {
        Ok(self.state.lock().viewport)
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self.state.lock().url.clone())
    }

    async fn document_height(&self) -> Result<f64, PageError> {
        Ok(self.state.lock().height)
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), PageError> {
        let state = self.state.lock();
        if state.items.iter().any(|i| i.id == element.as_str()) {
            Ok(())
        } else {
            Err(PageError::ElementNotFound(element.to_string()))
        }
    }

    async fn scroll_by(&self, delta_y: f64) -> Result<(), PageError> {
        let mut state = self.state.lock();
        for item in &mut state.items {
            item.rect.y -= delta_y;
        }
        state.height += state.scroll_growth;
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), PageError> {
        let mut state = self.state.lock();
        if state.failing_clicks > 0 {
            state.failing_clicks -= 1;
            return Err(PageError::Script("click intercepted".to_string()));
        }
        if let Some((item_id, index)) = parse_menu_handle(element) {
            return state.click_menu_entry(&item_id, index);
        }
        if element.as_str().starts_with("button:") {
            if let Some((dialog_label, item_id)) = state.dialog.take() {
                state.items.retain(|i| i.id != item_id);
                state.confirmed_dialogs.push(dialog_label);
            }
            return Ok(());
        }
        if state.items.iter().any(|i| i.id == element.as_str()) {
            state.open_menu = Some(element.to_string());
            return Ok(());
        }
        Err(PageError::ElementNotFound(element.to_string()))
    }

    async fn press_escape(&self) -> Result<(), PageError> {
        let mut state = self.state.lock();
        state.open_menu = None;
        state.dialog = None;
        state.escapes += 1;
        Ok(())
    }

    async fn has_untagged_marker(&self, trigger: &ElementHandle) -> Result<bool, PageError> {
        let state = self.state.lock();
        if state.untagged_check_fails {
            return Err(PageError::ElementNotFound(trigger.to_string()));
        }
        Ok(state
            .items
            .iter()
            .any(|i| i.id == trigger.as_str() && i.untagged))
    }

    async fn tag_trigger(
        &self,
        trigger: &ElementHandle,
        tag: ItemTag,
        note: Option<&str>,
    ) -> Result<(), PageError> {
        let mut state = self.state.lock();
        let Some(item) = state.item_mut(trigger.as_str()) else {
            return Err(PageError::ElementNotFound(trigger.to_string()));
        };
        item.tag = tag;
        state
            .notes
            .push((trigger.to_string(), tag, note.map(str::to_string)));
        Ok(())
    }

    async fn read_container(&self, trigger: &ElementHandle) -> Result<ContainerSnapshot, PageError> {
        let state = self.state.lock();
        state
            .items
            .iter()
            .find(|i| i.id == trigger.as_str())
            .map(|i| i.snapshot.clone())
            .ok_or_else(|| PageError::ElementNotFound(trigger.to_string()))
    }

    async fn find_dialog(&self, label: &str) -> Result<Option<ElementHandle>, PageError> {
        let state = self.state.lock();
        Ok(state
            .dialog
            .as_ref()
            .filter(|(open, _)| open == label)
            .map(|(open, _)| ElementHandle::new(format!("dialog:{open}"))))
    }

    async fn find_dialog_button(
        &self,
        _dialog: &ElementHandle,
        label: &str,
    ) -> Result<Option<ElementHandle>, PageError> {
        let state = self.state.lock();
        if state.dialog_has_button {
            Ok(Some(ElementHandle::new(format!("button:{label}"))))
        } else {
            Ok(None)
        }
    }

    async fn hide_and_badge(&self, trigger: &ElementHandle, message: &str) -> Result<(), PageError> {
        let mut state = self.state.lock();
        let Some(item) = state.item_mut(trigger.as_str()) else {
            return Err(PageError::ElementNotFound(trigger.to_string()));
        };
        item.hidden = true;
        state.badges.push((trigger.to_string(), message.to_string()));
        Ok(())
    }

    async fn reload(&self) -> Result<(), PageError> {
        let mut state = self.state.lock();
        state.reloads += 1;
        state.open_menu = None;
        state.dialog = None;
        if let Some(items) = state.reload_items.take() {
            state.items = items;
        }
        Ok(())
    }
}
