//! JavaScript snippets evaluated in the activity-log page.
//!
//! Elements cross the protocol boundary as ids stored in a
//! `data-scrubber-id` attribute. Every snippet is a self-contained IIFE that
//! returns a JSON-serializable value; a missing element yields `null`.

use scrubber_core::ItemTag;

const MORE_OPTIONS: &str = r#"div[aria-label="More options"]"#;
const MENU_ITEM: &str = r#"div[role="menuitem"]"#;
const HIDDEN_ATTR: &str = "data-scrubber-hidden";
const PERMANENT_CLASS: &str = "fas-permanent";
const STYLE_ID: &str = "scrubber-permanent-style";
const ITEM_LABEL: &str = "Activity Log Item";
const MAX_ANCESTORS: u32 = 15;

const PRELUDE: &str = r#"
const tagEl = (el) => {
  if (!el.dataset.scrubberId) {
    window.__scrubberSeq = (window.__scrubberSeq || 0) + 1;
    el.dataset.scrubberId = 's' + window.__scrubberSeq;
  }
  return el.dataset.scrubberId;
};
const byId = (id) => document.querySelector('[data-scrubber-id="' + CSS.escape(id) + '"]');
const textOf = (el) => el ? (el.textContent || '').trim() : null;
const itemOf = (el) => {
  let node = el;
  for (let i = 0; i < __MAX__ && node; i++) {
    node = node.parentElement;
    if (node && node.getAttribute('aria-label') === __LABEL__) return node;
  }
  return null;
};
const containerOf = (el) => itemOf(el) ?? el.parentElement?.parentElement?.parentElement ?? null;
"#;

const PERMANENT_STYLE: &str = r#"
.fas-permanent { position: relative; }
.fas-permanent::after {
  position: absolute; bottom: -25px; transform: translateX(-50%);
  background: #ff4444; color: white; padding: 4px 8px; border-radius: 4px;
  font-size: 10px; font-weight: 500; white-space: nowrap; z-index: 10000;
  box-shadow: 0 2px 8px rgba(255, 68, 68, 0.3); border: 1px solid #cc0000;
  pointer-events: none;
}
.fas-permanent-tag::after { content: "Untagged items cannot be removed"; }
.fas-permanent-profile-change::after { content: "Profile changes cannot be removed"; }
"#;

/// Encode a Rust string as a JavaScript string literal.
pub(crate) fn js_string(value: &str) -> String {
    // a JSON string is a valid JS string literal
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn wrap(body: &str) -> String {
    let prelude = PRELUDE
        .replace("__MAX__", &MAX_ANCESTORS.to_string())
        .replace("__LABEL__", &js_string(ITEM_LABEL));
    format!("(() => {{{prelude}\n{body}\n}})()")
}

fn permanent_selector() -> String {
    [ItemTag::PermanentTag, ItemTag::PermanentProfileChange]
        .iter()
        .filter_map(|tag| tag.class_name())
        .map(|class| format!("{MORE_OPTIONS}.{class}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn eligible_selector() -> String {
    let exclusions: String = [ItemTag::PermanentTag, ItemTag::PermanentProfileChange]
        .iter()
        .filter_map(|tag| tag.class_name())
        .map(|class| format!(":not(.{class})"))
        .collect();
    format!("{MORE_OPTIONS}{exclusions}")
}

pub(crate) fn find_triggers() -> String {
    wrap(&format!(
        "return Array.from(document.querySelectorAll({sel}))\n  \
         .filter((el) => !el.closest('[{HIDDEN_ATTR}]'))\n  \
         .map(tagEl);",
        sel = js_string(&eligible_selector()),
    ))
}

pub(crate) fn find_permanent_triggers() -> String {
    wrap(&format!(
        "return Array.from(document.querySelectorAll({sel})).map(tagEl);",
        sel = js_string(&permanent_selector()),
    ))
}

pub(crate) fn menu_items() -> String {
    wrap(&format!(
        "return Array.from(document.querySelectorAll({sel})).map(tagEl);",
        sel = js_string(MENU_ITEM),
    ))
}

pub(crate) fn read_text(id: &str) -> String {
    wrap(&format!("return textOf(byId({}));", js_string(id)))
}

pub(crate) fn bounding_rect(id: &str) -> String {
    wrap(&format!(
        "const el = byId({});\n\
         if (!el || !el.isConnected) return null;\n\
         const r = el.getBoundingClientRect();\n\
         return {{ x: r.left, y: r.top, width: r.width, height: r.height }};",
        js_string(id)
    ))
}

pub(crate) fn viewport() -> String {
    "({ width: window.innerWidth, height: window.innerHeight })".to_string()
}

pub(crate) fn document_height() -> String {
    "Math.max(document.body ? document.body.scrollHeight : 0, document.documentElement.scrollHeight)"
        .to_string()
}

pub(crate) fn scroll_into_view(id: &str) -> String {
    wrap(&format!(
        "const el = byId({});\n\
         if (!el) return null;\n\
         el.scrollIntoView({{ behavior: 'smooth', block: 'center' }});\n\
         return true;",
        js_string(id)
    ))
}

pub(crate) fn scroll_by(delta_y: f64) -> String {
    format!("(() => {{ window.scrollBy({{ top: {delta_y}, behavior: 'smooth' }}); return true; }})()")
}

/// Script-level click, used when the element is not on screen for a
/// trusted mouse event.
pub(crate) fn element_click(id: &str) -> String {
    wrap(&format!(
        "const el = byId({});\n\
         if (!el) return null;\n\
         el.click();\n\
         return true;",
        js_string(id)
    ))
}

pub(crate) fn has_untagged_marker(id: &str) -> String {
    wrap(&format!(
        "const el = byId({});\n\
         if (!el) return null;\n\
         const grand = el.parentElement?.parentElement;\n\
         if (!grand) return false;\n\
         for (const strong of grand.querySelectorAll('strong.html-strong')) {{\n  \
           const next = strong.nextSibling;\n  \
           if (next && next.nodeType === Node.TEXT_NODE && (next.textContent || '').includes(' was untagged in ')) return true;\n\
         }}\n\
         return false;",
        js_string(id)
    ))
}

pub(crate) fn tag_trigger(id: &str, tag: ItemTag, note: Option<&str>) -> String {
    let class = tag.class_name().unwrap_or_default();
    let note = note.map(js_string).unwrap_or_else(|| "null".to_string());
    wrap(&format!(
        "const el = byId({id});\n\
         if (!el) return null;\n\
         if (!document.getElementById({style_id})) {{\n  \
           const style = document.createElement('style');\n  \
           style.id = {style_id};\n  \
           style.textContent = {style};\n  \
           document.head.appendChild(style);\n\
         }}\n\
         const cls = {class};\n\
         if (cls) el.classList.add(cls, {permanent});\n\
         const note = {note};\n\
         if (note) {{ el.title = note; el.dataset.scrubberNote = note; }}\n\
         return true;",
        id = js_string(id),
        style_id = js_string(STYLE_ID),
        style = js_string(PERMANENT_STYLE),
        class = js_string(class),
        permanent = js_string(PERMANENT_CLASS),
    ))
}

/// The signature fields come from the resolved container; the logging
/// fields (date, type, content, View link) only exist on a labelled item.
pub(crate) fn read_container(id: &str) -> String {
    wrap(&format!(
        "const el = byId({id});\n\
         if (!el) return null;\n\
         const snap = {{ timeCandidates: [], links: [] }};\n\
         const container = containerOf(el);\n\
         if (container) {{\n  \
           snap.description = textOf(container.querySelector('[role=\"button\"] span[dir=\"auto\"]'));\n  \
           snap.buttonText = textOf(container.querySelector('[role=\"button\"]'));\n  \
           snap.timeCandidates = Array.from(container.querySelectorAll('span.xdmh292')).map(textOf);\n  \
           snap.links = Array.from(container.querySelectorAll('a[href*=\"/\"]'))\n    \
             .map((a) => a.getAttribute('href')).filter(Boolean);\n\
         }}\n\
         const item = itemOf(el);\n\
         if (item) {{\n  \
           snap.date = textOf(item.querySelector('h2 span.html-span > span'));\n  \
           snap.activityType = textOf(item.querySelector('div:first-child > span[dir=\"auto\"] > span.html-span > span.html-span > span > div'));\n  \
           snap.content = textOf(item.querySelector('div:nth-child(2) > span[dir=\"auto\"] > span.html-span > span.html-span'));\n  \
           snap.viewLink = item.querySelector('a[aria-label=\"View\"]')?.getAttribute('href') ?? null;\n\
         }}\n\
         return snap;",
        id = js_string(id),
    ))
}

pub(crate) fn find_dialog(label: &str) -> String {
    wrap(&format!(
        "const label = {};\n\
         const el = Array.from(document.querySelectorAll('div[aria-label]'))\n  \
           .find((d) => d.getAttribute('aria-label') === label);\n\
         return el ? tagEl(el) : null;",
        js_string(label)
    ))
}

pub(crate) fn find_dialog_button(dialog_id: &str, label: &str) -> String {
    wrap(&format!(
        "const dialog = byId({});\n\
         if (!dialog) return null;\n\
         const label = {};\n\
         const el = Array.from(dialog.querySelectorAll('div[aria-label]'))\n  \
           .find((d) => d.getAttribute('aria-label') === label);\n\
         return el ? tagEl(el) : null;",
        js_string(dialog_id),
        js_string(label)
    ))
}

pub(crate) fn hide_and_badge(id: &str, message: &str) -> String {
    wrap(&format!(
        "const el = byId({id});\n\
         if (!el) return null;\n\
         const container = containerOf(el);\n\
         if (!container || !container.parentNode) return false;\n\
         const badge = document.createElement('span');\n\
         badge.textContent = {message};\n\
         badge.style.cssText = 'display: inline-block; background: #ff4444; color: white; padding: 4px 8px; border-radius: 4px; font-size: 10px; font-weight: 500; white-space: nowrap; border: 1px solid #cc0000; float: right;';\n\
         const wrapper = document.createElement('div');\n\
         wrapper.className = 'fas-resurrection-error';\n\
         wrapper.style.cssText = 'position: relative; min-height: 30px; margin: 8px 26px;';\n\
         wrapper.appendChild(badge);\n\
         container.style.display = 'none';\n\
         container.setAttribute({hidden}, 'true');\n\
         container.parentNode.insertBefore(wrapper, container);\n\
         return true;",
        id = js_string(id),
        message = js_string(message),
        hidden = js_string(HIDDEN_ATTR),
    ))
}

#[cfg(test)]
#[path = "scripts_tests.rs"]
mod tests;
