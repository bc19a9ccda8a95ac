//! JavaScript evaluated in the top-level document.
//!
//! Frames are addressed by a path of indices into
//! `querySelectorAll('iframe, frame')`, starting at the top document. Every
//! script returns an object, never `null`, so results always deserialize.

use crate::config::Locator;
use serde::Deserialize;
use serde_json::json;

/// Resolves a frame path to its document plus the viewport offset of that
/// document, and finds the element a locator describes.
const PRELUDE: &str = r#"
const __resolve = (path) => {
    let doc = document, x = 0, y = 0;
    for (const i of path) {
        const frame = doc.querySelectorAll('iframe, frame')[i];
        if (!frame) return null;
        const r = frame.getBoundingClientRect();
        x += r.left + frame.clientLeft;
        y += r.top + frame.clientTop;
        let inner = null;
        try { inner = frame.contentDocument; } catch (e) { inner = null; }
        if (!inner) return null;
        doc = inner;
    }
    return { doc, x, y };
};
const __visible = (el) => {
    const r = el.getBoundingClientRect();
    if (r.width === 0 || r.height === 0) return false;
    const s = el.ownerDocument.defaultView.getComputedStyle(el);
    return s.visibility !== 'hidden' && s.display !== 'none' && s.opacity !== '0';
};
const __norm = (s) => (s || '').replace(/\s+/g, ' ').trim().toLowerCase();
const __implicit = {
    button: 'button, input[type=button], input[type=submit], input[type=reset]',
    link: 'a[href]',
    textbox: 'input:not([type]), input[type=text], input[type=email], input[type=password], textarea',
    checkbox: 'input[type=checkbox]',
    menuitem: 'li > a',
};
const __name = (el) => __norm(el.getAttribute('aria-label') || el.innerText || el.textContent || el.value || el.title);
const __find = (doc, loc) => {
    let candidates;
    if (loc.role) {
        const extra = __implicit[loc.role] ? ', ' + __implicit[loc.role] : '';
        candidates = Array.from(doc.querySelectorAll('[role="' + loc.role + '"]' + extra));
    } else if (loc.selector) {
        candidates = Array.from(doc.querySelectorAll(loc.selector));
    } else {
        candidates = Array.from(doc.querySelectorAll('a, button, input, select, [role], [onclick]'));
    }
    if (loc.text) {
        const want = __norm(loc.text);
        candidates = candidates.filter((el) => __name(el).includes(want));
    }
    return candidates.find(__visible) || candidates[0] || null;
};
"#;

/// Result of [`locate`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Located {
    /// The frame path still resolves to a document.
    pub attached: bool,
    pub found: bool,
    pub visible: bool,
    /// Element centre in top-level viewport coordinates.
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// One entry of [`frames`].
#[derive(Debug, Clone, Deserialize)]
pub struct FrameInfo {
    pub path: Vec<usize>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct FrameList {
    pub frames: Vec<FrameInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ReadyState {
    pub state: String,
}

fn locator_json(locator: &Locator) -> serde_json::Value {
    json!({
        "selector": locator.selector,
        "text": locator.text,
        "role": locator.role,
    })
}

/// Find an element; with `scroll`, bring it into view before measuring.
pub fn locate(path: &[usize], locator: &Locator, scroll: bool) -> String {
    format!(
        r#"(() => {{
{PRELUDE}
    const ctx = __resolve({path});
    if (!ctx) return {{ attached: false, found: false, visible: false }};
    const el = __find(ctx.doc, {loc});
    if (!el) return {{ attached: true, found: false, visible: false }};
    if ({scroll}) el.scrollIntoView({{ block: 'center', inline: 'center' }});
    const r = el.getBoundingClientRect();
    return {{
        attached: true,
        found: true,
        visible: __visible(el),
        x: ctx.x + r.left + r.width / 2,
        y: ctx.y + r.top + r.height / 2,
    }};
}})()"#,
        path = json!(path),
        loc = locator_json(locator),
        scroll = scroll,
    )
}

/// Focus an input and clear it so typed text replaces the old value.
pub fn focus_and_clear(path: &[usize], locator: &Locator) -> String {
    format!(
        r#"(() => {{
{PRELUDE}
    const ctx = __resolve({path});
    if (!ctx) return {{ attached: false, found: false, visible: false }};
    const el = __find(ctx.doc, {loc});
    if (!el) return {{ attached: true, found: false, visible: false }};
    el.scrollIntoView({{ block: 'center' }});
    el.focus();
    if ('value' in el) {{
        el.value = '';
        el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    }}
    return {{ attached: true, found: true, visible: __visible(el) }};
}})()"#,
        path = json!(path),
        loc = locator_json(locator),
    )
}

/// Every reachable nested frame under `path`, depth first.
pub fn frames(path: &[usize]) -> String {
    format!(
        r#"(() => {{
{PRELUDE}
    const out = [];
    const walk = (doc, prefix) => {{
        doc.querySelectorAll('iframe, frame').forEach((frame, i) => {{
            const path = prefix.concat([i]);
            let inner = null;
            try {{ inner = frame.contentDocument; }} catch (e) {{ inner = null; }}
            out.push({{ path, url: inner ? inner.URL : (frame.src || ''), name: frame.name || frame.id || '' }});
            if (inner) walk(inner, path);
        }});
    }};
    const ctx = __resolve({path});
    if (ctx) walk(ctx.doc, {path});
    return {{ frames: out }};
}})()"#,
        path = json!(path),
    )
}

pub const READY_STATE: &str = "({ state: document.readyState })";
