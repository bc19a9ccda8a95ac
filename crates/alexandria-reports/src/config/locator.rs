use serde::Deserialize;
use std::fmt;

/// How to find an element - by CSS selector, visible text, ARIA role, or a
/// combination.
///
/// - `selector` alone: first element matching the CSS query.
/// - `selector` + `text`: first element matching the query whose text
///   contains `text`.
/// - `role` + `text`: first element with that role whose accessible name
///   contains `text`.
/// - `text` alone: first clickable element containing `text`.
///
/// Text matching is a case-insensitive substring match.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct Locator {
    /// CSS selector.
    pub selector: Option<String>,
    /// Visible text (or accessible name, with `role`).
    pub text: Option<String>,
    /// ARIA role, e.g. `button` or `link`.
    pub role: Option<String>,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: Some(selector.into()),
            ..Default::default()
        }
    }

    pub fn css_with_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            selector: Some(selector.into()),
            text: Some(text.into()),
            role: None,
        }
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            selector: None,
            text: Some(name.into()),
            role: Some(role.into()),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// True when no field is set; such a locator matches nothing.
    pub fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.selector) && blank(&self.text) && blank(&self.role)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.role, &self.selector, &self.text) {
            (Some(r), _, Some(t)) => write!(f, "{} '{}'", r, t),
            (Some(r), _, None) => write!(f, "role '{}'", r),
            (None, Some(s), Some(t)) => write!(f, "selector '{}' with text '{}'", s, t),
            (None, Some(s), None) => write!(f, "selector '{}'", s),
            (None, None, Some(t)) => write!(f, "text '{}'", t),
            (None, None, None) => write!(f, "unknown"),
        }
    }
}
