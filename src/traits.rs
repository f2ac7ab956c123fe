use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Navigation to '{url}' failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("No element matches {0}")]
    ElementNotFound(String),
    #[error("'{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
    #[error("WebDriver protocol error: {0}")]
    Protocol(String),
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Browser session is closed")]
    Closed,
}

/// Addresses an element in the rendered document.
///
/// `CssWithText` picks the first element matching `css` whose trimmed text
/// contains `text`, which is how controls that only differ by their label
/// (e.g. "Developer view") are found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Locator {
    Css(String),
    CssWithText { css: String, text: String },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Locator::CssWithText {
            css: css.into(),
            text: text.into(),
        }
    }

    /// The CSS part of the locator.
    pub fn selector(&self) -> &str {
        match self {
            Locator::Css(css) | Locator::CssWithText { css, .. } => css,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Locator::Css(_) => None,
            Locator::CssWithText { text, .. } => Some(text),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(css) => write!(f, "`{}`", css),
            Locator::CssWithText { css, text } => write!(f, "`{}` containing \"{}\"", css, text),
        }
    }
}

/// Live state of a form control.
///
/// Read from the element's properties, not its attributes, so values a
/// script filled in after the page rendered are included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldState {
    /// Lowercase tag name.
    pub tag: String,
    /// Current `value` property; the text content for elements without one.
    pub value: String,
    pub checked: bool,
}

/// The action surface of an automated browser.
///
/// Implementations drive one visible browsing context. Structural queries
/// (sections, cards) are done by the caller over [`Browser::content`];
/// field values always come from [`Browser::read_field_value`].
#[async_trait]
pub trait Browser: Send + Sync {
    /// Loads `url` (absolute) in the current browsing context.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Resolves once the current document has finished loading.
    async fn wait_for_settled(&self) -> Result<(), BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    /// Serialized markup of the currently rendered document.
    async fn content(&self) -> Result<String, BrowserError>;

    async fn exists(&self, locator: &Locator) -> Result<bool, BrowserError>;

    /// State of the first element addressed by `locator`, `None` when
    /// nothing matches.
    async fn read_field_value(&self, locator: &Locator) -> Result<Option<FieldState>, BrowserError>;

    async fn click(&self, locator: &Locator) -> Result<(), BrowserError>;

    /// Replaces the value of a text input.
    async fn fill(&self, locator: &Locator, value: &str) -> Result<(), BrowserError>;

    /// Sends a single named key (e.g. `"Escape"`) to the focused document.
    async fn press_key(&self, key: &str) -> Result<(), BrowserError>;

    /// PNG bytes of the current viewport.
    async fn capture_image(&self) -> Result<Vec<u8>, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}
