use crate::dom;
use crate::traits::{Browser, BrowserError, FieldState, Locator};
use async_trait::async_trait;
use reqwest::Url;
use scraper::Html;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// In-memory browser serving canned documents keyed by URL path.
///
/// Used for offline replay of captured pages and for tests. Clicking an
/// element follows its `href` or `data-goto` attribute; pressing `Escape`
/// follows the first `data-on-escape` attribute on the page.
///
/// Field values come from the markup unless a live value was registered for
/// the page, which is how script-filled controls are modelled. Pages can
/// also render late: after navigating to one, the previous document keeps
/// being served for a set number of queries.
pub struct FixtureBrowser {
    base: Url,
    state: Mutex<FixtureState>,
}

#[derive(Default)]
struct FixtureState {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    current: Option<String>,
    history: Vec<String>,
    keys: Vec<String>,
    filled: Vec<(String, String)>,
    live: Vec<LiveValue>,
    render_delays: HashMap<String, usize>,
    stale: Option<(String, usize)>,
    closed: bool,
}

struct LiveValue {
    path: String,
    css: String,
    value: Option<String>,
    checked: Option<bool>,
}

impl FixtureBrowser {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            state: Mutex::new(FixtureState::default()),
        }
    }

    pub fn with_page(self, path: &str, markup: impl Into<String>) -> Self {
        self.add_page(path, markup);
        self
    }

    /// Makes every navigation to `path` fail.
    pub fn with_failing_path(self, path: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.failing.insert(path.to_string());
        }
        self
    }

    /// Reports `value` as the live value of elements matching `css` on `path`,
    /// whatever their markup says.
    pub fn with_live_value(self, path: &str, css: &str, value: impl Into<String>) -> Self {
        self.push_live(path, css, Some(value.into()), None);
        self
    }

    /// Reports `checked` as the live checked state of elements matching
    /// `css` on `path`.
    pub fn with_live_checked(self, path: &str, css: &str, checked: bool) -> Self {
        self.push_live(path, css, None, Some(checked));
        self
    }

    /// Keeps serving the previous document for the first `queries` reads
    /// after navigating to `path`.
    pub fn with_render_delay(self, path: &str, queries: usize) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.render_delays.insert(path.to_string(), queries);
        }
        self
    }

    fn push_live(&self, path: &str, css: &str, value: Option<String>, checked: Option<bool>) {
        if let Ok(mut state) = self.state.lock() {
            state.live.push(LiveValue {
                path: path.to_string(),
                css: css.to_string(),
                value,
                checked,
            });
        }
    }

    pub fn add_page(&self, path: &str, markup: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.pages.insert(path.to_string(), markup.into());
        }
    }

    /// Paths loaded so far, in order.
    pub fn history(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.history.clone())
            .unwrap_or_default()
    }

    pub fn pressed_keys(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.keys.clone())
            .unwrap_or_default()
    }

    /// `(locator, value)` pairs passed to [`Browser::fill`].
    pub fn filled(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .map(|state| state.filled.clone())
            .unwrap_or_default()
    }

    fn state(&self) -> Result<MutexGuard<'_, FixtureState>, BrowserError> {
        let state = self
            .state
            .lock()
            .map_err(|_| BrowserError::Protocol("fixture state poisoned".to_string()))?;
        if state.closed {
            return Err(BrowserError::Closed);
        }
        Ok(state)
    }

    fn go(&self, href: &str) -> Result<(), BrowserError> {
        let mut state = self.state()?;
        let origin = match &state.current {
            Some(path) => self.base.join(path),
            None => Ok(self.base.clone()),
        };
        let target = origin
            .and_then(|origin| origin.join(href))
            .map_err(|e| BrowserError::Navigation {
                url: href.to_string(),
                reason: e.to_string(),
            })?;
        let path = target.path().to_string();

        if state.failing.contains(&path) {
            return Err(BrowserError::Navigation {
                url: target.to_string(),
                reason: "connection reset".to_string(),
            });
        }
        if !state.pages.contains_key(&path) {
            return Err(BrowserError::Navigation {
                url: target.to_string(),
                reason: "404 Not Found".to_string(),
            });
        }

        let delay = state.render_delays.get(&path).copied().unwrap_or(0);
        state.stale = match state.current.take() {
            Some(previous) if delay > 0 => Some((previous, delay)),
            _ => None,
        };
        state.history.push(path.clone());
        state.current = Some(path);
        Ok(())
    }

    /// Path of the document currently shown, which lags behind `current`
    /// while a late page is rendering.
    fn shown_path(state: &mut FixtureState) -> Option<String> {
        if let Some((previous, remaining)) = &mut state.stale {
            if *remaining > 0 {
                *remaining -= 1;
                return Some(previous.clone());
            }
        }
        state.stale = None;
        state.current.clone()
    }

    fn markup(&self) -> Result<String, BrowserError> {
        self.shown().map(|(_, markup)| markup)
    }

    fn shown(&self) -> Result<(Option<String>, String), BrowserError> {
        let mut state = self.state()?;
        let path = Self::shown_path(&mut state);
        let markup = path
            .as_ref()
            .and_then(|path| state.pages.get(path))
            .cloned()
            .unwrap_or_default();
        Ok((path, markup))
    }

    fn field_state(&self, locator: &Locator) -> Result<Option<FieldState>, BrowserError> {
        let (path, markup) = self.shown()?;
        let document = Html::parse_document(&markup);
        let Some(element) = dom::locate(&document, locator)
            .map_err(|e| BrowserError::Protocol(e.to_string()))?
        else {
            return Ok(None);
        };

        let mut field = dom::markup_state(element);
        let state = self.state()?;
        for live in state
            .live
            .iter()
            .filter(|live| Some(&live.path) == path.as_ref())
        {
            let matches = dom::compile(&live.css)
                .map(|selector| selector.matches(&element))
                .unwrap_or(false);
            if !matches {
                continue;
            }
            if let Some(value) = &live.value {
                field.value = value.clone();
            }
            if let Some(checked) = live.checked {
                field.checked = checked;
            }
        }
        Ok(Some(field))
    }

    /// Target of the element addressed by `locator`, `None` when it has none.
    fn follow_target(
        &self,
        locator: &Locator,
        attributes: &[&str],
    ) -> Result<Option<String>, BrowserError> {
        let markup = self.markup()?;
        let document = Html::parse_document(&markup);
        let element = dom::locate(&document, locator)
            .map_err(|e| BrowserError::Protocol(e.to_string()))?
            .ok_or_else(|| BrowserError::ElementNotFound(locator.to_string()))?;
        Ok(attributes
            .iter()
            .find_map(|name| element.value().attr(name))
            .map(str::to_string))
    }
}

#[async_trait]
impl Browser for FixtureBrowser {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.go(url)
    }

    async fn wait_for_settled(&self) -> Result<(), BrowserError> {
        self.state().map(|_| ())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let state = self.state()?;
        Ok(match &state.current {
            Some(path) => self
                .base
                .join(path)
                .map(|url| url.to_string())
                .unwrap_or_else(|_| path.clone()),
            None => "about:blank".to_string(),
        })
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.markup()
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, BrowserError> {
        let markup = self.markup()?;
        dom::contains(&markup, locator).map_err(|e| BrowserError::Protocol(e.to_string()))
    }

    async fn read_field_value(
        &self,
        locator: &Locator,
    ) -> Result<Option<FieldState>, BrowserError> {
        self.field_state(locator)
    }

    async fn click(&self, locator: &Locator) -> Result<(), BrowserError> {
        if let Some(target) = self.follow_target(locator, &["href", "data-goto"])? {
            self.go(&target)?;
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<(), BrowserError> {
        let markup = self.markup()?;
        let present =
            dom::contains(&markup, locator).map_err(|e| BrowserError::Protocol(e.to_string()))?;
        if !present {
            return Err(BrowserError::ElementNotFound(locator.to_string()));
        }
        self.state()?
            .filled
            .push((locator.to_string(), value.to_string()));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), BrowserError> {
        self.state()?.keys.push(key.to_string());
        if key != "Escape" {
            return Ok(());
        }
        let escape = Locator::css("[data-on-escape]");
        match self.follow_target(&escape, &["data-on-escape"]) {
            Ok(Some(target)) => self.go(&target),
            Ok(None) | Err(BrowserError::ElementNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn capture_image(&self) -> Result<Vec<u8>, BrowserError> {
        let state = self.state()?;
        let mut image = PNG_SIGNATURE.to_vec();
        image.extend_from_slice(state.current.as_deref().unwrap_or("blank").as_bytes());
        Ok(image)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.state()?.closed = true;
        Ok(())
    }
}
