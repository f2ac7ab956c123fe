//! The authenticated browsing context shared by every pipeline stage.

use crate::config::{Credentials, Timeouts};
use crate::dom::PageSelectors;
use crate::traits::{Browser, BrowserError, FieldState, Locator};
use reqwest::Url;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session is not authenticated: {0}")]
    NotAuthenticated(String),
    #[error("Cannot resolve '{href}' against the console URL: {reason}")]
    InvalidUrl { href: String, reason: String },
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// One browser session against one console.
///
/// Every call is bounded by [`Timeouts`]; an elapsed bound surfaces as
/// [`BrowserError::Timeout`]. Stages receive `&Session`; only the
/// [`Authenticator`] flips it to authenticated.
pub struct Session {
    browser: Arc<dyn Browser>,
    base_url: Url,
    timeouts: Timeouts,
    authenticated: bool,
}

impl Session {
    pub fn new(browser: Arc<dyn Browser>, base_url: Url, timeouts: Timeouts) -> Self {
        Self {
            browser,
            base_url,
            timeouts,
            authenticated: false,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn require_authenticated(&self) -> Result<(), SessionError> {
        if self.authenticated {
            Ok(())
        } else {
            Err(SessionError::NotAuthenticated(
                "sign in before discovering projects".to_string(),
            ))
        }
    }

    /// Absolute URL for a console-relative reference.
    pub fn resolve(&self, href: &str) -> Result<String, SessionError> {
        self.base_url
            .join(href)
            .map(String::from)
            .map_err(|e| SessionError::InvalidUrl {
                href: href.to_string(),
                reason: e.to_string(),
            })
    }

    /// Navigates to `href` and waits for the page to settle.
    pub async fn goto(&self, href: &str) -> Result<(), SessionError> {
        let url = self.resolve(href)?;
        debug!(url = %url, "Loading page");
        bounded("navigate", self.timeouts.navigation, self.browser.navigate(&url)).await?;
        self.settle().await
    }

    pub async fn settle(&self) -> Result<(), SessionError> {
        bounded("settle", self.timeouts.settle, self.browser.wait_for_settled()).await
    }

    pub async fn current_url(&self) -> Result<String, SessionError> {
        bounded("current url", self.timeouts.command, self.browser.current_url()).await
    }

    pub async fn content(&self) -> Result<String, SessionError> {
        bounded("read document", self.timeouts.command, self.browser.content()).await
    }

    pub async fn exists(&self, locator: &Locator) -> Result<bool, SessionError> {
        bounded("query", self.timeouts.command, self.browser.exists(locator)).await
    }

    pub async fn read_field_value(
        &self,
        locator: &Locator,
    ) -> Result<Option<FieldState>, SessionError> {
        bounded(
            "read field",
            self.timeouts.command,
            self.browser.read_field_value(locator),
        )
        .await
    }

    pub async fn click(&self, locator: &Locator) -> Result<(), SessionError> {
        bounded("click", self.timeouts.command, self.browser.click(locator)).await
    }

    pub async fn fill(&self, locator: &Locator, value: &str) -> Result<(), SessionError> {
        bounded("fill", self.timeouts.command, self.browser.fill(locator, value)).await
    }

    pub async fn press_key(&self, key: &str) -> Result<(), SessionError> {
        bounded("press key", self.timeouts.command, self.browser.press_key(key)).await
    }

    pub async fn capture_image(&self) -> Result<Vec<u8>, SessionError> {
        bounded("capture image", self.timeouts.command, self.browser.capture_image()).await
    }

    /// Polls until `locator` appears, failing once `limit` elapses.
    pub async fn wait_for(&self, locator: &Locator, limit: Duration) -> Result<(), SessionError> {
        let poll = async {
            loop {
                match self.browser.exists(locator).await {
                    Ok(true) => return Ok(()),
                    Ok(false) => sleep(self.timeouts.poll_interval).await,
                    Err(e) => return Err(e),
                }
            }
        };
        bounded(&format!("wait for {}", locator), limit, poll).await
    }

    /// Like [`Session::wait_for`], but an elapsed bound means "absent"
    /// rather than an error.
    pub async fn appears(&self, locator: &Locator, limit: Duration) -> Result<bool, SessionError> {
        match self.wait_for(locator, limit).await {
            Ok(()) => Ok(true),
            Err(SessionError::Browser(BrowserError::Timeout { .. })) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub(crate) fn mark_authenticated(&mut self) {
        self.authenticated = true;
    }
}

async fn bounded<T>(
    operation: &str,
    limit: Duration,
    call: impl Future<Output = Result<T, BrowserError>>,
) -> Result<T, SessionError> {
    match timeout(limit, call).await {
        Ok(result) => result.map_err(SessionError::from),
        Err(_) => Err(BrowserError::Timeout {
            operation: operation.to_string(),
            timeout_ms: limit.as_millis() as u64,
        }
        .into()),
    }
}

/// Signs a [`Session`] in through the console's login form.
pub struct Authenticator {
    selectors: Arc<PageSelectors>,
}

impl Authenticator {
    pub fn new(selectors: Arc<PageSelectors>) -> Self {
        Self { selectors }
    }

    #[instrument(skip_all, fields(identity = %credentials.identity))]
    pub async fn authenticate(
        &self,
        session: &mut Session,
        credentials: &Credentials,
    ) -> Result<(), SessionError> {
        session.goto(&self.selectors.login_path).await?;

        if !self.on_login_page(session).await? {
            info!("Console redirected away from login; session already signed in");
            session.mark_authenticated();
            return Ok(());
        }

        session
            .fill(&self.selectors.login_identity, &credentials.identity)
            .await?;
        session
            .fill(&self.selectors.login_secret, &credentials.secret)
            .await?;
        session.click(&self.selectors.login_submit).await?;
        session.settle().await?;

        let limit = session.timeouts().navigation;
        let poll = session.timeouts().poll_interval;
        let signed_in: &Session = session;
        let left_login = timeout(limit, async {
            loop {
                if !self.on_login_page(signed_in).await? {
                    return Ok::<(), SessionError>(());
                }
                sleep(poll).await;
            }
        })
        .await;

        match left_login {
            Ok(Ok(())) => {
                session.mark_authenticated();
                info!("Authenticated");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SessionError::NotAuthenticated(format!(
                "still on {} {}ms after submitting credentials",
                self.selectors.login_path,
                limit.as_millis()
            ))),
        }
    }

    async fn on_login_page(&self, session: &Session) -> Result<bool, SessionError> {
        let current = session.current_url().await?;
        let path = Url::parse(&current)
            .map(|url| url.path().to_string())
            .unwrap_or(current);
        Ok(path.trim_end_matches('/') == self.selectors.login_path.trim_end_matches('/'))
    }
}
