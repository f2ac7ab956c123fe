use crate::traits::{Browser, BrowserError, FieldState, Locator};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, Method, Response};
use serde_json::{json, Value};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Key under which the W3C protocol returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

// Properties, not attributes: values typed or set by page scripts only live there.
const FIELD_STATE_SCRIPT: &str = "const e = arguments[0]; \
    const value = typeof e.value === 'string' ? e.value : e.textContent; \
    return { tag: e.tagName.toLowerCase(), value: value || '', checked: e.checked === true };";

#[derive(Debug, Clone)]
pub struct WebDriverOptions {
    /// `"chrome"` or `"firefox"`.
    pub browser_name: String,
    pub headless: bool,
    pub window_size: (u32, u32),
    /// Upper bound for `document.readyState` to reach `complete`.
    pub settle_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WebDriverOptions {
    fn default() -> Self {
        Self {
            browser_name: "chrome".to_string(),
            headless: true,
            window_size: (1920, 1080),
            settle_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// A browser session driven over the W3C WebDriver wire protocol.
pub struct WebDriverBrowser {
    http: Client,
    session_url: String,
    options: WebDriverOptions,
}

impl WebDriverBrowser {
    /// Opens a new session on the WebDriver server at `endpoint`.
    #[instrument(skip(options))]
    pub async fn connect(endpoint: &str, options: WebDriverOptions) -> Result<Self, BrowserError> {
        let http = Client::new();
        let endpoint = endpoint.trim_end_matches('/');

        let response = http
            .post(format!("{}/session", endpoint))
            .json(&capabilities(&options))
            .send()
            .await?;
        let value = unwrap_response(response).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol("new session response has no sessionId".into()))?;

        info!(session_id, browser = %options.browser_name, "WebDriver session started");

        Ok(Self {
            http,
            session_url: format!("{}/session/{}", endpoint, session_id),
            options,
        })
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, BrowserError> {
        let mut request = self
            .http
            .request(method, format!("{}{}", self.session_url, path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        unwrap_response(request.send().await?).await
    }

    async fn get(&self, path: &str) -> Result<Value, BrowserError> {
        self.command(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, BrowserError> {
        self.command(Method::POST, path, Some(body)).await
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<String>, BrowserError> {
        let value = self
            .post(
                "/elements",
                json!({ "using": "css selector", "value": locator.selector() }),
            )
            .await?;
        let ids = element_ids(&value);

        let Some(text) = locator.text() else {
            return Ok(ids);
        };

        let mut matching = Vec::new();
        for id in ids {
            let shown = self.get(&format!("/element/{}/text", id)).await?;
            if collapse(shown.as_str().unwrap_or_default()).contains(text) {
                matching.push(id);
            }
        }
        Ok(matching)
    }

    async fn find_element(&self, locator: &Locator) -> Result<String, BrowserError> {
        self.find_elements(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::ElementNotFound(locator.to_string()))
    }

    async fn document_ready(&self) -> Result<bool, BrowserError> {
        let state = self
            .post(
                "/execute/sync",
                json!({ "script": "return document.readyState", "args": [] }),
            )
            .await?;
        Ok(state.as_str() == Some("complete"))
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        debug!(url, "Navigating");
        self.post("/url", json!({ "url": url }))
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn wait_for_settled(&self) -> Result<(), BrowserError> {
        poll_until(
            self.options.settle_timeout,
            self.options.poll_interval,
            "document ready",
            || self.document_ready(),
        )
        .await
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let value = self.get("/url").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        let value = self.get("/source").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, BrowserError> {
        Ok(!self.find_elements(locator).await?.is_empty())
    }

    async fn read_field_value(
        &self,
        locator: &Locator,
    ) -> Result<Option<FieldState>, BrowserError> {
        let Some(id) = self.find_elements(locator).await?.into_iter().next() else {
            return Ok(None);
        };
        let value = self
            .post(
                "/execute/sync",
                json!({ "script": FIELD_STATE_SCRIPT, "args": [{ ELEMENT_KEY: id }] }),
            )
            .await?;
        field_state(&value).map(Some)
    }

    async fn click(&self, locator: &Locator) -> Result<(), BrowserError> {
        let id = self.find_element(locator).await?;
        self.post(&format!("/element/{}/click", id), json!({})).await?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<(), BrowserError> {
        let id = self.find_element(locator).await?;
        self.post(&format!("/element/{}/clear", id), json!({})).await?;
        self.post(&format!("/element/{}/value", id), json!({ "text": value }))
            .await?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), BrowserError> {
        let code = key_code(key);
        self.post(
            "/actions",
            json!({
                "actions": [{
                    "type": "key",
                    "id": "keyboard",
                    "actions": [
                        { "type": "keyDown", "value": code },
                        { "type": "keyUp", "value": code }
                    ]
                }]
            }),
        )
        .await?;
        Ok(())
    }

    async fn capture_image(&self) -> Result<Vec<u8>, BrowserError> {
        let value = self.get("/screenshot").await?;
        STANDARD
            .decode(value.as_str().unwrap_or_default())
            .map_err(|e| BrowserError::Protocol(format!("screenshot is not base64: {}", e)))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.command(Method::DELETE, "", None).await?;
        info!("WebDriver session closed");
        Ok(())
    }
}

fn capabilities(options: &WebDriverOptions) -> Value {
    let (width, height) = options.window_size;
    let mut always_match = json!({ "browserName": options.browser_name });

    if options.browser_name == "firefox" {
        let args: Vec<&str> = if options.headless { vec!["-headless"] } else { vec![] };
        always_match["moz:firefoxOptions"] = json!({ "args": args });
    } else {
        let mut args = vec![format!("--window-size={},{}", width, height)];
        if options.headless {
            args.push("--headless=new".to_string());
        }
        always_match["goog:chromeOptions"] = json!({ "args": args });
    }

    json!({ "capabilities": { "alwaysMatch": always_match } })
}

async fn unwrap_response(response: Response) -> Result<Value, BrowserError> {
    let status = response.status();
    let mut payload: Value = response.json().await?;
    let value = payload
        .get_mut("value")
        .map(Value::take)
        .unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }

    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Err(match error {
        "no such element" => BrowserError::ElementNotFound(message.to_string()),
        "invalid session id" => BrowserError::Closed,
        _ => BrowserError::Protocol(format!("{} ({}): {}", error, status, message)),
    })
}

/// Polls `check` every `interval` until it holds, failing with a timeout
/// once `limit` has passed. The check always runs at least once.
async fn poll_until<F, Fut>(
    limit: Duration,
    interval: Duration,
    operation: &str,
    mut check: F,
) -> Result<(), BrowserError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, BrowserError>>,
{
    let deadline = Instant::now() + limit;
    loop {
        if check().await? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::Timeout {
                operation: operation.to_string(),
                timeout_ms: limit.as_millis() as u64,
            });
        }
        tokio::time::sleep(interval).await;
    }
}

fn field_state(value: &Value) -> Result<FieldState, BrowserError> {
    let tag = value
        .get("tag")
        .and_then(Value::as_str)
        .ok_or_else(|| BrowserError::Protocol(format!("field state has no tag: {}", value)))?;
    Ok(FieldState {
        tag: tag.to_string(),
        value: value
            .get("value")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        checked: value.get("checked").and_then(Value::as_bool).unwrap_or(false),
    })
}

fn element_ids(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(ELEMENT_KEY).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Named keys map onto the WebDriver private-use code points.
fn key_code(key: &str) -> String {
    match key {
        "Escape" => "\u{E00C}".to_string(),
        "Enter" => "\u{E007}".to_string(),
        "Tab" => "\u{E004}".to_string(),
        other => other.to_string(),
    }
}
