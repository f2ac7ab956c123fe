//! Run configuration: console location, credentials, timeouts and selector
//! overrides.

use crate::dom::{CompiledSelectors, PageSelectors, SelectorError};
use reqwest::Url;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid console URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Failed to read selector overrides: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse selector overrides: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// Login identity and secret, consumed opaquely by the authenticator.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identity: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Bounds for every suspension point of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub navigation: Duration,
    pub settle: Duration,
    /// Any single browser command other than navigation.
    pub command: Duration,
    /// How long an optional control (menu link, view toggle) may take to
    /// render before it counts as absent.
    pub sub_view: Duration,
    pub env_editor: Duration,
    pub modal: Duration,
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(30),
            settle: Duration::from_secs(10),
            command: Duration::from_secs(10),
            sub_view: Duration::from_secs(3),
            env_editor: Duration::from_secs(5),
            modal: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl Timeouts {
    /// Tight bounds for driving fixture documents.
    pub fn immediate() -> Self {
        Self {
            navigation: Duration::from_millis(500),
            settle: Duration::from_millis(500),
            command: Duration::from_millis(500),
            sub_view: Duration::from_millis(20),
            env_editor: Duration::from_millis(50),
            modal: Duration::from_millis(50),
            poll_interval: Duration::from_millis(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarvesterConfig {
    pub base_url: Url,
    pub output_dir: PathBuf,
    pub timeouts: Timeouts,
    pub selectors: PageSelectors,
    /// Save a screenshot through the sink when a resource fails hard.
    pub capture_failures: bool,
}

impl HarvesterConfig {
    pub fn new(base_url: &str, output_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            output_dir: output_dir.into(),
            timeouts: Timeouts::default(),
            selectors: PageSelectors::default(),
            capture_failures: false,
        })
    }

    /// Replaces the default selectors with the overrides in a JSON file.
    pub fn with_selector_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        self.selectors = serde_json::from_str(&raw)?;
        CompiledSelectors::compile(&self.selectors)?;
        Ok(self)
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_capture_failures(mut self, capture: bool) -> Self {
        self.capture_failures = capture;
        self
    }
}

pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: "scheme must be http or https".to_string(),
        });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let credentials = Credentials::new("admin@example.com", "hunter2");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("admin@example.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_parse_base_url() {
        assert!(parse_base_url("https://console.example.com").is_ok());
        assert!(matches!(
            parse_base_url("ftp://console.example.com"),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_base_url("not a url"),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_selector_file_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"heading": "h3", "card": ".card"}}"#).unwrap();

        let config = HarvesterConfig::new("http://localhost:8000", "out")
            .unwrap()
            .with_selector_file(file.path())
            .unwrap();
        assert_eq!(config.selectors.heading, "h3");
        assert_eq!(config.selectors.card, ".card");
        assert_eq!(config.selectors.login_path, "/login");
    }

    #[test]
    fn test_invalid_selector_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"heading": "h3["}}"#).unwrap();

        let result = HarvesterConfig::new("http://localhost:8000", "out")
            .unwrap()
            .with_selector_file(file.path());
        assert!(matches!(result, Err(ConfigError::Selector(_))));
    }

    #[test]
    fn test_default_timeouts() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.navigation, Duration::from_secs(30));
        assert_eq!(timeouts.env_editor, Duration::from_secs(5));
        assert!(Timeouts::immediate().env_editor < timeouts.env_editor);
    }
}
