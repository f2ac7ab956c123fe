//! Structured logging setup.
//!
//! Logs go to stderr so the run report on stdout stays clean. Filtering
//! honours `RUST_LOG`; without it the harvester logs at the configured level
//! and the HTTP stack is held at `warn`.

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LEVEL_VAR: &str = "HARVESTER_LOG_LEVEL";
pub const JSON_VAR: &str = "HARVESTER_LOG_JSON";

static INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for the harvester's own events
    pub level: Level,

    /// Use JSON output (for log shippers)
    pub use_json: bool,

    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Reads `HARVESTER_LOG_LEVEL` and `HARVESTER_LOG_JSON`.
    pub fn from_env() -> Self {
        let level = env::var(LEVEL_VAR)
            .map(|value| parse_level(&value))
            .unwrap_or(Level::INFO);
        let use_json = env::var(JSON_VAR)
            .ok()
            .and_then(|value| value.parse::<bool>().ok())
            .unwrap_or(false);
        Self {
            level,
            use_json,
            ..Default::default()
        }
    }
}

/// Parses a level name case-insensitively, falling back to `INFO`.
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn directives(config: &LoggingConfig, rust_log_set: bool) -> Vec<String> {
    let mut directives = vec![format!("config_harvester={}", config.level)];
    if !rust_log_set {
        directives.extend(["h2=warn", "hyper=warn", "reqwest=warn"].map(String::from));
    }
    directives
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        for directive in directives(&config, env::var("RUST_LOG").is_ok()) {
            if let Ok(directive) = directive.parse::<Directive>() {
                filter = filter.add_directive(directive);
            }
        }

        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.include_target)
            .with_file(config.include_location)
            .with_line_number(config.include_location);

        // a subscriber installed by the embedding application wins
        let _ = if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
        };
    });
}
