//! Structured logging setup
//!
//! Installs a `tracing` subscriber writing to stderr, either as console text
//! or as JSON lines. `RUST_LOG` takes precedence over the configured level.
//!
//! ```no_run
//! use verifact::util::logging;
//!
//! logging::init_from_env();
//! tracing::info!(run_id = "42", "Validation started");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Noisy dependencies kept at `warn` unless `RUST_LOG` says otherwise
const QUIET_TARGETS: [&str; 4] = ["h2", "hyper", "reqwest", "genai"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,

    /// JSON lines instead of console text
    pub use_json: bool,

    pub include_target: bool,

    /// File and line of each event
    pub include_location: bool,

    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
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

    /// JSON output with location and thread metadata
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
            include_thread_ids: true,
        }
    }

    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            ..Default::default()
        }
    }

    /// Reads `VERIFACT_LOG_LEVEL` and `VERIFACT_LOG_FORMAT` (`json` or `text`)
    pub fn from_env() -> Self {
        let level = env::var("VERIFACT_LOG_LEVEL")
            .ok()
            .and_then(|s| parse_level(&s))
            .unwrap_or(Level::INFO);

        let use_json = env::var("VERIFACT_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Self {
            level,
            use_json,
            ..Default::default()
        }
    }
}

/// Case-insensitive level name, `None` when unrecognised
pub fn parse_level(level_str: &str) -> Option<Level> {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn build_filter(level: Level) -> EnvFilter {
    if env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }

    let mut filter = EnvFilter::new(format!("warn,verifact={}", level));
    for target in QUIET_TARGETS {
        if let Ok(directive) = format!("{}=warn", target).parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);

        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.include_target)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_thread_names(config.include_thread_ids);

        let registry = tracing_subscriber::registry().with(filter);
        // try_init: a test harness may already own the global subscriber
        let _ = if config.use_json {
            registry.with(layer.json()).try_init()
        } else {
            registry.with(layer).try_init()
        };
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

pub fn init_from_env() {
    init_logging(LoggingConfig::from_env());
}
