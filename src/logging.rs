//! Logging setup for service-container
//!
//! All container and compiler events are emitted under the
//! `service_container` target: registrations and cache misses at DEBUG,
//! individual resolutions and compiled method calls at TRACE, finished
//! compilations at INFO.
//!
//! # Features
//!
//! - `logging` - Emit events through `tracing` (default)
//! - `logging-json` - JSON subscriber, for aggregated production logs
//! - `logging-pretty` - Human readable subscriber, for development
//!
//! # Example
//!
//! ```rust,ignore
//! use service_container::logging;
//!
//! // JSON if logging-json is enabled, pretty otherwise
//! logging::init();
//!
//! // Only container events, everything down to TRACE
//! logging::builder().trace().container_only().pretty().init();
//!
//! // Honour RUST_LOG, falling back to the configured level
//! logging::builder().from_env().init();
//! ```

use tracing::Level;

/// Target every container event is logged under
pub const TARGET: &str = "service_container";

/// Output format of the subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Multi-line, colored
    Pretty,
    /// Single line per event
    Compact,
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    from_env: bool,
    with_file: bool,
    with_line_number: bool,
    with_thread_ids: bool,
    with_thread_names: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Json,
            target: None,
            from_env: false,
            with_file: false,
            with_line_number: false,
            with_thread_ids: false,
            with_thread_names: false,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Log every resolution and compiled method call
    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    /// Registrations are hidden; compilations still show
    pub fn info(self) -> Self {
        self.with_level(Level::INFO)
    }

    pub fn warn(self) -> Self {
        self.with_level(Level::WARN)
    }

    pub fn error(self) -> Self {
        self.with_level(Level::ERROR)
    }

    /// Only show events from `target`
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show container and compiler events
    pub fn container_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    /// Prefer the `RUST_LOG` directives when they are set
    pub fn from_env(mut self) -> Self {
        self.from_env = true;
        self
    }

    pub fn with_file(mut self) -> Self {
        self.with_file = true;
        self
    }

    pub fn with_line_number(mut self) -> Self {
        self.with_line_number = true;
        self
    }

    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    pub fn with_thread_names(mut self) -> Self {
        self.with_thread_names = true;
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// Filter directives this builder installs when `RUST_LOG` is not used
    pub fn directives(&self) -> String {
        match self.target {
            Some(target) => format!("{}={}", target, self.level),
            None => self.level.to_string(),
        }
    }

    /// Install the subscriber globally.
    ///
    /// Does nothing unless `logging-json` or `logging-pretty` is enabled.
    /// JSON output without `logging-json` falls back to the default format.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = if self.from_env {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directives()))
        } else {
            EnvFilter::new(self.directives())
        };

        macro_rules! install {
            ($layer:expr) => {{
                let layer = $layer
                    .with_file(self.with_file)
                    .with_line_number(self.with_line_number)
                    .with_thread_ids(self.with_thread_ids)
                    .with_thread_names(self.with_thread_names)
                    .with_target(true);
                let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
            }};
        }

        match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => install!(fmt::layer().json()),
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => install!(fmt::layer()),
            LogFormat::Pretty => install!(fmt::layer().pretty()),
            LogFormat::Compact => install!(fmt::layer().compact()),
        }
    }

    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Install the default subscriber: JSON with `logging-json`, pretty otherwise
pub fn init() {
    if cfg!(feature = "logging-json") {
        init_json();
    } else {
        init_pretty();
    }
}

/// JSON output at DEBUG
///
/// ```json
/// {"timestamp":"2026-01-01T00:00:00.000Z","level":"INFO","fields":{"message":"Container compiled","services":12},"target":"service_container"}
/// ```
pub fn init_json() {
    builder().json().debug().init();
}

/// Pretty output at DEBUG
///
/// ```text
///   2026-01-01T00:00:00.000Z DEBUG service_container: Registering service, service: "mailer"
/// ```
pub fn init_pretty() {
    builder().pretty().debug().init();
}

/// Pretty output at DEBUG, container events only
pub fn init_container_only() {
    builder().pretty().container_only().debug().init();
}
