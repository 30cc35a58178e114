//! Logger builder implementation

use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{Config, Format};
use crate::error::{LogError, LogResult};

type BoxedLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync + 'static>;

/// Applies the shared display toggles and boxes the layer, so every format
/// arm yields the same type regardless of `time` being on or off.
macro_rules! create_fmt_layer {
    ($layer:expr, $display:expr) => {{
        let layer = $layer
            .with_ansi($display.colors)
            .with_target($display.target)
            .with_file($display.source)
            .with_line_number($display.source)
            .with_thread_ids($display.thread_ids)
            .with_writer(std::io::stderr);
        let boxed: BoxedLayer = if $display.time {
            layer.boxed()
        } else {
            layer.without_time().boxed()
        };
        boxed
    }};
}

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Guard that keeps the logger's root span entered.
///
/// Dropping it exits the root span; the global subscriber itself stays
/// installed for the rest of the process.
#[derive(Debug)]
pub struct LoggerGuard {
    _root_span: Option<tracing::span::EnteredSpan>,
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Build and install the global subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Filter`] if the level directive cannot be parsed and
    /// [`LogError::AlreadyInitialized`] if another subscriber is installed.
    pub fn build(self) -> LogResult<LoggerGuard> {
        let filter = EnvFilter::try_new(&self.config.level).map_err(|e| LogError::Filter {
            filter: self.config.level.clone(),
            reason: e.to_string(),
        })?;

        let display = &self.config.display;
        let fmt_layer = match self.config.format {
            Format::Pretty => create_fmt_layer!(fmt::layer().pretty(), display),
            Format::Compact => create_fmt_layer!(fmt::layer().compact(), display),
            Format::Json => {
                create_fmt_layer!(fmt::layer().json().flatten_event(display.flatten), display)
            }
        };

        Registry::default()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| LogError::AlreadyInitialized(e.to_string()))?;

        let root_span = self.config.service.as_deref().map(|service| {
            tracing::info_span!("app", service = service).entered()
        });

        tracing::debug!(level = %self.config.level, format = ?self.config.format, "logger initialized");

        Ok(LoggerGuard {
            _root_span: root_span,
        })
    }
}

impl LoggerGuard {
    /// A guard that holds nothing; returned when logging was already set up.
    pub(crate) fn noop() -> Self {
        Self { _root_span: None }
    }
}
