//! # Tessera Log
//!
//! Subscriber setup for the tessera crates. Library crates only emit events
//! through [`tracing`]; binaries and test harnesses call one of the init
//! functions below once per process.
//!
//! ```rust,no_run
//! let _guard = tessera_log::auto_init()?;
//! tracing::info!(inputs = 3, "action registered");
//! # Ok::<(), tessera_log::LogError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod error;

use std::sync::OnceLock;

pub use builder::{LoggerBuilder, LoggerGuard};
pub use config::{Config, DisplayConfig, Format};
pub use error::{LogError, LogResult};

static TEST_INIT: OnceLock<()> = OnceLock::new();

/// Pick a configuration from the environment and build type.
///
/// `TESSERA_LOG` / `RUST_LOG` win when present; otherwise debug builds use
/// [`Config::development`] and release builds [`Config::production`].
pub fn auto_init() -> LogResult<LoggerGuard> {
    if std::env::var("TESSERA_LOG").is_ok() || std::env::var("RUST_LOG").is_ok() {
        init_with(Config::from_env())
    } else if cfg!(debug_assertions) {
        init_with(Config::development())
    } else {
        init_with(Config::production())
    }
}

/// Initialize with the default configuration.
pub fn init() -> LogResult<LoggerGuard> {
    init_with(Config::default())
}

/// Initialize with a custom configuration.
pub fn init_with(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}

/// Initialize for tests.
///
/// Safe to call from every test: only the first call installs a subscriber,
/// later calls (or calls after another harness installed one) are no-ops.
pub fn init_test() -> LoggerGuard {
    let mut guard = LoggerGuard::noop();
    TEST_INIT.get_or_init(|| {
        if !tracing::dispatcher::has_been_set()
            && let Ok(installed) = init_with(Config::test())
        {
            guard = installed;
        }
    });
    guard
}
