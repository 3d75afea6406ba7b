//! The built-in logger.
//!
//! genheap logs through the `log` facade. An embedder that installs its own logger before
//! calling [`crate::memory_manager::init_policy`] keeps it; otherwise we install `env_logger`,
//! filtered by `GENHEAP_LOG` (falling back to `RUST_LOG`, then to `info`).

use log::SetLoggerError;

/// The environment variable that controls the built-in logger.
pub const LOG_FILTER_ENV: &str = "GENHEAP_LOG";

/// Attempt to init a env_logger for genheap.
/// Does nothing if the "builtin_env_logger" feature is disabled.
pub fn try_init() -> Result<(), SetLoggerError> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            let default_filter = std::env::var(env_logger::DEFAULT_FILTER_ENV)
                .unwrap_or_else(|_| "info".to_string());
            env_logger::Builder::from_env(
                env_logger::Env::default().filter_or(LOG_FILTER_ENV, default_filter),
            )
            .format_timestamp_millis()
            .try_init()
        } else {
            Ok(())
        }
    }
}
