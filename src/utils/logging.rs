//! Logging setup and module-gated logging macros.
//!
//! Every module that logs through the macros declares its own switch:
//! ```rust,ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_info};
//!
//! log_info!("session {} started", id);
//! ```
//! Flipping the const to `false` silences that module without touching
//! `RUST_LOG`.

use log::LevelFilter;

/// Environment variable that turns on per-tick heartbeat logging.
pub const DEBUG_ENV: &str = "MINDFUL_DEBUG";

/// Install the global `env_logger`.
///
/// `default_level` applies when `RUST_LOG` is unset; `RUST_LOG` directives
/// always win. Calling this twice is harmless.
pub fn init_logging(default_level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}

/// Whether `MINDFUL_DEBUG` is set to `1` or `true`.
pub fn debug_enabled() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            ::log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            ::log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            ::log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            ::log::error!($($arg)*);
        }
    };
}
