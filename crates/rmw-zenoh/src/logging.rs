// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging initialization.
//!
//! The crate itself only emits through the `log` facade. Applications that
//! do not bring their own logger can install the `env_logger` backend here.

use crate::error::{Error, Result};
use std::str::FromStr;

/// Log level for rmw diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(Error::invalid_argument(format!(
                "unknown log level '{}'",
                other
            ))),
        }
    }
}

/// Initialize logging with console output at a fixed level.
///
/// Returns [`Error::AlreadyInitialized`] if a logger is already installed.
pub fn init(level: LogLevel) -> Result<()> {
    let filter: log::LevelFilter = level.into();

    env_logger::Builder::new()
        .filter_level(filter)
        .format_timestamp_millis()
        .try_init()
        .map_err(|_| Error::AlreadyInitialized)
}

/// Initialize logging, letting `RUST_LOG` override `default_level`.
pub fn init_from_env(default_level: LogLevel) -> Result<()> {
    let filter: log::LevelFilter = default_level.into();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(filter.to_string()),
    )
    .format_timestamp_millis()
    .try_init()
    .map_err(|_| Error::AlreadyInitialized)
}

/// Initialize logging with a custom filter string (e.g. `"rmw_zenoh=debug"`).
pub fn init_with_filter(filter: &str) -> Result<()> {
    if filter.trim().is_empty() {
        return Err(Error::invalid_argument("empty log filter"));
    }

    env_logger::Builder::new()
        .parse_filters(filter)
        .format_timestamp_millis()
        .try_init()
        .map_err(|_| Error::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_levels() {
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(" debug ".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("none".parse::<LogLevel>().unwrap(), LogLevel::Off);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn level_filter_mapping() {
        assert_eq!(log::LevelFilter::from(LogLevel::Trace), log::LevelFilter::Trace);
        assert_eq!(log::LevelFilter::from(LogLevel::Off), log::LevelFilter::Off);
    }

    #[test]
    fn empty_filter_is_rejected() {
        assert!(matches!(
            init_with_filter("  "),
            Err(Error::InvalidArgument(_))
        ));
    }
}
