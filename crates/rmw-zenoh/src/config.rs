// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Environment variable configuration for the rmw layer.
//!
//! ## Core Configuration
//! - `RMW_ZENOH_DOMAIN_ID`: domain ID used as the first key chunk (default: 0,
//!   or `ROS_DOMAIN_ID` if set)
//! - `RMW_ZENOH_LOG_LEVEL`: logging level (default: "info")
//! - `RMW_ZENOH_SESSION_CONFIG_URI`: transport session configuration file
//! - `RMW_ZENOH_DEFAULT_DEPTH`: history depth substituted for `SystemDefault`
//! - `RMW_ZENOH_DISPATCH`: `inline` or `threaded` callback dispatch for the
//!   in-process session (default: `threaded`)
//!
//! ## ROS 2 Compatibility
//! - `ROS_DOMAIN_ID`: fallback for `RMW_ZENOH_DOMAIN_ID`
//!
//! # Example
//!
//! ```bash
//! export RMW_ZENOH_DOMAIN_ID=42
//! export RMW_ZENOH_LOG_LEVEL=debug
//! export RMW_ZENOH_DEFAULT_DEPTH=5
//! ```

use crate::transport::DispatchMode;
use std::env;

/// Environment variable names
pub const ENV_DOMAIN_ID: &str = "RMW_ZENOH_DOMAIN_ID";
pub const ENV_LOG_LEVEL: &str = "RMW_ZENOH_LOG_LEVEL";
pub const ENV_SESSION_CONFIG_URI: &str = "RMW_ZENOH_SESSION_CONFIG_URI";
pub const ENV_DEFAULT_DEPTH: &str = "RMW_ZENOH_DEFAULT_DEPTH";
pub const ENV_DISPATCH: &str = "RMW_ZENOH_DISPATCH";

/// ROS 2 environment variable for domain ID (fallback)
pub const ENV_ROS_DOMAIN_ID: &str = "ROS_DOMAIN_ID";

/// History depth used when a profile asks for the system default.
pub const DEFAULT_HISTORY_DEPTH: usize = 10;

/// Runtime configuration from environment variables
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Domain ID, first chunk of every entity key
    pub domain_id: u32,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Path or URI of the transport session configuration
    pub session_config_uri: Option<String>,

    /// Depth substituted for `History::SystemDefault`
    pub default_depth: usize,

    /// Callback dispatch mode of the in-process session
    pub dispatch: DispatchMode,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            domain_id: 0,
            log_level: "info".to_string(),
            session_config_uri: None,
            default_depth: DEFAULT_HISTORY_DEPTH,
            dispatch: DispatchMode::Threaded,
        }
    }
}

impl EnvConfig {
    /// Load configuration from environment variables
    ///
    /// Priority for domain ID:
    /// 1. RMW_ZENOH_DOMAIN_ID
    /// 2. ROS_DOMAIN_ID
    /// 3. Default (0)
    #[must_use]
    pub fn from_env() -> Self {
        let domain_id = env::var(ENV_DOMAIN_ID)
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .or_else(|| {
                env::var(ENV_ROS_DOMAIN_ID)
                    .ok()
                    .and_then(|s| s.parse::<u32>().ok())
            })
            .unwrap_or(0);

        let log_level = env::var(ENV_LOG_LEVEL)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "info".to_string());

        let session_config_uri = env::var(ENV_SESSION_CONFIG_URI)
            .ok()
            .filter(|s| !s.is_empty());

        // Zero is not a usable depth; ignore it like a parse failure.
        let default_depth = env::var(ENV_DEFAULT_DEPTH)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&d| d > 0)
            .unwrap_or(DEFAULT_HISTORY_DEPTH);

        let dispatch = env::var(ENV_DISPATCH)
            .ok()
            .and_then(|s| DispatchMode::parse(&s))
            .unwrap_or(DispatchMode::Threaded);

        Self {
            domain_id,
            log_level,
            session_config_uri,
            default_depth,
            dispatch,
        }
    }

    /// Check if any custom configuration was provided
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.domain_id != 0
            || self.log_level != "info"
            || self.session_config_uri.is_some()
            || self.default_depth != DEFAULT_HISTORY_DEPTH
            || self.dispatch != DispatchMode::Threaded
    }

    /// Apply log level to the logging subsystem
    pub fn apply_log_level(&self) {
        if let Err(e) = env::var("RUST_LOG") {
            // Only set if RUST_LOG is not already set
            if e == env::VarError::NotPresent {
                env::set_var("RUST_LOG", &self.log_level);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::{const_mutex, Mutex};

    // Every test touching the process environment holds this lock.
    static ENV_LOCK: Mutex<()> = const_mutex(());

    // Restores a variable when dropped so tests do not leak state.
    struct EnvGuard {
        name: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(name: &'static str, value: &str) -> Self {
            let prev = env::var(name).ok();
            env::set_var(name, value);
            Self { name, prev }
        }

        fn unset(name: &'static str) -> Self {
            let prev = env::var(name).ok();
            env::remove_var(name);
            Self { name, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.prev {
                Some(v) => env::set_var(self.name, v),
                None => env::remove_var(self.name),
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = EnvConfig::default();
        assert_eq!(config.domain_id, 0);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.default_depth, DEFAULT_HISTORY_DEPTH);
        assert!(config.session_config_uri.is_none());
        assert!(!config.is_custom());
    }

    #[test]
    fn test_domain_id_priority() {
        let _env = ENV_LOCK.lock();
        let _rmw = EnvGuard::set(ENV_DOMAIN_ID, "42");
        let _ros = EnvGuard::set(ENV_ROS_DOMAIN_ID, "99");
        assert_eq!(EnvConfig::from_env().domain_id, 42);

        let _rmw = EnvGuard::unset(ENV_DOMAIN_ID);
        assert_eq!(EnvConfig::from_env().domain_id, 99);
    }

    #[test]
    fn test_zero_default_depth_is_ignored() {
        let _env = ENV_LOCK.lock();
        let _depth = EnvGuard::set(ENV_DEFAULT_DEPTH, "0");
        assert_eq!(EnvConfig::from_env().default_depth, DEFAULT_HISTORY_DEPTH);
    }

    #[test]
    fn test_session_config_uri_from_env() {
        let _env = ENV_LOCK.lock();
        let _uri = EnvGuard::set(ENV_SESSION_CONFIG_URI, "/etc/rmw/session.json5");
        let config = EnvConfig::from_env();
        assert_eq!(
            config.session_config_uri.as_deref(),
            Some("/etc/rmw/session.json5")
        );
        assert!(config.is_custom());

        let _uri = EnvGuard::set(ENV_SESSION_CONFIG_URI, "");
        assert!(EnvConfig::from_env().session_config_uri.is_none());
    }

    #[test]
    fn test_apply_log_level_respects_rust_log() {
        let _env = ENV_LOCK.lock();
        let config = EnvConfig {
            log_level: "debug".to_string(),
            ..EnvConfig::default()
        };

        let _rust_log = EnvGuard::unset("RUST_LOG");
        config.apply_log_level();
        assert_eq!(env::var("RUST_LOG").as_deref(), Ok("debug"));

        let _rust_log = EnvGuard::set("RUST_LOG", "warn");
        config.apply_log_level();
        assert_eq!(env::var("RUST_LOG").as_deref(), Ok("warn"));
    }

    #[test]
    fn test_is_custom() {
        let mut config = EnvConfig::default();
        assert!(!config.is_custom());

        config.domain_id = 1;
        assert!(config.is_custom());

        config.domain_id = 0;
        config.dispatch = DispatchMode::Inline;
        assert!(config.is_custom());
    }
}
