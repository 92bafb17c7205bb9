// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared helpers for the integration tests.

#![allow(dead_code)]

use rmw_zenoh::{Context, DispatchMode, EnvConfig, Node};
use std::sync::{Mutex, Once, OnceLock};
use std::time::{Duration, Instant};

/// `log` backend keeping every record in memory.
pub struct CaptureLogger {
    records: Mutex<Vec<(log::Level, String)>>,
}

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        let line = record.args().to_string();
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), line));
        }
    }

    fn flush(&self) {}
}

impl CaptureLogger {
    /// Records at `level` whose text contains every needle.
    pub fn count(&self, level: log::Level, needles: &[&str]) -> usize {
        self.records
            .lock()
            .map(|records| {
                records
                    .iter()
                    .filter(|(l, line)| *l == level && needles.iter().all(|n| line.contains(n)))
                    .count()
            })
            .unwrap_or(0)
    }
}

/// Install the capturing logger for this test binary (idempotent).
///
/// Tests run in parallel, so assertions must filter on something unique to
/// the test, such as its topic name.
pub fn capture_logs() -> &'static CaptureLogger {
    static LOGGER: OnceLock<CaptureLogger> = OnceLock::new();
    static INSTALL: Once = Once::new();

    let logger = LOGGER.get_or_init(|| CaptureLogger {
        records: Mutex::new(Vec::new()),
    });
    INSTALL.call_once(|| {
        let _ = log::set_logger(logger);
        log::set_max_level(log::LevelFilter::Trace);
    });
    logger
}

pub fn context(dispatch: DispatchMode) -> Context {
    let config = EnvConfig {
        dispatch,
        ..EnvConfig::default()
    };
    Context::new(config).expect("Failed to create context")
}

pub fn node(context: &Context, name: &str) -> Node {
    context
        .create_node(name, "it")
        .expect("Failed to create node")
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
