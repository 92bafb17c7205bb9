// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by every rmw entry point.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the application.
///
/// Failures detected inside a wire handler never reach this type; they are
/// logged and the offending transport event is dropped.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid key expression '{0}'")]
    InvalidKeyExpr(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("not found")]
    NotFound,
    #[error("sequence number {0} is already registered")]
    DuplicateSequence(i64),
    #[error("transport session is closed")]
    SessionClosed,
    #[error("wait timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("logger already initialized")]
    AlreadyInitialized,
}

impl Error {
    /// `true` for the timeout reported by [`crate::WaitSet::wait`].
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
