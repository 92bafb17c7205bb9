// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hierarchical key expressions used to route samples and queries.
//!
//! A key is a `/`-separated list of non-empty chunks. Two chunks are
//! wildcards:
//!
//! - `*` matches exactly one chunk
//! - `**` matches zero or more chunks
//!
//! ```text
//! 0/chatter/std_msgs::msg::String      concrete topic key
//! 0/*/std_msgs::msg::String            any topic of that type in domain 0
//! 0/**                                 everything in domain 0
//! ```

use crate::error::{Error, Result};
use std::fmt;

/// Validated key expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyExpr(String);

impl KeyExpr {
    /// Validate and wrap a key expression.
    pub fn new(expr: impl Into<String>) -> Result<Self> {
        let expr = expr.into();
        if expr.is_empty() || expr.starts_with('/') || expr.ends_with('/') {
            return Err(Error::InvalidKeyExpr(expr));
        }

        for chunk in expr.split('/') {
            let valid = !chunk.is_empty()
                && !chunk.contains(['#', '?'])
                && (!chunk.contains('*') || chunk == "*" || chunk == "**");
            if !valid {
                return Err(Error::InvalidKeyExpr(expr));
            }
        }

        Ok(Self(expr))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` when the key contains no wildcard chunk.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        !self.0.split('/').any(|c| c == "*" || c == "**")
    }

    /// `true` when some concrete key is matched by both expressions.
    #[must_use]
    pub fn intersects(&self, other: &KeyExpr) -> bool {
        let lhs: Vec<&str> = self.0.split('/').collect();
        let rhs: Vec<&str> = other.0.split('/').collect();
        chunks_intersect(&lhs, &rhs)
    }
}

impl fmt::Display for KeyExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for KeyExpr {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn chunks_intersect(lhs: &[&str], rhs: &[&str]) -> bool {
    match (lhs.first(), rhs.first()) {
        (None, None) => true,
        (Some(&"**"), _) => {
            chunks_intersect(&lhs[1..], rhs) || (!rhs.is_empty() && chunks_intersect(lhs, &rhs[1..]))
        }
        (_, Some(&"**")) => {
            chunks_intersect(lhs, &rhs[1..]) || (!lhs.is_empty() && chunks_intersect(&lhs[1..], rhs))
        }
        (None, _) | (_, None) => false,
        (Some(a), Some(b)) => {
            (*a == "*" || *b == "*" || a == b) && chunks_intersect(&lhs[1..], &rhs[1..])
        }
    }
}

/// Build the key used by publishers, subscriptions, services and clients:
/// `<domain_id>/<name>/<type_name>`.
///
/// Leading and trailing slashes of `name` are stripped; `/` inside the type
/// name is rewritten to `::` so the type occupies a single chunk.
pub fn topic_keyexpr(domain_id: u32, name: &str, type_name: &str) -> Result<KeyExpr> {
    let name = name.trim_matches('/');
    if name.is_empty() {
        return Err(Error::invalid_argument("topic name is empty"));
    }
    if name.contains('*') {
        return Err(Error::invalid_argument(format!(
            "topic name '{}' must not contain wildcards",
            name
        )));
    }
    if type_name.is_empty() {
        return Err(Error::invalid_argument("type name is empty"));
    }

    let type_chunk = type_name.replace('/', "::");
    KeyExpr::new(format!("{}/{}/{}", domain_id, name, type_chunk))
}
