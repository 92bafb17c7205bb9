// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Received byte buffers and entity identifiers.

use crate::keyexpr::KeyExpr;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Size of an entity gid in bytes.
pub const GID_SIZE: usize = 16;

/// Refcounted, immutable byte buffer handed over by the transport.
///
/// Cloning shares the buffer; the bytes are released when the last handle
/// (usually the queue entry, then the consumer) is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload(Arc<[u8]>);

impl Payload {
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Number of handles currently sharing the buffer.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl Deref for Payload {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Arc::from(bytes))
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(Arc::from(bytes))
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({} bytes)", self.0.len())
    }
}

/// 16-byte global identifier of a publisher, client or service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Gid(pub [u8; GID_SIZE]);

impl Gid {
    pub const fn new(bytes: [u8; GID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Generate a gid unique within the process.
    ///
    /// Bytes 0..8: FNV-1a of the key mixed with the process id. Bytes 8..12:
    /// creation time. Bytes 12..16: process-wide counter.
    #[must_use]
    pub fn generate(key: &KeyExpr) -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let counter = NEXT.fetch_add(1, Ordering::Relaxed);

        let mut hash = fnv1a(key.as_str().as_bytes());
        hash ^= u64::from(std::process::id()).rotate_left(32);
        let stamp = (now_ns() as u64 >> 10) as u32;

        let mut bytes = [0u8; GID_SIZE];
        bytes[..8].copy_from_slice(&hash.to_be_bytes());
        bytes[8..12].copy_from_slice(&stamp.to_be_bytes());
        bytes[12..].copy_from_slice(&(counter as u32).to_be_bytes());
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; GID_SIZE] {
        &self.0
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |h, &b| (h ^ u64::from(b)).wrapping_mul(PRIME))
}

/// Nanoseconds since the Unix epoch (0 if the clock is before the epoch).
#[must_use]
pub fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
