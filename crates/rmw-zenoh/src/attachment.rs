// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Metadata carried next to every payload.
//!
//! Publications carry the publication sequence number, source timestamp and
//! publisher gid. Requests carry the client sequence number used to correlate
//! the reply, and replies echo it back.
//!
//! # Wire layout
//!
//! ```text
//! +-------+-----------------+------------------+------------------+
//! | flags | sequence (i64)  | timestamp (i64)  | gid (16 bytes)   |
//! +-------+-----------------+------------------+------------------+
//!   1 B        8 B LE             8 B LE             16 B
//! ```
//!
//! Absent fields are zero-filled and cleared in `flags`.

use crate::error::{Error, Result};
use crate::payload::Gid;

const FLAG_SEQUENCE: u8 = 1 << 0;
const FLAG_TIMESTAMP: u8 = 1 << 1;
const FLAG_GID: u8 = 1 << 2;

/// Encoded attachment size in bytes.
pub const ATTACHMENT_WIRE_SIZE: usize = 1 + 8 + 8 + 16;

/// Optional per-sample metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Attachment {
    pub sequence_number: Option<i64>,
    pub source_timestamp: Option<i64>,
    pub source_gid: Option<Gid>,
}

impl Attachment {
    #[must_use]
    pub fn new(sequence_number: i64, source_timestamp: i64, source_gid: Gid) -> Self {
        Self {
            sequence_number: Some(sequence_number),
            source_timestamp: Some(source_timestamp),
            source_gid: Some(source_gid),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence_number.is_none()
            && self.source_timestamp.is_none()
            && self.source_gid.is_none()
    }

    /// Encode into the fixed little-endian layout.
    #[must_use]
    pub fn encode(&self) -> [u8; ATTACHMENT_WIRE_SIZE] {
        let mut buf = [0u8; ATTACHMENT_WIRE_SIZE];
        let mut flags = 0u8;

        if let Some(seq) = self.sequence_number {
            flags |= FLAG_SEQUENCE;
            buf[1..9].copy_from_slice(&seq.to_le_bytes());
        }
        if let Some(ts) = self.source_timestamp {
            flags |= FLAG_TIMESTAMP;
            buf[9..17].copy_from_slice(&ts.to_le_bytes());
        }
        if let Some(gid) = self.source_gid {
            flags |= FLAG_GID;
            buf[17..33].copy_from_slice(gid.as_bytes());
        }

        buf[0] = flags;
        buf
    }

    /// Decode the fixed layout; trailing bytes are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < ATTACHMENT_WIRE_SIZE {
            return Err(Error::Serialization(format!(
                "attachment too short: {} < {}",
                buf.len(),
                ATTACHMENT_WIRE_SIZE
            )));
        }

        let flags = buf[0];
        let read_i64 = |range: std::ops::Range<usize>| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&buf[range]);
            i64::from_le_bytes(raw)
        };

        let sequence_number = (flags & FLAG_SEQUENCE != 0).then(|| read_i64(1..9));
        let source_timestamp = (flags & FLAG_TIMESTAMP != 0).then(|| read_i64(9..17));
        let source_gid = (flags & FLAG_GID != 0).then(|| {
            let mut raw = [0u8; 16];
            raw.copy_from_slice(&buf[17..33]);
            Gid::new(raw)
        });

        Ok(Self {
            sequence_number,
            source_timestamp,
            source_gid,
        })
    }
}
