// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Entity-side queues.
//!
//! ```text
//! transport thread                      application thread
//!   on_message --push--> MessageQueue --pop_front--> Subscription::take
//!   on_query   --push--> QueryQueue   --pop_front--> Service::take_request
//!                                          |
//!                                          +--add--> SequenceMap --take--> send_response
//!   on_reply   --push--> ReplyQueue   --pop_front--> Client::take_response
//! ```
//!
//! Each queue has its own mutex and never calls out while holding it, so a
//! push from a transport thread only waits for a concurrent pop to finish.

use crate::attachment::Attachment;
use crate::error::{Error, Result};
use crate::payload::{Gid, Payload};
use crate::transport::{Query, Sample};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

// Initial allocation cap; KEEP_ALL queues report a depth of usize::MAX.
const PREALLOC_LIMIT: usize = 64;

/// FIFO with drop-oldest overflow.
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    depth: usize,
    pushed: AtomicU64,
    evicted: AtomicU64,
}

impl<T> BoundedQueue<T> {
    /// Queue holding at most `depth` items; 0 is treated as 1.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(depth.min(PREALLOC_LIMIT))),
            depth,
            pushed: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Queue without a depth limit.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Append `item`, evicting from the head while the queue is full.
    ///
    /// Returns the evicted item so the caller can report it.
    pub fn push(&self, item: T) -> Option<T> {
        let mut items = self.items.lock();
        let mut evicted = None;
        while items.len() >= self.depth {
            match items.pop_front() {
                Some(old) => {
                    self.evicted.fetch_add(1, Ordering::Relaxed);
                    evicted = Some(old);
                }
                None => break,
            }
        }
        items.push_back(item);
        self.pushed.fetch_add(1, Ordering::Relaxed);
        evicted
    }

    pub fn pop_front(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Items pushed since creation.
    #[must_use]
    pub fn total_pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Items dropped by overflow since creation.
    #[must_use]
    pub fn total_evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Drop every queued item. Items are dropped after the lock is released.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.items.lock());
        drop(drained);
    }
}

/// Received message as queued on a subscription.
#[derive(Clone, Debug)]
pub struct QueuedMessage {
    pub payload: Payload,
    /// Local receipt time (ns since epoch).
    pub received_timestamp: i64,
    /// Publisher-side timestamp, or the receipt time when not attached.
    pub source_timestamp: i64,
    pub publisher_gid: Gid,
    /// Publication sequence number, -1 when not attached.
    pub sequence_number: i64,
}

impl QueuedMessage {
    pub fn from_sample(sample: Sample, received_timestamp: i64) -> Self {
        let Attachment {
            sequence_number,
            source_timestamp,
            source_gid,
        } = sample.attachment;
        Self {
            payload: sample.payload,
            received_timestamp,
            source_timestamp: source_timestamp.unwrap_or(sample.timestamp),
            publisher_gid: source_gid.unwrap_or_default(),
            sequence_number: sequence_number.unwrap_or(-1),
        }
    }
}

/// In-flight request held by a service. Owns the reply channel: dropping it
/// unanswered finalizes the request on the transport.
#[derive(Debug)]
pub struct QueuedQuery {
    pub query: Query,
    pub received_timestamp: i64,
}

impl QueuedQuery {
    pub fn new(query: Query, received_timestamp: i64) -> Self {
        Self {
            query,
            received_timestamp,
        }
    }

    /// Request sequence number carried by the query attachment.
    #[must_use]
    pub fn sequence_number(&self) -> Option<i64> {
        self.query.attachment().sequence_number
    }

    /// Gid of the requesting client; all zeroes when not attached.
    #[must_use]
    pub fn writer_gid(&self) -> Gid {
        self.query.attachment().source_gid.unwrap_or_default()
    }
}

/// Successful reply queued on a client.
#[derive(Clone, Debug)]
pub struct QueuedReply {
    pub sample: Sample,
    pub received_timestamp: i64,
}

pub type MessageQueue = BoundedQueue<QueuedMessage>;
pub type QueryQueue = BoundedQueue<QueuedQuery>;
pub type ReplyQueue = BoundedQueue<QueuedReply>;

/// (writer gid, sequence number) -> in-flight item, for replies produced
/// after the take. Sequence numbers are only unique per client, hence the gid.
pub struct SequenceMap<T> {
    entries: Mutex<HashMap<(Gid, i64), T>>,
}

impl<T> Default for SequenceMap<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> SequenceMap<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `item` under `(writer, seq)`.
    ///
    /// A live entry for the same pair is kept; the new item is dropped and
    /// [`Error::DuplicateSequence`] returned.
    pub fn insert(&self, writer: Gid, seq: i64, item: T) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&(writer, seq)) {
            return Err(Error::DuplicateSequence(seq));
        }
        entries.insert((writer, seq), item);
        Ok(())
    }

    /// Remove and return the entry. A second take yields `None`.
    pub fn take(&self, writer: Gid, seq: i64) -> Option<T> {
        self.entries.lock().remove(&(writer, seq))
    }

    #[must_use]
    pub fn contains(&self, writer: Gid, seq: i64) -> bool {
        self.entries.lock().contains_key(&(writer, seq))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Per-client request numbering: strictly increasing from 0.
#[derive(Debug, Default)]
pub struct SequenceGenerator {
    next: AtomicI64,
}

impl SequenceGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_sequence_number(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Number the next call will return.
    #[must_use]
    pub fn peek(&self) -> i64 {
        self.next.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests;
