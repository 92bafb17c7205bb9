// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport seam.
//!
//! The rmw core talks to the key-expression pub/sub/query transport only
//! through [`Transport`]. Declarations bind a key to a boxed callback; the
//! callback captures whatever identifies its destination entity, so the
//! transport never needs to know about entities.
//!
//! [`LocalSession`] is an in-process implementation used by tests and by
//! applications that only talk within one process.

use crate::attachment::Attachment;
use crate::error::Result;
use crate::keyexpr::KeyExpr;
use crate::payload::Payload;
use std::fmt;

mod local;

pub use local::LocalSession;

/// Handler for samples delivered to a subscriber declaration.
pub type SampleCallback = Box<dyn Fn(Sample) + Send + Sync>;
/// Handler for queries delivered to a queryable declaration.
pub type QueryCallback = Box<dyn Fn(Query) + Send + Sync>;
/// Handler for replies to a `get`. May be called once per answering queryable.
pub type ReplyCallback = Box<dyn Fn(Reply) + Send + Sync>;

/// Identifier returned by a declaration, used to undeclare it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeclarationId(pub u64);

impl fmt::Display for DeclarationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decl#{}", self.0)
    }
}

/// How a session invokes declaration callbacks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// On the thread calling `put`/`get`/`reply`.
    Inline,
    /// On a dedicated session thread, in submission order.
    #[default]
    Threaded,
}

impl DispatchMode {
    /// Parse `"inline"` or `"threaded"` (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Some(Self::Inline),
            "threaded" => Some(Self::Threaded),
            _ => None,
        }
    }
}

/// Data published on a key.
#[derive(Clone, Debug)]
pub struct Sample {
    pub key: KeyExpr,
    pub payload: Payload,
    /// Transport timestamp (ns since epoch).
    pub timestamp: i64,
    pub attachment: Attachment,
}

impl Sample {
    #[must_use]
    pub fn new(key: KeyExpr, payload: Payload, timestamp: i64, attachment: Attachment) -> Self {
        Self {
            key,
            payload,
            timestamp,
            attachment,
        }
    }
}

/// Error reply as reported by the transport.
#[derive(Clone, Debug)]
pub struct ReplyError {
    pub payload: Payload,
    pub reason: String,
}

impl fmt::Display for ReplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

/// Reply to a `get`.
pub type Reply = std::result::Result<Sample, ReplyError>;

/// Transport-side reply channel of one query.
///
/// A query is answered at most once: `send` and `finalize` consume the sink.
pub trait ReplySink: Send {
    fn send(self: Box<Self>, reply: Reply);

    /// No reply will be sent.
    fn finalize(self: Box<Self>);
}

/// Incoming query. Owns its reply channel; dropping an unanswered query
/// finalizes the channel.
pub struct Query {
    key: KeyExpr,
    payload: Payload,
    attachment: Attachment,
    sink: Option<Box<dyn ReplySink>>,
}

impl Query {
    pub fn new(
        key: KeyExpr,
        payload: Payload,
        attachment: Attachment,
        sink: Box<dyn ReplySink>,
    ) -> Self {
        Self {
            key,
            payload,
            attachment,
            sink: Some(sink),
        }
    }

    #[must_use]
    pub fn key(&self) -> &KeyExpr {
        &self.key
    }

    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    #[must_use]
    pub fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    /// Answer with data.
    pub fn reply(mut self, sample: Sample) {
        if let Some(sink) = self.sink.take() {
            sink.send(Ok(sample));
        }
    }

    /// Answer with an error.
    pub fn reply_err(mut self, payload: Payload, reason: impl Into<String>) {
        if let Some(sink) = self.sink.take() {
            sink.send(Err(ReplyError {
                payload,
                reason: reason.into(),
            }));
        }
    }
}

impl Drop for Query {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.take() {
            log::debug!("[rmw-wire] query on '{}' dropped unanswered", self.key);
            sink.finalize();
        }
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.key)
            .field("payload", &self.payload)
            .field("attachment", &self.attachment)
            .field("answered", &self.sink.is_none())
            .finish()
    }
}

/// Key-expression pub/sub/query transport.
///
/// Callbacks may run on any thread and must not block. After `undeclare`
/// returns, an invocation already in progress may still complete.
pub trait Transport: Send + Sync {
    fn declare_subscriber(&self, key: &KeyExpr, callback: SampleCallback)
        -> Result<DeclarationId>;

    fn declare_queryable(&self, key: &KeyExpr, callback: QueryCallback) -> Result<DeclarationId>;

    fn undeclare(&self, id: DeclarationId) -> Result<()>;

    fn put(&self, key: &KeyExpr, payload: Payload, attachment: Attachment) -> Result<()>;

    /// Send a query to every intersecting queryable; each answer is handed
    /// to `callback`.
    fn get(
        &self,
        key: &KeyExpr,
        payload: Payload,
        attachment: Attachment,
        callback: ReplyCallback,
    ) -> Result<()>;

    fn is_closed(&self) -> bool;

    /// Stop delivering; later calls fail with `Error::SessionClosed`.
    fn close(&self);
}
