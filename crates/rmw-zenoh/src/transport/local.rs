// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process transport session.
//!
//! Routes puts and gets to declarations whose key intersects the target key.
//! In [`DispatchMode::Threaded`] every callback runs on one session thread fed
//! by a channel, so arrivals keep submission order per key (and globally).

use super::{
    DeclarationId, DispatchMode, Query, QueryCallback, Reply, ReplyCallback, ReplySink, Sample,
    SampleCallback, Transport,
};
use crate::attachment::Attachment;
use crate::error::{Error, Result};
use crate::keyexpr::KeyExpr;
use crate::payload::{now_ns, Payload};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

/// Unit of work for the dispatcher.
enum Job {
    Sample(Arc<SampleCallback>, Sample),
    Query(Arc<QueryCallback>, Query),
    Reply(Arc<ReplyCallback>, Reply),
}

impl Job {
    fn run(self) {
        let (kind, key) = match &self {
            Job::Sample(_, sample) => ("sample", sample.key.to_string()),
            Job::Query(_, query) => ("query", query.key().to_string()),
            Job::Reply(_, Ok(sample)) => ("reply", sample.key.to_string()),
            Job::Reply(_, Err(_)) => ("reply", String::new()),
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| match self {
            Job::Sample(callback, sample) => callback(sample),
            Job::Query(callback, query) => callback(query),
            Job::Reply(callback, reply) => callback(reply),
        }));

        if result.is_err() {
            log::error!("[local-session] {} callback on '{}' panicked", kind, key);
        }
    }
}

struct Declaration<C: ?Sized> {
    id: DeclarationId,
    key: KeyExpr,
    callback: Arc<C>,
}

struct SessionInner {
    mode: DispatchMode,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
    subscribers: RwLock<Vec<Declaration<SampleCallback>>>,
    queryables: RwLock<Vec<Declaration<QueryCallback>>>,
    sender: Mutex<Option<Sender<Job>>>,
}

impl SessionInner {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }
        Ok(())
    }

    fn next_declaration(&self) -> DeclarationId {
        DeclarationId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn dispatch(&self, job: Job) -> Result<()> {
        match self.mode {
            DispatchMode::Inline => {
                job.run();
                Ok(())
            }
            DispatchMode::Threaded => {
                // Clone the sender so the lock is not held across send().
                let sender = self.sender.lock().clone();
                match sender {
                    Some(sender) => sender.send(job).map_err(|_| Error::SessionClosed),
                    None => Err(Error::SessionClosed),
                }
            }
        }
    }
}

/// Reply channel of a query issued on a [`LocalSession`].
struct LocalReplySink {
    key: KeyExpr,
    callback: Arc<ReplyCallback>,
    session: Weak<SessionInner>,
}

impl ReplySink for LocalReplySink {
    fn send(self: Box<Self>, reply: Reply) {
        match self.session.upgrade() {
            Some(inner) if !inner.is_closed() => {
                if let Err(e) = inner.dispatch(Job::Reply(self.callback, reply)) {
                    log::debug!("[local-session] reply on '{}' not delivered: {}", self.key, e);
                }
            }
            _ => log::debug!("[local-session] reply on '{}' dropped, session closed", self.key),
        }
    }

    fn finalize(self: Box<Self>) {
        log::trace!("[local-session] query on '{}' finalized", self.key);
    }
}

/// In-process [`Transport`].
pub struct LocalSession {
    inner: Arc<SessionInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
    config_uri: Option<String>,
}

impl LocalSession {
    /// Create a session; `Threaded` spawns the dispatcher thread.
    pub fn new(mode: DispatchMode) -> Result<Self> {
        Self::with_config(mode, None)
    }

    /// Create a session with a transport configuration file.
    ///
    /// The in-process session routes without any configuration; the URI is
    /// recorded and reported, never loaded.
    pub fn with_config(mode: DispatchMode, config_uri: Option<&str>) -> Result<Self> {
        if let Some(uri) = config_uri {
            log::warn!(
                "[local-session] session config '{}' ignored, the in-process session takes no configuration",
                uri
            );
        }
        let closed = Arc::new(AtomicBool::new(false));
        let (sender, worker) = match mode {
            DispatchMode::Inline => (None, None),
            DispatchMode::Threaded => {
                let (tx, rx) = channel::unbounded();
                let flag = Arc::clone(&closed);
                let handle = thread::Builder::new()
                    .name("rmw-local-dispatch".to_string())
                    .spawn(move || run_dispatcher(rx, flag))
                    .map_err(|e| Error::Transport(format!("dispatcher thread: {}", e)))?;
                (Some(tx), Some(handle))
            }
        };

        log::debug!("[local-session] opened ({:?} dispatch)", mode);

        Ok(Self {
            inner: Arc::new(SessionInner {
                mode,
                closed,
                next_id: AtomicU64::new(1),
                subscribers: RwLock::new(Vec::new()),
                queryables: RwLock::new(Vec::new()),
                sender: Mutex::new(sender),
            }),
            worker: Mutex::new(worker),
            config_uri: config_uri.map(str::to_string),
        })
    }

    /// Session invoking callbacks on the publishing thread.
    #[must_use]
    pub fn inline() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                mode: DispatchMode::Inline,
                closed: Arc::new(AtomicBool::new(false)),
                next_id: AtomicU64::new(1),
                subscribers: RwLock::new(Vec::new()),
                queryables: RwLock::new(Vec::new()),
                sender: Mutex::new(None),
            }),
            worker: Mutex::new(None),
            config_uri: None,
        }
    }

    #[must_use]
    pub fn mode(&self) -> DispatchMode {
        self.inner.mode
    }

    /// Configuration URI this session was opened with.
    #[must_use]
    pub fn config_uri(&self) -> Option<&str> {
        self.config_uri.as_deref()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    #[must_use]
    pub fn queryable_count(&self) -> usize {
        self.inner.queryables.read().len()
    }
}

fn run_dispatcher(rx: Receiver<Job>, closed: Arc<AtomicBool>) {
    log::trace!("[local-session] dispatcher started");
    for job in rx.iter() {
        if closed.load(Ordering::Acquire) {
            // Pending jobs are dropped; unanswered queries finalize here.
            continue;
        }
        job.run();
    }
    log::trace!("[local-session] dispatcher stopped");
}

impl Transport for LocalSession {
    fn declare_subscriber(
        &self,
        key: &KeyExpr,
        callback: SampleCallback,
    ) -> Result<DeclarationId> {
        self.inner.ensure_open()?;
        let id = self.inner.next_declaration();
        self.inner.subscribers.write().push(Declaration {
            id,
            key: key.clone(),
            callback: Arc::new(callback),
        });
        log::debug!("[local-session] subscriber {} on '{}'", id, key);
        Ok(id)
    }

    fn declare_queryable(&self, key: &KeyExpr, callback: QueryCallback) -> Result<DeclarationId> {
        self.inner.ensure_open()?;
        let id = self.inner.next_declaration();
        self.inner.queryables.write().push(Declaration {
            id,
            key: key.clone(),
            callback: Arc::new(callback),
        });
        log::debug!("[local-session] queryable {} on '{}'", id, key);
        Ok(id)
    }

    fn undeclare(&self, id: DeclarationId) -> Result<()> {
        {
            let mut subscribers = self.inner.subscribers.write();
            if let Some(pos) = subscribers.iter().position(|d| d.id == id) {
                subscribers.remove(pos);
                log::debug!("[local-session] undeclared subscriber {}", id);
                return Ok(());
            }
        }
        let mut queryables = self.inner.queryables.write();
        if let Some(pos) = queryables.iter().position(|d| d.id == id) {
            queryables.remove(pos);
            log::debug!("[local-session] undeclared queryable {}", id);
            return Ok(());
        }
        Err(Error::NotFound)
    }

    fn put(&self, key: &KeyExpr, payload: Payload, attachment: Attachment) -> Result<()> {
        self.inner.ensure_open()?;

        let targets: Vec<Arc<SampleCallback>> = self
            .inner
            .subscribers
            .read()
            .iter()
            .filter(|d| d.key.intersects(key))
            .map(|d| Arc::clone(&d.callback))
            .collect();

        if targets.is_empty() {
            log::trace!("[local-session] put on '{}' has no subscriber", key);
            return Ok(());
        }

        let timestamp = now_ns();
        for callback in targets {
            let sample = Sample::new(key.clone(), payload.clone(), timestamp, attachment);
            self.inner.dispatch(Job::Sample(callback, sample))?;
        }
        Ok(())
    }

    fn get(
        &self,
        key: &KeyExpr,
        payload: Payload,
        attachment: Attachment,
        callback: ReplyCallback,
    ) -> Result<()> {
        self.inner.ensure_open()?;

        let targets: Vec<Arc<QueryCallback>> = self
            .inner
            .queryables
            .read()
            .iter()
            .filter(|d| d.key.intersects(key))
            .map(|d| Arc::clone(&d.callback))
            .collect();

        if targets.is_empty() {
            log::debug!("[local-session] get on '{}' has no queryable", key);
            return Ok(());
        }

        let callback = Arc::new(callback);
        for target in targets {
            let sink = LocalReplySink {
                key: key.clone(),
                callback: Arc::clone(&callback),
                session: Arc::downgrade(&self.inner),
            };
            let query = Query::new(key.clone(), payload.clone(), attachment, Box::new(sink));
            self.inner.dispatch(Job::Query(target, query))?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        // Drop declarations outside the dispatch path; in-flight jobs hold
        // their own callback references.
        let subscribers = std::mem::take(&mut *self.inner.subscribers.write());
        let queryables = std::mem::take(&mut *self.inner.queryables.write());
        drop(subscribers);
        drop(queryables);

        // Disconnecting the channel ends the dispatcher loop.
        drop(self.inner.sender.lock().take());

        if let Some(handle) = self.worker.lock().take() {
            if handle.thread().id() == thread::current().id() {
                log::warn!("[local-session] closed from its dispatcher thread, not joining");
            } else if handle.join().is_err() {
                log::error!("[local-session] dispatcher thread panicked");
            }
        }

        log::debug!("[local-session] closed");
    }
}

impl Drop for LocalSession {
    fn drop(&mut self) {
        self.close();
    }
}
