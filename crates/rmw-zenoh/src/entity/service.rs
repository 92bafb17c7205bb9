// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::Declaration;
use crate::attachment::Attachment;
use crate::error::{Error, Result};
use crate::events::{EntityEvents, EventCallback, EventKind};
use crate::keyexpr::KeyExpr;
use crate::payload::{now_ns, Gid, Payload};
use crate::qos::QosProfile;
use crate::queue::{QueryQueue, QueuedQuery, SequenceMap};
use crate::transport::{Sample, Transport};
use crate::waitset::{ConditionSlot, WaitCondition, Waitable};
use crate::wire;
use std::sync::Arc;

/// Identity of one request: the client's sequence number and gid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId {
    pub sequence_number: i64,
    pub writer_gid: Gid,
    /// Client-side send time (ns since epoch).
    pub source_timestamp: i64,
    /// Local receipt time (ns since epoch).
    pub received_timestamp: i64,
}

/// Service state.
///
/// Incoming queries wait in the query queue until taken; a taken query is
/// parked in the sequence map until its response is sent.
pub struct ServiceData {
    // First field: undeclared before the queues are dropped.
    declaration: Declaration,
    key: KeyExpr,
    gid: Gid,
    qos: QosProfile,
    query_queue: QueryQueue,
    sequence_map: SequenceMap<QueuedQuery>,
    events: Arc<EntityEvents>,
    condition: ConditionSlot,
}

impl ServiceData {
    pub fn create(session: &Arc<dyn Transport>, key: KeyExpr, qos: QosProfile) -> Result<Arc<Self>> {
        let data = Arc::new(Self {
            declaration: Declaration::new(Arc::downgrade(session)),
            gid: Gid::generate(&key),
            key,
            qos,
            query_queue: QueryQueue::unbounded(),
            sequence_map: SequenceMap::new(),
            events: Arc::new(EntityEvents::new()),
            condition: ConditionSlot::new(),
        });

        let target = Arc::downgrade(&data);
        let id = session.declare_queryable(
            &data.key,
            Box::new(move |query| wire::on_query(&target, query)),
        )?;
        data.declaration.set(id);

        log::debug!("[rmw] service {} on '{}'", data.gid, data.key);
        Ok(data)
    }

    #[must_use]
    pub fn key(&self) -> &KeyExpr {
        &self.key
    }

    #[must_use]
    pub fn gid(&self) -> Gid {
        self.gid
    }

    #[must_use]
    pub fn qos(&self) -> &QosProfile {
        &self.qos
    }

    #[must_use]
    pub fn events(&self) -> &Arc<EntityEvents> {
        &self.events
    }

    /// Queue an incoming query and signal it.
    pub fn add_new_query(&self, query: QueuedQuery) {
        self.query_queue.push(query);
        self.events.data_available();
        self.condition.notify();
    }

    pub fn pop_next_query(&self) -> Option<QueuedQuery> {
        self.query_queue.pop_front()
    }

    #[must_use]
    pub fn query_queue_is_empty(&self) -> bool {
        self.query_queue.is_empty()
    }

    /// Park a taken query until it is answered, keyed by its client's gid
    /// and `sequence_number`.
    pub fn add_to_query_map(&self, sequence_number: i64, query: QueuedQuery) -> Result<()> {
        self.sequence_map.insert(query.writer_gid(), sequence_number, query)
    }

    pub fn take_from_query_map(
        &self,
        writer_gid: Gid,
        sequence_number: i64,
    ) -> Option<QueuedQuery> {
        self.sequence_map.take(writer_gid, sequence_number)
    }

    /// Requests taken but not yet answered.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.sequence_map.len()
    }

    /// Take the next request and park it for [`send_response`](Self::send_response).
    ///
    /// Queries without a sequence number cannot be answered and are dropped.
    pub fn take_request(&self) -> Result<Option<(Payload, RequestId)>> {
        while let Some(queued) = self.pop_next_query() {
            let attachment = *queued.query.attachment();
            let Some(sequence_number) = attachment.sequence_number else {
                log::warn!(
                    "[rmw] query on '{}' carries no sequence number, dropping",
                    self.key
                );
                continue;
            };

            let request = RequestId {
                sequence_number,
                writer_gid: attachment.source_gid.unwrap_or_default(),
                source_timestamp: attachment.source_timestamp.unwrap_or_default(),
                received_timestamp: queued.received_timestamp,
            };
            let payload = queued.query.payload().clone();

            if let Err(e) = self.add_to_query_map(sequence_number, queued) {
                log::error!("[rmw] service '{}': {}", self.key, e);
                return Err(e);
            }
            return Ok(Some((payload, request)));
        }
        Ok(None)
    }

    /// Answer the parked query for `request`.
    ///
    /// Returns [`Error::NotFound`] when no such request is pending.
    pub fn send_response(&self, request: &RequestId, payload: Payload) -> Result<()> {
        let queued = self
            .take_from_query_map(request.writer_gid, request.sequence_number)
            .ok_or(Error::NotFound)?;

        let attachment = Attachment::new(request.sequence_number, now_ns(), request.writer_gid);
        let key = queued.query.key().clone();
        queued
            .query
            .reply(Sample::new(key, payload, now_ns(), attachment));
        Ok(())
    }

    pub fn set_on_new_request_callback(&self, callback: Option<EventCallback>) {
        self.events.set_callback(EventKind::DataAvailable, callback);
    }

    /// Undeclare and drop queued queries; their clients see no reply.
    pub fn shutdown(&self) -> Result<()> {
        self.declaration.release()?;
        self.query_queue.clear();
        Ok(())
    }
}

impl Waitable for ServiceData {
    fn attach_condition(&self, condition: Arc<WaitCondition>) {
        self.condition.attach(condition);
    }

    fn detach_condition(&self) {
        self.condition.detach();
    }

    fn is_ready(&self) -> bool {
        !self.query_queue_is_empty()
    }
}
