// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::attachment::Attachment;
use crate::error::{Error, Result};
use crate::events::{EntityEvents, EventCallback, EventKind};
use crate::keyexpr::KeyExpr;
use crate::payload::{now_ns, Gid, Payload};
use crate::qos::QosProfile;
use crate::queue::{QueuedReply, ReplyQueue, SequenceGenerator};
use crate::transport::Transport;
use crate::waitset::{ConditionSlot, WaitCondition, Waitable};
use crate::wire;
use std::sync::{Arc, Weak};

/// Client state: request numbering plus the queue of successful replies.
///
/// Replies are not correlated here; the caller matches the sequence number
/// in each reply against the requests it sent.
pub struct ClientData {
    key: KeyExpr,
    gid: Gid,
    qos: QosProfile,
    sequence: SequenceGenerator,
    reply_queue: ReplyQueue,
    events: Arc<EntityEvents>,
    condition: ConditionSlot,
    session: Weak<dyn Transport>,
}

impl ClientData {
    pub fn create(session: &Arc<dyn Transport>, key: KeyExpr, qos: QosProfile) -> Result<Arc<Self>> {
        if session.is_closed() {
            return Err(Error::SessionClosed);
        }
        let data = Arc::new(Self {
            gid: Gid::generate(&key),
            key,
            qos,
            sequence: SequenceGenerator::new(),
            reply_queue: ReplyQueue::unbounded(),
            events: Arc::new(EntityEvents::new()),
            condition: ConditionSlot::new(),
            session: Arc::downgrade(session),
        });
        log::debug!("[rmw] client {} on '{}'", data.gid, data.key);
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

    /// Fresh request number, unique for this client's lifetime.
    pub fn get_next_sequence_number(&self) -> i64 {
        self.sequence.next_sequence_number()
    }

    /// Send a request; replies land in the reply queue.
    pub fn send_request(self: &Arc<Self>, payload: Payload) -> Result<i64> {
        let session = self.session.upgrade().ok_or(Error::SessionClosed)?;
        let sequence_number = self.get_next_sequence_number();
        let attachment = Attachment::new(sequence_number, now_ns(), self.gid);

        let target = Arc::downgrade(self);
        session.get(
            &self.key,
            payload,
            attachment,
            Box::new(move |reply| wire::on_reply(&target, reply)),
        )?;
        Ok(sequence_number)
    }

    pub fn add_new_reply(&self, reply: QueuedReply) {
        self.reply_queue.push(reply);
        self.events.data_available();
        self.condition.notify();
    }

    pub fn pop_next_reply(&self) -> Option<QueuedReply> {
        self.reply_queue.pop_front()
    }

    #[must_use]
    pub fn reply_queue_is_empty(&self) -> bool {
        self.reply_queue.is_empty()
    }

    pub fn set_on_new_response_callback(&self, callback: Option<EventCallback>) {
        self.events.set_callback(EventKind::DataAvailable, callback);
    }
}

impl Waitable for ClientData {
    fn attach_condition(&self, condition: Arc<WaitCondition>) {
        self.condition.attach(condition);
    }

    fn detach_condition(&self) {
        self.condition.detach();
    }

    fn is_ready(&self) -> bool {
        !self.reply_queue_is_empty()
    }
}
