// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::Declaration;
use crate::error::Result;
use crate::events::{EntityEvents, EventCallback, EventKind};
use crate::keyexpr::KeyExpr;
use crate::payload::Gid;
use crate::qos::QosProfile;
use crate::queue::{MessageQueue, QueuedMessage};
use crate::transport::Transport;
use crate::waitset::{ConditionSlot, WaitCondition, Waitable};
use crate::wire;
use std::sync::Arc;

/// Subscription state: message queue bounded by the QoS depth.
pub struct SubscriptionData {
    // First field: undeclared before the queue is dropped.
    declaration: Declaration,
    key: KeyExpr,
    gid: Gid,
    qos: QosProfile,
    queue: MessageQueue,
    events: Arc<EntityEvents>,
    condition: ConditionSlot,
}

impl SubscriptionData {
    /// Create the state and declare it on `session`.
    ///
    /// `qos` must already be adapted.
    pub fn create(session: &Arc<dyn Transport>, key: KeyExpr, qos: QosProfile) -> Result<Arc<Self>> {
        let data = Arc::new(Self {
            declaration: Declaration::new(Arc::downgrade(session)),
            gid: Gid::generate(&key),
            queue: MessageQueue::new(qos.queue_depth()),
            key,
            qos,
            events: Arc::new(EntityEvents::new()),
            condition: ConditionSlot::new(),
        });

        let target = Arc::downgrade(&data);
        let id = session.declare_subscriber(
            &data.key,
            Box::new(move |sample| wire::on_message(&target, sample)),
        )?;
        data.declaration.set(id);

        log::debug!(
            "[rmw-sub] subscription {} on '{}' (depth {})",
            data.gid,
            data.key,
            data.queue.depth()
        );
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

    /// Queue a received message, dropping the oldest one when full, then
    /// signal the data-available callback and any attached waiter.
    pub fn add_new_message(&self, msg: QueuedMessage) {
        if self.queue.push(msg).is_some() {
            log::warn!(
                "[rmw-sub] message queue for '{}' reached depth {}, dropping oldest message",
                self.key,
                self.queue.depth()
            );
        }
        self.events.data_available();
        self.condition.notify();
    }

    pub fn pop_next_message(&self) -> Option<QueuedMessage> {
        self.queue.pop_front()
    }

    #[must_use]
    pub fn queue_has_data(&self) -> bool {
        !self.queue.is_empty()
    }

    #[must_use]
    pub fn queued_messages(&self) -> usize {
        self.queue.len()
    }

    /// Messages lost to overflow since creation.
    #[must_use]
    pub fn dropped_messages(&self) -> u64 {
        self.queue.total_evicted()
    }

    pub fn set_on_new_message_callback(&self, callback: Option<EventCallback>) {
        self.events.set_callback(EventKind::DataAvailable, callback);
    }

    /// Undeclare from the transport and discard whatever is still queued.
    pub fn shutdown(&self) -> Result<()> {
        self.declaration.release()?;
        self.queue.clear();
        Ok(())
    }
}

impl Waitable for SubscriptionData {
    fn attach_condition(&self, condition: Arc<WaitCondition>) {
        self.condition.attach(condition);
    }

    fn detach_condition(&self) {
        self.condition.detach();
    }

    fn is_ready(&self) -> bool {
        self.queue_has_data()
    }
}
