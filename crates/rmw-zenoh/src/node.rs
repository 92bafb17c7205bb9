// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed entities created by a [`Node`](crate::Node).
//!
//! Each wrapper pairs an entity state with the [`TypeSupport`] of its
//! messages. Dropping a wrapper undeclares the entity from the transport
//! and removes it from the context's endpoint registry.

use crate::context::{Context, Node};
use crate::entity::{ClientData, PublisherData, RequestId, ServiceData, SubscriptionData};
use crate::error::{Error, Result};
use crate::events::{EventCallback, EventHandle, EventKind, EventStatus};
use crate::keyexpr::KeyExpr;
use crate::payload::{Gid, Payload};
use crate::qos::QosProfile;
use crate::queue::QueuedMessage;
use crate::registry::LocalEndpointKind;
use crate::type_support::TypeSupport;
use crate::waitset::{WaitCondition, Waitable};
use std::sync::Arc;

/// Metadata of a taken message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageInfo {
    pub source_timestamp: i64,
    pub received_timestamp: i64,
    pub publisher_gid: Gid,
    /// Publication number assigned by the publisher, -1 if unknown.
    pub publication_sequence_number: i64,
}

impl From<&QueuedMessage> for MessageInfo {
    fn from(msg: &QueuedMessage) -> Self {
        Self {
            source_timestamp: msg.source_timestamp,
            received_timestamp: msg.received_timestamp,
            publisher_gid: msg.publisher_gid,
            publication_sequence_number: msg.sequence_number,
        }
    }
}

fn supported_event(kind: EventKind, allowed: EventKind, entity: &str) -> Result<()> {
    if kind == allowed {
        Ok(())
    } else {
        Err(Error::Unsupported(format!("{:?} event on a {}", kind, entity)))
    }
}

/// Typed publisher.
pub struct Publisher<T: TypeSupport> {
    data: Arc<PublisherData>,
    type_support: T,
    context: Context,
}

impl<T: TypeSupport> Publisher<T> {
    pub(crate) fn new(node: &Node, topic: &str, qos: QosProfile, type_support: T) -> Result<Self> {
        let key = node.entity_key(topic, type_support.type_name())?;
        let qos = node.adapt_qos(qos);
        let context = node.context().clone();
        let data = PublisherData::create(context.session(), key, qos)?;
        context.register_endpoint(
            data.gid(),
            data.key(),
            LocalEndpointKind::Publisher,
            qos,
            data.events(),
        );
        Ok(Self {
            data,
            type_support,
            context,
        })
    }

    /// Serialize and publish `message`. Returns its publication number.
    pub fn publish(&self, message: &T::Message) -> Result<i64> {
        let bytes = self.type_support.serialize(message)?;
        self.data.publish(Payload::from(bytes))
    }

    /// Publish already serialized bytes.
    pub fn publish_serialized(&self, bytes: &[u8]) -> Result<i64> {
        self.data.publish(Payload::from(bytes))
    }

    #[must_use]
    pub fn gid(&self) -> Gid {
        self.data.gid()
    }

    #[must_use]
    pub fn key(&self) -> &KeyExpr {
        self.data.key()
    }

    #[must_use]
    pub fn qos(&self) -> &QosProfile {
        self.data.qos()
    }

    pub fn event_handle(&self, kind: EventKind) -> Result<EventHandle> {
        supported_event(kind, EventKind::OfferedQosIncompatible, "publisher")?;
        Ok(EventHandle::new(Arc::clone(self.data.events()), kind))
    }

    /// Pop one pending status of `kind`.
    pub fn take_event(&self, kind: EventKind) -> Result<Option<EventStatus>> {
        supported_event(kind, EventKind::OfferedQosIncompatible, "publisher")?;
        Ok(self.data.events().pop_next_event(kind))
    }

    pub fn set_event_callback(&self, kind: EventKind, callback: Option<EventCallback>) -> Result<()> {
        supported_event(kind, EventKind::OfferedQosIncompatible, "publisher")?;
        self.data.events().set_callback(kind, callback);
        Ok(())
    }
}

impl<T: TypeSupport> Drop for Publisher<T> {
    fn drop(&mut self) {
        self.context.unregister_endpoint(self.data.gid());
    }
}

/// Typed subscription.
pub struct Subscription<T: TypeSupport> {
    data: Arc<SubscriptionData>,
    type_support: T,
    context: Context,
}

impl<T: TypeSupport> Subscription<T> {
    pub(crate) fn new(node: &Node, topic: &str, qos: QosProfile, type_support: T) -> Result<Self> {
        let key = node.entity_key(topic, type_support.type_name())?;
        let qos = node.adapt_qos(qos);
        let context = node.context().clone();
        let data = SubscriptionData::create(context.session(), key, qos)?;
        context.register_endpoint(
            data.gid(),
            data.key(),
            LocalEndpointKind::Subscription,
            qos,
            data.events(),
        );
        Ok(Self {
            data,
            type_support,
            context,
        })
    }

    /// Take the oldest queued message.
    ///
    /// A message that fails to deserialize is consumed and reported as
    /// [`Error::Serialization`].
    pub fn take(&self) -> Result<Option<(T::Message, MessageInfo)>> {
        let Some(msg) = self.data.pop_next_message() else {
            return Ok(None);
        };
        let info = MessageInfo::from(&msg);
        let message = self.type_support.deserialize(msg.payload.as_slice())?;
        Ok(Some((message, info)))
    }

    /// Take the oldest queued message without deserializing it.
    pub fn take_serialized(&self) -> Option<(Payload, MessageInfo)> {
        self.data.pop_next_message().map(|msg| {
            let info = MessageInfo::from(&msg);
            (msg.payload, info)
        })
    }

    #[must_use]
    pub fn gid(&self) -> Gid {
        self.data.gid()
    }

    #[must_use]
    pub fn key(&self) -> &KeyExpr {
        self.data.key()
    }

    #[must_use]
    pub fn qos(&self) -> &QosProfile {
        self.data.qos()
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        self.data.queue_has_data()
    }

    #[must_use]
    pub fn queued_messages(&self) -> usize {
        self.data.queued_messages()
    }

    /// Messages lost to queue overflow.
    #[must_use]
    pub fn dropped_messages(&self) -> u64 {
        self.data.dropped_messages()
    }

    pub fn set_on_new_message_callback(&self, callback: Option<EventCallback>) {
        self.data.set_on_new_message_callback(callback);
    }

    pub fn event_handle(&self, kind: EventKind) -> Result<EventHandle> {
        supported_event(kind, EventKind::RequestedQosIncompatible, "subscription")?;
        Ok(EventHandle::new(Arc::clone(self.data.events()), kind))
    }

    pub fn take_event(&self, kind: EventKind) -> Result<Option<EventStatus>> {
        supported_event(kind, EventKind::RequestedQosIncompatible, "subscription")?;
        Ok(self.data.events().pop_next_event(kind))
    }

    pub fn set_event_callback(&self, kind: EventKind, callback: Option<EventCallback>) -> Result<()> {
        supported_event(kind, EventKind::RequestedQosIncompatible, "subscription")?;
        self.data.events().set_callback(kind, callback);
        Ok(())
    }
}

impl<T: TypeSupport> Waitable for Subscription<T> {
    fn attach_condition(&self, condition: Arc<WaitCondition>) {
        self.data.attach_condition(condition);
    }

    fn detach_condition(&self) {
        self.data.detach_condition();
    }

    fn is_ready(&self) -> bool {
        self.data.is_ready()
    }
}

impl<T: TypeSupport> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Err(e) = self.data.shutdown() {
            log::warn!("[rmw-sub] undeclare of '{}' failed: {}", self.data.key(), e);
        }
        self.context.unregister_endpoint(self.data.gid());
    }
}

/// Typed service. Keyed by the request type name.
pub struct Service<Req: TypeSupport, Res: TypeSupport> {
    data: Arc<ServiceData>,
    request: Req,
    response: Res,
}

impl<Req: TypeSupport, Res: TypeSupport> Service<Req, Res> {
    pub(crate) fn new(
        node: &Node,
        name: &str,
        qos: QosProfile,
        request: Req,
        response: Res,
    ) -> Result<Self> {
        let key = node.entity_key(name, request.type_name())?;
        let qos = node.adapt_qos(qos);
        let data = ServiceData::create(node.context().session(), key, qos)?;
        Ok(Self {
            data,
            request,
            response,
        })
    }

    /// Take the next request. It stays pending until answered with
    /// [`send_response`](Self::send_response).
    pub fn take_request(&self) -> Result<Option<(Req::Message, RequestId)>> {
        let Some((payload, request_id)) = self.data.take_request()? else {
            return Ok(None);
        };
        match self.request.deserialize(payload.as_slice()) {
            Ok(request) => Ok(Some((request, request_id))),
            Err(e) => {
                // Unanswerable: release the parked query.
                let parked = self
                    .data
                    .take_from_query_map(request_id.writer_gid, request_id.sequence_number);
                drop(parked);
                Err(e)
            }
        }
    }

    /// Answer a taken request. [`Error::NotFound`] if it is unknown or
    /// already answered.
    pub fn send_response(&self, request_id: &RequestId, response: &Res::Message) -> Result<()> {
        let bytes = self.response.serialize(response)?;
        self.data.send_response(request_id, Payload::from(bytes))
    }

    #[must_use]
    pub fn gid(&self) -> Gid {
        self.data.gid()
    }

    #[must_use]
    pub fn key(&self) -> &KeyExpr {
        self.data.key()
    }

    #[must_use]
    pub fn qos(&self) -> &QosProfile {
        self.data.qos()
    }

    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.data.pending_requests()
    }

    pub fn set_on_new_request_callback(&self, callback: Option<EventCallback>) {
        self.data.set_on_new_request_callback(callback);
    }
}

impl<Req: TypeSupport, Res: TypeSupport> Waitable for Service<Req, Res> {
    fn attach_condition(&self, condition: Arc<WaitCondition>) {
        self.data.attach_condition(condition);
    }

    fn detach_condition(&self) {
        self.data.detach_condition();
    }

    fn is_ready(&self) -> bool {
        self.data.is_ready()
    }
}

impl<Req: TypeSupport, Res: TypeSupport> Drop for Service<Req, Res> {
    fn drop(&mut self) {
        if let Err(e) = self.data.shutdown() {
            log::warn!("[rmw] undeclare of service '{}' failed: {}", self.data.key(), e);
        }
    }
}

/// Typed client.
pub struct Client<Req: TypeSupport, Res: TypeSupport> {
    data: Arc<ClientData>,
    request: Req,
    response: Res,
}

impl<Req: TypeSupport, Res: TypeSupport> Client<Req, Res> {
    pub(crate) fn new(
        node: &Node,
        name: &str,
        qos: QosProfile,
        request: Req,
        response: Res,
    ) -> Result<Self> {
        let key = node.entity_key(name, request.type_name())?;
        let qos = node.adapt_qos(qos);
        let data = ClientData::create(node.context().session(), key, qos)?;
        Ok(Self {
            data,
            request,
            response,
        })
    }

    /// Send a request and return its sequence number.
    pub fn send_request(&self, request: &Req::Message) -> Result<i64> {
        let bytes = self.request.serialize(request)?;
        self.data.send_request(Payload::from(bytes))
    }

    /// Take the oldest reply, with the id of the request it answers.
    pub fn take_response(&self) -> Result<Option<(Res::Message, RequestId)>> {
        let Some(reply) = self.data.pop_next_reply() else {
            return Ok(None);
        };
        let attachment = reply.sample.attachment;
        let request_id = RequestId {
            sequence_number: attachment.sequence_number.unwrap_or(-1),
            writer_gid: attachment.source_gid.unwrap_or_else(|| self.data.gid()),
            source_timestamp: attachment.source_timestamp.unwrap_or(reply.sample.timestamp),
            received_timestamp: reply.received_timestamp,
        };
        let response = self.response.deserialize(reply.sample.payload.as_slice())?;
        Ok(Some((response, request_id)))
    }

    #[must_use]
    pub fn gid(&self) -> Gid {
        self.data.gid()
    }

    #[must_use]
    pub fn key(&self) -> &KeyExpr {
        self.data.key()
    }

    #[must_use]
    pub fn qos(&self) -> &QosProfile {
        self.data.qos()
    }

    pub fn set_on_new_response_callback(&self, callback: Option<EventCallback>) {
        self.data.set_on_new_response_callback(callback);
    }
}

impl<Req: TypeSupport, Res: TypeSupport> Waitable for Client<Req, Res> {
    fn attach_condition(&self, condition: Arc<WaitCondition>) {
        self.data.attach_condition(condition);
    }

    fn detach_condition(&self) {
        self.data.detach_condition();
    }

    fn is_ready(&self) -> bool {
        self.data.is_ready()
    }
}
