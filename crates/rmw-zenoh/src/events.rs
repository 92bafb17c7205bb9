// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-entity event notification.
//!
//! [`EventCallbackRegistry`] decouples "an event happened" from "someone is
//! listening": while no callback is installed, arrivals accumulate in an
//! unread counter, and installing a callback flushes that backlog as a single
//! call carrying the count.
//!
//! [`EntityEvents`] adds the status queues used by QoS events and a wait
//! condition per event kind so event handles can sit in a wait set.

use crate::error::{Error, Result};
use crate::waitset::{ConditionSlot, WaitCondition, Waitable};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Callback invoked with the number of new events.
pub type EventCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// Number of event kinds known to the registry.
pub const EVENT_KIND_COUNT: usize = 3;

/// Maximum number of undelivered statuses kept per event kind.
pub const EVENT_QUEUE_DEPTH: usize = 10;

/// Event kinds an entity can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EventKind {
    /// New message, request or response queued.
    DataAvailable = 0,
    /// A matched publisher offers weaker QoS than this subscription requests.
    RequestedQosIncompatible = 1,
    /// A matched subscription requests stronger QoS than this publisher offers.
    OfferedQosIncompatible = 2,
}

impl EventKind {
    pub const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::DataAvailable,
        EventKind::RequestedQosIncompatible,
        EventKind::OfferedQosIncompatible,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Map a raw event id coming from the application.
    pub fn from_raw(raw: u32) -> Result<Self> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or_else(|| Error::Unsupported(format!("event kind {}", raw)))
    }
}

#[derive(Default)]
struct CallbackEntry {
    callback: Option<EventCallback>,
    unread_count: usize,
}

/// Event kind -> {callback, unread count}, guarded by one mutex.
///
/// Callbacks run after the mutex is released, so a callback may call back
/// into the registry.
#[derive(Default)]
pub struct EventCallbackRegistry {
    entries: Mutex<[CallbackEntry; EVENT_KIND_COUNT]>,
}

impl EventCallbackRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or clear the callback for `kind`.
    ///
    /// A pending backlog is delivered immediately as one call.
    pub fn set_callback(&self, kind: EventKind, callback: Option<EventCallback>) {
        let flush = {
            let mut entries = self.entries.lock();
            let entry = &mut entries[kind.index()];
            entry.callback = callback;
            match &entry.callback {
                Some(cb) if entry.unread_count > 0 => {
                    Some((Arc::clone(cb), std::mem::take(&mut entry.unread_count)))
                }
                _ => None,
            }
        };

        if let Some((callback, count)) = flush {
            invoke(kind, &callback, count);
        }
    }

    /// [`set_callback`](Self::set_callback) keyed by a raw event id.
    ///
    /// Unknown ids are a programming error: logged, rejected, nothing changes.
    pub fn set_callback_raw(&self, raw: u32, callback: Option<EventCallback>) -> Result<()> {
        match EventKind::from_raw(raw) {
            Ok(kind) => {
                self.set_callback(kind, callback);
                Ok(())
            }
            Err(err) => {
                log::error!(
                    "[rmw] event kind {} is out of range (max {}), ignoring callback",
                    raw,
                    EVENT_KIND_COUNT - 1
                );
                Err(err)
            }
        }
    }

    /// Report one event: call the callback with 1, or bump the unread count.
    pub fn record_event(&self, kind: EventKind) {
        let callback = {
            let mut entries = self.entries.lock();
            let entry = &mut entries[kind.index()];
            match &entry.callback {
                Some(cb) => Some(Arc::clone(cb)),
                None => {
                    entry.unread_count = entry.unread_count.saturating_add(1);
                    None
                }
            }
        };

        if let Some(callback) = callback {
            invoke(kind, &callback, 1);
        }
    }

    #[must_use]
    pub fn unread_count(&self, kind: EventKind) -> usize {
        self.entries.lock()[kind.index()].unread_count
    }

    #[must_use]
    pub fn has_callback(&self, kind: EventKind) -> bool {
        self.entries.lock()[kind.index()].callback.is_some()
    }
}

// Callbacks may run on a transport thread; a panic must not escape.
fn invoke(kind: EventKind, callback: &EventCallback, count: usize) {
    if panic::catch_unwind(AssertUnwindSafe(|| callback(count))).is_err() {
        log::error!("[rmw] {:?} callback panicked, event dropped", kind);
    }
}

/// Status reported by a QoS event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventStatus {
    /// Cumulative number of occurrences.
    pub total_count: usize,
    /// Occurrences represented by this status.
    pub total_count_change: usize,
    /// Occurrences currently in effect.
    pub current_count: usize,
    /// Free-form detail (e.g. the failing policy name).
    pub data: String,
}

#[derive(Default)]
struct StatusQueue {
    queue: VecDeque<EventStatus>,
    total: usize,
}

/// Callback registry + status queues + wait conditions of one entity.
#[derive(Default)]
pub struct EntityEvents {
    registry: EventCallbackRegistry,
    statuses: Mutex<[StatusQueue; EVENT_KIND_COUNT]>,
    conditions: [ConditionSlot; EVENT_KIND_COUNT],
}

impl EntityEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn registry(&self) -> &EventCallbackRegistry {
        &self.registry
    }

    pub fn set_callback(&self, kind: EventKind, callback: Option<EventCallback>) {
        self.registry.set_callback(kind, callback);
    }

    /// Signal newly queued data.
    pub fn data_available(&self) {
        self.registry.record_event(EventKind::DataAvailable);
    }

    /// Queue a status for `kind`, then notify the callback and the waiter.
    pub fn add_new_event(&self, kind: EventKind, data: impl Into<String>) {
        {
            let mut statuses = self.statuses.lock();
            let slot = &mut statuses[kind.index()];
            slot.total += 1;
            if slot.queue.len() >= EVENT_QUEUE_DEPTH {
                log::debug!(
                    "[rmw] {:?} status queue full ({}), dropping oldest",
                    kind,
                    EVENT_QUEUE_DEPTH
                );
                slot.queue.pop_front();
            }
            slot.queue.push_back(EventStatus {
                total_count: slot.total,
                total_count_change: 1,
                current_count: slot.total,
                data: data.into(),
            });
        }

        self.registry.record_event(kind);
        self.conditions[kind.index()].notify();
    }

    pub fn pop_next_event(&self, kind: EventKind) -> Option<EventStatus> {
        self.statuses.lock()[kind.index()].queue.pop_front()
    }

    #[must_use]
    pub fn event_queue_is_empty(&self, kind: EventKind) -> bool {
        self.statuses.lock()[kind.index()].queue.is_empty()
    }

    pub fn attach_event_condition(&self, kind: EventKind, condition: Arc<WaitCondition>) {
        self.conditions[kind.index()].attach(condition);
    }

    pub fn detach_event_condition(&self, kind: EventKind) {
        self.conditions[kind.index()].detach();
    }
}

/// Waitable, takeable view of one event kind of one entity.
#[derive(Clone)]
pub struct EventHandle {
    events: Arc<EntityEvents>,
    kind: EventKind,
}

impl EventHandle {
    pub(crate) fn new(events: Arc<EntityEvents>, kind: EventKind) -> Self {
        Self { events, kind }
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn set_callback(&self, callback: Option<EventCallback>) {
        self.events.set_callback(self.kind, callback);
    }

    /// Take the oldest pending status, if any.
    pub fn take(&self) -> Option<EventStatus> {
        self.events.pop_next_event(self.kind)
    }
}

impl Waitable for EventHandle {
    fn attach_condition(&self, condition: Arc<WaitCondition>) {
        self.events.attach_event_condition(self.kind, condition);
    }

    fn detach_condition(&self) {
        self.events.detach_event_condition(self.kind);
    }

    fn is_ready(&self) -> bool {
        !self.events.event_queue_is_empty(self.kind)
    }
}
