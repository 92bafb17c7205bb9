// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport -> entity entry points.
//!
//! These run on transport threads. They never block on the application and
//! never let a failure escape: an unknown destination, an error reply or a
//! panic below them is logged and the event dropped.

use crate::entity::{ClientData, ServiceData, SubscriptionData};
use crate::payload::now_ns;
use crate::queue::{QueuedMessage, QueuedQuery, QueuedReply};
use crate::transport::{Query, Reply, Sample};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Weak;

/// Sample arrived for a subscription.
pub(crate) fn on_message(target: &Weak<SubscriptionData>, sample: Sample) {
    guarded("message", || {
        let Some(subscription) = target.upgrade() else {
            log::warn!(
                "[rmw-wire] no subscription registered for '{}', dropping sample",
                sample.key
            );
            return;
        };
        let msg = QueuedMessage::from_sample(sample, now_ns());
        subscription.add_new_message(msg);
    });
}

/// Query arrived for a service.
pub(crate) fn on_query(target: &Weak<ServiceData>, query: Query) {
    guarded("query", || {
        let Some(service) = target.upgrade() else {
            // Dropping the query finalizes it; the client sees no reply.
            log::warn!(
                "[rmw-wire] no service registered for '{}', dropping query",
                query.key()
            );
            return;
        };
        service.add_new_query(QueuedQuery::new(query, now_ns()));
    });
}

/// Reply arrived for a client. Error replies are never queued.
pub(crate) fn on_reply(target: &Weak<ClientData>, reply: Reply) {
    guarded("reply", || {
        let sample = match reply {
            Ok(sample) => sample,
            Err(err) => {
                log::error!("[rmw-wire] transport reported an error reply: {}", err);
                return;
            }
        };
        let Some(client) = target.upgrade() else {
            log::warn!(
                "[rmw-wire] no client registered for '{}', dropping reply",
                sample.key
            );
            return;
        };
        client.add_new_reply(QueuedReply {
            sample,
            received_timestamp: now_ns(),
        });
    });
}

fn guarded(kind: &str, handler: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(handler)).is_err() {
        log::error!("[rmw-wire] {} handler panicked, event dropped", kind);
    }
}
