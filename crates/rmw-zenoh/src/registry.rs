// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Local endpoint registry for QoS matching.
//!
//! Tracks the publishers and subscriptions created through one context.
//! Registering an endpoint matches it against the opposite kind on an
//! intersecting key and reports every incompatible pair.
//!
//! # Example Flow
//!
//! ```text
//! 1. Subscription (reliable) registered on "0/scan/Msg"
//! 2. Publisher (best effort) registered on "0/scan/Msg"
//! 3. register() returns one QosMismatch { policy: "RELIABILITY" }
//! 4. Caller raises OfferedQosIncompatible on the publisher and
//!    RequestedQosIncompatible on the subscription
//! ```

use crate::events::{EntityEvents, EventKind};
use crate::keyexpr::KeyExpr;
use crate::payload::Gid;
use crate::qos::{incompatible_policy, QosProfile};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

/// Kind of local endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalEndpointKind {
    Publisher,
    Subscription,
}

/// Local endpoint metadata
#[derive(Clone)]
pub struct LocalEndpointInfo {
    pub gid: Gid,
    pub key: KeyExpr,
    pub kind: LocalEndpointKind,
    pub qos: QosProfile,
    /// Event sink of the endpoint; dead once the endpoint is dropped.
    pub events: Weak<EntityEvents>,
}

impl std::fmt::Debug for LocalEndpointInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEndpointInfo")
            .field("gid", &self.gid)
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("qos", &self.qos)
            .finish_non_exhaustive()
    }
}

/// Incompatible publisher/subscription pair.
pub struct QosMismatch {
    pub policy: &'static str,
    pub publisher: Weak<EntityEvents>,
    pub subscription: Weak<EntityEvents>,
}

impl QosMismatch {
    /// Record the mismatch on both endpoints that are still alive.
    pub fn raise(&self) {
        if let Some(events) = self.publisher.upgrade() {
            events.add_new_event(EventKind::OfferedQosIncompatible, self.policy);
        }
        if let Some(events) = self.subscription.upgrade() {
            events.add_new_event(EventKind::RequestedQosIncompatible, self.policy);
        }
    }
}

/// Thread-safe registry of local endpoints.
#[derive(Default)]
pub struct LocalEndpointRegistry {
    endpoints: RwLock<Vec<LocalEndpointInfo>>,
}

impl LocalEndpointRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `info` and return its QoS mismatches with existing endpoints.
    ///
    /// Mismatches are returned, not raised: the caller raises them after the
    /// registry lock is gone.
    pub fn register(&self, info: LocalEndpointInfo) -> Vec<QosMismatch> {
        let mut endpoints = self.endpoints.write();
        endpoints.retain(|e| e.events.strong_count() > 0);

        let mismatches = endpoints
            .iter()
            .filter(|other| other.kind != info.kind && other.key.intersects(&info.key))
            .filter_map(|other| {
                let (publisher, subscription) = match info.kind {
                    LocalEndpointKind::Publisher => (&info, other),
                    LocalEndpointKind::Subscription => (other, &info),
                };
                incompatible_policy(&publisher.qos, &subscription.qos).map(|policy| {
                    log::warn!(
                        "[rmw] incompatible {} QoS between publisher {} and subscription {} on '{}'",
                        policy,
                        publisher.gid,
                        subscription.gid,
                        info.key
                    );
                    QosMismatch {
                        policy,
                        publisher: publisher.events.clone(),
                        subscription: subscription.events.clone(),
                    }
                })
            })
            .collect();

        endpoints.push(info);
        mismatches
    }

    /// Remove the endpoint with `gid`. Returns whether it was registered.
    pub fn unregister(&self, gid: Gid) -> bool {
        let mut endpoints = self.endpoints.write();
        let before = endpoints.len();
        endpoints.retain(|e| e.gid != gid);
        endpoints.len() != before
    }

    /// Endpoints on keys intersecting `key`.
    pub fn find_by_key(&self, key: &KeyExpr) -> Vec<LocalEndpointInfo> {
        self.endpoints
            .read()
            .iter()
            .filter(|e| e.key.intersects(key))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.read().is_empty()
    }
}

/// Build the registry entry of an endpoint whose events are held by `events`.
pub fn endpoint(
    gid: Gid,
    key: &KeyExpr,
    kind: LocalEndpointKind,
    qos: QosProfile,
    events: &Arc<EntityEvents>,
) -> LocalEndpointInfo {
    LocalEndpointInfo {
        gid,
        key: key.clone(),
        kind,
        qos,
        events: Arc::downgrade(events),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> KeyExpr {
        KeyExpr::new("0/scan/sensor_msgs::msg::LaserScan").unwrap()
    }

    #[test]
    fn compatible_pair_reports_nothing() {
        let registry = LocalEndpointRegistry::new();
        let pub_events = Arc::new(EntityEvents::new());
        let sub_events = Arc::new(EntityEvents::new());

        registry.register(endpoint(
            Gid::new([1; 16]),
            &key(),
            LocalEndpointKind::Publisher,
            QosProfile::default(),
            &pub_events,
        ));
        let mismatches = registry.register(endpoint(
            Gid::new([2; 16]),
            &key(),
            LocalEndpointKind::Subscription,
            QosProfile::sensor_data(),
            &sub_events,
        ));
        assert!(mismatches.is_empty());
        assert_eq!(registry.find_by_key(&key()).len(), 2);
    }

    #[test]
    fn mismatch_raises_on_both_sides() {
        let registry = LocalEndpointRegistry::new();
        let pub_events = Arc::new(EntityEvents::new());
        let sub_events = Arc::new(EntityEvents::new());

        registry.register(endpoint(
            Gid::new([2; 16]),
            &key(),
            LocalEndpointKind::Subscription,
            QosProfile::default().reliable(),
            &sub_events,
        ));
        let mismatches = registry.register(endpoint(
            Gid::new([1; 16]),
            &key(),
            LocalEndpointKind::Publisher,
            QosProfile::default().best_effort(),
            &pub_events,
        ));
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].policy, "RELIABILITY");

        mismatches[0].raise();
        let offered = pub_events
            .pop_next_event(EventKind::OfferedQosIncompatible)
            .unwrap();
        assert_eq!(offered.data, "RELIABILITY");
        assert!(!sub_events.event_queue_is_empty(EventKind::RequestedQosIncompatible));
    }

    #[test]
    fn dropped_endpoints_are_pruned() {
        let registry = LocalEndpointRegistry::new();
        let events = Arc::new(EntityEvents::new());
        registry.register(endpoint(
            Gid::new([3; 16]),
            &key(),
            LocalEndpointKind::Publisher,
            QosProfile::default(),
            &events,
        ));
        drop(events);

        let other = Arc::new(EntityEvents::new());
        registry.register(endpoint(
            Gid::new([4; 16]),
            &key(),
            LocalEndpointKind::Subscription,
            QosProfile::default(),
            &other,
        ));
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister(Gid::new([4; 16])));
        assert!(registry.is_empty());
    }
}
