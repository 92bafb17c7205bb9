// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::attachment::Attachment;
use crate::error::{Error, Result};
use crate::events::EntityEvents;
use crate::keyexpr::KeyExpr;
use crate::payload::{now_ns, Gid, Payload};
use crate::qos::QosProfile;
use crate::transport::Transport;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};

/// Publisher state. Holds no queue: publications go straight to the
/// transport with an attachment carrying gid, timestamp and a publication
/// number.
pub struct PublisherData {
    key: KeyExpr,
    gid: Gid,
    qos: QosProfile,
    publications: AtomicI64,
    events: Arc<EntityEvents>,
    session: Weak<dyn Transport>,
}

impl PublisherData {
    pub fn create(session: &Arc<dyn Transport>, key: KeyExpr, qos: QosProfile) -> Result<Arc<Self>> {
        if session.is_closed() {
            return Err(Error::SessionClosed);
        }
        let data = Arc::new(Self {
            gid: Gid::generate(&key),
            key,
            qos,
            publications: AtomicI64::new(0),
            events: Arc::new(EntityEvents::new()),
            session: Arc::downgrade(session),
        });
        log::debug!("[rmw] publisher {} on '{}'", data.gid, data.key);
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

    /// Publish serialized bytes. Returns the publication number (from 1).
    pub fn publish(&self, payload: Payload) -> Result<i64> {
        let session = self.session.upgrade().ok_or(Error::SessionClosed)?;
        let sequence_number = self.publications.fetch_add(1, Ordering::Relaxed) + 1;
        let attachment = Attachment::new(sequence_number, now_ns(), self.gid);
        session.put(&self.key, payload, attachment)?;
        Ok(sequence_number)
    }

    /// Publications issued so far.
    #[must_use]
    pub fn publication_count(&self) -> i64 {
        self.publications.load(Ordering::Relaxed)
    }
}
