// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-entity state objects.
//!
//! Each state owns its queues, its event registry and its wait-set slot. The
//! transport session is held weakly: an entity never keeps its session alive,
//! and wire callbacks hold the entity weakly in turn, so a callback racing
//! with teardown finds nothing to deliver to.

mod client;
mod publisher;
mod service;
mod subscription;

pub use client::ClientData;
pub use publisher::PublisherData;
pub use service::{RequestId, ServiceData};
pub use subscription::SubscriptionData;

use crate::error::Result;
use crate::transport::{DeclarationId, Transport};
use parking_lot::Mutex;
use std::sync::Weak;

/// Transport declaration owned by an entity, released on drop.
pub(crate) struct Declaration {
    session: Weak<dyn Transport>,
    id: Mutex<Option<DeclarationId>>,
}

impl Declaration {
    pub(crate) fn new(session: Weak<dyn Transport>) -> Self {
        Self {
            session,
            id: Mutex::new(None),
        }
    }

    pub(crate) fn set(&self, id: DeclarationId) {
        *self.id.lock() = Some(id);
    }

    /// Undeclare from the transport. Idempotent; a vanished or closed
    /// session has nothing left to undeclare.
    pub(crate) fn release(&self) -> Result<()> {
        let Some(id) = self.id.lock().take() else {
            return Ok(());
        };
        match self.session.upgrade() {
            Some(session) if !session.is_closed() => session.undeclare(id),
            _ => Ok(()),
        }
    }
}

impl Drop for Declaration {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("[rmw] failed to undeclare on drop: {}", e);
        }
    }
}
