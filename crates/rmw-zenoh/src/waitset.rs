// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wait-set bridge between entity queues and a blocking poller.
//!
//! Every entity owns a [`ConditionSlot`] holding at most one attached
//! [`WaitCondition`]. Producers call [`ConditionSlot::notify`] after pushing
//! data; a [`WaitSet`] attaches its condition to each entity it waits on,
//! blocks, then detaches everything before returning. A notification only
//! means "may have new data": the waiter always re-checks the queues itself.

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Condition variable plus a pending flag so a notify issued before the
/// waiter blocks is not lost.
#[derive(Debug, Default)]
pub struct WaitCondition {
    pending: Mutex<bool>,
    condvar: Condvar,
}

impl WaitCondition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake the waiter (if any) and leave the pending flag set.
    pub fn notify(&self) {
        let mut pending = self.pending.lock();
        *pending = true;
        self.condvar.notify_all();
    }

    /// Block until notified or until `timeout` elapses. Consumes the pending
    /// flag and returns whether a notification was observed.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = deadline_after(timeout);
        let mut pending = self.pending.lock();

        while !*pending {
            match deadline {
                None => self.condvar.wait(&mut pending),
                Some(deadline) => {
                    if self.condvar.wait_until(&mut pending, deadline).timed_out() {
                        break;
                    }
                }
            }
        }

        std::mem::replace(&mut *pending, false)
    }

    /// Drop any stale notification.
    pub fn reset(&self) {
        *self.pending.lock() = false;
    }
}

/// Absolute deadline for `timeout`; a timeout past the representable range
/// waits without a deadline.
fn deadline_after(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|t| Instant::now().checked_add(t))
}

/// Per-entity storage for the single attached waiter.
#[derive(Debug, Default)]
pub struct ConditionSlot {
    condition: Mutex<Option<Arc<WaitCondition>>>,
}

impl ConditionSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `condition`, replacing any previous one.
    pub fn attach(&self, condition: Arc<WaitCondition>) {
        *self.condition.lock() = Some(condition);
    }

    pub fn detach(&self) {
        *self.condition.lock() = None;
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.condition.lock().is_some()
    }

    /// Notify the attached condition; no-op when nothing is attached.
    pub fn notify(&self) {
        // Release the slot lock before touching the condition's own mutex.
        let condition = self.condition.lock().clone();
        if let Some(condition) = condition {
            condition.notify();
        }
    }
}

/// Anything a [`WaitSet`] can block on.
pub trait Waitable: Send + Sync {
    fn attach_condition(&self, condition: Arc<WaitCondition>);

    fn detach_condition(&self);

    /// Non-destructive readiness snapshot.
    fn is_ready(&self) -> bool;

    /// Readiness as reported by a completed wait. Edge-triggered waitables
    /// (guard conditions) reset themselves here.
    fn consume_ready(&self) -> bool {
        self.is_ready()
    }
}

/// Manually triggered condition (shutdown, graph changes, user wake-ups).
#[derive(Debug, Default)]
pub struct GuardCondition {
    triggered: AtomicBool,
    slot: ConditionSlot,
}

impl GuardCondition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::Release);
        self.slot.notify();
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }
}

impl Waitable for GuardCondition {
    fn attach_condition(&self, condition: Arc<WaitCondition>) {
        self.slot.attach(condition);
    }

    fn detach_condition(&self) {
        self.slot.detach();
    }

    fn is_ready(&self) -> bool {
        self.is_triggered()
    }

    fn consume_ready(&self) -> bool {
        self.triggered.swap(false, Ordering::AcqRel)
    }
}

/// Blocking poller over a set of waitables.
#[derive(Debug, Default)]
pub struct WaitSet {
    condition: Arc<WaitCondition>,
}

/// Detaches the wait condition from every entity when dropped.
struct AttachGuard<'a> {
    entities: &'a [&'a dyn Waitable],
}

impl Drop for AttachGuard<'_> {
    fn drop(&mut self) {
        for entity in self.entities {
            entity.detach_condition();
        }
    }
}

impl WaitSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until at least one entity is ready.
    ///
    /// Returns the indexes (into `entities`) of the ready ones, in order.
    /// `timeout = None` blocks indefinitely; `Some(Duration::ZERO)` polls.
    /// Returns [`Error::Timeout`] when nothing became ready in time.
    pub fn wait(
        &self,
        entities: &[&dyn Waitable],
        timeout: Option<Duration>,
    ) -> Result<Vec<usize>> {
        if entities.is_empty() {
            return Err(Error::invalid_argument("wait set has no entities"));
        }

        let deadline = deadline_after(timeout);

        self.condition.reset();
        for entity in entities {
            entity.attach_condition(Arc::clone(&self.condition));
        }
        let _guard = AttachGuard { entities };

        loop {
            let ready: Vec<usize> = entities
                .iter()
                .enumerate()
                .filter(|(_, e)| e.consume_ready())
                .map(|(i, _)| i)
                .collect();
            if !ready.is_empty() {
                return Ok(ready);
            }

            let remaining = match deadline {
                None => None,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(Error::Timeout);
                    }
                    Some(deadline - now)
                }
            };

            self.condition.wait(remaining);
        }
    }
}

#[cfg(test)]
mod tests;
