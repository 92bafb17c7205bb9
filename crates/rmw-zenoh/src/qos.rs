// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS profiles consumed by entity creation.
//!
//! Only the policies that change data-plane behavior are modeled: history
//! (queue depth), reliability and durability. `SystemDefault` values are
//! resolved by [`QosProfile::adapt`] when the entity is created, and the
//! adapted profile is the one stored on the entity.

/// Reliability policy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reliability {
    /// Resolved to `Reliable`.
    #[default]
    SystemDefault,
    Reliable,
    BestEffort,
}

/// History policy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum History {
    /// Resolved to `KeepLast` with the configured default depth.
    #[default]
    SystemDefault,
    /// Keep the `depth` most recent samples, dropping the oldest.
    KeepLast,
    /// Keep every sample; the queue is unbounded.
    KeepAll,
}

/// Durability policy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Durability {
    /// Resolved to `Volatile`.
    #[default]
    SystemDefault,
    Volatile,
    TransientLocal,
}

/// QoS profile attached to a publisher, subscription, service or client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QosProfile {
    pub history: History,
    /// Queue depth for `KeepLast`. 0 is normalized to 1 by [`adapt`](Self::adapt).
    pub depth: usize,
    pub reliability: Reliability,
    pub durability: Durability,
}

impl Default for QosProfile {
    fn default() -> Self {
        Self {
            history: History::KeepLast,
            depth: 10,
            reliability: Reliability::Reliable,
            durability: Durability::Volatile,
        }
    }
}

impl QosProfile {
    /// Profile with every policy left to the system default.
    #[must_use]
    pub fn system_default() -> Self {
        Self {
            history: History::SystemDefault,
            depth: 0,
            reliability: Reliability::SystemDefault,
            durability: Durability::SystemDefault,
        }
    }

    /// Default profile for sensor data: best effort, keep last 5.
    #[must_use]
    pub fn sensor_data() -> Self {
        Self {
            history: History::KeepLast,
            depth: 5,
            reliability: Reliability::BestEffort,
            durability: Durability::Volatile,
        }
    }

    /// Default profile for services.
    #[must_use]
    pub fn services_default() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn keep_last(mut self, depth: usize) -> Self {
        self.history = History::KeepLast;
        self.depth = depth;
        self
    }

    #[must_use]
    pub fn keep_all(mut self) -> Self {
        self.history = History::KeepAll;
        self
    }

    #[must_use]
    pub fn reliable(mut self) -> Self {
        self.reliability = Reliability::Reliable;
        self
    }

    #[must_use]
    pub fn best_effort(mut self) -> Self {
        self.reliability = Reliability::BestEffort;
        self
    }

    #[must_use]
    pub fn transient_local(mut self) -> Self {
        self.durability = Durability::TransientLocal;
        self
    }

    #[must_use]
    pub fn volatile(mut self) -> Self {
        self.durability = Durability::Volatile;
        self
    }

    /// Resolve system defaults and normalize the depth to at least 1.
    #[must_use]
    pub fn adapt(mut self, default_depth: usize) -> Self {
        if self.history == History::SystemDefault {
            self.history = History::KeepLast;
            self.depth = default_depth;
        }
        if self.reliability == Reliability::SystemDefault {
            self.reliability = Reliability::Reliable;
        }
        if self.durability == Durability::SystemDefault {
            self.durability = Durability::Volatile;
        }
        self.depth = self.depth.max(1);
        self
    }

    /// Capacity of the receive queue for this profile.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        match self.history {
            History::KeepAll => usize::MAX,
            History::KeepLast | History::SystemDefault => self.depth.max(1),
        }
    }
}

/// Check request-vs-offered compatibility between a publisher profile and a
/// subscription profile on the same key.
///
/// **Rules:**
/// - best-effort offered, reliable requested: incompatible
/// - volatile offered, transient-local requested: incompatible
///
/// Returns the name of the first failing policy.
#[must_use]
pub fn incompatible_policy(offered: &QosProfile, requested: &QosProfile) -> Option<&'static str> {
    if offered.reliability == Reliability::BestEffort
        && requested.reliability == Reliability::Reliable
    {
        return Some("RELIABILITY");
    }
    if offered.durability == Durability::Volatile
        && requested.durability == Durability::TransientLocal
    {
        return Some("DURABILITY");
    }
    None
}

/// `true` when [`incompatible_policy`] finds nothing.
#[must_use]
pub fn is_compatible(offered: &QosProfile, requested: &QosProfile) -> bool {
    incompatible_policy(offered, requested).is_none()
}
