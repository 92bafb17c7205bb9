// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # rmw-zenoh
//!
//! ROS 2 style middleware data plane over a key-expression pub/sub/query
//! transport.
//!
//! ## Data flow
//!
//! ```text
//! transport thread                         application thread
//!   sample/query/reply
//!        |
//!   wire handler --> entity queue --pop--> Subscription::take / Service::take_request
//!        |                 |                Client::take_response
//!        |                 +--notify--> WaitSet::wait
//!        +--> event callback (data available)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rmw_zenoh::{Context, DispatchMode, EnvConfig, QosProfile, StringTypeSupport};
//!
//! fn main() -> rmw_zenoh::Result<()> {
//!     let config = EnvConfig {
//!         dispatch: DispatchMode::Inline,
//!         ..EnvConfig::default()
//!     };
//!     let context = Context::new(config)?;
//!     let node = context.create_node("talker", "demo")?;
//!
//!     let ts = || StringTypeSupport::new("std_msgs/msg/String");
//!     let sub = node.create_subscription("chatter", QosProfile::default(), ts())?;
//!     let publisher = node.create_publisher("chatter", QosProfile::default(), ts())?;
//!
//!     publisher.publish(&"hello".to_string())?;
//!     let (msg, info) = sub.take()?.expect("delivered inline");
//!     assert_eq!(msg, "hello");
//!     assert_eq!(info.publication_sequence_number, 1);
//!     Ok(())
//! }
//! ```

pub mod attachment;
pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod events;
pub mod keyexpr;
pub mod logging;
pub mod node;
pub mod payload;
pub mod qos;
pub mod queue;
pub mod registry;
pub mod transport;
pub mod type_support;
pub mod waitset;
mod wire;

pub use attachment::Attachment;
pub use config::EnvConfig;
pub use context::{Context, Node};
pub use entity::{ClientData, PublisherData, RequestId, ServiceData, SubscriptionData};
pub use error::{Error, Result};
pub use events::{EventCallback, EventHandle, EventKind, EventStatus};
pub use keyexpr::{topic_keyexpr, KeyExpr};
pub use logging::LogLevel;
pub use node::{Client, MessageInfo, Publisher, Service, Subscription};
pub use payload::{Gid, Payload};
pub use qos::{Durability, History, QosProfile, Reliability};
pub use transport::{DispatchMode, LocalSession, Transport};
pub use type_support::{RawTypeSupport, StringTypeSupport, TypeSupport};
pub use waitset::{GuardCondition, WaitSet, Waitable};
