// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publisher/Subscription integration tests over the in-process session.

mod common;

use common::{capture_logs, context, eventually, node};
use parking_lot::Mutex;
use rmw_zenoh::{
    DispatchMode, Error, EventKind, QosProfile, RawTypeSupport, StringTypeSupport, WaitSet,
    Waitable,
};
use std::sync::Arc;
use std::time::Duration;

fn string_ts() -> StringTypeSupport {
    StringTypeSupport::new("std_msgs/msg/String")
}

#[test]
fn test_depth_one_keeps_latest_and_reports_drop_once() {
    let logs = capture_logs();
    let ctx = context(DispatchMode::Inline);
    let node = node(&ctx, "scenario_a");

    let sub = node
        .create_subscription("depth_one_topic", QosProfile::default().keep_last(1), string_ts())
        .expect("Failed to create subscription");
    let publisher = node
        .create_publisher("depth_one_topic", QosProfile::default(), string_ts())
        .expect("Failed to create publisher");

    publisher.publish(&"m1".to_string()).expect("publish m1");
    publisher.publish(&"m2".to_string()).expect("publish m2");

    assert_eq!(sub.queued_messages(), 1);
    let (msg, info) = sub.take().expect("take").expect("one message");
    assert_eq!(msg, "m2");
    assert_eq!(info.publication_sequence_number, 2);
    assert_eq!(info.publisher_gid, publisher.gid());
    assert!(sub.take().expect("take").is_none());

    assert_eq!(sub.dropped_messages(), 1);
    assert_eq!(
        logs.count(log::Level::Warn, &["depth_one_topic", "dropping oldest"]),
        1
    );
}

#[test]
fn test_zero_depth_is_normalized() {
    let ctx = context(DispatchMode::Inline);
    let node = node(&ctx, "zero_depth");
    let sub = node
        .create_subscription("zero_depth_topic", QosProfile::default().keep_last(0), string_ts())
        .expect("Failed to create subscription");
    assert_eq!(sub.qos().depth, 1);

    let publisher = node
        .create_publisher("zero_depth_topic", QosProfile::default(), string_ts())
        .expect("Failed to create publisher");
    publisher.publish(&"only".to_string()).expect("publish");
    assert_eq!(sub.take().expect("take").map(|(m, _)| m).as_deref(), Some("only"));
}

#[test]
fn test_system_default_uses_configured_depth() {
    let ctx = context(DispatchMode::Inline);
    let node = node(&ctx, "default_depth");
    let sub = node
        .create_subscription("default_depth_topic", QosProfile::system_default(), string_ts())
        .expect("Failed to create subscription");
    assert_eq!(sub.qos().depth, ctx.config().default_depth);
}

#[test]
fn test_threaded_delivery_wakes_wait_set() {
    let ctx = context(DispatchMode::Threaded);
    let node = node(&ctx, "threaded");
    let sub = node
        .create_subscription("threaded_topic", QosProfile::default().keep_all(), string_ts())
        .expect("Failed to create subscription");
    let publisher = node
        .create_publisher("threaded_topic", QosProfile::default(), string_ts())
        .expect("Failed to create publisher");

    for i in 0..20 {
        publisher.publish(&format!("msg-{}", i)).expect("publish");
    }

    let waitset = WaitSet::new();
    let mut received = Vec::new();
    while received.len() < 20 {
        let ready = waitset
            .wait(&[&sub], Some(Duration::from_secs(5)))
            .expect("subscription should become ready");
        assert_eq!(ready, vec![0]);
        while let Some((msg, _)) = sub.take().expect("take") {
            received.push(msg);
        }
    }

    let expected: Vec<String> = (0..20).map(|i| format!("msg-{}", i)).collect();
    assert_eq!(received, expected);
    assert!(!sub.is_ready());
}

#[test]
fn test_new_message_callback_flushes_backlog() {
    let ctx = context(DispatchMode::Inline);
    let node = node(&ctx, "callbacks");
    let sub = node
        .create_subscription("callback_topic", QosProfile::default(), string_ts())
        .expect("Failed to create subscription");
    let publisher = node
        .create_publisher("callback_topic", QosProfile::default(), string_ts())
        .expect("Failed to create publisher");

    for _ in 0..3 {
        publisher.publish(&"x".to_string()).expect("publish");
    }

    let counts = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&counts);
    sub.set_on_new_message_callback(Some(Arc::new(move |n| sink.lock().push(n))));
    assert_eq!(*counts.lock(), vec![3]);

    publisher.publish(&"y".to_string()).expect("publish");
    assert_eq!(*counts.lock(), vec![3, 1]);
    assert_eq!(sub.queued_messages(), 4);
}

#[test]
fn test_incompatible_qos_raises_events_on_both_sides() {
    let ctx = context(DispatchMode::Inline);
    let node = node(&ctx, "qos_events");

    let sub = node
        .create_subscription("qos_topic", QosProfile::default().reliable(), string_ts())
        .expect("Failed to create subscription");
    let handle = sub
        .event_handle(EventKind::RequestedQosIncompatible)
        .expect("event handle");

    let publisher = node
        .create_publisher("qos_topic", QosProfile::sensor_data(), string_ts())
        .expect("Failed to create publisher");

    let waitset = WaitSet::new();
    let ready = waitset
        .wait(&[&handle], Some(Duration::ZERO))
        .expect("event should be pending");
    assert_eq!(ready, vec![0]);

    let status = handle.take().expect("requested status");
    assert_eq!(status.data, "RELIABILITY");
    assert_eq!(status.total_count, 1);

    let offered = publisher
        .take_event(EventKind::OfferedQosIncompatible)
        .expect("supported")
        .expect("offered status");
    assert_eq!(offered.data, "RELIABILITY");

    assert!(matches!(
        publisher.take_event(EventKind::RequestedQosIncompatible),
        Err(Error::Unsupported(_))
    ));
}

#[test]
fn test_compatible_qos_raises_nothing() {
    let ctx = context(DispatchMode::Inline);
    let node = node(&ctx, "qos_ok");
    let sub = node
        .create_subscription("qos_ok_topic", QosProfile::sensor_data(), string_ts())
        .expect("Failed to create subscription");
    let _publisher = node
        .create_publisher("qos_ok_topic", QosProfile::default(), string_ts())
        .expect("Failed to create publisher");

    assert!(sub
        .take_event(EventKind::RequestedQosIncompatible)
        .expect("supported")
        .is_none());
    assert_eq!(ctx.local_endpoint_count(), 2);
}

#[test]
fn test_dropped_subscription_stops_receiving() {
    let ctx = context(DispatchMode::Inline);
    let node = node(&ctx, "teardown");
    let publisher = node
        .create_publisher("teardown_topic", QosProfile::default(), string_ts())
        .expect("Failed to create publisher");

    let sub = node
        .create_subscription("teardown_topic", QosProfile::default(), string_ts())
        .expect("Failed to create subscription");
    assert_eq!(ctx.local_endpoint_count(), 2);
    drop(sub);

    assert_eq!(ctx.local_endpoint_count(), 1);
    publisher.publish(&"after".to_string()).expect("publish with no subscriber");
}

#[test]
fn test_raw_payloads_and_namespaces_route_by_key() {
    let ctx = context(DispatchMode::Inline);
    let robot1 = ctx.create_node("cam", "robot1").expect("node");
    let robot2 = ctx.create_node("cam", "robot2").expect("node");
    let ts = || RawTypeSupport::new("sensor_msgs/msg/Image");

    let sub1 = robot1
        .create_subscription("image", QosProfile::default(), ts())
        .expect("sub1");
    let sub2 = robot2
        .create_subscription("image", QosProfile::default(), ts())
        .expect("sub2");
    let publisher = robot1
        .create_publisher("image", QosProfile::default(), ts())
        .expect("publisher");

    publisher.publish_serialized(&[1, 2, 3]).expect("publish");

    let (payload, _) = sub1.take_serialized().expect("robot1 receives");
    assert_eq!(payload.as_slice(), &[1, 2, 3]);
    assert!(sub2.take_serialized().is_none());
    assert_eq!(sub1.key().as_str(), "0/robot1/image/sensor_msgs::msg::Image");
}

#[test]
fn test_deserialization_failure_is_reported() {
    let ctx = context(DispatchMode::Inline);
    let node = node(&ctx, "bad_bytes");
    let sub = node
        .create_subscription("bad_bytes_topic", QosProfile::default(), string_ts())
        .expect("Failed to create subscription");
    let raw = node
        .create_publisher(
            "bad_bytes_topic",
            QosProfile::default(),
            RawTypeSupport::new("std_msgs/msg/String"),
        )
        .expect("Failed to create publisher");

    raw.publish(&vec![0xff, 0xfe]).expect("publish");
    assert!(matches!(sub.take(), Err(Error::Serialization(_))));
    assert!(sub.take().expect("take").is_none());
}

#[test]
fn test_shutdown_stops_publishing() {
    let ctx = context(DispatchMode::Threaded);
    let node = node(&ctx, "shutdown");
    let sub = node
        .create_subscription("shutdown_topic", QosProfile::default(), string_ts())
        .expect("Failed to create subscription");
    let publisher = node
        .create_publisher("shutdown_topic", QosProfile::default(), string_ts())
        .expect("Failed to create publisher");

    publisher.publish(&"before".to_string()).expect("publish");
    assert!(eventually(Duration::from_secs(5), || sub.has_data()));

    ctx.shutdown();
    assert!(matches!(
        publisher.publish(&"after".to_string()),
        Err(Error::SessionClosed)
    ));
}
