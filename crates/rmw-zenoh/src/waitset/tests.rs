// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use std::thread;

#[test]
fn notify_without_waiter_is_noop() {
    let slot = ConditionSlot::new();
    assert!(!slot.is_attached());
    slot.notify();
}

#[test]
fn notify_before_wait_is_not_lost() {
    let condition = WaitCondition::new();
    condition.notify();
    assert!(condition.wait(Some(Duration::from_millis(1))));
    assert!(!condition.wait(Some(Duration::from_millis(1))));
}

#[test]
fn slot_forwards_to_attached_condition() {
    let slot = ConditionSlot::new();
    let condition = Arc::new(WaitCondition::new());

    slot.attach(Arc::clone(&condition));
    slot.notify();
    assert!(condition.wait(Some(Duration::ZERO)));

    slot.detach();
    slot.notify();
    assert!(!condition.wait(Some(Duration::ZERO)));
}

#[test]
fn guard_trigger_wakes_blocked_waiter() {
    let guard = Arc::new(GuardCondition::new());
    let trigger = Arc::clone(&guard);

    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        trigger.trigger();
    });

    let waitset = WaitSet::new();
    let ready = waitset
        .wait(&[&*guard], Some(Duration::from_secs(5)))
        .expect("guard should fire");
    assert_eq!(ready, vec![0]);

    // The completed wait consumed the trigger and detached the condition.
    assert!(!guard.is_triggered());
    assert!(!guard.slot.is_attached());

    handle.join().unwrap();
}

#[test]
fn timeout_reports_error_and_detaches() {
    let a = GuardCondition::new();
    let b = GuardCondition::new();
    let waitset = WaitSet::new();

    let err = waitset
        .wait(&[&a, &b], Some(Duration::from_millis(10)))
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(!a.slot.is_attached());
    assert!(!b.slot.is_attached());
}

#[test]
fn zero_timeout_polls() {
    let idle = GuardCondition::new();
    let fired = GuardCondition::new();
    fired.trigger();

    let waitset = WaitSet::new();
    let ready = waitset
        .wait(&[&idle, &fired], Some(Duration::ZERO))
        .expect("poll");
    assert_eq!(ready, vec![1]);

    assert!(waitset
        .wait(&[&idle, &fired], Some(Duration::ZERO))
        .unwrap_err()
        .is_timeout());
}

#[test]
fn empty_wait_set_is_rejected() {
    let waitset = WaitSet::new();
    assert!(matches!(
        waitset.wait(&[], None),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn huge_timeout_does_not_overflow() {
    let guard = GuardCondition::new();
    guard.trigger();

    let ready = WaitSet::new()
        .wait(&[&guard], Some(Duration::MAX))
        .expect("already triggered");
    assert_eq!(ready, vec![0]);

    let condition = WaitCondition::new();
    condition.notify();
    assert!(condition.wait(Some(Duration::MAX)));
    assert!(deadline_after(Some(Duration::MAX)).is_none());
}

#[test]
fn huge_timeout_still_wakes_on_trigger() {
    let guard = Arc::new(GuardCondition::new());
    let trigger = Arc::clone(&guard);
    let waker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        trigger.trigger();
    });

    let ready = WaitSet::new()
        .wait(&[&*guard], Some(Duration::MAX))
        .expect("woken by trigger");
    assert_eq!(ready, vec![0]);
    waker.join().expect("waker thread");
}
