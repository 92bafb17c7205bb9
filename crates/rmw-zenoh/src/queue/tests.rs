// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

#[test]
fn pop_returns_pushed_item() {
    let queue = BoundedQueue::new(4);
    assert!(queue.pop_front().is_none());
    assert!(queue.push(7u32).is_none());
    assert_eq!(queue.pop_front(), Some(7));
    assert!(queue.is_empty());
}

#[test]
fn zero_depth_behaves_as_one() {
    let queue = BoundedQueue::new(0);
    assert_eq!(queue.depth(), 1);
    queue.push("m1");
    assert_eq!(queue.push("m2"), Some("m1"));
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.pop_front(), Some("m2"));
    assert_eq!(queue.total_evicted(), 1);
}

#[test]
fn keeps_most_recent_items() {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    for _ in 0..200 {
        let depth = rng.usize(1..16);
        let pushes = rng.usize(0..48);
        let queue = BoundedQueue::new(depth);
        for i in 0..pushes {
            queue.push(i);
        }

        assert_eq!(queue.len(), pushes.min(depth));
        let expected: Vec<usize> = (pushes.saturating_sub(depth)..pushes).collect();
        let drained: Vec<usize> = std::iter::from_fn(|| queue.pop_front()).collect();
        assert_eq!(drained, expected, "depth={} pushes={}", depth, pushes);
        assert_eq!(
            queue.total_evicted(),
            pushes.saturating_sub(depth) as u64
        );
    }
}

#[test]
fn unbounded_never_evicts() {
    let queue = BoundedQueue::unbounded();
    for i in 0..1_000 {
        assert!(queue.push(i).is_none());
    }
    assert_eq!(queue.len(), 1_000);
}

#[test]
fn concurrent_pushers_and_popper() {
    const PUSHERS: usize = 4;
    const PER_THREAD: usize = 2_000;
    const DEPTH: usize = 8;

    let queue = Arc::new(BoundedQueue::new(DEPTH));
    let done = Arc::new(AtomicBool::new(false));

    let popper = {
        let queue = Arc::clone(&queue);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut seen = HashSet::new();
            loop {
                assert!(queue.len() <= DEPTH);
                match queue.pop_front() {
                    Some(item) => assert!(seen.insert(item), "item {:?} popped twice", item),
                    None if done.load(Ordering::Acquire) => break,
                    None => thread::yield_now(),
                }
            }
            while let Some(item) = queue.pop_front() {
                assert!(seen.insert(item));
            }
            seen
        })
    };

    let pushers: Vec<_> = (0..PUSHERS)
        .map(|t| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    queue.push((t, i));
                }
            })
        })
        .collect();
    for pusher in pushers {
        pusher.join().unwrap();
    }
    done.store(true, Ordering::Release);

    let seen = popper.join().unwrap();
    assert_eq!(queue.total_pushed(), (PUSHERS * PER_THREAD) as u64);
    assert_eq!(
        seen.len() as u64 + queue.total_evicted(),
        (PUSHERS * PER_THREAD) as u64
    );
}

#[test]
fn sequence_map_rejects_duplicates() {
    let client = Gid::new([1; 16]);
    let map = SequenceMap::new();
    map.insert(client, 42, "first").unwrap();
    assert!(matches!(
        map.insert(client, 42, "second"),
        Err(Error::DuplicateSequence(42))
    ));

    assert_eq!(map.take(client, 42), Some("first"));
    assert_eq!(map.take(client, 42), None);
    assert!(map.is_empty());

    // The key is free again once taken.
    map.insert(client, 42, "third").unwrap();
    assert!(map.contains(client, 42));
}

#[test]
fn sequence_map_separates_clients() {
    let a = Gid::new([1; 16]);
    let b = Gid::new([2; 16]);
    let map = SequenceMap::new();
    map.insert(a, 0, "from a").unwrap();
    map.insert(b, 0, "from b").unwrap();
    assert_eq!(map.len(), 2);

    assert_eq!(map.take(b, 0), Some("from b"));
    assert!(map.contains(a, 0));
    assert!(!map.contains(b, 0));
}

#[test]
fn sequence_numbers_strictly_increase() {
    let generator = Arc::new(SequenceGenerator::new());
    assert_eq!(generator.next_sequence_number(), 0);
    assert_eq!(generator.next_sequence_number(), 1);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let generator = Arc::clone(&generator);
            thread::spawn(move || {
                let numbers: Vec<i64> = (0..500).map(|_| generator.next_sequence_number()).collect();
                assert!(numbers.windows(2).all(|w| w[0] < w[1]));
                numbers
            })
        })
        .collect();

    let mut all = HashSet::new();
    for handle in handles {
        for n in handle.join().unwrap() {
            assert!(all.insert(n), "sequence number {} reused", n);
        }
    }
    assert_eq!(generator.peek(), 2 + 2_000);
}

#[test]
fn message_defaults_when_attachment_missing() {
    let key = crate::keyexpr::KeyExpr::new("0/chatter/std_msgs::msg::String").unwrap();
    let sample = Sample::new(key, Payload::from(vec![1, 2]), 99, Attachment::default());

    let msg = QueuedMessage::from_sample(sample, 100);
    assert_eq!(msg.source_timestamp, 99);
    assert_eq!(msg.received_timestamp, 100);
    assert_eq!(msg.sequence_number, -1);
    assert_eq!(msg.publisher_gid, Gid::default());
}

#[test]
fn clear_empties_without_counting_evictions() {
    let queue = BoundedQueue::new(3);
    for i in 0..3u8 {
        queue.push(i);
    }
    queue.clear();
    assert!(queue.is_empty());
    assert_eq!(queue.total_pushed(), 3);
    assert_eq!(queue.total_evicted(), 0);

    queue.push(9);
    assert_eq!(queue.pop_front(), Some(9));
}
