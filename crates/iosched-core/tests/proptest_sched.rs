//! Property-based tests for the scheduler using proptest.
//!
//! These verify the ordering invariants (FIFO within a stream, priority
//! preference across streams) and op conservation across admission,
//! dispatch, and shutdown for arbitrary submission patterns.

use std::collections::HashMap;
use std::sync::Arc;

use iosched_core::{
    MockClient, Op, OpStatus, Scheduler, SchedulerClient, SchedulerConfig, StreamId, MAX_PRIORITY,
};
use proptest::prelude::*;

fn new_scheduler() -> (Scheduler, Arc<MockClient>) {
    let client = Arc::new(MockClient::new());
    let sched = Scheduler::new(
        Arc::clone(&client) as Arc<dyn SchedulerClient>,
        SchedulerConfig::default(),
    );
    (sched, client)
}

/// Generator for a set of stream priorities (one stream per entry).
fn stream_priorities() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(0u8..=MAX_PRIORITY, 1..6)
}

proptest! {
    /// For any submission pattern, ops of one stream are dequeued in
    /// submission order.
    #[test]
    fn prop_fifo_within_stream(
        priorities in stream_priorities(),
        pattern_seed in proptest::collection::vec(0usize..16, 0..200),
    ) {
        let (sched, _client) = new_scheduler();
        for (idx, priority) in priorities.iter().enumerate() {
            sched.stream_open(StreamId(idx as u64), *priority).unwrap();
        }

        let mut submitted: HashMap<u64, Vec<u64>> = HashMap::new();
        for (op_id, seed) in pattern_seed.iter().enumerate() {
            let stream = (seed % priorities.len()) as u64;
            submitted.entry(stream).or_default().push(op_id as u64);
            let rejected = sched.enqueue(vec![Op::new(op_id as u64, StreamId(stream))]);
            prop_assert!(rejected.is_empty());
        }

        let mut dequeued: HashMap<u64, Vec<u64>> = HashMap::new();
        while let Some(op) = sched.dequeue(false) {
            dequeued.entry(op.stream_id().0).or_default().push(op.id());
        }

        let empty = Vec::new();
        for (stream, expected) in &submitted {
            prop_assert_eq!(dequeued.get(stream).unwrap_or(&empty), expected);
        }
    }

    /// When everything is submitted before any retrieval, dequeued
    /// priorities are non-increasing: a higher-priority ready stream is
    /// always preferred.
    #[test]
    fn prop_priority_non_increasing(
        priorities in stream_priorities(),
        pattern_seed in proptest::collection::vec(0usize..16, 1..150),
    ) {
        let (sched, _client) = new_scheduler();
        for (idx, priority) in priorities.iter().enumerate() {
            sched.stream_open(StreamId(idx as u64), *priority).unwrap();
        }
        for (op_id, seed) in pattern_seed.iter().enumerate() {
            let stream = (seed % priorities.len()) as u64;
            sched.enqueue(vec![Op::new(op_id as u64, StreamId(stream))]);
        }

        let mut last = u8::MAX;
        while let Some(op) = sched.dequeue(false) {
            prop_assert!(op.priority() <= last);
            last = op.priority();
        }
    }

    /// Every submitted op is accounted for: admitted ops either dequeue or
    /// are canceled at shutdown, rejected ops come straight back. Nothing
    /// vanishes.
    #[test]
    fn prop_no_orphaned_ops(
        priorities in stream_priorities(),
        pattern_seed in proptest::collection::vec(0usize..32, 0..150),
        drain in 0usize..50,
    ) {
        let (sched, client) = new_scheduler();
        for (idx, priority) in priorities.iter().enumerate() {
            sched.stream_open(StreamId(idx as u64), *priority).unwrap();
        }

        let mut rejected_count = 0usize;
        let total = pattern_seed.len();
        for (op_id, seed) in pattern_seed.iter().enumerate() {
            // Roughly half the seeds target streams that were never opened.
            let stream = (seed % (priorities.len() * 2)) as u64;
            rejected_count += sched
                .enqueue(vec![Op::new(op_id as u64, StreamId(stream))])
                .len();
        }

        let mut dequeued_count = 0usize;
        for _ in 0..drain {
            if sched.dequeue(false).is_some() {
                dequeued_count += 1;
            }
        }

        sched.shutdown();
        let canceled = client
            .released()
            .iter()
            .filter(|(_, status)| *status == OpStatus::Canceled)
            .count();
        prop_assert_eq!(rejected_count + dequeued_count + canceled, total);
    }

    /// The rejected-op output list preserves input batch order.
    #[test]
    fn prop_rejection_preserves_batch_order(
        pattern_seed in proptest::collection::vec(0usize..8, 0..100),
    ) {
        let (sched, _client) = new_scheduler();
        // Only even stream ids exist.
        for idx in [0u64, 2, 4, 6] {
            sched.stream_open(StreamId(idx), 0).unwrap();
        }

        let batch: Vec<Op> = pattern_seed
            .iter()
            .enumerate()
            .map(|(op_id, seed)| Op::new(op_id as u64, StreamId(*seed as u64)))
            .collect();
        let expected: Vec<u64> = batch
            .iter()
            .filter(|op| op.stream_id().0 % 2 == 1)
            .map(|op| op.id())
            .collect();

        let rejected = sched.enqueue(batch);
        let got: Vec<u64> = rejected.iter().map(|op| op.id()).collect();
        prop_assert_eq!(got, expected);
        prop_assert!(rejected
            .iter()
            .all(|op| op.status() == Some(OpStatus::NotFound)));
    }
}
