use std::time::Duration;

use rowstream::application::services::{ProgressTracker, RowOutcome, ThrottlePolicy};
use tokio::time::Instant;

const FAILED: RowOutcome = RowOutcome::Failed {
    diagnostic_persisted: true,
};

#[test]
fn given_interval_policy_when_rows_arrive_then_at_most_one_snapshot_per_interval() {
    let start = Instant::now();
    let mut tracker =
        ProgressTracker::started_at(ThrottlePolicy::Interval(Duration::from_secs(1)), start);

    let early = tracker.record_at(RowOutcome::Processed, start + Duration::from_millis(100));
    let due = tracker.record_at(RowOutcome::Processed, start + Duration::from_millis(1000));
    let too_soon = tracker.record_at(RowOutcome::Processed, start + Duration::from_millis(1500));
    let due_again = tracker.record_at(RowOutcome::Processed, start + Duration::from_millis(2000));

    assert!(early.is_none());
    assert_eq!(due.map(|s| s.processed), Some(2));
    assert!(too_soon.is_none());
    assert_eq!(due_again.map(|s| s.processed), Some(4));
}

#[test]
fn given_row_policy_when_rows_arrive_then_snapshot_every_n_rows() {
    let start = Instant::now();
    let mut tracker = ProgressTracker::started_at(ThrottlePolicy::EveryRows(3), start);

    let emitted: Vec<bool> = (0..7)
        .map(|_| tracker.record_at(RowOutcome::Processed, start).is_some())
        .collect();

    assert_eq!(emitted, vec![false, false, true, false, false, true, false]);
}

#[test]
fn given_failed_rows_when_recorded_then_errors_are_counted_separately() {
    let mut tracker = ProgressTracker::new(ThrottlePolicy::EveryRows(1));

    tracker.record(RowOutcome::Processed);
    let snapshot = tracker.record(FAILED).unwrap();

    assert_eq!(snapshot.processed, 1);
    assert_eq!(snapshot.errors, 1);
}

#[test]
fn given_undercounted_total_when_more_rows_arrive_then_total_never_falls_below_accounted() {
    let mut tracker = ProgressTracker::new(ThrottlePolicy::EveryRows(1));
    tracker.set_total(2);

    for _ in 0..3 {
        tracker.record(RowOutcome::Processed);
    }
    let counters = tracker.counters();

    assert_eq!(counters.total, Some(3));
    assert!(counters.accounted() <= counters.total.unwrap());
}

#[test]
fn given_overcounted_total_when_stream_exhausted_then_total_equals_rows_seen() {
    let start = Instant::now();
    let mut tracker = ProgressTracker::started_at(ThrottlePolicy::EveryRows(100), start);
    tracker.set_total(10);

    tracker.record_at(RowOutcome::Processed, start);
    tracker.record_at(FAILED, start);
    let snapshot = tracker.finish_at(true, start + Duration::from_secs(1));

    assert_eq!(snapshot.total, Some(2));
    assert_eq!(snapshot.percent(), Some(100.0));
}

#[test]
fn given_fault_when_finishing_without_exhaustion_then_total_is_kept() {
    let mut tracker = ProgressTracker::new(ThrottlePolicy::EveryRows(100));
    tracker.set_total(10);
    tracker.record(RowOutcome::Processed);

    let snapshot = tracker.finish(false);

    assert_eq!(snapshot.total, Some(10));
    assert_eq!(snapshot.processed, 1);
}

#[test]
fn given_steady_throughput_when_snapshotting_then_eta_is_derived_from_rate() {
    let start = Instant::now();
    let mut tracker = ProgressTracker::started_at(ThrottlePolicy::EveryRows(1000), start);
    tracker.set_total(100);
    for _ in 0..50 {
        tracker.record_at(RowOutcome::Processed, start);
    }

    let snapshot = tracker.snapshot_at(start + Duration::from_secs(10));

    assert!((snapshot.throughput - 5.0).abs() < f64::EPSILON);
    assert_eq!(snapshot.eta, Some(Duration::from_secs(10)));
    assert_eq!(snapshot.percent(), Some(50.0));
}

#[test]
fn given_unknown_total_when_snapshotting_then_eta_and_percent_are_absent() {
    let start = Instant::now();
    let mut tracker = ProgressTracker::started_at(ThrottlePolicy::EveryRows(1000), start);
    tracker.record_at(RowOutcome::Processed, start);

    let snapshot = tracker.snapshot_at(start + Duration::from_secs(1));

    assert_eq!(snapshot.eta, None);
    assert_eq!(snapshot.percent(), None);
}
