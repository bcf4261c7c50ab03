//! Tracker Notification Tests
//!
//! - A request is notified once the cache satisfies it, never twice
//! - Each caller holds at most one pending request; the last one wins
//! - A satisfied target returns without registering
//! - A timed-out wait leaves nothing behind

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use lsnwait::position::LogPosition;
use lsnwait::source::InMemorySource;
use lsnwait::tracker::{CallerId, Mailbox, ReplicationTracker, TrackerError, TrackerSet, WaitOutcome};

fn tracker(name: &str) -> Arc<ReplicationTracker> {
    Arc::new(ReplicationTracker::new(name, Arc::new(InMemorySource::new())))
}

// =============================================================================
// Notification Scenarios
// =============================================================================

/// Empty cache, request 0/100, report 0/100: caller is notified.
#[tokio::test]
async fn test_exact_report_notifies() {
    let tracker = tracker("main");
    let mut mailbox = Mailbox::new();
    let target = LogPosition::insert(0, 100);

    tracker.request_notification(&mailbox, target);
    assert_eq!(tracker.pending_count(), 1);

    assert_eq!(tracker.observe(LogPosition::replay(0, 100)), 1);
    let outcome = tracker
        .await_notification(&mut mailbox, target, Duration::from_millis(100))
        .await;
    assert_eq!(outcome, WaitOutcome::Ready);
    assert_eq!(tracker.pending_count(), 0);
}

/// Request 0/200: report 0/150 keeps it pending, report 0/250 settles it.
#[tokio::test]
async fn test_partial_progress_keeps_waiting() {
    let tracker = tracker("main");
    let mailbox = Mailbox::new();
    let target = LogPosition::insert(0, 200);
    tracker.request_notification(&mailbox, target);

    assert_eq!(tracker.observe(LogPosition::replay(0, 150)), 0);
    assert_eq!(tracker.pending_target(mailbox.id()), Some(target));

    assert_eq!(tracker.observe(LogPosition::replay(0, 250)), 1);
    assert_eq!(tracker.pending_count(), 0);
}

/// No satisfying update within the timeout: timed out, entry withdrawn.
#[tokio::test]
async fn test_timeout_without_update() {
    let tracker = tracker("main");
    tracker.observe(LogPosition::replay(0, 10));

    let outcome = tracker
        .wait_for(LogPosition::insert(0, 20), Duration::from_millis(30))
        .await;
    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert_eq!(tracker.pending_count(), 0);

    let metrics = tracker.metrics().snapshot();
    assert_eq!(metrics.waits_timed_out, 1);
    assert_eq!(metrics.requests_withdrawn, 1);
}

/// Not replicating settles every pending request.
#[tokio::test]
async fn test_not_replicating_settles_everything() {
    let tracker = tracker("main");
    let a = Mailbox::new();
    let b = Mailbox::new();
    tracker.request_notification(&a, LogPosition::insert(0, 1));
    tracker.request_notification(&b, LogPosition::insert(u32::MAX, 0));

    assert_eq!(tracker.observe(LogPosition::NotReplicating), 2);
    assert_eq!(tracker.pending_count(), 0);
}

// =============================================================================
// Registry Discipline
// =============================================================================

/// A second request from the same caller replaces the first.
#[tokio::test]
async fn test_last_request_wins() {
    let tracker = tracker("main");
    let mailbox = Mailbox::new();
    tracker.request_notification(&mailbox, LogPosition::insert(0, 10));
    tracker.request_notification(&mailbox, LogPosition::insert(0, 500));

    assert_eq!(tracker.pending_count(), 1);
    assert_eq!(
        tracker.pending_target(mailbox.id()),
        Some(LogPosition::insert(0, 500))
    );

    // 0/100 would have satisfied the replaced request.
    assert_eq!(tracker.observe(LogPosition::replay(0, 100)), 0);
    assert_eq!(tracker.metrics().snapshot().requests_replaced, 1);
}

/// Already-visible target returns ready without touching the registry.
#[tokio::test]
async fn test_fast_path_skips_registration() {
    let tracker = tracker("main");
    tracker.observe(LogPosition::replay(2, 0));

    let outcome = tracker
        .wait_for(LogPosition::insert(1, 0xFFFF), Duration::from_millis(10))
        .await;
    assert_eq!(outcome, WaitOutcome::Ready);

    let metrics = tracker.metrics().snapshot();
    assert_eq!(metrics.waits_fast_path, 1);
    assert_eq!(metrics.requests_registered, 0);
}

/// A waiter timing out leaves another mailbox's entry under the same caller id alone.
#[tokio::test]
async fn test_timeout_keeps_entry_of_shared_caller_id() {
    let tracker = tracker("main");
    let id = CallerId::new();
    let mut first = Mailbox::with_id(id);
    let mut second = Mailbox::with_id(id);
    let target = LogPosition::insert(0, 100);
    tracker.request_notification(&first, target);
    tracker.request_notification(&second, target);

    let outcome = tracker
        .await_notification(&mut first, target, Duration::from_millis(20))
        .await;
    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert_eq!(tracker.pending_count(), 1);
    assert_eq!(tracker.metrics().snapshot().requests_withdrawn, 0);

    assert_eq!(tracker.observe(LogPosition::replay(0, 100)), 1);
    let outcome = tracker
        .await_notification(&mut second, target, Duration::from_millis(20))
        .await;
    assert_eq!(outcome, WaitOutcome::Ready);
    assert_eq!(tracker.pending_count(), 0);
}

/// Entries whose mailbox is gone are pruned instead of notified.
#[tokio::test]
async fn test_dropped_mailbox_pruned() {
    let tracker = tracker("main");
    {
        let mailbox = Mailbox::new();
        tracker.request_notification(&mailbox, LogPosition::insert(9, 0));
    }
    assert_eq!(tracker.pending_count(), 1);

    tracker.evaluate_pending();
    assert_eq!(tracker.pending_count(), 0);
    assert_eq!(tracker.metrics().snapshot().requests_pruned, 1);
}

// =============================================================================
// Concurrency
// =============================================================================

/// Many concurrent waiters, one update: each notified exactly once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_waiters_notified_once() {
    let tracker = tracker("main");
    tracker.observe(LogPosition::replay(0, 0));

    let waiters: Vec<_> = (1..=32u32)
        .map(|i| {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move {
                tracker
                    .wait_for(LogPosition::insert(0, i * 16), Duration::from_secs(2))
                    .await
            })
        })
        .collect();

    // Let every waiter register before the update lands.
    while tracker.pending_count() < 32 {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let updater = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move { tracker.observe(LogPosition::replay(0, 32 * 16)) })
    };
    // Racing evaluations must not double-notify.
    let sweeps: Vec<_> = (0..4)
        .map(|_| {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.evaluate_pending() })
        })
        .collect();
    updater.await.unwrap();
    join_all(sweeps).await;

    for outcome in join_all(waiters).await {
        assert_eq!(outcome.unwrap(), WaitOutcome::Ready);
    }
    let metrics = tracker.metrics().snapshot();
    assert_eq!(metrics.notifications_sent, 32);
    assert_eq!(metrics.waits_ready, 32);
    assert_eq!(tracker.pending_count(), 0);
}

/// The sweeper settles a request registered after the last update.
#[tokio::test]
async fn test_sweeper_settles_late_registration() {
    let tracker = tracker("main");
    let sweeper = tracker.spawn_sweeper(Duration::from_millis(5));

    tracker.record_local(Some(LogPosition::replay(0, 50)));
    let mut mailbox = Mailbox::new();
    let target = LogPosition::insert(0, 40);
    tracker.request_notification(&mailbox, target);

    let outcome = tracker
        .await_notification(&mut mailbox, target, Duration::from_secs(1))
        .await;
    assert_eq!(outcome, WaitOutcome::Ready);
    sweeper.stop().await;
}

// =============================================================================
// Tracker Sets
// =============================================================================

/// Trackers are independent; names resolve to the right one.
#[tokio::test]
async fn test_trackers_are_independent() {
    let main = tracker("main");
    let audit = tracker("audit");
    let set = TrackerSet::new("main", [Arc::clone(&main), Arc::clone(&audit)]).unwrap();

    let mailbox = Mailbox::new();
    audit.request_notification(&mailbox, LogPosition::insert(0, 10));
    main.observe(LogPosition::replay(5, 0));

    assert_eq!(audit.pending_count(), 1);
    assert_eq!(set.get(Some("audit")).unwrap().pending_count(), 1);
    assert_eq!(set.get(None).unwrap().name(), "main");
    assert_eq!(set.names(), vec!["audit", "main"]);
    assert_eq!(
        set.get(Some("billing")).unwrap_err(),
        TrackerError::UnknownTracker("billing".into())
    );
}
