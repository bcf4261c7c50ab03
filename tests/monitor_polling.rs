//! Monitor Polling Tests
//!
//! - One long poll feeds the tracker regardless of how many callers wait
//! - Query failures are retried, never surfaced to waiters
//! - A malformed position report stops the loop
//! - A primary-region instance never polls

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lsnwait::monitor::{Monitor, MonitorConfig, MonitorError, MonitorExit};
use lsnwait::position::{LogPosition, Lsn};
use lsnwait::region::{RegionClassifier, StaticRegionClassifier};
use lsnwait::source::{
    BoxFuture, InMemorySource, ReplayCursor, ReplayReport, ReplicationSource, SourceResult,
};
use lsnwait::tracker::{ReplicationTracker, WaitOutcome};

fn replica() -> Arc<dyn RegionClassifier> {
    Arc::new(StaticRegionClassifier::new("eu-west", "us-east"))
}

fn fast() -> MonitorConfig {
    MonitorConfig {
        poll_timeout: Duration::from_millis(100),
        retry_delay: Duration::from_millis(10),
    }
}

/// Source whose replay reports are garbage text.
struct GarbageSource {
    polls: AtomicU32,
}

impl ReplicationSource for GarbageSource {
    fn insert_position(&self) -> BoxFuture<'_, SourceResult<String>> {
        Box::pin(async { Ok("0/0".to_string()) })
    }

    fn wait_for_replay(
        &self,
        _cursor: ReplayCursor,
        _timeout: Duration,
    ) -> BoxFuture<'_, SourceResult<ReplayReport>> {
        self.polls.fetch_add(1, Ordering::Relaxed);
        Box::pin(async { Ok(ReplayReport::Advanced(Some("not-a-position".to_string()))) })
    }
}

// =============================================================================
// Feeding the Tracker
// =============================================================================

/// Replay progress reaches waiters through the monitor.
#[tokio::test]
async fn test_monitor_wakes_waiter() {
    let source = Arc::new(InMemorySource::new());
    let tracker = Arc::new(ReplicationTracker::new("main", source.clone()));
    let handle = Monitor::new(Arc::clone(&tracker), replica(), fast()).spawn();

    let target = source.write(0x200);
    let waiter = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move { tracker.wait_for(target, Duration::from_secs(2)).await })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    source.replay_to(Lsn::new(0, 0x100));
    tokio::time::sleep(Duration::from_millis(30)).await;
    source.replay_all();

    assert_eq!(waiter.await.unwrap(), WaitOutcome::Ready);
    assert_eq!(tracker.latest_local(), Some(LogPosition::replay(0, 0x200)));
    assert_eq!(handle.stop().await.unwrap(), MonitorExit::Stopped);
}

/// Poll count does not scale with the number of waiters.
#[tokio::test]
async fn test_polls_independent_of_waiters() {
    let source = Arc::new(InMemorySource::new());
    let tracker = Arc::new(ReplicationTracker::new("main", source.clone()));
    let handle = Monitor::new(Arc::clone(&tracker), replica(), fast()).spawn();

    let target = source.write(0x10);
    let waiters: Vec<_> = (0..50)
        .map(|_| {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.wait_for(target, Duration::from_secs(2)).await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(20)).await;
    source.replay_all();
    for waiter in waiters {
        assert_eq!(waiter.await.unwrap(), WaitOutcome::Ready);
    }

    handle.stop().await.unwrap();
    assert!(source.poll_count() < 10, "polled {} times", source.poll_count());
}

/// Not replicating reported by the store releases every waiter.
#[tokio::test]
async fn test_not_replicating_releases_waiters() {
    let source = Arc::new(InMemorySource::new());
    let tracker = Arc::new(ReplicationTracker::new("main", source.clone()));
    let handle = Monitor::new(Arc::clone(&tracker), replica(), fast()).spawn();

    let target = source.write(0x1000);
    let waiter = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move { tracker.wait_for(target, Duration::from_secs(2)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    source.set_not_replicating();

    assert_eq!(waiter.await.unwrap(), WaitOutcome::Ready);
    assert_eq!(tracker.latest_local(), Some(LogPosition::NotReplicating));
    handle.stop().await.unwrap();
}

// =============================================================================
// Failure Handling
// =============================================================================

/// Failed polls are counted and retried; the cache is never blanked.
#[tokio::test]
async fn test_retry_after_poll_failures() {
    let source = Arc::new(InMemorySource::new());
    let tracker = Arc::new(ReplicationTracker::new("main", source.clone()));
    tracker.observe(LogPosition::replay(0, 0));
    source.fail_next_polls(3);

    let handle = Monitor::new(Arc::clone(&tracker), replica(), fast()).spawn();
    let target = source.write(0x40);
    source.replay_all();

    let outcome = tracker.wait_for(target, Duration::from_secs(2)).await;
    assert_eq!(outcome, WaitOutcome::Ready);

    let metrics = tracker.metrics().snapshot();
    assert_eq!(metrics.poll_failures, 3);
    assert!(metrics.polls >= 4);
    handle.stop().await.unwrap();
}

/// Malformed report ends the loop with a fatal error.
#[tokio::test]
async fn test_malformed_report_is_fatal() {
    let source = Arc::new(GarbageSource {
        polls: AtomicU32::new(0),
    });
    let tracker = Arc::new(ReplicationTracker::new("main", source.clone()));
    let handle = Monitor::new(Arc::clone(&tracker), replica(), fast()).spawn();

    let err = handle.join().await.unwrap_err();
    assert!(matches!(err, MonitorError::Position(_)));
    assert!(err.is_fatal());
    assert_eq!(source.polls.load(Ordering::Relaxed), 1);
    assert_eq!(tracker.latest_local(), None);
}

// =============================================================================
// Region Gate
// =============================================================================

/// Primary-region instance exits without polling.
#[tokio::test]
async fn test_primary_never_polls() {
    let source = Arc::new(InMemorySource::new());
    let tracker = Arc::new(ReplicationTracker::new("main", source.clone()));
    let primary: Arc<dyn RegionClassifier> =
        Arc::new(StaticRegionClassifier::new("us-east", "us-east"));

    let exit = Monitor::new(tracker, primary, fast()).spawn().join().await;
    assert_eq!(exit.unwrap(), MonitorExit::SkippedPrimary);
    assert_eq!(source.poll_count(), 0);
}

/// Two trackers, two monitors, two independent caches.
#[tokio::test]
async fn test_one_monitor_per_tracker() {
    let main_source = Arc::new(InMemorySource::new());
    let audit_source = Arc::new(InMemorySource::new());
    let main = Arc::new(ReplicationTracker::new("main", main_source.clone()));
    let audit = Arc::new(ReplicationTracker::new("audit", audit_source.clone()));
    let handles = [
        Monitor::new(Arc::clone(&main), replica(), fast()).spawn(),
        Monitor::new(Arc::clone(&audit), replica(), fast()).spawn(),
    ];

    let audit_target = audit_source.write(0x80);
    let main_target = main_source.write(0x10);
    main_source.replay_all();
    audit_source.replay_all();

    assert_eq!(
        audit.wait_for(audit_target, Duration::from_secs(2)).await,
        WaitOutcome::Ready
    );
    assert_eq!(
        main.wait_for(main_target, Duration::from_secs(2)).await,
        WaitOutcome::Ready
    );
    assert_eq!(audit.latest_local(), Some(LogPosition::replay(0, 0x80)));
    assert_eq!(main.latest_local(), Some(LogPosition::replay(0, 0x10)));

    for handle in handles {
        handle.stop().await.unwrap();
    }
}
