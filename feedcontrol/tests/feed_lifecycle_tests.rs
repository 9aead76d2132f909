//! Lifecycle tests for the feed controller
//!
//! Most tests run on a paused clock, so intervals and lifetimes advance
//! instantly and deterministically.

mod test_utils;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_test::{assert_err, assert_ok};

use marketfeed_feedcontrol::*;
use marketfeed_marketplace::{
    AccessParameters, ConsumerConfig, InMemoryMarketplace, Information, LicenseType, Marketplace,
    OfferingId, Price, PricingModel, SubscribableOfferingDescription,
};
use test_utils::*;

#[tokio::test(start_paused = true)]
async fn test_start_then_stop_delivers_nothing() {
    let controller = FeedController::default();
    let source = ScriptedSource::healthy();

    let (handle, mut events) = controller.start(source.clone(), feed_config(10, 30)).unwrap();
    assert_eq!(controller.stop(handle).unwrap(), FeedStatus::Stopped);

    assert!(events.recv().await.is_none());
    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Stopped);
    assert_eq!(source.poll_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_start_then_stop_delivers_nothing_across_workers() {
    let controller = FeedController::default();

    for _ in 0..500 {
        let (handle, mut events) = controller
            .start(ScriptedSource::healthy(), feed_config(10, 3600))
            .unwrap();
        tokio::task::yield_now().await;
        assert_eq!(controller.stop(handle).unwrap(), FeedStatus::Stopped);

        assert!(drain_queued(&mut events).is_empty());
        assert!(collect_until_end(&mut events).await.is_empty());
        controller.remove(handle).unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn test_dropping_controller_stops_its_feeds() {
    let controller = FeedController::default();
    let source = ScriptedSource::healthy();
    let (handle, mut events) = controller.start(source.clone(), feed_config(10, 3600)).unwrap();

    sleep(Duration::from_secs(1)).await;
    assert_eq!(source.poll_count(), 1);
    drop(controller);

    sleep(Duration::from_secs(600)).await;
    assert_eq!(source.poll_count(), 1);
    assert!(collect_until_end(&mut events).await.is_empty());
    assert_eq!(events.handle(), handle);
}

#[tokio::test(start_paused = true)]
async fn test_huge_interval_still_expires() {
    let controller = FeedController::default();
    let source = ScriptedSource::healthy();
    let configuration = FeedConfiguration::new(
        AccessParameters::empty(),
        Duration::MAX,
        Duration::from_secs(30),
    );
    let (handle, mut events) = controller.start(source.clone(), configuration).unwrap();

    sleep(Duration::from_secs(60)).await;

    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Expired);
    assert_eq!(source.poll_count(), 1);
    assert_eq!(collect_until_end(&mut events).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_resume_with_huge_interval() {
    let controller = FeedController::default();
    let source = ScriptedSource::healthy();
    let configuration = FeedConfiguration::new(
        AccessParameters::empty(),
        Duration::MAX,
        Duration::from_secs(30),
    );
    let (handle, _events) = controller.start(source.clone(), configuration).unwrap();

    sleep(Duration::from_secs(1)).await;
    assert_ok!(controller.pause(handle));
    assert_ok!(controller.resume(handle));
    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Running);

    sleep(Duration::from_secs(40)).await;
    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Expired);
    assert_eq!(source.poll_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_interval_and_lifetime_bound_poll_count() {
    let controller = FeedController::default();
    let source = ScriptedSource::healthy();

    let (handle, mut events) = controller.start(source.clone(), feed_config(10, 30)).unwrap();
    sleep(Duration::from_secs(45)).await;

    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Expired);
    assert_eq!(source.poll_count(), 3);

    let delivered = collect_until_end(&mut events).await;
    assert_eq!(delivered.len(), 3);
    assert!(delivered.iter().all(FeedEvent::is_success));
    assert!(delivered.iter().all(|e| e.handle() == handle));

    let times = source.poll_times();
    for gap in gaps(&times) {
        assert!(gap >= Duration::from_secs(10));
    }
}

#[tokio::test(start_paused = true)]
async fn test_resume_waits_a_full_interval() {
    let controller = FeedController::default();
    let source = ScriptedSource::healthy();
    let (handle, _events) = controller.start(source.clone(), feed_config(10, 120)).unwrap();

    sleep(Duration::from_secs(5)).await;
    controller.pause(handle).unwrap();
    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Paused);

    // The poll due at t=10 is skipped while paused
    sleep(Duration::from_secs(8)).await;
    assert_eq!(source.poll_count(), 1);

    let resumed_at = tokio::time::Instant::now();
    controller.resume(handle).unwrap();
    sleep(Duration::from_secs(25)).await;

    let times = source.poll_times();
    assert_eq!(times.len(), 3);
    assert!(times[1] - resumed_at >= Duration::from_secs(10));
    for gap in gaps(&times) {
        assert!(gap >= Duration::from_secs(10));
    }
    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Running);
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume_require_matching_status() {
    let controller = FeedController::default();
    let (handle, _events) = controller
        .start(ScriptedSource::healthy(), feed_config(10, 60))
        .unwrap();

    assert!(matches!(
        controller.resume(handle),
        Err(FeedError::InvalidTransition { status: FeedStatus::Running, .. })
    ));

    assert_ok!(controller.pause(handle));
    assert!(matches!(
        controller.pause(handle),
        Err(FeedError::InvalidTransition { status: FeedStatus::Paused, .. })
    ));

    assert_ok!(controller.stop(handle));
    assert_err!(controller.resume(handle));
    assert_err!(controller.set_lifetime(handle, Duration::from_secs(600)));
}

#[tokio::test(start_paused = true)]
async fn test_elapsed_lifetime_expires_on_next_tick() {
    let controller = FeedController::default();
    let source = ScriptedSource::healthy();
    let (handle, mut events) = controller.start(source.clone(), feed_config(10, 100)).unwrap();

    sleep(Duration::from_secs(15)).await;
    assert_eq!(source.poll_count(), 2);

    controller.set_lifetime(handle, Duration::from_secs(5)).unwrap();
    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Running);

    sleep(Duration::from_millis(1)).await;
    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Expired);

    sleep(Duration::from_secs(100)).await;
    assert_eq!(source.poll_count(), 2);
    assert_eq!(collect_until_end(&mut events).await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_extended_lifetime_keeps_polling() {
    let controller = FeedController::default();
    let source = ScriptedSource::healthy();
    let (handle, _events) = controller.start(source.clone(), feed_config(10, 30)).unwrap();

    sleep(Duration::from_secs(25)).await;
    controller.set_lifetime(handle, Duration::from_secs(60)).unwrap();
    sleep(Duration::from_secs(50)).await;

    assert_eq!(source.poll_count(), 6);
    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Expired);
}

#[tokio::test(start_paused = true)]
async fn test_resume_after_lifetime_elapsed_expires_feed() {
    let controller = FeedController::default();
    let (handle, _events) = controller
        .start(ScriptedSource::healthy(), feed_config(10, 60))
        .unwrap();

    sleep(Duration::from_secs(5)).await;
    controller.pause(handle).unwrap();
    controller.set_lifetime(handle, Duration::from_secs(1)).unwrap();

    assert!(matches!(
        controller.resume(handle),
        Err(FeedError::LifetimeElapsed(h)) if h == handle
    ));
    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Expired);
}

#[tokio::test(start_paused = true)]
async fn test_paused_feed_still_expires() {
    let controller = FeedController::default();
    let (handle, mut events) = controller
        .start(ScriptedSource::healthy(), feed_config(10, 20))
        .unwrap();

    sleep(Duration::from_secs(5)).await;
    controller.pause(handle).unwrap();
    sleep(Duration::from_secs(30)).await;

    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Expired);
    assert_eq!(collect_until_end(&mut events).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failing_poll_keeps_feed_running() {
    let controller = FeedController::default();
    let source = ScriptedSource::failing();
    let (handle, mut events) = controller.start(source.clone(), feed_config(10, 100)).unwrap();

    sleep(Duration::from_secs(25)).await;

    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Running);
    let failures: Vec<u32> = drain_queued(&mut events)
        .into_iter()
        .map(|event| match event {
            FeedEvent::Failure {
                consecutive_failures,
                ..
            } => consecutive_failures,
            FeedEvent::Success { .. } => panic!("unexpected success"),
        })
        .collect();
    assert_eq!(failures, vec![1, 2, 3]);

    let metrics = controller.metrics(handle).unwrap();
    assert_eq!(metrics.polls_attempted, 3);
    assert_eq!(metrics.failures, 3);
    assert_eq!(metrics.success_rate(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_failure_policy_fails_feed() {
    let controller = FeedController::default();
    let source = ScriptedSource::failing();
    let configuration =
        feed_config(10, 100).with_failure_policy(FailurePolicy::StopAfterConsecutive(2));
    let (handle, mut events) = controller.start(source.clone(), configuration).unwrap();

    sleep(Duration::from_secs(60)).await;

    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Failed);
    assert_eq!(source.poll_count(), 2);
    assert_eq!(collect_until_end(&mut events).await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_success_resets_failure_count() {
    let controller = FeedController::default();
    let source = ScriptedSource::with_script(
        vec![
            Outcome::HttpError(500),
            Outcome::Body("[]".to_string()),
            Outcome::HttpError(500),
        ],
        Outcome::HttpError(502),
    );
    let configuration =
        feed_config(10, 100).with_failure_policy(FailurePolicy::StopAfterConsecutive(2));
    let (handle, _events) = controller.start(source.clone(), configuration).unwrap();

    sleep(Duration::from_secs(60)).await;

    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Failed);
    assert_eq!(source.poll_count(), 4);
    let metrics = controller.metrics(handle).unwrap();
    assert_eq!(metrics.successes, 1);
    assert_eq!(metrics.failures, 3);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_stop_is_idempotent() {
    let controller = FeedController::default();
    let (handle, _events) = controller
        .start(ScriptedSource::healthy(), feed_config(10, 60))
        .unwrap();
    sleep(Duration::from_secs(1)).await;

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.stop(handle) }
    });
    let second = tokio::spawn({
        let controller = controller.clone();
        async move { controller.stop(handle) }
    });

    assert_eq!(first.await.unwrap().unwrap(), FeedStatus::Stopped);
    assert_eq!(second.await.unwrap().unwrap(), FeedStatus::Stopped);
    assert_eq!(controller.stop(handle).unwrap(), FeedStatus::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stop_after_expiry_reports_expired() {
    let controller = FeedController::default();
    let (handle, _events) = controller
        .start(ScriptedSource::healthy(), feed_config(10, 10))
        .unwrap();
    sleep(Duration::from_secs(15)).await;

    assert_eq!(controller.stop(handle).unwrap(), FeedStatus::Expired);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_in_flight_poll() {
    let controller = FeedController::default();
    let source = ScriptedSource::slow(Duration::from_secs(5));
    let (handle, mut events) = controller.start(source.clone(), feed_config(10, 60)).unwrap();

    sleep(Duration::from_secs(2)).await;
    assert_eq!(source.poll_count(), 1);
    controller.stop(handle).unwrap();

    sleep(Duration::from_secs(10)).await;
    assert!(events.recv().await.is_none());

    let metrics = controller.metrics(handle).unwrap();
    assert_eq!(metrics.polls_attempted, 1);
    assert_eq!(metrics.successes, 0);
}

#[tokio::test(start_paused = true)]
async fn test_pause_lets_in_flight_poll_finish() {
    let controller = FeedController::default();
    let source = ScriptedSource::slow(Duration::from_secs(5));
    let (handle, mut events) = controller.start(source.clone(), feed_config(10, 60)).unwrap();

    sleep(Duration::from_secs(2)).await;
    controller.pause(handle).unwrap();
    sleep(Duration::from_secs(20)).await;

    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Paused);
    assert_eq!(source.poll_count(), 1);
    let delivered = drain_queued(&mut events);
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].is_success());
}

#[tokio::test(start_paused = true)]
async fn test_feeds_run_independently() {
    let controller = FeedController::default();
    let slow_source = ScriptedSource::healthy();
    let fast_source = ScriptedSource::healthy();

    let (slow, _slow_events) = controller.start(slow_source.clone(), feed_config(10, 21)).unwrap();
    let (fast, _fast_events) = controller.start(fast_source.clone(), feed_config(5, 21)).unwrap();
    assert_eq!(controller.active_count(), 2);

    sleep(Duration::from_secs(7)).await;
    controller.stop(fast).unwrap();
    sleep(Duration::from_secs(30)).await;

    assert_eq!(fast_source.poll_count(), 2);
    assert_eq!(slow_source.poll_count(), 3);
    assert_eq!(controller.status(slow).unwrap(), FeedStatus::Expired);
    assert_eq!(controller.status(fast).unwrap(), FeedStatus::Stopped);
    assert_eq!(controller.handles().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_handler_can_stop_feed() {
    let controller = FeedController::default();
    let source = ScriptedSource::with_script(
        vec![Outcome::Body("[]".to_string()), Outcome::Body("[]".to_string())],
        Outcome::HttpError(404),
    );
    let (handle, events) = controller.start(source.clone(), feed_config(10, 100)).unwrap();

    let successes = Arc::new(AtomicUsize::new(0));
    let failures = Arc::new(AtomicUsize::new(0));
    let worker = events.dispatch(
        {
            let successes = Arc::clone(&successes);
            move |_, _| {
                successes.fetch_add(1, Ordering::SeqCst);
            }
        },
        {
            let failures = Arc::clone(&failures);
            let controller = controller.clone();
            move |handle, _| {
                failures.fetch_add(1, Ordering::SeqCst);
                let _ = controller.stop(handle);
            }
        },
    );

    sleep(Duration::from_secs(40)).await;
    worker.await.unwrap();

    assert_eq!(successes.load(Ordering::SeqCst), 2);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Stopped);
    assert_eq!(source.poll_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_access_continuous_polls_subscribed_offering() {
    let marketplace = InMemoryMarketplace::new();
    marketplace.register_consumer("app", "secret");
    let description = SubscribableOfferingDescription {
        id: OfferingId::new("parking-barcelona"),
        name: "Barcelona Parking".to_string(),
        information: Information::new("Parking", "bigiot:Parking"),
        city: Some("Barcelona".to_string()),
        price: Price::euros(0.001),
        pricing_model: PricingModel::PerAccess,
        license: LicenseType::OpenDataLicense,
        endpoint_host: "localhost".to_string(),
        activated: true,
    };
    marketplace.register_static(description.clone(), r#"[{"status": "available"}]"#);
    marketplace
        .authenticate(&ConsumerConfig::new("app", "https://market.example"), "secret")
        .await
        .unwrap();
    let offering = marketplace.subscribe(&description).await.unwrap();

    let controller = FeedController::default();
    let (handle, mut events) = controller
        .access_continuous(&offering, AccessParameters::empty(), Duration::from_secs(25))
        .unwrap();

    sleep(Duration::from_secs(30)).await;

    assert_eq!(controller.status(handle).unwrap(), FeedStatus::Expired);
    assert_eq!(marketplace.access_count(&description.id), 3);
    let delivered = collect_until_end(&mut events).await;
    assert_eq!(delivered.len(), 3);
    match &delivered[0] {
        FeedEvent::Success { response, .. } => {
            assert_eq!(response.element_count().unwrap(), 1)
        }
        FeedEvent::Failure { error, .. } => panic!("unexpected failure: {}", error),
    }
}
