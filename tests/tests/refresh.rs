//! Background refresh against mock clusters.

use std::sync::Arc;
use std::time::Duration;

use integration_tests::{fixtures, setup::TestContext};
use viewer_core::{EntityKey, GroupState};
use worker::{RefreshConfig, RefreshScheduler, RefreshWorker};

#[tokio::test]
async fn test_refresh_passes_fill_caches() {
    let ctx = TestContext::new(vec![fixtures::cluster(1, "prod")]);
    let gw = ctx.gateway(1);
    fixtures::seed_orders(&gw);
    gw.add_group("billing", GroupState::Stable, vec![], vec![fixtures::committed("orders", 1, 45)]);
    let worker = RefreshWorker::new(ctx.inspector.clone());

    assert!(worker.topics_cold());
    assert_eq!(worker.refresh_topics().await, Ok(1));
    assert!(!worker.topics_cold());

    assert_eq!(worker.refresh_message_counts().await, Ok(1));
    let orders = ctx
        .inspector
        .topic_cache()
        .get(&EntityKey::new(1, "orders"))
        .unwrap();
    assert_eq!(orders.messages, Some(150));

    assert_eq!(worker.refresh_consumer_groups().await, Ok(1));
    let billing = ctx
        .inspector
        .consumer_cache()
        .get(&EntityKey::new(1, "billing"))
        .unwrap();
    assert_eq!(billing.lag, 5);
}

#[tokio::test]
async fn test_refresh_fails_when_no_cluster_answers() {
    let ctx = TestContext::new(vec![fixtures::cluster(1, "prod")]);
    ctx.gateway(1).set_down(true);
    let worker = RefreshWorker::new(ctx.inspector.clone());

    assert!(worker.refresh_topics().await.is_err());
    assert!(worker.refresh_consumer_groups().await.is_err());
    assert_eq!(worker.probe_clusters().await, 0);
}

#[tokio::test]
async fn test_refresh_without_clusters_is_not_an_error() {
    let ctx = TestContext::new(vec![]);
    let worker = RefreshWorker::new(ctx.inspector.clone());

    assert_eq!(worker.refresh_topics().await, Ok(0));
    assert_eq!(worker.refresh_message_counts().await, Ok(0));
}

/// Every loop runs once right after start
#[tokio::test]
async fn test_scheduler_warms_caches_on_start() {
    let ctx = TestContext::new(vec![fixtures::cluster(1, "prod")]);
    let gw = ctx.gateway(1);
    fixtures::seed_orders(&gw);
    gw.add_group("billing", GroupState::Stable, vec![], vec![fixtures::committed("orders", 0, 1)]);

    let scheduler = Arc::new(RefreshScheduler::new(
        RefreshConfig::default(),
        ctx.inspector.clone(),
    ));
    let handles = scheduler.start();
    assert_eq!(handles.len(), 4);

    tokio::time::sleep(Duration::from_millis(200)).await;
    for handle in handles {
        handle.abort();
    }

    assert!(!ctx.inspector.topic_cache().is_cold());
    assert!(!ctx.inspector.consumer_cache().is_cold());
    assert_eq!(ctx.inspector.consumer_cache().len(), 1);
}

#[tokio::test]
async fn test_disabled_scheduler_starts_nothing() {
    let ctx = TestContext::new(vec![fixtures::cluster(1, "prod")]);
    let config = RefreshConfig {
        enabled: false,
        ..RefreshConfig::default()
    };

    let handles = Arc::new(RefreshScheduler::new(config, ctx.inspector.clone())).start();

    assert!(handles.is_empty());
    assert!(ctx.inspector.topic_cache().is_cold());
}
