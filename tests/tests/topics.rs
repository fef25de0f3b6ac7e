//! Topic listing, message counts, partition view and cluster lifecycle.

use integration_tests::{fixtures, setup::TestContext};
use telemetry::health;
use viewer_core::{
    ConsumerFilter, EntityKey, Error, GroupState, MessageQuery, OutgoingMessage, TopicFilter,
};

fn two_clusters() -> TestContext {
    let ctx = TestContext::new(vec![
        fixtures::cluster(1, "prod"),
        fixtures::cluster(2, "dr"),
    ]);
    fixtures::seed_orders(&ctx.gateway(1));
    fixtures::seed_logs(&ctx.gateway(1));
    fixtures::seed_orders(&ctx.gateway(2));
    ctx
}

fn keys(topics: &[viewer_core::TopicInfo]) -> Vec<(String, u32)> {
    topics.iter().map(|t| (t.name.clone(), t.cluster_id)).collect()
}

/// Same-named topics on two clusters stay separate entries
#[tokio::test]
async fn test_topics_from_every_cluster() {
    let ctx = two_clusters();

    let topics = ctx.inspector.get_topics(&TopicFilter::default()).await;

    assert_eq!(
        keys(&topics),
        vec![
            ("logs".to_string(), 1),
            ("orders".to_string(), 1),
            ("orders".to_string(), 2),
        ]
    );
    let dr_orders = &topics[2];
    assert_eq!(dr_orders.cluster_name, "dr");
    assert_eq!(dr_orders.partitions, 2);
    assert_eq!(dr_orders.messages, None);
}

#[tokio::test]
async fn test_name_filter_is_case_insensitive_substring() {
    let ctx = two_clusters();

    let topics = ctx.inspector.get_topics(&TopicFilter::by_name("ORD")).await;

    assert_eq!(topics.len(), 2);
    assert!(topics.iter().all(|t| t.name == "orders"));
    assert!(ctx
        .inspector
        .get_topics(&TopicFilter::by_name("missing"))
        .await
        .is_empty());
}

#[tokio::test]
async fn test_retention_days() {
    let ctx = TestContext::new(vec![fixtures::cluster(1, "prod")]);
    let gw = ctx.gateway(1);
    gw.add_topic("short", 1);
    gw.set_retention_ms("short", 3 * 86_400_000);
    gw.add_topic("forever", 1);
    gw.set_retention_ms("forever", -1);
    gw.add_topic("unset", 1);

    let topics = ctx.inspector.get_topics(&TopicFilter::default()).await;

    let retention: Vec<(&str, i64)> = topics
        .iter()
        .map(|t| (t.name.as_str(), t.retention_days))
        .collect();
    assert_eq!(retention, vec![("forever", -1), ("short", 3), ("unset", 7)]);
}

#[tokio::test]
async fn test_inactive_cluster_is_not_listed() {
    let ctx = TestContext::new(vec![
        fixtures::cluster(1, "prod"),
        fixtures::inactive_cluster(2, "staging"),
    ]);
    fixtures::seed_orders(&ctx.gateway(1));
    fixtures::seed_logs(&ctx.gateway(2));

    let topics = ctx.inspector.get_topics(&TopicFilter::default()).await;

    assert_eq!(keys(&topics), vec![("orders".to_string(), 1)]);
}

#[tokio::test]
async fn test_unreachable_cluster_is_left_out() {
    let ctx = TestContext::new(vec![
        fixtures::cluster(51, "east"),
        fixtures::cluster(52, "west"),
    ]);
    fixtures::seed_orders(&ctx.gateway(51));
    fixtures::seed_orders(&ctx.gateway(52));
    ctx.gateway(52).set_down(true);

    assert_eq!(ctx.inspector.load_topics().await, 1);

    let topics = ctx.inspector.get_topics(&TopicFilter::default()).await;
    assert_eq!(keys(&topics), vec![("orders".to_string(), 51)]);
    assert!(!health().cluster(52).unwrap().healthy);
    assert!(health().cluster(51).unwrap().healthy);
}

#[tokio::test]
async fn test_listing_is_served_from_cache() {
    let ctx = two_clusters();

    ctx.inspector.get_topics(&TopicFilter::default()).await;
    let connects = ctx.connector.connects();
    ctx.inspector.get_topics(&TopicFilter::by_name("logs")).await;

    assert_eq!(ctx.connector.connects(), connects);
}

#[tokio::test]
async fn test_message_count_refresh() {
    let ctx = two_clusters();
    ctx.inspector.load_topics().await;
    ctx.gateway(1).truncate("orders", 0, 30);

    let count = ctx.inspector.refresh_message_count(1, "orders").await.unwrap();
    assert_eq!(count, 70 + 50);

    let cache = ctx.inspector.topic_cache();
    assert_eq!(cache.get(&EntityKey::new(1, "orders")).unwrap().messages, Some(120));
    // Only the refreshed entry changes
    assert_eq!(cache.get(&EntityKey::new(2, "orders")).unwrap().messages, None);

    // A metadata reload keeps the known count
    ctx.inspector.load_topics().await;
    assert_eq!(cache.get(&EntityKey::new(1, "orders")).unwrap().messages, Some(120));
}

#[tokio::test]
async fn test_refresh_all_message_counts() {
    let ctx = two_clusters();
    ctx.inspector.load_topics().await;

    assert_eq!(ctx.inspector.refresh_all_message_counts().await, 3);

    let topics = ctx.inspector.get_topics(&TopicFilter::default()).await;
    let counts: Vec<Option<i64>> = topics.iter().map(|t| t.messages).collect();
    assert_eq!(counts, vec![Some(5), Some(150), Some(150)]);
}

#[tokio::test]
async fn test_message_count_errors() {
    let ctx = two_clusters();
    ctx.gateway(1).fail_watermarks("orders", 1);

    assert!(matches!(
        ctx.inspector.refresh_message_count(1, "orders").await,
        Err(Error::PartitionRead { partition: 1, .. })
    ));
    assert!(matches!(
        ctx.inspector.refresh_message_count(1, "payments").await,
        Err(Error::TopicNotFound { .. })
    ));
}

#[tokio::test]
async fn test_partition_view() {
    let ctx = two_clusters();
    ctx.gateway(1).truncate("orders", 0, 40);

    let view = ctx.inspector.get_topic_partitions(1, "orders").await.unwrap();

    assert_eq!(view.topic, "orders");
    assert_eq!(view.cluster_id, 1);
    assert_eq!(view.partitions.len(), 2);
    assert_eq!((view.partitions[0].low, view.partitions[0].high), (40, 100));
    assert_eq!((view.partitions[1].low, view.partitions[1].high), (0, 50));
    assert_eq!(view.total_messages, 60 + 50);
}

#[tokio::test]
async fn test_partition_view_skips_unreadable_partition() {
    let ctx = two_clusters();
    ctx.gateway(1).fail_watermarks("orders", 0);

    let view = ctx.inspector.get_topic_partitions(1, "orders").await.unwrap();

    assert_eq!(view.partitions.len(), 1);
    assert_eq!(view.partitions[0].partition, 1);
    assert_eq!(view.total_messages, 50);
}

#[tokio::test]
async fn test_partition_view_errors() {
    let ctx = TestContext::new(vec![
        fixtures::cluster(1, "prod"),
        fixtures::inactive_cluster(2, "staging"),
    ]);
    fixtures::seed_orders(&ctx.gateway(1));

    assert!(matches!(
        ctx.inspector.get_topic_partitions(1, "payments").await,
        Err(Error::TopicNotFound { .. })
    ));
    assert!(matches!(
        ctx.inspector.get_topic_partitions(2, "orders").await,
        Err(Error::ClusterInactive { cluster_id: 2 })
    ));
    assert!(matches!(
        ctx.inspector.get_topic_partitions(7, "orders").await,
        Err(Error::ClusterNotFound(7))
    ));
}

#[tokio::test]
async fn test_reload_prunes_vanished_topics() {
    let ctx = two_clusters();
    ctx.inspector.load_topics().await;

    ctx.gateway(1).remove_topic("logs");
    ctx.inspector.load_topics().await;

    let topics = ctx.inspector.get_topics(&TopicFilter::default()).await;
    assert_eq!(
        keys(&topics),
        vec![("orders".to_string(), 1), ("orders".to_string(), 2)]
    );
}

/// Removing a cluster drops its cached entries and its connection
#[tokio::test]
async fn test_remove_cluster_evicts_everything() {
    let ctx = two_clusters();
    ctx.gateway(2)
        .add_group("billing", GroupState::Stable, vec![], vec![fixtures::committed("orders", 0, 1)]);
    ctx.inspector.load_topics().await;
    ctx.inspector.load_consumer_groups().await;

    let removed = ctx.inspector.remove_cluster(2).await.unwrap();
    assert_eq!(removed.name, "dr");

    assert_eq!(ctx.connector.invalidated(), vec![2]);
    assert!(ctx
        .inspector
        .get_topics(&TopicFilter::default())
        .await
        .iter()
        .all(|t| t.cluster_id == 1));
    assert!(ctx.inspector.topic_cache().get(&EntityKey::new(2, "orders")).is_none());
    assert!(ctx
        .inspector
        .get_consumers(&ConsumerFilter::default())
        .await
        .is_empty());
    assert!(ctx.inspector.list_clusters().iter().all(|c| c.id != 2));

    assert!(matches!(
        ctx.inspector.remove_cluster(2).await,
        Err(Error::ClusterNotFound(2))
    ));
}

#[tokio::test]
async fn test_update_cluster_takes_effect_on_reload() {
    let ctx = two_clusters();
    ctx.inspector.load_topics().await;

    let renamed = fixtures::cluster(2, "dr-eu");
    let updated = ctx.inspector.update_cluster(renamed).await.unwrap();
    assert_eq!(updated.name, "dr-eu");
    assert_eq!(ctx.connector.invalidated(), vec![2]);
    assert!(ctx.inspector.topic_cache().get(&EntityKey::new(2, "orders")).is_none());

    ctx.inspector.load_topics().await;
    let entry = ctx.inspector.topic_cache().get(&EntityKey::new(2, "orders")).unwrap();
    assert_eq!(entry.cluster_name, "dr-eu");
}

#[tokio::test]
async fn test_add_cluster_assigns_id() {
    let ctx = TestContext::new(vec![fixtures::cluster(1, "prod")]);

    let added = ctx.inspector.add_cluster(fixtures::cluster(0, "edge")).unwrap();

    assert!(added.id > 1);
    assert_eq!(ctx.inspector.list_clusters().len(), 2);
    assert!(ctx.inspector.add_cluster(viewer_core::Cluster::new(0, "bad", "", 9092)).is_err());
}

#[tokio::test]
async fn test_send_message() {
    let ctx = two_clusters();
    let keyless = OutgoingMessage {
        topic: "orders".into(),
        key: None,
        value: "{\"id\":1000}".into(),
    };

    let sent = ctx.inspector.send_message(1, &keyless).await.unwrap();
    assert_eq!(sent.partition, 0);
    assert_eq!(sent.offset, 100);

    let keyed = OutgoingMessage {
        key: Some("order-7".into()),
        ..keyless.clone()
    };
    let first = ctx.inspector.send_message(1, &keyed).await.unwrap();
    let second = ctx.inspector.send_message(1, &keyed).await.unwrap();
    assert_eq!(first.partition, second.partition);
    assert_eq!(second.offset, first.offset + 1);
    assert_eq!(ctx.gateway(1).sent().len(), 3);

    // The sent message is the newest one on its partition
    let found = ctx
        .inspector
        .search_messages(&MessageQuery::new(1, "orders").with_query("\"id\":1000"))
        .await
        .unwrap();
    assert_eq!(found.messages.len(), 3);
    assert!(ctx.gateway(2).sent().is_empty());
}

#[tokio::test]
async fn test_send_to_unknown_topic_fails() {
    let ctx = two_clusters();
    let message = OutgoingMessage {
        topic: "payments".into(),
        key: None,
        value: "{}".into(),
    };

    assert!(matches!(
        ctx.inspector.send_message(1, &message).await,
        Err(Error::TopicNotFound { .. })
    ));
    assert!(ctx.gateway(1).sent().is_empty());
}
