//! Test fixtures: clusters, timestamps and seeded topics.

use chrono::{DateTime, Duration, TimeZone, Utc};
use kafka_gateway::{CommittedOffset, MemberDescription, TopicPartition};
use viewer_core::{Cluster, ClusterId, ClusterStatus};

use crate::mocks::MockGateway;

/// Fixed base time for seeded records.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// `base_time()` plus `secs` seconds.
pub fn at(secs: i64) -> DateTime<Utc> {
    base_time() + Duration::seconds(secs)
}

pub fn cluster(id: ClusterId, name: &str) -> Cluster {
    Cluster::new(id, name, format!("{}.kafka.test", name), 9092)
}

pub fn inactive_cluster(id: ClusterId, name: &str) -> Cluster {
    cluster(id, name).with_status(ClusterStatus::Inactive)
}

/// Topic `orders` with two partitions holding offsets `[0,100)` and `[0,50)`.
///
/// Partition 0 record `i` is stamped `at(2 * i)`, partition 1 record `i` is
/// stamped `at(4 * i)`, so both partitions end up sharing some timestamps.
pub fn seed_orders(gateway: &MockGateway) {
    gateway.add_topic("orders", 2);
    for i in 0..100 {
        let key = format!("order-{}", i);
        gateway.push("orders", 0, Some(key.as_bytes()), &format!("{{\"id\":{},\"p\":0}}", i), at(2 * i));
    }
    for i in 0..50 {
        gateway.push("orders", 1, None, &format!("{{\"id\":{},\"p\":1}}", i), at(4 * i));
    }
}

/// Topic `logs` with one partition of mixed-case text values.
pub fn seed_logs(gateway: &MockGateway) {
    gateway.add_topic("logs", 1);
    let lines = [
        "service started",
        "Disk ERROR on node-3",
        "request served",
        "error: timeout talking to db",
        "request served",
    ];
    for (i, line) in lines.iter().enumerate() {
        gateway.push("logs", 0, Some(b""), line, at(i as i64));
    }
}

pub fn member(id: &str, assignment: &[(&str, i32)]) -> MemberDescription {
    MemberDescription {
        member_id: id.to_string(),
        client_id: format!("{}-client", id),
        host: "/10.0.0.1".to_string(),
        assignment: assignment
            .iter()
            .map(|(topic, partition)| TopicPartition::new(*topic, *partition))
            .collect(),
    }
}

pub fn committed(topic: &str, partition: i32, offset: i64) -> CommittedOffset {
    CommittedOffset {
        topic: topic.to_string(),
        partition,
        offset,
    }
}
