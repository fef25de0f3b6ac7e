//! Consumer lag: committed offsets against high watermarks, per group.

use crate::config::LagConfig;
use kafka_gateway::{BrokerGateway, CommittedOffset, GroupDescription, MemberDescription};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use viewer_core::{
    member_summary, total_lag, Cluster, ConsumerGroup, GroupMember, GroupStatus, PartitionLag,
    Result,
};

/// High watermarks fetched during one lag computation.
///
/// `None` records a failed lookup so a bad partition is asked once.
#[derive(Default)]
struct WatermarkMemo {
    marks: Mutex<HashMap<(String, i32), Option<i64>>>,
}

impl WatermarkMemo {
    async fn high(&self, gateway: &dyn BrokerGateway, topic: &str, partition: i32) -> Option<i64> {
        let key = (topic.to_string(), partition);
        let known = self.marks.lock().get(&key).copied();
        if let Some(known) = known {
            return known;
        }

        let high = match gateway.watermarks(topic, partition).await {
            Ok(marks) => Some(marks.high),
            Err(e) => {
                warn!(topic = %topic, partition, error = %e, "Watermark lookup failed, partition skipped");
                None
            }
        };
        self.marks.lock().insert(key, high);
        high
    }
}

pub struct LagEngine {
    config: LagConfig,
}

impl LagEngine {
    pub fn new(config: LagConfig) -> Self {
        Self { config }
    }

    /// Lag for the given groups of one cluster, or every group when `group_ids` is `None`.
    ///
    /// A failed listing or describe fails the whole call. Groups that cannot
    /// be described are left out; a group whose offsets cannot be read comes
    /// back with status `Error` and no partitions.
    pub async fn load_groups(
        &self,
        gateway: Arc<dyn BrokerGateway>,
        cluster: &Cluster,
        group_ids: Option<Vec<String>>,
    ) -> Result<Vec<ConsumerGroup>> {
        let started = Instant::now();
        metrics().group_queries.inc();

        let group_ids = match group_ids {
            Some(ids) => ids,
            None => gateway.list_groups().await?,
        };
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let descriptions = gateway.describe_groups(&group_ids).await?;
        let described: HashSet<&str> = descriptions.iter().map(|d| d.group_id.as_str()).collect();
        for missing in group_ids.iter().filter(|id| !described.contains(id.as_str())) {
            debug!(cluster_id = cluster.id, group_id = %missing, "Group missing from describe");
        }

        let memo = Arc::new(WatermarkMemo::default());
        let permits = Arc::new(Semaphore::new(self.config.group_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for description in descriptions {
            if let Some(error) = &description.error {
                warn!(
                    cluster_id = cluster.id,
                    group_id = %description.group_id,
                    error = %error,
                    "Group describe failed, group omitted"
                );
                metrics().group_failures.inc();
                continue;
            }

            let gateway = gateway.clone();
            let cluster = cluster.clone();
            let memo = memo.clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                resolve_group(&*gateway, &cluster, description, &memo).await
            });
        }

        let mut groups = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(group) => groups.push(group),
                Err(e) => {
                    warn!(cluster_id = cluster.id, error = %e, "Group lag task aborted");
                    metrics().group_failures.inc();
                }
            }
        }
        groups.sort_by(|a, b| a.group_id.cmp(&b.group_id));

        let elapsed = started.elapsed();
        metrics().lag_latency_ms.observe(elapsed.as_millis() as u64);
        info!(
            cluster_id = cluster.id,
            groups = groups.len(),
            latency_ms = %elapsed.as_millis(),
            "Computed consumer lag"
        );

        Ok(groups)
    }
}

async fn resolve_group(
    gateway: &dyn BrokerGateway,
    cluster: &Cluster,
    description: GroupDescription,
    memo: &WatermarkMemo,
) -> ConsumerGroup {
    let mut group = ConsumerGroup {
        group_id: description.group_id.clone(),
        member_summary: member_summary(description.members.len()),
        lag: 0,
        status: description.state.status(),
        cluster_id: cluster.id,
        cluster_name: cluster.name.clone(),
        members: None,
        partitions: None,
    };

    let committed = match gateway.committed_offsets(&description.group_id).await {
        Ok(committed) => committed,
        Err(e) => {
            warn!(
                cluster_id = cluster.id,
                group_id = %description.group_id,
                error = %e,
                "Committed offsets unavailable"
            );
            metrics().group_failures.inc();
            group.status = GroupStatus::Error;
            return group;
        }
    };

    let partitions = partition_lags(gateway, committed, memo).await;
    let members = attribute_members(&description.members, &partitions);

    group.lag = total_lag(&partitions);
    group.members = (!members.is_empty()).then_some(members);
    group.partitions = Some(partitions);
    group
}

async fn partition_lags(
    gateway: &dyn BrokerGateway,
    committed: Vec<CommittedOffset>,
    memo: &WatermarkMemo,
) -> Vec<PartitionLag> {
    let mut partitions = Vec::with_capacity(committed.len());
    // Negative offsets mean the group never committed on that partition
    for offset in committed.into_iter().filter(|c| c.offset >= 0) {
        if let Some(high) = memo.high(gateway, &offset.topic, offset.partition).await {
            partitions.push(PartitionLag::new(
                offset.topic,
                offset.partition,
                offset.offset,
                high,
            ));
        }
    }
    partitions.sort_by(|a, b| (&a.topic, a.partition).cmp(&(&b.topic, b.partition)));
    partitions
}

/// Members with the lag records of their assigned partitions.
///
/// Members whose assignment has no committed partition are dropped.
fn attribute_members(members: &[MemberDescription], partitions: &[PartitionLag]) -> Vec<GroupMember> {
    members
        .iter()
        .filter_map(|member| {
            let assigned: Vec<PartitionLag> = partitions
                .iter()
                .filter(|lag| {
                    member
                        .assignment
                        .iter()
                        .any(|tp| lag.is_for(&tp.topic, tp.partition))
                })
                .cloned()
                .collect();
            (!assigned.is_empty()).then(|| GroupMember {
                member_id: member.member_id.clone(),
                client_id: member.client_id.clone(),
                host: member.host.clone(),
                partitions: assigned,
            })
        })
        .collect()
}
