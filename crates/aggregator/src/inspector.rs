//! Aggregation orchestrator.
//!
//! The [`Inspector`] fans requests out over the active clusters of the
//! registry, runs the search and lag engines, merges what comes back and
//! keeps the metadata caches current. A cluster that fails is logged,
//! marked unhealthy and left out; requests aimed at a single cluster or
//! topic propagate their error instead.

use crate::cache::{ConsumerCache, TopicCache};
use crate::config::{LagConfig, SearchConfig};
use crate::lag::LagEngine;
use crate::registry::BrokerRegistry;
use crate::search::{SearchEngine, SearchOutcome};
use kafka_gateway::health::check_connection;
use kafka_gateway::partitioner::choose_partition;
use kafka_gateway::{BrokerGateway, GatewayConnector};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use telemetry::{health, metrics};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use validator::Validate;
use viewer_core::limits::DEFAULT_RETENTION_DAYS;
use viewer_core::{
    retention_days_from_ms, Cluster, ClusterId, ConsumerFilter, ConsumerGroup, EntityKey, Error,
    MessageQuery, OutgoingMessage, PartitionInfo, Result, SentMessage, TopicFilter, TopicInfo,
    TopicPartitions,
};

pub struct Inspector {
    registry: Arc<BrokerRegistry>,
    connector: Arc<dyn GatewayConnector>,
    topics: Arc<TopicCache>,
    consumers: Arc<ConsumerCache>,
    search: SearchEngine,
    lag: Arc<LagEngine>,
}

impl Inspector {
    pub fn new(
        registry: Arc<BrokerRegistry>,
        connector: Arc<dyn GatewayConnector>,
        search: SearchConfig,
        lag: LagConfig,
    ) -> Self {
        Self {
            registry,
            connector,
            topics: Arc::new(TopicCache::new()),
            consumers: Arc::new(ConsumerCache::new()),
            search: SearchEngine::new(search),
            lag: Arc::new(LagEngine::new(lag)),
        }
    }

    pub fn registry(&self) -> &BrokerRegistry {
        &self.registry
    }

    pub fn topic_cache(&self) -> &TopicCache {
        &self.topics
    }

    pub fn consumer_cache(&self) -> &ConsumerCache {
        &self.consumers
    }

    pub fn search_engine(&self) -> &SearchEngine {
        &self.search
    }

    async fn gateway(&self, cluster: &Cluster) -> Result<Arc<dyn BrokerGateway>> {
        self.connector.connect(cluster).await
    }

    fn active_ids(&self) -> HashSet<ClusterId> {
        self.registry.active().into_iter().map(|c| c.id).collect()
    }

    // ---- Topics ----

    /// Cached topics of active clusters matching `filter`, ordered by name then cluster.
    ///
    /// A cold cache is filled by one full reload first.
    pub async fn get_topics(&self, filter: &TopicFilter) -> Vec<TopicInfo> {
        if self.topics.is_cold() {
            self.load_topics().await;
        }

        let active = self.active_ids();
        let mut topics: Vec<TopicInfo> = self
            .topics
            .snapshot()
            .into_iter()
            .filter(|t| active.contains(&t.cluster_id) && filter.matches(t))
            .collect();
        topics.sort_by(|a, b| (&a.name, a.cluster_id).cmp(&(&b.name, b.cluster_id)));
        topics
    }

    /// Reloads topic metadata from every active cluster.
    ///
    /// Returns the number of clusters that answered. Known message counts
    /// survive the reload; topics a cluster no longer lists are dropped.
    pub async fn load_topics(&self) -> usize {
        let started = Instant::now();
        let connector = self.connector.clone();

        let results = fan_out(self.registry.active(), move |cluster| {
            let connector = connector.clone();
            async move { list_cluster_topics(&*connector, &cluster).await }
        })
        .await;

        let mut loaded = 0;
        for (cluster, result) in results {
            match result {
                Ok(topics) => {
                    let names: Vec<String> = topics.iter().map(|t| t.name.clone()).collect();
                    let topics = topics.into_iter().map(|mut topic| {
                        if let Some(known) = self.topics.get(&topic.key()) {
                            topic.messages = known.messages;
                        }
                        topic
                    });
                    self.topics.upsert_all(topics.collect::<Vec<_>>());

                    let pruned = self.topics.retain_cluster(cluster.id, &names);
                    if pruned > 0 {
                        debug!(cluster_id = cluster.id, pruned, "Pruned vanished topics");
                    }
                    health().mark_healthy(cluster.id, &cluster.name);
                    loaded += 1;
                }
                Err(e) => cluster_failed(&cluster, "load topics", &e),
            }
        }

        self.topics.mark_loaded();
        metrics().topic_refreshes.inc();
        metrics().cached_topics.set(self.topics.len() as u64);
        metrics()
            .topic_load_latency_ms
            .observe(started.elapsed().as_millis() as u64);
        info!(
            clusters = loaded,
            topics = self.topics.len(),
            latency_ms = %started.elapsed().as_millis(),
            "Loaded topics"
        );
        loaded
    }

    /// Recomputes one topic's message count and stores it on its cache entry.
    pub async fn refresh_message_count(&self, cluster_id: ClusterId, topic: &str) -> Result<i64> {
        let cluster = self.registry.get_active(cluster_id)?;
        let gateway = self.gateway(&cluster).await?;
        let partitions = topic_partition_ids(&*gateway, cluster_id, topic).await?;

        let mut count = 0;
        for partition in partitions {
            count += gateway.watermarks(topic, partition).await?.message_count();
        }

        self.topics
            .update(&EntityKey::new(cluster_id, topic), |t| t.messages = Some(count));
        metrics().message_count_refreshes.inc();
        debug!(cluster_id, topic = %topic, messages = count, "Refreshed message count");
        Ok(count)
    }

    /// Refreshes the message count of every cached topic on an active cluster.
    ///
    /// Returns how many counts were updated.
    pub async fn refresh_all_message_counts(&self) -> usize {
        let active = self.active_ids();
        let mut refreshed = 0;

        for topic in self.topics.snapshot() {
            if !active.contains(&topic.cluster_id) {
                continue;
            }
            match self.refresh_message_count(topic.cluster_id, &topic.name).await {
                Ok(_) => refreshed += 1,
                Err(e) => warn!(
                    cluster_id = topic.cluster_id,
                    topic = %topic.name,
                    error = %e,
                    "Message count refresh failed"
                ),
            }
        }
        refreshed
    }

    /// Watermarks of every partition of one topic.
    ///
    /// A partition whose watermarks cannot be read is left out.
    pub async fn get_topic_partitions(
        &self,
        cluster_id: ClusterId,
        topic: &str,
    ) -> Result<TopicPartitions> {
        let cluster = self.registry.get_active(cluster_id)?;
        let gateway = self.gateway(&cluster).await?;
        let ids = topic_partition_ids(&*gateway, cluster_id, topic).await?;

        let mut partitions = Vec::with_capacity(ids.len());
        for partition in ids {
            match gateway.watermarks(topic, partition).await {
                Ok(marks) => partitions.push(PartitionInfo {
                    partition,
                    low: marks.low,
                    high: marks.high,
                }),
                Err(e) => {
                    warn!(cluster_id, topic = %topic, partition, error = %e, "Partition skipped");
                    metrics().partition_failures.inc();
                }
            }
        }

        Ok(TopicPartitions {
            topic: topic.to_string(),
            cluster_id,
            total_messages: partitions.iter().map(|p| (p.high - p.low).max(0)).sum(),
            partitions,
        })
    }

    // ---- Messages ----

    pub async fn search_messages(&self, query: &MessageQuery) -> Result<SearchOutcome> {
        query.check()?;

        let cluster = self.registry.get_active(query.cluster_id)?;
        let gateway = self.gateway(&cluster).await?;
        let partitions = topic_partition_ids(&*gateway, cluster.id, &query.topic).await?;
        self.search.search(gateway, &partitions, query).await
    }

    /// Produces one message. Keyed messages hash onto a partition.
    pub async fn send_message(
        &self,
        cluster_id: ClusterId,
        message: &OutgoingMessage,
    ) -> Result<SentMessage> {
        message.validate()?;

        let cluster = self.registry.get_active(cluster_id)?;
        let gateway = self.gateway(&cluster).await?;
        let partitions = topic_partition_ids(&*gateway, cluster_id, &message.topic).await?;
        let partition = choose_partition(message.key.as_deref(), &partitions)
            .ok_or_else(|| Error::topic_not_found(cluster_id, &message.topic))?;

        let offset = gateway
            .send(&message.topic, partition, message.key.as_deref(), &message.value)
            .await?;
        debug!(cluster_id, topic = %message.topic, partition, offset, "Sent message");
        Ok(SentMessage {
            topic: message.topic.clone(),
            partition,
            offset,
        })
    }

    // ---- Consumers ----

    /// Consumer groups of active clusters.
    ///
    /// Without a topic the list is served from the cache. With a topic each
    /// active cluster is queried live for the groups known to consume it (or
    /// all groups when none are known), and the results are written back.
    pub async fn get_consumers(&self, filter: &ConsumerFilter) -> Vec<ConsumerGroup> {
        let mut groups = match filter.topic() {
            None => {
                if self.consumers.is_cold() {
                    self.load_consumer_groups().await;
                }
                let active = self.active_ids();
                self.consumers
                    .snapshot()
                    .into_iter()
                    .filter(|g| active.contains(&g.cluster_id))
                    .collect()
            }
            Some(topic) => self.consumers_for_topic(topic).await,
        };
        groups.sort_by(|a, b| (&a.group_id, a.cluster_id).cmp(&(&b.group_id, b.cluster_id)));
        groups
    }

    async fn consumers_for_topic(&self, topic: &str) -> Vec<ConsumerGroup> {
        let connector = self.connector.clone();
        let consumers = self.consumers.clone();
        let lag = self.lag.clone();
        let topic_name = topic.to_string();

        let results = fan_out(self.registry.active(), move |cluster| {
            let connector = connector.clone();
            let lag = lag.clone();
            let known: Vec<String> = consumers
                .snapshot()
                .into_iter()
                .filter(|g| g.cluster_id == cluster.id && g.references_topic(&topic_name))
                .map(|g| g.group_id)
                .collect();
            async move {
                let gateway = connector.connect(&cluster).await?;
                let known = (!known.is_empty()).then_some(known);
                lag.load_groups(gateway, &cluster, known).await
            }
        })
        .await;

        let mut scoped = Vec::new();
        for (cluster, result) in results {
            match result {
                Ok(groups) => {
                    scoped.extend(groups.iter().filter_map(|g| g.restricted_to_topic(topic)));
                    self.consumers.upsert_all(groups);
                    health().mark_healthy(cluster.id, &cluster.name);
                }
                Err(Error::Unsupported(reason)) => groups_unavailable(&cluster, &reason),
                Err(e) => cluster_failed(&cluster, "load consumer groups", &e),
            }
        }
        metrics().cached_groups.set(self.consumers.len() as u64);
        scoped
    }

    /// Reloads every consumer group of every active cluster into the cache.
    ///
    /// Returns the number of clusters that answered.
    pub async fn load_consumer_groups(&self) -> usize {
        let connector = self.connector.clone();
        let lag = self.lag.clone();

        let results = fan_out(self.registry.active(), move |cluster| {
            let connector = connector.clone();
            let lag = lag.clone();
            async move {
                let gateway = connector.connect(&cluster).await?;
                lag.load_groups(gateway, &cluster, None).await
            }
        })
        .await;

        let mut loaded = 0;
        for (cluster, result) in results {
            match result {
                Ok(groups) => {
                    let ids: Vec<String> = groups.iter().map(|g| g.group_id.clone()).collect();
                    self.consumers.upsert_all(groups);
                    self.consumers.retain_cluster(cluster.id, &ids);
                    health().mark_healthy(cluster.id, &cluster.name);
                    loaded += 1;
                }
                Err(Error::Unsupported(reason)) => {
                    groups_unavailable(&cluster, &reason);
                    loaded += 1;
                }
                Err(e) => cluster_failed(&cluster, "load consumer groups", &e),
            }
        }

        self.consumers.mark_loaded();
        metrics().cached_groups.set(self.consumers.len() as u64);
        info!(clusters = loaded, groups = self.consumers.len(), "Loaded consumer groups");
        loaded
    }

    // ---- Clusters ----

    pub fn list_clusters(&self) -> Vec<Cluster> {
        self.registry.list()
    }

    pub fn add_cluster(&self, cluster: Cluster) -> Result<Cluster> {
        self.registry.add(cluster)
    }

    /// Replaces a cluster's settings and drops everything derived from the old ones.
    pub async fn update_cluster(&self, cluster: Cluster) -> Result<Cluster> {
        let id = cluster.id;
        self.registry.update(cluster)?;
        self.forget_cluster(id).await;
        self.registry.get(id)
    }

    pub async fn remove_cluster(&self, cluster_id: ClusterId) -> Result<Cluster> {
        let removed = self.registry.remove(cluster_id)?;
        self.forget_cluster(cluster_id).await;
        Ok(removed)
    }

    async fn forget_cluster(&self, cluster_id: ClusterId) {
        self.connector.invalidate(cluster_id).await;
        let topics = self.topics.remove_cluster(cluster_id);
        let groups = self.consumers.remove_cluster(cluster_id);
        health().forget(cluster_id);
        metrics().cached_topics.set(self.topics.len() as u64);
        metrics().cached_groups.set(self.consumers.len() as u64);
        debug!(cluster_id, topics, groups, "Evicted cluster from caches");
    }

    /// Checks that every active cluster answers. Returns the healthy count.
    pub async fn probe_clusters(&self) -> usize {
        let connector = self.connector.clone();
        let results = fan_out(self.registry.active(), move |cluster| {
            let connector = connector.clone();
            async move {
                let gateway = connector.connect(&cluster).await?;
                check_connection(&*gateway).await
            }
        })
        .await;

        let mut healthy = 0;
        for (cluster, result) in results {
            match result {
                Ok(_) => {
                    health().mark_healthy(cluster.id, &cluster.name);
                    healthy += 1;
                }
                Err(e) => cluster_failed(&cluster, "probe", &e),
            }
        }
        healthy
    }
}

/// Runs `f` for every cluster in parallel and pairs each result with its cluster.
async fn fan_out<T, F, Fut>(clusters: Vec<Cluster>, f: F) -> Vec<(Cluster, Result<T>)>
where
    F: Fn(Cluster) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut tasks = JoinSet::new();
    for cluster in clusters {
        let work = f(cluster.clone());
        tasks.spawn(async move { (cluster, work.await) });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => {
                warn!(error = %e, "Cluster task aborted");
                metrics().cluster_failures.inc();
            }
        }
    }
    results.sort_by_key(|(cluster, _)| cluster.id);
    results
}

fn cluster_failed(cluster: &Cluster, what: &str, error: &Error) {
    warn!(
        cluster_id = cluster.id,
        cluster = %cluster.name,
        error = %error,
        "Cluster excluded from {}",
        what
    );
    metrics().cluster_failures.inc();
    health().mark_unhealthy(cluster.id, &cluster.name, error.to_string());
}

/// The cluster answered but has no group admin; its health stands.
fn groups_unavailable(cluster: &Cluster, reason: &str) {
    debug!(
        cluster_id = cluster.id,
        cluster = %cluster.name,
        reason,
        "Consumer groups unavailable"
    );
}

/// Partition ids of a topic, or `TopicNotFound`.
async fn topic_partition_ids(
    gateway: &dyn BrokerGateway,
    cluster_id: ClusterId,
    topic: &str,
) -> Result<Vec<i32>> {
    gateway
        .list_topics()
        .await?
        .into_iter()
        .find(|t| t.name == topic)
        .map(|t| t.partitions)
        .ok_or_else(|| Error::topic_not_found(cluster_id, topic))
}

/// Topics of one cluster with their retention.
///
/// Retention is best effort: an unreadable config reports the default.
async fn list_cluster_topics(
    connector: &dyn GatewayConnector,
    cluster: &Cluster,
) -> Result<Vec<TopicInfo>> {
    let gateway = connector.connect(cluster).await?;
    let listed = gateway.list_topics().await?;

    let mut topics = Vec::with_capacity(listed.len());
    for meta in listed {
        let retention_days = match gateway.topic_config(&meta.name).await {
            Ok(config) => config
                .retention_ms
                .map(retention_days_from_ms)
                .unwrap_or(DEFAULT_RETENTION_DAYS),
            Err(e) => {
                debug!(cluster_id = cluster.id, topic = %meta.name, error = %e, "Topic config unavailable");
                DEFAULT_RETENTION_DAYS
            }
        };
        topics.push(TopicInfo {
            partitions: meta.partition_count(),
            name: meta.name,
            messages: None,
            retention_days,
            cluster_id: cluster.id,
            cluster_name: cluster.name.clone(),
        });
    }
    Ok(topics)
}
