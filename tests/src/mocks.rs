//! Mock implementations for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kafka_gateway::{
    BrokerGateway, CommittedOffset, GatewayConnector, GroupDescription, MemberDescription,
    PartitionReader, RawRecord, ReadOutcome, TopicConfig, TopicMetadata,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use viewer_core::{Cluster, ClusterId, Error, GroupState, Result, Watermarks};

#[derive(Default)]
struct MockPartition {
    /// Oldest retained offset
    low: i64,
    /// Records by offset, starting at 0
    records: Vec<RawRecord>,
}

impl MockPartition {
    fn high(&self) -> i64 {
        self.records.len() as i64
    }
}

#[derive(Default)]
struct MockTopic {
    partitions: BTreeMap<i32, MockPartition>,
    retention_ms: Option<i64>,
}

struct MockGroup {
    state: GroupState,
    members: Vec<MemberDescription>,
    offsets: Vec<CommittedOffset>,
}

#[derive(Default)]
struct MockState {
    topics: BTreeMap<String, MockTopic>,
    groups: BTreeMap<String, MockGroup>,
    cluster_down: bool,
    failing_reads: HashSet<(String, i32)>,
    failing_watermarks: HashSet<(String, i32)>,
    failing_offsets: HashSet<String>,
    describe_errors: HashSet<String>,
    read_delay: Option<Duration>,
    partition_delays: HashMap<(String, i32), Duration>,
    /// Group operations answer `Unsupported`, as without an admin client
    no_group_admin: bool,
    sent: Vec<(String, i32, Option<String>, String)>,
}

/// In-memory cluster implementing the same `BrokerGateway` trait as the
/// rskafka gateway.
///
/// Failures can be injected per cluster, partition or group. Readers are
/// counted from open to close so tests can check that every one was released.
pub struct MockGateway {
    cluster_id: ClusterId,
    state: Arc<Mutex<MockState>>,
    open_readers: Arc<AtomicUsize>,
    readers_opened: AtomicUsize,
}

impl MockGateway {
    pub fn new(cluster_id: ClusterId) -> Self {
        Self {
            cluster_id,
            state: Arc::new(Mutex::new(MockState::default())),
            open_readers: Arc::new(AtomicUsize::new(0)),
            readers_opened: AtomicUsize::new(0),
        }
    }

    // ---- Setup ----

    /// Adds an empty topic with partitions `0..partitions`.
    pub fn add_topic(&self, name: &str, partitions: i32) {
        let mut state = self.state.lock();
        let topic = state.topics.entry(name.to_string()).or_default();
        for p in 0..partitions {
            topic.partitions.entry(p).or_default();
        }
    }

    pub fn set_retention_ms(&self, topic: &str, retention_ms: i64) {
        if let Some(t) = self.state.lock().topics.get_mut(topic) {
            t.retention_ms = Some(retention_ms);
        }
    }

    pub fn remove_topic(&self, name: &str) {
        self.state.lock().topics.remove(name);
    }

    /// Appends a record and returns its offset.
    pub fn push(
        &self,
        topic: &str,
        partition: i32,
        key: Option<&[u8]>,
        value: &str,
        timestamp: DateTime<Utc>,
    ) -> i64 {
        let mut state = self.state.lock();
        let part = state
            .topics
            .entry(topic.to_string())
            .or_default()
            .partitions
            .entry(partition)
            .or_default();
        let offset = part.high();
        part.records.push(RawRecord {
            offset,
            key: key.map(<[u8]>::to_vec),
            value: Some(value.as_bytes().to_vec()),
            timestamp,
        });
        offset
    }

    /// Moves the low watermark, as retention would.
    pub fn truncate(&self, topic: &str, partition: i32, low: i64) {
        let mut state = self.state.lock();
        if let Some(part) = state
            .topics
            .get_mut(topic)
            .and_then(|t| t.partitions.get_mut(&partition))
        {
            part.low = low.min(part.high());
        }
    }

    pub fn add_group(
        &self,
        group_id: &str,
        state: GroupState,
        members: Vec<MemberDescription>,
        offsets: Vec<CommittedOffset>,
    ) {
        self.state.lock().groups.insert(
            group_id.to_string(),
            MockGroup {
                state,
                members,
                offsets,
            },
        );
    }

    pub fn remove_group(&self, group_id: &str) {
        self.state.lock().groups.remove(group_id);
    }

    // ---- Failure injection ----

    pub fn set_down(&self, down: bool) {
        self.state.lock().cluster_down = down;
    }

    pub fn fail_reads(&self, topic: &str, partition: i32) {
        self.state
            .lock()
            .failing_reads
            .insert((topic.to_string(), partition));
    }

    pub fn fail_watermarks(&self, topic: &str, partition: i32) {
        self.state
            .lock()
            .failing_watermarks
            .insert((topic.to_string(), partition));
    }

    pub fn fail_offsets(&self, group_id: &str) {
        self.state.lock().failing_offsets.insert(group_id.to_string());
    }

    pub fn fail_describe(&self, group_id: &str) {
        self.state.lock().describe_errors.insert(group_id.to_string());
    }

    /// Delays every read by `delay`.
    pub fn set_read_delay(&self, delay: Duration) {
        self.state.lock().read_delay = Some(delay);
    }

    /// Delays reads of one partition only, overriding `set_read_delay`.
    pub fn set_partition_read_delay(&self, topic: &str, partition: i32, delay: Duration) {
        self.state
            .lock()
            .partition_delays
            .insert((topic.to_string(), partition), delay);
    }

    pub fn disable_group_admin(&self) {
        self.state.lock().no_group_admin = true;
    }

    // ---- Inspection ----

    /// Readers opened and not yet closed.
    pub fn open_readers(&self) -> usize {
        self.open_readers.load(Ordering::Acquire)
    }

    pub fn readers_opened(&self) -> usize {
        self.readers_opened.load(Ordering::Acquire)
    }

    /// (topic, partition, key, value) of every sent message.
    pub fn sent(&self) -> Vec<(String, i32, Option<String>, String)> {
        self.state.lock().sent.clone()
    }

    fn check_up(&self) -> Result<()> {
        if self.state.lock().cluster_down {
            return Err(Error::unreachable(self.cluster_id, "mock cluster is down"));
        }
        Ok(())
    }

    fn check_group_admin(&self) -> Result<()> {
        self.check_up()?;
        if self.state.lock().no_group_admin {
            return Err(Error::unsupported("mock cluster has no group admin"));
        }
        Ok(())
    }
}

#[async_trait]
impl BrokerGateway for MockGateway {
    fn cluster_id(&self) -> ClusterId {
        self.cluster_id
    }

    async fn list_topics(&self) -> Result<Vec<TopicMetadata>> {
        self.check_up()?;
        Ok(self
            .state
            .lock()
            .topics
            .iter()
            .map(|(name, t)| TopicMetadata::new(name.clone(), t.partitions.keys().copied().collect()))
            .collect())
    }

    async fn topic_config(&self, topic: &str) -> Result<TopicConfig> {
        self.check_up()?;
        let state = self.state.lock();
        let t = state
            .topics
            .get(topic)
            .ok_or_else(|| Error::topic_not_found(self.cluster_id, topic))?;
        Ok(TopicConfig {
            retention_ms: t.retention_ms,
        })
    }

    async fn watermarks(&self, topic: &str, partition: i32) -> Result<Watermarks> {
        self.check_up()?;
        let state = self.state.lock();
        if state
            .failing_watermarks
            .contains(&(topic.to_string(), partition))
        {
            return Err(Error::partition_read(topic, partition, "mock watermark failure"));
        }
        let part = state
            .topics
            .get(topic)
            .and_then(|t| t.partitions.get(&partition))
            .ok_or_else(|| Error::partition_read(topic, partition, "unknown partition"))?;
        Ok(Watermarks::new(part.low, part.high()))
    }

    async fn offset_for_timestamp(
        &self,
        topic: &str,
        partition: i32,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        self.check_up()?;
        let state = self.state.lock();
        let part = state
            .topics
            .get(topic)
            .and_then(|t| t.partitions.get(&partition))
            .ok_or_else(|| Error::partition_read(topic, partition, "unknown partition"))?;
        Ok(part
            .records
            .iter()
            .skip(part.low as usize)
            .find(|r| r.timestamp >= timestamp)
            .map(|r| r.offset))
    }

    async fn open_reader(&self, topic: &str, partition: i32) -> Result<Box<dyn PartitionReader>> {
        self.check_up()?;
        self.open_readers.fetch_add(1, Ordering::AcqRel);
        self.readers_opened.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(MockReader {
            state: self.state.clone(),
            open_readers: self.open_readers.clone(),
            topic: topic.to_string(),
            partition,
            position: 0,
            closed: false,
        }))
    }

    async fn list_groups(&self) -> Result<Vec<String>> {
        self.check_group_admin()?;
        Ok(self.state.lock().groups.keys().cloned().collect())
    }

    async fn describe_groups(&self, group_ids: &[String]) -> Result<Vec<GroupDescription>> {
        self.check_group_admin()?;
        let state = self.state.lock();
        Ok(group_ids
            .iter()
            .filter_map(|id| {
                state.groups.get(id).map(|g| GroupDescription {
                    group_id: id.clone(),
                    state: g.state.clone(),
                    members: g.members.clone(),
                    error: state
                        .describe_errors
                        .contains(id)
                        .then(|| "COORDINATOR_NOT_AVAILABLE".to_string()),
                })
            })
            .collect())
    }

    async fn committed_offsets(&self, group_id: &str) -> Result<Vec<CommittedOffset>> {
        self.check_group_admin()?;
        let state = self.state.lock();
        if state.failing_offsets.contains(group_id) {
            return Err(Error::group_describe(group_id, "mock offset fetch failure"));
        }
        state
            .groups
            .get(group_id)
            .map(|g| g.offsets.clone())
            .ok_or_else(|| Error::GroupNotFound {
                cluster_id: self.cluster_id,
                group_id: group_id.to_string(),
            })
    }

    async fn send(&self, topic: &str, partition: i32, key: Option<&str>, value: &str) -> Result<i64> {
        self.check_up()?;
        let offset = self.push(topic, partition, key.map(str::as_bytes), value, Utc::now());
        self.state.lock().sent.push((
            topic.to_string(),
            partition,
            key.map(String::from),
            value.to_string(),
        ));
        Ok(offset)
    }
}

struct MockReader {
    state: Arc<Mutex<MockState>>,
    open_readers: Arc<AtomicUsize>,
    topic: String,
    partition: i32,
    position: i64,
    closed: bool,
}

#[async_trait]
impl PartitionReader for MockReader {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn partition(&self) -> i32 {
        self.partition
    }

    async fn seek(&mut self, offset: i64) -> Result<()> {
        self.position = offset;
        Ok(())
    }

    async fn next(&mut self, timeout: Duration) -> Result<ReadOutcome> {
        let delay = {
            let state = self.state.lock();
            state
                .partition_delays
                .get(&(self.topic.clone(), self.partition))
                .copied()
                .or(state.read_delay)
        };
        if let Some(delay) = delay {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                return Ok(ReadOutcome::TimedOut);
            }
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock();
        if state
            .failing_reads
            .contains(&(self.topic.clone(), self.partition))
        {
            return Err(Error::partition_read(
                &self.topic,
                self.partition,
                "mock read failure",
            ));
        }

        let Some(part) = state
            .topics
            .get(&self.topic)
            .and_then(|t| t.partitions.get(&self.partition))
        else {
            return Err(Error::partition_read(&self.topic, self.partition, "unknown partition"));
        };

        let position = self.position.max(part.low);
        match part.records.get(position as usize) {
            Some(record) => {
                let record = record.clone();
                drop(state);
                self.position = record.offset + 1;
                Ok(ReadOutcome::Record(record))
            }
            None => Ok(ReadOutcome::EndOfPartition),
        }
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open_readers.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// Connector over a fixed set of mock gateways.
#[derive(Default)]
pub struct MockConnector {
    gateways: Mutex<HashMap<ClusterId, Arc<MockGateway>>>,
    connects: AtomicUsize,
    invalidated: Mutex<Vec<ClusterId>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, gateway: Arc<MockGateway>) {
        self.gateways.lock().insert(gateway.cluster_id(), gateway);
    }

    pub fn gateway(&self, cluster_id: ClusterId) -> Option<Arc<MockGateway>> {
        self.gateways.lock().get(&cluster_id).cloned()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::Acquire)
    }

    pub fn invalidated(&self) -> Vec<ClusterId> {
        self.invalidated.lock().clone()
    }
}

#[async_trait]
impl GatewayConnector for MockConnector {
    async fn connect(&self, cluster: &Cluster) -> Result<Arc<dyn BrokerGateway>> {
        self.connects.fetch_add(1, Ordering::AcqRel);
        let gateway = self
            .gateway(cluster.id)
            .ok_or_else(|| Error::unreachable(cluster.id, "no mock gateway registered"))?;
        gateway.check_up()?;
        Ok(gateway)
    }

    async fn invalidate(&self, cluster_id: ClusterId) {
        self.invalidated.lock().push(cluster_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_mock_watermarks_follow_pushes_and_truncation() {
        let gw = MockGateway::new(1);
        gw.add_topic("orders", 1);
        for i in 0..5 {
            gw.push("orders", 0, None, "v", at(i));
        }
        assert_eq!(gw.watermarks("orders", 0).await.unwrap(), Watermarks::new(0, 5));

        gw.truncate("orders", 0, 2);
        assert_eq!(gw.watermarks("orders", 0).await.unwrap(), Watermarks::new(2, 5));
        assert_eq!(gw.offset_for_timestamp("orders", 0, at(0)).await.unwrap(), Some(2));
        assert_eq!(gw.offset_for_timestamp("orders", 0, at(99)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mock_reader_accounting() {
        let gw = MockGateway::new(1);
        gw.add_topic("orders", 1);
        gw.push("orders", 0, Some(b"k"), "v", at(1));

        let mut reader = gw.open_reader("orders", 0).await.unwrap();
        assert_eq!(gw.open_readers(), 1);
        assert!(matches!(
            reader.next(Duration::from_millis(10)).await.unwrap(),
            ReadOutcome::Record(_)
        ));
        assert_eq!(
            reader.next(Duration::from_millis(10)).await.unwrap(),
            ReadOutcome::EndOfPartition
        );
        reader.close().await;
        reader.close().await;
        assert_eq!(gw.open_readers(), 0);
    }

    #[tokio::test]
    async fn test_mock_cluster_down() {
        let gw = MockGateway::new(3);
        gw.set_down(true);
        assert!(matches!(
            gw.list_topics().await,
            Err(Error::ClusterUnreachable { cluster_id: 3, .. })
        ));
    }
}
