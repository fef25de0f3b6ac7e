//! Partition reader over an rskafka partition client.

use crate::gateway::{PartitionReader, RawRecord, ReadOutcome};
use async_trait::async_trait;
use rskafka::client::partition::PartitionClient;
use rskafka::record::RecordAndOffset;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use viewer_core::{Error, Result};

/// One fetch request against a partition.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    /// Records at or after `offset`, plus the high watermark.
    async fn fetch(
        &self,
        offset: i64,
        max_bytes: i32,
        max_wait_ms: i32,
    ) -> std::result::Result<(Vec<RecordAndOffset>, i64), String>;
}

#[async_trait]
impl RecordFetcher for PartitionClient {
    async fn fetch(
        &self,
        offset: i64,
        max_bytes: i32,
        max_wait_ms: i32,
    ) -> std::result::Result<(Vec<RecordAndOffset>, i64), String> {
        self.fetch_records(offset, 1..max_bytes, max_wait_ms)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Fetches forward from a position, buffering whole fetch responses.
pub struct KafkaPartitionReader<F = PartitionClient> {
    client: Option<Arc<F>>,
    topic: String,
    partition: i32,
    /// Next offset to hand out
    position: i64,
    buffer: VecDeque<RecordAndOffset>,
    /// High watermark reported by the last fetch
    high_watermark: Option<i64>,
    fetch_max_bytes: i32,
    fetch_max_wait_ms: i32,
}

impl<F: RecordFetcher> KafkaPartitionReader<F> {
    pub fn new(
        client: Arc<F>,
        topic: impl Into<String>,
        partition: i32,
        fetch_max_bytes: i32,
        fetch_max_wait_ms: i32,
    ) -> Self {
        Self {
            client: Some(client),
            topic: topic.into(),
            partition,
            position: 0,
            buffer: VecDeque::new(),
            high_watermark: None,
            fetch_max_bytes: fetch_max_bytes.max(1),
            fetch_max_wait_ms,
        }
    }

    fn closed(&self) -> Error {
        Error::partition_read(&self.topic, self.partition, "reader is closed")
    }
}

fn to_raw(record: RecordAndOffset) -> RawRecord {
    RawRecord {
        offset: record.offset,
        key: record.record.key,
        value: record.record.value,
        timestamp: record.record.timestamp,
    }
}

#[async_trait]
impl<F: RecordFetcher + 'static> PartitionReader for KafkaPartitionReader<F> {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn partition(&self) -> i32 {
        self.partition
    }

    async fn seek(&mut self, offset: i64) -> Result<()> {
        if self.client.is_none() {
            return Err(self.closed());
        }
        self.position = offset;
        self.buffer.clear();
        self.high_watermark = None;
        Ok(())
    }

    async fn next(&mut self, timeout: Duration) -> Result<ReadOutcome> {
        let deadline = Instant::now() + timeout;

        loop {
            while let Some(record) = self.buffer.pop_front() {
                // Compressed batches are returned whole and may start before the position
                if record.offset < self.position {
                    continue;
                }
                self.position = record.offset + 1;
                return Ok(ReadOutcome::Record(to_raw(record)));
            }

            if matches!(self.high_watermark, Some(high) if self.position >= high) {
                return Ok(ReadOutcome::EndOfPartition);
            }

            let client = self.client.clone().ok_or_else(|| self.closed())?;
            let fetch = client.fetch(self.position, self.fetch_max_bytes, self.fetch_max_wait_ms);

            let (records, high_watermark) = match tokio::time::timeout_at(deadline, fetch).await {
                Ok(Ok(fetched)) => fetched,
                Ok(Err(e)) => return Err(Error::partition_read(&self.topic, self.partition, e)),
                Err(_) => return Ok(ReadOutcome::TimedOut),
            };

            debug!(
                topic = %self.topic,
                partition = self.partition,
                position = self.position,
                fetched = records.len(),
                high_watermark,
                "Fetched records"
            );

            self.high_watermark = Some(high_watermark);
            let position = self.position;
            self.buffer
                .extend(records.into_iter().filter(|r| r.offset >= position));

            // Control markers and compacted records never come back, so an
            // empty answer below the watermark means this offset holds no record
            if self.buffer.is_empty() && self.position < high_watermark {
                self.position += 1;
            }
        }
    }

    async fn close(&mut self) {
        self.client = None;
        self.buffer.clear();
    }
}
