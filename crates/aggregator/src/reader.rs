//! Reader arena: scoped ownership of partition readers.
//!
//! Every reader opened through the arena is counted until it is released.
//! `release` closes it on the normal path; a lease dropped without release
//! (deadline abort, panic) still decrements and closes in the background.

use kafka_gateway::{BrokerGateway, PartitionReader, ReadOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tracing::debug;
use viewer_core::Result;

#[derive(Debug, Clone, Default)]
pub struct ReaderArena {
    live: Arc<AtomicUsize>,
}

impl ReaderArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Readers currently open.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    pub async fn open(
        &self,
        gateway: &dyn BrokerGateway,
        topic: &str,
        partition: i32,
    ) -> Result<ReaderLease> {
        let reader = gateway.open_reader(topic, partition).await?;
        self.live.fetch_add(1, Ordering::AcqRel);
        metrics().open_readers.inc();
        Ok(ReaderLease {
            reader: Some(reader),
            live: self.live.clone(),
        })
    }
}

/// An open reader owned by the arena.
pub struct ReaderLease {
    reader: Option<Box<dyn PartitionReader>>,
    live: Arc<AtomicUsize>,
}

impl ReaderLease {
    pub fn partition(&self) -> Option<i32> {
        self.reader.as_ref().map(|r| r.partition())
    }

    pub async fn seek(&mut self, offset: i64) -> Result<()> {
        match self.reader.as_mut() {
            Some(reader) => reader.seek(offset).await,
            None => Ok(()),
        }
    }

    pub async fn next(&mut self, timeout: Duration) -> Result<ReadOutcome> {
        match self.reader.as_mut() {
            Some(reader) => reader.next(timeout).await,
            None => Ok(ReadOutcome::EndOfPartition),
        }
    }

    /// Closes the reader and returns its slot.
    pub async fn release(mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.close().await;
            self.forget();
            debug!(topic = %reader.topic(), partition = reader.partition(), "Released reader");
        }
    }

    fn forget(&self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
        metrics().open_readers.dec();
    }
}

impl Drop for ReaderLease {
    fn drop(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            self.forget();
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    reader.close().await;
                });
            }
        }
    }
}
