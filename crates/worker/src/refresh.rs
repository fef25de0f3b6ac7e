//! Cache refresh passes.
//!
//! Each pass runs one orchestrator reload. Cluster failures are absorbed
//! and logged by the orchestrator; a pass only reports a failure when no
//! active cluster answered.

use aggregator::Inspector;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs refresh passes against one orchestrator.
pub struct RefreshWorker {
    inspector: Arc<Inspector>,
}

impl RefreshWorker {
    pub fn new(inspector: Arc<Inspector>) -> Self {
        Self { inspector }
    }

    /// True until the first topic listing completes.
    pub fn topics_cold(&self) -> bool {
        self.inspector.topic_cache().is_cold()
    }

    fn active_clusters(&self) -> usize {
        self.inspector.registry().active().len()
    }

    /// Reloads topic listings and retention.
    pub async fn refresh_topics(&self) -> Result<usize, String> {
        let start = Instant::now();
        let loaded = self.inspector.load_topics().await;
        let active = self.active_clusters();

        if loaded == 0 && active > 0 {
            return Err(format!("no cluster answered out of {}", active));
        }
        info!(
            clusters = loaded,
            duration_ms = start.elapsed().as_millis() as u64,
            "Topic refresh complete"
        );
        Ok(loaded)
    }

    /// Recomputes message counts of cached topics.
    pub async fn refresh_message_counts(&self) -> Result<usize, String> {
        let cached = self.inspector.topic_cache().len();
        let refreshed = self.inspector.refresh_all_message_counts().await;

        if refreshed == 0 && cached > 0 {
            return Err(format!("no message count refreshed out of {} topics", cached));
        }
        debug!(topics = refreshed, "Message count refresh complete");
        Ok(refreshed)
    }

    /// Reloads every consumer group and its lag.
    pub async fn refresh_consumer_groups(&self) -> Result<usize, String> {
        let start = Instant::now();
        let loaded = self.inspector.load_consumer_groups().await;
        let active = self.active_clusters();

        if loaded == 0 && active > 0 {
            return Err(format!("no cluster answered out of {}", active));
        }
        info!(
            clusters = loaded,
            groups = self.inspector.consumer_cache().len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Consumer group refresh complete"
        );
        Ok(loaded)
    }

    /// Probes every active cluster and updates the health registry.
    pub async fn probe_clusters(&self) -> usize {
        let active = self.active_clusters();
        let healthy = self.inspector.probe_clusters().await;
        if healthy < active {
            warn!(healthy, active, "Some clusters failed their probe");
        }
        healthy
    }
}
