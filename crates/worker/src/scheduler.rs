//! Refresh scheduler for background cache maintenance.

use crate::refresh::RefreshWorker;
use aggregator::Inspector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Refresh scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Topic listing interval
    #[serde(default = "default_topics_interval")]
    pub topics_interval_secs: u64,
    /// Message count interval
    #[serde(default = "default_message_counts_interval")]
    pub message_counts_interval_secs: u64,
    /// Consumer group interval
    #[serde(default = "default_consumer_groups_interval")]
    pub consumer_groups_interval_secs: u64,
    /// Cluster probe interval
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_topics_interval() -> u64 {
    300 // 5 minutes
}

fn default_message_counts_interval() -> u64 {
    600 // 10 minutes
}

fn default_consumer_groups_interval() -> u64 {
    60 // 1 minute
}

fn default_probe_interval() -> u64 {
    30
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            topics_interval_secs: default_topics_interval(),
            message_counts_interval_secs: default_message_counts_interval(),
            consumer_groups_interval_secs: default_consumer_groups_interval(),
            probe_interval_secs: default_probe_interval(),
        }
    }
}

impl RefreshConfig {
    fn every(secs: u64) -> Duration {
        Duration::from_secs(secs.max(1))
    }
}

/// Background refresh scheduler.
pub struct RefreshScheduler {
    config: RefreshConfig,
    worker: RefreshWorker,
}

impl RefreshScheduler {
    pub fn new(config: RefreshConfig, inspector: Arc<Inspector>) -> Self {
        Self {
            config,
            worker: RefreshWorker::new(inspector),
        }
    }

    /// Starts all refresh loops. Returns no handles when refresh is disabled.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();
        if !self.config.enabled {
            info!("Background refresh disabled");
            return handles;
        }

        // Probe first so the health report fills before the first listing
        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_probe().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_topics().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_message_counts().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_consumer_groups().await;
        }));

        info!(
            topics_secs = self.config.topics_interval_secs,
            message_counts_secs = self.config.message_counts_interval_secs,
            consumer_groups_secs = self.config.consumer_groups_interval_secs,
            "Background refresh started"
        );
        handles
    }

    async fn run_probe(&self) {
        let mut ticker = interval(RefreshConfig::every(self.config.probe_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.worker.probe_clusters().await;
        }
    }

    async fn run_topics(&self) {
        let mut ticker = interval(RefreshConfig::every(self.config.topics_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = self.worker.refresh_topics().await {
                error!("Topic refresh error: {}", e);
            }
        }
    }

    async fn run_message_counts(&self) {
        let mut ticker = interval(RefreshConfig::every(self.config.message_counts_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            // Counts attach to cached topics, so wait for the first listing
            if self.worker.topics_cold() {
                continue;
            }
            if let Err(e) = self.worker.refresh_message_counts().await {
                error!("Message count refresh error: {}", e);
            }
        }
    }

    async fn run_consumer_groups(&self) {
        let mut ticker = interval(RefreshConfig::every(self.config.consumer_groups_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = self.worker.refresh_consumer_groups().await {
                error!("Consumer group refresh error: {}", e);
            }
        }
    }
}
