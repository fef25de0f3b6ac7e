//! Message search over the partitions of one topic on one cluster.
//!
//! Each partition gets a scan plan (start and end offsets), one reader and
//! its own task. Partitions that fail are logged and left out; the merged
//! result is sorted for the search mode and cut to the limit.

use crate::config::SearchConfig;
use crate::reader::{ReaderArena, ReaderLease};
use chrono::{DateTime, Utc};
use kafka_gateway::{BrokerGateway, RawRecord, ReadOutcome};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use viewer_core::{
    compare_messages, render_key, render_value, MessageQuery, Result, SearchMode, TopicMessage,
    Watermarks,
};

/// Messages found by a search, plus what was left out.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub messages: Vec<TopicMessage>,
    /// Partitions excluded after a read or metadata failure
    pub failed_partitions: Vec<i32>,
    /// Records read across all partitions
    pub scanned: usize,
    /// The deadline or the global scan budget cut the search short
    pub truncated: bool,
}

/// Offsets `[start, end)` to read from one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScanPlan {
    start: i64,
    end: i64,
}

/// What to do with a record after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Keep,
    Skip,
    /// Nothing further in this partition can match
    Stop,
}

/// Per-search filter state shared by every partition task.
#[derive(Debug)]
struct Criteria {
    topic: String,
    mode: SearchMode,
    limit: usize,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    /// Records older than this are dropped in `onlyNew` mode
    only_new_cutoff: Option<DateTime<Utc>>,
    /// Lowercased text term
    term: Option<String>,
    /// Records read back from the end in newest-first modes
    read_budget: usize,
    /// Records read from one partition at most
    max_scan: usize,
}

impl Criteria {
    fn has_window(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    /// Applies the time window, the `onlyNew` cutoff, then the text term.
    fn judge(&self, record: &RawRecord, value: &str) -> Verdict {
        if matches!(self.from, Some(from) if record.timestamp < from) {
            return Verdict::Skip;
        }
        if matches!(self.to, Some(to) if record.timestamp > to) {
            return if self.mode.ascending() {
                Verdict::Stop
            } else {
                Verdict::Skip
            };
        }
        if matches!(self.only_new_cutoff, Some(cutoff) if record.timestamp < cutoff) {
            return Verdict::Skip;
        }
        match &self.term {
            Some(term) if !value.to_lowercase().contains(term.as_str()) => Verdict::Skip,
            _ => Verdict::Keep,
        }
    }
}

pub struct SearchEngine {
    config: SearchConfig,
    arena: ReaderArena,
}

impl SearchEngine {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            arena: ReaderArena::new(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn arena(&self) -> &ReaderArena {
        &self.arena
    }

    /// Searches `partitions` of `query.topic` through `gateway`.
    ///
    /// Input is validated before any broker call. The caller resolves the
    /// partition list, so an unknown topic never reaches this point.
    pub async fn search(
        &self,
        gateway: Arc<dyn BrokerGateway>,
        partitions: &[i32],
        query: &MessageQuery,
    ) -> Result<SearchOutcome> {
        query.check()?;

        let started = Instant::now();
        let limit = self.config.effective_limit(query.limit);
        let term = query.text_term();
        let criteria = Arc::new(Criteria {
            topic: query.topic.clone(),
            mode: query.mode,
            limit,
            from: query.from,
            to: query.to,
            only_new_cutoff: (query.mode == SearchMode::OnlyNew)
                .then(|| Utc::now() - self.config.only_new_window()),
            read_budget: self.config.read_budget(limit, term.is_some()),
            max_scan: self.config.max_scan_per_partition,
            term,
        });

        metrics().searches.inc();
        let scanned = Arc::new(AtomicUsize::new(0));
        let permits = Arc::new(Semaphore::new(self.config.partition_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for &partition in partitions {
            let gateway = gateway.clone();
            let arena = self.arena.clone();
            let criteria = criteria.clone();
            let scanned = scanned.clone();
            let permits = permits.clone();
            let config = self.config.clone();

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let result =
                    scan_partition(&*gateway, &arena, partition, &criteria, &scanned, &config).await;
                (partition, result)
            });
        }

        let deadline = tokio::time::Instant::now() + self.config.deadline();
        let mut outcome = SearchOutcome::default();

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((_, Ok(found))))) => outcome.messages.extend(found),
                Ok(Some(Ok((partition, Err(e))))) => {
                    warn!(
                        cluster_id = gateway.cluster_id(),
                        topic = %criteria.topic,
                        partition,
                        error = %e,
                        "Partition excluded from search"
                    );
                    metrics().partition_failures.inc();
                    outcome.failed_partitions.push(partition);
                }
                Ok(Some(Err(e))) => {
                    warn!(topic = %criteria.topic, error = %e, "Partition scan task aborted");
                    metrics().partition_failures.inc();
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        cluster_id = gateway.cluster_id(),
                        topic = %criteria.topic,
                        deadline_ms = self.config.deadline_ms,
                        "Search deadline reached, returning partial results"
                    );
                    outcome.truncated = true;
                    tasks.abort_all();
                    // Drain so every aborted task has dropped its reader;
                    // partitions that finished in the meantime still count
                    while let Some(joined) = tasks.join_next().await {
                        if let Ok((_, Ok(found))) = joined {
                            outcome.messages.extend(found);
                        }
                    }
                    break;
                }
            }
        }

        outcome.scanned = scanned.load(Ordering::Acquire);
        if outcome.scanned >= self.config.max_scan_total {
            outcome.truncated = true;
        }
        if outcome.truncated {
            metrics().searches_truncated.inc();
        }
        outcome.failed_partitions.sort_unstable();

        let mode = criteria.mode;
        outcome.messages.sort_by(|a, b| compare_messages(mode, a, b));
        outcome.messages.truncate(limit);

        let elapsed = started.elapsed();
        metrics().messages_scanned.inc_by(outcome.scanned as u64);
        metrics().messages_returned.inc_by(outcome.messages.len() as u64);
        metrics().search_latency_ms.observe(elapsed.as_millis() as u64);

        info!(
            cluster_id = gateway.cluster_id(),
            topic = %criteria.topic,
            mode = mode.as_str(),
            partitions = partitions.len(),
            scanned = outcome.scanned,
            returned = outcome.messages.len(),
            failed = outcome.failed_partitions.len(),
            latency_ms = %elapsed.as_millis(),
            "Search complete"
        );

        Ok(outcome)
    }
}

/// Resolves a timestamp to an offset.
///
/// No record at or after the timestamp resolves to the high watermark; a
/// failed lookup resolves to `fallback`.
async fn resolve_bound(
    gateway: &dyn BrokerGateway,
    topic: &str,
    partition: i32,
    at: DateTime<Utc>,
    marks: Watermarks,
    fallback: i64,
) -> i64 {
    match gateway.offset_for_timestamp(topic, partition, at).await {
        Ok(Some(offset)) => offset,
        Ok(None) => marks.high,
        Err(e) => {
            debug!(topic = %topic, partition, error = %e, "Timestamp lookup failed, using watermark");
            fallback
        }
    }
}

async fn plan_partition(
    gateway: &dyn BrokerGateway,
    partition: i32,
    criteria: &Criteria,
) -> Result<Option<ScanPlan>> {
    let topic = criteria.topic.as_str();
    let marks = gateway.watermarks(topic, partition).await?;
    if marks.message_count() == 0 {
        return Ok(None);
    }

    let (start, end) = if criteria.has_window() {
        let start = match criteria.from {
            Some(from) => resolve_bound(gateway, topic, partition, from, marks, marks.low).await,
            None => marks.low,
        };
        // First offset past `to`, so the end stays exclusive
        let end = match criteria.to {
            Some(to) => {
                let after = to + chrono::Duration::milliseconds(1);
                resolve_bound(gateway, topic, partition, after, marks, marks.high).await
            }
            None => marks.high,
        };
        if criteria.mode.ascending() {
            (start, end)
        } else {
            // Newest-first keeps the tail of a large window
            (start.max(end - criteria.max_scan as i64), end)
        }
    } else {
        match criteria.mode {
            SearchMode::Oldest => (marks.low, marks.high),
            SearchMode::Newest => (marks.high - criteria.read_budget as i64, marks.high),
            SearchMode::OnlyNew => {
                let by_budget = marks.high - criteria.read_budget as i64;
                let by_time = match criteria.only_new_cutoff {
                    Some(cutoff) => {
                        resolve_bound(gateway, topic, partition, cutoff, marks, by_budget).await
                    }
                    None => by_budget,
                };
                (by_budget.max(by_time), marks.high)
            }
        }
    };

    let (start, end) = (marks.clamp(start), marks.clamp(end));
    if start >= end {
        return Ok(None);
    }
    Ok(Some(ScanPlan { start, end }))
}

async fn scan_partition(
    gateway: &dyn BrokerGateway,
    arena: &ReaderArena,
    partition: i32,
    criteria: &Criteria,
    scanned: &AtomicUsize,
    config: &SearchConfig,
) -> Result<Vec<TopicMessage>> {
    let Some(plan) = plan_partition(gateway, partition, criteria).await? else {
        return Ok(Vec::new());
    };

    debug!(
        topic = %criteria.topic,
        partition,
        start = plan.start,
        end = plan.end,
        "Scanning partition"
    );

    let mut lease = arena.open(gateway, &criteria.topic, partition).await?;
    let result = read_partition(&mut lease, partition, plan, criteria, scanned, config).await;
    lease.release().await;
    result
}

async fn read_partition(
    lease: &mut ReaderLease,
    partition: i32,
    plan: ScanPlan,
    criteria: &Criteria,
    scanned: &AtomicUsize,
    config: &SearchConfig,
) -> Result<Vec<TopicMessage>> {
    lease.seek(plan.start).await?;

    let ascending = criteria.mode.ascending();
    let mut kept: VecDeque<TopicMessage> = VecDeque::new();
    let mut reads = 0usize;

    while reads < config.max_scan_per_partition {
        if scanned.load(Ordering::Acquire) >= config.max_scan_total {
            break;
        }

        let record = match lease.next(config.read_timeout()).await? {
            ReadOutcome::Record(record) => record,
            ReadOutcome::EndOfPartition | ReadOutcome::TimedOut => break,
        };
        if record.offset >= plan.end {
            break;
        }
        reads += 1;
        scanned.fetch_add(1, Ordering::AcqRel);

        let value = render_value(record.value.as_deref());
        match criteria.judge(&record, &value) {
            Verdict::Keep => {}
            Verdict::Skip => continue,
            Verdict::Stop => break,
        }

        kept.push_back(TopicMessage {
            topic: criteria.topic.clone(),
            partition,
            offset: record.offset,
            key: render_key(record.key.as_deref()),
            value,
            timestamp: record.timestamp,
        });

        if ascending {
            if kept.len() >= criteria.limit {
                break;
            }
        } else if kept.len() > criteria.limit {
            kept.pop_front();
        }
    }

    Ok(kept.into())
}
