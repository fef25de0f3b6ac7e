//! rskafka-backed gateway for one cluster.

use crate::config::GatewayConfig;
use crate::gateway::{
    BrokerGateway, CommittedOffset, GroupAdmin, GroupDescription, PartitionReader, TopicConfig,
    TopicMetadata,
};
use crate::reader::KafkaPartitionReader;
use crate::topics::user_topics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rskafka::client::{
    partition::{Compression, OffsetAt, PartitionClient, UnknownTopicHandling},
    Client, ClientBuilder, Credentials as SaslCredentials, SaslConfig,
};
use rskafka::record::Record;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use telemetry::metrics;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use viewer_core::{Cluster, ClusterId, Credentials, Error, Result, SaslMechanism, Watermarks};

/// Creates a TLS configuration trusting the public web roots.
fn create_tls_config() -> Arc<rustls::ClientConfig> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

/// Maps registry credentials onto the client's SASL settings.
fn sasl_config(cluster: &Cluster) -> Result<Option<SaslConfig>> {
    match &cluster.credentials {
        Credentials::None => Ok(None),
        Credentials::SharedSecret {
            username,
            password,
            mechanism,
        } => {
            let creds = SaslCredentials::new(username.clone(), password.clone());
            Ok(Some(match mechanism {
                SaslMechanism::Plain => SaslConfig::Plain(creds),
                SaslMechanism::ScramSha256 => SaslConfig::ScramSha256(creds),
                SaslMechanism::ScramSha512 => SaslConfig::ScramSha512(creds),
            }))
        }
        Credentials::OidcBearer { .. } => Err(Error::unsupported(format!(
            "cluster {} uses OIDC bearer auth, which the data-plane client cannot negotiate",
            cluster.id
        ))),
    }
}

fn compression(name: &str) -> Compression {
    match name {
        "gzip" => Compression::Gzip,
        "snappy" => Compression::Snappy,
        "lz4" => Compression::Lz4,
        "zstd" => Compression::Zstd,
        _ => Compression::NoCompression,
    }
}

/// Gateway over one rskafka client.
pub struct KafkaGateway {
    cluster_id: ClusterId,
    client: Client,
    config: GatewayConfig,
    admin: Option<Arc<dyn GroupAdmin>>,
    /// Cached partition clients keyed by (topic, partition)
    partitions: RwLock<BTreeMap<(String, i32), Arc<PartitionClient>>>,
}

impl KafkaGateway {
    /// Connects to the cluster's bootstrap endpoint.
    pub async fn connect(cluster: &Cluster, config: GatewayConfig) -> Result<Self> {
        let mut builder = ClientBuilder::new(vec![cluster.bootstrap()]);

        if cluster.tls {
            builder = builder.tls_config(create_tls_config());
        }
        if let Some(sasl) = sasl_config(cluster)? {
            builder = builder.sasl_config(sasl);
        }

        let client = match tokio::time::timeout(config.request_timeout(), builder.build()).await {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => {
                error!(cluster_id = cluster.id, error = %e, "Failed to connect to cluster");
                return Err(Error::unreachable(cluster.id, e.to_string()));
            }
            Err(_) => {
                return Err(Error::unreachable(
                    cluster.id,
                    format!("connect to {} timed out", cluster.bootstrap()),
                ))
            }
        };

        info!(
            cluster_id = cluster.id,
            bootstrap = %cluster.bootstrap(),
            tls = cluster.tls,
            "Connected to cluster"
        );

        Ok(Self {
            cluster_id: cluster.id,
            client,
            config,
            admin: None,
            partitions: RwLock::new(BTreeMap::new()),
        })
    }

    /// Attaches the group and config admin.
    pub fn with_admin(mut self, admin: Arc<dyn GroupAdmin>) -> Self {
        self.admin = Some(admin);
        self
    }

    fn admin(&self) -> Result<&Arc<dyn GroupAdmin>> {
        self.admin.as_ref().ok_or_else(|| {
            Error::unsupported("consumer group admin needs the `rdkafka` feature")
        })
    }

    /// Runs a broker call under the request timeout.
    async fn bounded<T, E, F>(&self, what: &str, fut: F, on_err: impl FnOnce(String) -> Error) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.config.request_timeout(), fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(on_err(format!("{}: {}", what, e))),
            Err(_) => Err(Error::timeout(format!(
                "{} on cluster {}",
                what, self.cluster_id
            ))),
        }
    }

    /// Gets or creates a partition client.
    async fn partition_client(&self, topic: &str, partition: i32) -> Result<Arc<PartitionClient>> {
        let key = (topic.to_string(), partition);

        {
            let clients = self.partitions.read().await;
            if let Some(client) = clients.get(&key) {
                return Ok(client.clone());
            }
        }

        let client = self
            .bounded(
                "open partition",
                self.client
                    .partition_client(topic.to_string(), partition, UnknownTopicHandling::Error),
                |msg| Error::partition_read(topic, partition, msg),
            )
            .await?;
        let client = Arc::new(client);

        self.partitions.write().await.insert(key, client.clone());
        Ok(client)
    }

    async fn offset_at(&self, topic: &str, partition: i32, at: OffsetAt) -> Result<i64> {
        let client = self.partition_client(topic, partition).await?;
        self.bounded("list offsets", client.get_offset(at), |msg| {
            Error::partition_read(topic, partition, msg)
        })
        .await
    }
}

#[async_trait]
impl BrokerGateway for KafkaGateway {
    fn cluster_id(&self) -> ClusterId {
        self.cluster_id
    }

    async fn list_topics(&self) -> Result<Vec<TopicMetadata>> {
        let cluster_id = self.cluster_id;
        let topics = self
            .bounded("list topics", self.client.list_topics(), |msg| {
                Error::unreachable(cluster_id, msg)
            })
            .await?;

        Ok(user_topics(topics.into_iter().map(|t| {
            TopicMetadata::new(t.name, t.partitions.iter().copied().collect())
        })))
    }

    /// Falls back to broker defaults when no admin is attached.
    async fn topic_config(&self, topic: &str) -> Result<TopicConfig> {
        match &self.admin {
            Some(admin) => admin.topic_config(topic).await,
            None => Ok(TopicConfig::default()),
        }
    }

    async fn watermarks(&self, topic: &str, partition: i32) -> Result<Watermarks> {
        let low = self.offset_at(topic, partition, OffsetAt::Earliest).await?;
        let high = self.offset_at(topic, partition, OffsetAt::Latest).await?;
        Ok(Watermarks::new(low, high))
    }

    async fn offset_for_timestamp(
        &self,
        topic: &str,
        partition: i32,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let offset = self
            .offset_at(topic, partition, OffsetAt::Timestamp(timestamp))
            .await?;
        // The broker answers -1 when no record is at or after the timestamp
        Ok((offset >= 0).then_some(offset))
    }

    async fn open_reader(&self, topic: &str, partition: i32) -> Result<Box<dyn PartitionReader>> {
        let client = self.partition_client(topic, partition).await?;
        Ok(Box::new(KafkaPartitionReader::new(
            client,
            topic,
            partition,
            self.config.fetch_max_bytes,
            self.config.fetch_max_wait_ms,
        )))
    }

    async fn list_groups(&self) -> Result<Vec<String>> {
        self.admin()?.list_groups().await
    }

    async fn describe_groups(&self, group_ids: &[String]) -> Result<Vec<GroupDescription>> {
        self.admin()?.describe_groups(group_ids).await
    }

    async fn committed_offsets(&self, group_id: &str) -> Result<Vec<CommittedOffset>> {
        self.admin()?.committed_offsets(group_id).await
    }

    async fn send(
        &self,
        topic: &str,
        partition: i32,
        key: Option<&str>,
        value: &str,
    ) -> Result<i64> {
        let client = self.partition_client(topic, partition).await?;
        let record = Record {
            key: key.map(|k| k.as_bytes().to_vec()),
            value: Some(value.as_bytes().to_vec()),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };

        let start = std::time::Instant::now();
        let produced = self
            .bounded(
                "produce",
                client.produce(vec![record], compression(&self.config.compression)),
                |msg| Error::partition_read(topic, partition, msg),
            )
            .await;

        match produced {
            Ok(offsets) => {
                metrics().messages_sent.inc();
                debug!(
                    cluster_id = self.cluster_id,
                    topic = %topic,
                    partition,
                    latency_ms = %start.elapsed().as_millis(),
                    "Sent message"
                );
                offsets
                    .first()
                    .copied()
                    .ok_or_else(|| Error::internal("broker acknowledged no offset"))
            }
            Err(e) => {
                error!(cluster_id = self.cluster_id, topic = %topic, error = %e, "Failed to send message");
                metrics().send_errors.inc();
                Err(e)
            }
        }
    }
}
