//! Consumer-group and topic-config admin over librdkafka.
//!
//! librdkafka's group and offset calls are blocking, so each runs on the
//! blocking pool with a fresh short-lived client.

use crate::assignment::parse_assignment;
use crate::config::GatewayConfig;
use crate::gateway::{
    CommittedOffset, GroupAdmin, GroupDescription, MemberDescription, TopicConfig,
};
use crate::topics::topic_config_from_entries;
use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, ResourceSpecifier};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::{Offset, TopicPartitionList};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};
use viewer_core::limits::is_internal_topic;
use viewer_core::{Cluster, ClusterId, Credentials, Error, GroupState, Result, SaslMechanism};

/// Group admin for one cluster.
pub struct RdkafkaAdmin {
    cluster_id: ClusterId,
    base: ClientConfig,
    timeout: Duration,
}

fn mechanism_name(mechanism: SaslMechanism) -> &'static str {
    match mechanism {
        SaslMechanism::Plain => "PLAIN",
        SaslMechanism::ScramSha256 => "SCRAM-SHA-256",
        SaslMechanism::ScramSha512 => "SCRAM-SHA-512",
    }
}

/// Applies endpoint and credentials to a librdkafka config.
fn client_config(cluster: &Cluster, timeout: Duration) -> ClientConfig {
    let mut config = ClientConfig::new();
    config
        .set("bootstrap.servers", cluster.bootstrap())
        .set("client.id", "kafka-viewer")
        .set("socket.timeout.ms", timeout.as_millis().to_string());

    let sasl_protocol = if cluster.tls { "SASL_SSL" } else { "SASL_PLAINTEXT" };
    match &cluster.credentials {
        Credentials::None => {
            config.set("security.protocol", if cluster.tls { "SSL" } else { "PLAINTEXT" });
        }
        Credentials::SharedSecret {
            username,
            password,
            mechanism,
        } => {
            config
                .set("security.protocol", sasl_protocol)
                .set("sasl.mechanism", mechanism_name(*mechanism))
                .set("sasl.username", username)
                .set("sasl.password", password);
        }
        Credentials::OidcBearer {
            token_endpoint,
            client_id,
            client_secret,
        } => {
            config
                .set("security.protocol", sasl_protocol)
                .set("sasl.mechanism", "OAUTHBEARER")
                .set("sasl.oauthbearer.method", "oidc")
                .set("sasl.oauthbearer.token.endpoint.url", token_endpoint)
                .set("sasl.oauthbearer.client.id", client_id)
                .set("sasl.oauthbearer.client.secret", client_secret);
        }
    }
    config
}

impl RdkafkaAdmin {
    pub fn new(cluster: &Cluster, config: &GatewayConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        Ok(Self {
            cluster_id: cluster.id,
            base: client_config(cluster, timeout),
            timeout,
        })
    }

    /// Runs a blocking librdkafka call on the blocking pool.
    async fn blocking<T, F>(&self, what: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(ClientConfig, Duration) -> Result<T> + Send + 'static,
    {
        let config = self.base.clone();
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || f(config, timeout))
            .await
            .map_err(|e| Error::internal(format!("{} join error: {}", what, e)))?
    }
}

fn describe_member(group_id: &str, member: &rdkafka::groups::GroupMemberInfo) -> MemberDescription {
    let assignment = match member.assignment().map(parse_assignment) {
        Some(Ok(assigned)) => assigned,
        Some(Err(e)) => {
            warn!(group_id, member_id = member.id(), error = %e, "Unreadable member assignment");
            Vec::new()
        }
        None => Vec::new(),
    };
    MemberDescription {
        member_id: member.id().to_string(),
        client_id: member.client_id().to_string(),
        host: member.client_host().to_string(),
        assignment,
    }
}

#[async_trait]
impl GroupAdmin for RdkafkaAdmin {
    async fn list_groups(&self) -> Result<Vec<String>> {
        let cluster_id = self.cluster_id;
        self.blocking("list groups", move |config, timeout| {
            let consumer: BaseConsumer = config
                .create()
                .map_err(|e| Error::unreachable(cluster_id, e.to_string()))?;
            let groups = consumer
                .fetch_group_list(None, timeout)
                .map_err(|e| Error::unreachable(cluster_id, format!("list groups: {}", e)))?;
            Ok(groups.groups().iter().map(|g| g.name().to_string()).collect())
        })
        .await
    }

    /// One group-list round trip covers the whole batch.
    async fn describe_groups(&self, group_ids: &[String]) -> Result<Vec<GroupDescription>> {
        let cluster_id = self.cluster_id;
        let wanted: HashSet<String> = group_ids.iter().cloned().collect();
        self.blocking("describe groups", move |config, timeout| {
            let consumer: BaseConsumer = config
                .create()
                .map_err(|e| Error::unreachable(cluster_id, e.to_string()))?;
            let groups = consumer
                .fetch_group_list(None, timeout)
                .map_err(|e| Error::unreachable(cluster_id, format!("describe groups: {}", e)))?;

            Ok(groups
                .groups()
                .iter()
                .filter(|g| wanted.contains(g.name()))
                .map(|g| GroupDescription {
                    group_id: g.name().to_string(),
                    state: GroupState::parse(g.state()),
                    members: g
                        .members()
                        .iter()
                        .map(|m| describe_member(g.name(), m))
                        .collect(),
                    error: None,
                })
                .collect())
        })
        .await
    }

    async fn committed_offsets(&self, group_id: &str) -> Result<Vec<CommittedOffset>> {
        let group = group_id.to_string();
        self.blocking("committed offsets", move |mut config, timeout| {
            let consumer: BaseConsumer = config
                .set("group.id", &group)
                .set("enable.auto.commit", "false")
                .create()
                .map_err(|e| Error::group_describe(&group, e.to_string()))?;

            let metadata = consumer
                .fetch_metadata(None, timeout)
                .map_err(|e| Error::group_describe(&group, format!("metadata: {}", e)))?;

            let mut tpl = TopicPartitionList::new();
            for topic in metadata.topics().iter().filter(|t| !is_internal_topic(t.name())) {
                for partition in topic.partitions() {
                    tpl.add_partition(topic.name(), partition.id());
                }
            }

            let committed = consumer
                .committed_offsets(tpl, timeout)
                .map_err(|e| Error::group_describe(&group, format!("committed offsets: {}", e)))?;

            let offsets: Vec<CommittedOffset> = committed
                .elements()
                .iter()
                .filter_map(|elem| match elem.offset() {
                    Offset::Offset(offset) => Some(CommittedOffset {
                        topic: elem.topic().to_string(),
                        partition: elem.partition(),
                        offset,
                    }),
                    _ => None,
                })
                .collect();

            debug!(group_id = %group, partitions = offsets.len(), "Fetched committed offsets");
            Ok(offsets)
        })
        .await
    }

    async fn topic_config(&self, topic: &str) -> Result<TopicConfig> {
        let admin: AdminClient<DefaultClientContext> = self
            .base
            .create()
            .map_err(|e| Error::unreachable(self.cluster_id, e.to_string()))?;
        let options = AdminOptions::new().request_timeout(Some(self.timeout));

        let results = admin
            .describe_configs(&[ResourceSpecifier::Topic(topic)], &options)
            .await
            .map_err(|e| Error::unreachable(self.cluster_id, format!("describe configs: {}", e)))?;

        match results.into_iter().next() {
            Some(Ok(resource)) => Ok(topic_config_from_entries(
                resource
                    .entries
                    .iter()
                    .map(|entry| (entry.name.as_str(), entry.value.as_deref())),
            )),
            Some(Err(code)) => Err(Error::internal(format!(
                "describe configs for {}: {:?}",
                topic, code
            ))),
            None => Ok(TopicConfig::default()),
        }
    }
}
