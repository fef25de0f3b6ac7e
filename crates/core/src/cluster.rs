//! Cluster identity, connection endpoint and credentials.

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Registry-assigned cluster identifier.
pub type ClusterId = u32;

/// Lifecycle status of a cluster. Only `Active` clusters are queried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterStatus {
    #[default]
    Active,
    Inactive,
    Connecting,
    Error,
}

/// SASL mechanism used with a shared secret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaslMechanism {
    #[serde(rename = "PLAIN")]
    Plain,
    #[default]
    #[serde(rename = "SCRAM-SHA-256")]
    ScramSha256,
    #[serde(rename = "SCRAM-SHA-512")]
    ScramSha512,
}

/// How the viewer authenticates against a cluster.
///
/// Secrets are accepted on input but never serialized back out. An empty
/// secret on update keeps the stored one, see [`Credentials::inherit_secret`].
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum Credentials {
    #[default]
    None,
    #[serde(rename_all = "camelCase")]
    SharedSecret {
        username: String,
        #[serde(default, skip_serializing)]
        password: String,
        #[serde(default)]
        mechanism: SaslMechanism,
    },
    #[serde(rename_all = "camelCase")]
    OidcBearer {
        token_endpoint: String,
        client_id: String,
        #[serde(default, skip_serializing)]
        client_secret: String,
    },
}

impl Credentials {
    /// Fills an empty secret from `previous` when both name the same principal.
    pub fn inherit_secret(&mut self, previous: &Credentials) {
        match (self, previous) {
            (
                Self::SharedSecret {
                    username, password, ..
                },
                Self::SharedSecret {
                    username: old_username,
                    password: old_password,
                    ..
                },
            ) => {
                if password.is_empty() && *username == *old_username {
                    password.clone_from(old_password);
                }
            }
            (
                Self::OidcBearer {
                    client_id,
                    client_secret,
                    ..
                },
                Self::OidcBearer {
                    client_id: old_client_id,
                    client_secret: old_secret,
                    ..
                },
            ) => {
                if client_secret.is_empty() && *client_id == *old_client_id {
                    client_secret.clone_from(old_secret);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::SharedSecret {
                username,
                mechanism,
                ..
            } => f
                .debug_struct("SharedSecret")
                .field("username", username)
                .field("mechanism", mechanism)
                .finish_non_exhaustive(),
            Self::OidcBearer {
                token_endpoint,
                client_id,
                ..
            } => f
                .debug_struct("OidcBearer")
                .field("token_endpoint", token_endpoint)
                .field("client_id", client_id)
                .finish_non_exhaustive(),
        }
    }
}

/// A broker cluster known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// 0 on input asks the registry to assign one
    #[serde(default)]
    pub id: ClusterId,
    /// Display name
    #[serde(alias = "connectionName")]
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    #[serde(default)]
    pub status: ClusterStatus,
    #[serde(default)]
    pub credentials: Credentials,
    /// Connect over TLS
    #[serde(default)]
    pub tls: bool,
}

impl Cluster {
    pub fn new(id: ClusterId, name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            id,
            name: name.into(),
            host: host.into(),
            port,
            status: ClusterStatus::Active,
            credentials: Credentials::None,
            tls: false,
        }
    }

    pub fn with_status(mut self, status: ClusterStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Bootstrap address in `host:port` form.
    pub fn bootstrap(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_active(&self) -> bool {
        self.status == ClusterStatus::Active
    }
}
