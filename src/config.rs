use serde::{Deserialize, Serialize};

/// Connection and tuning settings for the Kafka-backed [`crate::consumer::LogConsumer`].
///
/// Mirrors the shape of a typical client connection config: broker list,
/// consumer group, optional transport security, and the reader's own poll
/// timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    pub bootstrap_servers: String,
    pub group_id: String,

    /// "PLAINTEXT" | "SSL" | "SASL_PLAINTEXT" | "SASL_SSL". Defaults to
    /// "PLAINTEXT" when unset.
    #[serde(default)]
    pub security_protocol: Option<String>,
    #[serde(default)]
    pub ssl_ca_location: Option<String>,
    #[serde(default)]
    pub sasl_mechanism: Option<String>,
    #[serde(default)]
    pub sasl_username: Option<String>,
    #[serde(default)]
    pub sasl_password: Option<String>,

    /// Bound on the consumer's own metadata-fetch timeouts (seconds).
    #[serde(default = "default_metadata_timeout_secs")]
    pub metadata_timeout_secs: u64,

    /// Bound on a single [`crate::consumer::LogConsumer::poll`] call (milliseconds).
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

fn default_metadata_timeout_secs() -> u64 {
    5
}

fn default_poll_timeout_ms() -> u64 {
    10
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".into(),
            group_id: "changelog-restore".into(),
            security_protocol: None,
            ssl_ca_location: None,
            sasl_mechanism: None,
            sasl_username: None,
            sasl_password: None,
            metadata_timeout_secs: default_metadata_timeout_secs(),
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }
}
