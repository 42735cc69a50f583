use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// What a node reports about one hop, both to its caller and to its log.
///
/// Field order is the serialization order. Workload fields are present only
/// when that workload actually ran, and hold the configured value verbatim.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RelayMetadata {
    pub when: String,
    pub me: String,
    pub from: String,
    pub request: String,
    pub pass: String,
    pub thread: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram: Option<String>,
}

impl RelayMetadata {
    /// Starts a record stamped with the current time.
    pub fn now(me: &str, from: String, request: String) -> Self {
        RelayMetadata {
            when: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            me: me.to_string(),
            from,
            request,
            ..Default::default()
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
