//! Wire types for the gateway API and the IP lookup service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response body of the external IP lookup service.
#[derive(Debug, Clone, Deserialize)]
pub struct IpLookupResponse {
    pub ip: String,
}

/// Body of `POST /nodes/{id}` (node registration).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub ip_address: String,
    pub hardware_id: String,
}

/// Acknowledgment returned by `POST /nodes/{id}/ping`.
///
/// Consumed only for logging; nothing is retained between pings.
#[derive(Debug, Clone, Deserialize)]
pub struct PingRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(default)]
    pub pings: Vec<PingEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PingEntry {
    pub timestamp: DateTime<Utc>,
}

impl PingRecord {
    /// Timestamp of the most recent ping entry, if any.
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.pings.last().map(|p| p.timestamp)
    }
}
