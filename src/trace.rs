use serde::Serialize;

/// Structured trace events emitted across the bot lifecycle.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    CredentialsLoaded {
        node_id: String,
        hardware_id: String,
    },
    ProxySelected {
        proxy: String,
    },
    GatewayCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    AddressResolved {
        ip: String,
    },
    NodeRegistered {
        node_id: String,
        ip: String,
    },
    SessionStarted {
        node_id: String,
    },
    SessionStopped {
        node_id: String,
    },
    PingAcknowledged {
        node_id: String,
        last_seen: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "nk_event");
    }
}
