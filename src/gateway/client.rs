//! Typed HTTP client for the gateway API.
//!
//! `GatewayClient` wraps a `reqwest::Client` and translates each workflow
//! operation into the corresponding HTTP call.  Every operation is a single
//! attempt: a non-2xx status, a transport error, or a malformed body
//! propagates immediately and aborts the run.

use std::time::{Duration, Instant};

use reqwest::{Client, Proxy, RequestBuilder};

use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::gateway::types::{IpLookupResponse, PingRecord, RegisterRequest};
use crate::trace::TraceEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Client for the gateway and the IP lookup service.
///
/// Created once at startup and reused for the process lifetime.  The node
/// identity and bearer token are captured at construction, so every gateway
/// request carries the same credentials.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: String,
    ip_lookup_url: String,
    node_id: String,
    hardware_id: String,
    token: String,
}

impl GatewayClient {
    /// Build a new client from config + loaded credentials.
    ///
    /// When `proxy` is set, all HTTP (gateway and IP lookup) is routed
    /// through it.
    pub fn new(cfg: &Config, creds: &Credentials, proxy: Option<Proxy>) -> Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(cfg.gateway.timeout_secs));
        if let Some(proxy) = proxy {
            builder = builder.proxy(proxy);
        }
        let http = builder.build().map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.gateway.base_url.trim_end_matches('/').to_owned(),
            ip_lookup_url: cfg.ip_lookup.url.clone(),
            node_id: creds.node_id.clone(),
            hardware_id: creds.hardware_id.clone(),
            token: creds.token.clone(),
        })
    }

    /// The node identifier this client was built for.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Build the full URL for a path like `/nodes/{id}/ping`.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decorate a gateway `RequestBuilder` with the bearer credential.
    ///
    /// Only gateway requests are decorated; the IP lookup never carries
    /// the token.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.bearer_auth(&self.token)
    }

    /// Send a request and return the response body on 2xx.
    ///
    /// Exactly one attempt — no retry, no backoff.  Emits a
    /// `TraceEvent::GatewayCall` for every attempt, success or not.
    async fn execute(&self, endpoint: &str, rb: RequestBuilder) -> Result<String> {
        let start = Instant::now();
        let result = rb.send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(resp) => {
                let status = resp.status();

                TraceEvent::GatewayCall {
                    endpoint: endpoint.to_owned(),
                    status: status.as_u16(),
                    duration_ms,
                }
                .emit();

                let body = resp.text().await.map_err(from_reqwest)?;
                if !status.is_success() {
                    return Err(Error::Gateway(format!(
                        "{endpoint} returned {}: {body}",
                        status.as_u16()
                    )));
                }
                Ok(body)
            }
            Err(e) => {
                TraceEvent::GatewayCall {
                    endpoint: endpoint.to_owned(),
                    status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                    duration_ms,
                }
                .emit();

                Err(from_reqwest(e))
            }
        }
    }

    // ── workflow operations ──────────────────────────────────────────

    /// Resolve the caller's public IP via the external lookup service.
    pub async fn resolve_address(&self) -> Result<String> {
        let endpoint = "GET ip-lookup";
        let body = self
            .execute(endpoint, self.http.get(&self.ip_lookup_url))
            .await?;

        let parsed: IpLookupResponse = serde_json::from_str(&body).map_err(|e| {
            Error::Gateway(format!("{endpoint}: failed to parse response: {e}: {body}"))
        })?;

        TraceEvent::AddressResolved {
            ip: parsed.ip.clone(),
        }
        .emit();

        Ok(parsed.ip)
    }

    /// Register the node (identity + public address) with the gateway.
    pub async fn register(&self, ip: &str) -> Result<serde_json::Value> {
        let endpoint = format!("POST /nodes/{}", self.node_id);
        let url = self.url(&format!("/nodes/{}", self.node_id));
        let payload = RegisterRequest {
            ip_address: ip.to_owned(),
            hardware_id: self.hardware_id.clone(),
        };

        let body = self
            .execute(&endpoint, self.decorate(self.http.post(&url).json(&payload)))
            .await?;
        let confirmation = parse_json(&endpoint, &body)?;

        TraceEvent::NodeRegistered {
            node_id: self.node_id.clone(),
            ip: ip.to_owned(),
        }
        .emit();

        Ok(confirmation)
    }

    /// Open a session for the node.
    pub async fn start_session(&self) -> Result<serde_json::Value> {
        let endpoint = format!("POST /nodes/{}/start-session", self.node_id);
        let url = self.url(&format!("/nodes/{}/start-session", self.node_id));

        let body = self
            .execute(&endpoint, self.decorate(self.http.post(&url)))
            .await?;
        let confirmation = parse_json(&endpoint, &body)?;

        TraceEvent::SessionStarted {
            node_id: self.node_id.clone(),
        }
        .emit();

        Ok(confirmation)
    }

    /// Close the node's session.
    pub async fn stop_session(&self) -> Result<serde_json::Value> {
        let endpoint = format!("POST /nodes/{}/stop-session", self.node_id);
        let url = self.url(&format!("/nodes/{}/stop-session", self.node_id));

        let body = self
            .execute(&endpoint, self.decorate(self.http.post(&url)))
            .await?;
        let confirmation = parse_json(&endpoint, &body)?;

        TraceEvent::SessionStopped {
            node_id: self.node_id.clone(),
        }
        .emit();

        Ok(confirmation)
    }

    /// Send one keep-alive ping and return the server's ping record.
    ///
    /// A record with no ping entries is treated as malformed.
    pub async fn ping(&self) -> Result<PingRecord> {
        let endpoint = format!("POST /nodes/{}/ping", self.node_id);
        let url = self.url(&format!("/nodes/{}/ping", self.node_id));

        let body = self
            .execute(&endpoint, self.decorate(self.http.post(&url)))
            .await?;

        let record: PingRecord = serde_json::from_str(&body).map_err(|e| {
            Error::Gateway(format!("{endpoint}: failed to parse response: {e}: {body}"))
        })?;

        let last_seen = record
            .last_seen()
            .ok_or_else(|| Error::Gateway(format!("{endpoint}: response has no ping entries")))?;

        TraceEvent::PingAcknowledged {
            node_id: record.node_id.clone(),
            last_seen: last_seen.to_rfc3339(),
        }
        .emit();

        Ok(record)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Parse a confirmation body, keeping the offending body in the error.
fn parse_json(endpoint: &str, body: &str) -> Result<serde_json::Value> {
    serde_json::from_str(body)
        .map_err(|e| Error::Gateway(format!("{endpoint}: failed to parse response: {e}: {body}")))
}
