use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub ip_lookup: IpLookupConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub keepalive: KeepaliveConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl Config {
    /// Load the config from `path`, falling back to defaults when the file
    /// does not exist.  A file that exists but fails to parse is an error.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("parsing {path}: {e}")))
    }

    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut issues = Vec::new();

        if self.gateway.base_url.trim().is_empty() {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "gateway.base_url".into(),
                message: "must not be empty".into(),
            });
        }
        if self.gateway.timeout_secs == 0 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "gateway.timeout_secs".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.ip_lookup.url.trim().is_empty() {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "ip_lookup.url".into(),
                message: "must not be empty".into(),
            });
        }
        if self.credentials.id_file.trim().is_empty() {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "credentials.id_file".into(),
                message: "must not be empty".into(),
            });
        }
        if self.credentials.token_file.trim().is_empty() {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "credentials.token_file".into(),
                message: "must not be empty".into(),
            });
        }
        if self.keepalive.ping_interval_secs == 0 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "keepalive.ping_interval_secs".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.proxy.enabled && self.proxy.file.trim().is_empty() {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "proxy.file".into(),
                message: "proxy is enabled but no proxy file is configured".into(),
            });
        }
        if self.keepalive.ping_interval_secs < 10 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "keepalive.ping_interval_secs".into(),
                message: "intervals under 10s may get the node rate-limited".into(),
            });
        }

        issues
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Gateway connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the gateway REST API.
    #[serde(default = "d_gateway_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "d_30")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: d_gateway_url(),
            timeout_secs: 30,
        }
    }
}

// ── Public IP lookup ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpLookupConfig {
    /// URL of the external IP lookup service (returns `{"ip": "..."}`).
    #[serde(default = "d_ip_lookup_url")]
    pub url: String,
}

impl Default for IpLookupConfig {
    fn default() -> Self {
        Self {
            url: d_ip_lookup_url(),
        }
    }
}

// ── Credential files ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// File holding `node_id:hardware_id`.
    #[serde(default = "d_id_file")]
    pub id_file: String,
    /// File holding the bearer token.
    #[serde(default = "d_token_file")]
    pub token_file: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            id_file: d_id_file(),
            token_file: d_token_file(),
        }
    }
}

// ── Keep-alive loop ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepaliveConfig {
    /// Seconds between keep-alive pings.
    #[serde(default = "d_60")]
    pub ping_interval_secs: u64,
    /// Send one best-effort stop-session after a termination signal.
    #[serde(default = "d_true")]
    pub stop_session_on_exit: bool,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: 60,
            stop_session_on_exit: true,
        }
    }
}

// ── Proxy ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Route all HTTP through a proxy picked from `file`.
    #[serde(default)]
    pub enabled: bool,
    /// File with one proxy URL per line (blank lines ignored).
    #[serde(default = "d_proxy_file")]
    pub file: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            file: d_proxy_file(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_gateway_url() -> String {
    "https://gateway-run.bls.dev/api/v1".into()
}
fn d_ip_lookup_url() -> String {
    "https://tight-block-2413.txlabs.workers.dev".into()
}
fn d_id_file() -> String {
    "id.txt".into()
}
fn d_token_file() -> String {
    "user.txt".into()
}
fn d_proxy_file() -> String {
    "proxy.txt".into()
}
fn d_30() -> u64 {
    30
}
fn d_60() -> u64 {
    60
}
fn d_true() -> bool {
    true
}
