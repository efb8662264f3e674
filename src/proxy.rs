//! Optional proxy pool: one proxy URL per line in a plain-text file, one
//! picked per run and applied to the shared HTTP client.

use crate::error::{Error, Result};
use crate::trace::TraceEvent;

/// The proxies read from the proxy file.  Never empty.
#[derive(Debug, Clone)]
pub struct ProxyPool {
    proxies: Vec<String>,
}

impl ProxyPool {
    /// Read the proxy file; blank lines are ignored.
    pub fn load(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let proxies: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect();

        if proxies.is_empty() {
            return Err(Error::Config(format!("{path}: proxy file has no entries")));
        }
        Ok(Self { proxies })
    }

    /// Pick one proxy for this run.
    pub fn pick(&self) -> &str {
        &self.proxies[pick_index(self.proxies.len())]
    }

    /// Pick one proxy and build a `reqwest::Proxy` covering all traffic.
    pub fn select(&self) -> Result<reqwest::Proxy> {
        let url = self.pick();
        TraceEvent::ProxySelected {
            proxy: url.to_owned(),
        }
        .emit();
        reqwest::Proxy::all(url).map_err(|e| Error::Config(format!("invalid proxy {url}: {e}")))
    }
}

/// Cheap "random" index from the system clock's nanosecond field.
/// Not uniform, not secure — just enough to spread runs across the pool
/// without pulling in the rand crate.
fn pick_index(len: usize) -> usize {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as usize;
    nanos % len
}
