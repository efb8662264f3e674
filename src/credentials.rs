//! Credential loading from the two plain-text files the bot ships with:
//! an id file holding `node_id:hardware_id` and a token file holding the
//! bearer token.  Loaded once at startup, immutable afterwards.

use crate::config::CredentialsConfig;
use crate::error::{Error, Result};

/// The node identity and bearer credential for the process lifetime.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub node_id: String,
    pub hardware_id: String,
    pub token: String,
}

impl Credentials {
    /// Read both credential files from the configured paths.
    ///
    /// The id file is split on the first `:`; both halves are trimmed and
    /// must be non-empty.  The token file is trimmed and must be non-empty.
    pub fn load(cfg: &CredentialsConfig) -> Result<Self> {
        let raw = std::fs::read_to_string(&cfg.id_file)?;
        let (node_id, hardware_id) = raw.trim().split_once(':').ok_or_else(|| {
            Error::Credentials(format!(
                "{}: expected `node_id:hardware_id`, found no `:`",
                cfg.id_file
            ))
        })?;
        let node_id = node_id.trim();
        let hardware_id = hardware_id.trim();
        if node_id.is_empty() {
            return Err(Error::Credentials(format!("{}: empty node id", cfg.id_file)));
        }
        if hardware_id.is_empty() {
            return Err(Error::Credentials(format!(
                "{}: empty hardware id",
                cfg.id_file
            )));
        }

        let token = std::fs::read_to_string(&cfg.token_file)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Credentials(format!(
                "{}: empty bearer token",
                cfg.token_file
            )));
        }

        Ok(Self {
            node_id: node_id.to_owned(),
            hardware_id: hardware_id.to_owned(),
            token: token.to_owned(),
        })
    }
}
