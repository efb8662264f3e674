use clap::{Parser, Subcommand};

use crate::config::{Config, ConfigSeverity};

/// nodekeeper — keep-alive bot for a gateway-registered node.
#[derive(Debug, Parser)]
#[command(name = "nodekeeper", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register the node, start a session, and keep it alive (default
    /// when no subcommand is given).
    Run {
        /// Route all HTTP through a proxy picked from the proxy file.
        #[arg(long)]
        use_proxy: bool,
    },
    /// Send a one-shot stop-session for the configured node.
    Stop,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any issues.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `NODEKEEPER_CONFIG`
/// (or `config.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path =
        std::env::var("NODEKEEPER_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = Config::load_or_default(&config_path)?;
    Ok((config, config_path))
}

/// Print validation issues for the given config.  Returns `false` when
/// any issue is an error.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();
    if issues.is_empty() {
        println!("{config_path}: OK");
        return true;
    }
    for issue in &issues {
        println!("{issue}");
    }
    !issues
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error)
}

/// Dump the resolved configuration as TOML.
pub fn show(config: &Config) {
    match toml::to_string_pretty(config) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to render config: {e}"),
    }
}
