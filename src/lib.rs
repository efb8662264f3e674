//! nodekeeper — a command-line bot that registers a node identity with the
//! gateway, opens a session, and sends keep-alive pings on a fixed interval
//! until terminated or a request fails.

pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod proxy;
pub mod runner;
pub mod trace;

pub use config::Config;
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use gateway::client::GatewayClient;
pub use runner::Runner;
