use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use nodekeeper::cli::{self, Cli, Command, ConfigCommand};
use nodekeeper::credentials::Credentials;
use nodekeeper::gateway::client::GatewayClient;
use nodekeeper::proxy::ProxyPool;
use nodekeeper::runner::Runner;
use nodekeeper::trace::TraceEvent;
use nodekeeper::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to run when no subcommand is given.
        None => run(false).await,
        Some(Command::Run { use_proxy }) => run(use_proxy).await,
        Some(Command::Stop) => {
            init_cli_tracing();
            let (config, _config_path) = cli::load_config()?;
            let credentials = Credentials::load(&config.credentials)?;
            let client = GatewayClient::new(&config, &credentials, None)?;
            let confirmation = client.stop_session().await?;
            println!("session stopped: {confirmation}");
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = cli::load_config()?;
            if !cli::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = cli::load_config()?;
            cli::show(&config);
            Ok(())
        }
        Some(Command::Version) => {
            println!("nodekeeper {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// The main workflow: load credentials, build the client, and run the
/// register → start-session → keep-alive sequence until it fails or a
/// termination signal arrives.
async fn run(use_proxy: bool) -> anyhow::Result<()> {
    init_tracing();

    let (config, config_path) = cli::load_config()?;
    tracing::info!(config = %config_path, "nodekeeper starting");

    let credentials = Credentials::load(&config.credentials)?;
    TraceEvent::CredentialsLoaded {
        node_id: credentials.node_id.clone(),
        hardware_id: credentials.hardware_id.clone(),
    }
    .emit();

    let proxy = if use_proxy || config.proxy.enabled {
        let pool = ProxyPool::load(&config.proxy.file)?;
        Some(pool.select()?)
    } else {
        None
    };

    let client = GatewayClient::new(&config, &credentials, proxy)?;
    let runner = Runner::new(client, &config.keepalive);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    runner.run(shutdown).await?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Initialize structured tracing for the long-running workflow.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Initialize compact stderr-only tracing for CLI one-shot commands.
///
/// Defaults to `warn` level so diagnostic output does not pollute stdout.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        tracing::info!("received SIGINT, shutting down");
    }
}
