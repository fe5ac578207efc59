//! remote-console main entry point
//!
//! This binary either hosts the command service in front of the built-in bot
//! registry, or relays a single command or status query to a running host.

use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use remote_console::{
    config::Config,
    control::{CommandClient, RemoteConsole},
    endpoint::{EndpointResolver, StdinPrompt},
    processor::BotRegistry,
    APP_NAME, VERSION,
};

/// Remote command channel for a bot host
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version = VERSION, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "remote-console.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Host the command service until interrupted
    Serve,

    /// Relay a command to a running host
    Send {
        /// Command text, without the trigger character
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },

    /// Query the status of a running host
    Status,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize structured logging with tracing
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load the config file, falling back to defaults when it does not exist
fn load_config(path: &str) -> anyhow::Result<Config> {
    let config = if Path::new(path).exists() {
        info!("Loading configuration from {}", path);
        Config::from_file(path)?
    } else {
        info!("No configuration file at {}, using defaults", path);
        Config::new()
    };
    config.validate()?;
    Ok(config)
}

/// Run the CLI command
async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve => {
            info!("Starting {} v{}", APP_NAME, VERSION);
            let config = load_config(&cli.config)?;
            let registry = Arc::new(BotRegistry::new(config.bots.clone()));
            info!("Registered {} bot(s)", registry.len());

            let mut console = RemoteConsole::new(&config, registry, Arc::new(StdinPrompt));
            serve(&mut console, shutdown_signal()).await;
            Ok(())
        }
        Commands::Send { command } => {
            let config = load_config(&cli.config)?;
            let mut client = CommandClient::new(EndpointResolver::new(
                config.remote,
                Arc::new(StdinPrompt),
            ));

            let reply = client.send(&command.join(" ")).await;
            client.close().await;

            match reply {
                Some(reply) => {
                    println!("{}", reply);
                    Ok(())
                }
                None => anyhow::bail!("no reply from remote console"),
            }
        }
        Commands::Status => {
            let config = load_config(&cli.config)?;
            let mut client = CommandClient::new(EndpointResolver::new(
                config.remote,
                Arc::new(StdinPrompt),
            ));

            let status = client.status().await;
            client.close().await;

            match status {
                Some(status) => {
                    println!("{}", status);
                    Ok(())
                }
                None => anyhow::bail!("no status from remote console"),
            }
        }
        Commands::Version => {
            println!("{} v{}", APP_NAME, VERSION);
            Ok(())
        }
    }
}

/// Host the service until `shutdown` completes
///
/// A service that fails to start has already logged why; the process then
/// exits normally instead of waiting on a dead listener.
async fn serve(console: &mut RemoteConsole, shutdown: impl Future<Output = ()>) {
    console.start_server().await;
    if !console.is_server_running() {
        warn!("Remote console server is not running, nothing to serve");
        return;
    }

    shutdown.await;

    info!("Shutting down remote console");
    console.shutdown().await;
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
