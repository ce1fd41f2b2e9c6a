//! ArborDir directory server binary.
//!
//! Starts the server context, wires the session registry into operation
//! dispatch, and runs until a shutdown signal arrives.
//!
//! # Usage
//!
//! ```bash
//! # Start with a config file
//! arbordir-server --config /etc/arbordir/config.toml
//!
//! # Override the listen address
//! ARBORDIR__LISTEN_ADDR=0.0.0.0:3890 arbordir-server
//! ```

use std::io::IsTerminal;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use arbordir_server::config::{Config, ConfigError, LogFormat};
use arbordir_server::context::ServerContext;
use arbordir_server::shutdown;

/// Command-line arguments. Values given here override both the configuration
/// file and environment variables.
#[derive(Debug, Parser)]
#[command(name = "arbordir-server", version, about = "ArborDir directory server")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<String>,

    /// Address to listen on for client connections.
    #[arg(long)]
    listen: Option<std::net::SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), ConfigError> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }

    init_logging(&config);

    tracing::info!(listen_addr = %config.listen_addr, "starting ArborDir directory server");

    let context = ServerContext::new(config);
    // The connection handlers and the operation pipeline attach here:
    // context.open_connection() per accepted client, context.event_handler()
    // into post-commit dispatch.
    let _handler = context.event_handler();

    tracing::info!("server ready");
    shutdown::shutdown_signal().await;

    context.shutdown();
    tracing::info!("server shutdown complete");
    Ok(())
}

/// Initializes the logging system based on configuration.
///
/// `Auto` picks JSON when stdout is not a terminal, text otherwise.
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = match config.log_format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !std::io::stdout().is_terminal(),
    };

    if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
