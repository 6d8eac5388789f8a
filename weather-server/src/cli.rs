use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::net::TcpListener;
use weather_core::Config;

use crate::routes;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-server", version, about = "Weather and activity recommendation service")]
pub struct Cli {
    /// Config file; defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP service.
    Serve {
        /// Listen address, e.g. "127.0.0.1:5000". Overrides config and BIND_ADDR.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Print where the config file is read from.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve { bind } => {
                let mut config = match &self.config {
                    Some(path) => Config::load_from(path)?,
                    None => Config::load()?,
                };
                config.apply_env();
                if let Some(bind) = bind {
                    config.server.bind = bind;
                }

                serve(config).await
            }
            Command::ConfigPath => {
                let path = match self.config {
                    Some(path) => path,
                    None => Config::config_file_path()?,
                };
                println!("{}", path.display());
                Ok(())
            }
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let handler = weather_core::handler_from_config(&config)?;
    let app = routes::router(handler);

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!("Failed to listen for SIGTERM: {err}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
