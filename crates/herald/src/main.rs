//! Herald - fan security events out to chat, serverless and webhook sinks
//!
//! # Usage
//!
//! ```bash
//! herald
//! herald --config configs/herald.toml
//! herald --config herald.toml --log-level debug
//! ```

mod server;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use herald_config::{Config, LogFormat};
use herald_metrics::MetricsRegistry;
use herald_pipeline::Dispatcher;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::server::{ServerState, build_router, serve};

/// Config files tried, in order, when `--config` is not given
const DEFAULT_CONFIG_PATHS: [&str; 2] = ["configs/herald.toml", "herald.toml"];

/// Herald - fan security events out to Teams, Fission and webhooks
#[derive(Parser, Debug)]
#[command(name = "herald")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (error if specified but not found)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_path) = load_config(cli.config.as_deref())?;
    let log_level = cli
        .log_level
        .unwrap_or_else(|| config.log.level.as_str().to_owned());
    init_logging(&log_level, config.log.format)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        config = %config_path,
        "Herald starting"
    );

    if let Err(e) = run(config).await {
        error!(error = %e, "server error");
        return Err(e);
    }

    info!("Herald shutdown complete");
    Ok(())
}

/// Load the explicit config file, or the first default path that exists
fn load_config(path: Option<&Path>) -> Result<(Config, String)> {
    if let Some(path) = path {
        if !path.exists() {
            bail!("config file not found: {}", path.display());
        }
        let config = Config::from_file(path).context("failed to load configuration")?;
        return Ok((config, path.display().to_string()));
    }

    for candidate in DEFAULT_CONFIG_PATHS {
        let path = Path::new(candidate);
        if path.exists() {
            let config = Config::from_file(path).context("failed to load configuration")?;
            return Ok((config, candidate.to_owned()));
        }
    }

    Ok((Config::default(), "(default)".to_owned()))
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
    }

    Ok(())
}

/// Build sinks and serve until a shutdown signal arrives
async fn run(config: Config) -> Result<()> {
    if config.enabled_sinks().is_empty() {
        bail!("no sink enabled; configure at least one [sinks.*] table");
    }

    let registry = Arc::new(
        MetricsRegistry::from_config(&config.metrics).context("failed to create metrics registry")?,
    );
    let sinks = herald_sinks::build_sinks(&config, &registry)
        .await
        .context("failed to build sinks")?;
    let dispatcher = Arc::new(Dispatcher::new(sinks, Arc::clone(&registry))?);

    info!(
        sinks = ?dispatcher.sink_names(),
        statsd = config.metrics.statsd.is_some(),
        "sinks ready"
    );

    let listener = TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen))?;
    info!(address = %config.server.listen, "listening");

    let cancel = CancellationToken::new();
    let state = Arc::new(ServerState::new(Arc::clone(&dispatcher)));
    let app = build_router(Arc::clone(&state), config.server.max_body_size);
    let server = tokio::spawn(serve(listener, app, cancel.clone()));

    wait_for_shutdown().await?;
    info!("shutdown signal received, stopping server...");
    cancel.cancel();

    server
        .await
        .context("server task panicked")?
        .context("server error")?;
    state.drain(config.server.shutdown_grace).await;

    let snapshot = dispatcher.metrics();
    info!(
        events = snapshot.events_received,
        dispatches = snapshot.tasks_spawned,
        in_flight = registry.in_flight(),
        "server stopped"
    );
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() -> Result<()> {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .context("failed to install Ctrl+C handler")
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install signal handler")?
            .recv()
            .await;
        Ok::<(), anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        result = ctrl_c => result,
        result = terminate => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from(["herald", "--config", "herald.toml", "--log-level", "debug"]);
        assert_eq!(cli.config, Some(PathBuf::from("herald.toml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));

        let cli = Cli::parse_from(["herald"]);
        assert!(cli.config.is_none());
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let err = load_config(Some(Path::new("/nonexistent/herald.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_load_explicit_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[sinks.teams]\nwebhook_url = \"https://outlook.office.com/webhook/abc\""
        )
        .unwrap();

        let (config, shown) = load_config(Some(file.path())).unwrap();
        assert_eq!(config.enabled_sinks(), vec!["teams".to_owned()]);
        assert_eq!(shown, file.path().display().to_string());
    }

    #[tokio::test]
    async fn test_refuses_to_start_without_sinks() {
        let err = run(Config::default()).await.unwrap_err();
        assert!(err.to_string().contains("no sink enabled"));
    }
}
