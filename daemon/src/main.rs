//! Votegate daemon: entry point for running the voting gateway.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use votegate_chain::SimulatedLedger;
use votegate_gateway::{init_logging, Environment, Gateway, GatewayConfig};
use votegate_types::{Identity, SystemClock};
use votegate_utils::LogFormat;

#[derive(Parser, Debug)]
#[command(name = "votegate", about = "Voting gateway daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// flags and environment variables override them.
    #[arg(long, env = "VOTEGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Deployment environment: "local", "dev" or "prod".
    #[arg(long, env = "VOTEGATE_ENV")]
    env: Option<Environment>,

    /// HTTP API port.
    #[arg(long, env = "VOTEGATE_HTTP_PORT")]
    http_port: Option<u16>,

    /// WebSocket bridge port.
    #[arg(long, env = "VOTEGATE_WS_PORT")]
    websocket_port: Option<u16>,

    /// Do not serve the WebSocket bridge.
    #[arg(long, env = "VOTEGATE_NO_WEBSOCKET")]
    no_websocket: bool,

    /// Seconds between background status sweeps.
    #[arg(long, env = "VOTEGATE_STATUS_REFRESH_SECS")]
    status_refresh_secs: Option<u64>,

    /// Log filter, e.g. "info" or "debug,votegate_sessions=trace".
    #[arg(long, env = "VOTEGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "VOTEGATE_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run the gateway until SIGINT/SIGTERM.
    Run,
}

impl Cli {
    /// Load the file config (or defaults) and apply flag overrides.
    fn gateway_config(&self) -> anyhow::Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => GatewayConfig::default(),
        };

        if let Some(env) = self.env {
            config.env = env;
        }
        if let Some(port) = self.http_port {
            config.http_port = port;
        }
        if let Some(port) = self.websocket_port {
            config.websocket_port = port;
        }
        if self.no_websocket {
            config.enable_websocket = false;
        }
        if let Some(secs) = self.status_refresh_secs {
            config.status_refresh_secs = secs;
        }
        if let Some(level) = &self.log_level {
            config.log_level = Some(level.clone());
        }
        if let Some(format) = &self.log_format {
            config.log_format = Some(LogFormat::parse(format));
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.gateway_config()?;

    let (log_format, log_level) = config.logging();
    init_logging(log_format, &log_level);

    match cli.command {
        Command::Run => run(config).await,
    }
}

async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    let websocket = if config.enable_websocket {
        config.websocket_port.to_string()
    } else {
        "off".into()
    };
    tracing::info!(
        env = %config.env,
        http_port = config.http_port,
        websocket = %websocket,
        "starting votegate"
    );

    let clock = Arc::new(SystemClock);
    let operator = Identity::parse(&config.operator_address).context("operator_address")?;
    let ledger = Arc::new(SimulatedLedger::new(
        clock.clone(),
        operator,
        config.claim_cooldown(),
    ));
    tracing::info!("using the in-process simulated ledger");

    let mut gateway = Gateway::new(config, clock, ledger)?;
    gateway.start().await?;

    let reason = gateway.shutdown.wait_for_signal().await;
    tracing::info!(?reason, "shutdown signal received, stopping gateway");
    if let Err(e) = gateway.stop().await {
        tracing::warn!(error = %e, "gateway did not stop cleanly");
    }

    tracing::info!("votegate exited");
    Ok(())
}
