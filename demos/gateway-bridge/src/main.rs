//! A bridge printing the events of a Zigbee gateway.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use zhub::command::{CommandBuilder, CommandKind};

use zhub_gateway::backoff::BackoffConfig;
use zhub_gateway::config::GatewayConfig;
use zhub_gateway::session::{GatewayHandle, GatewaySession};

use tracing::{Level, error, info};

/// Connects to a Zigbee gateway and logs its device events.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gateway address.
    #[arg(short, long, required_unless_present = "config")]
    gateway: Option<String>,

    /// Broker host.
    #[arg(long, default_value = "localhost")]
    broker_host: String,

    /// Broker port.
    #[arg(long, default_value_t = 1883)]
    broker_port: u16,

    /// A `JSON` configuration file, replacing all the other connection
    /// options.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of consecutive reconnection attempts.
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Milliseconds the coprocessor waits after each command.
    #[arg(long, default_value_t = 0)]
    post_delay: u64,

    /// Form a network before starting.
    #[arg(long)]
    form_network: bool,

    /// Open the network for joining devices.
    #[arg(long)]
    permit_join: bool,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, thiserror::Error)]
enum BridgeError {
    #[error("Impossible to read `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid configuration `{}`: {source}", path.display())]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Missing gateway address")]
    MissingGateway,
}

impl Args {
    fn gateway_config(&self) -> Result<GatewayConfig, BridgeError> {
        if let Some(path) = &self.config {
            let file = std::fs::read(path).map_err(|source| BridgeError::Read {
                path: path.clone(),
                source,
            })?;
            return serde_json::from_slice(&file).map_err(|source| BridgeError::Config {
                path: path.clone(),
                source,
            });
        }

        let gateway = self
            .gateway
            .as_deref()
            .ok_or(BridgeError::MissingGateway)?;

        let mut backoff = BackoffConfig::new();
        if let Some(max_attempts) = self.max_attempts {
            backoff = backoff.max_attempts(max_attempts);
        }

        Ok(GatewayConfig::new(gateway)
            .broker(self.broker_host.as_str(), self.broker_port)
            .backoff(backoff))
    }

    fn startup_commands(&self) -> Vec<CommandKind> {
        let mut kinds = Vec::new();
        if self.form_network {
            kinds.push(CommandKind::FormNetwork);
        }
        if self.permit_join {
            kinds.push(CommandKind::PermitJoin);
        }
        kinds
    }
}

async fn send_startup_commands(
    handle: &GatewayHandle,
    builder: CommandBuilder,
    kinds: &[CommandKind],
) {
    for kind in kinds {
        match handle.publish(builder.build(kind)).await {
            Ok(()) => info!("`{kind}` command sent"),
            Err(e) => error!("Impossible to send the `{kind}` command: {e}"),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .init();

    let config = match args.gateway_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return;
        }
    };

    info!(
        "Connecting to gateway `{}` through {}:{}",
        config.gateway_address(),
        config.broker_host(),
        config.broker_port()
    );

    let (handle, mut events) = GatewaySession::new(config).spawn();

    let builder = CommandBuilder::new().post_delay(Duration::from_millis(args.post_delay));
    send_startup_commands(&handle, builder, &args.startup_commands()).await;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Impossible to listen for the shutdown signal: {e}");
                }
                break;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    error!("The gateway session has stopped");
                    break;
                };

                match serde_json::to_string(&event) {
                    Ok(json) => info!("{json}"),
                    Err(e) => error!("Impossible to serialize event `{}`: {e}", event.name()),
                }
            }
        }
    }

    handle.shutdown().await;
}
