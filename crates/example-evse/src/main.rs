//! Example EVSE Simulator
//!
//! Accepts V2GTP connections over TCP and runs one ISO 15118-20 DC session
//! per connection. Charger hardware is simulated.
//!
//! # Usage
//!
//! ```bash
//! ./example-evse --bind 127.0.0.1:15118
//! ```
//!
//! With config file:
//! ```bash
//! ./example-evse --config crates/example-evse/config/example-evse.toml
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn, Instrument};

use example_evse::{EvseConfig, HardwareSimulator, SimulatorConfig};
use iso15118::d20::channel;
use iso15118::io::StreamOutputView;
use iso15118::{serve_session, ConnectionConfig, MessageExchange, SessionConfig, SessionController};

#[derive(Parser, Debug)]
#[command(name = "example-evse")]
#[command(about = "Example EVSE simulator for ISO 15118-20 DC charging")]
struct Args {
    /// Configuration file path (TOML format)
    /// If provided, overrides command-line options
    #[arg(short, long)]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:15118")]
    bind: String,

    /// EVSE id advertised in SessionSetupRes
    #[arg(long)]
    evse_id: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose {
        "example_evse=debug,iso15118=debug"
    } else {
        "example_evse=info,iso15118=info"
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = if let Some(config_path) = &args.config {
        info!("Loading config from: {}", config_path);
        EvseConfig::load(config_path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?
    } else {
        let mut config = EvseConfig::default();
        config.server.bind = args.bind.clone();
        if let Some(evse_id) = &args.evse_id {
            config.evse.evse_id = evse_id.clone();
        }
        config
    };

    info!("Starting EVSE Simulator");
    info!(
        bind = %config.server.bind,
        evse_id = %config.evse.evse_id,
        services = ?config.evse.supported_energy_services,
        authorization = ?config.evse.authorization_services
    );

    if !config.simulator.authorize {
        warn!("Simulator rejects every authorization request");
    }

    let session_config = Arc::new(SessionConfig::from(config.evse.clone()));
    let listener = TcpListener::bind(&config.server.bind).await?;

    info!("EVSE Simulator ready - waiting for EVs");
    info!("Press Ctrl+C to stop");

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    spawn_session(
                        stream,
                        peer,
                        session_config.clone(),
                        config.server.connection,
                        config.simulator.clone(),
                    );
                }
                Err(e) => error!(%e, "Accept failed"),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }

    info!("EVSE Simulator stopped");
    Ok(())
}

fn spawn_session(
    stream: TcpStream,
    peer: SocketAddr,
    session_config: Arc<SessionConfig>,
    connection: ConnectionConfig,
    simulator: SimulatorConfig,
) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!(%peer, %e, "Failed to disable Nagle");
    }

    let (tx, queue) = channel();
    let hardware = HardwareSimulator::new(simulator, tx);
    let exchange = Arc::new(MessageExchange::new(StreamOutputView::new(
        connection.output_capacity,
    )));
    let controller = SessionController::new(exchange, session_config, hardware.callbacks(), queue);
    info!(%peer, session_id = %controller.context().session.id_hex(), "EV connected");

    let (reader, writer) = stream.into_split();
    tokio::spawn(
        async move {
            match serve_session(reader, writer, controller, connection).await {
                Ok(summary) => info!(
                    state = %summary.final_state,
                    stopped = summary.stopped,
                    "Connection closed"
                ),
                Err(e) => error!(%e, "Session failed"),
            }
        }
        .instrument(tracing::info_span!("connection", %peer)),
    );
}
