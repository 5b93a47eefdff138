use clap::Parser;
use hermes::constants::{AGENT_PUBLISH_EVERY_MS, DEFAULT_HOST, DEFAULT_PORT};
use hermes::transport::WsConnector;
use hermes::utils::init_tracing;
use hermes::{Agent, ConnectionHandle, Sensor};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Hermes agent: publishes dummy readings for its sensors", long_about = None)]
struct Cli {
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Number of sensors, named S0..S{n-1}
    #[arg(short, long, default_value_t = 3)]
    sensors: usize,

    #[arg(long, default_value_t = AGENT_PUBLISH_EVERY_MS, help = "Milliseconds between readings")]
    every_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let relay = ConnectionHandle::new(cli.host, cli.port);
    let sensors: Vec<Sensor> = (0..cli.sensors).map(|i| Sensor::new(format!("S{}", i))).collect();
    let agent = Agent::new(
        WsConnector::new(&relay),
        sensors,
        Duration::from_millis(cli.every_ms),
    )?;

    tracing::info!("Agent publishing to {}", relay);
    agent.run().await?;
    Ok(())
}
