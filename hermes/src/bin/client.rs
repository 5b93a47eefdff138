use clap::Parser;
use futures_util::StreamExt;
use hermes::constants::{DEFAULT_HOST, DEFAULT_PORT};
use hermes::session::ExponentialBackoff;
use hermes::utils::init_tracing;
use hermes::{ConnectionHandle, Envelope, Session, SessionConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Hermes client: prints readings of the sensors it subscribes to", long_about = None)]
struct Cli {
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Sensors to subscribe to
    #[arg(required = true)]
    sensors: Vec<String>,

    #[arg(long, help = "Name announced to the relay (random if omitted)")]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = SessionConfig::new().with_backoff(ExponentialBackoff::default());
    if let Some(name) = cli.name {
        config = config.with_client_name(name);
    }
    let relay = ConnectionHandle::new(cli.host, cli.port);
    let session = Session::websocket(&relay, config);

    for sensor_id in &cli.sensors {
        session.register_callback(
            sensor_id.as_str(),
            |sensor_id, readings, args| {
                info!("Callback: {} - {}, {}", sensor_id, readings, args.join(" "));
            },
            vec![relay.to_string()],
        );
        session.subscribe(sensor_id.as_str())?;
        session.connection_status(sensor_id.as_str())?;
    }
    session.connect()?;
    info!("Client {} connecting to {}", session.client_name(), relay);

    // Status answers and acknowledgements arrive on the inbound stream
    let mut inbound = session.inbound();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = inbound.next() => match next {
                Some(Ok(Envelope::SensorConnectionStatus { sensor_id, connected: Some(connected) })) => {
                    info!("Sensor {} subscribed on relay: {}", sensor_id, connected);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => tracing::warn!("inbound stream lagged: {}", e),
                None => break,
            },
        }
    }

    session.disconnect().await?;
    info!("Client stopped");
    Ok(())
}
