use clap::Parser;
use hermes::RelayServer;
use hermes::constants::{DEFAULT_HOST, DEFAULT_PORT};
use hermes::utils::init_tracing;

#[derive(Parser)]
#[command(version, about = "Hermes relay: routes sensor readings from agents to subscribed clients", long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    RelayServer::run_server(&args.host, args.port).await
}
