//! Zone Turns - Binary Entry Point
//!
//! Reads JSON-lines zone events on stdin and writes detected turns to
//! stdout. Logs go to stderr.

use tracing::info;
use tracing_subscriber::EnvFilter;

use zone_turns::{PipelineConfig, TurnResult, TurnServer, NAME, VERSION};

#[tokio::main]
async fn main() -> TurnResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("zone_turns=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = PipelineConfig::from_env()?;
    info!(
        partitions = config.partitions,
        ttl_secs = config.ttl.as_secs(),
        sweep_secs = config.sweep_interval.as_secs(),
        "{} {} starting",
        NAME,
        VERSION
    );

    let server = TurnServer::new(config);
    server.run().await?;

    // A pending stdin read would otherwise keep the runtime alive on Ctrl+C
    std::process::exit(0);
}
