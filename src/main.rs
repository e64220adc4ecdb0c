use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::info;

use rustyinsight::api::router;
use rustyinsight::config::{init_global_config, Settings};
use rustyinsight::explorer::{network_name, Explorer};
use rustyinsight::memory_node::MemoryNode;
use rustyinsight::metrics::init_metrics;
use rustyinsight::telemetry::init_tracing;

#[derive(Debug, Parser)]
#[command(name = "rustyinsight", about = "insight-api compatible block explorer")]
struct Cli {
    /// Config file; missing files fall back to defaults and environment
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Chain snapshot to serve, overrides `snapshot.path`
    #[arg(short, long)]
    snapshot: Option<String>,

    /// Listen address, overrides `server.listen`
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = init_global_config(&cli.config)?;
    let mut settings = Settings::from_config(config)?;
    if let Some(snapshot) = cli.snapshot {
        settings.snapshot_path = snapshot;
    }
    if let Some(listen) = cli.listen {
        settings.listen = listen;
    }

    // Held until exit so buffered log lines reach the file
    let _log_guard = init_tracing(settings.telemetry.clone())?;
    init_metrics()?;

    let node = MemoryNode::load(&settings.snapshot_path, settings.network)?;
    let explorer = Explorer::new(Arc::new(node), settings.network)
        .with_tx_page_size(settings.tx_page_size)
        .with_relay_fee(settings.relay_fee_sat);

    let app = router(Arc::new(explorer));
    let listener = tokio::net::TcpListener::bind(&settings.listen).await?;
    info!(
        listen = %settings.listen,
        network = network_name(settings.network),
        "Explorer API listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
