use anyhow::Result;
use clap::Parser;
use dell_disk_exporter::{config::Config, server};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// Port to listen on for metrics (overrides config)
    #[arg(short, long, env = "EXPORTER_PORT")]
    port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long, env = "EXPORTER_ADDR")]
    addr: Option<String>,

    /// Seconds between polls of each subsystem (overrides config)
    #[arg(long, env = "EXPORTER_POLL_INTERVAL")]
    poll_interval: Option<u64>,

    /// Seconds a disk may be missing before its series are removed (overrides config)
    #[arg(long, env = "EXPORTER_GRACE_PERIOD")]
    grace_period: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Dell Disk Exporter v{}", env!("CARGO_PKG_VERSION"));

    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(&args.config)?;

    // Override with CLI arguments if provided
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(secs) = args.poll_interval {
        config.metrics.poll_interval_seconds = secs;
    }
    if let Some(secs) = args.grace_period {
        config.metrics.absence_grace_seconds = secs;
    }
    config.validate()?;

    info!("Configuration loaded successfully");
    info!(
        "Polling every {}s, absence grace period {}s",
        config.metrics.poll_interval_seconds, config.metrics.absence_grace_seconds
    );
    info!(
        "Metrics endpoint: http://{}:{}/metrics",
        config.server.addr, config.server.port
    );

    // Start the metrics server
    if let Err(e) = server::start(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
