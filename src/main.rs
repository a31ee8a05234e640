//! GPU User Exporter
//!
//! Queries nvidia-smi for running compute processes, resolves each pid to
//! its owning user, and serves the device → users mapping on /metrics.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gpu_user_exporter::collector::device::NvidiaSmiSource;
use gpu_user_exporter::collector::user::PsUserResolver;
use gpu_user_exporter::collector::Aggregator;
use gpu_user_exporter::config::Config;
use gpu_user_exporter::exporter::GpuUserExporter;
use gpu_user_exporter::server::http;

#[derive(Parser, Debug)]
#[command(name = "gpu-user-exporter")]
#[command(about = "Prometheus exporter for GPU occupancy by user", long_about = None)]
#[command(version)]
struct Args {
    /// Address to serve the metrics endpoint on
    #[arg(
        short,
        long,
        env = "GPU_USER_EXPORTER_LISTEN",
        default_value = "0.0.0.0:9102"
    )]
    listen: String,

    /// Path to the nvidia-smi binary
    #[arg(long, default_value = "nvidia-smi")]
    nvidia_smi: String,

    /// Path to the ps binary
    #[arg(long, default_value = "ps")]
    ps: String,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose);

    let config = Config {
        listen_addr: args.listen,
        nvidia_smi_path: args.nvidia_smi,
        ps_path: args.ps,
    };
    config.validate()?;

    info!("Starting GPU user exporter");

    let aggregator = Aggregator::new(
        NvidiaSmiSource::new(&config.nvidia_smi_path),
        PsUserResolver::new(&config.ps_path),
    );
    let exporter = Arc::new(GpuUserExporter::new(aggregator).context("Metric registration failed")?);

    let addr = config
        .listen_addr
        .parse()
        .context("Invalid listen address")?;

    http::serve(addr, exporter)
        .await
        .context("HTTP server error")
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
