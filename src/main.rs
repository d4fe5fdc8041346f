use anyhow::{Context, Result};
use clap::Parser;
use envgrid_processor::BatchProcessor;
use envgrid_processor::cli::Args;
use std::process;
use tracing::{debug, info};

fn main() {
    let args = Args::parse();

    setup_logging(&args);

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    if let Err(error) = runtime.block_on(run(args)) {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = args
        .build_config()
        .context("Failed to load configuration")?;
    debug!("Configuration: {:?}", config);

    let processor = BatchProcessor::new(args.data_dir.clone(), args.output_dir.clone())
        .with_context(|| format!("Cannot read data directory {}", args.data_dir.display()))?
        .with_config(config)?;

    let stats = processor.process().await.context("Preprocessing failed")?;

    info!(
        "Processed {} of {} files ({} failed)",
        stats.files_processed, stats.files_discovered, stats.files_failed
    );
    Ok(())
}

fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("envgrid_processor={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
}
