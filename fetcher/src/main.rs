mod app;
mod batch;
mod driver;
mod ingest;
mod model;
mod sink;
#[cfg(test)]
mod testing;

use clap::Parser;
use fetcher_core::{telemetry, Config};
use std::process;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[clap(name = "fetch-sis-import-logs")]
#[clap(about = "Extract Canvas SIS import logs into a flat log file", version)]
struct Cli {
    /// Number of pages to fetch, 100 records each [default: fetch.pages]
    #[clap(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pages: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "Fatal error");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Usage errors exit before configuration is touched
    let cli = Cli::parse();

    let config = Config::load();

    // Initialize telemetry, falling back to defaults so config errors are still logged
    let telemetry_config = config
        .as_ref()
        .map(|c| c.telemetry.clone())
        .unwrap_or_default();
    telemetry::init(&telemetry_config)?;

    let config = config.map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    let pages = cli.pages.unwrap_or(config.fetch.pages);
    info!(
        pages,
        output = %config.output.path.display(),
        "Extracting {} page(s) of SIS import logs via the Canvas REST API",
        pages
    );

    let mut app = app::App::new(config).await?;
    let summary = app.run(pages).await?;

    info!(
        pages = summary.pages,
        batches = summary.batches,
        records = summary.records,
        "SIS import logs saved"
    );

    telemetry::shutdown();
    Ok(())
}
