use crate::batch::BatchRunner;
use crate::driver::PaginationDriver;
use crate::ingest::CanvasSource;
use crate::model::RunSummary;
use crate::sink::FileSink;
use fetcher_core::{Config, Result};
use std::sync::Arc;
use tracing::{info, instrument};

pub struct App {
    config: Config,
    driver: PaginationDriver,
}

impl App {
    #[instrument(skip(config))]
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing application");

        let source = CanvasSource::new(&config.api)?;
        info!(endpoint = source.endpoint(), "Using Canvas SIS imports endpoint");

        let sink = FileSink::new(&config.output.path);

        let driver = PaginationDriver::new(BatchRunner::new(Arc::new(source)), Box::new(sink));

        Ok(Self { config, driver })
    }

    pub async fn run(&mut self, pages: u32) -> Result<RunSummary> {
        self.driver
            .drive(pages, self.config.fetch.max_batch_size)
            .await
    }
}
