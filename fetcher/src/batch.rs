use crate::ingest::PageSource;
use crate::model::{BatchPlan, PageRequest, PageResult};
use fetcher_core::{Error, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Fetches one batch of consecutive pages concurrently.
pub struct BatchRunner {
    source: Arc<dyn PageSource>,
}

impl BatchRunner {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self { source }
    }

    /// Fetch pages `start_page ..= start_page + size - 1` with up to `size`
    /// requests in flight and return them in ascending page order.
    ///
    /// The batch is all-or-nothing: the first failing page aborts it, drops
    /// the fetches still in flight and is returned wrapped in
    /// [`Error::Batch`].
    #[instrument(skip(self))]
    pub async fn run(&self, start_page: u32, size: u32) -> Result<Vec<PageResult>> {
        if start_page == 0 || size == 0 {
            return Err(Error::Validation(format!(
                "batch needs a start page and size of at least 1 (got start {}, size {})",
                start_page, size
            )));
        }
        if start_page.checked_add(size - 1).is_none() {
            return Err(Error::Validation(format!(
                "batch starting at page {} with size {} overflows the page range",
                start_page, size
            )));
        }

        let plan = BatchPlan { start_page, size };
        let started = Instant::now();

        let mut pages: Vec<PageResult> = stream::iter(plan.requests())
            .map(|request| self.fetch_one(request))
            .buffer_unordered(size as usize)
            .try_collect()
            .await
            .map_err(|e| {
                warn!(
                    source = self.source.source_id(),
                    start_page,
                    size,
                    error = %e,
                    "Batch aborted"
                );
                Error::Batch {
                    start_page,
                    size,
                    source: Box::new(e),
                }
            })?;

        // Completion order is arbitrary
        pages.sort_unstable_by_key(|page| page.page_number);

        histogram!("fetcher_batch_duration_ms").record(started.elapsed().as_millis() as f64);
        debug!(
            start_page,
            end_page = plan.end_page(),
            duration_ms = started.elapsed().as_millis(),
            "Batch fetched"
        );

        Ok(pages)
    }

    async fn fetch_one(&self, request: PageRequest) -> Result<PageResult> {
        let started = Instant::now();
        let result = self.source.fetch_page(request).await;

        match &result {
            Ok(_) => {
                counter!("fetcher_pages_fetched_total").increment(1);
                histogram!("fetcher_page_fetch_duration_ms")
                    .record(started.elapsed().as_millis() as f64);
            }
            Err(_) => counter!("fetcher_page_failures_total").increment(1),
        }

        result
    }
}
