use crate::batch::BatchRunner;
use crate::model::{BatchPlan, RunSummary};
use crate::sink::Sink;
use fetcher_core::{Error, Result};
use metrics::counter;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Runs above this many pages get a heads-up in the log.
const LARGE_RUN_PAGES: u32 = 100;

/// Split `1..=total_pages` into consecutive batches of at most
/// `max_batch_size` pages. Every batch is full-sized except a trailing
/// remainder batch, which is always last.
pub fn plan_batches(total_pages: u32, max_batch_size: u32) -> Vec<BatchPlan> {
    if total_pages == 0 || max_batch_size == 0 {
        return Vec::new();
    }

    let batch_size = max_batch_size.min(total_pages);
    let full_batches = total_pages / batch_size;
    let remainder = total_pages % batch_size;

    let mut plans: Vec<BatchPlan> = (0..full_batches)
        .map(|i| BatchPlan {
            start_page: i * batch_size + 1,
            size: batch_size,
        })
        .collect();

    if remainder > 0 {
        plans.push(BatchPlan {
            start_page: full_batches * batch_size + 1,
            size: remainder,
        });
    }

    plans
}

pub struct PaginationDriver {
    runner: BatchRunner,
    sink: Box<dyn Sink>,
}

impl PaginationDriver {
    pub fn new(runner: BatchRunner, sink: Box<dyn Sink>) -> Self {
        Self { runner, sink }
    }

    /// Fetch pages `1..=total_pages` batch by batch and hand each page to the
    /// sink in ascending order. Stops at the first failed batch; pages already
    /// written stay written.
    #[instrument(skip(self))]
    pub async fn drive(&mut self, total_pages: u32, max_batch_size: u32) -> Result<RunSummary> {
        if total_pages == 0 {
            return Err(Error::Validation("page count must be at least 1".to_string()));
        }
        if max_batch_size == 0 {
            return Err(Error::Validation("batch size must be at least 1".to_string()));
        }

        if total_pages < max_batch_size {
            info!(
                total_pages,
                max_batch_size,
                "Page count is lower than the batch size, lowering batch size to {}",
                total_pages
            );
        }
        if total_pages > LARGE_RUN_PAGES {
            warn!(total_pages, "Page count exceeds {}. This may take a few moments...", LARGE_RUN_PAGES);
        }

        let plans = plan_batches(total_pages, max_batch_size);
        let batch_count = plans.len();
        let started = Instant::now();
        let mut summary = RunSummary::default();

        info!("🚀 Fetching {} page(s) in {} batch(es)", total_pages, batch_count);

        for (index, plan) in plans.iter().enumerate() {
            let pages = match self.runner.run(plan.start_page, plan.size).await {
                Ok(pages) => pages,
                Err(e) => {
                    error!(
                        batch = index + 1,
                        start_page = plan.start_page,
                        end_page = plan.end_page(),
                        pages_written = summary.pages,
                        failed_page = ?e.failed_page(),
                        error = %e,
                        "❌ Batch failed, aborting run"
                    );
                    return Err(e);
                }
            };

            for page in &pages {
                let written = self.sink.write_page(page).await?;
                summary.records += written as u64;
                counter!("fetcher_records_written_total").increment(written as u64);
            }

            summary.pages += plan.size;
            summary.batches += 1;

            info!(
                "📦 Batch {}/{} done | Pages {}-{} | Progress: {}/{} pages | Records: {}",
                index + 1,
                batch_count,
                plan.start_page,
                plan.end_page(),
                summary.pages,
                total_pages,
                summary.records
            );
        }

        info!(
            "✨ Fetch completed! Pages: {} | Batches: {} | Records: {} | Elapsed: {:.1}s",
            summary.pages,
            summary.batches,
            summary.records,
            started.elapsed().as_secs_f64()
        );

        Ok(summary)
    }
}
