//! In-memory `PageSource` and `Sink` doubles shared by the unit tests.

use crate::ingest::PageSource;
use crate::model::{ImportRecord, PageRequest, PageResult};
use crate::sink::Sink;
use async_trait::async_trait;
use fetcher_core::{Error, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn record_for(page: u32) -> ImportRecord {
    ImportRecord {
        id: u64::from(page) * 1000,
        created_at: format!("2024-01-{:02}T00:00:00Z", page % 28 + 1),
        workflow_state: "imported".to_string(),
        batch_identifiers: Vec::new(),
        processing_errors: Vec::new(),
    }
}

/// Serves one record per page. Higher page numbers answer sooner, so fetches
/// within a batch complete in reverse order.
#[derive(Default)]
pub struct ScriptedSource {
    failing: HashSet<u32>,
    step_ms: u64,
    started: Mutex<Vec<u32>>,
    completed: Mutex<Vec<u32>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            step_ms: 10,
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, page: u32) -> Self {
        self.failing.insert(page);
        self
    }

    /// Page `p` sleeps `step_ms * (40 - p % 40)` milliseconds.
    pub fn with_step_ms(mut self, step_ms: u64) -> Self {
        self.step_ms = step_ms;
        self
    }

    pub fn started(&self) -> Vec<u32> {
        self.started.lock().unwrap().clone()
    }

    pub fn completed(&self) -> Vec<u32> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResult> {
        let page = request.page_number;
        self.started.lock().unwrap().push(page);

        if self.failing.contains(&page) {
            return Err(Error::Request {
                page,
                details: "status 500 Internal Server Error".to_string(),
            });
        }

        let delay = self.step_ms * u64::from(40 - page % 40);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.completed.lock().unwrap().push(page);
        Ok(PageResult {
            page_number: page,
            records: vec![record_for(page)],
        })
    }

    fn source_id(&self) -> &str {
        "scripted"
    }
}

/// Keeps every page it receives, in arrival order.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pages: Arc<Mutex<Vec<PageResult>>>,
}

impl RecordingSink {
    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.page_number)
            .collect()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn write_page(&mut self, page: &PageResult) -> Result<usize> {
        self.pages.lock().unwrap().push(page.clone());
        Ok(page.records.len())
    }
}

/// Notes how many fetches `source` had started when each page was written.
#[derive(Clone)]
pub struct ProgressSink {
    source: Arc<ScriptedSource>,
    writes: Arc<Mutex<Vec<(u32, usize)>>>,
}

impl ProgressSink {
    pub fn new(source: Arc<ScriptedSource>) -> Self {
        Self {
            source,
            writes: Arc::default(),
        }
    }

    pub fn writes(&self) -> Vec<(u32, usize)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sink for ProgressSink {
    async fn write_page(&mut self, page: &PageResult) -> Result<usize> {
        let started = self.source.started().len();
        self.writes.lock().unwrap().push((page.page_number, started));
        Ok(page.records.len())
    }
}
