use std::ops::RangeInclusive;

/// A single 1-indexed page to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageRequest {
    pub page_number: u32,
}

impl PageRequest {
    pub fn new(page_number: u32) -> Self {
        Self { page_number }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub id: u64,
    pub created_at: String,
    pub workflow_state: String,
    pub batch_identifiers: Vec<String>,
    pub processing_errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub page_number: u32,
    pub records: Vec<ImportRecord>,
}

/// A contiguous run of pages fetched concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    pub start_page: u32,
    pub size: u32,
}

impl BatchPlan {
    pub fn end_page(&self) -> u32 {
        self.start_page + self.size - 1
    }

    pub fn pages(&self) -> RangeInclusive<u32> {
        self.start_page..=self.end_page()
    }

    pub fn requests(&self) -> impl Iterator<Item = PageRequest> {
        self.pages().map(PageRequest::new)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages: u32,
    pub batches: u32,
    pub records: u64,
}
