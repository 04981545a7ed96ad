pub mod canvas_source;

use crate::model::{PageRequest, PageResult};
use async_trait::async_trait;
use fetcher_core::Result;

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page of import records
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResult>;

    /// Get the source identifier
    fn source_id(&self) -> &str;
}

pub use canvas_source::CanvasSource;
