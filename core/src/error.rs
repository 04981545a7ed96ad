use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request for page {page} failed: {details}")]
    Request { page: u32, details: String },

    #[error("batch of {size} page(s) starting at page {start_page} failed: {source}")]
    Batch {
        start_page: u32,
        size: u32,
        source: Box<Error>,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Page number of the failed request, looking through a batch wrapper.
    pub fn failed_page(&self) -> Option<u32> {
        match self {
            Error::Request { page, .. } => Some(*page),
            Error::Batch { source, .. } => source.failed_page(),
            _ => None,
        }
    }
}
