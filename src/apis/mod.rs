pub mod performers;

use crate::error::Result;
use crate::types::RawPerformer;

pub use performers::PerformersApi;

/// One page request against the listing API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub brand: String,
    /// 1-based page number
    pub page: u32,
    pub per_page: u32,
}

/// Paginated source of performer records, partitioned by brand
#[async_trait::async_trait]
pub trait ListingApi: Send + Sync {
    /// Fetch one page of raw records. An empty vector means the brand is exhausted.
    ///
    /// Non-success statuses surface as `SyncError::Upstream`, unparseable bodies
    /// as `SyncError::Json`.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawPerformer>>;
}
