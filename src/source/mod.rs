use crate::errors::RetrievalError;
use crate::models::RawFundRecord;
use async_trait::async_trait;

pub mod jisilu;

#[async_trait]
pub trait FundSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Pulls a fresh, unordered snapshot of every listed fund. One request, no retry.
    async fn fetch_records(&self) -> Result<Vec<RawFundRecord>, RetrievalError>;
}
