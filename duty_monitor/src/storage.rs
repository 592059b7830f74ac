use anyhow::Result;
use async_trait::async_trait;
use duty_summary::{EpochMeta, ValidatorDutySummary};
use types::primitives::Epoch;

/// Summaries of a single epoch in validator index order. Can only be iterated once.
pub type Summaries<'summaries> = Box<dyn Iterator<Item = ValidatorDutySummary> + Send + 'summaries>;

#[async_trait]
pub trait EpochStorage: Send + Sync {
    async fn write_summaries(&self, epoch: Epoch, summaries: Summaries<'_>) -> Result<()>;

    async fn write_epoch_meta(&self, epoch: Epoch, meta: &EpochMeta) -> Result<()>;

    async fn epoch_meta(&self, epoch: Epoch) -> Result<Option<EpochMeta>>;
}
