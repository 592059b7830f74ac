use core::future::Future;

use anyhow::Result;
use futures::stream::{self, StreamExt as _, TryStreamExt as _};

/// Runs at most `limit` of `futures` at a time and collects their outputs in order.
///
/// The first error cancels the futures that are still pending.
pub async fn try_join_bounded<T, F>(
    limit: usize,
    futures: impl IntoIterator<Item = F>,
) -> Result<Vec<T>>
where
    F: Future<Output = Result<T>>,
{
    stream::iter(futures)
        .buffered(limit.max(1))
        .try_collect()
        .await
}
