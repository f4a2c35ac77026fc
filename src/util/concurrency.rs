//! Order-preserving async map with a bound on in-flight work.

use std::future::Future;

use futures::stream::{self, StreamExt};

/// What: Run `worker` over `inputs` with at most `limit` invocations outstanding.
///
/// Inputs:
/// - `inputs`: Items to transform
/// - `limit`: Maximum concurrent invocations (values below 1 are treated as 1)
/// - `worker`: Async transform applied to each item
///
/// Output:
/// - One output per input, at the same index, regardless of completion order.
///
/// Details:
/// - Never fails on its own. Callers that tolerate partial failure map errors
///   to a sentinel (e.g. `Option::None`) inside `worker`.
/// - A new invocation starts only when an earlier one completes.
pub async fn map_with_concurrency<I, O, F, Fut>(
    inputs: impl IntoIterator<Item = I>,
    limit: usize,
    worker: F,
) -> Vec<O>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = O>,
{
    stream::iter(inputs)
        .map(worker)
        .buffered(limit.max(1))
        .collect()
        .await
}
