//! Weekly download counts, single and in bulk.
//!
//! The bulk endpoint does not accept scoped names, so those are looked up one
//! by one in parallel batches while unscoped names go out in comma-joined
//! chunks. Every lookup failure is absorbed: the name is simply missing from
//! the result.

use std::collections::HashSet;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use super::client::{Api, RegistryClient};
use super::error::FetchError;
use crate::state::DownloadCountMap;
use crate::util::{encode_package_name, is_scoped};

/// Path prefix of the last-week point endpoint.
pub const LAST_WEEK_PATH: &str = "/downloads/point/last-week/";
/// Maximum names per bulk request.
pub const BULK_CHUNK_SIZE: usize = 100;
/// Scoped names fetched concurrently per batch.
pub const SCOPED_BATCH_SIZE: usize = 20;

/// What: Fetch the weekly download count for one package.
///
/// Inputs:
/// - `client`: Transport
/// - `name`: Package name (scoped or not)
///
/// Output:
/// - `Ok(Some(count))`, or `Ok(None)` when the body carries no numeric count.
///
/// # Errors
/// - Transport errors pass through (404 for unknown packages).
pub async fn fetch_weekly_downloads<C: RegistryClient>(
    client: &C,
    name: &str,
) -> Result<Option<u64>, FetchError> {
    let path = format!("{LAST_WEEK_PATH}{}", encode_package_name(name));
    let fetched = client.get_json(Api::Downloads, &path).await?;
    Ok(fetched.data.get("downloads").and_then(Value::as_u64))
}

/// What: Extract counts from a bulk response.
///
/// Inputs:
/// - `data`: Body of a bulk request
/// - `requested`: Names in that request
///
/// Output:
/// - `(name, count)` pairs for every entry with a numeric count.
///
/// Details:
/// - Normal shape is `{ name: { downloads } | null, ... }`.
/// - A one-name request is answered in the single-package shape
///   `{ downloads, package, ... }`, which is accepted as well.
fn parse_bulk_response(data: &Value, requested: &[&str]) -> Vec<(String, u64)> {
    if let [only] = requested
        && let Some(count) = data.get("downloads").and_then(Value::as_u64)
    {
        return vec![((*only).to_string(), count)];
    }
    data.as_object()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(name, entry)| {
                    entry
                        .get("downloads")
                        .and_then(Value::as_u64)
                        .map(|count| (name.clone(), count))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Fetch one bulk chunk; a failure drops the whole chunk.
async fn fetch_bulk_chunk<C: RegistryClient>(client: &C, chunk: &[&str]) -> Vec<(String, u64)> {
    let path = format!("{LAST_WEEK_PATH}{}", chunk.join(","));
    match client.get_json(Api::Downloads, &path).await {
        Ok(fetched) => {
            let counts = parse_bulk_response(&fetched.data, chunk);
            debug!(requested = chunk.len(), found = counts.len(), "bulk downloads chunk");
            counts
        }
        Err(err) => {
            warn!(requested = chunk.len(), error = %err, "bulk downloads chunk failed");
            Vec::new()
        }
    }
}

/// Fetch one batch of scoped names concurrently; failures drop single names.
async fn fetch_scoped_batch<C: RegistryClient>(client: &C, batch: &[&str]) -> Vec<(String, u64)> {
    let lookups = batch.iter().map(|name| async move {
        match fetch_weekly_downloads(client, name).await {
            Ok(count) => count.map(|c| ((*name).to_string(), c)),
            Err(err) => {
                debug!(package = name, error = %err, "scoped downloads lookup failed");
                None
            }
        }
    });
    join_all(lookups).await.into_iter().flatten().collect()
}

/// What: Fetch weekly downloads for a set of package names.
///
/// Inputs:
/// - `client`: Transport
/// - `names`: Package names; repeats are looked up once
///
/// Output:
/// - Map of name to weekly downloads for every successful lookup.
///
/// Details:
/// - Unscoped names: chunks of [`BULK_CHUNK_SIZE`], one bulk request each.
/// - Scoped names: batches of [`SCOPED_BATCH_SIZE`], one request per name.
/// - All chunks and batches run concurrently and each returns its own pairs;
///   they are merged only after every one has finished.
/// - Never fails; a failed chunk or name is just absent from the map.
/// - Duplicate names are dropped first (first occurrence kept), so every name
///   belongs to exactly one chunk or batch.
pub async fn fetch_downloads<C: RegistryClient>(client: &C, names: &[String]) -> DownloadCountMap {
    if names.is_empty() {
        return DownloadCountMap::new();
    }
    let mut seen = HashSet::with_capacity(names.len());
    let (scoped, unscoped): (Vec<&str>, Vec<&str>) = names
        .iter()
        .map(String::as_str)
        .filter(|n| seen.insert(*n))
        .partition(|n| is_scoped(n));

    let bulk = join_all(
        unscoped
            .chunks(BULK_CHUNK_SIZE)
            .map(|chunk| fetch_bulk_chunk(client, chunk)),
    );
    let individual = join_all(
        scoped
            .chunks(SCOPED_BATCH_SIZE)
            .map(|batch| fetch_scoped_batch(client, batch)),
    );
    let (bulk, individual) = tokio::join!(bulk, individual);

    let downloads: DownloadCountMap = bulk.into_iter().chain(individual).flatten().collect();
    debug!(
        requested = names.len(),
        scoped = scoped.len(),
        found = downloads.len(),
        "downloads aggregated"
    );
    downloads
}
