//! Exact single-package lookup used for one-character queries.
//!
//! The search endpoint does not rank one-character queries usefully, so the
//! package with exactly that name is resolved directly, together with its
//! weekly downloads, and returned as a one-record page.

use tracing::debug;

use super::downloads::fetch_weekly_downloads;
use super::error::FetchError;
use super::registry::fetch_packument;
use super::client::RegistryClient;
use crate::state::SearchResponse;

/// What: Resolve `name` as a one-record search response.
///
/// Inputs:
/// - `client`: Transport
/// - `name`: Exact package name
///
/// Output:
/// - `Ok(Some(response))` with one record and `total = 1`.
/// - `Ok(None)` when no package has that name.
///
/// # Errors
/// - Packument failures other than 404 pass through.
///
/// Details:
/// - The packument and the download count are requested concurrently.
/// - A failed download lookup only leaves the record without downloads.
pub async fn fetch_exact<C: RegistryClient>(
    client: &C,
    name: &str,
) -> Result<Option<SearchResponse>, FetchError> {
    let (packument, downloads) =
        tokio::join!(fetch_packument(client, name), fetch_weekly_downloads(client, name));

    let packument = match packument {
        Ok(fetched) => fetched,
        Err(err) if err.is_not_found() => {
            debug!(package = name, "no exact package match");
            return Ok(None);
        }
        Err(err) => return Err(err),
    };
    let weekly = downloads.unwrap_or_else(|err| {
        debug!(package = name, error = %err, "exact match downloads unavailable");
        None
    });

    let record = packument.data.to_record(weekly);
    Ok(Some(SearchResponse::new(vec![record], 1, packument.is_stale)))
}
