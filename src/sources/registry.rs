//! Registry endpoints: paged search and single-package metadata.

use std::fmt::Write;

use tracing::debug;

use super::client::{Api, Fetched, RegistryClient};
use super::error::FetchError;
use crate::state::{Packument, SearchResponse};
use crate::util::{encode_package_name, percent_encode};

/// What: Build the search endpoint path.
///
/// Inputs:
/// - `text`: Query text (sent as typed)
/// - `size`: Page size
/// - `from`: Offset of the first record; omitted for the first page
///
/// Output:
/// - `/-/v1/search?text=..&size=..[&from=..]`
#[must_use]
pub fn search_path(text: &str, size: usize, from: Option<usize>) -> String {
    let mut path = format!("/-/v1/search?text={}&size={size}", percent_encode(text));
    if let Some(from) = from {
        let _ = write!(path, "&from={from}");
    }
    path
}

/// What: Fetch one page of search results.
///
/// Inputs:
/// - `client`: Transport
/// - `text`: Query text
/// - `size`: Records requested
/// - `from`: Offset (use `None` for the first page)
///
/// Output:
/// - Records and upstream total, with the transport's staleness flag applied.
///
/// # Errors
/// - Transport errors pass through; a body that is not a search response
///   yields `FetchError::Decode`.
pub async fn search_page<C: RegistryClient>(
    client: &C,
    text: &str,
    size: usize,
    from: Option<usize>,
) -> Result<SearchResponse, FetchError> {
    let path = search_path(text, size, from);
    let Fetched { data, is_stale } = client.get_json(Api::Registry, &path).await?;
    let mut page: SearchResponse =
        serde_json::from_value(data).map_err(|e| FetchError::decode(&path, &e))?;
    page.is_stale = is_stale;
    debug!(
        text,
        from = from.unwrap_or(0),
        returned = page.objects.len(),
        total = page.total,
        "search page fetched"
    );
    Ok(page)
}

/// What: Fetch and decode a package's packument.
///
/// Inputs:
/// - `client`: Transport
/// - `name`: Package name (scoped or not)
///
/// Output:
/// - The packument with the transport's staleness flag.
///
/// # Errors
/// - Transport errors pass through (404 for unknown packages).
/// - `FetchError::Decode` when the body is not a packument.
pub async fn fetch_packument<C: RegistryClient>(
    client: &C,
    name: &str,
) -> Result<Fetched<Packument>, FetchError> {
    let path = format!("/{}", encode_package_name(name));
    let fetched = client.get_json(Api::Registry, &path).await?;
    let is_stale = fetched.is_stale;
    let packument: Packument =
        serde_json::from_value(fetched.data).map_err(|e| FetchError::decode(&path, &e))?;
    Ok(Fetched {
        data: packument,
        is_stale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockClient;
    use serde_json::json;

    #[test]
    fn search_path_encodes_text_and_optional_offset() {
        assert_eq!(search_path("react", 25, None), "/-/v1/search?text=react&size=25");
        assert_eq!(
            search_path("vue router", 3, Some(2)),
            "/-/v1/search?text=vue%20router&size=3&from=2"
        );
    }

    #[tokio::test]
    /// What: Search pages decode objects and total and carry the staleness flag.
    async fn search_page_decodes_response() {
        let mock = MockClient::new().with_json(
            Api::Registry,
            "/-/v1/search?text=left&size=2",
            json!({
                "objects": [
                    { "package": { "name": "left-pad", "version": "1.3.0" } },
                    { "package": { "name": "leftist", "version": "0.1.0" } }
                ],
                "total": 40,
                "time": "Wed Jan 01 2025 00:00:00 GMT+0000"
            }),
        );
        let page = search_page(&mock, "left", 2, None).await.expect("page");
        assert_eq!(page.total, 40);
        assert_eq!(page.objects.len(), 2);
        assert_eq!(page.objects[1].name(), "leftist");
        assert!(!page.is_stale);
    }

    #[tokio::test]
    async fn search_page_rejects_malformed_body() {
        let mock = MockClient::new().with_json(
            Api::Registry,
            "/-/v1/search?text=x&size=1",
            json!({ "objects": "nope" }),
        );
        let err = search_page(&mock, "x", 1, None).await.expect_err("decode error");
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[tokio::test]
    /// What: Scoped packuments are requested with an encoded separator.
    async fn fetch_packument_encodes_scoped_names() {
        let mock = MockClient::new().with_json(
            Api::Registry,
            "/@scope%2Fpkg",
            json!({ "name": "@scope/pkg", "dist-tags": { "latest": "1.0.0" } }),
        );
        let pkg = fetch_packument(&mock, "@scope/pkg").await.expect("packument");
        assert_eq!(pkg.data.name, "@scope/pkg");
        assert_eq!(pkg.data.display_version(), "1.0.0");
    }
}
