//! Organization package listing with metadata and downloads joined in.

use tracing::{debug, info, warn};

use super::client::{Api, RegistryClient};
use super::downloads::fetch_downloads;
use super::error::SearchError;
use super::registry::fetch_packument;
use crate::state::{Packument, SearchResponse};
use crate::util::{map_with_concurrency, percent_encode};

/// Concurrent packument fetches per organization.
pub const METADATA_CONCURRENCY: usize = 10;
/// Longest organization name the registry accepts.
const MAX_ORG_NAME_LEN: usize = 50;

/// What: Check an organization name against the registry's naming rules.
///
/// Inputs:
/// - `org`: Organization name without the leading `@`
///
/// Output:
/// - `true` for 1..=50 ASCII alphanumerics and hyphens, not starting or
///   ending with a hyphen.
#[must_use]
pub fn is_valid_org_name(org: &str) -> bool {
    !org.is_empty()
        && org.len() <= MAX_ORG_NAME_LEN
        && org.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        && !org.starts_with('-')
        && !org.ends_with('-')
}

/// What: List the package names owned by an organization.
///
/// Inputs:
/// - `client`: Transport
/// - `org`: Organization name
///
/// Output:
/// - Package names in listing order; empty when the lookup failed for any
///   reason other than the organization not existing.
///
/// # Errors
/// - `SearchError::OrgNotFound` on 404 or an invalid name.
pub async fn fetch_org_package_names<C: RegistryClient>(
    client: &C,
    org: &str,
) -> Result<Vec<String>, SearchError> {
    if !is_valid_org_name(org) {
        return Err(SearchError::OrgNotFound {
            org: org.to_string(),
        });
    }
    let path = format!("/-/org/{}/package", percent_encode(org));
    match client.get_json(Api::Registry, &path).await {
        Ok(fetched) => Ok(fetched
            .data
            .as_object()
            .map(|listing| listing.keys().cloned().collect())
            .unwrap_or_default()),
        Err(err) if err.is_not_found() => Err(SearchError::OrgNotFound {
            org: org.to_string(),
        }),
        Err(err) => {
            warn!(org, error = %err, "failed to list organization packages");
            Ok(Vec::new())
        }
    }
}

/// What: Fetch every package of an organization as search records.
///
/// Inputs:
/// - `client`: Transport
/// - `org`: Organization name (a leading `@` is ignored)
///
/// Output:
/// - Records for all published packages, `total` equal to their count.
///
/// # Errors
/// - `SearchError::OrgNotFound` when the organization does not exist.
///
/// Details:
/// - Uses [`METADATA_CONCURRENCY`]; see [`fetch_org_packages_with_concurrency`].
pub async fn fetch_org_packages<C: RegistryClient>(
    client: &C,
    org: &str,
) -> Result<SearchResponse, SearchError> {
    fetch_org_packages_with_concurrency(client, org, METADATA_CONCURRENCY).await
}

/// What: Fetch every package of an organization with a custom metadata concurrency.
///
/// Inputs:
/// - `client`: Transport
/// - `org`: Organization name (a leading `@` is ignored)
/// - `concurrency`: Maximum packument requests in flight
///
/// Output:
/// - Records for all published packages, `total` equal to their count.
///
/// # Errors
/// - `SearchError::OrgNotFound` when the organization does not exist.
///
/// Details:
/// - Packuments (bounded) and downloads (bulk) are fetched concurrently and
///   joined by name once both finish.
/// - Packages whose packument fails or has no dist-tags are left out.
/// - Records without a download entry carry no download field.
pub async fn fetch_org_packages_with_concurrency<C: RegistryClient>(
    client: &C,
    org: &str,
    concurrency: usize,
) -> Result<SearchResponse, SearchError> {
    let org = org.trim().trim_start_matches('@');
    if org.is_empty() {
        return Ok(SearchResponse::empty());
    }
    let names = fetch_org_package_names(client, org).await?;
    if names.is_empty() {
        return Ok(SearchResponse::empty());
    }

    let packuments = map_with_concurrency(names.iter(), concurrency, |name| async move {
        match fetch_packument(client, name).await {
            Ok(fetched) => Some(fetched.data),
            Err(err) => {
                debug!(package = %name, error = %err, "skipping package without metadata");
                None
            }
        }
    });
    let (packuments, downloads) = tokio::join!(packuments, fetch_downloads(client, &names));

    let records: Vec<_> = packuments
        .into_iter()
        .flatten()
        .filter(Packument::has_dist_tags)
        .map(|pkg| {
            let weekly = downloads.get(&pkg.name).copied();
            pkg.to_record(weekly)
        })
        .collect();
    info!(
        org,
        listed = names.len(),
        published = records.len(),
        with_downloads = downloads.len(),
        "organization packages fetched"
    );
    let total = records.len();
    Ok(SearchResponse::new(records, total, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockClient;
    use serde_json::json;

    #[test]
    fn org_name_validation() {
        assert!(is_valid_org_name("acme"));
        assert!(is_valid_org_name("a-1"));
        assert!(!is_valid_org_name(""));
        assert!(!is_valid_org_name("-acme"));
        assert!(!is_valid_org_name("acme-"));
        assert!(!is_valid_org_name("ac/me"));
        assert!(!is_valid_org_name(&"a".repeat(51)));
    }

    #[tokio::test]
    /// What: 404 on the listing propagates as org-not-found.
    async fn unknown_org_is_not_found() {
        let mock = MockClient::new();
        let err = fetch_org_packages(&mock, "ghost").await.expect_err("not found");
        assert_eq!(err, SearchError::OrgNotFound { org: "ghost".into() });
    }

    #[tokio::test]
    /// What: Other listing failures degrade to an empty result.
    async fn listing_failure_degrades_to_empty() {
        let mock = MockClient::new().with_status(Api::Registry, "/-/org/acme/package", 502);
        let resp = fetch_org_packages(&mock, "acme").await.expect("degraded");
        assert!(resp.is_empty());
    }

    #[tokio::test]
    /// What: Packuments and downloads are joined by name.
    ///
    /// Details:
    /// - `gone` has no dist-tags and is dropped.
    /// - `broken` fails to load and is dropped.
    /// - `@acme/ui` has no download entry and keeps `downloads = None`.
    async fn joins_metadata_and_downloads() {
        let mock = MockClient::new()
            .with_json(
                Api::Registry,
                "/-/org/acme/package",
                json!({ "core": "write", "gone": "write", "broken": "read", "@acme/ui": "write" }),
            )
            .with_json(Api::Registry, "/core", json!({ "name": "core", "dist-tags": { "latest": "3.1.0" } }))
            .with_json(Api::Registry, "/gone", json!({ "name": "gone", "time": {} }))
            .with_status(Api::Registry, "/broken", 500)
            .with_json(
                Api::Registry,
                "/@acme%2Fui",
                json!({ "name": "@acme/ui", "dist-tags": { "latest": "0.2.0" } }),
            )
            .with_json(
                Api::Downloads,
                "/downloads/point/last-week/core,gone,broken",
                json!({ "core": { "downloads": 900 }, "gone": null, "broken": { "downloads": 3 } }),
            )
            .with_status(Api::Downloads, "/downloads/point/last-week/@acme%2Fui", 404);

        let resp = fetch_org_packages(&mock, "@acme").await.expect("org packages");
        let names: Vec<&str> = resp.objects.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["core", "@acme/ui"]);
        assert_eq!(resp.total, 2);
        assert_eq!(resp.objects[0].weekly_downloads(), Some(900));
        assert_eq!(resp.objects[0].package.version, "3.1.0");
        assert_eq!(resp.objects[1].weekly_downloads(), None);
    }

    #[tokio::test]
    async fn empty_listing_is_empty_result() {
        let mock = MockClient::new().with_json(Api::Registry, "/-/org/acme/package", json!({}));
        let resp = fetch_org_packages(&mock, "acme").await.expect("empty");
        assert!(resp.is_empty());
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    /// What: Metadata requests never exceed the concurrency limit.
    async fn metadata_fetch_is_bounded() {
        let listing: serde_json::Map<String, serde_json::Value> =
            (0..30).map(|i| (format!("p{i}"), json!("write"))).collect();
        let mut mock = MockClient::new()
            .with_json(Api::Registry, "/-/org/big/package", serde_json::Value::Object(listing))
            .with_delay(std::time::Duration::from_millis(2));
        for i in 0..30 {
            mock = mock.with_json(
                Api::Registry,
                &format!("/p{i}"),
                json!({ "name": format!("p{i}"), "dist-tags": { "latest": "1.0.0" } }),
            );
        }
        let resp = fetch_org_packages_with_concurrency(&mock, "big", 4).await.expect("org");
        assert_eq!(resp.total, 30);
        // 4 packument requests plus the single bulk downloads request
        assert!(mock.peak_in_flight() <= 5, "peak {}", mock.peak_in_flight());
    }
}
