//! Command-line organization listing.

use std::io::Write;

use crate::args::output::{RATE_LIMIT_NOTICE, write_json, write_listing};
use crate::sources::rate_limit::{FailureKind, classify};
use crate::sources::{RegistryClient, SearchError, fetch_org_packages_with_concurrency};

/// What: List an organization's published packages.
///
/// Inputs:
/// - `client`: Transport
/// - `org`: Organization name, with or without `@`
/// - `concurrency`: Maximum metadata requests in flight
/// - `json`: Emit JSON instead of a listing
/// - `out`: Result destination
/// - `err`: Notice and error destination
///
/// Output:
/// - Exit code: 0 on success, 1 when the organization does not exist or
///   upstream failed.
pub async fn handle_org<C: RegistryClient>(
    client: &C,
    org: &str,
    concurrency: usize,
    json: bool,
    out: &mut impl Write,
    err: &mut impl Write,
) -> i32 {
    tracing::info!(org, concurrency, "organization mode requested from CLI");
    let resp = match fetch_org_packages_with_concurrency(client, org, concurrency).await {
        Ok(resp) => resp,
        Err(e @ SearchError::OrgNotFound { .. }) => {
            let _ = writeln!(err, "npmscout: {e}");
            tracing::warn!(org, "organization not found");
            return 1;
        }
        Err(e) => {
            if classify(&e) == FailureKind::RateLimited {
                let _ = writeln!(err, "{RATE_LIMIT_NOTICE}");
            } else {
                let _ = writeln!(err, "npmscout: organization lookup failed: {e}");
            }
            tracing::error!(org, error = %e, "organization lookup failed");
            return 1;
        }
    };
    let written = if json {
        write_json(out, &resp)
    } else {
        write_listing(out, &resp)
    };
    match written {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "failed to write organization packages");
            1
        }
    }
}
