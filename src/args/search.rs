//! Command-line search mode.

use std::io::Write;

use crate::args::output::{RATE_LIMIT_NOTICE, write_json, write_listing};
use crate::logic::SearchSession;
use crate::sources::RegistryClient;

/// Options for one command-line search.
#[derive(Clone, Copy, Debug)]
pub struct SearchRequest<'a> {
    /// Query text as typed.
    pub query: &'a str,
    /// First page size.
    pub size: usize,
    /// Load more results until this many are held.
    pub more: Option<usize>,
    /// Emit JSON instead of a listing.
    pub json: bool,
}

/// What: Run a search, optionally load more, and print the results.
///
/// Inputs:
/// - `client`: Transport (owned by the search session)
/// - `request`: Query, size, load-more target, and output format
/// - `out`: Result destination
/// - `err`: Notice and error destination
///
/// Output:
/// - Exit code: 0 on success (including rate limiting), 1 on upstream or
///   output failure.
pub async fn handle_search<C: RegistryClient>(
    client: C,
    request: &SearchRequest<'_>,
    out: &mut impl Write,
    err: &mut impl Write,
) -> i32 {
    tracing::info!(query = %request.query, size = request.size, more = ?request.more, "search mode requested from CLI");
    let session = SearchSession::new(client, request.size);

    if let Err(e) = session.search(request.query, request.size).await {
        let _ = writeln!(err, "npmscout: search failed: {e}");
        tracing::error!(error = %e, "search failed");
        return 1;
    }
    if let Some(target) = request.more
        && let Err(e) = session.fetch_more(target).await
    {
        let _ = writeln!(err, "npmscout: loading more results failed: {e}");
        tracing::error!(error = %e, target, "load more failed");
        return 1;
    }

    let view = session.view();
    if view.is_rate_limited {
        let _ = writeln!(err, "{RATE_LIMIT_NOTICE}");
    }
    let written = if request.json {
        write_json(out, &view.data)
    } else {
        write_listing(out, &view.data)
    };
    match written {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "failed to write search results");
            1
        }
    }
}
