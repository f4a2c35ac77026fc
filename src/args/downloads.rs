//! Command-line weekly downloads lookup.

use std::collections::HashSet;
use std::io::Write;

use crate::args::output::{write_downloads, write_json};
use crate::sources::{RegistryClient, fetch_downloads};

/// What: Print weekly downloads for the given package names.
///
/// Inputs:
/// - `client`: Transport
/// - `names`: Package names; comma-separated entries are split too and
///   repeats are listed once
/// - `json`: Emit a name-to-count JSON object instead of lines
/// - `out`: Result destination
/// - `err`: Error destination
///
/// Output:
/// - Exit code: 0 on success, 1 on output failure.
///
/// Details:
/// - Names without a count print `-` (or are absent from the JSON object).
pub async fn handle_downloads<C: RegistryClient>(
    client: &C,
    names: &[String],
    json: bool,
    out: &mut impl Write,
    err: &mut impl Write,
) -> i32 {
    let mut seen = HashSet::new();
    let names: Vec<String> = names
        .iter()
        .flat_map(|n| n.split(','))
        .map(str::trim)
        .filter(|n| !n.is_empty() && seen.insert(*n))
        .map(str::to_string)
        .collect();
    tracing::info!(count = names.len(), "downloads mode requested from CLI");
    let counts = fetch_downloads(client, &names).await;

    let written = if json {
        let ordered: serde_json::Map<String, serde_json::Value> = names
            .iter()
            .filter_map(|n| counts.get(n).map(|c| (n.clone(), (*c).into())))
            .collect();
        write_json(out, &ordered)
    } else {
        write_downloads(out, &names, &counts)
    };
    match written {
        Ok(()) => 0,
        Err(e) => {
            let _ = writeln!(err, "npmscout: cannot write output: {e}");
            1
        }
    }
}
