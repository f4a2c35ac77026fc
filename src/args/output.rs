//! Plain-text and JSON rendering of command results.

use std::io::{self, Write};

use serde::Serialize;

use crate::state::{DownloadCountMap, SearchResponse, SearchResultRecord};

/// Notice shown when upstream throttled the request.
pub const RATE_LIMIT_NOTICE: &str =
    "npmscout: the npm registry is rate limiting requests; try again in a moment";

/// Format a download count with thousands separators (`1234567` -> `1,234,567`).
#[must_use]
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// One listing line: name, version, weekly downloads, description.
fn record_line(record: &SearchResultRecord) -> String {
    let downloads = record
        .weekly_downloads()
        .map_or_else(|| "-".to_string(), |n| format!("{}/wk", format_count(n)));
    let mut line = format!("{} {} ({downloads})", record.name(), record.package.version);
    if let Some(desc) = record.package.description.as_deref().filter(|d| !d.trim().is_empty()) {
        line.push_str(" - ");
        line.push_str(desc.trim());
    }
    line
}

/// What: Write a result set as a text listing.
///
/// Inputs:
/// - `out`: Destination
/// - `resp`: Results to list
///
/// # Errors
/// - Propagates write failures.
///
/// Details:
/// - One line per record, then a `shown of total` summary.
/// - Stale results get a trailing note.
pub fn write_listing(out: &mut impl Write, resp: &SearchResponse) -> io::Result<()> {
    if resp.is_empty() {
        writeln!(out, "No packages found.")?;
        return Ok(());
    }
    for record in &resp.objects {
        writeln!(out, "{}", record_line(record))?;
    }
    writeln!(out, "-- {} of {} shown", resp.objects.len(), resp.total)?;
    if resp.is_stale {
        writeln!(out, "(cached results; the registry could not be reached)")?;
    }
    Ok(())
}

/// Write weekly download counts in the order the names were given.
///
/// # Errors
/// - Propagates write failures.
pub fn write_downloads(out: &mut impl Write, names: &[String], counts: &DownloadCountMap) -> io::Result<()> {
    for name in names {
        match counts.get(name) {
            Some(n) => writeln!(out, "{name} {}", format_count(*n))?,
            None => writeln!(out, "{name} -")?,
        }
    }
    Ok(())
}

/// Write `value` as pretty JSON followed by a newline.
///
/// # Errors
/// - Serialization failures surface as `io::Error`.
pub fn write_json<T: Serialize>(out: &mut impl Write, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}
