//! Small utility helpers for URL encoding, package-name handling, and
//! bounded concurrency.
//!
//! These are used by the fetchers in `sources` and by the CLI.

pub mod concurrency;
pub mod config;

use std::fmt::Write;

pub use concurrency::map_with_concurrency;

/// What: Percent-encode a string for use in URLs according to RFC 3986.
///
/// Inputs:
/// - `input`: String to encode.
///
/// Output:
/// - Returns a percent-encoded string where reserved characters are escaped.
///
/// Details:
/// - Unreserved characters as per RFC 3986 (`A-Z`, `a-z`, `0-9`, `-`, `.`, `_`, `~`) are left as-is.
/// - Space is encoded as `%20` (not `+`).
/// - All other bytes are encoded as two uppercase hexadecimal digits prefixed by `%`.
/// - Operates on raw bytes from the input string; any non-ASCII bytes are hex-escaped.
#[must_use]
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &b in input.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(b as char);
            }
            b' ' => out.push_str("%20"),
            _ => {
                out.push('%');
                let _ = write!(out, "{b:02X}");
            }
        }
    }
    out
}

/// What: Check whether a package name carries an organization scope.
///
/// Inputs:
/// - `name`: Package name.
///
/// Output:
/// - `true` for names like `@scope/pkg`.
#[must_use]
pub fn is_scoped(name: &str) -> bool {
    name.starts_with('@')
}

/// What: Encode a package name for use as a single registry path segment.
///
/// Inputs:
/// - `name`: Package name, scoped or not.
///
/// Output:
/// - Encoded name; scoped names keep their leading `@` and encode the `/`.
///
/// Details:
/// - `@scope/pkg` becomes `@scope%2Fpkg`, which is what the registry and the
///   downloads API expect.
#[must_use]
pub fn encode_package_name(name: &str) -> String {
    name.strip_prefix('@').map_or_else(
        || percent_encode(name),
        |rest| format!("@{}", percent_encode(rest)),
    )
}
