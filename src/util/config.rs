//! Line-level parsing for `key = value` configuration files.

/// What: Check if a line carries no setting (blank or a comment).
///
/// Inputs:
/// - `line`: Raw line from a settings file
///
/// Output:
/// - `true` if the line should be skipped
///
/// Details:
/// - Comments start with `#`, `//`, or `;` after leading whitespace
#[must_use]
pub fn skip_comment_or_empty(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("//")
        || trimmed.starts_with(';')
}

/// What: Split a settings line into a normalized key and its value.
///
/// Inputs:
/// - `line`: Line in `key = value` form
///
/// Output:
/// - `Some((key, value))`, or `None` when there is no `=` or the key is empty
///
/// Details:
/// - Splits on the first `=`; the key is trimmed, lowercased, and `-` becomes `_`
/// - The value is trimmed and one layer of matching quotes is removed
/// - A trailing ` # comment` after the value is dropped
#[must_use]
pub fn parse_key_value(line: &str) -> Option<(String, String)> {
    let (raw_key, raw_value) = line.trim().split_once('=')?;
    let key = raw_key.trim().to_ascii_lowercase().replace('-', "_");
    if key.is_empty() {
        return None;
    }
    let value = raw_value
        .split_once(" #")
        .map_or(raw_value, |(v, _)| v)
        .trim();
    Some((key, unquote(value).to_string()))
}

/// Strip one layer of matching single or double quotes.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
