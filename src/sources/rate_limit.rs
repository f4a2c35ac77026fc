//! Rate-limit detection for upstream search failures and the session flag
//! that surfaces it.
//!
//! Throttled responses from the registry may carry no inspectable status:
//! a 429 sent without CORS headers reaches a browser transport as a generic
//! "Failed to fetch". Classification therefore works on the failure's
//! message text. This also treats every other failure with that wording as
//! throttling; a structured status, when the transport keeps one, is not
//! consulted so that behavior stays identical across transports.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

/// Message fragment produced when a request is blocked before a response is visible.
pub const BLOCKED_FETCH_MARKER: &str = "Failed to fetch";
/// Literal status code for "Too Many Requests".
pub const TOO_MANY_REQUESTS_CODE: &str = "429";

/// Outcome of classifying an upstream failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Upstream throttling; absorbed into an empty result plus a flag.
    RateLimited,
    /// Anything else; propagated to the caller.
    Other,
}

/// What: Classify a failure message.
///
/// Inputs:
/// - `message`: Display text of the failure
///
/// Output:
/// - `RateLimited` if the text contains "Failed to fetch" or "429", else `Other`.
#[must_use]
pub fn classify_message(message: &str) -> FailureKind {
    if message.contains(BLOCKED_FETCH_MARKER) || message.contains(TOO_MANY_REQUESTS_CODE) {
        FailureKind::RateLimited
    } else {
        FailureKind::Other
    }
}

/// What: Classify an upstream failure as rate limiting or a hard failure.
///
/// Inputs:
/// - `failure`: Any error from the search path
///
/// Output:
/// - See [`classify_message`]; only the rendered message is inspected.
#[must_use]
pub fn classify(failure: &dyn std::error::Error) -> FailureKind {
    let kind = classify_message(&failure.to_string());
    debug!(?kind, error = %failure, "classified upstream failure");
    kind
}

/// Session-scoped "rate limited" flag.
///
/// Set only when a search fetch fails and is classified as rate limiting;
/// cleared by any successful fetch and by the empty-query short-circuit.
#[derive(Debug, Default)]
pub struct RateLimitFlag(AtomicBool);

impl RateLimitFlag {
    /// Mark the session as rate limited.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear the flag after a successful fetch.
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Whether the last search was rate limited.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::FetchError;

    #[test]
    /// What: Known throttling messages classify as rate limited; others do not.
    fn classify_message_matches_markers() {
        assert_eq!(classify_message("Failed to fetch"), FailureKind::RateLimited);
        assert_eq!(
            classify_message("[GET] \"/-/v1/search\": 429 Too Many Requests"),
            FailureKind::RateLimited
        );
        assert_eq!(classify_message("500 Internal Server Error"), FailureKind::Other);
        assert_eq!(classify_message(""), FailureKind::Other);
    }

    #[test]
    /// What: Transport errors classify through their display text.
    ///
    /// Details:
    /// - Network failures read "Failed to fetch ..." and count as throttling.
    /// - A 429 status is throttling; a 503 is a hard failure.
    fn classify_fetch_errors() {
        let throttled = FetchError::Status {
            status: 429,
            url: "https://registry.npmjs.org/-/v1/search?text=x".into(),
        };
        let unavailable = FetchError::Status {
            status: 503,
            url: "https://registry.npmjs.org/-/v1/search?text=x".into(),
        };
        let blocked = FetchError::Network {
            url: "https://registry.npmjs.org/-/v1/search?text=x".into(),
            message: "error sending request".into(),
        };
        assert_eq!(classify(&throttled), FailureKind::RateLimited);
        assert_eq!(classify(&blocked), FailureKind::RateLimited);
        assert_eq!(classify(&unavailable), FailureKind::Other);
    }

    #[test]
    fn flag_sets_and_clears() {
        let flag = RateLimitFlag::default();
        assert!(!flag.is_set());
        flag.set();
        assert!(flag.is_set());
        flag.clear();
        assert!(!flag.is_set());
    }
}
