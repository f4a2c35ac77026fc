//! Error types for upstream fetches and the components built on them.

use thiserror::Error;

/// Failure of a single upstream request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Upstream answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },
    /// The request never produced a response (connect, TLS, timeout).
    ///
    /// The message starts with "Failed to fetch", which is also how a
    /// throttled cross-origin request surfaces; see
    /// [`classify`](crate::sources::rate_limit::classify).
    #[error("Failed to fetch {url}: {message}")]
    Network {
        /// Requested URL.
        url: String,
        /// Underlying transport error text.
        message: String,
    },
    /// The body was not JSON or not in the expected shape.
    #[error("invalid response from {url}: {message}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Parser error text.
        message: String,
    },
}

impl FetchError {
    /// HTTP status of the failure, if upstream answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network { .. } | Self::Decode { .. } => None,
        }
    }

    /// Whether upstream reported the resource as absent (404).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404))
    }

    /// What: Build a `Decode` error from a serde failure.
    ///
    /// Inputs:
    /// - `url`: Requested URL or path
    /// - `err`: Deserialization error
    #[must_use]
    pub fn decode(url: impl Into<String>, err: &serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            message: err.to_string(),
        }
    }
}

/// Failure crossing the component boundary.
///
/// Rate limiting, stale responses, and partial failures are not errors; they
/// are folded into (possibly empty) results.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    /// The organization does not exist (or its name is not valid).
    #[error("The organization \"@{org}\" does not exist on npm")]
    OrgNotFound {
        /// Organization name as requested.
        org: String,
    },
    /// Any other failure on the primary search or metadata path.
    #[error(transparent)]
    Upstream(#[from] FetchError),
}

impl SearchError {
    /// Whether this is the "not found" condition.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::OrgNotFound { .. } => true,
            Self::Upstream(err) => err.is_not_found(),
        }
    }
}
