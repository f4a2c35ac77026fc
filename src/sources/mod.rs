//! Upstream data retrieval: transport, registry endpoints, downloads, and
//! organization aggregation.

pub mod cache;
pub mod client;
pub mod downloads;
pub mod error;
pub mod exact;
pub mod org;
pub mod rate_limit;
pub mod registry;

pub use cache::CachedClient;
pub use client::{Api, Fetched, HttpClient, RegistryClient};
pub use downloads::{fetch_downloads, fetch_weekly_downloads};
pub use error::{FetchError, SearchError};
pub use exact::fetch_exact;
pub use org::{fetch_org_packages, fetch_org_packages_with_concurrency};
pub use rate_limit::{FailureKind, RateLimitFlag, classify};
pub use registry::{fetch_packument, search_page};
