//! Data model shared by the fetchers and the search session.

pub mod packument;
pub mod types;

pub use packument::Packument;
pub use types::{
    DownloadCountMap, DownloadStats, Maintainer, PackageInfo, PackageLinks, Score, ScoreDetail,
    SearchCacheEntry, SearchResponse, SearchResultRecord,
};
