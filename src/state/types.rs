//! Core value types for search results, the per-query cache, and download maps.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Weekly download counts keyed by package name.
///
/// A missing key means the count is unknown (never fetched or the lookup
/// failed); it never stands in for zero.
pub type DownloadCountMap = HashMap<String, u64>;

/// Package maintainer as reported by the search endpoint or a packument.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    /// Registry username (packuments call this field `name`).
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Contact address, when published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Links attached to a search result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageLinks {
    /// Canonical package page on npmjs.com.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npm: Option<String>,
    /// Project homepage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// Source repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Issue tracker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bugs: Option<String>,
}

/// The `package` part of a search result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Canonical package name; identity of a record within a result set.
    pub name: String,
    /// Display version (usually the `latest` dist-tag).
    #[serde(default)]
    pub version: String,
    /// One-line description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Keywords in publication order.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Last-modified timestamp of the display version (ISO-8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Canonical links.
    #[serde(default)]
    pub links: PackageLinks,
    /// Maintainers.
    #[serde(default)]
    pub maintainers: Vec<Maintainer>,
}

/// Quality/popularity/maintenance breakdown of an upstream score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreDetail {
    /// Quality sub-score.
    #[serde(default)]
    pub quality: f64,
    /// Popularity sub-score.
    #[serde(default)]
    pub popularity: f64,
    /// Maintenance sub-score.
    #[serde(default)]
    pub maintenance: f64,
}

/// Upstream ranking score, passed through unchanged or zeroed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Final combined score.
    #[serde(default, rename = "final")]
    pub final_score: f64,
    /// Sub-score breakdown.
    #[serde(default)]
    pub detail: ScoreDetail,
}

/// Weekly download figure attached to a record once fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStats {
    /// Downloads over the last week.
    pub weekly: u64,
}

/// One ranked search result.
///
/// Deserializes directly from an element of the search endpoint's `objects`
/// array; records built from packuments go through
/// [`Packument::to_record`](crate::state::Packument::to_record).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultRecord {
    /// Package metadata.
    pub package: PackageInfo,
    /// Upstream score (zero when not supplied).
    #[serde(default)]
    pub score: Score,
    /// Relevance of this record to the query text.
    #[serde(default)]
    pub search_score: f64,
    /// Weekly downloads; present only when fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<DownloadStats>,
    /// Last update timestamp (ISO-8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

impl SearchResultRecord {
    /// Package name, the identity of this record.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.package.name
    }

    /// Weekly downloads if they were fetched.
    #[must_use]
    pub fn weekly_downloads(&self) -> Option<u64> {
        self.downloads.map(|d| d.weekly)
    }
}

/// A page of search results as handed to callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Records in upstream rank order.
    #[serde(default)]
    pub objects: Vec<SearchResultRecord>,
    /// Upstream's claimed total number of matches.
    #[serde(default)]
    pub total: usize,
    /// Whether the transport served this from an expired copy.
    #[serde(default)]
    pub is_stale: bool,
    /// Time the response was produced (ISO-8601).
    #[serde(default)]
    pub time: String,
}

impl SearchResponse {
    /// What: Build a response stamped with the current time.
    ///
    /// Inputs:
    /// - `objects`: Records in rank order
    /// - `total`: Total match count to advertise
    /// - `is_stale`: Staleness flag from the transport
    ///
    /// Output:
    /// - A `SearchResponse` whose `time` is now, in RFC 3339.
    #[must_use]
    pub fn new(objects: Vec<SearchResultRecord>, total: usize, is_stale: bool) -> Self {
        Self {
            objects,
            total,
            is_stale,
            time: now_rfc3339(),
        }
    }

    /// The canonical empty result: no records, zero total, not stale.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, false)
    }

    /// True when this carries no records and advertises no matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.total == 0
    }
}

/// Accumulated results for one query.
///
/// `records` never holds two entries with the same package name; new pages
/// are appended in upstream order after dropping names already present.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchCacheEntry {
    /// Query text these records belong to.
    pub query: String,
    /// Records in upstream rank order, append-only.
    pub records: Vec<SearchResultRecord>,
    /// Latest total reported by upstream.
    pub total: usize,
}

impl SearchCacheEntry {
    /// What: Create a cache entry from a first page of results.
    ///
    /// Inputs:
    /// - `query`: Query the records belong to
    /// - `records`: First page in rank order
    /// - `total`: Upstream total
    ///
    /// Output:
    /// - Entry holding `records` with any repeated names dropped (first wins).
    #[must_use]
    pub fn new(query: impl Into<String>, records: Vec<SearchResultRecord>, total: usize) -> Self {
        let mut entry = Self {
            query: query.into(),
            records: Vec::with_capacity(records.len()),
            total,
        };
        entry.append_unique(records);
        entry
    }

    /// What: Merge a further page into this entry.
    ///
    /// Inputs:
    /// - `records`: Newly fetched page in rank order
    /// - `total`: Total reported alongside that page
    ///
    /// Output:
    /// - Number of records actually appended.
    ///
    /// Details:
    /// - Names already held are skipped; survivors keep upstream order.
    /// - `total` is replaced by the latest upstream value.
    pub fn merge(&mut self, records: Vec<SearchResultRecord>, total: usize) -> usize {
        let appended = self.append_unique(records);
        self.total = total;
        appended
    }

    /// Appends records whose names are not yet held; returns how many were added.
    fn append_unique(&mut self, records: Vec<SearchResultRecord>) -> usize {
        let mut seen: HashSet<String> = self.records.iter().map(|r| r.package.name.clone()).collect();
        let before = self.records.len();
        for record in records {
            if seen.insert(record.package.name.clone()) {
                self.records.push(record);
            }
        }
        self.records.len() - before
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether upstream advertises more matches than are held.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.records.len() < self.total
    }

    /// Snapshot of this entry as a caller-facing response.
    #[must_use]
    pub fn to_response(&self) -> SearchResponse {
        SearchResponse::new(self.records.clone(), self.total, false)
    }
}

/// Current UTC time in RFC 3339 with millisecond precision.
#[must_use]
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
