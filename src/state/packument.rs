//! Packument (full package metadata document) and its normalization into a
//! search record.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::types::{DownloadStats, Maintainer, PackageInfo, PackageLinks, SearchResultRecord};

/// Base URL of a package's page on npmjs.com.
pub const NPM_PACKAGE_PAGE: &str = "https://www.npmjs.com/package/";

/// Subset of a packument needed to render a search record.
///
/// Only the fields read here are decoded; the rest of the document (the
/// full `versions` map in particular) is ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Packument {
    /// Package name.
    pub name: String,
    /// Named version pointers in publication order. `None` for unpublished
    /// or placeholder packages.
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: Option<Map<String, Value>>,
    /// Top-level description.
    #[serde(default)]
    pub description: Option<String>,
    /// Top-level keywords. Non-string entries are dropped.
    #[serde(default, deserialize_with = "lenient_strings")]
    pub keywords: Vec<String>,
    /// Current maintainers.
    #[serde(default)]
    pub maintainers: Vec<Maintainer>,
    /// Publication times keyed by version, plus `created`/`modified`.
    #[serde(default)]
    pub time: Map<String, Value>,
}

/// Accept a string array, a single string, or anything else (as empty).
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(ToOwned::to_owned))
            .collect(),
        Value::String(s) => vec![s],
        _ => Vec::new(),
    })
}

impl Packument {
    /// Whether any dist-tag is present; packuments without one are unpublished.
    #[must_use]
    pub fn has_dist_tags(&self) -> bool {
        self.dist_tags.as_ref().is_some_and(|tags| !tags.is_empty())
    }

    /// What: Resolve the version shown for this package.
    ///
    /// Output:
    /// - The `latest` dist-tag, else the first dist-tag in document order,
    ///   else an empty string.
    #[must_use]
    pub fn display_version(&self) -> String {
        let Some(tags) = &self.dist_tags else {
            return String::new();
        };
        tags.get("latest")
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .or_else(|| tags.values().find_map(Value::as_str))
            .unwrap_or_default()
            .to_owned()
    }

    /// Time recorded under `key` in the `time` map, if it is a non-empty string.
    fn time_of(&self, key: &str) -> Option<&str> {
        self.time
            .get(key)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
    }

    /// What: Resolve the timestamp shown for the display version.
    ///
    /// Inputs:
    /// - `version`: Display version from [`Packument::display_version`]
    ///
    /// Output:
    /// - Publication time of `version`, else the packument's `modified` time,
    ///   else `None`.
    #[must_use]
    pub fn version_time(&self, version: &str) -> Option<String> {
        let by_version = if version.is_empty() {
            None
        } else {
            self.time_of(version)
        };
        by_version
            .or_else(|| self.time_of("modified"))
            .map(ToOwned::to_owned)
    }

    /// What: Normalize this packument into a search record.
    ///
    /// Inputs:
    /// - `weekly_downloads`: Download count if one was fetched
    ///
    /// Output:
    /// - A `SearchResultRecord` with zeroed scores and an npmjs.com link.
    ///
    /// Details:
    /// - `downloads` stays `None` when no count was supplied, so "unknown"
    ///   never reads as zero.
    #[must_use]
    pub fn to_record(&self, weekly_downloads: Option<u64>) -> SearchResultRecord {
        let version = self.display_version();
        let date = self.version_time(&version);
        SearchResultRecord {
            package: PackageInfo {
                name: self.name.clone(),
                description: self.description.clone(),
                keywords: self.keywords.clone(),
                date: date.clone(),
                links: PackageLinks {
                    npm: Some(format!("{NPM_PACKAGE_PAGE}{}", self.name)),
                    ..PackageLinks::default()
                },
                maintainers: self.maintainers.clone(),
                version,
            },
            downloads: weekly_downloads.map(|weekly| DownloadStats { weekly }),
            updated: date,
            ..SearchResultRecord::default()
        }
    }
}
