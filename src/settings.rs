//! User settings: `settings.conf` loading and config/log directory layout.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, warn};

use crate::util::config::{parse_key_value, skip_comment_or_empty};

/// Directory name under the XDG config base.
const APP_DIR: &str = "npmscout";
/// Settings file name inside the config directory.
const SETTINGS_FILE: &str = "settings.conf";

/// Runtime settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the package registry.
    pub registry_url: String,
    /// Base URL of the downloads statistics service.
    pub downloads_url: String,
    /// Records requested per search page.
    pub page_size: usize,
    /// Whole-request timeout.
    pub http_timeout_secs: u64,
    /// Connection timeout.
    pub connect_timeout_secs: u64,
    /// How long a cached response counts as fresh.
    pub cache_ttl_secs: u64,
    /// Maximum cached responses.
    pub cache_capacity: usize,
    /// Concurrent metadata requests for organization listings.
    pub metadata_concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry_url: "https://registry.npmjs.org".to_string(),
            downloads_url: "https://api.npmjs.org".to_string(),
            page_size: 25,
            http_timeout_secs: 30,
            connect_timeout_secs: 15,
            cache_ttl_secs: 60,
            cache_capacity: 256,
            metadata_concurrency: 10,
        }
    }
}

impl Settings {
    /// What: Apply command-line overrides on top of file settings.
    ///
    /// Inputs:
    /// - `registry_url`: Replacement registry base URL
    /// - `downloads_url`: Replacement downloads base URL
    /// - `page_size`: Replacement page size (0 is ignored)
    ///
    /// Output:
    /// - Settings with every provided override applied.
    #[must_use]
    pub fn with_overrides(
        mut self,
        registry_url: Option<&str>,
        downloads_url: Option<&str>,
        page_size: Option<usize>,
    ) -> Self {
        if let Some(url) = registry_url {
            self.registry_url = trim_base_url(url);
        }
        if let Some(url) = downloads_url {
            self.downloads_url = trim_base_url(url);
        }
        if let Some(size) = page_size.filter(|s| *s > 0) {
            self.page_size = size;
        }
        self
    }
}

/// Strip surrounding whitespace and trailing slashes from a base URL.
fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Parse `value` for `key`, warning and returning `None` when it does not fit.
fn parse_value<T: FromStr>(key: &str, value: &str) -> Option<T> {
    let parsed = value.parse().ok();
    if parsed.is_none() {
        warn!(key, value, "ignoring invalid settings value");
    }
    parsed
}

/// What: Parse settings file content over the defaults.
///
/// Inputs:
/// - `content`: Full text of a `settings.conf`
///
/// Output:
/// - Defaults overridden by every recognized, valid key.
///
/// Details:
/// - Later lines win over earlier ones.
/// - Unknown keys, lines without `=`, and unparsable or zero numbers are
///   skipped with a warning.
#[must_use]
pub fn parse_settings(content: &str) -> Settings {
    let mut settings = Settings::default();
    for (lineno, line) in content.lines().enumerate() {
        if skip_comment_or_empty(line) {
            continue;
        }
        let Some((key, value)) = parse_key_value(line) else {
            warn!(line = lineno + 1, "ignoring settings line without key = value");
            continue;
        };
        match key.as_str() {
            "registry_url" if !value.trim().is_empty() => {
                settings.registry_url = trim_base_url(&value);
            }
            "downloads_url" if !value.trim().is_empty() => {
                settings.downloads_url = trim_base_url(&value);
            }
            "page_size" => {
                if let Some(v) = parse_value::<usize>(&key, &value).filter(|v| *v > 0) {
                    settings.page_size = v;
                }
            }
            "http_timeout_secs" => {
                if let Some(v) = parse_value::<u64>(&key, &value).filter(|v| *v > 0) {
                    settings.http_timeout_secs = v;
                }
            }
            "connect_timeout_secs" => {
                if let Some(v) = parse_value::<u64>(&key, &value).filter(|v| *v > 0) {
                    settings.connect_timeout_secs = v;
                }
            }
            "cache_ttl_secs" => {
                if let Some(v) = parse_value(&key, &value) {
                    settings.cache_ttl_secs = v;
                }
            }
            "cache_capacity" => {
                if let Some(v) = parse_value::<usize>(&key, &value).filter(|v| *v > 0) {
                    settings.cache_capacity = v;
                }
            }
            "metadata_concurrency" => {
                if let Some(v) = parse_value::<usize>(&key, &value).filter(|v| *v > 0) {
                    settings.metadata_concurrency = v;
                }
            }
            _ => warn!(key, line = lineno + 1, "ignoring unknown settings key"),
        }
    }
    settings
}

/// What: Load settings from the first `settings.conf` found.
///
/// Output:
/// - Parsed settings, or defaults when no file exists or it cannot be read.
#[must_use]
pub fn load_settings() -> Settings {
    let Some(path) = resolve_settings_config_path() else {
        debug!("no settings file found; using defaults");
        return Settings::default();
    };
    load_settings_from(&path)
}

/// Load settings from `path`, falling back to defaults when unreadable.
#[must_use]
pub fn load_settings_from(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(path = %path.display(), "loading settings");
            parse_settings(&content)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot read settings file; using defaults");
            Settings::default()
        }
    }
}

/// Determine the settings file path, preferring `$XDG_CONFIG_HOME` over `$HOME/.config`.
#[must_use]
pub fn resolve_settings_config_path() -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME")
        && !xdg.trim().is_empty()
    {
        candidates.push(Path::new(&xdg).join(APP_DIR).join(SETTINGS_FILE));
    }
    if let Ok(home) = env::var("HOME") {
        candidates.push(Path::new(&home).join(".config").join(APP_DIR).join(SETTINGS_FILE));
    }
    candidates.into_iter().find(|p| p.is_file())
}

/// Resolve an XDG base directory from environment or default to `$HOME` + segments.
fn xdg_base_dir(var: &str, home_default: &[&str]) -> PathBuf {
    if let Ok(p) = env::var(var)
        && !p.trim().is_empty()
    {
        return PathBuf::from(p);
    }
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let mut base = PathBuf::from(home);
    for seg in home_default {
        base = base.join(seg);
    }
    base
}

/// Config directory (`$XDG_CONFIG_HOME/npmscout` or `~/.config/npmscout`).
#[must_use]
pub fn config_dir() -> PathBuf {
    xdg_base_dir("XDG_CONFIG_HOME", &[".config"]).join(APP_DIR)
}

/// Logs directory under config, created if missing.
///
/// # Errors
/// - Returns the I/O error when the directory cannot be created.
pub fn logs_dir() -> std::io::Result<PathBuf> {
    let dir = config_dir().join("logs");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
