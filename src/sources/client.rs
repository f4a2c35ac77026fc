//! Transport seam: the `RegistryClient` trait and its reqwest implementation.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::debug;

use super::error::FetchError;
use crate::settings::Settings;

/// Upstream host a request is addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Api {
    /// Package registry (search, packuments, org listings).
    Registry,
    /// Download statistics API.
    Downloads,
}

impl Api {
    /// Short label used in logs and cache keys.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Registry => "registry",
            Self::Downloads => "downloads",
        }
    }
}

/// A decoded response body plus the transport's staleness flag.
#[derive(Clone, Debug, PartialEq)]
pub struct Fetched<T> {
    /// Response body.
    pub data: T,
    /// True when the transport served an expired copy.
    pub is_stale: bool,
}

impl<T> Fetched<T> {
    /// Wrap a freshly fetched body.
    pub const fn fresh(data: T) -> Self {
        Self {
            data,
            is_stale: false,
        }
    }

    /// Transform the body, keeping the staleness flag.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            data: f(self.data),
            is_stale: self.is_stale,
        }
    }
}

/// Generic JSON GET against one of the upstream APIs.
///
/// Dropping the returned future abandons the request; callers use that to
/// cancel work for a superseded query.
pub trait RegistryClient: Send + Sync {
    /// What: Fetch `path` from `api` and decode the body as JSON.
    ///
    /// Inputs:
    /// - `api`: Which upstream host to address
    /// - `path`: Absolute path including any query string (e.g. `/-/v1/search?text=x`)
    ///
    /// Output:
    /// - `Ok(Fetched)` with the JSON body; `Err(FetchError)` otherwise.
    fn get_json(
        &self,
        api: Api,
        path: &str,
    ) -> impl Future<Output = Result<Fetched<Value>, FetchError>> + Send;
}

/// reqwest-backed client for the public npm endpoints.
#[derive(Clone, Debug)]
pub struct HttpClient {
    /// Pooled HTTP client.
    http: reqwest::Client,
    /// Registry base URL without trailing slash.
    registry_url: String,
    /// Downloads API base URL without trailing slash.
    downloads_url: String,
}

impl HttpClient {
    /// What: Build a client from settings.
    ///
    /// Inputs:
    /// - `settings`: Base URLs and timeouts
    ///
    /// Output:
    /// - Configured `HttpClient`
    ///
    /// # Errors
    /// - Returns the reqwest builder error if TLS or the HTTP stack cannot be initialized.
    pub fn new(settings: &Settings) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .user_agent(format!("npmscout/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            registry_url: settings.registry_url.trim_end_matches('/').to_string(),
            downloads_url: settings.downloads_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full URL for `path` on `api`.
    #[must_use]
    pub fn url_for(&self, api: Api, path: &str) -> String {
        let base = match api {
            Api::Registry => &self.registry_url,
            Api::Downloads => &self.downloads_url,
        };
        format!("{base}{path}")
    }
}

impl RegistryClient for HttpClient {
    async fn get_json(&self, api: Api, path: &str) -> Result<Fetched<Value>, FetchError> {
        let url = self.url_for(api, path);
        debug!(api = api.label(), url = %url, "requesting");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.clone(),
                message: e.to_string(),
            })?;
        let status = resp.status();
        if !status.is_success() {
            debug!(url = %url, status = status.as_u16(), "non-success status");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }
        let data = resp.json::<Value>().await.map_err(|e| FetchError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(Fetched::fresh(data))
    }
}
