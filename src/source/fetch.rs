use std::{sync::Arc, time::Duration};

use crate::foundation::error::{Svg2ImgError, Svg2ImgResult};

/// Default `User-Agent` sent by [`HttpFetcher`].
pub const DEFAULT_USER_AGENT: &str = concat!("svg2img/", env!("CARGO_PKG_VERSION"));

/// Bytes and declared content type of a fetched URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedResource {
    /// Response body.
    pub bytes: Vec<u8>,
    /// `Content-Type` header value, if the server sent one.
    pub content_type: Option<String>,
}

impl FetchedResource {
    /// Bundle a body with its content type.
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            bytes,
            content_type,
        }
    }

    /// Whether the declared content type names SVG (`image/svg+xml` and friends).
    pub fn is_svg(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("svg"))
    }
}

/// Fetches `http://` and `https://` URLs for the primary source and for referenced images.
///
/// Implementations are shared by reference across the fetch pool, hence `Send + Sync`.
/// Any error is reported as-is; callers decide whether it is fatal.
pub trait ResourceFetcher: Send + Sync {
    /// Fetch `url` and return its full body.
    fn fetch(&self, url: &str) -> Svg2ImgResult<FetchedResource>;
}

impl<T: ResourceFetcher + ?Sized> ResourceFetcher for Arc<T> {
    fn fetch(&self, url: &str) -> Svg2ImgResult<FetchedResource> {
        (**self).fetch(url)
    }
}

impl<T: ResourceFetcher + ?Sized> ResourceFetcher for &T {
    fn fetch(&self, url: &str) -> Svg2ImgResult<FetchedResource> {
        (**self).fetch(url)
    }
}

/// Blocking HTTP(S) fetcher backed by a shared `ureq` agent.
///
/// Non-success status codes are errors. Redirects are followed by the agent.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    user_agent: String,
    max_size: u64,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("user_agent", &self.user_agent)
            .field("max_size", &self.max_size)
            .finish()
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Request timeout used by [`HttpFetcher::new`].
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    /// Largest accepted response body.
    pub const DEFAULT_MAX_SIZE: u64 = 50 * 1024 * 1024;

    /// Fetcher with the default timeout and size limit.
    pub fn new() -> Self {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    /// Fetcher whose requests give up after `timeout` (connect through body read).
    pub fn with_timeout(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        let agent: ureq::Agent = config.into();
        Self {
            agent,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_size: Self::DEFAULT_MAX_SIZE,
        }
    }

    /// Override the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Override the maximum response body size in bytes.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }
}

impl ResourceFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Svg2ImgResult<FetchedResource> {
        tracing::debug!(url, "http get");
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()
            .map_err(|e| Svg2ImgError::fetch(format!("GET {url}: {e}")))?;

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|h| h.to_str().ok())
            .map(str::to_owned);

        let bytes = response
            .body_mut()
            .with_config()
            .limit(self.max_size)
            .read_to_vec()
            .map_err(|e| Svg2ImgError::fetch(format!("read body of {url}: {e}")))?;

        Ok(FetchedResource::new(bytes, content_type))
    }
}
