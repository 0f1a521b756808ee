//! Fetch capability and its reqwest implementation
//!
//! The scheduling engine treats the transport as an opaque capability: given a
//! URL and the current shared [`Session`], produce response metadata and a
//! body, or a [`TransportError`]. Anything implementing [`Fetcher`] can be
//! plugged into the download manager; [`HttpFetcher`] is the default.
//!
//! - `config`: HTTP client configuration and building
//! - `session`: shared cookie/session state with generations
//! - `http`: reqwest-backed [`Fetcher`]
//!
//! [`TransportError`]: crate::errors::TransportError

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use url::Url;

use crate::errors::TransportResult;

pub mod config;
pub mod http;
pub mod session;

pub use config::ClientConfig;
pub use http::HttpFetcher;
pub use session::Session;

/// Response metadata handed to callbacks after a network fetch
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    /// HTTP status code
    pub status: u16,
    /// Final URL after redirects
    pub url: Url,
    /// Response headers
    pub headers: HeaderMap,
}

impl ResponseMeta {
    /// Metadata for a plain 200 response without headers
    pub fn ok(url: Url) -> Self {
        Self {
            status: 200,
            url,
            headers: HeaderMap::new(),
        }
    }
}

/// Successful fetch result
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Status, final URL and headers
    pub meta: ResponseMeta,
    /// Raw body bytes
    pub body: Bytes,
}

/// The fetch capability consumed by workers
///
/// Implementations must be safe to call concurrently from every worker. A
/// returned error of any kind trips the backoff controller.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Fetch `url` using the shared `session`
    async fn fetch(&self, url: &Url, session: &Session) -> TransportResult<FetchResponse>;
}
