//! reqwest-backed fetch capability
//!
//! One client is kept per session generation. When the backoff controller
//! replaces the session, the next fetch notices the new generation and builds
//! a client around the fresh cookie jar; in-flight requests on the old client
//! finish undisturbed.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::config::ClientConfig;
use super::session::Session;
use super::{FetchResponse, Fetcher, ResponseMeta};
use crate::errors::{ConfigError, ConfigResult, TransportError, TransportResult};

/// HTTP transport with per-session client reuse
#[derive(Debug)]
pub struct HttpFetcher {
    config: ClientConfig,
    client: Mutex<Option<(u64, Client)>>,
}

impl HttpFetcher {
    /// Creates a new fetcher with the given client configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::HttpClient` if the configuration cannot produce a
    /// client (bad user agent, TLS backend failure).
    pub fn new(config: ClientConfig) -> ConfigResult<Self> {
        // Fail fast on configurations reqwest rejects; the real client is
        // built lazily against the first session handed to `fetch`.
        config
            .build_http_client(Session::new().cookies().clone())
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            config,
            client: Mutex::new(None),
        })
    }

    /// Client bound to `session`'s cookie jar, built on generation change
    fn client_for(&self, session: &Session) -> TransportResult<Client> {
        let mut guard = self.client.lock();
        if let Some((generation, client)) = guard.as_ref() {
            if *generation == session.generation() {
                return Ok(client.clone());
            }
        }

        debug!(
            "Building HTTP client for session generation {}",
            session.generation()
        );
        let client = self
            .config
            .build_http_client(session.cookies().clone())
            .map_err(TransportError::Http)?;
        *guard = Some((session.generation(), client.clone()));
        Ok(client)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, session: &Session) -> TransportResult<FetchResponse> {
        let client = self.client_for(session)?;
        let response = client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let meta = ResponseMeta {
            status: status.as_u16(),
            url: response.url().clone(),
            headers: response.headers().clone(),
        };
        let body = response.bytes().await?;

        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(FetchResponse { meta, body })
    }
}
