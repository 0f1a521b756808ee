//! Work item carried through the queue

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tokio::time::Instant;
use url::Url;

use crate::app::client::ResponseMeta;

/// User callback invoked once per delivered item
///
/// Receives the response metadata (`None` on a cache hit) and the body. A
/// returned error or a panic is logged and swallowed.
pub type Callback = Arc<dyn Fn(Option<ResponseMeta>, Bytes) -> anyhow::Result<()> + Send + Sync>;

/// One URL waiting to be fetched
#[derive(Clone)]
pub struct DownloadItem {
    /// Resolved URL string exactly as built from the submission; the cache key
    pub target: String,
    /// Parsed form of `target`, used for the fetch
    pub url: Url,
    /// Completion handler
    pub callback: Callback,
    /// Earliest instant the fetch may start
    pub eligible_at: Instant,
    /// Failed fetches so far
    pub attempt: u32,
}

impl DownloadItem {
    /// New first-attempt item
    pub fn new(target: String, url: Url, callback: Callback, eligible_at: Instant) -> Self {
        Self {
            target,
            url,
            callback,
            eligible_at,
            attempt: 0,
        }
    }

    /// Same URL and callback, fresh stamp, attempt counter unchanged
    pub fn restamped(&self, eligible_at: Instant) -> Self {
        Self {
            target: self.target.clone(),
            url: self.url.clone(),
            callback: Arc::clone(&self.callback),
            eligible_at,
            attempt: self.attempt,
        }
    }

    /// Same URL and callback after a failed fetch
    pub fn retry(&self, eligible_at: Instant) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.restamped(eligible_at)
        }
    }
}

impl fmt::Debug for DownloadItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadItem")
            .field("target", &self.target)
            .field("eligible_at", &self.eligible_at)
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}
