//! Shared session state consumed by the fetch capability
//!
//! A session is a cookie jar tagged with a generation number. The backoff
//! controller swaps in a fresh session on every trip; transports compare the
//! generation to know when their cached client must be rebuilt.

use std::sync::Arc;

use reqwest::cookie::Jar;

/// Cookie/session state shared by all workers
#[derive(Debug)]
pub struct Session {
    generation: u64,
    cookies: Arc<Jar>,
}

impl Session {
    /// Empty first-generation session
    pub fn new() -> Self {
        Self::with_generation(0)
    }

    fn with_generation(generation: u64) -> Self {
        Self {
            generation,
            cookies: Arc::new(Jar::default()),
        }
    }

    /// Empty session that supersedes `self`
    pub fn successor(&self) -> Self {
        Self::with_generation(self.generation + 1)
    }

    /// Number of times the session has been replaced
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cookie jar backing this session
    pub fn cookies(&self) -> &Arc<Jar> {
        &self.cookies
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
