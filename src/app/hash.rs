//! Fixed-width URL digest used as the content cache key
//!
//! A URL is keyed by the MD5 of the exact resolved string, before any parser
//! normalization. The digest is stored as its
//! raw 16 bytes and rendered as 32 lowercase hex characters, which is also the
//! on-disk file name of the cache entry.

use std::fmt;

use serde::{Deserialize, Serialize};

/// MD5 digest of a URL string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UrlDigest([u8; 16]);

impl UrlDigest {
    /// Digest a raw URL string
    pub fn of_str(url: &str) -> Self {
        UrlDigest(md5::compute(url.as_bytes()).0)
    }

    /// Parse a digest back from its 32-character hex form
    ///
    /// Returns `None` for anything that is not exactly 32 hex digits, which is
    /// how stray files in the cache directory are told apart from entries.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 32 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let mut bytes = [0u8; 16];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).ok()?;
            bytes[i] = u8::from_str_radix(pair, 16).ok()?;
        }
        Some(UrlDigest(bytes))
    }

    /// Lowercase hex representation
    pub fn to_hex(&self) -> String {
        use std::fmt::Write;
        self.0.iter().fold(String::with_capacity(32), |mut acc, b| {
            let _ = write!(&mut acc, "{:02x}", b);
            acc
        })
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for UrlDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for UrlDigest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for UrlDigest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        UrlDigest::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid URL digest: {}", s)))
    }
}
