//! Typed helpers on top of the byte-oriented [`CacheBucket`].

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CacheBucket;

/// String and JSON accessors for any [`CacheBucket`].
///
/// Kept off the base trait so `CacheBucket` stays object-safe.
pub trait CacheBucketExt: CacheBucket {
    /// Look up a UTF-8 value. Invalid UTF-8 counts as a miss.
    fn get_string(&self, key: &str, etag: &str) -> Option<String> {
        String::from_utf8(self.get(key, etag)?).ok()
    }

    /// Store a UTF-8 value.
    fn set_string(&self, key: &str, etag: &str, value: &str) {
        self.set(key, etag, value.as_bytes());
    }

    /// Look up a JSON value. Undecodable data counts as a miss.
    fn get_json<T: DeserializeOwned>(&self, key: &str, etag: &str) -> Option<T> {
        serde_json::from_slice(&self.get(key, etag)?).ok()
    }

    /// Store a value as JSON; values that fail to serialize are skipped.
    fn set_json<T: Serialize>(&self, key: &str, etag: &str, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.set(key, etag, &bytes),
            Err(e) => tracing::debug!(key, error = %e, "skipping unserializable cache value"),
        }
    }
}

impl<B: CacheBucket + ?Sized> CacheBucketExt for B {}
