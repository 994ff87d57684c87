//! Artifact cache for quire.
//!
//! Expensive collaborator output (typeset SVG, diagram renders) is keyed by a
//! content hash and validated by an etag naming the producer, so switching the
//! typesetter or its endpoint never serves a stale artifact.
//!
//! - [`Cache`] hands out named [`CacheBucket`]s
//! - [`NullCache`] disables caching entirely
//! - [`FileCache`] persists buckets as directories under a versioned root
//!
//! # Example
//!
//! ```
//! use quire_cache::{Cache, NullCache};
//!
//! let bucket = NullCache.bucket("typeset");
//! bucket.set("3f2a", "typst", b"<svg/>");
//! assert_eq!(bucket.get("3f2a", "typst"), None);
//! ```

mod ext;
mod file;

pub use ext::CacheBucketExt;
pub use file::FileCache;

/// Key-value partition of a [`Cache`].
///
/// A lookup hits only when the stored etag equals the requested one. An
/// empty requested etag accepts whatever is stored.
pub trait CacheBucket: Send + Sync {
    /// Look up `key`, returning the stored bytes when the etag matches.
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key`, replacing any previous entry.
    ///
    /// Failures are swallowed: a cache write must never fail a build.
    fn set(&self, key: &str, etag: &str, value: &[u8]);
}

/// Factory for isolated [`CacheBucket`]s.
pub trait Cache: Send + Sync {
    /// Open the bucket called `name`, creating it lazily on first write.
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;
}

/// Bucket that stores nothing.
pub struct NullCacheBucket;

impl CacheBucket for NullCacheBucket {
    fn get(&self, _key: &str, _etag: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _etag: &str, _value: &[u8]) {}
}

/// Cache used when caching is disabled (`--no-cache`).
pub struct NullCache;

impl Cache for NullCache {
    fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
        Box::new(NullCacheBucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_cache_never_hits() {
        let bucket = NullCache.bucket("typeset");

        bucket.set("key", "typst", b"<svg/>");

        assert_eq!(bucket.get("key", "typst"), None);
        assert_eq!(bucket.get("key", ""), None);
    }
}
