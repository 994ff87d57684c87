//! Content-hash caching of typeset figures.

use quire_cache::{CacheBucket, CacheBucketExt};
use quire_renderer::{Figure, TypesetFailure, Typesetter};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Name of the cache bucket holding typeset figures.
pub const TYPESET_BUCKET: &str = "typeset";

/// Cache key for a fence: SHA-256 of `"{lang}:{source}"`, hex encoded.
#[must_use]
pub fn figure_key(lang: &str, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(lang.as_bytes());
    hasher.update(b":");
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Serialize, Deserialize)]
struct CachedFigure {
    ext: String,
    /// Hex-encoded figure bytes.
    data: String,
}

/// Wraps a [`Typesetter`] with a [`CacheBucket`].
///
/// Failures are never cached.
pub struct CachedTypesetter<T> {
    inner: T,
    cache: Box<dyn CacheBucket>,
}

impl<T: Typesetter> CachedTypesetter<T> {
    #[must_use]
    pub fn new(inner: T, cache: Box<dyn CacheBucket>) -> Self {
        Self { inner, cache }
    }
}

impl<T: Typesetter> Typesetter for CachedTypesetter<T> {
    fn supports(&self, lang: &str) -> bool {
        self.inner.supports(lang)
    }

    fn typeset(&self, lang: &str, source: &str) -> Result<Figure, TypesetFailure> {
        let key = figure_key(lang, source);

        if let Some(cached) = self.cache.get_json::<CachedFigure>(&key, "")
            && let Ok(bytes) = hex::decode(&cached.data)
        {
            tracing::debug!(lang, key = &key[..12], "typeset cache hit");
            return Ok(Figure {
                bytes,
                ext: cached.ext,
            });
        }

        let figure = self.inner.typeset(lang, source)?;
        self.cache.set_json(
            &key,
            "",
            &CachedFigure {
                ext: figure.ext.clone(),
                data: hex::encode(&figure.bytes),
            },
        );
        Ok(figure)
    }
}
