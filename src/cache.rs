//! Content-addressed cache of synthesized responses
//!
//! Maps normalized reply text to an audio artifact on disk, so repeated
//! replies are played straight from the cache instead of being resynthesized.
//! Entries are never evicted: the same phrase keeps its first synthesized
//! audio until someone deletes the cache directory by hand, even if the
//! active voice changes between runs.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// File extension of cached artifacts
const ARTIFACT_EXT: &str = "mp3";

/// Disk cache keyed by a digest of the normalized reply text
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    /// Create a cache rooted at `dir`
    ///
    /// The directory is created lazily on the first `store`.
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Compute the cache key for a piece of text
    ///
    /// Normalizes by trimming whitespace and lower-casing, then hashes, so
    /// case and padding variants of the same reply share one entry.
    #[must_use]
    pub fn key_for(text: &str) -> String {
        let normalized = text.trim().to_lowercase();
        let digest = Sha256::digest(normalized.as_bytes());
        hex::encode(digest)
    }

    /// Look up a cached artifact by digest
    ///
    /// Returns the artifact path if an entry exists; no side effects.
    #[must_use]
    pub fn lookup(&self, digest: &str) -> Option<PathBuf> {
        let path = self.entry_path(digest);
        path.is_file().then_some(path)
    }

    /// Store an artifact under a digest, overwriting any previous entry
    ///
    /// Best-effort: caching is an optimization, so failures are logged and
    /// swallowed rather than surfaced to the caller.
    pub fn store(&self, digest: &str, artifact: &Path) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), error = %e, "failed to create cache dir");
            return;
        }

        let dest = self.entry_path(digest);
        match std::fs::copy(artifact, &dest) {
            Ok(_) => {
                tracing::debug!(path = %dest.display(), "cached response audio");
            }
            Err(e) => {
                tracing::warn!(path = %dest.display(), error = %e, "failed to cache response audio");
            }
        }
    }

    /// Path an entry for `digest` would live at
    #[must_use]
    pub fn entry_path(&self, digest: &str) -> PathBuf {
        self.dir.join(format!("cached_{digest}.{ARTIFACT_EXT}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache() -> (tempfile::TempDir, ResponseCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path().join("tts"));
        (dir, cache)
    }

    #[test]
    fn key_is_deterministic_over_case_and_whitespace() {
        let base = ResponseCache::key_for("Xin chào bạn");
        assert_eq!(ResponseCache::key_for("  xin chào bạn  "), base);
        assert_eq!(ResponseCache::key_for("XIN CHÀO BẠN"), base);
        assert_eq!(ResponseCache::key_for("xin chào bạn"), base);
    }

    #[test]
    fn key_distinguishes_different_text() {
        assert_ne!(
            ResponseCache::key_for("hello"),
            ResponseCache::key_for("goodbye")
        );
    }

    #[test]
    fn key_matches_normalized_self() {
        let text = "  Mixed CASE with spaces  ";
        assert_eq!(
            ResponseCache::key_for(text),
            ResponseCache::key_for(&text.trim().to_lowercase())
        );
    }

    #[test]
    fn lookup_misses_before_store() {
        let (_dir, cache) = temp_cache();
        assert!(cache.lookup(&ResponseCache::key_for("anything")).is_none());
    }

    #[test]
    fn store_then_lookup_roundtrip() {
        let (dir, cache) = temp_cache();

        let artifact = dir.path().join("out.mp3");
        std::fs::write(&artifact, b"fake mp3 bytes").unwrap();

        let key = ResponseCache::key_for("hello");
        cache.store(&key, &artifact);

        let found = cache.lookup(&key).expect("entry after store");
        assert_eq!(std::fs::read(found).unwrap(), b"fake mp3 bytes");
    }

    #[test]
    fn store_overwrites_previous_entry() {
        let (dir, cache) = temp_cache();
        let key = ResponseCache::key_for("hello");

        let first = dir.path().join("a.mp3");
        std::fs::write(&first, b"first").unwrap();
        cache.store(&key, &first);

        let second = dir.path().join("b.mp3");
        std::fs::write(&second, b"second").unwrap();
        cache.store(&key, &second);

        let found = cache.lookup(&key).unwrap();
        assert_eq!(std::fs::read(found).unwrap(), b"second");
    }

    #[test]
    fn store_of_missing_artifact_is_swallowed() {
        let (dir, cache) = temp_cache();
        let key = ResponseCache::key_for("hello");

        // Source file does not exist; store must not panic or error out
        cache.store(&key, &dir.path().join("nope.mp3"));
        assert!(cache.lookup(&key).is_none());
    }

    #[test]
    fn entries_accumulate_without_eviction() {
        let (dir, cache) = temp_cache();

        let artifact = dir.path().join("out.mp3");
        std::fs::write(&artifact, b"audio").unwrap();

        for i in 0..16 {
            cache.store(&ResponseCache::key_for(&format!("reply {i}")), &artifact);
        }

        for i in 0..16 {
            assert!(
                cache
                    .lookup(&ResponseCache::key_for(&format!("reply {i}")))
                    .is_some()
            );
        }
    }
}
