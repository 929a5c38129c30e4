//! Asset stat cache with time-based invalidation.
//!
//! Rewriting a large site touches the same handful of assets from many
//! documents. The cache keys on the resolved filesystem path and hands out
//! shared entries, so an asset is statted once per TTL window and its
//! content hash is computed at most once per entry, on first access.
//!
//! The cache is an explicitly constructed component passed into the
//! engine, never a hidden singleton, so tests can use an isolated
//! instance per case.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::StatError;

/// Filesystem metadata captured for a static asset.
#[derive(Debug, Clone)]
pub struct StatSnapshot {
    /// File size in bytes.
    pub size: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<SystemTime>,
    /// Creation time, when the platform reports one.
    pub created: Option<SystemTime>,
    /// Inode number on unix platforms, zero elsewhere.
    pub inode: u64,
}

/// A cached stat result for one resolved asset path.
///
/// The entry captures either a [`StatSnapshot`] or the error the stat
/// produced. The content hash is lazy: nothing reads the file until
/// [`StatEntry::hash`] is called, and the result (success or failure) is
/// memoized so concurrent first accesses share a single read.
#[derive(Debug)]
pub struct StatEntry {
    path: PathBuf,
    snapshot: Result<StatSnapshot, StatError>,
    hash: OnceLock<Result<u64, StatError>>,
    created: Instant,
}

impl StatEntry {
    fn capture(path: PathBuf) -> Self {
        let snapshot = match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(StatSnapshot {
                size: meta.len(),
                modified: meta.modified().ok(),
                created: meta.created().ok(),
                inode: inode_of(&meta),
            }),
            Ok(_) => Err(StatError::NotFile { path: path.clone() }),
            Err(err) => Err(StatError::Stat {
                path: path.clone(),
                message: err.to_string(),
            }),
        };

        if let Err(err) = &snapshot {
            log::warn!("{err}");
        }

        Self {
            path,
            snapshot,
            hash: OnceLock::new(),
            created: Instant::now(),
        }
    }

    /// Resolved filesystem path this entry describes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The captured metadata, if the stat succeeded.
    pub fn snapshot(&self) -> Option<&StatSnapshot> {
        self.snapshot.as_ref().ok()
    }

    /// The captured stat error, if the stat failed.
    pub fn error(&self) -> Option<&StatError> {
        self.snapshot.as_ref().err()
    }

    /// Whether the stat found a regular file.
    pub fn exists(&self) -> bool {
        self.snapshot.is_ok()
    }

    /// Content hash of the asset, computed on first access and memoized.
    ///
    /// If the underlying stat failed, this returns the original stat error
    /// without touching the filesystem again. Concurrent first calls for
    /// the same entry share one file read.
    pub fn hash(&self) -> Result<u64, StatError> {
        self.hash
            .get_or_init(|| {
                self.snapshot.as_ref().map_err(Clone::clone)?;
                let contents = fs::read(&self.path).map_err(|err| StatError::Read {
                    path: self.path.clone(),
                    message: err.to_string(),
                })?;
                Ok(xxh3_64(&contents))
            })
            .clone()
    }

    /// Age of this entry since it was captured.
    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }
}

#[cfg(unix)]
fn inode_of(meta: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

#[cfg(not(unix))]
fn inode_of(_meta: &fs::Metadata) -> u64 {
    0
}

/// Process-wide cache of [`StatEntry`] values keyed by resolved path.
///
/// Entries are replaced whole once their age exceeds the caller's TTL;
/// fields are never refreshed incrementally, so a half-updated entry is
/// never observed. The cache tolerates concurrent use from parallel
/// document passes.
#[derive(Debug, Default)]
pub struct StatCache {
    entries: Mutex<HashMap<PathBuf, Arc<StatEntry>>>,
}

impl StatCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stats for the asset a root-relative URL points at.
    ///
    /// The URL is resolved against `base` (the project root of the
    /// document that referenced it) to form the cache key. Within `ttl`
    /// of the original stat, every call returns the identical entry with
    /// no filesystem traffic; after expiry the entry is re-captured and
    /// replaced.
    pub fn stats_for(&self, absolute_url: &str, base: &Path, ttl: Duration) -> Arc<StatEntry> {
        let path = base.join(absolute_url.trim_start_matches('/'));

        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(&path) {
            if entry.age() <= ttl {
                return Arc::clone(entry);
            }
        }

        // the stat runs under the lock so two passes asking for the same
        // expired key cannot both hit the filesystem
        let entry = Arc::new(StatEntry::capture(path.clone()));
        entries.insert(path, Arc::clone(&entry));
        entry
    }

    /// Number of cached entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const TTL: Duration = Duration::from_secs(5);

    #[test]
    fn caches_entries_within_ttl() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("app.js"), "console.log(1);").unwrap();

        let cache = StatCache::new();
        let first = cache.stats_for("/app.js", dir.path(), TTL);
        let second = cache.stats_for("/app.js", dir.path(), TTL);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_entries_are_replaced_whole() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.js");
        fs::write(&path, "one").unwrap();

        let cache = StatCache::new();
        let first = cache.stats_for("/app.js", dir.path(), Duration::ZERO);
        fs::write(&path, "two-longer").unwrap();
        let second = cache.stats_for("/app.js", dir.path(), Duration::ZERO);

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.snapshot().unwrap().size, 3);
        assert_eq!(second.snapshot().unwrap().size, 10);
    }

    #[test]
    fn hash_is_memoized_per_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pic.png");
        fs::write(&path, b"image bytes").unwrap();

        let cache = StatCache::new();
        let entry = cache.stats_for("/pic.png", dir.path(), TTL);
        let first = entry.hash().unwrap();

        // rewriting the file does not change the memoized hash
        fs::write(&path, b"different").unwrap();
        assert_eq!(entry.hash().unwrap(), first);
    }

    #[test]
    fn stat_error_is_deferred_until_hash_access() {
        let dir = tempdir().unwrap();

        let cache = StatCache::new();
        let entry = cache.stats_for("/missing.css", dir.path(), TTL);

        assert!(!entry.exists());
        assert!(entry.snapshot().is_none());
        let err = entry.hash().unwrap_err();
        assert!(matches!(err, StatError::Stat { .. }));
        // the same captured error comes back on every access
        assert!(entry.hash().is_err());
    }

    #[test]
    fn directories_are_not_assets() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("img")).unwrap();

        let cache = StatCache::new();
        let entry = cache.stats_for("/img", dir.path(), TTL);
        assert!(matches!(entry.hash().unwrap_err(), StatError::NotFile { .. }));
    }

    #[test]
    fn concurrent_access_shares_entries() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("site.css"), "body{}").unwrap();

        let cache = Arc::new(StatCache::new());
        let mut hashes = Vec::new();
        std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for _ in 0..4 {
                let cache = Arc::clone(&cache);
                let base = dir.path();
                handles.push(
                    scope.spawn(move || cache.stats_for("/site.css", base, TTL).hash().unwrap()),
                );
            }
            for handle in handles {
                hashes.push(handle.join().unwrap());
            }
        });

        assert!(hashes.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(cache.len(), 1);
    }
}
