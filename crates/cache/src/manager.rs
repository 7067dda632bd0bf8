use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::digest::{digest_file, try_digest_file};
use crate::error::{CacheError, CacheResult};
use crate::path::{cache_key_for_file, default_cache_path};
use crate::snapshot::CacheSnapshot;

static GLOBAL_CACHE: Lazy<BuildCache> = Lazy::new(|| BuildCache::open(default_cache_path()));

/// Source-content cache deciding whether a native build can be skipped.
///
/// The mapping is loaded from disk on first use and never reloaded. Every read
/// and write of the mapping and of the backing file happens under one lock,
/// so concurrent `record_success` calls never lose an entry.
pub struct BuildCache {
    path: PathBuf,
    state: Mutex<Option<CacheSnapshot>>,
}

impl BuildCache {
    /// Cache backed by `path`. Nothing is read until the first query.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(None),
        }
    }

    /// Process-wide cache at `./.nativekit/hash.json`.
    pub fn global() -> &'static BuildCache {
        &GLOBAL_CACHE
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True only when `source` can be hashed and the digest equals the one
    /// recorded for it.
    pub fn should_skip(&self, source: &Path) -> bool {
        let Some(digest) = digest_file(source) else {
            debug!(source = %source.display(), "source not hashable, rebuilding");
            return false;
        };
        let key = cache_key_for_file(source);

        let mut state = self.state.lock();
        let snapshot = self.loaded(&mut state);
        let up_to_date = snapshot.get(&key) == Some(digest.as_str());
        debug!(source = %key, up_to_date, "cache lookup");
        up_to_date
    }

    /// Hashes `source` again and persists the new digest. The in-memory
    /// mapping only changes once the file has been written.
    pub fn record_success(&self, source: &Path) -> CacheResult<()> {
        let digest = try_digest_file(source).map_err(|err| CacheError::io(source, err))?;
        let key = cache_key_for_file(source);

        let mut state = self.state.lock();
        let snapshot = self.loaded(&mut state);
        debug!(source = %key, %digest, "recording build");
        let mut next = snapshot.clone();
        next.insert(key, digest);
        next.persist(&self.path)?;
        *snapshot = next;
        Ok(())
    }

    /// Drops the entry for `source`. Returns whether one existed.
    pub fn forget(&self, source: &Path) -> CacheResult<bool> {
        let key = cache_key_for_file(source);
        let mut state = self.state.lock();
        let snapshot = self.loaded(&mut state);
        let mut next = snapshot.clone();
        if next.remove(&key).is_none() {
            return Ok(false);
        }
        next.persist(&self.path)?;
        *snapshot = next;
        Ok(true)
    }

    /// Copy of the current mapping.
    pub fn entries(&self) -> CacheSnapshot {
        let mut state = self.state.lock();
        self.loaded(&mut state).clone()
    }

    fn loaded<'a>(&self, state: &'a mut Option<CacheSnapshot>) -> &'a mut CacheSnapshot {
        state.get_or_insert_with(|| self.initial_snapshot())
    }

    fn initial_snapshot(&self) -> CacheSnapshot {
        match CacheSnapshot::load(&self.path) {
            Ok(Some(snapshot)) => {
                debug!(path = %self.path.display(), entries = snapshot.len(), "loaded build cache");
                snapshot
            }
            Ok(None) => {
                let snapshot = CacheSnapshot::default();
                if let Err(err) = snapshot.persist(&self.path) {
                    warn!(path = %self.path.display(), error = %err, "could not create build cache file");
                }
                snapshot
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "discarding unreadable build cache");
                CacheSnapshot::default()
            }
        }
    }
}
