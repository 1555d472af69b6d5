//! File-based cache implementation.
//!
//! [`FileCache`] stores cache entries as files on disk, organized into buckets
//! (subdirectories). Entry file names are the hex SHA-256 of the key, so keys
//! containing slashes or query strings (e.g. `content-/wp-content/uploads/a.pdf`)
//! map to a single flat file. Each entry is a binary header followed by the data:
//!
//! ```text
//! [expires_at: u64 LE][data bytes]
//! ```
//!
//! `expires_at` is a Unix timestamp in seconds, `0` for entries without a TTL.
//! Entries are written to a temporary file in the bucket directory and renamed
//! into place, so concurrent readers never see a partially written entry.
//!
//! On construction, [`FileCache`] validates a `VERSION` file in the cache root.
//! If the version mismatches or is missing, the entire cache directory is wiped
//! and recreated.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::{Cache, CacheBucket, expiry_from_ttl, is_expired};

/// File-based [`Cache`] rooted at a directory on disk.
///
/// Directory layout:
/// ```text
/// {root}/
/// +-- VERSION            # contains the cache format version
/// +-- indicators/        # bucket "indicators"
/// |   +-- 3f2a...        # cache entry (sha256 of the key)
/// +-- publications/      # bucket "publications"
///     +-- ...
/// ```
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Create a new file-based cache at `root`, validating the cache version.
    ///
    /// If the `VERSION` file inside `root` does not match `version`, the entire
    /// cache directory is removed and recreated with the new version. Errors
    /// during validation are logged but never fatal.
    #[must_use]
    pub fn new(root: PathBuf, version: &str) -> Self {
        validate_version(&root, version);
        Self { root }
    }
}

impl Cache for FileCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(FileCacheBucket {
            dir: self.root.join(name),
        })
    }
}

/// A single bucket backed by a directory on disk.
struct FileCacheBucket {
    dir: PathBuf,
}

impl FileCacheBucket {
    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(hex::encode(Sha256::digest(key.as_bytes())))
    }
}

impl CacheBucket for FileCacheBucket {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(key);
        let mut file = File::open(&path).ok()?;

        let mut expiry_buf = [0u8; 8];
        file.read_exact(&mut expiry_buf).ok()?;
        if is_expired(u64::from_le_bytes(expiry_buf)) {
            tracing::debug!(key, "cache entry expired");
            return None;
        }

        let mut data = Vec::new();
        file.read_to_end(&mut data).ok()?;
        Some(data)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            tracing::warn!(error = %e, "failed to create cache bucket directory");
            return;
        }

        let write = || -> std::io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&self.dir)?;
            tmp.write_all(&expiry_from_ttl(ttl).to_le_bytes())?;
            tmp.write_all(value)?;
            tmp.persist(self.entry_path(key))?;
            Ok(())
        };
        if let Err(e) = write() {
            tracing::warn!(key, error = %e, "failed to write cache entry");
        }
    }

    fn remove(&self, key: &str) {
        let path = self.entry_path(key);
        if let Err(e) = fs::remove_file(&path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(key, error = %e, "failed to remove cache entry");
        }
    }

    fn clear(&self) {
        if self.dir.exists()
            && let Err(e) = fs::remove_dir_all(&self.dir)
        {
            tracing::warn!(error = %e, "failed to clear cache bucket");
        }
    }
}

/// Validate the cache version, wiping the directory on mismatch.
fn validate_version(root: &Path, version: &str) {
    let version_file = root.join("VERSION");

    match fs::read_to_string(&version_file) {
        Ok(stored) if stored == version => {
            tracing::debug!("cache version matches: {version}");
            return;
        }
        Ok(stored) => {
            tracing::info!(
                "cache version mismatch (stored={stored}, current={version}), wiping cache"
            );
        }
        Err(_) => {
            tracing::info!("no cache VERSION file found, initializing cache");
        }
    }

    if root.exists()
        && let Err(e) = fs::remove_dir_all(root)
    {
        tracing::warn!("failed to remove cache directory: {e}");
    }
    if let Err(e) = fs::create_dir_all(root) {
        tracing::warn!("failed to create cache directory: {e}");
        return;
    }
    if let Err(e) = fs::write(&version_file, version) {
        tracing::warn!("failed to write cache VERSION file: {e}");
    }
}
