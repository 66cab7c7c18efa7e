//! Per-account cache of processed message fingerprints.
//!
//! The cache is a JSON object mapping fingerprint to the date the message was
//! first processed (`YYYY-MM-DD`). It is loaded once when an account starts,
//! mutated in memory and flushed once when the account finishes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tokio::fs;

use super::Fingerprint;
use crate::error_handling::CacheIoError;
use crate::utils::write_atomic;

/// Storage format of the first-seen date
const CACHE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Processed-message cache of one account.
#[derive(Debug, Clone)]
pub struct FingerprintCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FingerprintCache {
    /// Location of an account's cache inside `cache_dir`.
    pub fn path_for(cache_dir: &Path, account: &str) -> PathBuf {
        cache_dir.join(format!("{account}_processed.json"))
    }

    /// An empty cache that will be flushed to `path`.
    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            entries: BTreeMap::new(),
        }
    }

    /// Loads the cache at `path`; a missing file is an empty cache.
    ///
    /// # Errors
    ///
    /// Returns a `CacheIoError` if the file exists but cannot be read or is not
    /// a fingerprint → date mapping.
    pub async fn try_load(path: PathBuf) -> Result<Self, CacheIoError> {
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::empty(path)),
            Err(source) => return Err(CacheIoError::Io { path, source }),
        };
        if content.trim().is_empty() {
            return Ok(Self::empty(path));
        }
        match serde_json::from_str(&content) {
            Ok(entries) => Ok(Self { path, entries }),
            Err(source) => Err(CacheIoError::Corrupt { path, source }),
        }
    }

    /// Loads the cache at `path`, falling back to an empty cache if it is
    /// unreadable or corrupt.
    pub async fn load(path: PathBuf) -> Self {
        match Self::try_load(path.clone()).await {
            Ok(cache) => cache,
            Err(e) => {
                log::error!("{e}; starting with an empty cache");
                Self::empty(path)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the message with `fingerprint` was processed before.
    pub fn seen(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains_key(fingerprint.as_str())
    }

    /// Records `fingerprint` as processed on `date`; an existing entry keeps
    /// its original date.
    pub fn record(&mut self, fingerprint: &Fingerprint, date: NaiveDate) {
        self.entries
            .entry(fingerprint.as_str().to_string())
            .or_insert_with(|| date.format(CACHE_DATE_FORMAT).to_string());
    }

    /// Drops entries first seen before `older_than` (entries with an
    /// unreadable date are dropped too). Returns the number removed.
    pub fn prune(&mut self, older_than: NaiveDate) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, date| {
            NaiveDate::parse_from_str(date, CACHE_DATE_FORMAT).is_ok_and(|d| d >= older_than)
        });
        before - self.entries.len()
    }

    /// Drops entries first seen on `date`. Returns the number removed.
    pub fn remove_date(&mut self, date: NaiveDate) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, seen| {
            NaiveDate::parse_from_str(seen, CACHE_DATE_FORMAT).map_or(true, |d| d != date)
        });
        before - self.entries.len()
    }

    /// Writes the cache back to its file atomically.
    ///
    /// # Errors
    ///
    /// Returns `CacheIoError::Io` if the file cannot be written.
    pub async fn flush(&self) -> Result<(), CacheIoError> {
        let json = serde_json::to_vec_pretty(&self.entries).map_err(|source| {
            CacheIoError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        write_atomic(&self.path, &json)
            .await
            .map_err(|source| CacheIoError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn fp(value: &str) -> Fingerprint {
        Fingerprint::from(value.to_string())
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let cache = FingerprintCache::try_load(dir.path().join("acct_processed.json"))
            .await
            .expect("missing file is not an error");
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_flush_and_reload_round_trip() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = FingerprintCache::path_for(&dir.path().join("cache"), "acct1");
        assert!(path.ends_with("cache/acct1_processed.json"));

        let mut cache = FingerprintCache::empty(path.clone());
        cache.record(&fp("aa"), date(2026, 2, 10));
        cache.record(&fp("bb"), date(2026, 2, 9));
        cache.flush().await.expect("flush");

        let reloaded = FingerprintCache::try_load(path.clone()).await.expect("reload");
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.seen(&fp("aa")));
        assert!(!reloaded.seen(&fp("cc")));

        let raw = std::fs::read_to_string(&path).expect("read cache");
        assert!(raw.contains("\"aa\": \"2026-02-10\""));
    }

    #[test]
    fn test_record_keeps_first_seen_date() {
        let mut cache = FingerprintCache::empty(PathBuf::from("unused.json"));
        cache.record(&fp("aa"), date(2026, 2, 1));
        cache.record(&fp("aa"), date(2026, 2, 10));
        assert_eq!(cache.remove_date(date(2026, 2, 10)), 0);
        assert_eq!(cache.remove_date(date(2026, 2, 1)), 1);
    }

    #[test]
    fn test_prune_drops_out_of_window_entries() {
        let mut cache = FingerprintCache::empty(PathBuf::from("unused.json"));
        cache.record(&fp("old"), date(2026, 1, 1));
        cache.record(&fp("edge"), date(2026, 1, 11));
        cache.record(&fp("new"), date(2026, 2, 10));

        let removed = cache.prune(date(2026, 1, 11));

        assert_eq!(removed, 1);
        assert!(!cache.seen(&fp("old")));
        assert!(cache.seen(&fp("edge")));
        assert!(cache.seen(&fp("new")));
    }

    #[test]
    fn test_remove_date() {
        let mut cache = FingerprintCache::empty(PathBuf::from("unused.json"));
        cache.record(&fp("a"), date(2026, 2, 10));
        cache.record(&fp("b"), date(2026, 2, 10));
        cache.record(&fp("c"), date(2026, 2, 9));

        assert_eq!(cache.remove_date(date(2026, 2, 10)), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.seen(&fp("c")));
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_reported_and_replaced() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("acct_processed.json");
        std::fs::write(&path, "{not json").expect("write corrupt cache");

        let err = FingerprintCache::try_load(path.clone())
            .await
            .expect_err("corrupt cache must be reported");
        assert!(matches!(err, CacheIoError::Corrupt { .. }));

        let cache = FingerprintCache::load(path).await;
        assert!(cache.is_empty());
    }
}
