//! Flat-file cache of already-notified offer links.
//!
//! One link per line, no header. The file handle is opened when the cache
//! is opened and held until [`OfferCache::close`]; nothing is written
//! between those points except by [`OfferCache::flush`].

use std::collections::HashSet;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::error::{AppError, Result};

/// Ordered, duplicate-free set of known offer links backed by a file.
#[derive(Debug)]
pub struct OfferCache {
    path: PathBuf,
    links: Vec<String>,
    index: HashSet<String>,
    file: File,
}

impl OfferCache {
    /// Open the cache at `path`.
    ///
    /// With `purge` the file is truncated and the known-set starts empty.
    /// Otherwise every non-empty line becomes a known link; a missing or
    /// unreadable file yields an empty known-set.
    pub async fn open(path: impl Into<PathBuf>, purge: bool) -> Result<Self> {
        let path = path.into();

        let cache_links = if purge {
            log::info!("Purging offer cache {}", path.display());
            Vec::new()
        } else {
            Self::read_known(&path).await
        };

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(purge)
            .open(&path)
            .await
            .map_err(|e| AppError::store_io(&path, e))?;

        let mut cache = Self {
            path,
            links: Vec::with_capacity(cache_links.len()),
            index: HashSet::with_capacity(cache_links.len()),
            file,
        };
        for link in cache_links {
            cache.add(link);
        }

        log::debug!(
            "Opened offer cache {} with {} known offers",
            cache.path.display(),
            cache.len()
        );
        Ok(cache)
    }

    /// Read the known links stored at `path` without opening the cache.
    ///
    /// Missing or unreadable files yield an empty list.
    pub async fn read_known(path: &Path) -> Vec<String> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => content
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No offer cache at {}, starting empty", path.display());
                Vec::new()
            }
            Err(e) => {
                log::warn!(
                    "Offer cache {} unreadable ({}), starting empty",
                    path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Whether `link` is already known. No I/O.
    pub fn exists(&self, link: &str) -> bool {
        self.index.contains(link)
    }

    /// Record `link` as known. Returns `false` if it already was.
    pub fn add(&mut self, link: impl Into<String>) -> bool {
        let link = link.into();
        if self.index.contains(&link) {
            return false;
        }
        self.index.insert(link.clone());
        self.links.push(link);
        true
    }

    /// Known links in insertion order.
    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole known-set to the held file, one link per line.
    ///
    /// The file is rewritten from the start and truncated to the written
    /// length, so repeated flushes leave the same contents.
    pub async fn flush(&mut self) -> Result<()> {
        let mut buf = String::with_capacity(self.links.iter().map(|l| l.len() + 1).sum());
        for link in &self.links {
            buf.push_str(link);
            buf.push('\n');
        }

        self.write_all(buf.as_bytes())
            .await
            .map_err(|e| AppError::store_io(&self.path, e))?;

        log::info!(
            "Flushed {} known offers to {}",
            self.links.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(0)).await?;
        self.file.write_all(bytes).await?;
        self.file.flush().await?;
        self.file.set_len(bytes.len() as u64).await?;
        self.file.sync_all().await
    }

    /// Release the file handle.
    pub async fn close(mut self) -> Result<()> {
        self.file
            .flush()
            .await
            .map_err(|e| AppError::store_io(&self.path, e))?;
        log::debug!("Closed offer cache {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache_path(tmp: &TempDir) -> PathBuf {
        tmp.path().join("offers.dat")
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let cache = OfferCache::open(cache_path(&tmp), false).await.unwrap();
        assert!(cache.is_empty());
        cache.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_reads_lines() {
        let tmp = TempDir::new().unwrap();
        let path = cache_path(&tmp);
        std::fs::write(&path, "/a\n\n/b\r\n/a\n/c").unwrap();

        let cache = OfferCache::open(&path, false).await.unwrap();
        assert_eq!(cache.links(), ["/a", "/b", "/c"]);
        cache.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_read_known_does_not_create_file() {
        let tmp = TempDir::new().unwrap();
        let path = cache_path(&tmp);

        assert!(OfferCache::read_known(&path).await.is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_add_rejects_duplicates() {
        let tmp = TempDir::new().unwrap();
        let mut cache = OfferCache::open(cache_path(&tmp), false).await.unwrap();

        assert!(cache.add("/a"));
        assert!(!cache.add("/a"));
        assert!(cache.add("/b"));
        assert!(cache.exists("/a"));
        assert!(!cache.exists("/c"));
        assert_eq!(cache.len(), 2);
        cache.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_add_does_not_touch_disk() {
        let tmp = TempDir::new().unwrap();
        let path = cache_path(&tmp);
        std::fs::write(&path, "/a\n").unwrap();

        let mut cache = OfferCache::open(&path, false).await.unwrap();
        cache.add("/b");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "/a\n");
        cache.close().await.unwrap();

        // Never flushed: the file keeps its previous contents.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "/a\n");
    }

    #[tokio::test]
    async fn test_flush_and_reopen_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = cache_path(&tmp);

        let mut cache = OfferCache::open(&path, false).await.unwrap();
        for link in ["A", "B", "C"] {
            cache.add(link);
        }
        cache.flush().await.unwrap();
        cache.close().await.unwrap();

        let reopened = OfferCache::open(&path, false).await.unwrap();
        assert!(reopened.exists("A"));
        assert!(reopened.exists("B"));
        assert!(reopened.exists("C"));
        assert_eq!(reopened.links(), ["A", "B", "C"]);
        reopened.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_double_flush_does_not_duplicate() {
        let tmp = TempDir::new().unwrap();
        let path = cache_path(&tmp);

        let mut cache = OfferCache::open(&path, false).await.unwrap();
        cache.add("/a");
        cache.add("/b");
        cache.flush().await.unwrap();
        cache.flush().await.unwrap();
        cache.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "/a\n/b\n");
    }

    #[tokio::test]
    async fn test_flush_shrinks_file() {
        let tmp = TempDir::new().unwrap();
        let path = cache_path(&tmp);
        std::fs::write(&path, "/a-very-long-link-that-was-known-before\n").unwrap();

        let mut cache = OfferCache::open(&path, true).await.unwrap();
        cache.add("/x");
        cache.flush().await.unwrap();
        cache.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "/x\n");
    }

    #[tokio::test]
    async fn test_purge_resets_state() {
        let tmp = TempDir::new().unwrap();
        let path = cache_path(&tmp);
        std::fs::write(&path, "A\nB\n").unwrap();

        let mut cache = OfferCache::open(&path, true).await.unwrap();
        assert!(cache.is_empty());
        assert!(!cache.exists("A"));
        cache.flush().await.unwrap();
        cache.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[tokio::test]
    async fn test_open_fails_for_unwritable_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing-dir").join("offers.dat");

        let err = OfferCache::open(&path, false).await.unwrap_err();
        assert!(matches!(err, AppError::StoreIo { .. }));
    }
}
