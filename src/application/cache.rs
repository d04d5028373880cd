use crate::domain::media::{CacheEntry, FetchResult};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

struct Lru {
    capacity: usize,
    entries: HashMap<String, CacheEntry>,
    /// Least recently used at the front
    order: VecDeque<String>,
}

impl Lru {
    fn touch(&mut self, url: &str) {
        if let Some(pos) = self.order.iter().position(|u| u == url) {
            if let Some(key) = self.order.remove(pos) {
                self.order.push_back(key);
            }
        }
    }
}

/// Process-local memo of successful runs, keyed by source URL.
pub struct ResultCache {
    inner: Mutex<Lru>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Lru {
                capacity: capacity.max(1),
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// A hit only if every referenced file still exists. Stale entries are
    /// left in place and age out normally.
    pub fn get(&self, url: &str) -> Option<FetchResult> {
        let mut lru = self.inner.lock();
        let result = lru.entries.get(url)?.hydrate(url);
        match &result {
            Some(_) => lru.touch(url),
            None => debug!(url, "Cached files are gone, treating as a miss"),
        }
        result
    }

    pub fn set(&self, url: &str, result: &FetchResult) {
        let mut lru = self.inner.lock();
        let entry = CacheEntry::from(result);
        if lru.entries.insert(url.to_string(), entry).is_some() {
            lru.touch(url);
            return;
        }
        lru.order.push_back(url.to_string());
        while lru.order.len() > lru.capacity {
            if let Some(evicted) = lru.order.pop_front() {
                lru.entries.remove(&evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Copy artifacts into the persisted cache directory. A same-named file
/// already there is kept as is and referenced instead.
pub async fn persist_artifacts(cache_dir: &Path, files: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(cache_dir).await?;
    let mut persisted = Vec::with_capacity(files.len());
    for file in files {
        let (dir, source) = (cache_dir.to_path_buf(), file.clone());
        let target = tokio::task::spawn_blocking(move || persist_one(&dir, &source))
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
        persisted.push(target);
    }
    Ok(persisted)
}

/// The copy is staged under a temporary name and linked into place, so the
/// final name only ever refers to a complete file.
fn persist_one(cache_dir: &Path, file: &Path) -> io::Result<PathBuf> {
    let name = file.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("{:?} has no file name", file))
    })?;
    let target = cache_dir.join(name);
    if target.try_exists()? {
        debug!(path = ?target, "Already persisted");
        return Ok(target);
    }

    let mut staged = tempfile::Builder::new()
        .prefix(".partial-")
        .tempfile_in(cache_dir)?;
    let mut source = File::open(file)?;
    io::copy(&mut source, staged.as_file_mut())?;
    staged.as_file().sync_all()?;

    match staged.persist_noclobber(&target) {
        Ok(_) => Ok(target),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            debug!(path = ?target, "Persisted by a concurrent run");
            Ok(target)
        }
        Err(e) => Err(e.error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::MediaKind;
    use tempfile::tempdir;

    fn video(dir: &Path, name: &str) -> FetchResult {
        let path = dir.join(name);
        std::fs::write(&path, name.as_bytes()).unwrap();
        let mut result = FetchResult::single("u", MediaKind::Video, path).with_title(Some(name.into()));
        result.width = Some(720);
        result.height = Some(1280);
        result
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::new(4);
        let mut result = video(dir.path(), "a.mp4");
        result.source_url = "https://x/a".into();
        cache.set("https://x/a", &result);
        assert_eq!(cache.get("https://x/a"), Some(result));
        assert_eq!(cache.get("https://x/other"), None);
    }

    #[test]
    fn test_missing_file_is_a_miss_not_an_eviction() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::new(4);
        let result = video(dir.path(), "a.mp4");
        cache.set("https://x/a", &result);
        std::fs::remove_file(&result.files[0]).unwrap();

        assert_eq!(cache.get("https://x/a"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::new(2);
        cache.set("a", &video(dir.path(), "a.mp4"));
        cache.set("b", &video(dir.path(), "b.mp4"));
        assert!(cache.get("a").is_some());
        cache.set("c", &video(dir.path(), "c.mp4"));

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_persist_never_overwrites() {
        let src = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        std::fs::write(cache_dir.path().join("clip.mp4"), b"old").unwrap();
        std::fs::write(src.path().join("clip.mp4"), b"new").unwrap();
        std::fs::write(src.path().join("other.mp4"), b"other").unwrap();

        let persisted = persist_artifacts(
            cache_dir.path(),
            &[src.path().join("clip.mp4"), src.path().join("other.mp4")],
        )
        .await
        .unwrap();
        assert_eq!(persisted[0], cache_dir.path().join("clip.mp4"));
        assert_eq!(std::fs::read(&persisted[0]).unwrap(), b"old");
        assert_eq!(std::fs::read(&persisted[1]).unwrap(), b"other");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_persist_only_exposes_complete_files() {
        let src = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        let file = src.path().join("clip.mp4");
        let bytes: Vec<u8> = (0..16 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        std::fs::write(&file, &bytes).unwrap();

        let runs: Vec<_> = (0..4)
            .map(|_| {
                let dir = cache_dir.path().to_path_buf();
                let files = vec![file.clone()];
                tokio::spawn(async move { persist_artifacts(&dir, &files).await })
            })
            .collect();
        for run in runs {
            let persisted = run.await.unwrap().unwrap();
            assert_eq!(persisted, vec![cache_dir.path().join("clip.mp4")]);
            let len = std::fs::metadata(&persisted[0]).unwrap().len();
            assert_eq!(len, bytes.len() as u64);
        }

        assert_eq!(std::fs::read(cache_dir.path().join("clip.mp4")).unwrap(), bytes);
        let names: Vec<_> = std::fs::read_dir(cache_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("clip.mp4")]);
    }
}
