//! Local filesystem Storage implementation for host tooling and tests.
//!
//! `LocalFileStorage` implements `platform::Storage` using `std::fs`.
//! Card paths such as `/audiobooks/x.m4b` are resolved relative to the
//! `card_root` provided at construction, so a folder on the host can stand
//! in for the SD card.

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::storage::{DirEntry, NameBuf, Storage};

/// Error type for local filesystem operations.
#[derive(Debug, thiserror::Error)]
#[error("local storage error: {0}")]
pub struct LocalStorageError(#[from] pub std::io::Error);

/// A `platform::Storage` implementation backed by `std::fs`.
///
/// # Example
/// ```no_run
/// # async fn example() {
/// use platform::storage_local::LocalFileStorage;
/// use platform::Storage;
/// let mut storage = LocalFileStorage::new("/media/sdcard");
/// let present = storage.exists("/audiobooks/.metacache").await.unwrap();
/// # }
/// ```
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    /// Create a new storage rooted at `card_root`.
    #[must_use]
    pub fn new(card_root: &str) -> Self {
        Self {
            root: PathBuf::from(card_root),
        }
    }

    /// Create from the `MESHDECK_CARD` environment variable.
    ///
    /// Returns `None` if `MESHDECK_CARD` is not set or is not valid UTF-8.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        std::env::var("MESHDECK_CARD").ok().map(|p| Self::new(&p))
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Storage for LocalFileStorage {
    type Error = LocalStorageError;

    async fn read_at(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut file = fs::File::open(self.resolve(path))?;
        file.seek(SeekFrom::Start(offset))?;
        let mut total = 0;
        while let Some(rest) = buf.get_mut(total..) {
            if rest.is_empty() {
                break;
            }
            let n = file.read(rest)?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    async fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), Self::Error> {
        fs::write(self.resolve(path), data)?;
        Ok(())
    }

    async fn append(&mut self, path: &str, data: &[u8]) -> Result<(), Self::Error> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.resolve(path))?;
        file.write_all(data)?;
        Ok(())
    }

    async fn remove(&mut self, path: &str) -> Result<(), Self::Error> {
        fs::remove_file(self.resolve(path))?;
        Ok(())
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<(), Self::Error> {
        fs::rename(self.resolve(from), self.resolve(to))?;
        Ok(())
    }

    async fn exists(&mut self, path: &str) -> Result<bool, Self::Error> {
        Ok(self.resolve(path).exists())
    }

    async fn file_size(&mut self, path: &str) -> Result<Option<u64>, Self::Error> {
        match fs::metadata(self.resolve(path)) {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_dir(&mut self, path: &str) -> Result<(), Self::Error> {
        fs::create_dir_all(self.resolve(path))?;
        Ok(())
    }

    async fn list_dir<F>(&mut self, path: &str, mut visit: F) -> Result<(), Self::Error>
    where
        F: FnMut(&DirEntry),
    {
        let mut entries: Vec<_> = fs::read_dir(self.resolve(path))?.collect::<Result<_, _>>()?;
        // FAT directory order is creation order; sort for reproducible listings.
        entries.sort_by_key(std::fs::DirEntry::file_name);
        for entry in entries {
            let meta = entry.metadata()?;
            let Some(name) = entry.file_name().to_str().and_then(|n| NameBuf::try_from(n).ok()) else {
                continue;
            };
            visit(&DirEntry {
                name,
                size: if meta.is_dir() { 0 } else { meta.len() },
                is_dir: meta.is_dir(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use std::fs;
    use tempfile::TempDir;

    fn storage(tmp: &TempDir) -> LocalFileStorage {
        LocalFileStorage::new(tmp.path().to_str().unwrap())
    }

    #[tokio::test]
    async fn local_storage_read_full_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("test.bin"), b"hello world").unwrap();
        let mut buf = [0u8; 32];
        let n = storage(&tmp).read_at("/test.bin", 0, &mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello world");
    }

    #[tokio::test]
    async fn local_storage_read_at_offset() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("seek.bin"), b"ABCDEFGH").unwrap();
        let mut buf = [0u8; 4];
        let n = storage(&tmp).read_at("seek.bin", 4, &mut buf).await.unwrap();
        assert_eq!(n, 4);
        assert_eq!(&buf, b"EFGH");
    }

    #[tokio::test]
    async fn local_storage_size_matches() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("size.bin"), [0u8; 64]).unwrap();
        let mut s = storage(&tmp);
        assert_eq!(s.file_size("/size.bin").await.unwrap(), Some(64));
        assert_eq!(s.file_size("/missing.bin").await.unwrap(), None);
    }

    #[tokio::test]
    async fn local_storage_write_append_rename_remove() {
        let tmp = TempDir::new().unwrap();
        let mut s = storage(&tmp);
        s.create_dir("/notes").await.unwrap();
        s.write_file("/notes/a.txt", b"one").await.unwrap();
        s.append("/notes/a.txt", b" two").await.unwrap();
        s.rename("/notes/a.txt", "/notes/b.txt").await.unwrap();
        assert!(!s.exists("/notes/a.txt").await.unwrap());
        assert_eq!(fs::read(tmp.path().join("notes/b.txt")).unwrap(), b"one two");
        s.remove("/notes/b.txt").await.unwrap();
        assert!(!s.exists("/notes/b.txt").await.unwrap());
    }

    #[tokio::test]
    async fn local_storage_list_dir_reports_dirs_and_sizes() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("Dune")).unwrap();
        fs::write(tmp.path().join("b.mp3"), [0u8; 10]).unwrap();
        let mut seen = Vec::new();
        storage(&tmp)
            .list_dir("/", |e| seen.push((e.name.to_string(), e.size, e.is_dir)))
            .await
            .unwrap();
        assert_eq!(seen, vec![("Dune".into(), 0, true), ("b.mp3".into(), 10, false)]);
    }
}
