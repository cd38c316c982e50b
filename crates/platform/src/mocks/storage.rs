//! In-memory SD card.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::storage::{parent, DirEntry, NameBuf, Storage};

/// Operation kinds, for counters and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StorageOp {
    /// `read_at`
    Read,
    /// `write_file`
    Write,
    /// `append`
    Append,
    /// `remove`
    Remove,
    /// `rename`
    Rename,
    /// `exists`
    Exists,
    /// `file_size`
    Size,
    /// `create_dir`
    CreateDir,
    /// `list_dir`
    List,
}

/// Errors reported by [`MemStorage`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemError {
    /// Path (or its parent directory) does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Rename target already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// Failure armed with [`MemStorage::fail_next`].
    #[error("injected {0:?} failure")]
    Injected(StorageOp),
}

#[derive(Debug, Default)]
struct MemFs {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    counts: BTreeMap<StorageOp, usize>,
    fail_next: Option<StorageOp>,
    log: Vec<(StorageOp, String)>,
}

impl MemFs {
    fn begin(&mut self, op: StorageOp, path: &str) -> Result<(), MemError> {
        *self.counts.entry(op).or_default() += 1;
        self.log.push((op, path.to_string()));
        if self.fail_next == Some(op) {
            self.fail_next = None;
            return Err(MemError::Injected(op));
        }
        Ok(())
    }

    fn dir_exists(&self, dir: &str) -> bool {
        dir == "/" || dir.is_empty() || self.dirs.contains(dir)
    }

    fn require_parent(&self, path: &str) -> Result<(), MemError> {
        let dir = parent(path);
        if self.dir_exists(dir) {
            Ok(())
        } else {
            Err(MemError::NotFound(dir.to_string()))
        }
    }
}

/// SD card held in memory. Directories must exist before files are
/// written into them, like on FAT.
#[derive(Debug, Clone, Default)]
pub struct MemStorage {
    fs: Rc<RefCell<MemFs>>,
}

impl MemStorage {
    /// Empty card.
    pub fn new() -> Self {
        Self::default()
    }

    /// Test setup: create `path` with `data`, creating parent directories.
    pub fn insert(&self, path: &str, data: &[u8]) {
        self.mkdirs(parent(path));
        self.fs.borrow_mut().files.insert(path.to_string(), data.to_vec());
    }

    /// Test setup: create a directory and all its parents.
    pub fn mkdirs(&self, dir: &str) {
        let mut fs = self.fs.borrow_mut();
        let mut acc = String::new();
        for part in dir.split('/').filter(|p| !p.is_empty()) {
            acc.push('/');
            acc.push_str(part);
            fs.dirs.insert(acc.clone());
        }
    }

    /// Contents of `path`, if present.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.fs.borrow().files.get(path).cloned()
    }

    /// Contents of `path` as UTF-8.
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get(path).map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    /// `true` if a file exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.fs.borrow().files.contains_key(path)
    }

    /// All file paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.fs.borrow().files.keys().cloned().collect()
    }

    /// Number of times `op` was called.
    pub fn count(&self, op: StorageOp) -> usize {
        self.fs.borrow().counts.get(&op).copied().unwrap_or(0)
    }

    /// Calls of `op` whose path matched `path`.
    pub fn count_path(&self, op: StorageOp, path: &str) -> usize {
        self.fs
            .borrow()
            .log
            .iter()
            .filter(|(o, p)| *o == op && p == path)
            .count()
    }

    /// Reset all counters and the operation log.
    pub fn reset_counts(&self) {
        let mut fs = self.fs.borrow_mut();
        fs.counts.clear();
        fs.log.clear();
    }

    /// Make the next call of `op` fail.
    pub fn fail_next(&self, op: StorageOp) {
        self.fs.borrow_mut().fail_next = Some(op);
    }
}

impl Storage for MemStorage {
    type Error = MemError;

    async fn read_at(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> Result<usize, MemError> {
        let mut fs = self.fs.borrow_mut();
        fs.begin(StorageOp::Read, path)?;
        let data = fs
            .files
            .get(path)
            .ok_or_else(|| MemError::NotFound(path.to_string()))?;
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    async fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), MemError> {
        let mut fs = self.fs.borrow_mut();
        fs.begin(StorageOp::Write, path)?;
        fs.require_parent(path)?;
        fs.files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn append(&mut self, path: &str, data: &[u8]) -> Result<(), MemError> {
        let mut fs = self.fs.borrow_mut();
        fs.begin(StorageOp::Append, path)?;
        fs.require_parent(path)?;
        fs.files.entry(path.to_string()).or_default().extend_from_slice(data);
        Ok(())
    }

    async fn remove(&mut self, path: &str) -> Result<(), MemError> {
        let mut fs = self.fs.borrow_mut();
        fs.begin(StorageOp::Remove, path)?;
        fs.files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| MemError::NotFound(path.to_string()))
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<(), MemError> {
        let mut fs = self.fs.borrow_mut();
        fs.begin(StorageOp::Rename, from)?;
        if fs.files.contains_key(to) {
            return Err(MemError::AlreadyExists(to.to_string()));
        }
        fs.require_parent(to)?;
        let data = fs
            .files
            .remove(from)
            .ok_or_else(|| MemError::NotFound(from.to_string()))?;
        fs.files.insert(to.to_string(), data);
        Ok(())
    }

    async fn exists(&mut self, path: &str) -> Result<bool, MemError> {
        let mut fs = self.fs.borrow_mut();
        fs.begin(StorageOp::Exists, path)?;
        Ok(fs.files.contains_key(path) || fs.dirs.contains(path))
    }

    async fn file_size(&mut self, path: &str) -> Result<Option<u64>, MemError> {
        let mut fs = self.fs.borrow_mut();
        fs.begin(StorageOp::Size, path)?;
        Ok(fs.files.get(path).map(|d| d.len() as u64))
    }

    async fn create_dir(&mut self, path: &str) -> Result<(), MemError> {
        self.fs.borrow_mut().begin(StorageOp::CreateDir, path)?;
        self.mkdirs(path);
        Ok(())
    }

    async fn list_dir<F>(&mut self, path: &str, mut visit: F) -> Result<(), MemError>
    where
        F: FnMut(&DirEntry),
    {
        let entries: Vec<DirEntry> = {
            let mut fs = self.fs.borrow_mut();
            fs.begin(StorageOp::List, path)?;
            let dir = path.trim_end_matches('/');
            let dir = if dir.is_empty() { "/" } else { dir };
            if !fs.dir_exists(dir) {
                return Err(MemError::NotFound(path.to_string()));
            }
            let child = |p: &str| parent(p) == dir;
            let name_of = |p: &str| NameBuf::try_from(crate::storage::file_name(p)).ok();
            let dirs = fs.dirs.iter().filter(|d| child(d)).filter_map(|d| {
                name_of(d).map(|name| DirEntry {
                    name,
                    size: 0,
                    is_dir: true,
                })
            });
            let files = fs.files.iter().filter(|(p, _)| child(p)).filter_map(|(p, d)| {
                name_of(p).map(|name| DirEntry {
                    name,
                    size: d.len() as u64,
                    is_dir: false,
                })
            });
            dirs.chain(files).collect()
        };
        for entry in &entries {
            visit(entry);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_requires_parent_dir() {
        let mut sd = MemStorage::new();
        assert!(matches!(
            sd.write_file("/notes/a.txt", b"x").await,
            Err(MemError::NotFound(_))
        ));
        sd.create_dir("/notes").await.unwrap();
        sd.write_file("/notes/a.txt", b"x").await.unwrap();
        assert_eq!(sd.get("/notes/a.txt").unwrap(), b"x");
    }

    #[tokio::test]
    async fn test_list_dir_children_only() {
        let mut sd = MemStorage::new();
        sd.insert("/audiobooks/a.mp3", &[0; 3]);
        sd.insert("/audiobooks/Dune/b.m4b", &[0; 5]);
        sd.insert("/audiobooks/.bookmarks/a.bmk", &[0; 72]);
        let mut names = Vec::new();
        sd.list_dir("/audiobooks", |e| names.push((e.name.to_string(), e.is_dir)))
            .await
            .unwrap();
        assert_eq!(
            names,
            vec![
                (".bookmarks".to_string(), true),
                ("Dune".to_string(), true),
                ("a.mp3".to_string(), false)
            ]
        );
    }

    #[tokio::test]
    async fn test_rename_refuses_existing_target() {
        let mut sd = MemStorage::new();
        sd.insert("/n/a.txt", b"a");
        sd.insert("/n/b.txt", b"b");
        assert!(sd.rename("/n/a.txt", "/n/b.txt").await.is_err());
        assert_eq!(sd.get("/n/a.txt").unwrap(), b"a");
    }

    #[tokio::test]
    async fn test_fault_injection_fires_once() {
        let mut sd = MemStorage::new();
        sd.insert("/x", b"1");
        sd.fail_next(StorageOp::Exists);
        assert!(sd.exists("/x").await.is_err());
        assert!(sd.exists("/x").await.unwrap());
        assert_eq!(sd.count(StorageOp::Exists), 2);
    }
}
