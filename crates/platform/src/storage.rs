//! Storage abstraction for the SD card file system
//!
//! Every call is a complete open/operate/close sequence: implementations must
//! not keep a file handle (and with it the SD chip-select) across calls.

use core::fmt::Write as _;

/// Maximum length of a full path on the card.
pub const MAX_PATH: usize = 128;

/// Maximum length of a single directory entry name.
pub const MAX_NAME: usize = 64;

/// Owned path buffer.
pub type PathBuf = heapless::String<MAX_PATH>;

/// Owned file-name buffer.
pub type NameBuf = heapless::String<MAX_NAME>;

/// A joined path did not fit in [`MAX_PATH`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("path too long")]
pub struct PathTooLong;

/// One entry reported by [`Storage::list_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Name without the directory prefix.
    pub name: NameBuf,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// `true` for sub-directories.
    pub is_dir: bool,
}

impl DirEntry {
    /// Hidden entries start with `.` (this covers macOS `._` resource forks).
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Storage trait for file system access
pub trait Storage {
    /// Error type
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes starting at `offset`. Returns the count read.
    fn read_at(
        &mut self,
        path: &str,
        offset: u64,
        buf: &mut [u8],
    ) -> impl core::future::Future<Output = Result<usize, Self::Error>>;

    /// Create or truncate `path` and write `data`.
    fn write_file(
        &mut self,
        path: &str,
        data: &[u8],
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Append `data` to `path`, creating it if needed.
    fn append(
        &mut self,
        path: &str,
        data: &[u8],
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Delete a file.
    fn remove(&mut self, path: &str) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Rename a file within the same volume.
    fn rename(
        &mut self,
        from: &str,
        to: &str,
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Check if path exists
    fn exists(
        &mut self,
        path: &str,
    ) -> impl core::future::Future<Output = Result<bool, Self::Error>>;

    /// Size of a file in bytes, `None` if it does not exist.
    fn file_size(
        &mut self,
        path: &str,
    ) -> impl core::future::Future<Output = Result<Option<u64>, Self::Error>>;

    /// Create a directory (no-op if it already exists).
    fn create_dir(
        &mut self,
        path: &str,
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Enumerate `path`, calling `visit` once per entry in directory order.
    fn list_dir<F>(
        &mut self,
        path: &str,
        visit: F,
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>
    where
        F: FnMut(&DirEntry);
}

impl<T: Storage> Storage for &mut T {
    type Error = T::Error;

    async fn read_at(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> Result<usize, T::Error> {
        (**self).read_at(path, offset, buf).await
    }

    async fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), T::Error> {
        (**self).write_file(path, data).await
    }

    async fn append(&mut self, path: &str, data: &[u8]) -> Result<(), T::Error> {
        (**self).append(path, data).await
    }

    async fn remove(&mut self, path: &str) -> Result<(), T::Error> {
        (**self).remove(path).await
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<(), T::Error> {
        (**self).rename(from, to).await
    }

    async fn exists(&mut self, path: &str) -> Result<bool, T::Error> {
        (**self).exists(path).await
    }

    async fn file_size(&mut self, path: &str) -> Result<Option<u64>, T::Error> {
        (**self).file_size(path).await
    }

    async fn create_dir(&mut self, path: &str) -> Result<(), T::Error> {
        (**self).create_dir(path).await
    }

    async fn list_dir<F>(&mut self, path: &str, visit: F) -> Result<(), T::Error>
    where
        F: FnMut(&DirEntry),
    {
        (**self).list_dir(path, visit).await
    }
}

/// Join a directory and a name with exactly one `/`.
pub fn join(dir: &str, name: &str) -> Result<PathBuf, PathTooLong> {
    let mut out = PathBuf::new();
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    write!(out, "{dir}/{name}").map_err(|_| PathTooLong)?;
    Ok(out)
}

/// Final path component.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Everything before the final `/` (`"/"` for top-level entries).
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => path.get(..idx).unwrap_or("/"),
        None => "",
    }
}

/// File name without its last extension.
pub fn stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => name.get(..idx).unwrap_or(name),
    }
}

/// Extension of `name` without the dot.
pub fn extension(name: &str) -> Option<&str> {
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => name.get(idx.saturating_add(1)..),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_inserts_single_separator() {
        assert_eq!(join("/notes", "a.txt").unwrap().as_str(), "/notes/a.txt");
        assert_eq!(join("/notes/", "/a.txt").unwrap().as_str(), "/notes/a.txt");
    }

    #[test]
    fn test_join_rejects_overlong_path() {
        let long = "x".repeat(MAX_PATH);
        assert_eq!(join("/notes", &long), Err(PathTooLong));
    }

    #[test]
    fn test_path_components() {
        assert_eq!(file_name("/audiobooks/Dune/part1.m4b"), "part1.m4b");
        assert_eq!(parent("/audiobooks/Dune/part1.m4b"), "/audiobooks/Dune");
        assert_eq!(parent("/settings.bin"), "/");
        assert_eq!(stem("part1.m4b"), "part1");
        assert_eq!(stem(".metacache"), ".metacache");
        assert_eq!(extension("part1.M4B"), Some("M4B"));
        assert_eq!(extension("README"), None);
    }

    #[test]
    fn test_hidden_entries() {
        let entry = |name: &str| DirEntry {
            name: NameBuf::try_from(name).unwrap(),
            size: 0,
            is_dir: false,
        };
        assert!(entry(".bookmarks").is_hidden());
        assert!(entry("._book.m4b").is_hidden());
        assert!(!entry("book.m4b").is_hidden());
    }
}
