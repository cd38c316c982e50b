//! `.metacache`: per-directory tag cache.
//!
//! ```text
//! #metacache v1
//! name<TAB>size<TAB>title<TAB>author<TAB>type
//! ```
//!
//! An entry is valid only while both the file name and the size match. A
//! file without the header line (or with another version) is ignored as a
//! whole. Only files are recorded, never directories.

use core::fmt::Write as _;

use heapless::{String, Vec};
use platform::storage::NameBuf;
use platform::Storage;
use store::fs::{atomic_write, for_each_line, MAX_LINE};
use store::paths::metacache_path;

use crate::error::io;
use crate::scanner::MAX_DIR_ENTRIES;
use crate::track::{bounded, Author, MediaKind, Title};
use crate::CacheError;

/// First line of every cache file.
pub const HEADER: &str = "#metacache v1";

/// One cached file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// File name.
    pub name: NameBuf,
    /// Size in bytes when parsed.
    pub size: u64,
    /// Parsed or derived title.
    pub title: Title,
    /// Parsed author; may be empty.
    pub author: Author,
    /// File kind.
    pub kind: MediaKind,
}

impl CacheEntry {
    /// Parse one data line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split('\t');
        let name = fields.next()?;
        let size = fields.next()?.parse().ok()?;
        let title = fields.next()?;
        let author = fields.next()?;
        let kind = MediaKind::from_tag(fields.next()?)?;
        if name.is_empty() || fields.next().is_some() {
            return None;
        }
        Some(Self {
            name: bounded(name),
            size,
            title: bounded(title),
            author: bounded(author),
            kind,
        })
    }

    /// Format as a data line, without the newline. Tabs and newlines in
    /// tag text are replaced by spaces.
    pub fn format(&self) -> String<MAX_LINE> {
        let mut line = String::new();
        let _ = write!(line, "{}\t{}\t", self.name, self.size);
        push_clean(&mut line, &self.title);
        let _ = line.push('\t');
        push_clean(&mut line, &self.author);
        let _ = line.push('\t');
        let _ = line.push_str(self.kind.tag());
        line
    }
}

fn clean_char(c: char) -> char {
    if c == '\t' || c == '\n' || c == '\r' { ' ' } else { c }
}

fn push_clean<const N: usize>(out: &mut String<N>, text: &str) {
    for c in text.chars() {
        if out.push(clean_char(c)).is_err() {
            break;
        }
    }
}

/// Tag text as it reads back from a cache line: tabs and line breaks
/// become spaces.
pub fn clean<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    push_clean(&mut out, text);
    out
}

/// Cache contents for one directory.
#[derive(Debug, Clone, Default)]
pub struct MetaCache {
    entries: Vec<CacheEntry, MAX_DIR_ENTRIES>,
    hits: u32,
}

impl MetaCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `<dir>/.metacache`. A missing file, a missing header or an
    /// unknown version yields an empty cache.
    pub async fn load<S: Storage>(sd: &mut S, dir: &str) -> Result<Self, CacheError> {
        let path = metacache_path(dir)?;
        let mut cache = Self::new();
        let mut header_ok = None;
        for_each_line(sd, &path, |line| {
            if header_ok.is_none() {
                header_ok = Some(line == HEADER);
                return line == HEADER;
            }
            if let Some(entry) = CacheEntry::parse(line) {
                cache.insert(entry);
            }
            true
        })
        .await?;
        if header_ok == Some(false) {
            tracing::info!("metacache: {} has no v1 header, ignoring", path.as_str());
            cache.entries.clear();
        }
        Ok(cache)
    }

    /// Write the cache to `<dir>/.metacache`, replacing any previous file.
    pub async fn save<S: Storage>(&self, sd: &mut S, dir: &str) -> Result<(), CacheError> {
        let path = metacache_path(dir)?;
        let mut head: String<16> = String::new();
        let _ = head.push_str(HEADER);
        let _ = head.push('\n');
        atomic_write(sd, &path, head.as_bytes()).await?;
        for entry in &self.entries {
            let mut line = entry.format();
            let _ = line.push('\n');
            sd.append(&path, line.as_bytes()).await.map_err(io)?;
        }
        tracing::debug!("metacache: wrote {} entries to {}", self.entries.len(), path.as_str());
        Ok(())
    }

    /// Entry for (`name`, `size`); counts a hit when found.
    pub fn lookup(&mut self, name: &str, size: u64) -> Option<&CacheEntry> {
        let found = self
            .entries
            .iter()
            .position(|e| e.name.as_str() == name && e.size == size)?;
        self.hits = self.hits.saturating_add(1);
        self.entries.get(found)
    }

    /// Add or replace the entry for `entry.name`. Directories are ignored.
    pub fn insert(&mut self, entry: CacheEntry) {
        if entry.kind == MediaKind::Dir {
            return;
        }
        if let Some(slot) = self.entries.iter_mut().find(|e| e.name == entry.name) {
            *slot = entry;
        } else if self.entries.push(entry).is_err() {
            tracing::warn!("metacache: full, entry dropped");
        }
    }

    /// Cached entries.
    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    /// Lookups answered since load.
    pub fn hits(&self) -> u32 {
        self.hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::MemStorage;

    fn entry(name: &str, size: u64, title: &str) -> CacheEntry {
        CacheEntry {
            name: bounded(name),
            size,
            title: bounded(title),
            author: Author::new(),
            kind: MediaKind::Mp3,
        }
    }

    #[test]
    fn test_line_keeps_empty_author_tab() {
        let e = entry("a.mp3", 42, "A");
        assert_eq!(e.format().as_str(), "a.mp3\t42\tA\t\tMP3");
        assert_eq!(CacheEntry::parse(&e.format()), Some(e));
    }

    #[test]
    fn test_rejects_malformed_lines() {
        assert_eq!(CacheEntry::parse("a.mp3\tbig\tA\t\tMP3"), None);
        assert_eq!(CacheEntry::parse("a.mp3\t1\tA\t\tOGG"), None);
        assert_eq!(CacheEntry::parse("a.mp3\t1\tA"), None);
        assert_eq!(CacheEntry::parse("a.mp3\t1\tA\tB\tMP3\textra"), None);
    }

    #[test]
    fn test_tag_text_is_sanitized() {
        let e = entry("a.mp3", 1, "x\ty");
        assert_eq!(e.format().as_str(), "a.mp3\t1\tx y\t\tMP3");
    }

    #[test]
    fn test_lookup_requires_size_match() {
        let mut c = MetaCache::new();
        c.insert(entry("a.mp3", 10, "A"));
        assert!(c.lookup("a.mp3", 11).is_none());
        assert_eq!(c.lookup("a.mp3", 10).map(|e| e.title.as_str()), Some("A"));
        assert_eq!(c.hits(), 1);
    }

    #[test]
    fn test_insert_replaces_by_name() {
        let mut c = MetaCache::new();
        c.insert(entry("a.mp3", 10, "A"));
        c.insert(entry("a.mp3", 12, "A2"));
        assert_eq!(c.entries().len(), 1);
        assert_eq!(c.entries()[0].size, 12);
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let fs = MemStorage::new();
        fs.mkdirs("/audiobooks");
        let mut sd = fs.clone();
        let mut c = MetaCache::new();
        c.insert(entry("a.mp3", 10, "A"));
        c.insert(entry("b.mp3", 20, "B"));
        c.save(&mut sd, "/audiobooks").await.unwrap();
        assert_eq!(
            fs.get_string("/audiobooks/.metacache").unwrap(),
            "#metacache v1\na.mp3\t10\tA\t\tMP3\nb.mp3\t20\tB\t\tMP3\n"
        );
        let back = MetaCache::load(&mut sd, "/audiobooks").await.unwrap();
        assert_eq!(back.entries(), c.entries());
    }

    #[tokio::test]
    async fn test_unversioned_file_is_ignored() {
        let fs = MemStorage::new();
        fs.insert("/audiobooks/.metacache", b"a.mp3\t10\tOld\t\tMP3\n");
        let mut sd = fs.clone();
        let c = MetaCache::load(&mut sd, "/audiobooks").await.unwrap();
        assert!(c.entries().is_empty());
        let missing = MetaCache::load(&mut sd, "/audiobooks/none").await.unwrap();
        assert!(missing.entries().is_empty());
    }
}
