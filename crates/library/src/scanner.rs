//! Directory scan pipeline.
//!
//! A scan lists the directory once, answers each audio file from the
//! `.metacache` when (name, size) still match, parses the rest through the
//! [`TagParser`] with a cooperative yield between files, and rewrites the
//! cache if anything was parsed. Bookmark flags come from a single listing
//! of the bookmark directory rather than one `exists()` call per file.

use heapless::Vec;
use platform::config::AUDIOBOOK_ROOT;
use platform::storage::{join, parent, stem, NameBuf, PathBuf};
use platform::Storage;
use store::paths::BOOKMARK_DIR;

use crate::cache::{clean, CacheEntry, MetaCache};
use crate::error::io;
use crate::metadata::TagParser;
use crate::title::from_file_name;
use crate::track::{bounded, FileEntry, MediaKind};
use crate::CacheError;

/// Entries listed per directory (sub-directories plus audio files).
pub const MAX_DIR_ENTRIES: usize = 50;

/// Rows including `..`.
pub const MAX_ROWS: usize = MAX_DIR_ENTRIES + 1;

/// Bookmark files indexed per listing.
pub const MAX_BOOKMARKS: usize = 128;

type Stems = Vec<NameBuf, MAX_BOOKMARKS>;

/// The file list for one directory plus scan bookkeeping.
#[derive(Debug, Clone)]
pub struct Library {
    dir: PathBuf,
    rows: Vec<FileEntry, MAX_ROWS>,
    scanned: Option<PathBuf>,
    cache_hits: u32,
    parsed: u32,
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

impl Library {
    /// Library positioned at the audiobook root, not yet scanned.
    pub fn new() -> Self {
        let mut dir = PathBuf::new();
        let _ = dir.push_str(AUDIOBOOK_ROOT);
        Self {
            dir,
            rows: Vec::new(),
            scanned: None,
            cache_hits: 0,
            parsed: 0,
        }
    }

    /// Directory currently listed.
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// `true` at the audiobook root.
    pub fn at_root(&self) -> bool {
        self.dir.as_str() == AUDIOBOOK_ROOT
    }

    /// Rows in display order.
    pub fn rows(&self) -> &[FileEntry] {
        &self.rows
    }

    /// Row `index`.
    pub fn row(&self, index: usize) -> Option<&FileEntry> {
        self.rows.get(index)
    }

    /// Cache hits during the last full scan.
    pub fn cache_hits(&self) -> u32 {
        self.cache_hits
    }

    /// Files parsed during the last full scan.
    pub fn parsed(&self) -> u32 {
        self.parsed
    }

    /// Playable file names in the listed directory, sorted case-insensitively.
    pub fn playable(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().filter(|r| !r.is_dir()).map(|r| r.name.as_str())
    }

    /// Path of row `index`.
    pub fn path_of(&self, index: usize) -> Result<PathBuf, CacheError> {
        let row = self.rows.get(index).ok_or(CacheError::Io)?;
        Ok(join(&self.dir, &row.name)?)
    }

    /// Open row `index` if it is a directory (or `..`) and list it.
    /// Returns `false` for file rows.
    pub async fn open_row<S: Storage, P: TagParser>(
        &mut self,
        sd: &mut S,
        parser: &mut P,
        index: usize,
    ) -> Result<bool, CacheError> {
        let Some(row) = self.rows.get(index) else {
            return Ok(false);
        };
        if !row.is_dir() {
            return Ok(false);
        }
        let target = if row.is_parent() {
            bounded::<{ platform::storage::MAX_PATH }>(parent(&self.dir))
        } else {
            join(&self.dir, &row.name)?
        };
        self.enter(sd, parser, &target).await?;
        Ok(true)
    }

    /// List `dir`. Re-entering the directory scanned last time only
    /// refreshes the bookmark flags.
    pub async fn enter<S: Storage, P: TagParser>(
        &mut self,
        sd: &mut S,
        parser: &mut P,
        dir: &str,
    ) -> Result<(), CacheError> {
        if self.scanned.as_deref() == Some(dir) {
            self.dir = bounded(dir);
            return self.refresh_bookmarks(sd).await;
        }
        self.dir = bounded(dir);
        self.scan(sd, parser).await?;
        self.scanned = Some(self.dir.clone());
        Ok(())
    }

    /// Force a full rescan of the current directory on the next `enter`.
    pub fn invalidate(&mut self) {
        self.scanned = None;
    }

    async fn scan<S: Storage, P: TagParser>(&mut self, sd: &mut S, parser: &mut P) -> Result<(), CacheError> {
        self.rows.clear();
        self.cache_hits = 0;
        self.parsed = 0;
        let in_subdir = !self.at_root();
        if in_subdir {
            let _ = self.rows.push(FileEntry::parent());
        }

        let mut dirs: Vec<NameBuf, MAX_DIR_ENTRIES> = Vec::new();
        let mut files: Vec<(NameBuf, u64, MediaKind), MAX_DIR_ENTRIES> = Vec::new();
        let mut truncated = false;
        sd.list_dir(&self.dir, |entry| {
            if entry.is_hidden() {
                return;
            }
            if dirs.len().saturating_add(files.len()) >= MAX_DIR_ENTRIES {
                truncated = true;
                return;
            }
            if entry.is_dir {
                let _ = dirs.push(entry.name.clone());
            } else if let Some(kind) = MediaKind::from_name(&entry.name) {
                let _ = files.push((entry.name.clone(), entry.size, kind));
            }
        })
        .await
        .map_err(io)?;
        if truncated {
            tracing::warn!("library: {} has more than {} entries", self.dir.as_str(), MAX_DIR_ENTRIES);
        }
        dirs.sort_unstable_by(|a, b| cmp_ignore_case(a, b));
        files.sort_unstable_by(|a, b| cmp_ignore_case(&a.0, &b.0));

        for name in dirs {
            let title = bounded(&name);
            let _ = self.rows.push(FileEntry::dir(name, title));
        }

        let mut cache = match MetaCache::load(sd, &self.dir).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("metacache: unreadable ({:?}), rebuilding", e);
                MetaCache::new()
            }
        };
        let mut fresh = MetaCache::new();
        let mut dirty = false;
        for (name, size, kind) in files {
            let entry = if let Some(hit) = cache.lookup(&name, size) {
                hit.clone()
            } else {
                dirty = true;
                let entry = self.parse_one(sd, parser, &name, size, kind, in_subdir).await?;
                self.parsed = self.parsed.saturating_add(1);
                embassy_futures::yield_now().await;
                entry
            };
            let _ = self.rows.push(FileEntry {
                name: entry.name.clone(),
                title: entry.title.clone(),
                author: entry.author.clone(),
                kind: entry.kind,
                size: entry.size,
                has_bookmark: false,
            });
            fresh.insert(entry);
        }
        self.cache_hits = cache.hits();
        // Entries for deleted files also make the old cache stale.
        if dirty || fresh.entries().len() != cache.entries().len() {
            if let Err(e) = fresh.save(sd, &self.dir).await {
                tracing::warn!("metacache: write failed: {:?}", e);
            }
        }
        tracing::info!(
            "library: {} listed, {} cached, {} parsed",
            self.dir.as_str(),
            self.cache_hits,
            self.parsed
        );
        self.refresh_bookmarks(sd).await
    }

    async fn parse_one<S: Storage, P: TagParser>(
        &self,
        sd: &mut S,
        parser: &mut P,
        name: &str,
        size: u64,
        kind: MediaKind,
        in_subdir: bool,
    ) -> Result<CacheEntry, CacheError> {
        let path = join(&self.dir, name)?;
        let tags = if kind == MediaKind::Wav {
            Default::default()
        } else {
            match parser.parse(sd, &path, kind).await {
                Ok(tags) => tags,
                Err(e) => {
                    tracing::warn!("library: tags of {} unreadable: {:?}", name, e);
                    Default::default()
                }
            }
        };
        let title = if tags.title.trim().is_empty() {
            from_file_name(name, in_subdir)
        } else {
            clean(&tags.title)
        };
        Ok(CacheEntry {
            name: bounded(name),
            size,
            title,
            author: clean(&tags.author),
            kind,
        })
    }

    /// Re-read the bookmark directory and update every row's flag.
    pub async fn refresh_bookmarks<S: Storage>(&mut self, sd: &mut S) -> Result<(), CacheError> {
        let stems = bookmark_stems(sd).await?;
        for row in self.rows.iter_mut() {
            row.has_bookmark =
                !row.is_dir() && stems.iter().any(|s| s.eq_ignore_ascii_case(stem(&row.name)));
        }
        Ok(())
    }
}

async fn bookmark_stems<S: Storage>(sd: &mut S) -> Result<Stems, CacheError> {
    let mut stems = Stems::new();
    if !sd.exists(BOOKMARK_DIR).await.map_err(io)? {
        return Ok(stems);
    }
    sd.list_dir(BOOKMARK_DIR, |entry| {
        let is_bmk = platform::storage::extension(&entry.name).is_some_and(|e| e.eq_ignore_ascii_case("bmk"));
        if !entry.is_dir && is_bmk {
            let _ = stems.push(bounded(stem(&entry.name)));
        }
    })
    .await
    .map_err(io)?;
    Ok(stems)
}

fn cmp_ignore_case(a: &str, b: &str) -> core::cmp::Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}
