//! Most-recently-used URL lists: web bookmarks and history.
//!
//! Newest entry first. Adding a URL that is already present moves it to the
//! top; the list never grows past its capacity.

use heapless::{String, Vec};
use platform::config::WEB_ROOT;
use platform::Storage;

use crate::fs::{ensure_dir, for_each_line, write_lines};
use crate::paths::{WEB_BOOKMARKS, WEB_HISTORY};
use crate::StoreError;

/// Longest stored URL.
pub const MAX_URL: usize = 256;

/// Saved bookmarks.
pub const BOOKMARKS_MAX: usize = 20;

/// History entries.
pub const HISTORY_MAX: usize = 30;

/// One stored URL.
pub type UrlString = String<MAX_URL>;

/// Bounded MRU list backed by a text file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlList<const N: usize> {
    items: Vec<UrlString, N>,
}

/// `/web/bookmarks.txt`.
pub type Bookmarks = UrlList<BOOKMARKS_MAX>;

/// `/web/history.txt`.
pub type History = UrlList<HISTORY_MAX>;

impl<const N: usize> UrlList<N> {
    /// Empty list.
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Load from `path`, keeping file order and dropping blanks, overlong
    /// lines and duplicates.
    pub async fn load<S: Storage>(sd: &mut S, path: &str) -> Result<Self, StoreError> {
        let mut list = Self::new();
        for_each_line(sd, path, |line| {
            let line = line.trim();
            if let Ok(url) = UrlString::try_from(line) {
                if !line.is_empty() && !list.items.contains(&url) {
                    let _ = list.items.push(url);
                }
            }
            list.items.len() < N
        })
        .await?;
        Ok(list)
    }

    /// Write to `path`.
    pub async fn save<S: Storage>(&self, sd: &mut S, path: &str) -> Result<(), StoreError> {
        ensure_dir(sd, WEB_ROOT).await?;
        write_lines(sd, path, self.items.iter().map(|u| u.as_str())).await
    }

    /// Put `url` at the top, removing any earlier copy and the oldest entry
    /// if full. Returns `false` for an empty or overlong URL.
    pub fn push(&mut self, url: &str) -> bool {
        let url = url.trim();
        let Ok(url) = UrlString::try_from(url) else {
            return false;
        };
        if url.is_empty() || N == 0 {
            return false;
        }
        self.items.retain(|u| *u != url);
        if self.items.is_full() {
            self.items.pop();
        }
        self.items.insert(0, url).is_ok()
    }

    /// Remove entry `index`.
    pub fn remove(&mut self, index: usize) -> Option<UrlString> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Entry `index` (0 = newest).
    pub fn get(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(|u| u.as_str())
    }

    /// Entries newest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|u| u.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Bookmarks {
    /// Load `/web/bookmarks.txt`.
    pub async fn load_default<S: Storage>(sd: &mut S) -> Result<Self, StoreError> {
        Self::load(sd, WEB_BOOKMARKS).await
    }

    /// Save `/web/bookmarks.txt`.
    pub async fn save_default<S: Storage>(&self, sd: &mut S) -> Result<(), StoreError> {
        self.save(sd, WEB_BOOKMARKS).await
    }
}

impl History {
    /// Load `/web/history.txt`.
    pub async fn load_default<S: Storage>(sd: &mut S) -> Result<Self, StoreError> {
        Self::load(sd, WEB_HISTORY).await
    }

    /// Save `/web/history.txt`.
    pub async fn save_default<S: Storage>(&self, sd: &mut S) -> Result<(), StoreError> {
        self.save(sd, WEB_HISTORY).await
    }
}
