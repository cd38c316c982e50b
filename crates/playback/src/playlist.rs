//! Playable files of the book's directory.

use heapless::Vec;
use platform::storage::NameBuf;

use library::track::bounded;
use library::MAX_DIR_ENTRIES;

/// Ordered track names with a cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    tracks: Vec<NameBuf, MAX_DIR_ENTRIES>,
    index: usize,
}

impl Playlist {
    /// Build from file names, sorted case-insensitively, with the cursor
    /// on `current` (or the first track).
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>, current: &str) -> Self {
        let mut tracks: Vec<NameBuf, MAX_DIR_ENTRIES> = Vec::new();
        for name in names {
            if tracks.push(bounded(name)).is_err() {
                break;
            }
        }
        tracks.sort_unstable_by(|a, b| {
            a.bytes()
                .map(|c| c.to_ascii_lowercase())
                .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
        });
        let index = tracks.iter().position(|t| t.as_str() == current).unwrap_or(0);
        Self { tracks, index }
    }

    /// Current track name.
    pub fn current(&self) -> Option<&str> {
        self.tracks.get(self.index).map(|t| t.as_str())
    }

    /// Cursor position.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Move to the next track. Returns `None` (cursor unchanged) at the end.
    pub fn advance(&mut self) -> Option<&str> {
        let next = self.index.checked_add(1).filter(|n| *n < self.tracks.len())?;
        self.index = next;
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_case_insensitive_with_cursor() {
        let p = Playlist::new(["b.mp3", "A.mp3", "c.mp3"], "b.mp3");
        assert_eq!(p.current(), Some("b.mp3"));
        assert_eq!(p.index(), 1);
    }

    #[test]
    fn test_advance_stops_at_end() {
        let mut p = Playlist::new(["1.mp3", "2.mp3"], "1.mp3");
        assert_eq!(p.advance(), Some("2.mp3"));
        assert_eq!(p.advance(), None);
        assert_eq!(p.current(), Some("2.mp3"));
    }

    #[test]
    fn test_single_track_never_advances() {
        let mut p = Playlist::new(["book.m4b"], "book.m4b");
        assert_eq!(p.advance(), None);
    }
}
