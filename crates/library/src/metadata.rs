//! Tag parsing seam.
//!
//! The M4B atom walker and the ID3v2 reader are external; the scan pipeline
//! only needs what they extract. Implementations read through the same
//! [`Storage`] handle the scan uses, so they inherit its chip-select release.

use heapless::Vec;
use platform::Storage;

use crate::track::{Author, MediaKind, Title};

/// Chapter markers kept per book.
pub const MAX_CHAPTERS: usize = 64;

/// What a tag parser found in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    /// Title tag; empty if absent.
    pub title: Title,
    /// Artist/author tag; empty if absent.
    pub author: Author,
    /// Duration from the header in seconds, 0 if unknown.
    pub duration_s: u32,
    /// Chapter start offsets in seconds, ascending.
    pub chapters: Vec<u32, MAX_CHAPTERS>,
}

impl TrackTags {
    /// Sort chapter starts and drop duplicates; the first chapter is
    /// always at 0 if any exist.
    pub fn normalize(&mut self) {
        self.chapters.sort_unstable();
        let mut last: Option<u32> = None;
        self.chapters.retain(|c| {
            let keep = last != Some(*c);
            last = Some(*c);
            keep
        });
        if self.chapters.first().is_some_and(|first| *first != 0) {
            if self.chapters.is_full() {
                self.chapters.pop();
            }
            let _ = self.chapters.insert(0, 0);
        }
    }
}

/// Metadata reader for one audio file.
pub trait TagParser {
    /// Error type
    type Error: core::fmt::Debug;

    /// Parse the tags of `path`, dispatching on `kind`.
    fn parse<S: Storage>(
        &mut self,
        sd: &mut S,
        path: &str,
        kind: MediaKind,
    ) -> impl core::future::Future<Output = Result<TrackTags, Self::Error>>;
}

/// Parser for cards without tag support: every file falls back to its name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTags;

impl TagParser for NoTags {
    type Error = core::convert::Infallible;

    async fn parse<S: Storage>(
        &mut self,
        _sd: &mut S,
        _path: &str,
        _kind: MediaKind,
    ) -> Result<TrackTags, Self::Error> {
        Ok(TrackTags::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sorts_and_anchors_at_zero() {
        let mut t = TrackTags::default();
        for c in [900, 400, 400, 30] {
            t.chapters.push(c).unwrap();
        }
        t.normalize();
        assert_eq!(t.chapters.as_slice(), &[0, 30, 400, 900]);
    }

    #[test]
    fn test_normalize_keeps_existing_zero() {
        let mut t = TrackTags::default();
        t.chapters.extend_from_slice(&[0, 400, 900]).unwrap();
        t.normalize();
        assert_eq!(t.chapters.as_slice(), &[0, 400, 900]);
    }
}
