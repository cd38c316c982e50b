//! File list rows.

use heapless::String;
use platform::storage::{extension, NameBuf};

/// Longest title kept for a row.
pub const MAX_TITLE: usize = 64;

/// Longest author kept for a row.
pub const MAX_AUTHOR: usize = 48;

/// Display title.
pub type Title = String<MAX_TITLE>;

/// Display author.
pub type Author = String<MAX_AUTHOR>;

/// What a row points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MediaKind {
    /// MP4 audiobook (`.m4b` or `.m4a`).
    M4b,
    /// MPEG layer III with ID3v2 tags.
    Mp3,
    /// RIFF/WAVE, no tags.
    Wav,
    /// Sub-directory (or `..`).
    Dir,
}

impl MediaKind {
    /// Kind for a file name, or `None` if it is not playable.
    ///
    /// The comparison is case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = extension(name)?;
        if ext.eq_ignore_ascii_case("m4b") || ext.eq_ignore_ascii_case("m4a") {
            Some(Self::M4b)
        } else if ext.eq_ignore_ascii_case("mp3") {
            Some(Self::Mp3)
        } else if ext.eq_ignore_ascii_case("wav") {
            Some(Self::Wav)
        } else {
            None
        }
    }

    /// Tag written to the cache and shown in the list.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::M4b => "M4B",
            Self::Mp3 => "MP3",
            Self::Wav => "WAV",
            Self::Dir => "DIR",
        }
    }

    /// Inverse of [`MediaKind::tag`] for the file kinds.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "M4B" => Some(Self::M4b),
            "MP3" => Some(Self::Mp3),
            "WAV" => Some(Self::Wav),
            _ => None,
        }
    }
}

/// One row of the audiobook file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Name on the card.
    pub name: NameBuf,
    /// Display title.
    pub title: Title,
    /// Display author; may be empty.
    pub author: Author,
    /// Row kind.
    pub kind: MediaKind,
    /// File size in bytes (0 for directories).
    pub size: u64,
    /// A bookmark exists for this file.
    pub has_bookmark: bool,
}

impl FileEntry {
    /// The `..` row shown first inside a sub-directory.
    pub fn parent() -> Self {
        let mut name = NameBuf::new();
        let _ = name.push_str("..");
        let mut title = Title::new();
        let _ = title.push_str("..");
        Self::dir(name, title)
    }

    /// A sub-directory row.
    pub fn dir(name: NameBuf, title: Title) -> Self {
        Self {
            name,
            title,
            author: Author::new(),
            kind: MediaKind::Dir,
            size: 0,
            has_bookmark: false,
        }
    }

    /// `true` for directories and `..`.
    pub fn is_dir(&self) -> bool {
        self.kind == MediaKind::Dir
    }

    /// `true` for the `..` row.
    pub fn is_parent(&self) -> bool {
        self.name.as_str() == ".."
    }
}

/// Copy `src` into a bounded string, cutting at a character boundary.
pub fn bounded<const N: usize>(src: &str) -> String<N> {
    let mut out = String::new();
    for c in src.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name_case_insensitive() {
        assert_eq!(MediaKind::from_name("Book.M4B"), Some(MediaKind::M4b));
        assert_eq!(MediaKind::from_name("book.m4a"), Some(MediaKind::M4b));
        assert_eq!(MediaKind::from_name("01.Mp3"), Some(MediaKind::Mp3));
        assert_eq!(MediaKind::from_name("x.wav"), Some(MediaKind::Wav));
        assert_eq!(MediaKind::from_name("cover.jpg"), None);
        assert_eq!(MediaKind::from_name("README"), None);
    }

    #[test]
    fn test_tag_round_trip() {
        for k in [MediaKind::M4b, MediaKind::Mp3, MediaKind::Wav] {
            assert_eq!(MediaKind::from_tag(k.tag()), Some(k));
        }
        assert_eq!(MediaKind::from_tag("DIR"), None);
    }

    #[test]
    fn test_parent_row() {
        let p = FileEntry::parent();
        assert!(p.is_dir());
        assert!(p.is_parent());
    }

    #[test]
    fn test_bounded_cuts_on_char_boundary() {
        let s: String<4> = bounded("añbc");
        assert_eq!(s.as_str(), "añb");
    }
}
