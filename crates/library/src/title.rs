//! Titles derived from file names when the tags have none.

use platform::storage::stem;

use crate::track::{bounded, Title};

/// Display title for `name`.
///
/// Inside a sub-directory, files are usually named
/// `Artist - Album - 03 Chapter Name`; only the last segment is kept since
/// the directory already names the book.
pub fn from_file_name(name: &str, in_subdir: bool) -> Title {
    let base = stem(name);
    let base = if in_subdir {
        base.rsplit(" - ").next().unwrap_or(base)
    } else {
        base
    };
    let base = base.trim();
    if base.is_empty() {
        bounded(name)
    } else {
        bounded(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_keeps_full_stem() {
        assert_eq!(
            from_file_name("Author - Book.m4b", false).as_str(),
            "Author - Book"
        );
    }

    #[test]
    fn test_subdir_keeps_trailing_segment() {
        assert_eq!(
            from_file_name("Le Guin - Earthsea - 03 The Dragon.mp3", true).as_str(),
            "03 The Dragon"
        );
        assert_eq!(from_file_name("plain.mp3", true).as_str(), "plain");
    }

    #[test]
    fn test_degenerate_names() {
        assert_eq!(from_file_name("Book - .mp3", true).as_str(), "Book - .mp3");
    }
}
