//! Page index: the byte offset at which each screenful begins.

use heapless::Vec;

use crate::wrap::lines;

/// Pages tracked per document. A 40×30 page holds up to 1200 characters, so
/// this covers well over a megabyte of running text.
pub const MAX_PAGES: usize = 1024;

/// Byte offsets of page starts, built by simulating the line breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIndex {
    starts: Vec<u32, MAX_PAGES>,
    len: usize,
    truncated: bool,
}

impl PageIndex {
    /// Paginate `text` at `cols` × `lines_per_page`.
    ///
    /// A new page starts after every `lines_per_page`-th line, unless that
    /// line ends the text. Empty text has one empty page.
    pub fn build(text: &[u8], cols: usize, lines_per_page: usize) -> Self {
        let per_page = lines_per_page.max(1);
        let mut starts = Vec::new();
        let mut truncated = false;
        let _ = starts.push(0);
        for (n, line) in lines(text, cols).enumerate() {
            if (n + 1) % per_page == 0 && line.next < text.len() {
                let Ok(offset) = u32::try_from(line.next) else {
                    truncated = true;
                    break;
                };
                if starts.push(offset).is_err() {
                    truncated = true;
                    break;
                }
            }
        }
        Self {
            starts,
            len: text.len(),
            truncated,
        }
    }

    /// Number of pages (always at least one).
    pub fn page_count(&self) -> usize {
        self.starts.len().max(1)
    }

    /// `true` if the text had more pages than [`MAX_PAGES`].
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Offsets of every page start.
    pub fn offsets(&self) -> &[u32] {
        &self.starts
    }

    /// Byte range of page `page`, or `None` past the last page.
    pub fn page_range(&self, page: usize) -> Option<(usize, usize)> {
        let start = *self.starts.get(page)? as usize;
        let end = self
            .starts
            .get(page.saturating_add(1))
            .map_or(self.len, |s| *s as usize);
        Some((start, end))
    }

    /// Page containing byte `offset`.
    pub fn page_of(&self, offset: usize) -> usize {
        self.starts
            .iter()
            .rposition(|s| (*s as usize) <= offset)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_page_when_short() {
        let idx = PageIndex::build(b"one\ntwo", 10, 5);
        assert_eq!(idx.page_count(), 1);
        assert_eq!(idx.page_range(0), Some((0, 7)));
        assert_eq!(idx.page_range(1), None);
    }

    #[test]
    fn test_page_starts_after_every_nth_line() {
        let text = b"l1\nl2\nl3\nl4\nl5";
        let idx = PageIndex::build(text, 10, 2);
        assert_eq!(idx.offsets(), &[0, 6, 12]);
        assert_eq!(idx.page_range(2), Some((12, 14)));
        assert_eq!(idx.page_of(7), 1);
    }

    #[test]
    fn test_no_empty_trailing_page() {
        let idx = PageIndex::build(b"a\nb\n", 10, 2);
        assert_eq!(idx.page_count(), 1);
    }

    #[test]
    fn test_empty_text_has_one_page() {
        let idx = PageIndex::build(b"", 40, 30);
        assert_eq!(idx.page_count(), 1);
        assert_eq!(idx.page_range(0), Some((0, 0)));
    }

    #[test]
    fn test_wrapped_lines_count_toward_pages() {
        let idx = PageIndex::build(b"aaaa bbbb cccc", 4, 2);
        assert_eq!(idx.offsets(), &[0, 10]);
    }
}
