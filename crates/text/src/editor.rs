//! Bounded text editor buffer.
//!
//! The buffer is raw UTF-8 bytes with a byte cursor that always sits on a
//! character boundary. The visual-line index (spans from [`crate::wrap`]) is
//! rebuilt lazily: edits only mark it stale, and cursor moves or rendering
//! rebuild it on demand.

use heapless::Vec;

use crate::wrap::{columns, lines};

/// Maximum note size in bytes.
pub const EDITOR_CAPACITY: usize = 16 * 1024;

/// Visual lines indexed at once.
pub const MAX_VISUAL_LINES: usize = 4096;

/// Editor errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EditorError {
    /// Inserting would exceed [`EDITOR_CAPACITY`].
    #[error("note is full")]
    Full,
    /// Loaded content is larger than [`EDITOR_CAPACITY`].
    #[error("note too large to edit")]
    TooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: u16,
    end: u16,
}

/// Edit buffer with cursor, dirty flag and visual-line index.
#[derive(Debug, Clone)]
pub struct Editor {
    buf: Vec<u8, EDITOR_CAPACITY>,
    cursor: usize,
    dirty: bool,
    cols: usize,
    spans: Vec<Span, MAX_VISUAL_LINES>,
    stale: bool,
}

#[inline]
fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

impl Editor {
    /// Empty buffer laid out at `cols` columns.
    pub fn new(cols: usize) -> Self {
        Self {
            buf: Vec::new(),
            cursor: 0,
            dirty: false,
            cols: cols.max(1),
            spans: Vec::new(),
            stale: true,
        }
    }

    /// Load existing content; the cursor goes to the end and the buffer is clean.
    pub fn from_bytes(content: &[u8], cols: usize) -> Result<Self, EditorError> {
        let mut ed = Self::new(cols);
        ed.buf
            .extend_from_slice(content)
            .map_err(|_| EditorError::TooLarge)?;
        ed.cursor = ed.buf.len();
        Ok(ed)
    }

    /// Buffer contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Byte length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// `true` when the buffer holds nothing.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Cursor byte offset.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// `true` if edited since load or the last [`Editor::mark_saved`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag after a successful save.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.stale = true;
    }

    /// Insert bytes at the cursor.
    pub fn insert_bytes(&mut self, bytes: &[u8]) -> Result<(), EditorError> {
        let len = self.buf.len();
        if len.saturating_add(bytes.len()) > EDITOR_CAPACITY {
            return Err(EditorError::Full);
        }
        for _ in bytes {
            // Capacity checked above.
            let _ = self.buf.push(0);
        }
        self.buf.copy_within(self.cursor..len, self.cursor.saturating_add(bytes.len()));
        if let Some(dst) = self
            .buf
            .get_mut(self.cursor..self.cursor.saturating_add(bytes.len()))
        {
            dst.copy_from_slice(bytes);
        }
        self.cursor = self.cursor.saturating_add(bytes.len());
        self.touch();
        Ok(())
    }

    /// Insert one character.
    pub fn insert_char(&mut self, c: char) -> Result<(), EditorError> {
        let mut tmp = [0u8; 4];
        self.insert_bytes(c.encode_utf8(&mut tmp).as_bytes())
    }

    fn prev_boundary(&self, from: usize) -> usize {
        let mut i = from;
        while i > 0 {
            i -= 1;
            if !self.buf.get(i).copied().is_some_and(is_continuation) {
                break;
            }
        }
        i
    }

    fn next_boundary(&self, from: usize) -> usize {
        let mut i = from.saturating_add(1).min(self.buf.len());
        while self.buf.get(i).copied().is_some_and(is_continuation) {
            i += 1;
        }
        i
    }

    fn remove_range(&mut self, start: usize, end: usize) {
        let len = self.buf.len();
        if start >= end || end > len {
            return;
        }
        self.buf.copy_within(end..len, start);
        self.buf.truncate(len - (end - start));
        self.cursor = start;
        self.touch();
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let start = self.prev_boundary(self.cursor);
        self.remove_range(start, self.cursor);
    }

    /// Delete back to the start of the previous word (shift+backspace).
    pub fn delete_word(&mut self) {
        let mut start = self.cursor;
        while start > 0 && self.buf.get(start - 1).is_some_and(|b| b.is_ascii_whitespace()) {
            start -= 1;
        }
        while start > 0 && self.buf.get(start - 1).is_some_and(|b| !b.is_ascii_whitespace()) {
            start -= 1;
        }
        self.remove_range(start, self.cursor);
    }

    /// Move one character left.
    pub fn left(&mut self) {
        self.cursor = self.prev_boundary(self.cursor);
    }

    /// Move one character right.
    pub fn right(&mut self) {
        if self.cursor < self.buf.len() {
            self.cursor = self.next_boundary(self.cursor);
        }
    }

    /// Rebuild the visual-line index if stale.
    pub fn reindex(&mut self) {
        if !self.stale {
            return;
        }
        self.spans.clear();
        let mut last_next = 0usize;
        for l in lines(&self.buf, self.cols) {
            let span = Span {
                start: u16::try_from(l.start).unwrap_or(u16::MAX),
                end: u16::try_from(l.end).unwrap_or(u16::MAX),
            };
            if self.spans.push(span).is_err() {
                break;
            }
            last_next = l.next;
        }
        // A trailing newline (or an empty buffer) leaves room for one more line.
        let len = self.buf.len();
        let ends_open = self.buf.last().is_some_and(|b| *b == b'\n' || *b == b'\r');
        if self.spans.is_empty() || (ends_open && last_next == len) {
            let at = u16::try_from(len).unwrap_or(u16::MAX);
            let _ = self.spans.push(Span { start: at, end: at });
        }
        self.stale = false;
    }

    /// Number of visual lines.
    pub fn line_count(&mut self) -> usize {
        self.reindex();
        self.spans.len()
    }

    /// Byte range of visual line `n`.
    pub fn line_range(&mut self, n: usize) -> Option<(usize, usize)> {
        self.reindex();
        self.spans
            .get(n)
            .map(|s| (usize::from(s.start), usize::from(s.end)))
    }

    fn line_of(&self, offset: usize) -> usize {
        self.spans
            .iter()
            .rposition(|s| usize::from(s.start) <= offset)
            .unwrap_or(0)
    }

    /// Visual (line, column) of the cursor.
    pub fn cursor_line_col(&mut self) -> (usize, usize) {
        self.reindex();
        let line = self.line_of(self.cursor);
        let start = self.spans.get(line).map_or(0, |s| usize::from(s.start));
        let col = self
            .buf
            .get(start..self.cursor)
            .map_or(0, columns);
        (line, col)
    }

    fn offset_at(&self, line: usize, col: usize) -> usize {
        let Some(span) = self.spans.get(line) else {
            return self.cursor;
        };
        let (start, end) = (usize::from(span.start), usize::from(span.end));
        let mut i = start;
        let mut c = 0;
        while i < end && c < col {
            i = self.next_boundary(i).min(end);
            c += 1;
        }
        i
    }

    /// Move to the same column on the previous visual line.
    pub fn up(&mut self) {
        let (line, col) = self.cursor_line_col();
        if line > 0 {
            self.cursor = self.offset_at(line - 1, col);
        } else {
            self.cursor = 0;
        }
    }

    /// Move to the same column on the next visual line.
    pub fn down(&mut self) {
        let (line, col) = self.cursor_line_col();
        if line.saturating_add(1) < self.spans.len() {
            self.cursor = self.offset_at(line + 1, col);
        } else {
            self.cursor = self.buf.len();
        }
    }

    /// First visual line to show so the cursor stays inside `rows` lines.
    pub fn scroll_top(&mut self, current_top: usize, rows: usize) -> usize {
        let (line, _) = self.cursor_line_col();
        let rows = rows.max(1);
        if line < current_top {
            line
        } else if line >= current_top.saturating_add(rows) {
            line + 1 - rows
        } else {
            current_top
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str, cols: usize) -> Editor {
        let mut ed = Editor::new(cols);
        for c in text.chars() {
            ed.insert_char(c).unwrap();
        }
        ed
    }

    #[test]
    fn test_insert_and_backspace_utf8() {
        let mut ed = typed("añ", 40);
        assert_eq!(ed.as_bytes(), "añ".as_bytes());
        ed.backspace();
        assert_eq!(ed.as_bytes(), b"a");
        assert!(ed.is_dirty());
    }

    #[test]
    fn test_insert_in_middle() {
        let mut ed = typed("ac", 40);
        ed.left();
        ed.insert_char('b').unwrap();
        assert_eq!(ed.as_bytes(), b"abc");
        assert_eq!(ed.cursor(), 2);
    }

    #[test]
    fn test_delete_word() {
        let mut ed = typed("hello big world  ", 40);
        ed.delete_word();
        assert_eq!(ed.as_bytes(), b"hello big ");
    }

    #[test]
    fn test_full_buffer_rejects_insert() {
        let content = vec![b'x'; EDITOR_CAPACITY];
        let mut ed = Editor::from_bytes(&content, 40).unwrap();
        assert_eq!(ed.insert_char('y'), Err(EditorError::Full));
        assert!(!ed.is_dirty());
        assert_eq!(
            Editor::from_bytes(&[0u8; EDITOR_CAPACITY + 1], 40).err(),
            Some(EditorError::TooLarge)
        );
    }

    #[test]
    fn test_up_down_keep_column() {
        let mut ed = typed("abcdef\nxy\nlonger line", 40);
        assert_eq!(ed.cursor_line_col(), (2, 11));
        ed.up();
        // Clamped to the end of "xy".
        assert_eq!(ed.cursor_line_col(), (1, 2));
        ed.up();
        assert_eq!(ed.cursor_line_col(), (0, 2));
        ed.down();
        ed.down();
        assert_eq!(ed.cursor_line_col(), (2, 2));
    }

    #[test]
    fn test_cursor_on_wrapped_line() {
        let mut ed = typed("aaaa bbbb", 4);
        assert_eq!(ed.line_count(), 2);
        assert_eq!(ed.cursor_line_col(), (1, 4));
        ed.up();
        assert_eq!(ed.cursor(), 4);
    }

    #[test]
    fn test_trailing_newline_opens_a_line() {
        let mut ed = typed("abc\n", 40);
        assert_eq!(ed.line_count(), 2);
        assert_eq!(ed.cursor_line_col(), (1, 0));
        let mut empty = Editor::new(40);
        assert_eq!(empty.line_count(), 1);
        assert_eq!(empty.cursor_line_col(), (0, 0));
    }

    #[test]
    fn test_index_rebuilt_only_when_stale() {
        let mut ed = typed("one\ntwo", 40);
        assert_eq!(ed.line_count(), 2);
        ed.insert_char('\n').unwrap();
        assert_eq!(ed.line_count(), 3);
    }

    #[test]
    fn test_scroll_follows_cursor() {
        let mut ed = typed("1\n2\n3\n4\n5", 40);
        assert_eq!(ed.scroll_top(0, 3), 2);
        ed.up();
        ed.up();
        ed.up();
        ed.up();
        assert_eq!(ed.scroll_top(2, 3), 0);
    }
}
