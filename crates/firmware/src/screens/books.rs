//! Plain-text e-book reader over `/books/*.txt`.

use core::fmt::Write as _;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::DrawTarget;
use heapless::{String, Vec};
use platform::config::{BOOKS_ROOT, TEXT_COLUMNS, TEXT_ROWS};
use platform::storage::{extension, join, stem, NameBuf};
use platform::Storage;
use text::PageIndex;
use ui::keys::{is_back, nav, Nav, KEY_ENTER};

use super::{Context, ListCursor, Outcome, Screen, View};
use crate::board::Board;
use crate::error::{sd, AppError};
use crate::render::{Frame, BODY_ROWS};

/// Books listed.
pub const MAX_BOOKS: usize = 64;

/// A page only changes on a key.
pub const READER_REFRESH_MS: u32 = 60_000;

const LIST_TOP: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    List,
    Reading,
}

/// E-book screen.
pub struct Books {
    buf: Option<&'static mut [u8]>,
    len: usize,
    names: Vec<NameBuf, MAX_BOOKS>,
    listed: bool,
    cursor: ListCursor,
    mode: Mode,
    open: NameBuf,
    pages: PageIndex,
    page: usize,
    truncated: bool,
}

impl Books {
    /// Reader using `buf` for the open book's text.
    pub fn new(buf: Option<&'static mut [u8]>) -> Self {
        Self {
            buf,
            len: 0,
            names: Vec::new(),
            listed: false,
            cursor: ListCursor::default(),
            mode: Mode::List,
            open: NameBuf::new(),
            pages: PageIndex::build(&[], TEXT_COLUMNS, TEXT_ROWS),
            page: 0,
            truncated: false,
        }
    }

    /// Page shown, zero-based.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Pages in the open book.
    pub fn page_count(&self) -> usize {
        self.pages.page_count()
    }

    async fn list<S: Storage>(&mut self, sd_card: &mut S) -> Result<(), AppError> {
        self.names.clear();
        if !sd_card.exists(BOOKS_ROOT).await.map_err(sd)? {
            return Ok(());
        }
        let names = &mut self.names;
        sd_card
            .list_dir(BOOKS_ROOT, |entry| {
                let is_txt = extension(&entry.name).is_some_and(|e| e.eq_ignore_ascii_case("txt"));
                if !entry.is_dir && !entry.is_hidden() && is_txt && names.push(entry.name.clone()).is_err() {
                    tracing::warn!("books: more than {} books, list truncated", MAX_BOOKS);
                }
            })
            .await
            .map_err(sd)?;
        self.names.sort_unstable_by(|a, b| {
            let a = a.bytes().map(|c| c.to_ascii_lowercase());
            a.cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
        });
        Ok(())
    }

    async fn open_book<S: Storage>(&mut self, sd_card: &mut S, index: usize) -> Result<(), AppError> {
        let Some(name) = self.names.get(index).cloned() else {
            return Ok(());
        };
        let Some(buf) = self.buf.as_deref_mut() else {
            tracing::error!("books: no text buffer");
            return Err(AppError::OutOfMemory);
        };
        let path = join(BOOKS_ROOT, &name)?;
        let size = sd_card.file_size(&path).await.map_err(sd)?.unwrap_or(0);
        let want = usize::try_from(size).unwrap_or(usize::MAX).min(buf.len());
        let mut filled = 0usize;
        while filled < want {
            let Some(dst) = buf.get_mut(filled..want) else { break };
            let n = sd_card.read_at(&path, filled as u64, dst).await.map_err(sd)?;
            if n == 0 {
                break;
            }
            filled = filled.saturating_add(n);
        }
        self.len = filled;
        self.truncated = (filled as u64) < size;
        self.pages = PageIndex::build(buf.get(..filled).unwrap_or(&[]), TEXT_COLUMNS, TEXT_ROWS);
        self.page = 0;
        self.open = name;
        self.mode = Mode::Reading;
        tracing::info!("books: {} ({} bytes, {} pages)", self.open.as_str(), filled, self.pages.page_count());
        Ok(())
    }

    fn turn(&mut self, forward: bool) -> bool {
        let last = self.pages.page_count().saturating_sub(1);
        let next = if forward {
            (self.page + 1).min(last)
        } else {
            self.page.saturating_sub(1)
        };
        let moved = next != self.page;
        self.page = next;
        moved
    }
}

impl<B: Board> Screen<B> for Books {
    async fn handle_input(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        match self.mode {
            Mode::List => {
                if self.cursor.handle(key, self.names.len()) {
                    return Ok(Outcome::Handled);
                }
                if is_back(key) {
                    return Ok(Outcome::Back);
                }
                if key == KEY_ENTER {
                    self.open_book(&mut cx.sd, self.cursor.index).await?;
                    if self.truncated {
                        cx.say("Book too long, showing start");
                    }
                    return Ok(Outcome::Handled);
                }
                Ok(Outcome::Ignored)
            }
            Mode::Reading => {
                if is_back(key) {
                    self.mode = Mode::List;
                    return Ok(Outcome::Handled);
                }
                let forward = match (nav(key), key) {
                    (Some(Nav::Right | Nav::Down), _) | (_, KEY_ENTER | b' ') => true,
                    (Some(Nav::Left | Nav::Up), _) => false,
                    _ => return Ok(Outcome::Ignored),
                };
                // Consumed even at either end of the book.
                let _ = self.turn(forward);
                Ok(Outcome::Handled)
            }
        }
    }

    async fn poll(&mut self, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        if self.listed {
            return Ok(Outcome::Ignored);
        }
        self.listed = true;
        self.list(&mut cx.sd).await?;
        Ok(Outcome::Handled)
    }

    async fn leave(&mut self, _cx: &mut Context<B>) -> Result<(), AppError> {
        // Pick up books copied while away.
        self.listed = false;
        Ok(())
    }

    fn render<D>(&mut self, frame: &mut Frame<'_, D>, _view: &View) -> Result<u32, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        match self.mode {
            Mode::List => {
                frame.text(0, 0, BOOKS_ROOT)?;
                if self.names.is_empty() {
                    frame.text(0, LIST_TOP, "No books found.")?;
                    frame.text(0, LIST_TOP + 2, "Copy .txt files to /books.")?;
                    frame.hint("q back")?;
                    return Ok(READER_REFRESH_MS);
                }
                let window = self.cursor.visible(self.names.len(), BODY_ROWS - LIST_TOP);
                for (line_no, i) in window.enumerate() {
                    if let Some(name) = self.names.get(i) {
                        frame.row(LIST_TOP + line_no, stem(name), i == self.cursor.index)?;
                    }
                }
                frame.hint("Enter read  q back")?;
            }
            Mode::Reading => {
                let text = self.buf.as_deref().and_then(|b| b.get(..self.len)).unwrap_or(&[]);
                if let Some((start, end)) = self.pages.page_range(self.page) {
                    frame.paragraph(0, BODY_ROWS, text.get(start..end).unwrap_or(&[]))?;
                }
                let mut hint: String<40> = String::new();
                let _ = write!(
                    hint,
                    "{} {}/{}",
                    stem(&self.open),
                    self.page + 1,
                    self.pages.page_count()
                );
                frame.hint(&hint)?;
            }
        }
        Ok(READER_REFRESH_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::MemStorage;

    fn leak(size: usize) -> Option<&'static mut [u8]> {
        Some(Box::leak(vec![0u8; size].into_boxed_slice()))
    }

    #[tokio::test]
    async fn test_lists_txt_sorted_case_insensitive() {
        let mut fs = MemStorage::new();
        fs.insert("/books/zeta.txt", b"z");
        fs.insert("/books/Alpha.txt", b"a");
        fs.insert("/books/cover.jpg", b"x");
        fs.insert("/books/.hidden.txt", b"h");
        let mut books = Books::new(leak(64));
        books.list(&mut fs).await.unwrap();
        let names: Vec<&str, 8> = books.names.iter().map(|n| n.as_str()).collect();
        assert_eq!(names.as_slice(), &["Alpha.txt", "zeta.txt"]);
    }

    #[tokio::test]
    async fn test_oversized_book_is_truncated_to_buffer() {
        let mut fs = MemStorage::new();
        fs.insert("/books/big.txt", &[b'a'; 100]);
        let mut books = Books::new(leak(40));
        books.list(&mut fs).await.unwrap();
        books.open_book(&mut fs, 0).await.unwrap();
        assert_eq!(books.len, 40);
        assert!(books.truncated);
    }

    #[tokio::test]
    async fn test_missing_buffer_reports_out_of_memory() {
        let mut fs = MemStorage::new();
        fs.insert("/books/a.txt", b"hello");
        let mut books = Books::new(None);
        books.list(&mut fs).await.unwrap();
        assert_eq!(books.open_book(&mut fs, 0).await, Err(AppError::OutOfMemory));
    }

    #[tokio::test]
    async fn test_pages_turn_within_bounds() {
        let mut fs = MemStorage::new();
        let text = "line\n".repeat(TEXT_ROWS * 2 + 1);
        fs.insert("/books/a.txt", text.as_bytes());
        let mut books = Books::new(leak(4096));
        books.list(&mut fs).await.unwrap();
        books.open_book(&mut fs, 0).await.unwrap();
        assert_eq!(books.page_count(), 3);
        assert!(!books.turn(false));
        assert!(books.turn(true));
        assert!(books.turn(true));
        assert!(!books.turn(true));
        assert_eq!(books.page(), 2);
    }
}
