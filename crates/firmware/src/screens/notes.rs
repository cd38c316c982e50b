//! Notes: list, create, edit, rename and delete `/notes/*.txt`.
//!
//! The editor saves on the emoji key and whenever the screen is left with
//! unsaved changes, so Home, Escape and sleep never lose text.

use core::fmt::Write as _;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::DrawTarget;
use heapless::String;
use platform::config::TEXT_COLUMNS;
use platform::storage::NameBuf;
use platform::Storage;
use store::notes::{self, NoteList, MAX_TITLE};
use store::paths::note_path;
use store::StoreError;
use text::{Editor, EditorError, EDITOR_CAPACITY};
use ui::keys::{classify, is_back, KeyClass, Nav, KEY_ENTER};
use ui::screen::NotesMode;

use super::{Context, FieldEvent, ListCursor, Outcome, Screen, TextField, View};
use crate::board::Board;
use crate::error::{sd, AppError};
use crate::render::{Frame, BODY_ROWS};

/// Redraw period while typing.
pub const EDIT_REFRESH_MS: u32 = 700;

/// Redraw period of the list and dialogs.
pub const LIST_REFRESH_MS: u32 = 30_000;

const LIST_TOP: usize = 2;
const EDIT_ROWS: usize = BODY_ROWS - 1;
const LOAD_CHUNK: usize = 512;

/// Notes screen.
pub struct Notes {
    names: NoteList,
    listed: bool,
    cursor: ListCursor,
    mode: NotesMode,
    field: TextField<MAX_TITLE>,
    editor: Editor,
    open: NameBuf,
    top: usize,
}

impl Default for Notes {
    fn default() -> Self {
        Self::new()
    }
}

impl Notes {
    /// Screen that lists notes on first poll.
    pub fn new() -> Self {
        Self {
            names: NoteList::new(),
            listed: false,
            cursor: ListCursor::default(),
            mode: NotesMode::List,
            field: TextField::new(),
            editor: Editor::new(TEXT_COLUMNS),
            open: NameBuf::new(),
            top: 0,
        }
    }

    /// Current sub-mode.
    pub fn mode(&self) -> NotesMode {
        self.mode
    }

    /// Note file names as listed.
    pub fn names(&self) -> &[NameBuf] {
        &self.names
    }

    /// Text of the note being edited.
    pub fn text(&self) -> &[u8] {
        self.editor.as_bytes()
    }

    async fn refresh<S: Storage>(&mut self, sd_card: &mut S) -> Result<(), AppError> {
        self.names = notes::list(sd_card).await?;
        self.cursor.clamp(self.names.len());
        self.listed = true;
        Ok(())
    }

    fn selected(&self) -> Option<NameBuf> {
        self.names.get(self.cursor.index).cloned()
    }

    fn select(&mut self, name: &str) {
        if let Some(i) = self.names.iter().position(|n| n.as_str() == name) {
            self.cursor.index = i;
        }
    }

    /// Read a note straight into the editor in chunks.
    async fn load<S: Storage>(&mut self, sd_card: &mut S, name: &str) -> Result<(), AppError> {
        let path = note_path(name)?;
        let size = sd_card
            .file_size(&path)
            .await
            .map_err(sd)?
            .ok_or(AppError::Store(StoreError::NotFound))?;
        if size > EDITOR_CAPACITY as u64 {
            return Err(EditorError::TooLarge.into());
        }
        let mut editor = Editor::new(TEXT_COLUMNS);
        let mut chunk = [0u8; LOAD_CHUNK];
        let mut offset = 0u64;
        loop {
            let n = sd_card.read_at(&path, offset, &mut chunk).await.map_err(sd)?;
            if n == 0 {
                break;
            }
            editor.insert_bytes(chunk.get(..n).unwrap_or(&[]))?;
            offset = offset.saturating_add(n as u64);
        }
        editor.mark_saved();
        self.editor = editor;
        self.open.clear();
        self.open
            .push_str(name)
            .map_err(|_| AppError::Store(StoreError::PathTooLong))?;
        self.top = 0;
        self.mode = NotesMode::Edit;
        tracing::info!("notes: opened {} ({} bytes)", name, offset);
        Ok(())
    }

    async fn save<S: Storage>(&mut self, sd_card: &mut S) -> Result<(), AppError> {
        if self.mode != NotesMode::Edit || !self.editor.is_dirty() {
            return Ok(());
        }
        notes::save(sd_card, &self.open, self.editor.as_bytes()).await?;
        self.editor.mark_saved();
        tracing::info!("notes: saved {} ({} bytes)", self.open.as_str(), self.editor.len());
        Ok(())
    }

    async fn list_key<B: Board>(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        if self.cursor.handle(key, self.names.len()) {
            return Ok(Outcome::Handled);
        }
        if is_back(key) {
            return Ok(Outcome::Back);
        }
        match key {
            KEY_ENTER => {
                let Some(name) = self.selected() else {
                    return Ok(Outcome::Ignored);
                };
                self.load(&mut cx.sd, &name).await?;
                Ok(Outcome::Handled)
            }
            b'n' | b'N' => {
                self.field.clear();
                self.mode = NotesMode::NewName;
                Ok(Outcome::Handled)
            }
            b'r' | b'R' => {
                let Some(name) = self.selected() else {
                    return Ok(Outcome::Ignored);
                };
                self.field.set(notes::title_of(&name));
                self.mode = NotesMode::Rename;
                Ok(Outcome::Handled)
            }
            b'x' | b'X' if self.selected().is_some() => {
                self.mode = NotesMode::ConfirmDelete;
                Ok(Outcome::Handled)
            }
            _ => Ok(Outcome::Ignored),
        }
    }

    async fn name_key<B: Board>(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        match self.field.handle(key) {
            FieldEvent::None => Ok(Outcome::Ignored),
            FieldEvent::Changed => Ok(Outcome::Handled),
            FieldEvent::Cancel => {
                self.mode = NotesMode::List;
                Ok(Outcome::Handled)
            }
            FieldEvent::Submit => {
                if self.mode == NotesMode::NewName {
                    let name = notes::create(&mut cx.sd, self.field.as_str()).await?;
                    self.refresh(&mut cx.sd).await?;
                    self.select(&name);
                    self.load(&mut cx.sd, &name).await?;
                } else {
                    let Some(from) = self.selected() else {
                        self.mode = NotesMode::List;
                        return Ok(Outcome::Handled);
                    };
                    // Stay in the list on failure; the banner says why.
                    self.mode = NotesMode::List;
                    let name = notes::rename(&mut cx.sd, &from, self.field.as_str()).await?;
                    self.refresh(&mut cx.sd).await?;
                    self.select(&name);
                }
                Ok(Outcome::Handled)
            }
        }
    }

    async fn delete_key<B: Board>(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        self.mode = NotesMode::List;
        if matches!(key, b'y' | b'Y') {
            if let Some(name) = self.selected() {
                notes::delete(&mut cx.sd, &name).await?;
                tracing::info!("notes: deleted {}", name.as_str());
                self.refresh(&mut cx.sd).await?;
                cx.say("Note deleted");
            }
        }
        Ok(Outcome::Handled)
    }

    async fn edit_key<B: Board>(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        match classify(key) {
            KeyClass::Printable(b) => self.editor.insert_char(char::from(b))?,
            KeyClass::Enter => self.editor.insert_char('\n')?,
            KeyClass::Backspace => self.editor.backspace(),
            KeyClass::ShiftBackspace => self.editor.delete_word(),
            KeyClass::Arrow(Nav::Left) => self.editor.left(),
            KeyClass::Arrow(Nav::Right) => self.editor.right(),
            KeyClass::Arrow(Nav::Up) => self.editor.up(),
            KeyClass::Arrow(Nav::Down) => self.editor.down(),
            KeyClass::Emoji => {
                self.save(&mut cx.sd).await?;
                self.mode = NotesMode::List;
                self.refresh(&mut cx.sd).await?;
                cx.say("Saved");
            }
            KeyClass::Other(_) => return Ok(Outcome::Ignored),
        }
        Ok(Outcome::Handled)
    }

    fn render_list<D>(&mut self, frame: &mut Frame<'_, D>) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        frame.text(0, 0, "Notes")?;
        if self.names.is_empty() {
            frame.text(0, LIST_TOP, "No notes yet.")?;
        }
        let window = self.cursor.visible(self.names.len(), BODY_ROWS - LIST_TOP);
        for (line_no, i) in window.enumerate() {
            if let Some(name) = self.names.get(i) {
                frame.row(LIST_TOP + line_no, &notes::display_title(name), i == self.cursor.index)?;
            }
        }
        Ok(())
    }

    fn render_editor<D>(&mut self, frame: &mut Frame<'_, D>) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let mut head: String<64> = String::new();
        let _ = write!(head, "{}", notes::title_of(&self.open));
        if self.editor.is_dirty() {
            let _ = head.push('*');
        }
        frame.row(0, &head, true)?;
        self.top = self.editor.scroll_top(self.top, EDIT_ROWS);
        for r in 0..EDIT_ROWS {
            let Some((start, end)) = self.editor.line_range(self.top + r) else { break };
            frame.bytes(1 + r, self.editor.as_bytes().get(start..end).unwrap_or(&[]))?;
        }
        let (line, col) = self.editor.cursor_line_col();
        if line >= self.top && line < self.top + EDIT_ROWS {
            frame.caret(col, 1 + line - self.top)?;
        }
        Ok(())
    }
}

impl<B: Board> Screen<B> for Notes {
    async fn handle_input(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        match self.mode {
            NotesMode::List => self.list_key(key, cx).await,
            NotesMode::NewName | NotesMode::Rename => self.name_key(key, cx).await,
            NotesMode::ConfirmDelete => self.delete_key(key, cx).await,
            NotesMode::Edit => self.edit_key(key, cx).await,
        }
    }

    async fn poll(&mut self, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        if self.listed {
            return Ok(Outcome::Ignored);
        }
        self.refresh(&mut cx.sd).await?;
        Ok(Outcome::Handled)
    }

    async fn leave(&mut self, cx: &mut Context<B>) -> Result<(), AppError> {
        let saved = self.save(&mut cx.sd).await;
        if matches!(self.mode, NotesMode::NewName | NotesMode::Rename | NotesMode::ConfirmDelete) {
            self.mode = NotesMode::List;
        }
        self.listed = false;
        saved
    }

    fn render<D>(&mut self, frame: &mut Frame<'_, D>, _view: &View) -> Result<u32, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        match self.mode {
            NotesMode::List => {
                self.render_list(frame)?;
                frame.hint("Enter open  n new  r rename  x del")?;
            }
            NotesMode::NewName | NotesMode::Rename => {
                self.render_list(frame)?;
                let prompt = if self.mode == NotesMode::NewName {
                    "New note title:"
                } else {
                    "Rename to:"
                };
                let y = BODY_ROWS - 3;
                frame.row(y, prompt, true)?;
                frame.text(0, y + 1, &self.field.display())?;
                frame.hint("Enter ok  Bksp on empty cancels")?;
            }
            NotesMode::ConfirmDelete => {
                self.render_list(frame)?;
                let mut line: String<64> = String::new();
                if let Some(name) = self.names.get(self.cursor.index) {
                    let _ = write!(line, "Delete {}?", notes::title_of(name));
                }
                frame.row(BODY_ROWS - 2, &line, true)?;
                frame.hint("y delete  any other key keeps it")?;
            }
            NotesMode::Edit => {
                self.render_editor(frame)?;
                frame.hint("Emoji key saves and closes")?;
                return Ok(EDIT_REFRESH_MS);
            }
        }
        Ok(LIST_REFRESH_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::{MemStorage, StorageOp};

    #[tokio::test]
    async fn test_load_reads_in_chunks_and_is_clean() {
        let fs = MemStorage::new();
        let body = "x".repeat(LOAD_CHUNK * 2 + 17);
        fs.insert("/notes/long.txt", body.as_bytes());
        let mut n = Notes::new();
        n.load(&mut fs.clone(), "long.txt").await.unwrap();
        assert_eq!(n.text(), body.as_bytes());
        assert_eq!(n.mode(), NotesMode::Edit);
        assert!(!n.editor.is_dirty());
    }

    #[tokio::test]
    async fn test_oversized_note_is_refused() {
        let fs = MemStorage::new();
        fs.insert("/notes/huge.txt", &vec![b'a'; EDITOR_CAPACITY + 1]);
        let mut n = Notes::new();
        let err = n.load(&mut fs.clone(), "huge.txt").await.unwrap_err();
        assert_eq!(err, AppError::Editor(EditorError::TooLarge));
        assert_eq!(n.mode(), NotesMode::List);
    }

    #[tokio::test]
    async fn test_save_only_writes_when_dirty() {
        let fs = MemStorage::new();
        fs.insert("/notes/a.txt", b"hi");
        let mut sd_card = fs.clone();
        let mut n = Notes::new();
        n.load(&mut sd_card, "a.txt").await.unwrap();
        fs.reset_counts();
        n.save(&mut sd_card).await.unwrap();
        assert_eq!(fs.count(StorageOp::Write), 0);
        n.editor.insert_char('!').unwrap();
        n.save(&mut sd_card).await.unwrap();
        assert_eq!(fs.get("/notes/a.txt").unwrap(), b"hi!");
    }
}
