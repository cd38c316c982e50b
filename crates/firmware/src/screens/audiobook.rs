//! Audiobook browser and player.
//!
//! The file list scans `/audiobooks` on first entry (through the metadata
//! cache, see [`library::Library`]). Opening a file hands it to the shared
//! [`AudioPipeline`](playback::AudioPipeline) in the [`Context`], which keeps
//! playing while the user is on other screens.

use core::fmt::Write as _;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::DrawTarget;
use heapless::String;
use library::title::from_file_name;
use library::track::bounded;
use library::{Library, MediaKind, TagParser, TrackTags};
use platform::config::AUDIOBOOK_ROOT;
use platform::storage::{join, NameBuf, PathBuf};
use playback::volume::volume_key;
use ui::keys::{is_back, KEY_ENTER};
use ui::screen::AudiobookMode;
use ui::PlaybackState;

use super::{Context, ListCursor, Outcome, Screen, View};
use crate::board::Board;
use crate::error::AppError;
use crate::render::{Frame, BODY_ROWS};

/// Redraw period of the player while it shows a moving clock.
pub const PLAYER_REFRESH_MS: u32 = 1_000;

/// Redraw period of the player when nothing moves.
pub const PLAYER_IDLE_REFRESH_MS: u32 = 5_000;

/// Redraw period of the file list.
pub const LIST_REFRESH_MS: u32 = 2_000;

const LIST_TOP: usize = 2;
const LIST_ROWS: usize = BODY_ROWS - LIST_TOP;

/// Audiobook screen.
pub struct Audiobook<B: Board> {
    library: Library,
    tags: B::Tags,
    mode: AudiobookMode,
    cursor: ListCursor,
    scanned: bool,
}

impl<B: Board> Audiobook<B> {
    /// Screen that scans on first poll.
    pub fn new(tags: B::Tags) -> Self {
        Self {
            library: Library::new(),
            tags,
            mode: AudiobookMode::FileList,
            cursor: ListCursor::default(),
            scanned: false,
        }
    }

    /// Current sub-mode.
    pub fn mode(&self) -> AudiobookMode {
        self.mode
    }

    /// Directory listing.
    pub fn library(&self) -> &Library {
        &self.library
    }

    /// The open book was closed elsewhere (Escape).
    pub fn book_closed(&mut self) {
        self.mode = AudiobookMode::FileList;
    }

    async fn parse_tags(&mut self, cx: &mut Context<B>, dir: &str, name: &str) -> Result<TrackTags, AppError> {
        let path: PathBuf = join(dir, name)?;
        let kind = MediaKind::from_name(name).unwrap_or(MediaKind::Mp3);
        let mut tags = match self.tags.parse(&mut cx.sd, &path, kind).await {
            Ok(tags) => tags,
            Err(e) => {
                tracing::warn!("audiobook: tags of {} unreadable: {:?}", name, e);
                TrackTags::default()
            }
        };
        tags.normalize();
        if tags.title.is_empty() {
            tags.title = from_file_name(name, dir != AUDIOBOOK_ROOT);
        }
        Ok(tags)
    }

    async fn open_file(&mut self, cx: &mut Context<B>, index: usize) -> Result<Outcome, AppError> {
        let Some(row) = self.library.row(index).cloned() else {
            return Ok(Outcome::Ignored);
        };
        let dir: PathBuf = bounded(self.library.dir());
        let mut tags = self.parse_tags(cx, &dir, &row.name).await?;
        if !row.title.is_empty() {
            tags.title = row.title.clone();
        }
        if tags.author.is_empty() {
            tags.author = row.author.clone();
        }
        let playlist = playback::Playlist::new(self.library.playable(), &row.name);
        cx.audio.open(&mut cx.sd, &dir, &row.name, &tags, playlist).await?;
        self.mode = AudiobookMode::Player;
        Ok(Outcome::Handled)
    }

    async fn list_key(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        if self.cursor.handle(key, self.library.rows().len()) {
            return Ok(Outcome::Handled);
        }
        if is_back(key) {
            if self.library.at_root() {
                return Ok(Outcome::Back);
            }
            // Row 0 is ".." inside a sub-directory.
            self.library.open_row(&mut cx.sd, &mut self.tags, 0).await?;
            self.cursor.reset();
            return Ok(Outcome::Handled);
        }
        match key {
            KEY_ENTER => {
                let index = self.cursor.index;
                let Some(row) = self.library.row(index) else {
                    return Ok(Outcome::Ignored);
                };
                if row.is_dir() {
                    self.library.open_row(&mut cx.sd, &mut self.tags, index).await?;
                    self.cursor.reset();
                    Ok(Outcome::Handled)
                } else {
                    self.open_file(cx, index).await
                }
            }
            b'p' | b'P' if cx.audio.is_open() => {
                self.mode = AudiobookMode::Player;
                Ok(Outcome::Handled)
            }
            b'r' | b'R' => {
                self.library.invalidate();
                self.scanned = false;
                Ok(Outcome::Handled)
            }
            _ => Ok(Outcome::Ignored),
        }
    }

    async fn next_track(&mut self, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        let mut playlist = cx.audio.playlist().clone();
        let Some(next) = playlist.advance().map(bounded::<{ platform::storage::MAX_NAME }>) else {
            cx.say("Last track");
            return Ok(Outcome::Handled);
        };
        let next: NameBuf = next;
        let Some(dir) = cx.audio.book().map(|b| b.dir.clone()) else {
            return Ok(Outcome::Ignored);
        };
        let was_active = cx.audio.is_active();
        let tags = self.parse_tags(cx, &dir, &next).await?;
        cx.audio.open(&mut cx.sd, &dir, &next, &tags, playlist).await?;
        if was_active {
            let now = cx.now();
            cx.audio.play(&mut cx.sd, &mut cx.delay, now).await?;
        }
        Ok(Outcome::Handled)
    }

    async fn player_key(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        let now = cx.now();
        if let Some(vk) = volume_key(key) {
            cx.audio.adjust_volume(vk);
            return Ok(Outcome::Handled);
        }
        if is_back(key) {
            self.mode = AudiobookMode::FileList;
            self.library.refresh_bookmarks(&mut cx.sd).await?;
            return Ok(Outcome::Handled);
        }
        match key {
            KEY_ENTER => {
                cx.audio.toggle(&mut cx.sd, &mut cx.delay, now).await?;
                Ok(Outcome::Handled)
            }
            b'[' | b']' => {
                if !cx.audio.seek_chapter(key == b']', now) {
                    cx.say("No chapter there");
                }
                Ok(Outcome::Handled)
            }
            b'n' | b'N' => self.next_track(cx).await,
            b'z' | b'Z' => {
                let armed = cx.audio.toggle_sleep(now);
                cx.say(if armed { "Sleep timer 45 min" } else { "Sleep timer off" });
                Ok(Outcome::Handled)
            }
            _ => Ok(Outcome::Ignored),
        }
    }

    fn render_list<D>(&mut self, frame: &mut Frame<'_, D>) -> Result<u32, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        frame.text(0, 0, self.library.dir())?;
        if !self.scanned {
            frame.text(0, LIST_TOP, "Scanning...")?;
            frame.hint("q back")?;
            return Ok(LIST_REFRESH_MS);
        }
        let rows = self.library.rows();
        if rows.is_empty() {
            frame.text(0, LIST_TOP, "No audiobooks found.")?;
            frame.text(0, LIST_TOP + 2, "Copy .m4b, .mp3 or .wav files")?;
            frame.text(0, LIST_TOP + 3, "to /audiobooks on the SD card.")?;
            frame.hint("q back  r rescan")?;
            return Ok(LIST_REFRESH_MS);
        }
        let window = self.cursor.visible(rows.len(), LIST_ROWS);
        for (line_no, i) in window.enumerate() {
            let Some(entry) = rows.get(i) else { break };
            let mut line: String<80> = String::new();
            if entry.is_dir() {
                let _ = write!(line, "[{}]", entry.title);
            } else {
                let mark = if entry.has_bookmark { '*' } else { ' ' };
                let _ = write!(line, "{}{}", mark, entry.title);
                if !entry.author.is_empty() {
                    let _ = write!(line, " - {}", entry.author);
                }
            }
            frame.row(LIST_TOP + line_no, &line, i == self.cursor.index)?;
        }
        frame.hint("Enter open  p player  q back")?;
        Ok(LIST_REFRESH_MS)
    }

    fn render_player<D>(&mut self, frame: &mut Frame<'_, D>, view: &View) -> Result<u32, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let Some(audio) = &view.audio else {
            frame.text(0, 2, "No book open")?;
            frame.hint("q list")?;
            return Ok(PLAYER_IDLE_REFRESH_MS);
        };
        let p = &audio.player;
        frame.title(0, &audio.title)?;
        frame.text(0, 2, &audio.author)?;
        if audio.tracks > 1 {
            let mut line: String<24> = String::new();
            let _ = write!(line, "Track {}/{}", audio.track, audio.tracks);
            frame.text(0, 3, &line)?;
        }
        frame.text(0, 5, &p.chapter)?;
        frame.text(0, 6, p.state)?;
        frame.text(0, 8, &p.time)?;
        frame.progress(9, p.progress_permille)?;
        frame.text(0, 11, &p.volume)?;
        frame.text(0, 12, &p.sleep)?;
        frame.hint("Enter play  [ ] ch  +/- vol  z sleep")?;
        if audio.state == PlaybackState::Playing {
            Ok(PLAYER_REFRESH_MS)
        } else {
            Ok(PLAYER_IDLE_REFRESH_MS)
        }
    }
}

impl<B: Board> Screen<B> for Audiobook<B> {
    async fn handle_input(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        match self.mode {
            AudiobookMode::FileList => self.list_key(key, cx).await,
            AudiobookMode::Player => self.player_key(key, cx).await,
        }
    }

    async fn poll(&mut self, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        if self.scanned {
            return Ok(Outcome::Ignored);
        }
        self.scanned = true;
        let dir: PathBuf = bounded(self.library.dir());
        self.library.enter(&mut cx.sd, &mut self.tags, &dir).await?;
        tracing::info!(
            "audiobook: {} rows, {} cached, {} parsed",
            self.library.rows().len(),
            self.library.cache_hits(),
            self.library.parsed()
        );
        self.cursor.reset();
        Ok(Outcome::Handled)
    }

    fn render<D>(&mut self, frame: &mut Frame<'_, D>, view: &View) -> Result<u32, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        match self.mode {
            AudiobookMode::FileList => self.render_list(frame),
            AudiobookMode::Player => self.render_player(frame, view),
        }
    }
}
