//! Audio pipeline state machine.
//!
//! ```text
//! Idle --play--> Starting --duration seen--> Playing <--pause/resume--> Paused
//!   ^                                          |
//!   +---------------- stop / last EOF ---------+
//! ```
//!
//! The decoder picks its container parser from the file extension, so a
//! `.m4b` is renamed to `.m4a` on the card for as long as it is streamed and
//! renamed back on stop. Seeks issued before the header is parsed are
//! silently dropped by the decoder; the bookmark position is therefore held
//! as a pending seek and applied on the first tick that sees a duration.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use heapless::Vec;
use library::metadata::{TrackTags, MAX_CHAPTERS};
use library::track::{bounded, Author, Title};
use platform::audio::{AudioDecoder, EofLatch};
use platform::storage::{extension, join, stem, PathBuf};
use platform::Storage;

use crate::bookmark::Bookmark;
use crate::error::io;
use crate::playlist::Playlist;
use crate::sleep::SleepTimer;
use crate::volume::{self, VolumeKey, DEFAULT_VOLUME};
use crate::{chapters, PipelineError};

/// DAC rail settling time after power-up.
pub const DAC_SETTLE_MS: u32 = 50;

/// Seconds replayed before the saved position on open.
pub const PRE_ROLL_S: u32 = 3;

/// Restored positions at or below this start from the beginning instead.
pub const MIN_RESUME_S: u32 = 5;

/// Position sampling period (2 Hz).
pub const POSITION_SAMPLE_MS: u64 = 500;

/// Bookmark autosave period while playing.
pub const AUTOSAVE_INTERVAL_MS: u64 = 30_000;

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipelineState {
    /// No stream.
    Idle,
    /// Stream opened, header not yet parsed.
    Starting,
    /// Decoding.
    Playing,
    /// Stream open, decoder paused.
    Paused,
}

/// Notable things a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickEvent {
    /// Nothing beyond pumping.
    None,
    /// The header was parsed and any pending seek applied.
    StreamReady,
    /// The bookmark was autosaved.
    Autosaved,
    /// EOF moved on to the next track.
    Advanced,
    /// EOF on the last track; the pipeline is idle.
    Finished,
    /// The sleep timer paused playback.
    SleepExpired,
}

/// The open book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    /// Directory holding the book's files.
    pub dir: PathBuf,
    /// Title shown by the player.
    pub title: Title,
    /// Author shown by the player.
    pub author: Author,
    /// Duration from the tags (0 if unknown).
    pub duration_s: u32,
    /// Chapter starts of the current track.
    pub chapters: Vec<u32, MAX_CHAPTERS>,
}

/// Decoder, DAC power and bookmark bookkeeping for one open book.
pub struct AudioPipeline<D, P> {
    decoder: D,
    dac: P,
    eof: &'static EofLatch,
    state: PipelineState,
    book: Option<Book>,
    playlist: Playlist,
    dac_powered: bool,
    i2s_ready: bool,
    renamed: Option<(PathBuf, PathBuf)>,
    pending_seek: Option<u32>,
    stream_ready: bool,
    resume_s: u32,
    position_s: u32,
    last_sample_ms: u64,
    last_save_ms: u64,
    volume: u8,
    sleep: SleepTimer,
    tx_hold: bool,
}

fn is_m4b(path: &str) -> bool {
    extension(path).is_some_and(|e| e.eq_ignore_ascii_case("m4b"))
}

fn with_m4a(path: &str) -> Result<PathBuf, PipelineError> {
    let mut out: PathBuf = bounded(stem(path));
    out.push_str(".m4a").map_err(|_| PipelineError::PathTooLong)?;
    Ok(out)
}

impl<D: AudioDecoder, P: OutputPin> AudioPipeline<D, P> {
    /// Pipeline over `decoder`, powering the DAC through `dac`. The decoder's
    /// EOF callback must set `eof`.
    pub fn new(decoder: D, dac: P, eof: &'static EofLatch) -> Self {
        Self {
            decoder,
            dac,
            eof,
            state: PipelineState::Idle,
            book: None,
            playlist: Playlist::default(),
            dac_powered: false,
            i2s_ready: false,
            renamed: None,
            pending_seek: None,
            stream_ready: false,
            resume_s: 0,
            position_s: 0,
            last_sample_ms: 0,
            last_save_ms: 0,
            volume: DEFAULT_VOLUME,
            sleep: SleepTimer::new(),
            tx_hold: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// The open book.
    pub fn book(&self) -> Option<&Book> {
        self.book.as_ref()
    }

    /// `true` while a book is open (playing or not).
    pub fn is_open(&self) -> bool {
        self.book.is_some()
    }

    /// `true` while the stream is starting or playing.
    pub fn is_active(&self) -> bool {
        matches!(self.state, PipelineState::Starting | PipelineState::Playing)
    }

    /// Playlist of the open book.
    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Position `play` will start from.
    pub fn resume_s(&self) -> u32 {
        self.resume_s
    }

    /// Last sampled stream position; 0 while idle.
    pub fn position_s(&self) -> u32 {
        if self.state == PipelineState::Idle {
            0
        } else {
            self.position_s
        }
    }

    /// Position the chapter indicator refers to.
    pub fn chapter_position_s(&self) -> u32 {
        if self.state == PipelineState::Idle {
            self.resume_s
        } else {
            self.position_s
        }
    }

    /// Stream duration once parsed, else the tag duration.
    pub fn duration_s(&self) -> u32 {
        match self.decoder.duration_s() {
            0 => self.book.as_ref().map_or(0, |b| b.duration_s),
            d => d,
        }
    }

    /// Chapter starts of the current track.
    pub fn chapters(&self) -> &[u32] {
        self.book.as_ref().map_or(&[], |b| b.chapters.as_slice())
    }

    /// Volume step.
    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Sleep timer time left.
    pub fn sleep_remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.sleep.remaining(now_ms)
    }

    /// Seek waiting for the header.
    pub fn pending_seek(&self) -> Option<u32> {
        self.pending_seek
    }

    /// `true` once the decoder reported a duration for this stream.
    pub fn stream_ready(&self) -> bool {
        self.stream_ready
    }

    /// `true` while the DAC rail is on.
    pub fn dac_powered(&self) -> bool {
        self.dac_powered
    }

    /// `true` while a `.m4b` is renamed on the card.
    pub fn is_renamed(&self) -> bool {
        self.renamed.is_some()
    }

    /// Open `name` in `dir` with its parsed tags. Closes any open book
    /// first, then restores volume and position from the bookmark.
    pub async fn open<S: Storage>(
        &mut self,
        sd: &mut S,
        dir: &str,
        name: &str,
        tags: &TrackTags,
        playlist: Playlist,
    ) -> Result<(), PipelineError> {
        if self.book.is_some() {
            self.close(sd).await?;
        }
        let mark = match Bookmark::load(sd, name).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("audio: bookmark unreadable: {:?}", e);
                None
            }
        };
        let (saved, volume) = mark.map_or((0, self.volume), |m| (m.position_s, m.volume));
        self.resume_s = saved.saturating_sub(PRE_ROLL_S);
        self.volume = volume;
        self.decoder.set_volume(volume);
        self.position_s = 0;
        self.book = Some(Book {
            dir: bounded(dir),
            title: tags.title.clone(),
            author: tags.author.clone(),
            duration_s: tags.duration_s,
            chapters: tags.chapters.clone(),
        });
        self.playlist = if playlist.current() == Some(name) {
            playlist
        } else {
            Playlist::new([name], name)
        };
        tracing::info!("audio: opened {} at {}s, volume {}", name, self.resume_s, volume);
        Ok(())
    }

    /// Enter: start when idle, pause when playing, resume when paused.
    pub async fn toggle<S: Storage, T: DelayNs>(
        &mut self,
        sd: &mut S,
        delay: &mut T,
        now_ms: u64,
    ) -> Result<(), PipelineError> {
        match self.state {
            PipelineState::Idle => self.play(sd, delay, now_ms).await,
            PipelineState::Playing => self.pause(sd, now_ms).await,
            PipelineState::Paused => {
                self.resume(now_ms);
                Ok(())
            }
            PipelineState::Starting => Ok(()),
        }
    }

    /// Start the current track from the resume position.
    pub async fn play<S: Storage, T: DelayNs>(
        &mut self,
        sd: &mut S,
        delay: &mut T,
        now_ms: u64,
    ) -> Result<(), PipelineError> {
        if self.book.is_none() {
            return Err(PipelineError::NoBook);
        }
        match self.state {
            PipelineState::Paused => {
                self.resume(now_ms);
                return Ok(());
            }
            PipelineState::Starting | PipelineState::Playing => return Ok(()),
            PipelineState::Idle => {}
        }
        let was_off = !self.dac_powered;
        self.dac.set_high().map_err(|e| {
            tracing::warn!("audio: DAC enable failed: {:?}", e);
            PipelineError::Dac
        })?;
        self.dac_powered = true;
        if was_off {
            delay.delay_ms(DAC_SETTLE_MS).await;
        }
        self.start_stream(sd, now_ms).await
    }

    async fn start_stream<S: Storage>(&mut self, sd: &mut S, now_ms: u64) -> Result<(), PipelineError> {
        let book = self.book.as_ref().ok_or(PipelineError::NoBook)?;
        let track = self.playlist.current().ok_or(PipelineError::NoBook)?;
        let path = join(&book.dir, track)?;
        if !self.i2s_ready {
            self.decoder.init_output().map_err(|e| {
                tracing::warn!("audio: I2S init failed: {:?}", e);
                PipelineError::Decoder
            })?;
            self.i2s_ready = true;
        }
        let stream = self.prepare_rename(sd, &path).await?;
        // A latch left over from the previous stream must not end this one.
        let _ = self.eof.take();
        if let Err(e) = self.decoder.connect(&stream) {
            tracing::warn!("audio: cannot open {}: {:?}", stream.as_str(), e);
            self.restore_rename(sd).await?;
            return Err(PipelineError::Decoder);
        }
        self.decoder.set_volume(self.volume);
        self.pending_seek = (self.resume_s > MIN_RESUME_S).then_some(self.resume_s);
        self.stream_ready = false;
        self.position_s = self.resume_s;
        self.last_sample_ms = now_ms;
        self.last_save_ms = now_ms;
        self.state = PipelineState::Starting;
        tracing::info!("audio: starting {}", stream.as_str());
        Ok(())
    }

    /// Pause and save the bookmark.
    pub async fn pause<S: Storage>(&mut self, sd: &mut S, now_ms: u64) -> Result<(), PipelineError> {
        if self.state != PipelineState::Playing {
            return Ok(());
        }
        if !self.tx_hold {
            self.decoder.toggle_pause();
        }
        self.position_s = self.decoder.position_s();
        self.state = PipelineState::Paused;
        tracing::info!("audio: paused at {}s", self.position_s);
        self.save_bookmark(sd, now_ms).await
    }

    /// Resume from pause.
    pub fn resume(&mut self, now_ms: u64) {
        if self.state != PipelineState::Paused {
            return;
        }
        if !self.tx_hold {
            self.decoder.toggle_pause();
        }
        self.last_sample_ms = now_ms;
        self.state = PipelineState::Playing;
        tracing::info!("audio: resumed");
    }

    /// Stop: save the bookmark, restore any rename, power the DAC down.
    pub async fn stop<S: Storage>(&mut self, sd: &mut S, now_ms: u64) -> Result<(), PipelineError> {
        if self.state != PipelineState::Idle {
            if self.stream_ready {
                self.position_s = self.decoder.position_s();
                if let Err(e) = self.save_bookmark(sd, now_ms).await {
                    tracing::warn!("audio: bookmark on stop failed: {:?}", e);
                }
                self.resume_s = self.position_s.saturating_sub(PRE_ROLL_S);
            }
            self.decoder.stop();
            tracing::info!("audio: stopped at {}s", self.position_s);
        }
        self.state = PipelineState::Idle;
        self.pending_seek = None;
        self.stream_ready = false;
        self.i2s_ready = false;
        self.tx_hold = false;
        self.sleep.cancel();
        let restored = self.restore_rename(sd).await;
        if self.dac_powered {
            self.dac_powered = false;
            self.dac.set_low().map_err(|e| {
                tracing::warn!("audio: DAC disable failed: {:?}", e);
                PipelineError::Dac
            })?;
        }
        restored
    }

    /// Stop and forget the book. Also undoes a `.m4b` rename left behind
    /// by an earlier unclean exit.
    pub async fn close<S: Storage>(&mut self, sd: &mut S) -> Result<(), PipelineError> {
        let now = self.last_sample_ms;
        self.stop(sd, now).await?;
        if let (Some(book), Some(track)) = (self.book.as_ref(), self.playlist.current()) {
            let path = join(&book.dir, track)?;
            if is_m4b(&path) {
                let temp = with_m4a(&path)?;
                if sd.exists(&temp).await.map_err(io)? && !sd.exists(&path).await.map_err(io)? {
                    tracing::warn!("audio: restoring stray {}", temp.as_str());
                    sd.rename(&temp, &path).await.map_err(io)?;
                }
            }
        }
        self.book = None;
        self.playlist = Playlist::default();
        self.resume_s = 0;
        self.position_s = 0;
        Ok(())
    }

    /// One cooperative step: pump the decoder, apply a pending seek,
    /// sample the position, autosave, handle EOF and the sleep timer.
    pub async fn tick<S: Storage>(&mut self, sd: &mut S, now_ms: u64) -> Result<TickEvent, PipelineError> {
        match self.state {
            PipelineState::Idle | PipelineState::Paused => return Ok(TickEvent::None),
            PipelineState::Starting | PipelineState::Playing => {}
        }
        if self.sleep.take_expired(now_ms) {
            tracing::info!("audio: sleep timer expired");
            if self.state == PipelineState::Playing {
                self.pause(sd, now_ms).await?;
            }
            return Ok(TickEvent::SleepExpired);
        }
        if self.tx_hold {
            return Ok(TickEvent::None);
        }

        self.decoder.pump();
        let mut event = TickEvent::None;

        if self.state == PipelineState::Starting && self.decoder.duration_s() > 0 {
            self.stream_ready = true;
            self.state = PipelineState::Playing;
            if let Some(target) = self.pending_seek.take() {
                if self.decoder.seek_s(target) {
                    tracing::debug!("audio: resumed at {}s", target);
                } else {
                    tracing::warn!("audio: seek to {}s refused", target);
                }
            }
            self.position_s = self.decoder.position_s();
            self.last_sample_ms = now_ms;
            event = TickEvent::StreamReady;
        }

        if now_ms.saturating_sub(self.last_sample_ms) >= POSITION_SAMPLE_MS {
            self.position_s = self.decoder.position_s();
            self.last_sample_ms = now_ms;
        }

        if self.eof.take() {
            return self.on_eof(sd, now_ms).await;
        }

        if self.state == PipelineState::Playing
            && now_ms.saturating_sub(self.last_save_ms) >= AUTOSAVE_INTERVAL_MS
        {
            self.position_s = self.decoder.position_s();
            self.save_bookmark(sd, now_ms).await?;
            event = TickEvent::Autosaved;
        }
        Ok(event)
    }

    async fn on_eof<S: Storage>(&mut self, sd: &mut S, now_ms: u64) -> Result<TickEvent, PipelineError> {
        self.position_s = self.decoder.position_s();
        if self.playlist.len() > 1 && self.playlist.advance().is_some() {
            self.decoder.stop();
            self.i2s_ready = false;
            self.restore_rename(sd).await?;
            if let Some(book) = self.book.as_mut() {
                book.chapters.clear();
                book.duration_s = 0;
            }
            self.resume_s = 0;
            tracing::info!("audio: next track {}", self.playlist.current().unwrap_or(""));
            self.start_stream(sd, now_ms).await?;
            return Ok(TickEvent::Advanced);
        }
        tracing::info!("audio: end of book");
        self.stop(sd, now_ms).await?;
        Ok(TickEvent::Finished)
    }

    /// `[` / `]`: jump to the previous or next chapter.
    pub fn seek_chapter(&mut self, forward: bool, now_ms: u64) -> bool {
        let pos = self.chapter_position_s();
        let starts = self.chapters();
        let target = if forward {
            chapters::next_start(starts, pos)
        } else {
            chapters::prev_start(starts, pos)
        };
        let Some(target) = target else {
            return false;
        };
        match self.state {
            PipelineState::Idle => self.resume_s = target,
            PipelineState::Starting => {
                self.pending_seek = Some(target);
                self.position_s = target;
            }
            PipelineState::Playing | PipelineState::Paused => {
                if !self.decoder.seek_s(target) {
                    return false;
                }
                self.position_s = target;
                self.last_sample_ms = now_ms;
            }
        }
        true
    }

    /// `+` / `-`: step the volume. Saved with the next bookmark.
    pub fn adjust_volume(&mut self, key: VolumeKey) -> u8 {
        self.volume = volume::step(self.volume, key);
        self.decoder.set_volume(self.volume);
        self.volume
    }

    /// `Z`: arm or disarm the sleep timer.
    pub fn toggle_sleep(&mut self, now_ms: u64) -> bool {
        let armed = self.sleep.toggle(now_ms);
        tracing::info!("audio: sleep timer {}", if armed { "armed" } else { "off" });
        armed
    }

    /// The mesh stack is about to transmit (`true`) or finished (`false`).
    /// Decoding holds at the next chunk boundary for the duration.
    pub fn set_tx_pending(&mut self, pending: bool) {
        if pending == self.tx_hold {
            return;
        }
        self.tx_hold = pending;
        if self.state == PipelineState::Playing {
            self.decoder.toggle_pause();
        }
    }

    async fn save_bookmark<S: Storage>(&mut self, sd: &mut S, now_ms: u64) -> Result<(), PipelineError> {
        let Some(track) = self.playlist.current() else {
            return Ok(());
        };
        let mark = Bookmark {
            file_name: bounded(track),
            position_s: self.position_s,
            volume: self.volume,
        };
        mark.save(sd).await?;
        self.last_save_ms = now_ms;
        Ok(())
    }

    async fn prepare_rename<S: Storage>(&mut self, sd: &mut S, path: &str) -> Result<PathBuf, PipelineError> {
        if !is_m4b(path) {
            return Ok(bounded(path));
        }
        let temp = with_m4a(path)?;
        if self.renamed.is_none() {
            let stray = sd.exists(&temp).await.map_err(io)? && !sd.exists(path).await.map_err(io)?;
            if !stray {
                sd.rename(path, &temp).await.map_err(io)?;
            }
            tracing::debug!("audio: {} -> {}", path, temp.as_str());
            self.renamed = Some((bounded(path), temp.clone()));
        }
        Ok(temp)
    }

    async fn restore_rename<S: Storage>(&mut self, sd: &mut S) -> Result<(), PipelineError> {
        let Some((original, temp)) = self.renamed.take() else {
            return Ok(());
        };
        if let Err(e) = sd.rename(&temp, &original).await {
            self.renamed = Some((original, temp));
            return Err(io(e));
        }
        tracing::debug!("audio: restored {}", original.as_str());
        Ok(())
    }
}
