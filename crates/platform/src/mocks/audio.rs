//! Scripted audio decoder.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{MemStorage, MockClock};
use crate::audio::{AudioDecoder, EofLatch, MAX_VOLUME};
use crate::clock::Clock;
use crate::storage::extension;

/// Errors reported by [`MockDecoder`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecoderError {
    /// Container not recognised from the extension.
    #[error("unsupported extension: {0}")]
    Unsupported(String),
    /// File not present on the card.
    #[error("file not found: {0}")]
    NotFound(String),
    /// `connect` before `init_output`.
    #[error("I2S not initialised")]
    NoOutput,
}

#[derive(Debug)]
struct DecoderState {
    durations: HashMap<String, u32>,
    default_duration_s: u32,
    parse_after_pumps: u32,
    path: Option<String>,
    connects: Vec<String>,
    i2s_ready: bool,
    i2s_inits: usize,
    running: bool,
    paused: bool,
    pumps_since_connect: u32,
    pumps: usize,
    position_ms: u64,
    last_pump_ms: u64,
    volume: u8,
    seeks: Vec<u32>,
    rejected_seeks: usize,
}

/// Decoder that "plays" in mock-clock time.
///
/// Only `.m4a`, `.mp3` and `.wav` are recognised, mirroring a decoder that
/// sniffs the container from the extension. Duration reads 0 until the
/// configured number of pumps has happened after `connect`.
#[derive(Debug, Clone)]
pub struct MockDecoder {
    state: Rc<RefCell<DecoderState>>,
    clock: MockClock,
    fs: MemStorage,
    eof: &'static EofLatch,
}

impl MockDecoder {
    /// Decoder reading files from `fs`, timing with `clock`, reporting EOF on `eof`.
    pub fn new(clock: MockClock, fs: MemStorage, eof: &'static EofLatch) -> Self {
        Self {
            state: Rc::new(RefCell::new(DecoderState {
                durations: HashMap::new(),
                default_duration_s: 600,
                parse_after_pumps: 2,
                path: None,
                connects: Vec::new(),
                i2s_ready: false,
                i2s_inits: 0,
                running: false,
                paused: false,
                pumps_since_connect: 0,
                pumps: 0,
                position_ms: 0,
                last_pump_ms: 0,
                volume: 0,
                seeks: Vec::new(),
                rejected_seeks: 0,
            })),
            clock,
            fs,
            eof,
        }
    }

    /// Duration reported once `path` has been parsed.
    pub fn set_duration(&self, path: &str, seconds: u32) {
        self.state.borrow_mut().durations.insert(path.to_string(), seconds);
    }

    /// Number of pumps before the header counts as parsed.
    pub fn set_parse_delay(&self, pumps: u32) {
        self.state.borrow_mut().parse_after_pumps = pumps;
    }

    /// Paths passed to `connect`, in order.
    pub fn connects(&self) -> Vec<String> {
        self.state.borrow().connects.clone()
    }

    /// Currently open path.
    pub fn current_path(&self) -> Option<String> {
        self.state.borrow().path.clone()
    }

    /// Seeks that were accepted.
    pub fn seeks(&self) -> Vec<u32> {
        self.state.borrow().seeks.clone()
    }

    /// Seeks refused because the header was not parsed yet.
    pub fn rejected_seeks(&self) -> usize {
        self.state.borrow().rejected_seeks
    }

    /// Number of I2S initialisations.
    pub fn i2s_inits(&self) -> usize {
        self.state.borrow().i2s_inits
    }

    /// Total pumps.
    pub fn pumps(&self) -> usize {
        self.state.borrow().pumps
    }

    /// Last volume step set.
    pub fn volume(&self) -> u8 {
        self.state.borrow().volume
    }

    /// `true` while the decoder's pause toggle is engaged.
    pub fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn parsed_duration(s: &DecoderState) -> u32 {
        if s.pumps_since_connect < s.parse_after_pumps {
            return 0;
        }
        s.path
            .as_ref()
            .and_then(|p| s.durations.get(p).copied())
            .unwrap_or(s.default_duration_s)
    }
}

impl AudioDecoder for MockDecoder {
    type Error = DecoderError;

    fn init_output(&mut self) -> Result<(), DecoderError> {
        let mut s = self.state.borrow_mut();
        s.i2s_ready = true;
        s.i2s_inits += 1;
        Ok(())
    }

    fn connect(&mut self, path: &str) -> Result<(), DecoderError> {
        let mut s = self.state.borrow_mut();
        if !s.i2s_ready {
            return Err(DecoderError::NoOutput);
        }
        let ext = extension(path).unwrap_or("").to_ascii_lowercase();
        if !matches!(ext.as_str(), "m4a" | "mp3" | "wav") {
            return Err(DecoderError::Unsupported(path.to_string()));
        }
        if !self.fs.contains(path) {
            return Err(DecoderError::NotFound(path.to_string()));
        }
        s.connects.push(path.to_string());
        s.path = Some(path.to_string());
        s.running = true;
        s.paused = false;
        s.pumps_since_connect = 0;
        s.position_ms = 0;
        s.last_pump_ms = self.clock.now_ms();
        Ok(())
    }

    fn pump(&mut self) {
        let now = self.clock.now_ms();
        let mut s = self.state.borrow_mut();
        s.pumps += 1;
        if !s.running {
            return;
        }
        s.pumps_since_connect = s.pumps_since_connect.saturating_add(1);
        if !s.paused {
            let delta = now.saturating_sub(s.last_pump_ms);
            s.position_ms += delta;
        }
        s.last_pump_ms = now;
        let duration = Self::parsed_duration(&s);
        if duration > 0 && s.position_ms >= u64::from(duration) * 1000 {
            s.position_ms = u64::from(duration) * 1000;
            s.running = false;
            self.eof.set();
        }
    }

    fn duration_s(&self) -> u32 {
        Self::parsed_duration(&self.state.borrow())
    }

    fn position_s(&self) -> u32 {
        u32::try_from(self.state.borrow().position_ms / 1000).unwrap_or(u32::MAX)
    }

    fn seek_s(&mut self, seconds: u32) -> bool {
        let mut s = self.state.borrow_mut();
        if Self::parsed_duration(&s) == 0 {
            s.rejected_seeks += 1;
            return false;
        }
        s.seeks.push(seconds);
        s.position_ms = u64::from(seconds) * 1000;
        s.last_pump_ms = self.clock.now_ms();
        true
    }

    fn toggle_pause(&mut self) {
        let now = self.clock.now_ms();
        let mut s = self.state.borrow_mut();
        s.paused = !s.paused;
        s.last_pump_ms = now;
    }

    fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    fn stop(&mut self) {
        let mut s = self.state.borrow_mut();
        s.running = false;
        s.paused = false;
        s.path = None;
        s.i2s_ready = false;
    }

    fn set_volume(&mut self, step: u8) {
        self.state.borrow_mut().volume = step.min(MAX_VOLUME);
    }
}
