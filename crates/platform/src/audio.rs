//! Audio decoder abstraction
//!
//! The decoder is an opaque library: it opens a file on the SD card by path,
//! parses the container header in the background (duration reads 0 until
//! then), must be pumped frequently, and reports end of file through a
//! callback that only sets an [`EofLatch`].

use core::sync::atomic::{AtomicBool, Ordering};

/// Highest decoder volume step.
pub const MAX_VOLUME: u8 = 21;

/// Pull-based decoder driving the I2S DAC.
pub trait AudioDecoder {
    /// Error type
    type Error: core::fmt::Debug;

    /// Bring up the I2S peripheral. Called once per play after DAC power-up.
    fn init_output(&mut self) -> Result<(), Self::Error>;

    /// Open `path` on the SD card and start decoding (`connecttoFS`).
    fn connect(&mut self, path: &str) -> Result<(), Self::Error>;

    /// Decode one chunk into the DAC FIFO (`loop()`).
    fn pump(&mut self);

    /// Total duration in seconds; 0 until the header has been parsed.
    fn duration_s(&self) -> u32;

    /// Current playback position in seconds.
    fn position_s(&self) -> u32;

    /// Seek to `seconds`. A no-op returning `false` before the header is parsed.
    fn seek_s(&mut self, seconds: u32) -> bool;

    /// Toggle the decoder's internal pause.
    fn toggle_pause(&mut self);

    /// `true` while a stream is open.
    fn is_running(&self) -> bool;

    /// Close the stream.
    fn stop(&mut self);

    /// Set the output volume step (0..=[`MAX_VOLUME`]).
    fn set_volume(&mut self, step: u8);
}

/// End-of-file flag written by the decoder callback, consumed by the tick.
#[derive(Debug)]
pub struct EofLatch(AtomicBool);

impl EofLatch {
    /// Cleared latch; usable in a `static`.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Callback side: mark end of file.
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Tick side: read and clear. Returns `true` at most once per `set`.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    /// Read without clearing.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for EofLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Latch shared with the hardware decoder's EOF callback.
pub static AUDIO_EOF: EofLatch = EofLatch::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eof_latch_consumed_once() {
        let latch = EofLatch::new();
        assert!(!latch.take());
        latch.set();
        assert!(latch.is_set());
        assert!(latch.take());
        assert!(!latch.take());
    }
}
