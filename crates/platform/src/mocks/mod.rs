//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests. Every mock is a cheap handle
//! around shared state: clone it before moving it into the code under test
//! and keep the clone to inspect what happened.

#![cfg(any(test, feature = "std"))]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)]

mod audio;
mod display;
mod modem;
mod net;
mod radio;
mod storage;

pub use audio::MockDecoder;
pub use display::MockPanel;
pub use modem::{SimModem, SimSms};
pub use net::{http_response, MockConnection, MockConnector, MockWifi, RecordedRequest};
pub use radio::{MockCpu, MockGauge, MockGnss, MockRadio, MockSleep};
pub use storage::{MemError, MemStorage, StorageOp};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::clock::Clock;
use crate::input::Keyboard;

// ── Time ────────────────────────────────────────────────────────────────────

/// Manually driven millisecond clock.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now: Arc<AtomicU64>,
}

impl MockClock {
    /// Clock at t = 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to an absolute time.
    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    /// Move forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Delay that advances a [`MockClock`] instead of sleeping.
#[derive(Debug, Clone)]
pub struct MockDelay {
    clock: MockClock,
    residual_ns: u64,
    calls: Rc<RefCell<Vec<u32>>>,
}

impl MockDelay {
    /// Delay bound to `clock`.
    pub fn new(clock: MockClock) -> Self {
        Self {
            clock,
            residual_ns: 0,
            calls: Rc::default(),
        }
    }

    /// Every `delay_ms` argument seen so far.
    pub fn calls_ms(&self) -> Vec<u32> {
        self.calls.borrow().clone()
    }
}

impl embedded_hal_async::delay::DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.residual_ns += u64::from(ns);
        self.clock.advance(self.residual_ns / 1_000_000);
        self.residual_ns %= 1_000_000;
        embassy_futures::yield_now().await;
    }

    async fn delay_us(&mut self, us: u32) {
        self.delay_ns(us.saturating_mul(1000)).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.calls.borrow_mut().push(ms);
        self.clock.advance(u64::from(ms));
        embassy_futures::yield_now().await;
    }
}

// ── GPIO ────────────────────────────────────────────────────────────────────

/// Error returned by a [`RecordingPin`] armed to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFault;

impl embedded_hal::digital::Error for PinFault {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

#[derive(Debug, Default)]
struct PinLog {
    history: Vec<bool>,
    fail_high: bool,
    trace: Option<(BusTrace, &'static str)>,
}

impl PinLog {
    fn drive(&mut self, high: bool) {
        self.history.push(high);
        if let Some((trace, name)) = &self.trace {
            trace.events.borrow_mut().push((name, high));
        }
    }
}

/// Level changes of several chip-select pins in the order they happened.
#[derive(Debug, Clone, Default)]
pub struct BusTrace {
    events: Rc<RefCell<Vec<(&'static str, bool)>>>,
}

impl BusTrace {
    /// Empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// A pin named `name` that logs into this trace.
    pub fn pin(&self, name: &'static str) -> RecordingPin {
        let pin = RecordingPin::new();
        pin.log.borrow_mut().trace = Some((self.clone(), name));
        pin
    }

    /// Every `(pin, level)` change so far.
    pub fn events(&self) -> Vec<(&'static str, bool)> {
        self.events.borrow().clone()
    }

    /// Times a pin was driven low.
    pub fn selects(&self, name: &str) -> usize {
        self.events.borrow().iter().filter(|(n, high)| *n == name && !high).count()
    }

    /// Replay the trace, calling `step` with the number of low pins after
    /// each change. Returns the pins left low.
    fn replay(&self, mut step: impl FnMut(usize)) -> Vec<&'static str> {
        let mut low: Vec<&'static str> = Vec::new();
        for (name, high) in self.events.borrow().iter() {
            if *high {
                low.retain(|n| n != name);
            } else if !low.contains(name) {
                low.push(name);
            }
            step(low.len());
        }
        low
    }

    /// Most pins that were low at the same moment.
    pub fn max_selected(&self) -> usize {
        let mut max = 0;
        self.replay(|n| max = max.max(n));
        max
    }

    /// Pins whose last level was low.
    pub fn still_selected(&self) -> Vec<&'static str> {
        self.replay(|_| {})
    }
}

/// Output pin that records every level it was driven to.
#[derive(Debug, Clone, Default)]
pub struct RecordingPin {
    log: Rc<RefCell<PinLog>>,
}

impl RecordingPin {
    /// Pin with an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Levels driven so far (`true` = high).
    pub fn history(&self) -> Vec<bool> {
        self.log.borrow().history.clone()
    }

    /// Last driven level, `None` if never driven.
    pub fn level(&self) -> Option<bool> {
        self.log.borrow().history.last().copied()
    }

    /// `true` if the pin was last driven high.
    pub fn is_high(&self) -> bool {
        self.level() == Some(true)
    }

    /// Make subsequent `set_high` calls fail.
    pub fn fail_set_high(&self, fail: bool) {
        self.log.borrow_mut().fail_high = fail;
    }
}

impl embedded_hal::digital::ErrorType for RecordingPin {
    type Error = PinFault;
}

impl embedded_hal::digital::OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), PinFault> {
        self.log.borrow_mut().drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), PinFault> {
        let mut log = self.log.borrow_mut();
        if log.fail_high {
            return Err(PinFault);
        }
        log.drive(true);
        Ok(())
    }
}

// ── Keyboard ────────────────────────────────────────────────────────────────

/// Keyboard fed from a queue of bytes.
#[derive(Debug, Clone, Default)]
pub struct MockKeyboard {
    keys: Rc<RefCell<VecDeque<u8>>>,
}

impl MockKeyboard {
    /// Empty keyboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one byte.
    pub fn press(&self, key: u8) {
        self.keys.borrow_mut().push_back(key);
    }

    /// Queue every byte of `text`.
    pub fn type_str(&self, text: &str) {
        self.keys.borrow_mut().extend(text.bytes());
    }

    /// Bytes not yet read.
    pub fn pending(&self) -> usize {
        self.keys.borrow().len()
    }
}

impl Keyboard for MockKeyboard {
    fn read_key(&mut self) -> Option<u8> {
        self.keys.borrow_mut().pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::OutputPin;
    use embedded_hal_async::delay::DelayNs;

    #[tokio::test]
    async fn test_mock_delay_advances_clock() {
        let clock = MockClock::new();
        let mut delay = MockDelay::new(clock.clone());
        delay.delay_ms(1500).await;
        delay.delay_us(500).await;
        delay.delay_us(500).await;
        assert_eq!(clock.now_ms(), 1501);
        assert_eq!(delay.calls_ms(), vec![1500]);
    }

    #[test]
    fn test_recording_pin_history() {
        let mut pin = RecordingPin::new();
        let watch = pin.clone();
        pin.set_low().unwrap();
        pin.set_high().unwrap();
        assert_eq!(watch.history(), vec![false, true]);
        watch.fail_set_high(true);
        assert!(pin.set_high().is_err());
        assert!(watch.is_high());
    }

    #[test]
    fn test_mock_keyboard_fifo() {
        let kb = MockKeyboard::new();
        let mut reader = kb.clone();
        kb.type_str("ab");
        kb.press(0x0D);
        assert_eq!(reader.read_key(), Some(b'a'));
        assert_eq!(reader.read_key(), Some(b'b'));
        assert_eq!(reader.read_key(), Some(0x0D));
        assert_eq!(reader.read_key(), None);
    }
}
