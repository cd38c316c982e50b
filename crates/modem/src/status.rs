//! Status fields shared between the worker and the UI.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::String;

/// Longest operator name kept.
pub const MAX_OPERATOR: usize = 24;

/// CSQ value meaning "not known".
pub const CSQ_UNKNOWN: u8 = 99;

/// Worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ModemState {
    /// Rail off.
    Off = 0,
    /// Power sequence and AT probing.
    PoweringOn = 1,
    /// Echo, text mode, charset, URCs.
    Initializing = 2,
    /// Waiting for `+CREG` home or roaming.
    Registering = 3,
    /// Serving SMS.
    Ready = 4,
    /// Waiting to restart.
    Error = 5,
}

impl ModemState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::PoweringOn,
            2 => Self::Initializing,
            3 => Self::Registering,
            4 => Self::Ready,
            5 => Self::Error,
            _ => Self::Off,
        }
    }

    /// Status-bar label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::PoweringOn => "Starting",
            Self::Initializing => "Init",
            Self::Registering => "Searching",
            Self::Ready => "Ready",
            Self::Error => "Error",
        }
    }
}

/// Eventually-consistent modem status.
pub struct ModemStatus {
    state: AtomicU8,
    csq: AtomicU8,
    operator: Mutex<CriticalSectionRawMutex, RefCell<String<MAX_OPERATOR>>>,
    shutdown: AtomicBool,
}

impl ModemStatus {
    /// Off, unknown signal, no operator.
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(ModemState::Off as u8),
            csq: AtomicU8::new(CSQ_UNKNOWN),
            operator: Mutex::new(RefCell::new(String::new())),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Current worker state.
    pub fn state(&self) -> ModemState {
        ModemState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: ModemState) {
        let old = self.state.swap(state as u8, Ordering::AcqRel);
        if old != state as u8 {
            tracing::info!("modem: {} -> {}", ModemState::from_u8(old).label(), state.label());
        }
    }

    /// Last CSQ reading (0..=31, or [`CSQ_UNKNOWN`]).
    pub fn csq(&self) -> u8 {
        self.csq.load(Ordering::Relaxed)
    }

    pub(crate) fn set_csq(&self, csq: u8) {
        self.csq.store(csq, Ordering::Relaxed);
    }

    /// Signal bars 0..=4 for the status line.
    pub fn bars(&self) -> u8 {
        match self.csq() {
            CSQ_UNKNOWN | 0..=1 => 0,
            2..=9 => 1,
            10..=14 => 2,
            15..=19 => 3,
            _ => 4,
        }
    }

    /// Registered operator name (empty until known).
    pub fn operator(&self) -> String<MAX_OPERATOR> {
        self.operator.lock(|op| op.borrow().clone())
    }

    pub(crate) fn set_operator(&self, name: &str) {
        self.operator.lock(|op| {
            let mut op = op.borrow_mut();
            op.clear();
            for c in name.chars() {
                if op.push(c).is_err() {
                    break;
                }
            }
        });
    }

    /// Ask the worker to power the modem down and return.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub(crate) fn take_shutdown(&self) -> bool {
        self.shutdown.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn reset(&self) {
        self.set_csq(CSQ_UNKNOWN);
        self.set_operator("");
    }
}

impl Default for ModemStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide modem status.
pub static MODEM_STATUS: ModemStatus = ModemStatus::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_atom() {
        let s = ModemStatus::new();
        assert_eq!(s.state(), ModemState::Off);
        s.set_state(ModemState::Registering);
        assert_eq!(s.state(), ModemState::Registering);
    }

    #[test]
    fn test_operator_truncated() {
        let s = ModemStatus::new();
        s.set_operator("An Extremely Long Operator Name Indeed");
        assert_eq!(s.operator().len(), MAX_OPERATOR);
    }

    #[test]
    fn test_bars() {
        let s = ModemStatus::new();
        assert_eq!(s.bars(), 0);
        s.set_csq(21);
        assert_eq!(s.bars(), 4);
        s.set_csq(12);
        assert_eq!(s.bars(), 2);
    }

    #[test]
    fn test_shutdown_request_consumed_once() {
        let s = ModemStatus::new();
        s.request_shutdown();
        assert!(s.take_shutdown());
        assert!(!s.take_shutdown());
    }
}
