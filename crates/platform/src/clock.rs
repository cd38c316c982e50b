//! Monotonic and wall-clock time sources.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// Monotonic millisecond clock.
///
/// Every deadline in the runtime (refresh, autosave, polling cadences) is
/// computed from this trait so tests can drive time by hand.
pub trait Clock {
    /// Milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Milliseconds elapsed since `since` (0 if `since` lies in the future).
    fn since(&self, since: u64) -> u64 {
        self.now_ms().saturating_sub(since)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// [`Clock`] backed by the embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        embassy_time::Instant::now().as_millis()
    }
}

/// Wall-clock anchor: an epoch second observed at a monotonic instant.
///
/// Set by the modem worker from `+CCLK?` and read by the UI when stamping SMS
/// records. Guarded by a critical section because the writer runs on the
/// other core.
pub struct WallClock {
    anchor: Mutex<CriticalSectionRawMutex, Cell<Option<(u32, u64)>>>,
}

impl WallClock {
    /// Unsynchronised clock.
    pub const fn new() -> Self {
        Self {
            anchor: Mutex::new(Cell::new(None)),
        }
    }

    /// Record that `epoch_s` was current at monotonic `now_ms`.
    pub fn sync(&self, epoch_s: u32, now_ms: u64) {
        self.anchor.lock(|a| a.set(Some((epoch_s, now_ms))));
    }

    /// Forget the anchor.
    pub fn clear(&self) {
        self.anchor.lock(|a| a.set(None));
    }

    /// `true` once [`sync`](Self::sync) has been called.
    pub fn is_synced(&self) -> bool {
        self.anchor.lock(Cell::get).is_some()
    }

    /// Epoch seconds at monotonic `now_ms`, `None` before the first sync.
    pub fn epoch_at(&self, now_ms: u64) -> Option<u32> {
        let (epoch, at) = self.anchor.lock(Cell::get)?;
        let elapsed_s = now_ms.saturating_sub(at) / 1000;
        Some(epoch.saturating_add(u32::try_from(elapsed_s).unwrap_or(u32::MAX)))
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide wall clock.
pub static WALL_CLOCK: WallClock = WallClock::new();

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockClock;

    #[test]
    fn test_wall_clock_unsynced_is_none() {
        let wc = WallClock::new();
        assert!(!wc.is_synced());
        assert_eq!(wc.epoch_at(5_000), None);
    }

    #[test]
    fn test_wall_clock_advances_with_monotonic_time() {
        let wc = WallClock::new();
        wc.sync(1_700_000_000, 10_000);
        assert_eq!(wc.epoch_at(10_000), Some(1_700_000_000));
        assert_eq!(wc.epoch_at(12_999), Some(1_700_000_002));
        // Earlier instants clamp to the anchor.
        assert_eq!(wc.epoch_at(0), Some(1_700_000_000));
    }

    #[test]
    fn test_since_saturates() {
        let clock = MockClock::new();
        clock.set(100);
        assert_eq!(clock.since(40), 60);
        assert_eq!(clock.since(400), 0);
    }
}
