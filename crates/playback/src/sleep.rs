//! Sleep timer: pause playback after a fixed interval.

/// Timer length armed by the `Z` key.
pub const SLEEP_TIMER_MS: u64 = 45 * 60 * 1000;

/// Armed/disarmed sleep timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SleepTimer {
    deadline_ms: Option<u64>,
}

impl SleepTimer {
    /// Disarmed timer.
    pub const fn new() -> Self {
        Self { deadline_ms: None }
    }

    /// Arm if disarmed, disarm if armed. Returns the new armed state.
    pub fn toggle(&mut self, now_ms: u64) -> bool {
        self.deadline_ms = match self.deadline_ms {
            Some(_) => None,
            None => Some(now_ms.saturating_add(SLEEP_TIMER_MS)),
        };
        self.deadline_ms.is_some()
    }

    /// Time left, `None` when disarmed.
    pub fn remaining(&self, now_ms: u64) -> Option<u64> {
        self.deadline_ms.map(|d| d.saturating_sub(now_ms))
    }

    /// `true` once when the deadline passes; the timer disarms itself.
    pub fn take_expired(&mut self, now_ms: u64) -> bool {
        match self.deadline_ms {
            Some(d) if now_ms >= d => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }

    /// Disarm.
    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }
}
