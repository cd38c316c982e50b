//! E-ink refresh deadline.
//!
//! After each render the screen names how long until it wants to be redrawn.
//! While audio plays the interval is stretched to [`AUDIO_REFRESH_MS`] so a
//! ~650 ms panel refresh cannot starve the decoder. A key the screen consumed
//! pulls the deadline to "now"; an unconsumed key leaves it alone.

/// Minimum interval between refreshes while audio is playing.
pub const AUDIO_REFRESH_MS: u32 = 60_000;

/// Refresh bookkeeping for the current screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshDeadline {
    due_at_ms: u64,
    rendered_at_ms: u64,
    requested_ms: u32,
    audio_active: bool,
}

impl RefreshDeadline {
    /// Deadline that is due immediately (first frame).
    pub const fn new() -> Self {
        Self {
            due_at_ms: 0,
            rendered_at_ms: 0,
            requested_ms: 0,
            audio_active: false,
        }
    }

    /// Interval actually applied for a requested `delta_ms`.
    pub fn effective_ms(&self, delta_ms: u32) -> u32 {
        if self.audio_active {
            delta_ms.max(AUDIO_REFRESH_MS)
        } else {
            delta_ms
        }
    }

    /// Record a render at `now_ms` that asked for another in `delta_ms`.
    pub fn rendered(&mut self, now_ms: u64, delta_ms: u32) {
        self.requested_ms = delta_ms;
        self.rendered_at_ms = now_ms;
        self.due_at_ms = now_ms.saturating_add(u64::from(self.effective_ms(delta_ms)));
    }

    /// Redraw as soon as possible (consumed key, screen change).
    pub fn force(&mut self, now_ms: u64) {
        self.due_at_ms = self.due_at_ms.min(now_ms);
    }

    /// Tell the deadline whether audio is playing. Turning playback off
    /// re-applies the last requested interval.
    pub fn set_audio_active(&mut self, active: bool) {
        if self.audio_active == active {
            return;
        }
        self.audio_active = active;
        if !active {
            let unstretched = self
                .rendered_at_ms
                .saturating_add(u64::from(self.requested_ms));
            self.due_at_ms = self.due_at_ms.min(unstretched);
        }
        tracing::debug!("refresh: audio {}", if active { "on" } else { "off" });
    }

    /// `true` when audio stretching is in effect.
    pub fn audio_active(&self) -> bool {
        self.audio_active
    }

    /// Absolute time of the next redraw.
    pub fn due_at(&self) -> u64 {
        self.due_at_ms
    }

    /// Interval requested at the last render.
    pub fn requested_ms(&self) -> u32 {
        self.requested_ms
    }

    /// `true` if a redraw is due at `now_ms`.
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms >= self.due_at_ms
    }
}

impl Default for RefreshDeadline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_due() {
        assert!(RefreshDeadline::new().is_due(0));
    }

    #[test]
    fn test_requested_interval() {
        let mut d = RefreshDeadline::new();
        d.rendered(1_000, 700);
        assert!(!d.is_due(1_699));
        assert!(d.is_due(1_700));
    }

    #[test]
    fn test_audio_stretches_to_sixty_seconds() {
        let mut d = RefreshDeadline::new();
        d.set_audio_active(true);
        d.rendered(0, 1_000);
        assert!(!d.is_due(59_999));
        assert!(d.is_due(60_000));
        // Longer requests are kept.
        d.rendered(0, 90_000);
        assert_eq!(d.due_at(), 90_000);
    }

    #[test]
    fn test_force_pulls_deadline_in() {
        let mut d = RefreshDeadline::new();
        d.set_audio_active(true);
        d.rendered(0, 1_000);
        d.force(5_000);
        assert!(d.is_due(5_000));
    }

    #[test]
    fn test_audio_off_restores_requested_interval() {
        let mut d = RefreshDeadline::new();
        d.set_audio_active(true);
        d.rendered(1_000, 2_000);
        assert_eq!(d.due_at(), 61_000);
        d.set_audio_active(false);
        assert_eq!(d.due_at(), 3_000);
        assert!(d.is_due(3_000));
    }

    #[test]
    fn test_audio_off_keeps_an_earlier_forced_deadline() {
        let mut d = RefreshDeadline::new();
        d.set_audio_active(true);
        d.rendered(0, 10_000);
        d.force(500);
        d.set_audio_active(false);
        assert_eq!(d.due_at(), 500);
    }

    #[test]
    fn test_force_never_pushes_deadline_out() {
        let mut d = RefreshDeadline::new();
        d.rendered(0, 100);
        d.force(5_000);
        assert_eq!(d.due_at(), 100);
    }
}
