//! Input router: one key per tick to exactly one screen.
//!
//! Global hotkeys are resolved before the current screen sees the byte. A
//! key the screen does not consume may be offered to a secondary dispatcher
//! (Home hands it to the notification preview). Routing is split into
//! [`Router::begin`] and [`Router::finish`] so the caller can run the async
//! screen handler in between.

use crate::deadline::RefreshDeadline;
use crate::keys::{KEY_ESCAPE, KEY_HOME, KEY_POWER};
use crate::navigation::Navigator;
use crate::screen::ScreenId;

/// Hotkeys handled before any screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GlobalKey {
    /// Enter deep sleep.
    Power,
    /// Return to the launcher, leaving screen state intact.
    Home,
    /// Emergency exit: return to the launcher and close whatever holds a
    /// device (the open audiobook).
    Escape,
}

/// Where a key goes this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// No key this tick.
    Idle,
    /// A global hotkey.
    Global(GlobalKey),
    /// Deliver `key` to screen `id`.
    Screen {
        /// Target screen.
        id: ScreenId,
        /// Key byte.
        key: u8,
    },
}

/// Handlers tried after the screen declined a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secondary {
    /// Home's preview of the latest mesh/SMS notification.
    NotificationPreview,
}

/// Key router plus the navigation stack and refresh deadline it drives.
#[derive(Debug, Clone, Default)]
pub struct Router {
    nav: Navigator,
    deadline: RefreshDeadline,
    shown: Option<ScreenId>,
}

impl Router {
    /// Router at Home with an immediately due first frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigation stack.
    pub fn nav(&self) -> &Navigator {
        &self.nav
    }

    /// Current screen.
    pub fn current(&self) -> ScreenId {
        self.nav.current()
    }

    /// Refresh deadline.
    pub fn deadline(&self) -> &RefreshDeadline {
        &self.deadline
    }

    /// Mutable refresh deadline.
    pub fn deadline_mut(&mut self) -> &mut RefreshDeadline {
        &mut self.deadline
    }

    /// Classify this tick's key.
    pub fn begin(&self, key: Option<u8>) -> Route {
        match key {
            None => Route::Idle,
            Some(KEY_POWER) => Route::Global(GlobalKey::Power),
            Some(KEY_HOME) => Route::Global(GlobalKey::Home),
            Some(KEY_ESCAPE) => Route::Global(GlobalKey::Escape),
            Some(key) => Route::Screen {
                id: self.nav.current(),
                key,
            },
        }
    }

    /// Fallback for a key screen `id` declined.
    pub fn secondary(&self, id: ScreenId) -> Option<Secondary> {
        match id {
            ScreenId::Home => Some(Secondary::NotificationPreview),
            _ => None,
        }
    }

    /// Navigation part of a global key. Power is left to the caller.
    pub fn apply_global(&mut self, key: GlobalKey, now_ms: u64) {
        match key {
            GlobalKey::Home | GlobalKey::Escape => self.nav.go_home(),
            GlobalKey::Power => {}
        }
        self.sync(now_ms);
    }

    /// Open `id` on top of the stack.
    pub fn open(&mut self, id: ScreenId, now_ms: u64) {
        self.nav.push(id);
        self.sync(now_ms);
    }

    /// Close the current screen.
    pub fn back(&mut self, now_ms: u64) {
        self.nav.back();
        self.sync(now_ms);
    }

    /// Finish routing a key: a consumed key forces a redraw now.
    pub fn finish(&mut self, consumed: bool, now_ms: u64) {
        if consumed {
            self.deadline.force(now_ms);
        }
        self.sync(now_ms);
    }

    /// `true` if the current screen has not been drawn since it became current.
    pub fn screen_changed(&self) -> bool {
        self.shown != Some(self.nav.current())
    }

    /// Record that the current screen was drawn at `now_ms`, asking for the
    /// next frame after `delta_ms`.
    pub fn rendered(&mut self, now_ms: u64, delta_ms: u32) {
        self.shown = Some(self.nav.current());
        self.deadline.rendered(now_ms, delta_ms);
    }

    fn sync(&mut self, now_ms: u64) {
        if self.screen_changed() {
            tracing::debug!("router: screen {}", self.nav.current().title());
            self.deadline.force(now_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KEY_ENTER;

    #[test]
    fn test_globals_resolved_first() {
        let r = Router::new();
        assert_eq!(r.begin(Some(KEY_HOME)), Route::Global(GlobalKey::Home));
        assert_eq!(r.begin(Some(KEY_POWER)), Route::Global(GlobalKey::Power));
        assert_eq!(r.begin(Some(KEY_ESCAPE)), Route::Global(GlobalKey::Escape));
        assert_eq!(r.begin(None), Route::Idle);
    }

    #[test]
    fn test_key_goes_to_current_screen() {
        let mut r = Router::new();
        r.open(ScreenId::Notes, 0);
        assert_eq!(
            r.begin(Some(KEY_ENTER)),
            Route::Screen {
                id: ScreenId::Notes,
                key: KEY_ENTER
            }
        );
    }

    #[test]
    fn test_consumed_key_forces_redraw() {
        let mut r = Router::new();
        r.rendered(0, 60_000);
        r.finish(false, 1_000);
        assert!(!r.deadline().is_due(1_000));
        r.finish(true, 1_000);
        assert!(r.deadline().is_due(1_000));
    }

    #[test]
    fn test_screen_change_forces_redraw() {
        let mut r = Router::new();
        r.rendered(0, 60_000);
        r.open(ScreenId::Web, 10);
        assert!(r.screen_changed());
        assert!(r.deadline().is_due(10));
        r.apply_global(GlobalKey::Home, 20);
        assert_eq!(r.current(), ScreenId::Home);
    }

    #[test]
    fn test_home_has_secondary_dispatcher() {
        let r = Router::new();
        assert_eq!(
            r.secondary(ScreenId::Home),
            Some(Secondary::NotificationPreview)
        );
        assert_eq!(r.secondary(ScreenId::Sms), None);
    }
}
