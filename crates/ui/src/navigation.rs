//! Navigation state machine: a bounded stack of [`ScreenId`]s.
//!
//! The stack is capped at 8 entries (embedded-safe, no heap). Pushing when
//! the stack is full is a silent no-op (embedded reality: bounded buffer).
//! `Home` is the root and can never be popped.

use heapless::Vec;

use crate::screen::ScreenId;

/// Maximum stack depth.
pub const MAX_DEPTH: usize = 8;

/// Navigation stack bounded at [`MAX_DEPTH`] entries.
#[derive(Debug, Clone)]
pub struct Navigator {
    stack: Vec<ScreenId, MAX_DEPTH>,
}

impl Navigator {
    /// Create a new navigator with `Home` as the root screen.
    pub fn new() -> Self {
        let mut stack = Vec::new();
        // Always succeeds: the stack starts empty.
        stack.push(ScreenId::Home).ok();
        Navigator { stack }
    }

    /// The screen currently at the top of the stack.
    #[must_use]
    pub fn current(&self) -> ScreenId {
        self.stack.last().copied().unwrap_or(ScreenId::Home)
    }

    /// Open `screen`. If it is already on the stack, everything above it is
    /// popped instead so a screen appears at most once.
    pub fn push(&mut self, screen: ScreenId) {
        if let Some(pos) = self.stack.iter().position(|s| *s == screen) {
            self.stack.truncate(pos.saturating_add(1));
            return;
        }
        self.stack.push(screen).ok();
    }

    /// Pop the top screen. Does nothing if only the root remains.
    pub fn back(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Drop everything above the root.
    pub fn go_home(&mut self) {
        self.stack.truncate(1);
    }

    /// Replace the top screen without growing the stack. The root stays `Home`.
    pub fn replace(&mut self, screen: ScreenId) {
        if self.stack.len() == 1 {
            self.push(screen);
        } else if let Some(top) = self.stack.last_mut() {
            *top = screen;
        }
    }

    /// `true` if `screen` is anywhere on the stack.
    #[must_use]
    pub fn contains(&self, screen: ScreenId) -> bool {
        self.stack.contains(&screen)
    }

    /// Number of entries currently on the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Navigator;
    use crate::screen::ScreenId;

    #[test]
    fn test_nav_starts_at_home() {
        let nav = Navigator::new();
        assert_eq!(nav.current(), ScreenId::Home);
    }

    #[test]
    fn test_nav_back_at_root_is_noop() {
        let mut nav = Navigator::new();
        nav.back();
        assert_eq!(nav.current(), ScreenId::Home);
        assert_eq!(nav.depth(), 1);
    }

    #[test]
    fn test_nav_push_existing_unwinds() {
        let mut nav = Navigator::new();
        nav.push(ScreenId::Sms);
        nav.push(ScreenId::Notes);
        nav.push(ScreenId::Sms);
        assert_eq!(nav.current(), ScreenId::Sms);
        assert_eq!(nav.depth(), 2);
    }

    #[test]
    fn test_nav_go_home() {
        let mut nav = Navigator::new();
        nav.push(ScreenId::Web);
        nav.push(ScreenId::Settings);
        nav.go_home();
        assert_eq!(nav.current(), ScreenId::Home);
        assert!(!nav.contains(ScreenId::Web));
    }

    #[test]
    fn test_nav_replace_keeps_root() {
        let mut nav = Navigator::new();
        nav.replace(ScreenId::Settings);
        assert_eq!(nav.depth(), 2);
        nav.replace(ScreenId::Notes);
        assert_eq!(nav.current(), ScreenId::Notes);
        assert_eq!(nav.depth(), 2);
    }
}
