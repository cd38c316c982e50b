//! Pending mesh and SMS notifications, previewed on Home.

use heapless::{Deque, String};
use ui::keys::{KEY_BACKSPACE, KEY_ENTER};
use ui::ScreenId;

/// Notifications kept before the oldest is dropped.
pub const MAX_NOTICES: usize = 8;

/// Where a notification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NoticeKind {
    /// Mesh text message.
    Mesh,
    /// Incoming SMS.
    Sms,
}

/// One notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Source.
    pub kind: NoticeKind,
    /// Sender name or number.
    pub from: String<32>,
    /// Start of the message.
    pub body: String<64>,
    /// Arrival time.
    pub at_ms: u64,
}

impl Notice {
    /// Build a notice, truncating `from` and `body` on char boundaries.
    pub fn new(kind: NoticeKind, from: &str, body: &str, at_ms: u64) -> Self {
        Self {
            kind,
            from: truncated(from),
            body: truncated(body),
            at_ms,
        }
    }
}

fn truncated<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// What a key did to the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeAction {
    /// Not a preview key.
    Ignored,
    /// The latest notice was dismissed.
    Dismissed,
    /// Open this screen for the latest notice.
    Open(ScreenId),
}

/// Bounded FIFO of notifications.
#[derive(Debug, Default)]
pub struct Notifications {
    queue: Deque<Notice, MAX_NOTICES>,
}

impl Notifications {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a notice, dropping the oldest when full.
    pub fn push(&mut self, notice: Notice) {
        if self.queue.is_full() {
            self.queue.pop_front();
        }
        // Cannot fail: a slot was just freed.
        let _ = self.queue.push_back(notice);
    }

    /// Newest notice.
    pub fn latest(&self) -> Option<&Notice> {
        self.queue.back()
    }

    /// Drop the newest notice.
    pub fn dismiss(&mut self) -> Option<Notice> {
        self.queue.pop_back()
    }

    /// Pending count.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Preview keys: `x`/Backspace dismiss, `o`/Enter open the SMS inbox for
    /// an SMS notice.
    pub fn handle_key(&mut self, key: u8) -> NoticeAction {
        let Some(latest) = self.latest() else {
            return NoticeAction::Ignored;
        };
        match key {
            b'x' | b'X' | KEY_BACKSPACE => {
                self.dismiss();
                NoticeAction::Dismissed
            }
            b'o' | b'O' | KEY_ENTER if latest.kind == NoticeKind::Sms => {
                self.dismiss();
                NoticeAction::Open(ScreenId::Sms)
            }
            _ => NoticeAction::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(n: u64) -> Notice {
        Notice::new(NoticeKind::Mesh, "node", "hi", n)
    }

    #[test]
    fn test_full_queue_drops_oldest() {
        let mut q = Notifications::new();
        for n in 0..(MAX_NOTICES as u64 + 2) {
            q.push(notice(n));
        }
        assert_eq!(q.len(), MAX_NOTICES);
        assert_eq!(q.latest().unwrap().at_ms, MAX_NOTICES as u64 + 1);
        while q.len() > 1 {
            q.dismiss();
        }
        assert_eq!(q.latest().unwrap().at_ms, 2);
    }

    #[test]
    fn test_keys_act_on_latest() {
        let mut q = Notifications::new();
        assert_eq!(q.handle_key(b'x'), NoticeAction::Ignored);
        q.push(notice(1));
        assert_eq!(q.handle_key(b'o'), NoticeAction::Ignored);
        q.push(Notice::new(NoticeKind::Sms, "+15550100", "call me", 2));
        assert_eq!(q.handle_key(b'o'), NoticeAction::Open(ScreenId::Sms));
        assert_eq!(q.handle_key(b'z'), NoticeAction::Ignored);
        assert_eq!(q.handle_key(b'x'), NoticeAction::Dismissed);
        assert!(q.is_empty());
    }

    #[test]
    fn test_long_text_is_truncated() {
        let body = "é".repeat(100);
        let n = Notice::new(NoticeKind::Mesh, "a", &body, 0);
        assert_eq!(n.body.chars().count(), 32);
    }
}
