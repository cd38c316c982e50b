//! Bounded SMS queues between the UI and the worker.
//!
//! Both sides use the non-blocking `try_*` calls; a full queue drops the
//! message and the caller decides whether to tell the user.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use store::sms::{normalize_phone, Body, Phone};

/// Outbound queue depth.
pub const SEND_QUEUE_DEPTH: usize = 4;

/// Inbound queue depth.
pub const RECV_QUEUE_DEPTH: usize = 8;

/// Tries per outgoing SMS before it is given up on.
pub const MAX_SEND_ATTEMPTS: u8 = 3;

/// Message waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingSms {
    /// Normalized destination.
    pub phone: Phone,
    /// Text, at most one SMS.
    pub body: Body,
    /// Sends that got no answer from the modem so far.
    pub attempts: u8,
}

/// Message read off the SIM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingSms {
    /// Normalized sender.
    pub phone: Phone,
    /// Text.
    pub body: Body,
    /// Service-centre time (epoch seconds), 0 if unparsable.
    pub timestamp: u32,
}

fn bounded_body(text: &str) -> Body {
    let mut out = Body::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

impl IncomingSms {
    /// Build from raw modem fields.
    pub fn new(phone: &str, body: &str, timestamp: u32) -> Self {
        Self {
            phone: normalize_phone(phone),
            body: bounded_body(body),
            timestamp,
        }
    }
}

/// The two queues.
pub struct SmsQueues {
    outbox: Channel<CriticalSectionRawMutex, OutgoingSms, SEND_QUEUE_DEPTH>,
    inbox: Channel<CriticalSectionRawMutex, IncomingSms, RECV_QUEUE_DEPTH>,
}

impl SmsQueues {
    /// Empty queues.
    pub const fn new() -> Self {
        Self {
            outbox: Channel::new(),
            inbox: Channel::new(),
        }
    }

    /// Queue an SMS for sending. Returns `false` if the queue is full or the
    /// number is empty after normalization.
    pub fn send_sms(&self, phone: &str, body: &str) -> bool {
        let phone = normalize_phone(phone);
        if phone.is_empty() {
            return false;
        }
        let msg = OutgoingSms {
            phone,
            body: bounded_body(body),
            attempts: 0,
        };
        match self.outbox.try_send(msg) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("modem: send queue full, message dropped");
                false
            }
        }
    }

    /// Next received SMS, if any.
    pub fn recv_sms(&self) -> Option<IncomingSms> {
        self.inbox.try_receive().ok()
    }

    /// `true` when [`send_sms`](Self::send_sms) would drop the message.
    pub fn outbox_full(&self) -> bool {
        self.outbox.is_full()
    }

    pub(crate) fn next_outgoing(&self) -> Option<OutgoingSms> {
        self.outbox.try_receive().ok()
    }

    /// Put back a message whose send got no answer. Returns `false` once it
    /// has used up [`MAX_SEND_ATTEMPTS`] or the queue has no room.
    pub(crate) fn requeue(&self, mut msg: OutgoingSms) -> bool {
        msg.attempts = msg.attempts.saturating_add(1);
        if msg.attempts >= MAX_SEND_ATTEMPTS {
            tracing::warn!("modem: giving up on SMS to {} after {} tries", msg.phone.as_str(), msg.attempts);
            return false;
        }
        self.outbox.try_send(msg).is_ok()
    }

    /// Hand a received SMS to the UI. Returns it back when the queue is full.
    pub(crate) fn deliver(&self, sms: IncomingSms) -> Result<(), IncomingSms> {
        self.inbox.try_send(sms).map_err(|e| match e {
            embassy_sync::channel::TrySendError::Full(sms) => sms,
        })
    }

    /// Messages waiting to be sent.
    pub fn pending_outgoing(&self) -> usize {
        self.outbox.len()
    }
}

impl Default for SmsQueues {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide queues.
pub static SMS_QUEUES: SmsQueues = SmsQueues::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_queue_drops_when_full() {
        let q = SmsQueues::new();
        for i in 0..SEND_QUEUE_DEPTH {
            assert!(q.send_sms("+1234", &format!("m{i}")));
        }
        assert!(!q.send_sms("+1234", "overflow"));
        assert_eq!(q.pending_outgoing(), SEND_QUEUE_DEPTH);
        assert_eq!(q.next_outgoing().unwrap().body.as_str(), "m0");
    }

    #[test]
    fn test_send_rejects_empty_number() {
        let q = SmsQueues::new();
        assert!(!q.send_sms("abc", "hi"));
    }

    #[test]
    fn test_recv_queue_returns_overflow() {
        let q = SmsQueues::new();
        for _ in 0..RECV_QUEUE_DEPTH {
            q.deliver(IncomingSms::new("+1", "x", 0)).unwrap();
        }
        let back = q.deliver(IncomingSms::new("+2", "y", 0)).unwrap_err();
        assert_eq!(back.phone.as_str(), "+2");
        assert!(q.recv_sms().is_some());
    }

    #[test]
    fn test_body_capped_at_one_sms() {
        let q = SmsQueues::new();
        assert!(q.send_sms("+1", &"a".repeat(200)));
        assert_eq!(q.next_outgoing().unwrap().body.len(), 160);
    }
}
