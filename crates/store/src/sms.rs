//! SMS conversations: one file of fixed 256-byte records per phone number.
//!
//! The UI appends the outgoing record *before* handing the message to the
//! modem, so a sent message is visible at once whatever the modem does.

use heapless::{String, Vec};
use platform::config::SMS_ROOT;
use platform::storage::{extension, stem};
use platform::Storage;

use crate::error::io;
use crate::fs::ensure_dir;
use crate::paths::sms_path;
use crate::StoreError;

/// Longest stored phone number.
pub const MAX_PHONE: usize = 20;

/// Longest message body (one GSM-7 SMS).
pub const MAX_BODY: usize = 160;

/// Normalized phone number.
pub type Phone = String<MAX_PHONE>;

/// Message body.
pub type Body = String<MAX_BODY>;

/// Conversations listed in the inbox.
pub const MAX_CONVERSATIONS: usize = 32;

/// Reduce a phone number to an optional leading `+` and digits.
pub fn normalize_phone(raw: &str) -> Phone {
    let mut out = Phone::new();
    let raw = raw.trim();
    if raw.starts_with('+') {
        let _ = out.push('+');
    }
    for c in raw.chars().filter(char::is_ascii_digit) {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Message direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Sent from this device.
    Sent,
    /// Received by the modem.
    Received,
}

impl Direction {
    /// Marker shown before the body in the conversation view.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Sent => ">>>",
            Self::Received => "<<<",
        }
    }
}

/// One stored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsRecord {
    /// Unix time in seconds (0 when the clock was never synced).
    pub timestamp: u32,
    /// Sent or received.
    pub direction: Direction,
    /// Normalized peer number.
    pub phone: Phone,
    /// Body, at most [`MAX_BODY`] bytes.
    pub body: Body,
}

impl SmsRecord {
    /// Size on disk.
    pub const SIZE: usize = 256;

    /// Build a record, normalizing `phone` and truncating `body` on a
    /// character boundary.
    pub fn new(timestamp: u32, direction: Direction, phone: &str, body: &str) -> Self {
        let mut b = Body::new();
        for c in body.chars() {
            if b.push(c).is_err() {
                break;
            }
        }
        Self {
            timestamp,
            direction,
            phone: normalize_phone(phone),
            body: b,
        }
    }

    /// Encode into a 256-byte record.
    ///
    /// Layout (little-endian):
    /// ```text
    /// [0..4]     timestamp  u32
    /// [4]        is_sent    u8
    /// [5..7]     reserved
    /// [7]        body_len   u8
    /// [8..28]    phone      [u8; 20]   NUL-padded
    /// [28..189]  body       [u8; 161]  NUL-terminated
    /// [189..256] padding
    /// ```
    #[must_use]
    #[allow(clippy::indexing_slicing)] // constant ranges inside a fixed array
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[4] = u8::from(self.direction == Direction::Sent);
        let body = self.body.as_bytes();
        buf[7] = u8::try_from(body.len()).unwrap_or(u8::MAX);
        buf[8..8 + self.phone.len()].copy_from_slice(self.phone.as_bytes());
        buf[28..28 + body.len()].copy_from_slice(body);
        buf
    }

    /// Decode a record; fails on out-of-range lengths or invalid UTF-8.
    #[allow(clippy::indexing_slicing)] // constant ranges inside a fixed array
    pub fn decode(buf: &[u8; Self::SIZE]) -> Result<Self, StoreError> {
        let timestamp = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let direction = if buf[4] != 0 {
            Direction::Sent
        } else {
            Direction::Received
        };
        let body_len = usize::from(buf[7]);
        if body_len > MAX_BODY {
            return Err(StoreError::Corrupt);
        }
        let phone_raw = &buf[8..28];
        let phone_len = phone_raw.iter().position(|b| *b == 0).unwrap_or(MAX_PHONE);
        let phone = core::str::from_utf8(&phone_raw[..phone_len]).map_err(|_| StoreError::Corrupt)?;
        let body = core::str::from_utf8(&buf[28..28 + body_len]).map_err(|_| StoreError::Corrupt)?;
        Ok(Self {
            timestamp,
            direction,
            phone: Phone::try_from(phone).map_err(|_| StoreError::Corrupt)?,
            body: Body::try_from(body).map_err(|_| StoreError::Corrupt)?,
        })
    }
}

/// Append a message to its conversation file.
pub async fn append<S: Storage>(sd: &mut S, record: &SmsRecord) -> Result<(), StoreError> {
    if record.phone.is_empty() {
        return Err(StoreError::InvalidName);
    }
    ensure_dir(sd, SMS_ROOT).await?;
    let path = sms_path(&record.phone)?;
    sd.append(&path, &record.encode()).await.map_err(io)
}

async fn record_count<S: Storage>(sd: &mut S, path: &str) -> Result<u64, StoreError> {
    Ok(sd.file_size(path).await.map_err(io)?.unwrap_or(0) / SmsRecord::SIZE as u64)
}

async fn read_record<S: Storage>(sd: &mut S, path: &str, index: u64) -> Result<SmsRecord, StoreError> {
    let mut buf = [0u8; SmsRecord::SIZE];
    let offset = index.saturating_mul(SmsRecord::SIZE as u64);
    let n = sd.read_at(path, offset, &mut buf).await.map_err(io)?;
    if n != SmsRecord::SIZE {
        return Err(StoreError::Corrupt);
    }
    SmsRecord::decode(&buf)
}

/// Load the newest `N` messages of a conversation, oldest first.
pub async fn load_conversation<S: Storage, const N: usize>(
    sd: &mut S,
    phone: &str,
    out: &mut Vec<SmsRecord, N>,
) -> Result<(), StoreError> {
    out.clear();
    let path = sms_path(&normalize_phone(phone))?;
    let count = record_count(sd, &path).await?;
    let first = count.saturating_sub(N as u64);
    for index in first..count {
        match read_record(sd, &path, index).await {
            Ok(rec) => {
                let _ = out.push(rec);
            }
            Err(StoreError::Corrupt) => tracing::warn!("sms: skipping corrupt record {}", index),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Inbox row: a conversation and its newest message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    /// Normalized peer number.
    pub phone: Phone,
    /// Messages stored.
    pub count: u32,
    /// Newest message.
    pub last: SmsRecord,
}

impl Conversation {
    /// One-line preview: direction marker and the start of the body.
    pub fn preview(&self) -> String<48> {
        let mut out = String::new();
        let _ = out.push_str(self.last.direction.marker());
        let _ = out.push(' ');
        for c in self.last.body.chars() {
            let c = if c == '\n' { ' ' } else { c };
            if out.push(c).is_err() {
                break;
            }
        }
        out
    }
}

/// List conversations, newest first.
pub async fn list_conversations<S: Storage>(
    sd: &mut S,
) -> Result<Vec<Conversation, MAX_CONVERSATIONS>, StoreError> {
    let mut out = Vec::new();
    if !sd.exists(SMS_ROOT).await.map_err(io)? {
        return Ok(out);
    }
    let mut phones: Vec<Phone, MAX_CONVERSATIONS> = Vec::new();
    sd.list_dir(SMS_ROOT, |entry| {
        let is_bin = extension(&entry.name).is_some_and(|e| e.eq_ignore_ascii_case("bin"));
        if !entry.is_dir && is_bin && entry.size >= SmsRecord::SIZE as u64 {
            if let Ok(phone) = Phone::try_from(stem(&entry.name)) {
                let _ = phones.push(phone);
            }
        }
    })
    .await
    .map_err(io)?;

    for phone in phones {
        let path = sms_path(&phone)?;
        let count = record_count(sd, &path).await?;
        if count == 0 {
            continue;
        }
        if let Ok(last) = read_record(sd, &path, count - 1).await {
            let _ = out.push(Conversation {
                phone,
                count: u32::try_from(count).unwrap_or(u32::MAX),
                last,
            });
        }
    }
    out.sort_unstable_by(|a, b| b.last.timestamp.cmp(&a.last.timestamp));
    Ok(out)
}

/// Delete a whole conversation.
pub async fn delete_conversation<S: Storage>(sd: &mut S, phone: &str) -> Result<(), StoreError> {
    let path = sms_path(&normalize_phone(phone))?;
    if sd.exists(&path).await.map_err(io)? {
        sd.remove(&path).await.map_err(io)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::MemStorage;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone(" +1 (234) 56-78 ").as_str(), "+12345678");
        assert_eq!(normalize_phone("0044 20").as_str(), "004420");
        assert_eq!(normalize_phone("abc").as_str(), "");
    }

    #[test]
    fn test_record_layout() {
        let rec = SmsRecord::new(1_700_000_000, Direction::Sent, "+1234", "hello");
        let buf = rec.encode();
        assert_eq!(&buf[0..4], &1_700_000_000u32.to_le_bytes());
        assert_eq!(buf[4], 1);
        assert_eq!(buf[7], 5);
        assert_eq!(&buf[8..13], b"+1234");
        assert_eq!(&buf[28..33], b"hello");
        assert_eq!(buf[33], 0);
        assert_eq!(SmsRecord::decode(&buf).unwrap(), rec);
    }

    #[test]
    fn test_decode_rejects_bad_length() {
        let mut buf = SmsRecord::new(0, Direction::Received, "1", "x").encode();
        buf[7] = 200;
        assert_eq!(SmsRecord::decode(&buf), Err(StoreError::Corrupt));
    }

    #[test]
    fn test_long_body_truncated_on_char_boundary() {
        let body = "é".repeat(100);
        let rec = SmsRecord::new(0, Direction::Sent, "1", &body);
        assert_eq!(rec.body.len(), 160);
        assert!(SmsRecord::decode(&rec.encode()).is_ok());
    }

    #[tokio::test]
    async fn test_conversation_and_inbox() {
        let fs = MemStorage::new();
        let mut sd = fs.clone();
        append(&mut sd, &SmsRecord::new(100, Direction::Sent, "+1234", "hello")).await.unwrap();
        append(&mut sd, &SmsRecord::new(200, Direction::Received, "+1234", "ack")).await.unwrap();
        append(&mut sd, &SmsRecord::new(150, Direction::Received, "+999", "hi")).await.unwrap();

        let mut convo: Vec<SmsRecord, 8> = Vec::new();
        load_conversation(&mut sd, "+1234", &mut convo).await.unwrap();
        assert_eq!(convo.len(), 2);
        assert_eq!(convo[0].body.as_str(), "hello");
        assert_eq!(convo[1].direction, Direction::Received);

        let inbox = list_conversations(&mut sd).await.unwrap();
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0].phone.as_str(), "+1234");
        assert_eq!(inbox[0].preview().as_str(), "<<< ack");
        assert_eq!(inbox[1].count, 1);
    }

    #[tokio::test]
    async fn test_conversation_keeps_newest() {
        let fs = MemStorage::new();
        let mut sd = fs.clone();
        for i in 0..5u32 {
            let body = format!("m{i}");
            append(&mut sd, &SmsRecord::new(i, Direction::Sent, "42", &body)).await.unwrap();
        }
        let mut convo: Vec<SmsRecord, 2> = Vec::new();
        load_conversation(&mut sd, "42", &mut convo).await.unwrap();
        assert_eq!(convo[0].body.as_str(), "m3");
        assert_eq!(convo[1].body.as_str(), "m4");
    }
}
