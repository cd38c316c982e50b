//! Audiobook bookmark record.
//!
//! 72 bytes on disk: `filename[64]` (NUL-terminated), `position_s` u32 LE,
//! `volume` u8, three bytes padding. Stored as
//! `/audiobooks/.bookmarks/<stem>.bmk` so the record survives the temporary
//! `.m4b` to `.m4a` rename.

use heapless::String;
use platform::audio::MAX_VOLUME;
use platform::Storage;
use store::fs::{atomic_write, ensure_dir, read_file};
use store::paths::{bookmark_path, BOOKMARK_DIR};
use store::StoreError;

/// On-disk size.
pub const RECORD_SIZE: usize = 72;

const NAME_FIELD: usize = 64;

/// Saved position in one book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    /// File name the position belongs to.
    pub file_name: String<{ NAME_FIELD - 1 }>,
    /// Position in whole seconds.
    pub position_s: u32,
    /// Volume step.
    pub volume: u8,
}

impl Bookmark {
    /// Serialize.
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        let (name, rest) = out.split_at_mut(NAME_FIELD);
        let bytes = self.file_name.as_bytes();
        let n = bytes.len().min(NAME_FIELD.saturating_sub(1));
        if let (Some(dst), Some(src)) = (name.get_mut(..n), bytes.get(..n)) {
            dst.copy_from_slice(src);
        }
        if let Some(pos) = rest.get_mut(..4) {
            pos.copy_from_slice(&self.position_s.to_le_bytes());
        }
        if let Some(v) = rest.get_mut(4) {
            *v = self.volume;
        }
        out
    }

    /// Deserialize; `None` on a size mismatch or a name that is not UTF-8.
    pub fn decode(raw: &[u8]) -> Option<Self> {
        if raw.len() != RECORD_SIZE {
            return None;
        }
        let (name, rest) = raw.split_at(NAME_FIELD);
        let end = name.iter().position(|b| *b == 0).unwrap_or(NAME_FIELD.saturating_sub(1));
        let name = core::str::from_utf8(name.get(..end)?).ok()?;
        let position_s = u32::from_le_bytes(rest.get(..4)?.try_into().ok()?);
        let volume = (*rest.get(4)?).min(MAX_VOLUME);
        let mut file_name = String::new();
        file_name.push_str(name).ok()?;
        Some(Self {
            file_name,
            position_s,
            volume,
        })
    }

    /// Load the bookmark for `file_name`. A missing or malformed record is
    /// `Ok(None)`.
    pub async fn load<S: Storage>(sd: &mut S, file_name: &str) -> Result<Option<Self>, StoreError> {
        let path = bookmark_path(file_name)?;
        let mut raw = [0u8; RECORD_SIZE];
        match read_file(sd, &path, &mut raw).await {
            Ok(Some(RECORD_SIZE)) => Ok(Self::decode(&raw)),
            Ok(Some(n)) => {
                tracing::warn!("bookmark: {} has {} bytes, ignoring", path.as_str(), n);
                Ok(None)
            }
            Ok(None) => Ok(None),
            Err(StoreError::TooLarge) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write the record (delete-then-write).
    pub async fn save<S: Storage>(&self, sd: &mut S) -> Result<(), StoreError> {
        ensure_dir(sd, BOOKMARK_DIR).await?;
        let path = bookmark_path(&self.file_name)?;
        atomic_write(sd, &path, &self.encode()).await?;
        tracing::debug!("bookmark: {} at {}s", self.file_name.as_str(), self.position_s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::MemStorage;

    fn mark(name: &str, pos: u32, vol: u8) -> Bookmark {
        let mut file_name = String::new();
        file_name.push_str(name).unwrap();
        Bookmark {
            file_name,
            position_s: pos,
            volume: vol,
        }
    }

    #[test]
    fn test_layout() {
        let raw = mark("book.m4b", 0x0102_0304, 10).encode();
        assert_eq!(&raw[..8], b"book.m4b");
        assert_eq!(raw[8], 0);
        assert_eq!(&raw[64..68], &[4, 3, 2, 1]);
        assert_eq!(raw[68], 10);
        assert_eq!(&raw[69..], &[0, 0, 0]);
    }

    #[test]
    fn test_decode_rejects_wrong_size() {
        assert_eq!(Bookmark::decode(&[0u8; 71]), None);
    }

    #[tokio::test]
    async fn test_save_uses_stem_path() {
        let fs = MemStorage::new();
        let mut sd = fs.clone();
        mark("book.m4b", 500, 10).save(&mut sd).await.unwrap();
        assert!(fs.contains("/audiobooks/.bookmarks/book.bmk"));
        // The temporary .m4a name finds the same record.
        let back = Bookmark::load(&mut sd, "book.m4a").await.unwrap().unwrap();
        assert_eq!(back, mark("book.m4b", 500, 10));
    }

    #[tokio::test]
    async fn test_truncated_record_ignored() {
        let fs = MemStorage::new();
        fs.insert("/audiobooks/.bookmarks/x.bmk", &[1u8; 40]);
        let mut sd = fs.clone();
        assert_eq!(Bookmark::load(&mut sd, "x.mp3").await, Ok(None));
    }
}
