//! Device settings blob: `/settings.bin`.
//!
//! postcard-encoded [`DeviceSettings`] followed by a little-endian CRC-32 of
//! the encoded bytes. A missing, truncated or corrupt blob loads as the
//! defaults so the device always boots.

use heapless::{String, Vec};
use platform::config::SETTINGS_PATH;
use platform::radio::RadioParams;
use platform::Storage;
use serde::{Deserialize, Serialize};

use crate::fs::{atomic_write, read_file};
use crate::StoreError;

/// Channel slots.
pub const MAX_CHANNELS: usize = 8;

/// Longest node name.
pub const MAX_NODE_NAME: usize = 24;

/// Upper bound of the encoded blob including the CRC trailer.
pub const MAX_BLOB: usize = 768;

/// A mesh group channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Display name, e.g. `#local`.
    pub name: String<16>,
    /// Pre-shared key, base64.
    pub psk: String<44>,
}

/// Persisted device settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Name advertised on the mesh.
    pub node_name: String<MAX_NODE_NAME>,
    /// Radio tuning.
    pub radio: RadioParams,
    /// Local time offset from UTC in minutes.
    pub utc_offset_min: i16,
    /// Group channels, compacted (no gaps).
    pub channels: Vec<Channel, MAX_CHANNELS>,
    /// `false` until onboarding finished.
    pub onboarded: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            node_name: String::new(),
            radio: RadioParams::default(),
            utc_offset_min: 0,
            channels: Vec::new(),
            onboarded: false,
        }
    }
}

impl DeviceSettings {
    /// Encode into `buf`; returns the slice written.
    pub fn encode<'a>(&self, buf: &'a mut [u8; MAX_BLOB]) -> Result<&'a [u8], StoreError> {
        let body_len = postcard::to_slice(self, buf.as_mut_slice())
            .map_err(|_| StoreError::TooLarge)?
            .len();
        let crc = crc32fast::hash(buf.get(..body_len).unwrap_or(&[]));
        let end = body_len.saturating_add(4);
        buf.get_mut(body_len..end)
            .ok_or(StoreError::TooLarge)?
            .copy_from_slice(&crc.to_le_bytes());
        Ok(buf.get(..end).unwrap_or(&[]))
    }

    /// Decode and verify a blob.
    pub fn decode(blob: &[u8]) -> Result<Self, StoreError> {
        let split = blob.len().checked_sub(4).ok_or(StoreError::Corrupt)?;
        let (body, trailer) = blob.split_at(split);
        let stored = u32::from_le_bytes(trailer.try_into().map_err(|_| StoreError::Corrupt)?);
        if crc32fast::hash(body) != stored {
            return Err(StoreError::Corrupt);
        }
        postcard::from_bytes(body).map_err(|_| StoreError::Corrupt)
    }

    /// Load from the card, falling back to defaults.
    pub async fn load<S: Storage>(sd: &mut S) -> Self {
        let mut buf = [0u8; MAX_BLOB];
        match read_file(sd, SETTINGS_PATH, &mut buf).await {
            Ok(Some(n)) => match Self::decode(buf.get(..n).unwrap_or(&[])) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!("settings: read failed ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Write to the card.
    pub async fn save<S: Storage>(&self, sd: &mut S) -> Result<(), StoreError> {
        let mut buf = [0u8; MAX_BLOB];
        let blob = self.encode(&mut buf)?;
        atomic_write(sd, SETTINGS_PATH, blob).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::MemStorage;
    use platform::radio::{Bandwidth, PRESETS};

    fn sample() -> DeviceSettings {
        let mut s = DeviceSettings {
            node_name: String::try_from("trailhead").unwrap(),
            radio: PRESETS[2].params,
            utc_offset_min: -300,
            onboarded: true,
            ..DeviceSettings::default()
        };
        s.radio.bandwidth = Bandwidth::Khz62;
        s.channels
            .push(Channel {
                name: String::try_from("#hike").unwrap(),
                psk: String::try_from("c2VjcmV0").unwrap(),
            })
            .unwrap();
        s
    }

    #[tokio::test]
    async fn test_round_trip_on_card() {
        let fs = MemStorage::new();
        let mut sd = fs.clone();
        assert_eq!(DeviceSettings::load(&mut sd).await, DeviceSettings::default());
        sample().save(&mut sd).await.unwrap();
        assert_eq!(DeviceSettings::load(&mut sd).await, sample());
    }

    #[test]
    fn test_corrupt_blob_rejected() {
        let mut buf = [0u8; MAX_BLOB];
        let mut blob = sample().encode(&mut buf).unwrap().to_vec();
        blob[3] ^= 0xFF;
        assert_eq!(DeviceSettings::decode(&blob), Err(StoreError::Corrupt));
        assert_eq!(DeviceSettings::decode(&[1, 2]), Err(StoreError::Corrupt));
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_defaults() {
        let fs = MemStorage::new();
        fs.insert("/settings.bin", b"garbage!");
        let mut sd = fs.clone();
        assert_eq!(DeviceSettings::load(&mut sd).await, DeviceSettings::default());
    }
}
