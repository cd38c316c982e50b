//! Volume steps.
//!
//! The decoder takes a step index in `0..=MAX_VOLUME`; the player exposes it
//! directly and maps it to a percentage only for the bar graph.

use platform::audio::MAX_VOLUME;

/// Step used on first open when no bookmark exists.
pub const DEFAULT_VOLUME: u8 = 12;

/// Direction of a volume key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKey {
    /// `+` or `=`.
    Up,
    /// `-` or `_`.
    Down,
}

/// Volume meaning of a key byte.
pub fn volume_key(key: u8) -> Option<VolumeKey> {
    match key {
        b'+' | b'=' => Some(VolumeKey::Up),
        b'-' | b'_' => Some(VolumeKey::Down),
        _ => None,
    }
}

/// Apply one key to `step`, clamped to `0..=MAX_VOLUME`.
pub fn step(current: u8, key: VolumeKey) -> u8 {
    match key {
        VolumeKey::Up => current.saturating_add(1).min(MAX_VOLUME),
        VolumeKey::Down => current.saturating_sub(1),
    }
}

/// Step as a percentage of full scale.
pub fn percent(step: u8) -> u8 {
    let step = u16::from(step.min(MAX_VOLUME));
    u8::try_from(step.saturating_mul(100) / u16::from(MAX_VOLUME)).unwrap_or(100)
}
