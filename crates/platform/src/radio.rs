//! LoRa mesh radio abstraction
//!
//! The mesh protocol itself is external; the runtime only pumps it once per
//! tick, asks whether a transmit is imminent (so audio can back off the SPI
//! bus) and re-tunes it from the settings screen.

use serde::{Deserialize, Serialize};

/// Lowest tunable frequency (kHz).
pub const FREQ_MIN_KHZ: u32 = 400_000;
/// Highest tunable frequency (kHz).
pub const FREQ_MAX_KHZ: u32 = 960_000;
/// Frequency edit step: 0.1 MHz.
pub const FREQ_STEP_KHZ: u32 = 100;
/// Legal spreading factors.
pub const SF_RANGE: core::ops::RangeInclusive<u8> = 5..=12;
/// Legal coding-rate denominators (4/5 .. 4/8).
pub const CR_RANGE: core::ops::RangeInclusive<u8> = 5..=8;
/// Lowest TX power the transceiver accepts (dBm).
pub const TX_MIN_DBM: i8 = -9;

/// LoRa channel bandwidths offered by the settings screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bandwidth {
    /// 31.25 kHz
    Khz31,
    /// 62.5 kHz
    Khz62,
    /// 125 kHz
    Khz125,
    /// 250 kHz
    Khz250,
    /// 500 kHz
    Khz500,
}

impl Bandwidth {
    /// Cycle order used by the up/down keys.
    pub const ALL: [Bandwidth; 5] = [
        Self::Khz31,
        Self::Khz62,
        Self::Khz125,
        Self::Khz250,
        Self::Khz500,
    ];

    /// Bandwidth in Hz.
    pub const fn hz(self) -> u32 {
        match self {
            Self::Khz31 => 31_250,
            Self::Khz62 => 62_500,
            Self::Khz125 => 125_000,
            Self::Khz250 => 250_000,
            Self::Khz500 => 500_000,
        }
    }

    /// Display label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Khz31 => "31.25",
            Self::Khz62 => "62.5",
            Self::Khz125 => "125",
            Self::Khz250 => "250",
            Self::Khz500 => "500",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|b| *b == self).unwrap_or(2)
    }

    /// Next wider bandwidth, wrapping to the narrowest.
    pub fn next(self) -> Self {
        let idx = self.index().wrapping_add(1) % Self::ALL.len();
        Self::ALL.get(idx).copied().unwrap_or(self)
    }

    /// Next narrower bandwidth, wrapping to the widest.
    pub fn prev(self) -> Self {
        let idx = self
            .index()
            .checked_sub(1)
            .unwrap_or(Self::ALL.len().saturating_sub(1));
        Self::ALL.get(idx).copied().unwrap_or(self)
    }
}

/// Tunable radio parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioParams {
    /// Centre frequency in kHz.
    pub freq_khz: u32,
    /// Channel bandwidth.
    pub bandwidth: Bandwidth,
    /// Spreading factor.
    pub sf: u8,
    /// Coding-rate denominator.
    pub cr: u8,
    /// Transmit power in dBm.
    pub tx_dbm: i8,
}

impl RadioParams {
    /// `"869.525"` style MHz label with three decimals.
    pub fn freq_label(&self) -> heapless::String<12> {
        use core::fmt::Write as _;
        let mut s = heapless::String::new();
        let _ = write!(s, "{}.{:03}", self.freq_khz / 1000, self.freq_khz % 1000);
        s
    }
}

impl Default for RadioParams {
    fn default() -> Self {
        PRESETS[0].params
    }
}

/// A named parameter set offered by the preset picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioPreset {
    /// Picker label.
    pub name: &'static str,
    /// Parameters applied when picked (TX power is kept).
    pub params: RadioParams,
}

/// Presets shown by the settings picker.
pub const PRESETS: [RadioPreset; 4] = [
    RadioPreset {
        name: "EU Narrow",
        params: RadioParams {
            freq_khz: 869_618,
            bandwidth: Bandwidth::Khz62,
            sf: 8,
            cr: 8,
            tx_dbm: 14,
        },
    },
    RadioPreset {
        name: "US Default",
        params: RadioParams {
            freq_khz: 910_525,
            bandwidth: Bandwidth::Khz250,
            sf: 10,
            cr: 5,
            tx_dbm: 20,
        },
    },
    RadioPreset {
        name: "Long Range",
        params: RadioParams {
            freq_khz: 869_525,
            bandwidth: Bandwidth::Khz125,
            sf: 12,
            cr: 8,
            tx_dbm: 14,
        },
    },
    RadioPreset {
        name: "433 MHz",
        params: RadioParams {
            freq_khz: 433_650,
            bandwidth: Bandwidth::Khz62,
            sf: 9,
            cr: 6,
            tx_dbm: 10,
        },
    },
];

/// Something the mesh stack surfaced during a pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshEvent {
    /// A text message addressed to us or to a joined channel.
    Text {
        /// Sender display name.
        from: heapless::String<32>,
        /// Message body.
        body: heapless::String<160>,
    },
    /// A node advert was heard.
    Advert {
        /// Node name.
        name: heapless::String<32>,
    },
}

/// Mesh transceiver plus protocol stack.
pub trait MeshRadio {
    /// Error type
    type Error: core::fmt::Debug;

    /// Service the stack once: receive or transmit at most one packet.
    fn pump(
        &mut self,
    ) -> impl core::future::Future<Output = Result<Option<MeshEvent>, Self::Error>>;

    /// `true` while a transmit is queued or on air.
    fn tx_pending(&self) -> bool;

    /// Re-tune the transceiver.
    fn apply(
        &mut self,
        params: &RadioParams,
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Board-specific TX power ceiling (dBm).
    fn max_tx_dbm(&self) -> i8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bandwidth_cycles_both_ways() {
        assert_eq!(Bandwidth::Khz500.next(), Bandwidth::Khz31);
        assert_eq!(Bandwidth::Khz31.prev(), Bandwidth::Khz500);
        assert_eq!(Bandwidth::Khz62.next(), Bandwidth::Khz125);
        let mut bw = Bandwidth::Khz125;
        for _ in 0..5 {
            bw = bw.next();
        }
        assert_eq!(bw, Bandwidth::Khz125);
    }

    #[test]
    fn test_freq_label() {
        let p = RadioParams {
            freq_khz: 869_525,
            ..RadioParams::default()
        };
        assert_eq!(p.freq_label().as_str(), "869.525");
    }

    #[test]
    fn test_presets_are_legal() {
        for preset in PRESETS {
            let p = preset.params;
            assert!((FREQ_MIN_KHZ..=FREQ_MAX_KHZ).contains(&p.freq_khz));
            assert!(SF_RANGE.contains(&p.sf));
            assert!(CR_RANGE.contains(&p.cr));
        }
    }
}
