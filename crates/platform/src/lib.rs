//! Hardware Abstraction Layer (HAL) for the Meshdeck handheld
//!
//! This crate provides trait-based abstractions for every device the
//! cooperative runtime touches, so that the feature crates can be developed
//! and tested on the host without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate: runtime tick + screens)
//!         ↓
//! Feature Layers (ui, text, library, playback, store, modem, web)
//!         ↓
//! Platform HAL (this crate - trait abstractions + SPI discipline)
//!         ↓
//! Board support (ESP32-S3 HAL, SX1262, SD, e-ink panel)
//! ```
//!
//! # Shared SPI bus
//!
//! The LoRa transceiver, the e-ink panel and the SD card share one SPI bus.
//! [`spi::SpiArbiter`] records which slave currently owns the bus and
//! [`spi::CsGuard`] drives the owner's chip-select high when dropped, on every
//! return path. [`spi::CsReleasingStorage`], [`spi::CsPanel`] and
//! [`spi::CsRadio`] apply the guard to every bus access of their slave.
//!
//! # Features
//!
//! - `std`: host storage ([`storage_local`]) and the [`mocks`] module
//! - `defmt`: `defmt::Format` derives on public enums

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

pub mod audio;
pub mod clock;
pub mod config;
pub mod display;
pub mod input;
pub mod modem;
pub mod net;
pub mod power;
pub mod radio;
pub mod spi;
pub mod storage;

#[cfg(feature = "std")]
pub mod storage_local;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

// Re-export main high-level traits
pub use audio::{AudioDecoder, EofLatch};
pub use clock::{Clock, EmbassyClock, WallClock};
pub use display::{EinkPanel, RefreshMode};
pub use input::Keyboard;
pub use modem::{AtPort, ModemPower};
pub use net::{Connector, WifiLink, WifiNetwork};
pub use power::{
    CpuClock, CpuGovernor, DeepSleep, Gnss, GpsDutyCycle, GpsPower, GpsState, PowerMonitor,
    SleepPlan, WakeSource,
};
pub use radio::{Bandwidth, MeshEvent, MeshRadio, RadioParams};
pub use spi::{BusOwner, CsError, CsGuard, CsPanel, CsRadio, CsReleasingStorage, SpiArbiter, SpiError, SPI_BUS};
pub use storage::{DirEntry, PathBuf, Storage};
