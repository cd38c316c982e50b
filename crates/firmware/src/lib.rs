//! Meshdeck application runtime
//!
//! One cooperative loop on the application core drives every screen, the
//! audiobook decoder and the mesh stack. The cellular modem worker runs
//! elsewhere and is reached only through [`modem::SMS_QUEUES`] and
//! [`modem::MODEM_STATUS`].
//!
//! # Architecture
//!
//! ```text
//! Runtime::tick ─ key ─► Router ─► Screen::handle_input
//!               ─ audio tick (AudioPipeline)
//!               ─ mesh pump + SMS receive queue
//!               ─ Screen::poll
//!               ─ power governors
//!               ─ redraw when the refresh deadline is due
//! ```
//!
//! Everything is generic over a [`Board`], the bundle of device types. The
//! board's entry point builds [`Devices`], calls [`Runtime::boot`], spawns
//! the modem worker when [`BootReport::modem_enabled`] says so, and then
//! awaits [`Runtime::run`].
//!
//! # Features
//!
//! - `std`: host builds (tests, tooling)
//! - `defmt`: `defmt::Format` derives on public enums, propagated to every
//!   local crate

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::await_holding_lock)]
#![warn(clippy::print_stdout)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(async_fn_in_trait)]

pub mod board;
pub mod error;
pub mod notify;
pub mod power;
pub mod render;
pub mod runtime;
pub mod screens;

pub use board::{Board, Buffers, Devices, Panel, Radio, SdCard, Shared};
pub use error::AppError;
pub use runtime::{BootReport, Runtime};
