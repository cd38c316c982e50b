//! Cellular modem worker: AT codec, power/registration state machine,
//! bounded SMS queues and the status atoms the UI reads.
//!
//! The worker owns the UART and the control lines. Everything else talks to
//! it through [`SmsQueues`] and [`ModemStatus`].

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod at;
pub mod queue;
pub mod status;
pub mod worker;

mod error;

pub use error::AtError;
pub use queue::{IncomingSms, OutgoingSms, SmsQueues, SMS_QUEUES};
pub use status::{ModemState, ModemStatus, MODEM_STATUS};
pub use worker::ModemWorker;
