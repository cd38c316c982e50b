//! SD-card persistence.
//!
//! Every file follows one discipline: a write removes any existing file and
//! writes the new content in full; a read opens, reads and closes. The
//! [`platform::Storage`] implementation releases the SD chip-select after
//! each call, so nothing here holds the bus between operations.
//!
//! | File | Module |
//! |---|---|
//! | `/notes/<name>.txt` | [`notes`] |
//! | `/sms/contacts.txt` | [`contacts`] |
//! | `/sms/<phone>.bin` | [`sms`] |
//! | `/sms/modem.cfg`, `/web/wifi.cfg` | [`cfg`] |
//! | `/web/bookmarks.txt`, `/web/history.txt` | [`urls`] |
//! | `/settings.bin` | [`settings`] |

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]
#![allow(async_fn_in_trait)]

pub mod cfg;
pub mod contacts;
pub mod fs;
pub mod notes;
pub mod paths;
pub mod settings;
pub mod sms;
pub mod urls;

mod error;

pub use error::StoreError;
