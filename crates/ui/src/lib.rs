//! Application UI layer: screen identities, navigation, key routing,
//! refresh deadlines and the view-models that carry real state machines
//! (settings, audiobook player).
//!
//! Nothing here draws pixels or touches the SD card; the firmware crate
//! feeds keys in and renders what these types decide.
//!
//! `no_std`; state lives in `heapless` containers.

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod deadline;
pub mod keys;
pub mod navigation;
pub mod player;
pub mod router;
pub mod screen;
pub mod settings;

pub use deadline::RefreshDeadline;
pub use navigation::Navigator;
pub use player::{PlaybackState, PlayerSnapshot, PlayerView};
pub use router::{GlobalKey, Route, Router};
pub use screen::ScreenId;
pub use settings::{EditMode, Row, SettingsEvent, SettingsModel};
