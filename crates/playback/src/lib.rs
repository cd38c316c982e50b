//! Audiobook playback: decoder pipeline, bookmarks, chapters, volume and
//! the sleep timer.
//!
//! The pipeline is cooperative. The UI task calls
//! [`AudioPipeline::tick`] at the top of every loop iteration and the tick
//! does a bounded amount of decoder work before returning.
#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod bookmark;
pub mod chapters;
mod error;
pub mod pipeline;
pub mod playlist;
pub mod sleep;
pub mod volume;

pub use bookmark::Bookmark;
pub use error::PipelineError;
pub use pipeline::{AudioPipeline, Book, PipelineState, TickEvent};
pub use playlist::Playlist;
pub use sleep::SleepTimer;
pub use volume::VolumeKey;
