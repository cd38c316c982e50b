//! Audiobook library: directory listing, tag parsing seam and the
//! per-directory metadata cache.
//!
//! # Modules
//!
//! - [`track`]: `FileEntry` rows and the `MediaKind` tag
//! - [`metadata`]: `TagParser` seam, `TrackTags`, chapter list
//! - [`cache`]: `.metacache` v1 codec keyed by (file name, size)
//! - [`title`]: file-name derived titles
//! - [`scanner`]: the directory scan pipeline

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]
#![allow(async_fn_in_trait)]

pub mod cache;
pub mod metadata;
pub mod scanner;
pub mod title;
pub mod track;

mod error;

pub use cache::{CacheEntry, MetaCache};
pub use error::CacheError;
pub use metadata::{TagParser, TrackTags};
pub use scanner::{Library, MAX_DIR_ENTRIES};
pub use track::{FileEntry, MediaKind};
