//! Text layout for the 40-column e-ink font.
//!
//! - [`wrap`]: the line breaker every text view uses
//! - [`page`]: byte offsets of page starts, built from the line breaker
//! - [`cp437`]: folding Unicode scalar values onto the bitmap font's glyph set
//! - [`editor`]: a bounded edit buffer with a visual-line index for cursor moves
//!
//! This crate is `no_std` by default; it only uses `core` + `heapless`.

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod cp437;
pub mod editor;
pub mod page;
pub mod wrap;

pub use editor::{Editor, EditorError, EDITOR_CAPACITY};
pub use page::PageIndex;
pub use wrap::{lines, next_line, LineSpan};
