//! Keyboard abstraction
//!
//! The keyboard controller delivers already-combined bytes: printable ASCII,
//! `\b`, `\r`, `0x18` (shift+backspace), `0xF1..=0xF4` (arrows from the
//! trackball) and `0x01` (emoji key). Sticky modifiers are resolved before
//! the byte reaches the router.

/// Matrix keyboard.
pub trait Keyboard {
    /// Next pending byte, or `None` if no key was pressed since the last call.
    fn read_key(&mut self) -> Option<u8>;
}
