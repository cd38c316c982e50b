//! E-ink panel seam and refresh modes.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

/// E-ink panel: an off-screen framebuffer plus a slow refresh.
///
/// Drawing through [`DrawTarget`] only touches the framebuffer; nothing
/// reaches the glass (or the SPI bus) until [`refresh`](Self::refresh).
pub trait EinkPanel: DrawTarget<Color = BinaryColor> {
    /// Error type for panel operations
    type PanelError: core::fmt::Debug;

    /// Push the framebuffer to the panel (~650 ms for a full refresh).
    fn refresh(
        &mut self,
        mode: RefreshMode,
    ) -> impl core::future::Future<Output = Result<(), Self::PanelError>>;

    /// Power the controller down; the last image stays on the glass.
    fn sleep(&mut self) -> impl core::future::Future<Output = Result<(), Self::PanelError>>;

    /// Panel size in pixels.
    fn dimensions(&self) -> Size {
        self.bounding_box().size
    }
}

/// Waveform used for one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RefreshMode {
    /// Whole-panel waveform; clears ghosting.
    Full,
    /// Fast waveform for list and cursor updates.
    Partial,
}
