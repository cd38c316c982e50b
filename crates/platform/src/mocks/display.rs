//! Mock e-ink panel.

use std::cell::RefCell;
use std::rc::Rc;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use super::MockClock;
use crate::clock::Clock;
use crate::display::{EinkPanel, RefreshMode};

#[derive(Debug)]
struct PanelState {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
    refreshes: Vec<(u64, RefreshMode)>,
    asleep: bool,
}

/// Framebuffer-backed panel that records refreshes with their timestamps.
#[derive(Debug, Clone)]
pub struct MockPanel {
    state: Rc<RefCell<PanelState>>,
    clock: MockClock,
    refresh_ms: u64,
}

impl MockPanel {
    /// Create new mock panel. Each refresh advances `clock` by `refresh_ms`.
    pub fn new(width: u32, height: u32, clock: MockClock, refresh_ms: u64) -> Self {
        Self {
            state: Rc::new(RefCell::new(PanelState {
                width,
                height,
                pixels: vec![false; (width * height) as usize],
                refreshes: Vec::new(),
                asleep: false,
            })),
            clock,
            refresh_ms,
        }
    }

    /// Get refresh count
    pub fn refresh_count(&self) -> usize {
        self.state.borrow().refreshes.len()
    }

    /// Timestamps (at start) of every refresh.
    pub fn refresh_times(&self) -> Vec<u64> {
        self.state.borrow().refreshes.iter().map(|(t, _)| *t).collect()
    }

    /// Number of set (black) pixels in the framebuffer.
    pub fn ink(&self) -> usize {
        self.state.borrow().pixels.iter().filter(|p| **p).count()
    }

    /// `true` after `sleep`.
    pub fn is_asleep(&self) -> bool {
        self.state.borrow().asleep
    }
}

impl DrawTarget for MockPanel {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let mut s = self.state.borrow_mut();
        let (w, h) = (s.width as i32, s.height as i32);
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 && point.x < w && point.y < h {
                let idx = (point.y * w + point.x) as usize;
                s.pixels[idx] = color.is_on();
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let mut s = self.state.borrow_mut();
        s.pixels.fill(color.is_on());
        Ok(())
    }
}

impl OriginDimensions for MockPanel {
    fn size(&self) -> Size {
        let s = self.state.borrow();
        Size::new(s.width, s.height)
    }
}

impl EinkPanel for MockPanel {
    type PanelError = core::convert::Infallible;

    async fn refresh(&mut self, mode: RefreshMode) -> Result<(), Self::PanelError> {
        let now = self.clock.now_ms();
        {
            let mut s = self.state.borrow_mut();
            s.refreshes.push((now, mode));
            s.asleep = false;
        }
        self.clock.advance(self.refresh_ms);
        Ok(())
    }

    async fn sleep(&mut self) -> Result<(), Self::PanelError> {
        self.state.borrow_mut().asleep = true;
        Ok(())
    }
}
