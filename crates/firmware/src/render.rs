//! Frame renderer over the panel's framebuffer.
//!
//! A [`Frame`] clears the framebuffer when it begins and offers the few
//! primitives the screens need: text on the 40×30 grid of the small font, a
//! larger title font, inverted selection bars, rectangles and a progress bar.
//! Nothing reaches the glass until the runtime calls
//! [`EinkPanel::refresh`](platform::EinkPanel::refresh) afterwards.
//!
//! All text is folded to the font's glyph set on the way in, so callers can
//! pass arbitrary UTF-8.
//!
//! Layout (portrait 240×320):
//!
//! ```text
//! y=0    status bar (inverted)
//! y=10   body rows 0..TEXT_ROWS
//! y=310  hint row
//! ```

use embedded_graphics::mono_font::iso_8859_1::{FONT_10X20, FONT_6X10};
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use heapless::String;
use platform::config::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, SMALL_GLYPH_WIDTH, SMALL_LINE_HEIGHT, TEXT_COLUMNS, TEXT_ROWS,
};
use text::cp437;
use text::wrap::next_line;

/// Top of body row 0.
pub const BODY_TOP: i32 = SMALL_LINE_HEIGHT as i32;

/// Top of the hint row.
pub const HINT_TOP: i32 = (DISPLAY_HEIGHT - SMALL_LINE_HEIGHT) as i32;

/// Body rows below the status bar.
pub const BODY_ROWS: usize = TEXT_ROWS;

/// Glyph width of the large font.
pub const LARGE_GLYPH_WIDTH: u32 = 10;

/// Line pitch of the large font, in small-font rows.
pub const LARGE_ROWS: usize = 2;

/// One displayable line: [`TEXT_COLUMNS`] glyphs, each up to two UTF-8 bytes.
pub type DisplayLine = String<{ TEXT_COLUMNS * 2 }>;

fn px(v: usize) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

fn push_folded(out: &mut DisplayLine, count: &mut usize, max: usize, c: char) -> bool {
    if *count >= max {
        return false;
    }
    if let Some(b) = cp437::fold(c) {
        if b == b'\n' || b == b'\r' {
            return true;
        }
        if out.push(cp437::glyph(b)).is_err() {
            return false;
        }
        *count = count.saturating_add(1);
    }
    true
}

/// Fold `s` onto the font, keeping at most `max` glyphs.
pub fn display_str(s: &str, max: usize) -> DisplayLine {
    let mut out = DisplayLine::new();
    let mut count = 0usize;
    for c in s.chars() {
        if !push_folded(&mut out, &mut count, max, c) {
            break;
        }
    }
    out
}

/// Like [`display_str`] for raw text bytes; invalid UTF-8 shows as `?`.
pub fn display_bytes(bytes: &[u8], max: usize) -> DisplayLine {
    let mut out = DisplayLine::new();
    let mut count = 0usize;
    let mut rest = bytes;
    while !rest.is_empty() {
        let (valid, skip) = match core::str::from_utf8(rest) {
            Ok(s) => (s, rest.len()),
            Err(e) => {
                let good = rest
                    .get(..e.valid_up_to())
                    .and_then(|v| core::str::from_utf8(v).ok())
                    .unwrap_or("");
                let bad = e.error_len().unwrap_or(rest.len().saturating_sub(e.valid_up_to()));
                (good, e.valid_up_to().saturating_add(bad.max(1)))
            }
        };
        for c in valid.chars() {
            if !push_folded(&mut out, &mut count, max, c) {
                return out;
            }
        }
        if skip > valid.len() && !push_folded(&mut out, &mut count, max, '?') {
            return out;
        }
        rest = rest.get(skip..).unwrap_or(&[]);
    }
    out
}

/// One frame being drawn.
pub struct Frame<'d, D> {
    target: &'d mut D,
}

impl<'d, D> Frame<'d, D>
where
    D: DrawTarget<Color = BinaryColor>,
{
    /// Start a frame: clear the framebuffer to paper.
    pub fn begin(target: &'d mut D) -> Result<Self, D::Error> {
        target.clear(BinaryColor::Off)?;
        Ok(Self { target })
    }

    fn small(inverted: bool) -> MonoTextStyle<'static, BinaryColor> {
        let (fg, bg) = if inverted {
            (BinaryColor::Off, BinaryColor::On)
        } else {
            (BinaryColor::On, BinaryColor::Off)
        };
        MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(fg)
            .background_color(bg)
            .build()
    }

    fn row_top(row: usize) -> i32 {
        BODY_TOP.saturating_add(px(row).saturating_mul(SMALL_LINE_HEIGHT as i32))
    }

    fn put(&mut self, x: i32, y: i32, s: &str, inverted: bool) -> Result<(), D::Error> {
        Text::with_baseline(s, Point::new(x, y), Self::small(inverted), Baseline::Top)
            .draw(self.target)?;
        Ok(())
    }

    /// Text at grid cell (`col`, `row`), clipped at the right edge.
    pub fn text(&mut self, col: usize, row: usize, s: &str) -> Result<(), D::Error> {
        if row >= BODY_ROWS || col >= TEXT_COLUMNS {
            return Ok(());
        }
        let line = display_str(s, TEXT_COLUMNS.saturating_sub(col));
        let x = px(col).saturating_mul(SMALL_GLYPH_WIDTH as i32);
        self.put(x, Self::row_top(row), &line, false)
    }

    /// A full-width list row; `selected` draws it inverted.
    pub fn row(&mut self, row: usize, s: &str, selected: bool) -> Result<(), D::Error> {
        if row >= BODY_ROWS {
            return Ok(());
        }
        let y = Self::row_top(row);
        if selected {
            self.fill(0, y, DISPLAY_WIDTH, SMALL_LINE_HEIGHT)?;
        }
        let line = display_str(s, TEXT_COLUMNS);
        self.put(0, y, &line, selected)
    }

    /// A row of raw text bytes.
    pub fn bytes(&mut self, row: usize, bytes: &[u8]) -> Result<(), D::Error> {
        if row >= BODY_ROWS {
            return Ok(());
        }
        let line = display_bytes(bytes, TEXT_COLUMNS);
        self.put(0, Self::row_top(row), &line, false)
    }

    /// Lay `text` out with the line breaker from `first_row`, at most `rows`
    /// lines. Returns the byte offset where drawing stopped.
    pub fn paragraph(&mut self, first_row: usize, rows: usize, text: &[u8]) -> Result<usize, D::Error> {
        let mut pos = 0usize;
        for r in 0..rows {
            if pos >= text.len() {
                break;
            }
            let span = next_line(text, pos, TEXT_COLUMNS);
            self.bytes(first_row.saturating_add(r), text.get(span.start..span.end).unwrap_or(&[]))?;
            if span.next <= pos {
                break;
            }
            pos = span.next;
        }
        Ok(pos)
    }

    /// Text cursor before grid cell (`col`, `row`).
    pub fn caret(&mut self, col: usize, row: usize) -> Result<(), D::Error> {
        if row >= BODY_ROWS {
            return Ok(());
        }
        let x = px(col.min(TEXT_COLUMNS.saturating_sub(1))).saturating_mul(SMALL_GLYPH_WIDTH as i32);
        self.fill(x, Self::row_top(row), 1, SMALL_LINE_HEIGHT)
    }

    /// Large-font text spanning rows `row` and `row + 1`.
    pub fn title(&mut self, row: usize, s: &str) -> Result<(), D::Error> {
        let max = (DISPLAY_WIDTH / LARGE_GLYPH_WIDTH) as usize;
        let line = display_str(s, max);
        let style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
        Text::with_baseline(&line, Point::new(0, Self::row_top(row)), style, Baseline::Top)
            .draw(self.target)?;
        Ok(())
    }

    /// Horizontally centered text with its top at `y`.
    pub fn centered(&mut self, y: i32, s: &str, large: bool) -> Result<(), D::Error> {
        let (glyph_w, max) = if large {
            (LARGE_GLYPH_WIDTH, (DISPLAY_WIDTH / LARGE_GLYPH_WIDTH) as usize)
        } else {
            (SMALL_GLYPH_WIDTH, TEXT_COLUMNS)
        };
        let line = display_str(s, max);
        let width = px(line.chars().count()).saturating_mul(glyph_w as i32);
        let x = ((DISPLAY_WIDTH as i32).saturating_sub(width) / 2).max(0);
        let style = if large {
            MonoTextStyle::new(&FONT_10X20, BinaryColor::On)
        } else {
            Self::small(false)
        };
        Text::with_baseline(&line, Point::new(x, y), style, Baseline::Top).draw(self.target)?;
        Ok(())
    }

    /// Filled rectangle in ink.
    pub fn fill(&mut self, x: i32, y: i32, w: u32, h: u32) -> Result<(), D::Error> {
        Rectangle::new(Point::new(x, y), Size::new(w, h))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(self.target)
    }

    /// Rectangle outline in ink.
    pub fn frame_rect(&mut self, x: i32, y: i32, w: u32, h: u32) -> Result<(), D::Error> {
        Rectangle::new(Point::new(x, y), Size::new(w, h))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(self.target)
    }

    /// Progress bar filling body row `row`, `permille` of 1000.
    pub fn progress(&mut self, row: usize, permille: u16) -> Result<(), D::Error> {
        let y = Self::row_top(row).saturating_add(2);
        let inner = DISPLAY_WIDTH.saturating_sub(4);
        self.frame_rect(0, y, DISPLAY_WIDTH, SMALL_LINE_HEIGHT.saturating_sub(4))?;
        let filled = inner.saturating_mul(u32::from(permille.min(1000))) / 1000;
        if filled > 0 {
            self.fill(2, y.saturating_add(2), filled, SMALL_LINE_HEIGHT.saturating_sub(8).max(1))?;
        }
        Ok(())
    }

    /// Inverted strip across the top: `left` flush left, `right` flush right.
    pub fn status_bar(&mut self, left: &str, right: &str) -> Result<(), D::Error> {
        self.fill(0, 0, DISPLAY_WIDTH, SMALL_LINE_HEIGHT)?;
        let right = display_str(right, TEXT_COLUMNS / 2);
        let right_cols = right.chars().count();
        let left = display_str(left, TEXT_COLUMNS.saturating_sub(right_cols).saturating_sub(1));
        self.put(0, 0, &left, true)?;
        let x = px(TEXT_COLUMNS.saturating_sub(right_cols)).saturating_mul(SMALL_GLYPH_WIDTH as i32);
        self.put(x, 0, &right, true)
    }

    /// Bottom row, separated from the body by a rule. Replaces whatever the
    /// row held.
    pub fn hint(&mut self, s: &str) -> Result<(), D::Error> {
        Rectangle::new(Point::new(0, HINT_TOP), Size::new(DISPLAY_WIDTH, SMALL_LINE_HEIGHT))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
            .draw(self.target)?;
        Line::new(
            Point::new(0, HINT_TOP.saturating_sub(1)),
            Point::new(DISPLAY_WIDTH as i32 - 1, HINT_TOP.saturating_sub(1)),
        )
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(self.target)?;
        let line = display_str(s, TEXT_COLUMNS);
        self.put(0, HINT_TOP, &line, false)
    }
}

/// Full-screen message: large `title` in the middle, `detail` under it.
pub fn splash<D>(target: &mut D, title: &str, detail: &str) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let mut frame = Frame::begin(target)?;
    let mid = (DISPLAY_HEIGHT / 2) as i32;
    frame.centered(mid.saturating_sub(20), title, true)?;
    if !detail.is_empty() {
        frame.centered(mid.saturating_add(8), detail, false)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::mock_display::MockDisplay;
    use platform::mocks::{MockClock, MockPanel};

    #[test]
    fn test_display_str_folds_and_clips() {
        assert_eq!(display_str("caf\u{e9} \u{201c}x\u{201d}", 40).as_str(), "caf\u{e9} \"x\"");
        assert_eq!(display_str("abcdef", 3).as_str(), "abc");
        assert_eq!(display_str("a\u{200b}b", 40).as_str(), "ab");
    }

    #[test]
    fn test_display_bytes_marks_invalid_utf8() {
        assert_eq!(display_bytes(b"ok\xffgo", 40).as_str(), "ok?go");
        assert_eq!(display_bytes(b"line\n", 40).as_str(), "line");
    }

    #[test]
    fn test_frame_draws_ink() {
        let clock = MockClock::new();
        let mut panel = MockPanel::new(DISPLAY_WIDTH, DISPLAY_HEIGHT, clock, 0);
        let mut frame = Frame::begin(&mut panel).unwrap();
        frame.status_bar("Home", "80%").unwrap();
        frame.row(0, "Audiobooks", true).unwrap();
        frame.text(0, 1, "Books").unwrap();
        frame.hint("Enter open").unwrap();
        assert!(panel.ink() > 0);
    }

    #[test]
    fn test_rows_past_the_grid_are_skipped() {
        let mut display: MockDisplay<BinaryColor> = MockDisplay::new();
        display.set_allow_out_of_bounds_drawing(true);
        let mut frame = Frame { target: &mut display };
        frame.text(0, BODY_ROWS, "hidden").unwrap();
        frame.row(BODY_ROWS + 3, "hidden", true).unwrap();
        assert!(display.affected_area().is_zero_sized());
    }

    #[test]
    fn test_paragraph_returns_stop_offset() {
        let clock = MockClock::new();
        let mut panel = MockPanel::new(DISPLAY_WIDTH, DISPLAY_HEIGHT, clock, 0);
        let mut frame = Frame::begin(&mut panel).unwrap();
        let text = b"one\ntwo\nthree\n";
        assert_eq!(frame.paragraph(0, 2, text).unwrap(), 8);
        assert_eq!(frame.paragraph(0, 10, text).unwrap(), text.len());
    }

    #[test]
    fn test_splash_is_centered_ink() {
        let clock = MockClock::new();
        let mut panel = MockPanel::new(DISPLAY_WIDTH, DISPLAY_HEIGHT, clock, 0);
        splash(&mut panel, "Connecting", "home-wifi").unwrap();
        assert!(panel.ink() > 0);
    }
}
