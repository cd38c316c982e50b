//! Launcher: screen list, device status and the notification preview.

use core::fmt::Write as _;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::DrawTarget;
use heapless::String;
use platform::GpsState;
use ui::keys::KEY_ENTER;
use ui::ScreenId;

use super::{Context, ListCursor, Outcome, Screen, View};
use crate::board::Board;
use crate::error::AppError;
use crate::notify::NoticeKind;
use crate::render::Frame;

/// Redraw period while idle on Home (clock and battery).
pub const HOME_REFRESH_MS: u32 = 5_000;

/// Launcher state.
#[derive(Debug, Default)]
pub struct Home {
    cursor: ListCursor,
}

impl Home {
    /// Cursor on the first entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher entry under the cursor.
    pub fn selected(&self) -> ScreenId {
        ScreenId::LAUNCHER
            .get(self.cursor.index)
            .copied()
            .unwrap_or(ScreenId::Audiobook)
    }
}

fn gps_label(state: GpsState) -> &'static str {
    match state {
        GpsState::Off => "off",
        GpsState::Acquiring => "searching",
        GpsState::Sleeping => "fixed, sleeping",
    }
}

impl<B: Board> Screen<B> for Home {
    async fn handle_input(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        if self.cursor.handle(key, ScreenId::LAUNCHER.len()) {
            return Ok(Outcome::Handled);
        }
        match key {
            KEY_ENTER => Ok(Outcome::Open(self.selected())),
            b'1'..=b'6' => {
                let index = usize::from(key - b'1');
                self.cursor.index = index;
                Ok(Outcome::Open(self.selected()))
            }
            b'g' | b'G' if cx.power.has_gps() => {
                let state = cx.power.toggle_gps(cx.now());
                tracing::info!("home: gps {}", gps_label(state));
                Ok(Outcome::Handled)
            }
            _ => Ok(Outcome::Ignored),
        }
    }

    fn render<D>(&mut self, frame: &mut Frame<'_, D>, view: &View) -> Result<u32, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let name = if view.node_name.is_empty() {
            platform::config::APP_NAME
        } else {
            view.node_name.as_str()
        };
        frame.title(0, name)?;

        let mut row = 3;
        for (i, id) in ScreenId::LAUNCHER.iter().enumerate() {
            let mut line: String<40> = String::new();
            let _ = write!(line, " {} {}", i + 1, id.title());
            frame.row(row, &line, i == self.cursor.index)?;
            row += 1;
        }
        row += 1;

        let mut line: String<40> = String::new();
        match view.battery {
            Some(p) => {
                let _ = write!(line, "Battery {}%", p);
            }
            None => {
                let _ = line.push_str("Battery --");
            }
        }
        if let Some(mv) = view.millivolts {
            let _ = write!(line, " {}.{:02}V", mv / 1000, (mv % 1000) / 10);
        }
        let _ = write!(line, " {}mAh", view.capacity_mah);
        if view.charging {
            let _ = line.push_str(" chg");
        }
        frame.text(0, row, &line)?;
        row += 1;

        if let Some(modem) = &view.modem {
            let mut line: String<40> = String::new();
            let _ = write!(line, "Cell {} ", modem.state);
            for b in 0..4 {
                let _ = line.push(if b < modem.bars { '|' } else { '.' });
            }
            if !modem.operator.is_empty() {
                let _ = write!(line, " {}", modem.operator);
            }
            frame.text(0, row, &line)?;
            row += 1;
        }

        let mut line: String<40> = String::new();
        let _ = write!(line, "Mesh {} nodes, {} msgs", view.mesh.adverts, view.mesh.messages);
        frame.text(0, row, &line)?;
        row += 1;
        if !view.mesh.last_node.is_empty() {
            let mut line: String<40> = String::new();
            let _ = write!(line, "Last heard {}", view.mesh.last_node);
            frame.text(0, row, &line)?;
            row += 1;
        }
        if let Some(gps) = view.gps {
            let mut line: String<40> = String::new();
            let _ = write!(line, "GPS {}", gps_label(gps));
            frame.text(0, row, &line)?;
            row += 1;
        }
        if let Some(audio) = &view.audio {
            let mut line: String<40> = String::new();
            let _ = write!(line, "{} {}", audio.player.state, audio.title);
            frame.text(0, row, &line)?;
            row += 1;
        }

        let hint = if let Some(notice) = &view.notice {
            row += 1;
            let mut head: String<40> = String::new();
            let tag = match notice.kind {
                NoticeKind::Mesh => "Mesh",
                NoticeKind::Sms => "SMS",
            };
            let _ = write!(head, "{} from {}", tag, notice.from);
            if view.notices > 1 {
                let _ = write!(head, " (+{})", view.notices - 1);
            }
            frame.row(row, &head, true)?;
            frame.text(0, row + 1, &notice.body)?;
            match notice.kind {
                NoticeKind::Sms => "1-6 open  o read  x dismiss",
                NoticeKind::Mesh => "1-6 open  x dismiss",
            }
        } else if view.gps.is_some() {
            "1-6 open  g GPS"
        } else {
            "1-6 open"
        };
        frame.hint(hint)?;
        Ok(HOME_REFRESH_MS)
    }
}
