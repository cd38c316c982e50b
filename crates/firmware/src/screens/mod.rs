//! Screens and the state they share.
//!
//! A screen owns its own sub-mode state and reaches devices only through the
//! [`Context`] it is handed. Rendering gets a [`View`] instead: a snapshot of
//! everything outside the screen that a frame may show, taken once before
//! drawing so the framebuffer borrow never overlaps device access.

use core::fmt::Write as _;
use core::ops::Range;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::DrawTarget;
use heapless::String;
use library::track::{Author, Title};
use platform::{Clock, GpsState, PowerMonitor};
use playback::{AudioPipeline, PipelineState};
use store::contacts::Contacts;
use store::settings::{DeviceSettings, MAX_NODE_NAME};
use ui::keys::{classify, nav, KeyClass, Nav};
use ui::{PlaybackState, PlayerSnapshot, PlayerView, ScreenId};

use crate::board::{Board, Panel, Radio, SdCard, Shared};
use crate::error::AppError;
use crate::notify::{Notice, Notifications};
use crate::power::PowerManager;
use crate::render::Frame;

pub mod audiobook;
pub mod books;
pub mod home;
pub mod notes;
pub mod settings;
pub mod sms;
pub mod web;

pub use audiobook::Audiobook;
pub use books::Books;
pub use home::Home;
pub use notes::Notes;
pub use settings::Settings;
pub use sms::Sms;
pub use web::Web;

/// How long a banner stays on the hint row.
pub const BANNER_MS: u64 = 3_000;

/// Longest banner text.
pub const MAX_BANNER: usize = 40;

/// What a key or poll did, as far as the runtime cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not for this screen.
    Ignored,
    /// Consumed; redraw.
    Handled,
    /// Open another screen on top.
    Open(ScreenId),
    /// Close this screen.
    Back,
    /// Return to the launcher.
    Home,
}

/// Transient message on the hint row.
#[derive(Debug, Default)]
pub struct Banner {
    text: String<MAX_BANNER>,
    until_ms: u64,
}

impl Banner {
    /// Show `text` for [`BANNER_MS`].
    pub fn show(&mut self, text: &str, now_ms: u64) {
        self.text.clear();
        for c in text.chars() {
            if self.text.push(c).is_err() {
                break;
            }
        }
        self.until_ms = now_ms.saturating_add(BANNER_MS);
    }

    /// Text while the banner is up.
    pub fn active(&self, now_ms: u64) -> Option<&str> {
        (now_ms < self.until_ms && !self.text.is_empty()).then_some(self.text.as_str())
    }

    /// Time until the banner goes away.
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u32> {
        self.active(now_ms)?;
        u32::try_from(self.until_ms.saturating_sub(now_ms)).ok()
    }
}

/// Mesh traffic counters for Home.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshStats {
    /// Adverts heard since boot.
    pub adverts: u16,
    /// Name of the last node heard.
    pub last_node: String<32>,
    /// Text messages received since boot.
    pub messages: u16,
}

/// Devices and state shared by every screen.
pub struct Context<B: Board> {
    /// SD card.
    pub sd: SdCard<B>,
    /// Mesh radio.
    pub radio: Radio<B>,
    /// E-ink panel, for screens that draw a splash mid-operation.
    pub panel: Panel<B>,
    /// Fuel gauge.
    pub gauge: B::Gauge,
    /// Monotonic clock.
    pub clock: B::Clock,
    /// Delay.
    pub delay: B::Delay,
    /// The one audio pipeline; it keeps playing while other screens run.
    pub audio: AudioPipeline<B::Decoder, B::DacPin>,
    /// CPU and GPS power.
    pub power: PowerManager<B::Cpu, B::Gnss>,
    /// Pending notifications.
    pub notices: Notifications,
    /// Hint-row banner.
    pub banner: Banner,
    /// Persisted device settings as last saved.
    pub settings: DeviceSettings,
    /// SMS address book.
    pub contacts: Contacts,
    /// Mesh counters.
    pub mesh: MeshStats,
    /// Modem queues and status.
    pub shared: Shared,
    /// A cellular modem is fitted.
    pub has_modem: bool,
    /// The modem worker was started this boot.
    pub modem_enabled: bool,
}

impl<B: Board> Context<B> {
    /// Current time.
    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Show `text` on the hint row.
    pub fn say(&mut self, text: &str) {
        let now = self.now();
        self.banner.show(text, now);
    }

    /// Report a failed action: log it and put its banner up.
    pub fn fail(&mut self, err: AppError) {
        tracing::warn!("action failed: {}", err);
        self.say(err.banner());
    }
}

/// Open audiobook as the player screen shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioView {
    /// Book title.
    pub title: Title,
    /// Book author.
    pub author: Author,
    /// Playback state.
    pub state: PlaybackState,
    /// Pre-formatted player strings.
    pub player: PlayerView,
    /// One-based track number.
    pub track: usize,
    /// Tracks in the playlist.
    pub tracks: usize,
}

impl AudioView {
    /// Snapshot the pipeline, or `None` if no book is open.
    pub fn capture<D, P>(audio: &AudioPipeline<D, P>, now_ms: u64) -> Option<Self>
    where
        D: platform::AudioDecoder,
        P: embedded_hal::digital::OutputPin,
    {
        let book = audio.book()?;
        let state = match audio.state() {
            PipelineState::Idle => PlaybackState::Stopped,
            PipelineState::Starting | PipelineState::Playing => PlaybackState::Playing,
            PipelineState::Paused => PlaybackState::Paused,
        };
        let player = PlayerView::build(&PlayerSnapshot {
            state,
            position_s: audio.position_s(),
            chapter_at_s: audio.chapter_position_s(),
            duration_s: audio.duration_s(),
            chapters: audio.chapters(),
            volume: audio.volume(),
            sleep_remaining_ms: audio.sleep_remaining_ms(now_ms),
        });
        Some(Self {
            title: book.title.clone(),
            author: book.author.clone(),
            state,
            player,
            track: audio.playlist().index().saturating_add(1),
            tracks: audio.playlist().len(),
        })
    }
}

/// Modem line on Home.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModemView {
    /// State label.
    pub state: &'static str,
    /// Signal bars 0..=4.
    pub bars: u8,
    /// Network operator.
    pub operator: String<24>,
}

/// Snapshot of the world outside the current screen.
#[derive(Debug, Clone)]
pub struct View {
    /// Capture time.
    pub now_ms: u64,
    /// Local `HH:MM`, once the wall clock is synced.
    pub time: Option<String<8>>,
    /// Battery charge.
    pub battery: Option<u8>,
    /// Battery voltage.
    pub millivolts: Option<u16>,
    /// Charger connected.
    pub charging: bool,
    /// Configured pack capacity.
    pub capacity_mah: u16,
    /// Modem status, when the modem runs.
    pub modem: Option<ModemView>,
    /// GPS duty cycle, when a receiver is fitted.
    pub gps: Option<GpsState>,
    /// Mesh counters.
    pub mesh: MeshStats,
    /// Newest notification.
    pub notice: Option<Notice>,
    /// Pending notifications.
    pub notices: usize,
    /// Node name.
    pub node_name: String<MAX_NODE_NAME>,
    /// Address book, for labelling conversations.
    pub contacts: Contacts,
    /// Open audiobook.
    pub audio: Option<AudioView>,
}

/// `HH:MM` for `epoch_s` shifted by `offset_min`.
pub fn local_time(epoch_s: u32, offset_min: i16) -> String<8> {
    let local = i64::from(epoch_s).saturating_add(i64::from(offset_min).saturating_mul(60));
    let day_s = local.rem_euclid(86_400);
    let mut out = String::new();
    let _ = write!(out, "{:02}:{:02}", day_s / 3600, (day_s % 3600) / 60);
    out
}

impl View {
    /// Take the snapshot.
    pub fn capture<B: Board>(cx: &Context<B>) -> Self {
        let now_ms = cx.now();
        let modem = (cx.has_modem && cx.modem_enabled).then(|| {
            let status = cx.shared.status;
            ModemView {
                state: status.state().label(),
                bars: status.bars(),
                operator: status.operator(),
            }
        });
        Self {
            now_ms,
            time: cx
                .shared
                .wall
                .epoch_at(now_ms)
                .map(|epoch| local_time(epoch, cx.settings.utc_offset_min)),
            battery: cx.gauge.battery_percentage(),
            millivolts: cx.gauge.battery_voltage(),
            charging: cx.gauge.is_charging(),
            capacity_mah: cx.gauge.design_capacity_mah(),
            modem,
            gps: cx.power.has_gps().then(|| cx.power.gps_state()),
            mesh: cx.mesh.clone(),
            notice: cx.notices.latest().cloned(),
            notices: cx.notices.len(),
            node_name: cx.settings.node_name.clone(),
            contacts: cx.contacts.clone(),
            audio: AudioView::capture(&cx.audio, now_ms),
        }
    }

    /// Right-hand side of the status bar.
    pub fn status_right(&self) -> String<16> {
        let mut out = String::new();
        if let Some(t) = &self.time {
            let _ = out.push_str(t);
            let _ = out.push(' ');
        }
        match self.battery {
            Some(p) => {
                let _ = write!(out, "{}%", p);
            }
            None => {
                let _ = out.push_str("--%");
            }
        }
        if self.charging {
            let _ = out.push('+');
        }
        out
    }
}

/// One screen of the device.
pub trait Screen<B: Board> {
    /// Handle one key routed to this screen.
    async fn handle_input(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError>;

    /// Background work while this screen is current, once per tick.
    async fn poll(&mut self, _cx: &mut Context<B>) -> Result<Outcome, AppError> {
        Ok(Outcome::Ignored)
    }

    /// The screen stops being current (closed, Home, Escape, or sleep).
    async fn leave(&mut self, _cx: &mut Context<B>) -> Result<(), AppError> {
        Ok(())
    }

    /// Draw the body and hint row. Returns the milliseconds until the next
    /// frame is wanted.
    fn render<D>(&mut self, frame: &mut Frame<'_, D>, view: &View) -> Result<u32, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>;
}

/// Selection and scroll offset of a list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListCursor {
    /// Selected index.
    pub index: usize,
    top: usize,
}

impl ListCursor {
    /// Move with Up/Down (arrows or W/S), wrapping. Returns `true` if the
    /// key was a move.
    pub fn handle(&mut self, key: u8, len: usize) -> bool {
        if len == 0 {
            return matches!(nav(key), Some(Nav::Up | Nav::Down));
        }
        match nav(key) {
            Some(Nav::Up) => {
                self.index = self.index.checked_sub(1).unwrap_or(len - 1).min(len - 1);
                true
            }
            Some(Nav::Down) => {
                self.index = if self.index.saturating_add(1) >= len { 0 } else { self.index + 1 };
                true
            }
            _ => false,
        }
    }

    /// Keep the index inside a list of `len`.
    pub fn clamp(&mut self, len: usize) {
        self.index = self.index.min(len.saturating_sub(1));
    }

    /// Back to the first row.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Rows to draw for a window of `rows`, scrolling the selection into view.
    pub fn visible(&mut self, len: usize, rows: usize) -> Range<usize> {
        self.clamp(len);
        let rows = rows.max(1);
        if self.index < self.top {
            self.top = self.index;
        } else if self.index >= self.top.saturating_add(rows) {
            self.top = self.index.saturating_add(1).saturating_sub(rows);
        }
        self.top = self.top.min(len.saturating_sub(1));
        self.top..len.min(self.top.saturating_add(rows))
    }
}

/// Result of a key fed to a [`TextField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEvent {
    /// Not a text key.
    None,
    /// Text changed.
    Changed,
    /// Enter.
    Submit,
    /// Backspace on an empty field.
    Cancel,
}

/// Single-line input.
#[derive(Debug, Clone, Default)]
pub struct TextField<const N: usize> {
    text: String<N>,
    masked: bool,
}

impl<const N: usize> TextField<N> {
    /// Empty field.
    pub fn new() -> Self {
        Self {
            text: String::new(),
            masked: false,
        }
    }

    /// Empty field that displays `*` per character.
    pub fn masked() -> Self {
        Self {
            text: String::new(),
            masked: true,
        }
    }

    /// Replace the contents.
    pub fn set(&mut self, value: &str) {
        self.text.clear();
        for c in value.chars() {
            if self.text.push(c).is_err() {
                break;
            }
        }
    }

    /// Clear the contents.
    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Contents.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Feed one key.
    pub fn handle(&mut self, key: u8) -> FieldEvent {
        match classify(key) {
            KeyClass::Enter => FieldEvent::Submit,
            KeyClass::Backspace => {
                if self.text.pop().is_some() {
                    FieldEvent::Changed
                } else {
                    FieldEvent::Cancel
                }
            }
            KeyClass::Printable(b) => {
                if self.text.push(char::from(b)).is_ok() {
                    FieldEvent::Changed
                } else {
                    FieldEvent::None
                }
            }
            _ => FieldEvent::None,
        }
    }

    /// Display form with a trailing cursor.
    pub fn display(&self) -> String<64> {
        let mut out = String::new();
        let chars = self.text.chars().count();
        // Keep the tail visible when the text is wider than the row.
        let skip = chars.saturating_sub(38);
        for c in self.text.chars().skip(skip) {
            let _ = out.push(if self.masked { '*' } else { c });
        }
        let _ = out.push('_');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ui::keys::{KEY_BACKSPACE, KEY_DOWN, KEY_ENTER, KEY_UP};

    #[test]
    fn test_list_cursor_wraps_both_ways() {
        let mut c = ListCursor::default();
        assert!(c.handle(KEY_UP, 3));
        assert_eq!(c.index, 2);
        assert!(c.handle(KEY_DOWN, 3));
        assert_eq!(c.index, 0);
        assert!(!c.handle(b'x', 3));
    }

    #[test]
    fn test_list_cursor_scrolls_selection_into_view() {
        let mut c = ListCursor::default();
        assert_eq!(c.visible(50, 10), 0..10);
        c.index = 12;
        assert_eq!(c.visible(50, 10), 3..13);
        c.index = 1;
        assert_eq!(c.visible(50, 10), 1..11);
        assert_eq!(c.visible(0, 10), 0..0);
    }

    #[test]
    fn test_text_field_cancels_when_empty() {
        let mut f: TextField<8> = TextField::new();
        assert_eq!(f.handle(b'h'), FieldEvent::Changed);
        assert_eq!(f.handle(b'i'), FieldEvent::Changed);
        assert_eq!(f.as_str(), "hi");
        assert_eq!(f.handle(KEY_BACKSPACE), FieldEvent::Changed);
        assert_eq!(f.handle(KEY_BACKSPACE), FieldEvent::Changed);
        assert_eq!(f.handle(KEY_BACKSPACE), FieldEvent::Cancel);
        assert_eq!(f.handle(KEY_ENTER), FieldEvent::Submit);
    }

    #[test]
    fn test_masked_field_hides_text() {
        let mut f: TextField<16> = TextField::masked();
        f.set("secret");
        assert_eq!(f.display().as_str(), "******_");
    }

    #[test]
    fn test_banner_expires() {
        let mut b = Banner::default();
        b.show("Saved", 1_000);
        assert_eq!(b.active(1_000), Some("Saved"));
        assert_eq!(b.remaining_ms(2_000), Some(2_000));
        assert_eq!(b.active(1_000 + BANNER_MS), None);
    }

    #[test]
    fn test_local_time_applies_offset() {
        // 2024-01-01 23:30:00 UTC
        let epoch = 1_704_151_800;
        assert_eq!(local_time(epoch, 0).as_str(), "23:30");
        assert_eq!(local_time(epoch, 60).as_str(), "00:30");
        assert_eq!(local_time(epoch, -330).as_str(), "18:00");
    }

    proptest::proptest! {
        #[test]
        fn prop_cursor_stays_in_list_and_in_view(
            len in 1usize..40,
            rows in 1usize..12,
            keys in proptest::collection::vec(proptest::sample::select(vec![KEY_UP, KEY_DOWN, b'w', b's', b'x']), 0..80),
        ) {
            let mut c = ListCursor::default();
            for key in keys {
                c.handle(key, len);
                proptest::prop_assert!(c.index < len);
                let window = c.visible(len, rows);
                proptest::prop_assert!(window.contains(&c.index));
                proptest::prop_assert!(window.len() <= rows);
            }
        }
    }
}
