//! Settings and onboarding state machine.
//!
//! The screen is a flat list of typed rows. Enter starts an edit whose
//! sub-state decides how later keys are read: text rows collect characters,
//! the preset row opens a picker, scalar rows step with up/down. Radio edits
//! only mark the model dirty; leaving while dirty asks for confirmation and
//! only an accepted confirm re-tunes the radio. Declining keeps the edits
//! pending until they are applied or reverted with `r`.

use heapless::{String, Vec};
use platform::radio::{
    RadioParams, CR_RANGE, FREQ_MAX_KHZ, FREQ_MIN_KHZ, FREQ_STEP_KHZ, PRESETS, SF_RANGE,
    TX_MIN_DBM,
};
use store::settings::{Channel, DeviceSettings, MAX_CHANNELS};

use crate::keys::{arrow, is_back, nav, Nav, KEY_BACKSPACE, KEY_ENTER};

/// UTC offset limits in minutes (-12:00 ..= +14:00).
pub const UTC_OFFSET_RANGE: core::ops::RangeInclusive<i16> = -720..=840;

/// UTC offset step in minutes.
pub const UTC_STEP_MIN: i16 = 15;

const MAX_ROWS: usize = 16 + MAX_CHANNELS;
const TEXT_CAP: usize = 24;

/// One line of the settings list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    /// Section title; never selectable.
    Header(&'static str),
    /// Node name (text).
    Name,
    /// Radio preset (picker).
    Preset,
    /// Frequency (numeric, 0.1 MHz steps).
    Frequency,
    /// Bandwidth (numeric, cycles).
    Bandwidth,
    /// Spreading factor (numeric).
    SpreadingFactor,
    /// Coding rate (numeric).
    CodingRate,
    /// TX power (numeric).
    TxPower,
    /// UTC offset (numeric, 15 min steps).
    UtcOffset,
    /// Channel slot (text edits the name).
    Channel(usize),
    /// Append a channel.
    AddChannel,
    /// Modem enable toggle (modem boards only).
    Modem,
}

impl Row {
    fn selectable(self) -> bool {
        !matches!(self, Row::Header(_))
    }

    fn is_radio(self) -> bool {
        matches!(
            self,
            Row::Preset
                | Row::Frequency
                | Row::Bandwidth
                | Row::SpreadingFactor
                | Row::CodingRate
                | Row::TxPower
        )
    }
}

/// Editing sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EditMode {
    /// Browsing rows.
    None,
    /// Typing into the text buffer.
    Text,
    /// Choosing a radio preset.
    Picker,
    /// Stepping a scalar.
    Numeric,
    /// "Apply radio changes?" dialog.
    Confirm,
}

/// What the screen must do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsEvent {
    /// Key ignored.
    None,
    /// State changed; redraw.
    Redraw,
    /// Confirm accepted: re-tune with these parameters, persist, then call
    /// [`SettingsModel::applied`] and leave.
    ApplyRadio(RadioParams),
    /// A non-radio setting changed; persist [`SettingsModel::settings`].
    SaveSettings,
    /// Modem toggle flipped; persist `modem.cfg`.
    SetModem(bool),
    /// Leave the screen.
    Exit,
    /// Onboarding finished; persist and go to the launcher.
    OnboardingDone,
}

/// Settings list model.
#[derive(Debug, Clone)]
pub struct SettingsModel {
    settings: DeviceSettings,
    modem_enabled: bool,
    has_modem: bool,
    max_tx_dbm: i8,
    rows: Vec<Row, MAX_ROWS>,
    cursor: usize,
    mode: EditMode,
    text: String<TEXT_CAP>,
    picker: usize,
    saved_radio: RadioParams,
    radio_dirty: bool,
    numeric_touched: bool,
    onboarding: bool,
}

impl SettingsModel {
    /// Model over loaded settings. `has_modem` adds the modem toggle row;
    /// `max_tx_dbm` is the board's power amplifier limit.
    pub fn new(
        settings: DeviceSettings,
        has_modem: bool,
        modem_enabled: bool,
        max_tx_dbm: i8,
    ) -> Self {
        let onboarding = !settings.onboarded;
        let saved_radio = settings.radio;
        let mut model = Self {
            settings,
            modem_enabled,
            has_modem,
            max_tx_dbm,
            rows: Vec::new(),
            cursor: 0,
            mode: EditMode::None,
            text: String::new(),
            picker: 0,
            saved_radio,
            radio_dirty: false,
            numeric_touched: false,
            onboarding,
        };
        model.rebuild_rows();
        model.cursor = model.first_selectable();
        if onboarding {
            model.begin_text(Row::Name);
        }
        model
    }

    fn rebuild_rows(&mut self) {
        self.rows.clear();
        let mut push = |r: Row| {
            let _ = self.rows.push(r);
        };
        push(Row::Header("Device"));
        push(Row::Name);
        push(Row::UtcOffset);
        push(Row::Header("Radio"));
        push(Row::Preset);
        push(Row::Frequency);
        push(Row::Bandwidth);
        push(Row::SpreadingFactor);
        push(Row::CodingRate);
        push(Row::TxPower);
        push(Row::Header("Channels"));
        for i in 0..self.settings.channels.len() {
            push(Row::Channel(i));
        }
        if self.settings.channels.len() < MAX_CHANNELS {
            push(Row::AddChannel);
        }
        if self.has_modem {
            push(Row::Header("Modem"));
            push(Row::Modem);
        }
        if self.cursor >= self.rows.len() {
            self.cursor = self.rows.len().saturating_sub(1);
        }
    }

    fn first_selectable(&self) -> usize {
        self.rows.iter().position(|r| r.selectable()).unwrap_or(0)
    }

    /// Current settings, including unapplied radio edits.
    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    /// Modem toggle state.
    pub fn modem_enabled(&self) -> bool {
        self.modem_enabled
    }

    /// Rows in display order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Index of the selected row.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Selected row.
    pub fn selected(&self) -> Row {
        self.rows.get(self.cursor).copied().unwrap_or(Row::Name)
    }

    /// Editing sub-state.
    pub fn mode(&self) -> EditMode {
        self.mode
    }

    /// Text being typed in [`EditMode::Text`].
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Preset highlighted in [`EditMode::Picker`].
    pub fn picker(&self) -> usize {
        self.picker
    }

    /// `true` if radio edits are waiting to be applied.
    pub fn radio_dirty(&self) -> bool {
        self.radio_dirty
    }

    /// `true` during first-boot onboarding.
    pub fn onboarding(&self) -> bool {
        self.onboarding
    }

    /// Board TX power limit.
    pub fn max_tx_dbm(&self) -> i8 {
        self.max_tx_dbm
    }

    /// The radio took the new parameters.
    pub fn applied(&mut self) {
        self.saved_radio = self.settings.radio;
        self.radio_dirty = false;
        tracing::info!("settings: radio applied");
    }

    /// Radio parameters edited but not yet applied.
    pub fn pending_radio(&self) -> Option<RadioParams> {
        self.radio_dirty.then_some(self.settings.radio)
    }

    /// Carry edits from an earlier visit into a fresh model.
    pub fn restore_pending(&mut self, params: RadioParams) {
        if params != self.saved_radio {
            self.settings.radio = params;
            self.radio_dirty = true;
        }
    }

    /// Drop unapplied radio edits.
    pub fn revert_radio(&mut self) {
        self.settings.radio = self.saved_radio;
        self.radio_dirty = false;
        tracing::debug!("settings: radio edits reverted");
    }

    /// Feed one key.
    pub fn handle_key(&mut self, key: u8) -> SettingsEvent {
        match self.mode {
            EditMode::None => self.key_browse(key),
            EditMode::Text => self.key_text(key),
            EditMode::Picker => self.key_picker(key),
            EditMode::Numeric => self.key_numeric(key),
            EditMode::Confirm => self.key_confirm(key),
        }
    }

    fn move_cursor(&mut self, down: bool) {
        let len = self.rows.len();
        let mut i = self.cursor;
        for _ in 0..len {
            i = if down {
                if i.saturating_add(1) >= len { 0 } else { i.saturating_add(1) }
            } else if i == 0 {
                len.saturating_sub(1)
            } else {
                i.saturating_sub(1)
            };
            if self.rows.get(i).is_some_and(|r| r.selectable()) {
                self.cursor = i;
                return;
            }
        }
    }

    fn key_browse(&mut self, key: u8) -> SettingsEvent {
        if is_back(key) {
            if self.radio_dirty {
                self.mode = EditMode::Confirm;
                return SettingsEvent::Redraw;
            }
            return SettingsEvent::Exit;
        }
        match nav(key) {
            Some(Nav::Up) => {
                self.move_cursor(false);
                return SettingsEvent::Redraw;
            }
            Some(Nav::Down) => {
                self.move_cursor(true);
                return SettingsEvent::Redraw;
            }
            _ => {}
        }
        let row = self.selected();
        match (row, key) {
            (_, b'r' | b'R') if self.radio_dirty => {
                self.revert_radio();
                SettingsEvent::Redraw
            }
            (Row::Channel(i), b'x' | b'X' | KEY_BACKSPACE) => {
                self.delete_channel(i);
                SettingsEvent::SaveSettings
            }
            (_, KEY_ENTER) => self.activate(row),
            _ => SettingsEvent::None,
        }
    }

    fn activate(&mut self, row: Row) -> SettingsEvent {
        match row {
            Row::Header(_) => SettingsEvent::None,
            Row::Name | Row::Channel(_) => {
                self.begin_text(row);
                SettingsEvent::Redraw
            }
            Row::Preset => {
                self.picker = PRESETS
                    .iter()
                    .position(|p| same_modulation(&p.params, &self.settings.radio))
                    .unwrap_or(0);
                self.mode = EditMode::Picker;
                SettingsEvent::Redraw
            }
            Row::AddChannel => {
                let mut name = String::new();
                let _ = name.push('#');
                let n = self.settings.channels.len().saturating_add(1);
                let _ = core::fmt::Write::write_fmt(&mut name, format_args!("ch{}", n));
                let channel = Channel {
                    name,
                    psk: String::new(),
                };
                if self.settings.channels.push(channel).is_err() {
                    return SettingsEvent::None;
                }
                self.rebuild_rows();
                if let Some(pos) = self.rows.iter().position(|r| *r == Row::Channel(n.saturating_sub(1))) {
                    self.cursor = pos;
                }
                self.begin_text(Row::Channel(n.saturating_sub(1)));
                SettingsEvent::Redraw
            }
            Row::Modem => {
                self.modem_enabled = !self.modem_enabled;
                SettingsEvent::SetModem(self.modem_enabled)
            }
            _ => {
                self.numeric_touched = false;
                self.mode = EditMode::Numeric;
                SettingsEvent::Redraw
            }
        }
    }

    fn begin_text(&mut self, row: Row) {
        self.text.clear();
        let current = match row {
            Row::Name => self.settings.node_name.as_str(),
            Row::Channel(i) => self.settings.channels.get(i).map_or("", |c| c.name.as_str()),
            _ => "",
        };
        let _ = self.text.push_str(current);
        self.mode = EditMode::Text;
    }

    fn key_text(&mut self, key: u8) -> SettingsEvent {
        match key {
            KEY_ENTER => self.commit_text(),
            KEY_BACKSPACE => {
                if self.text.pop().is_none() && !self.onboarding {
                    self.mode = EditMode::None;
                }
                SettingsEvent::Redraw
            }
            0x20..=0x7E => {
                if self.text.push(char::from(key)).is_ok() {
                    SettingsEvent::Redraw
                } else {
                    SettingsEvent::None
                }
            }
            _ => SettingsEvent::None,
        }
    }

    fn commit_text(&mut self) -> SettingsEvent {
        let value = self.text.trim();
        if value.is_empty() {
            return SettingsEvent::None;
        }
        match self.selected() {
            Row::Channel(i) => {
                if let Some(c) = self.settings.channels.get_mut(i) {
                    c.name.clear();
                    let _ = c.name.push_str(truncate(value, c.name.capacity()));
                }
            }
            _ => {
                self.settings.node_name.clear();
                let cap = self.settings.node_name.capacity();
                let _ = self.settings.node_name.push_str(truncate(value, cap));
            }
        }
        self.mode = EditMode::None;
        if self.onboarding {
            self.onboarding = false;
            self.settings.onboarded = true;
            tracing::info!("settings: onboarding complete");
            return SettingsEvent::OnboardingDone;
        }
        SettingsEvent::SaveSettings
    }

    fn key_picker(&mut self, key: u8) -> SettingsEvent {
        if is_back(key) {
            self.mode = EditMode::None;
            return SettingsEvent::Redraw;
        }
        match (nav(key), key) {
            (Some(Nav::Up), _) => {
                self.picker = self.picker.checked_sub(1).unwrap_or(PRESETS.len().saturating_sub(1));
                SettingsEvent::Redraw
            }
            (Some(Nav::Down), _) => {
                self.picker = self.picker.saturating_add(1) % PRESETS.len();
                SettingsEvent::Redraw
            }
            (_, KEY_ENTER) => {
                if let Some(preset) = PRESETS.get(self.picker) {
                    let tx = self.settings.radio.tx_dbm;
                    self.settings.radio = preset.params;
                    self.settings.radio.tx_dbm = tx.min(self.max_tx_dbm);
                    self.radio_dirty = true;
                }
                self.mode = EditMode::None;
                SettingsEvent::Redraw
            }
            _ => SettingsEvent::None,
        }
    }

    fn key_numeric(&mut self, key: u8) -> SettingsEvent {
        if key == KEY_ENTER || is_back(key) {
            self.mode = EditMode::None;
            if self.numeric_touched && !self.selected().is_radio() {
                return SettingsEvent::SaveSettings;
            }
            return SettingsEvent::Redraw;
        }
        let up = match arrow(key).or_else(|| nav(key)) {
            Some(Nav::Up | Nav::Right) => true,
            Some(Nav::Down | Nav::Left) => false,
            None => return SettingsEvent::None,
        };
        let row = self.selected();
        self.step(row, up);
        self.numeric_touched = true;
        if row.is_radio() {
            self.radio_dirty = true;
        }
        SettingsEvent::Redraw
    }

    fn step(&mut self, row: Row, up: bool) {
        let r = &mut self.settings.radio;
        match row {
            Row::Frequency => {
                r.freq_khz = if up {
                    r.freq_khz.saturating_add(FREQ_STEP_KHZ)
                } else {
                    r.freq_khz.saturating_sub(FREQ_STEP_KHZ)
                }
                .clamp(FREQ_MIN_KHZ, FREQ_MAX_KHZ);
            }
            Row::Bandwidth => {
                r.bandwidth = if up { r.bandwidth.next() } else { r.bandwidth.prev() };
            }
            Row::SpreadingFactor => r.sf = step_u8(r.sf, up, *SF_RANGE.start(), *SF_RANGE.end()),
            Row::CodingRate => r.cr = step_u8(r.cr, up, *CR_RANGE.start(), *CR_RANGE.end()),
            Row::TxPower => {
                r.tx_dbm = if up {
                    r.tx_dbm.saturating_add(1)
                } else {
                    r.tx_dbm.saturating_sub(1)
                }
                .clamp(TX_MIN_DBM, self.max_tx_dbm.max(TX_MIN_DBM));
            }
            Row::UtcOffset => {
                let o = &mut self.settings.utc_offset_min;
                *o = if up {
                    o.saturating_add(UTC_STEP_MIN)
                } else {
                    o.saturating_sub(UTC_STEP_MIN)
                }
                .clamp(*UTC_OFFSET_RANGE.start(), *UTC_OFFSET_RANGE.end());
            }
            _ => {}
        }
    }

    fn key_confirm(&mut self, key: u8) -> SettingsEvent {
        match key {
            b'y' | b'Y' | KEY_ENTER => {
                self.mode = EditMode::None;
                SettingsEvent::ApplyRadio(self.settings.radio)
            }
            b'n' | b'N' | b'q' | b'Q' => {
                self.mode = EditMode::None;
                tracing::debug!("settings: leaving with unapplied radio edits");
                SettingsEvent::Exit
            }
            _ => SettingsEvent::None,
        }
    }

    /// Remove channel `index`, shifting later channels down.
    pub fn delete_channel(&mut self, index: usize) {
        if index < self.settings.channels.len() {
            self.settings.channels.remove(index);
            self.rebuild_rows();
        }
    }
}

fn step_u8(v: u8, up: bool, min: u8, max: u8) -> u8 {
    if up { v.saturating_add(1) } else { v.saturating_sub(1) }.clamp(min, max)
}

fn same_modulation(a: &RadioParams, b: &RadioParams) -> bool {
    a.freq_khz == b.freq_khz && a.bandwidth == b.bandwidth && a.sf == b.sf && a.cr == b.cr
}

fn truncate(s: &str, max: usize) -> &str {
    let mut end = s.len().min(max);
    while !s.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    s.get(..end).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KEY_DOWN, KEY_UP};
    use platform::radio::Bandwidth;

    fn onboarded() -> DeviceSettings {
        DeviceSettings {
            onboarded: true,
            ..DeviceSettings::default()
        }
    }

    fn select(m: &mut SettingsModel, row: Row) {
        let pos = m.rows().iter().position(|r| *r == row).unwrap();
        while m.cursor() != pos {
            m.handle_key(KEY_DOWN);
        }
    }

    #[test]
    fn test_cursor_skips_headers() {
        let mut m = SettingsModel::new(onboarded(), false, true, 22);
        assert_eq!(m.selected(), Row::Name);
        m.handle_key(KEY_UP);
        assert!(m.selected().selectable());
        m.handle_key(b's');
        assert!(m.selected().selectable());
    }

    #[test]
    fn test_frequency_clamps_at_band_edge() {
        let mut s = onboarded();
        s.radio.freq_khz = 400_050;
        let mut m = SettingsModel::new(s, false, true, 22);
        select(&mut m, Row::Frequency);
        m.handle_key(KEY_ENTER);
        assert_eq!(m.mode(), EditMode::Numeric);
        m.handle_key(KEY_DOWN);
        m.handle_key(KEY_DOWN);
        assert_eq!(m.settings().radio.freq_khz, 400_000);
        assert!(m.radio_dirty());
    }

    #[test]
    fn test_tx_clamps_at_board_max() {
        let mut s = onboarded();
        s.radio.tx_dbm = 21;
        let mut m = SettingsModel::new(s, false, true, 22);
        select(&mut m, Row::TxPower);
        m.handle_key(KEY_ENTER);
        for _ in 0..5 {
            m.handle_key(KEY_UP);
        }
        assert_eq!(m.settings().radio.tx_dbm, 22);
    }

    #[test]
    fn test_bandwidth_cycles() {
        let mut s = onboarded();
        s.radio.bandwidth = Bandwidth::Khz500;
        let mut m = SettingsModel::new(s, false, true, 22);
        select(&mut m, Row::Bandwidth);
        m.handle_key(KEY_ENTER);
        m.handle_key(KEY_UP);
        assert_eq!(m.settings().radio.bandwidth, Bandwidth::Khz31);
    }

    #[test]
    fn test_dirty_exit_confirm_accept() {
        let mut m = SettingsModel::new(onboarded(), false, true, 22);
        select(&mut m, Row::SpreadingFactor);
        m.handle_key(KEY_ENTER);
        m.handle_key(KEY_UP);
        m.handle_key(KEY_ENTER);
        assert_eq!(m.handle_key(b'q'), SettingsEvent::Redraw);
        assert_eq!(m.mode(), EditMode::Confirm);
        let ev = m.handle_key(b'y');
        assert!(matches!(ev, SettingsEvent::ApplyRadio(p) if p.sf == m.settings().radio.sf));
        m.applied();
        assert!(!m.radio_dirty());
        assert_eq!(m.handle_key(b'q'), SettingsEvent::Exit);
    }

    #[test]
    fn test_dirty_exit_confirm_reject_keeps_edits() {
        let mut m = SettingsModel::new(onboarded(), false, true, 22);
        select(&mut m, Row::CodingRate);
        m.handle_key(KEY_ENTER);
        m.handle_key(KEY_DOWN);
        m.handle_key(KEY_ENTER);
        m.handle_key(b'q');
        assert_eq!(m.handle_key(b'n'), SettingsEvent::Exit);
        assert!(m.radio_dirty());
    }

    #[test]
    fn test_pending_edit_survives_rebuild_until_reverted() {
        let mut m = SettingsModel::new(onboarded(), false, true, 22);
        let stored = m.settings().radio;
        select(&mut m, Row::SpreadingFactor);
        m.handle_key(KEY_ENTER);
        m.handle_key(KEY_UP);
        m.handle_key(KEY_ENTER);
        let pending = m.pending_radio().unwrap();
        assert_ne!(pending, stored);

        let mut reopened = SettingsModel::new(onboarded(), false, true, 22);
        assert_eq!(reopened.pending_radio(), None);
        reopened.restore_pending(pending);
        assert!(reopened.radio_dirty());
        assert_eq!(reopened.settings().radio, pending);

        assert_eq!(reopened.handle_key(b'r'), SettingsEvent::Redraw);
        assert!(!reopened.radio_dirty());
        assert_eq!(reopened.settings().radio, stored);
        assert_eq!(reopened.handle_key(b'q'), SettingsEvent::Exit);
    }

    #[test]
    fn test_utc_offset_saves_on_leave() {
        let mut m = SettingsModel::new(onboarded(), false, true, 22);
        select(&mut m, Row::UtcOffset);
        m.handle_key(KEY_ENTER);
        m.handle_key(KEY_UP);
        assert_eq!(m.handle_key(KEY_ENTER), SettingsEvent::SaveSettings);
        assert_eq!(m.settings().utc_offset_min, 15);
        assert!(!m.radio_dirty());
    }

    #[test]
    fn test_channels_add_and_compact() {
        let mut m = SettingsModel::new(onboarded(), false, true, 22);
        for _ in 0..3 {
            select(&mut m, Row::AddChannel);
            m.handle_key(KEY_ENTER);
            assert_eq!(m.mode(), EditMode::Text);
            m.handle_key(KEY_ENTER);
        }
        let names: std::vec::Vec<&str> = m.settings().channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["#ch1", "#ch2", "#ch3"]);
        select(&mut m, Row::Channel(0));
        assert_eq!(m.handle_key(b'x'), SettingsEvent::SaveSettings);
        let names: std::vec::Vec<&str> = m.settings().channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["#ch2", "#ch3"]);
        assert!(!m.rows().contains(&Row::Channel(2)));
    }

    #[test]
    fn test_onboarding_starts_in_name_edit() {
        let mut m = SettingsModel::new(DeviceSettings::default(), false, true, 22);
        assert!(m.onboarding());
        assert_eq!(m.mode(), EditMode::Text);
        assert_eq!(m.handle_key(KEY_ENTER), SettingsEvent::None);
        for b in b"node7" {
            m.handle_key(*b);
        }
        assert_eq!(m.handle_key(KEY_ENTER), SettingsEvent::OnboardingDone);
        assert_eq!(m.settings().node_name.as_str(), "node7");
        assert!(m.settings().onboarded);
    }

    #[test]
    fn test_preset_keeps_tx_power() {
        let mut s = onboarded();
        s.radio.tx_dbm = 5;
        let mut m = SettingsModel::new(s, false, true, 22);
        select(&mut m, Row::Preset);
        m.handle_key(KEY_ENTER);
        m.handle_key(KEY_DOWN);
        m.handle_key(KEY_ENTER);
        assert_eq!(m.settings().radio.freq_khz, PRESETS[1].params.freq_khz);
        assert_eq!(m.settings().radio.tx_dbm, 5);
        assert!(m.radio_dirty());
    }

    #[test]
    fn test_modem_toggle_row_only_with_modem() {
        let m = SettingsModel::new(onboarded(), false, true, 22);
        assert!(!m.rows().contains(&Row::Modem));
        let mut m = SettingsModel::new(onboarded(), true, true, 22);
        select(&mut m, Row::Modem);
        assert_eq!(m.handle_key(KEY_ENTER), SettingsEvent::SetModem(false));
    }
}
