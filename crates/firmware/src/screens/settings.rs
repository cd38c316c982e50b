//! Settings and first-boot onboarding.
//!
//! Key handling lives in [`SettingsModel`]; this screen turns its events
//! into radio re-tunes and writes to `settings.bin` and `modem.cfg`.

use core::fmt::Write as _;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::DrawTarget;
use heapless::String;
use platform::radio::{RadioParams, PRESETS};
use platform::MeshRadio;
use store::cfg::save_modem_enabled;
use store::settings::DeviceSettings;
use ui::{EditMode, Row, SettingsEvent, SettingsModel};

use super::{Context, Outcome, Screen, View};
use crate::board::Board;
use crate::error::AppError;
use crate::render::{Frame, BODY_ROWS};

/// Redraw period while editing.
pub const SETTINGS_REFRESH_MS: u32 = 700;

/// Redraw period while idle.
pub const IDLE_REFRESH_MS: u32 = 30_000;

const LIST_TOP: usize = 2;
const LABEL_COLS: usize = 14;

/// Settings screen. The model is rebuilt from the saved settings each time
/// the screen opens; radio edits that were declined at the confirm are
/// carried over as still pending.
#[derive(Debug, Default)]
pub struct Settings {
    model: Option<SettingsModel>,
    pending_radio: Option<RadioParams>,
}

impl Settings {
    /// Closed screen.
    pub fn new() -> Self {
        Self::default()
    }

    /// The open model.
    pub fn model(&self) -> Option<&SettingsModel> {
        self.model.as_ref()
    }

    /// Radio edits waiting for an apply, while the screen is closed.
    pub fn pending_radio(&self) -> Option<RadioParams> {
        self.pending_radio
    }

    fn ensure<B: Board>(&mut self, cx: &Context<B>) -> &mut SettingsModel {
        let pending = self.pending_radio;
        self.model.get_or_insert_with(|| {
            let mut model = SettingsModel::new(
                cx.settings.clone(),
                cx.has_modem,
                cx.modem_enabled,
                cx.radio.max_tx_dbm(),
            );
            if let Some(params) = pending {
                model.restore_pending(params);
            }
            model
        })
    }

    async fn apply_radio<B: Board>(
        &mut self,
        params: RadioParams,
        cx: &mut Context<B>,
    ) -> Result<Outcome, AppError> {
        if let Err(e) = cx.radio.apply(&params).await {
            tracing::warn!("settings: radio refused {:?}: {:?}", params, e);
            return Err(AppError::Radio);
        }
        cx.settings.radio = params;
        cx.settings.save(&mut cx.sd).await?;
        if let Some(model) = self.model.as_mut() {
            model.applied();
        }
        self.pending_radio = None;
        cx.say("Radio applied");
        Ok(Outcome::Back)
    }

    async fn save<B: Board>(&mut self, cx: &mut Context<B>) -> Result<(), AppError> {
        let Some(model) = self.model.as_ref() else {
            return Ok(());
        };
        // Unapplied radio edits stay out of settings.bin.
        let radio = cx.settings.radio;
        cx.settings = model.settings().clone();
        cx.settings.radio = radio;
        cx.settings.save(&mut cx.sd).await?;
        Ok(())
    }
}

impl<B: Board> Screen<B> for Settings {
    async fn handle_input(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        let event = self.ensure(cx).handle_key(key);
        match event {
            SettingsEvent::None => Ok(Outcome::Ignored),
            SettingsEvent::Redraw => Ok(Outcome::Handled),
            SettingsEvent::ApplyRadio(params) => self.apply_radio(params, cx).await,
            SettingsEvent::SaveSettings => {
                self.save(cx).await?;
                Ok(Outcome::Handled)
            }
            SettingsEvent::SetModem(enabled) => {
                save_modem_enabled(&mut cx.sd, enabled).await?;
                if enabled {
                    cx.say("Modem starts after restart");
                } else {
                    cx.shared.status.request_shutdown();
                    cx.modem_enabled = false;
                    cx.say("Modem off");
                }
                tracing::info!("settings: modem enabled = {}", enabled);
                Ok(Outcome::Handled)
            }
            SettingsEvent::Exit => Ok(Outcome::Back),
            SettingsEvent::OnboardingDone => {
                self.save(cx).await?;
                Ok(Outcome::Home)
            }
        }
    }

    async fn poll(&mut self, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        if self.model.is_some() {
            return Ok(Outcome::Ignored);
        }
        self.ensure(cx);
        Ok(Outcome::Handled)
    }

    async fn leave(&mut self, _cx: &mut Context<B>) -> Result<(), AppError> {
        self.pending_radio = self.model.take().and_then(|m| m.pending_radio());
        Ok(())
    }

    fn render<D>(&mut self, frame: &mut Frame<'_, D>, _view: &View) -> Result<u32, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let Some(model) = self.model.as_ref() else {
            return Ok(IDLE_REFRESH_MS);
        };
        if model.onboarding() {
            frame.title(0, "Welcome")?;
            frame.text(0, 4, "Name this node:")?;
            let mut line: String<40> = String::new();
            let _ = write!(line, "> {}_", model.text());
            frame.text(0, 6, &line)?;
            frame.text(0, 9, "Other nodes see this name.")?;
            frame.hint("Enter save")?;
            return Ok(SETTINGS_REFRESH_MS);
        }

        frame.text(0, 0, "Settings")?;
        let rows = model.rows();
        let visible = BODY_ROWS - LIST_TOP - 1;
        let top = model.cursor().saturating_add(1).saturating_sub(visible);
        for (line_no, (i, row)) in rows.iter().enumerate().skip(top).take(visible).enumerate() {
            let line = row_line(*row, model);
            let selected = i == model.cursor() && !matches!(row, Row::Header(_));
            frame.row(LIST_TOP + line_no, &line, selected)?;
        }

        match model.mode() {
            EditMode::Text => {
                let mut line: String<40> = String::new();
                let _ = write!(line, "> {}_", model.text());
                frame.text(0, BODY_ROWS - 1, &line)?;
                frame.hint("Enter save  Bksp cancel")?;
            }
            EditMode::Picker => {
                let first = LIST_TOP + 4;
                for (i, preset) in PRESETS.iter().enumerate() {
                    let mut line: String<40> = String::new();
                    let _ = write!(line, "  {}", preset.name);
                    frame.row(first + i, &line, i == model.picker())?;
                }
                frame.hint("Enter pick  q cancel")?;
            }
            EditMode::Numeric => frame.hint("Up/Down change  Enter done")?,
            EditMode::Confirm => {
                frame.text(0, BODY_ROWS - 1, "Apply radio changes? y/n")?;
                frame.hint("y apply  n keep for later")?;
            }
            EditMode::None => {
                if model.radio_dirty() {
                    frame.hint("Radio edited  q apply  r revert")?;
                } else {
                    frame.hint("Enter edit  x delete  q back")?;
                }
            }
        }
        let idle = model.mode() == EditMode::None;
        Ok(if idle { IDLE_REFRESH_MS } else { SETTINGS_REFRESH_MS })
    }
}

/// Name of the preset matching `radio` apart from TX power.
fn preset_name(radio: &RadioParams) -> &'static str {
    PRESETS
        .iter()
        .find(|p| {
            p.params.freq_khz == radio.freq_khz
                && p.params.bandwidth == radio.bandwidth
                && p.params.sf == radio.sf
                && p.params.cr == radio.cr
        })
        .map_or("Custom", |p| p.name)
}

fn label(row: Row) -> &'static str {
    match row {
        Row::Header(title) => title,
        Row::Name => "Name",
        Row::Preset => "Preset",
        Row::Frequency => "Frequency",
        Row::Bandwidth => "Bandwidth",
        Row::SpreadingFactor => "Spreading",
        Row::CodingRate => "Coding rate",
        Row::TxPower => "TX power",
        Row::UtcOffset => "UTC offset",
        Row::Channel(_) => "Channel",
        Row::AddChannel => "+ Add channel",
        Row::Modem => "Modem",
    }
}

/// Value column for `row`.
fn value(row: Row, settings: &DeviceSettings, modem_enabled: bool) -> String<24> {
    let r = &settings.radio;
    let mut out = String::new();
    let _ = match row {
        Row::Header(_) | Row::AddChannel => Ok(()),
        Row::Name => out.push_str(&settings.node_name).map_err(|_| core::fmt::Error),
        Row::Preset => out.push_str(preset_name(r)).map_err(|_| core::fmt::Error),
        Row::Frequency => write!(out, "{} MHz", r.freq_label()),
        Row::Bandwidth => out.push_str(r.bandwidth.label()).map_err(|_| core::fmt::Error),
        Row::SpreadingFactor => write!(out, "SF{}", r.sf),
        Row::CodingRate => write!(out, "4/{}", r.cr),
        Row::TxPower => write!(out, "{} dBm", r.tx_dbm),
        Row::UtcOffset => {
            let o = settings.utc_offset_min;
            let sign = if o < 0 { '-' } else { '+' };
            let abs = o.unsigned_abs();
            write!(out, "{}{:02}:{:02}", sign, abs / 60, abs % 60)
        }
        Row::Channel(i) => {
            let name = settings.channels.get(i).map_or("", |c| c.name.as_str());
            out.push_str(name).map_err(|_| core::fmt::Error)
        }
        Row::Modem => out
            .push_str(if modem_enabled { "On" } else { "Off" })
            .map_err(|_| core::fmt::Error),
    };
    out
}

fn row_line(row: Row, model: &SettingsModel) -> String<40> {
    let mut line = String::new();
    if let Row::Header(title) = row {
        let _ = write!(line, "[{}]", title);
        return line;
    }
    let _ = write!(
        line,
        " {:<width$}{}",
        label(row),
        value(row, model.settings(), model.modem_enabled()),
        width = LABEL_COLS
    );
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::radio::Bandwidth;

    #[test]
    fn test_preset_name_ignores_tx_power() {
        let mut radio = PRESETS[2].params;
        radio.tx_dbm = 2;
        assert_eq!(preset_name(&radio), "Long Range");
        radio.sf = 7;
        assert_eq!(preset_name(&radio), "Custom");
    }

    #[test]
    fn test_value_formats_radio_rows() {
        let mut settings = DeviceSettings::default();
        settings.radio.freq_khz = 869_525;
        settings.radio.bandwidth = Bandwidth::Khz125;
        settings.radio.cr = 8;
        assert_eq!(value(Row::Frequency, &settings, false).as_str(), "869.525 MHz");
        assert_eq!(value(Row::CodingRate, &settings, false).as_str(), "4/8");
        assert_eq!(value(Row::Modem, &settings, true).as_str(), "On");
    }

    #[test]
    fn test_utc_offset_signed() {
        let mut settings = DeviceSettings::default();
        settings.utc_offset_min = -330;
        assert_eq!(value(Row::UtcOffset, &settings, false).as_str(), "-05:30");
        settings.utc_offset_min = 60;
        assert_eq!(value(Row::UtcOffset, &settings, false).as_str(), "+01:00");
    }

    #[test]
    fn test_header_rows_bracketed() {
        let model = SettingsModel::new(
            DeviceSettings {
                onboarded: true,
                ..DeviceSettings::default()
            },
            false,
            false,
            20,
        );
        assert_eq!(row_line(Row::Header("Radio"), &model).as_str(), "[Radio]");
        assert!(row_line(Row::TxPower, &model).as_str().contains("dBm"));
    }
}
