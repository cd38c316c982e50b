//! The cooperative loop.
//!
//! [`Runtime::tick`] runs one iteration: read and route a key, pump the
//! audio pipeline, service the mesh stack and the SMS receive queue, poll
//! the current screen, run the power governors and redraw if the refresh
//! deadline is due. Each step runs to completion, so the SD card, the panel
//! and the radio never see interleaved transactions.

use embassy_futures::yield_now;
use heapless::String;
use platform::config::APP_NAME;
use platform::{
    CsPanel, CsRadio, CsReleasingStorage, DeepSleep, EinkPanel, Keyboard, MeshEvent, MeshRadio,
    RefreshMode,
};
use playback::{AudioPipeline, TickEvent};
use store::cfg::load_modem_enabled;
use store::contacts::Contacts;
use store::fs::ensure_dir;
use store::paths::ROOTS;
use store::settings::DeviceSettings;
use store::sms::{self, Direction, SmsRecord};
use ui::router::Secondary;
use ui::{GlobalKey, Route, Router, ScreenId};

use crate::board::{Board, Devices};
use crate::error::AppError;
use crate::notify::{Notice, NoticeAction, NoticeKind, Notifications};
use crate::power::PowerManager;
use crate::render::{splash, Frame};
use crate::screens::{
    Audiobook, Banner, Books, Context, Home, MeshStats, Notes, Outcome, Screen, Settings, Sms,
    View, Web, MAX_BANNER,
};

/// Next attempt after a frame failed to draw.
const RETRY_DRAW_MS: u32 = 5_000;

/// What boot found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootReport {
    /// A modem is fitted and `modem.cfg` allows it: spawn the worker.
    pub modem_enabled: bool,
    /// First boot: the settings screen opened for onboarding.
    pub onboarding: bool,
}

/// Runs `$body` with `$s` bound to the screen `$id` names.
macro_rules! with_screen {
    ($rt:expr, $id:expr, $s:ident => $body:expr) => {
        match $id {
            ScreenId::Home => {
                let $s = &mut $rt.home;
                $body
            }
            ScreenId::Audiobook => {
                let $s = &mut $rt.audiobook;
                $body
            }
            ScreenId::Books => {
                let $s = &mut $rt.books;
                $body
            }
            ScreenId::Notes => {
                let $s = &mut $rt.notes;
                $body
            }
            ScreenId::Sms => {
                let $s = &mut $rt.sms;
                $body
            }
            ScreenId::Web => {
                let $s = &mut $rt.web;
                $body
            }
            ScreenId::Settings => {
                let $s = &mut $rt.settings;
                $body
            }
        }
    };
}

/// Application runtime for one board.
pub struct Runtime<B: Board> {
    router: Router,
    cx: Context<B>,
    keyboard: B::Keyboard,
    sleep: B::Sleep,
    full_refresh: bool,
    home: Home,
    audiobook: Audiobook<B>,
    books: Books,
    notes: Notes,
    sms: Sms,
    web: Web<B>,
    settings: Settings,
}

impl<B: Board> Runtime<B> {
    /// Take ownership of the board's devices.
    pub fn new(devices: Devices<B>) -> Self {
        let Devices {
            panel,
            keyboard,
            sd,
            sd_cs,
            panel_cs,
            radio_cs,
            bus,
            decoder,
            dac,
            eof,
            tags,
            radio,
            gauge,
            sleep,
            cpu,
            gnss,
            wifi,
            connector,
            clock,
            delay,
            has_modem,
            buffers,
            shared,
        } = devices;
        let web = Web::new(wifi, connector, delay.clone(), clock.clone(), buffers.page);
        Self {
            router: Router::new(),
            cx: Context {
                sd: CsReleasingStorage::new(sd, sd_cs, bus),
                radio: CsRadio::new(radio, radio_cs, bus),
                panel: CsPanel::new(panel, panel_cs, bus),
                gauge,
                clock,
                delay,
                audio: AudioPipeline::new(decoder, dac, eof),
                power: PowerManager::new(cpu, gnss),
                notices: Notifications::new(),
                banner: Banner::default(),
                settings: DeviceSettings::default(),
                contacts: Contacts::default(),
                mesh: MeshStats::default(),
                shared,
                has_modem,
                modem_enabled: false,
            },
            keyboard,
            sleep,
            full_refresh: true,
            home: Home::new(),
            audiobook: Audiobook::new(tags),
            books: Books::new(buffers.book),
            notes: Notes::new(),
            sms: Sms::new(),
            web,
            settings: Settings::new(),
        }
    }

    /// Router state.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Shared context.
    pub fn context(&self) -> &Context<B> {
        &self.cx
    }

    /// Mutable shared context.
    pub fn context_mut(&mut self) -> &mut Context<B> {
        &mut self.cx
    }

    /// Current screen.
    pub fn current(&self) -> ScreenId {
        self.router.current()
    }

    /// Notes screen.
    pub fn notes(&self) -> &Notes {
        &self.notes
    }

    /// SMS screen.
    pub fn sms(&self) -> &Sms {
        &self.sms
    }

    /// Web screen.
    pub fn web(&self) -> &Web<B> {
        &self.web
    }

    /// Books screen.
    pub fn books(&self) -> &Books {
        &self.books
    }

    /// Audiobook screen.
    pub fn audiobook(&self) -> &Audiobook<B> {
        &self.audiobook
    }

    /// Settings screen.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Prepare the card, load persisted state and tune the radio.
    ///
    /// Nothing here is fatal: a failure is logged and the device boots with
    /// defaults.
    pub async fn boot(&mut self) -> BootReport {
        tracing::info!("{} booting", APP_NAME);
        if splash(&mut self.cx.panel, APP_NAME, "Starting...").is_err() {
            tracing::warn!("boot: splash draw failed");
        }
        if let Err(e) = self.cx.panel.refresh(RefreshMode::Full).await {
            tracing::warn!("boot: panel refresh failed: {:?}", e);
        }

        for root in ROOTS {
            if let Err(e) = ensure_dir(&mut self.cx.sd, root).await {
                tracing::warn!("boot: cannot create {}: {}", root, e);
            }
        }

        self.cx.settings = DeviceSettings::load(&mut self.cx.sd).await;
        self.cx.modem_enabled = self.cx.has_modem && load_modem_enabled(&mut self.cx.sd).await;

        let params = self.cx.settings.radio;
        if let Err(e) = self.cx.radio.apply(&params).await {
            tracing::error!("boot: radio refused saved parameters: {:?}", e);
        }

        self.cx.contacts = match Contacts::load(&mut self.cx.sd).await {
            Ok(contacts) => contacts,
            Err(e) => {
                tracing::warn!("boot: contacts unreadable: {}", e);
                Contacts::default()
            }
        };

        let onboarding = !self.cx.settings.onboarded;
        if onboarding {
            tracing::info!("boot: first start, onboarding");
            let now = self.cx.now();
            self.router.open(ScreenId::Settings, now);
        }
        self.full_refresh = true;

        let report = BootReport {
            modem_enabled: self.cx.modem_enabled,
            onboarding,
        };
        tracing::info!("boot: done {:?}", report);
        report
    }

    /// Run forever.
    pub async fn run(&mut self) -> ! {
        loop {
            self.tick().await;
            yield_now().await;
        }
    }

    /// One iteration of the loop.
    pub async fn tick(&mut self) {
        let key = self.keyboard.read_key();
        if key.is_some() {
            let now = self.cx.now();
            self.cx.power.on_input(now);
        }

        match self.router.begin(key) {
            Route::Idle => {}
            Route::Global(global) => self.global(global).await,
            Route::Screen { id, key } => self.route_key(id, key).await,
        }
        yield_now().await;

        self.audio_tick().await;
        self.mesh_tick().await;
        self.sms_tick().await;
        yield_now().await;

        let id = self.router.current();
        let polled = with_screen!(self, id, s => s.poll(&mut self.cx).await);
        match polled {
            Ok(outcome) => self.apply(outcome).await,
            Err(e) => {
                self.cx.fail(e);
                let now = self.cx.now();
                self.router.finish(true, now);
            }
        }

        let now = self.cx.now();
        self.cx.power.tick(now);
        self.redraw().await;
    }

    async fn global(&mut self, key: GlobalKey) {
        let now = self.cx.now();
        match key {
            GlobalKey::Power => self.power_off().await,
            GlobalKey::Home => {
                self.leave_current().await;
                self.router.apply_global(key, now);
            }
            GlobalKey::Escape => {
                if self.cx.audio.is_open() {
                    if let Err(e) = self.cx.audio.close(&mut self.cx.sd).await {
                        self.cx.fail(AppError::from(e));
                    }
                    self.audiobook.book_closed();
                }
                self.leave_current().await;
                self.router.apply_global(key, now);
            }
        }
    }

    async fn route_key(&mut self, id: ScreenId, key: u8) {
        let handled = with_screen!(self, id, s => s.handle_input(key, &mut self.cx).await);
        let outcome = match handled {
            Ok(outcome) => outcome,
            Err(e) => {
                self.cx.fail(e);
                Outcome::Handled
            }
        };
        if outcome == Outcome::Ignored {
            if let Some(Secondary::NotificationPreview) = self.router.secondary(id) {
                match self.cx.notices.handle_key(key) {
                    NoticeAction::Ignored => {}
                    NoticeAction::Dismissed => return self.apply(Outcome::Handled).await,
                    NoticeAction::Open(target) => return self.apply(Outcome::Open(target)).await,
                }
            }
        }
        self.apply(outcome).await;
    }

    async fn apply(&mut self, outcome: Outcome) {
        let now = self.cx.now();
        match outcome {
            Outcome::Ignored => self.router.finish(false, now),
            Outcome::Handled => self.router.finish(true, now),
            Outcome::Open(id) => self.router.open(id, now),
            Outcome::Back => {
                self.leave_current().await;
                self.router.back(now);
            }
            Outcome::Home => {
                self.leave_current().await;
                self.router.apply_global(GlobalKey::Home, now);
            }
        }
    }

    async fn leave_current(&mut self) {
        let id = self.router.current();
        let left = with_screen!(self, id, s => s.leave(&mut self.cx).await);
        if let Err(e) = left {
            self.cx.fail(e);
        }
    }

    async fn power_off(&mut self) {
        let now = self.cx.now();
        tracing::info!("power: sleeping");
        if let Err(e) = self.cx.audio.pause(&mut self.cx.sd, now).await {
            self.cx.fail(AppError::from(e));
        }
        self.leave_current().await;
        if splash(&mut self.cx.panel, "Sleeping", "Press power to wake").is_err() {
            tracing::warn!("power: splash draw failed");
        }
        if let Err(e) = self.cx.panel.refresh(RefreshMode::Full).await {
            tracing::warn!("power: panel refresh failed: {:?}", e);
        }
        if let Err(e) = self.cx.panel.sleep().await {
            tracing::warn!("power: panel sleep failed: {:?}", e);
        }
        let plan = self.cx.power.sleep_plan();
        self.sleep.enter(&plan);

        // Only reached on hosts where sleep returns.
        tracing::info!("power: awake");
        self.full_refresh = true;
        let now = self.cx.now();
        self.router.deadline_mut().force(now);
    }

    async fn audio_tick(&mut self) {
        let tx_pending = self.cx.radio.tx_pending();
        self.cx.audio.set_tx_pending(tx_pending);
        let now = self.cx.now();
        match self.cx.audio.tick(&mut self.cx.sd, now).await {
            Ok(TickEvent::Finished) => {
                self.cx.say("End of book");
                self.router.deadline_mut().force(now);
            }
            Ok(TickEvent::SleepExpired) => {
                self.cx.say("Sleep timer: paused");
                self.router.deadline_mut().force(now);
            }
            Ok(TickEvent::Advanced) => self.cx.say("Next track"),
            Ok(TickEvent::None | TickEvent::StreamReady | TickEvent::Autosaved) => {}
            Err(e) => self.cx.fail(AppError::from(e)),
        }
        let active = self.cx.audio.is_active();
        self.router.deadline_mut().set_audio_active(active);
    }

    async fn mesh_tick(&mut self) {
        let event = match self.cx.radio.pump().await {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("mesh: pump failed: {:?}", e);
                return;
            }
        };
        let now = self.cx.now();
        match event {
            None => {}
            Some(MeshEvent::Text { from, body }) => {
                tracing::info!("mesh: message from {}", from.as_str());
                self.cx.mesh.messages = self.cx.mesh.messages.saturating_add(1);
                self.cx.mesh.last_node = from.clone();
                self.cx.notices.push(Notice::new(NoticeKind::Mesh, &from, &body, now));
                self.notice_redraw(now);
            }
            Some(MeshEvent::Advert { name }) => {
                tracing::debug!("mesh: advert from {}", name.as_str());
                self.cx.mesh.adverts = self.cx.mesh.adverts.saturating_add(1);
                self.cx.mesh.last_node = name;
            }
        }
    }

    async fn sms_tick(&mut self) {
        let Some(incoming) = self.cx.shared.queues.recv_sms() else {
            return;
        };
        let now = self.cx.now();
        let record = SmsRecord::new(incoming.timestamp, Direction::Received, &incoming.phone, &incoming.body);
        if let Err(e) = sms::append(&mut self.cx.sd, &record).await {
            self.cx.fail(AppError::from(e));
        }
        let from = self
            .cx
            .contacts
            .name_for(&incoming.phone)
            .unwrap_or(incoming.phone.as_str());
        let notice = Notice::new(NoticeKind::Sms, from, &incoming.body, now);
        self.cx.notices.push(notice);
        self.sms.invalidate();
        self.notice_redraw(now);
    }

    fn notice_redraw(&mut self, now: u64) {
        if matches!(self.router.current(), ScreenId::Home | ScreenId::Sms) {
            self.router.deadline_mut().force(now);
        }
    }

    async fn redraw(&mut self) {
        let now = self.cx.now();
        if !self.router.deadline().is_due(now) {
            return;
        }
        let view = View::capture(&self.cx);
        let id = self.router.current();
        let banner: Option<String<MAX_BANNER>> = self.cx.banner.active(now).map(|b| {
            let mut s = String::new();
            let _ = s.push_str(b);
            s
        });

        let drawn = match Frame::begin(&mut self.cx.panel) {
            Ok(mut frame) => {
                let mut drawn = frame.status_bar(id.title(), &view.status_right()).map(|()| 0);
                if drawn.is_ok() {
                    drawn = with_screen!(self, id, s => Screen::<B>::render(s, &mut frame, &view));
                }
                if let (Ok(_), Some(text)) = (&drawn, banner.as_deref()) {
                    if let Err(e) = frame.hint(text) {
                        drawn = Err(e);
                    }
                }
                drawn
            }
            Err(e) => Err(e),
        };
        let delta = match drawn {
            Ok(delta) => delta,
            Err(_) => {
                tracing::warn!("render: draw failed on {}", id.title());
                RETRY_DRAW_MS
            }
        };

        let mode = if self.full_refresh || self.router.screen_changed() {
            RefreshMode::Full
        } else {
            RefreshMode::Partial
        };
        self.full_refresh = false;
        if let Err(e) = self.cx.panel.refresh(mode).await {
            tracing::warn!("render: panel refresh failed: {:?}", e);
        }

        let now = self.cx.now();
        let delta = match self.cx.banner.remaining_ms(now) {
            Some(left) => delta.min(left),
            None => delta,
        };
        self.router.rendered(now, delta);
    }
}
