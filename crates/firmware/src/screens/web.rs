//! Text-mode web reader.
//!
//! ```text
//! WifiSetup ─► Connecting ─► Home ─► UrlEntry ─► Fetching ─► Reading
//!                              ▲                    ▲          │ l  │ f
//!                              └────── q ───────────┴─ LinkSelect / FormFill
//! ```
//!
//! Blocking work (association, scans, fetches) runs from [`Screen::poll`]
//! behind a splash drawn straight onto the panel, so a key press always
//! gets its frame before the wait starts. A fetch cannot be interrupted;
//! keys typed meanwhile are handled once it returns.

use core::fmt::Write as _;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::DrawTarget;
use embedded_hal_async::delay::DelayNs;
use heapless::{String, Vec};
use platform::config::TEXT_COLUMNS;
use platform::{EinkPanel, RefreshMode, WifiLink, WifiNetwork};
use store::cfg::{self, WifiCredentials, MAX_PASSWORD};
use store::urls::{Bookmarks, History, MAX_URL};
use text::PageIndex;
use ui::keys::{is_back, nav, Nav, KEY_ENTER};
use ui::screen::WebMode;
use web::form::{MAX_FIELD_VALUE, MAX_FIELDS};
use web::{Document, FetchError, Fetcher, Form, Progress, ProgressSink, TagStripExtractor, Url};

use super::{Context, FieldEvent, ListCursor, Outcome, Screen, TextField, View};
use crate::board::Board;
use crate::error::AppError;
use crate::render::{splash, Frame, BODY_ROWS};

/// WiFi association timeout.
pub const WIFI_CONNECT_TIMEOUT_MS: u32 = 15_000;

/// How long "Connected!" stays up.
pub const CONNECTED_SPLASH_MS: u32 = 1_500;

/// Redraw period of the web views.
pub const WEB_REFRESH_MS: u32 = 30_000;

/// Redraw period while typing.
pub const TYPING_REFRESH_MS: u32 = 700;

const LIST_TOP: usize = 2;

enum Pending {
    Get(Url),
    Submit(Form),
}

/// Splash redrawn from the fetcher's progress reports.
struct FetchSplash<'p, P> {
    panel: &'p mut P,
}

impl<P: EinkPanel> FetchSplash<'_, P> {
    async fn show(&mut self, detail: &str) {
        if splash(&mut *self.panel, "Fetching...", detail).is_err() {
            return;
        }
        if let Err(e) = self.panel.refresh(RefreshMode::Partial).await {
            tracing::warn!("web: splash refresh failed: {:?}", e);
        }
    }
}

impl<P: EinkPanel> ProgressSink for FetchSplash<'_, P> {
    async fn report(&mut self, progress: Progress) {
        let mut detail: String<48> = String::new();
        let kb = progress.received / 1024;
        let _ = match progress.total {
            Some(total) => write!(detail, "{} KB of {} KB", kb, total / 1024),
            None => write!(detail, "{} KB", kb),
        };
        self.show(&detail).await;
    }
}

async fn splash_now<P: EinkPanel>(panel: &mut P, title: &str, detail: &str) {
    if splash(panel, title, detail).is_err() {
        return;
    }
    if let Err(e) = panel.refresh(RefreshMode::Full).await {
        tracing::warn!("web: splash refresh failed: {:?}", e);
    }
}

/// Web reader screen.
pub struct Web<B: Board> {
    mode: WebMode,
    started: bool,
    wifi: B::Wifi,
    fetcher: Fetcher<B::Connector, B::Delay, B::Clock>,
    extractor: TagStripExtractor,
    doc: Document,
    page_buf: Option<&'static mut [u8]>,
    pages: PageIndex,
    page: usize,
    current: Option<Url>,
    pending: Option<Pending>,
    bookmarks: Bookmarks,
    history: History,
    creds: Option<WifiCredentials>,
    networks: Vec<WifiNetwork, 16>,
    scanned: bool,
    asking_password: bool,
    cursor: ListCursor,
    url: TextField<MAX_URL>,
    password: TextField<MAX_PASSWORD>,
    form: usize,
    field_cursor: ListCursor,
    editing: bool,
    value: TextField<MAX_FIELD_VALUE>,
}

impl<B: Board> Web<B> {
    /// Reader using `page_buf` for fetched pages.
    pub fn new(
        wifi: B::Wifi,
        connector: B::Connector,
        delay: B::Delay,
        clock: B::Clock,
        page_buf: Option<&'static mut [u8]>,
    ) -> Self {
        Self {
            mode: WebMode::WifiSetup,
            started: false,
            wifi,
            fetcher: Fetcher::new(connector, delay, clock),
            extractor: TagStripExtractor,
            doc: Document::default(),
            page_buf,
            pages: PageIndex::build(&[], TEXT_COLUMNS, BODY_ROWS),
            page: 0,
            current: None,
            pending: None,
            bookmarks: Bookmarks::new(),
            history: History::new(),
            creds: None,
            networks: Vec::new(),
            scanned: false,
            asking_password: false,
            cursor: ListCursor::default(),
            url: TextField::new(),
            password: TextField::masked(),
            form: 0,
            field_cursor: ListCursor::default(),
            editing: false,
            value: TextField::new(),
        }
    }

    /// Current sub-mode.
    pub fn mode(&self) -> WebMode {
        self.mode
    }

    /// URL of the page shown.
    pub fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(Url::as_str)
    }

    /// Extracted text of the page shown.
    pub fn text(&self) -> &[u8] {
        self.page_buf.as_deref().map_or(&[], |b| self.doc.text(b))
    }

    /// Links and forms of the page shown.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Pages of the current document.
    pub fn page_count(&self) -> usize {
        self.pages.page_count()
    }

    /// Saved bookmarks.
    pub fn bookmarks(&self) -> &Bookmarks {
        &self.bookmarks
    }

    /// Visit history.
    pub fn history(&self) -> &History {
        &self.history
    }

    async fn start(&mut self, cx: &mut Context<B>) -> Result<(), AppError> {
        self.started = true;
        self.bookmarks = Bookmarks::load_default(&mut cx.sd).await?;
        self.history = History::load_default(&mut cx.sd).await?;
        self.creds = cfg::load_wifi(&mut cx.sd).await?;
        self.mode = if self.wifi.is_connected() {
            WebMode::Home
        } else if self.creds.is_some() {
            WebMode::Connecting
        } else {
            WebMode::WifiSetup
        };
        Ok(())
    }

    async fn connect(&mut self, cx: &mut Context<B>) -> Result<(), AppError> {
        let Some(creds) = self.creds.clone() else {
            self.mode = WebMode::WifiSetup;
            return Ok(());
        };
        splash_now(&mut cx.panel, "Connecting...", &creds.ssid).await;
        if let Err(e) = self
            .wifi
            .connect(&creds.ssid, &creds.password, WIFI_CONNECT_TIMEOUT_MS)
            .await
        {
            tracing::warn!("web: wifi {} failed: {:?}", creds.ssid.as_str(), e);
            self.mode = WebMode::WifiSetup;
            self.scanned = false;
            return Err(AppError::Wifi);
        }
        tracing::info!("web: joined {}", creds.ssid.as_str());
        cfg::save_wifi(&mut cx.sd, &creds).await?;
        splash_now(&mut cx.panel, "Connected!", &creds.ssid).await;
        cx.delay.delay_ms(CONNECTED_SPLASH_MS).await;
        self.mode = WebMode::Home;
        self.cursor.reset();
        Ok(())
    }

    async fn scan(&mut self, cx: &mut Context<B>) -> Result<(), AppError> {
        self.scanned = true;
        splash_now(&mut cx.panel, "Scanning...", "").await;
        self.networks.clear();
        if let Err(e) = self.wifi.scan(&mut self.networks).await {
            tracing::warn!("web: scan failed: {:?}", e);
            return Err(AppError::Wifi);
        }
        self.networks.sort_unstable_by(|a, b| b.rssi.cmp(&a.rssi));
        self.cursor.reset();
        Ok(())
    }

    async fn fetch(&mut self, cx: &mut Context<B>) -> Result<(), AppError> {
        let Some(pending) = self.pending.take() else {
            self.mode = WebMode::Home;
            return Ok(());
        };
        let Some(buf) = self.page_buf.as_deref_mut() else {
            tracing::error!("web: no page buffer");
            self.mode = WebMode::Home;
            return Err(AppError::OutOfMemory);
        };
        let host: String<64> = match &pending {
            Pending::Get(url) => url.host().try_into().unwrap_or_default(),
            Pending::Submit(_) => self
                .current
                .as_ref()
                .and_then(|u| u.host().try_into().ok())
                .unwrap_or_default(),
        };
        let mut sink = FetchSplash { panel: &mut cx.panel };
        sink.show(&host).await;
        let result = match &pending {
            Pending::Get(url) => {
                self.fetcher
                    .load(url, &mut self.extractor, &mut self.doc, buf, &mut sink)
                    .await
            }
            Pending::Submit(form) => match &self.current {
                Some(page_url) => {
                    let page_url = page_url.clone();
                    self.fetcher
                        .submit(form, &page_url, &mut self.extractor, &mut self.doc, buf, &mut sink)
                        .await
                }
                None => Err(FetchError::BadUrl),
            },
        };
        match result {
            Ok(page) => {
                tracing::info!("web: {} ({} bytes, {} text)", page.url, page.len, self.doc.text_len);
                self.pages = PageIndex::build(self.doc.text(buf), TEXT_COLUMNS, BODY_ROWS);
                self.page = 0;
                if self.history.push(page.url.as_str()) {
                    self.history.save_default(&mut cx.sd).await?;
                }
                self.current = Some(page.url);
                self.form = 0;
                self.mode = WebMode::Reading;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("web: fetch failed: {}", e);
                self.doc.clear();
                self.pages = PageIndex::build(&[], TEXT_COLUMNS, BODY_ROWS);
                if let Pending::Get(url) = &pending {
                    self.url.set(url.as_str());
                }
                self.mode = if self.current.is_some() && matches!(pending, Pending::Submit(_)) {
                    WebMode::FormFill
                } else {
                    WebMode::UrlEntry
                };
                Err(e.into())
            }
        }
    }

    fn go(&mut self, url: Url) {
        self.pending = Some(Pending::Get(url));
        self.mode = WebMode::Fetching;
    }

    fn home_len(&self) -> usize {
        self.bookmarks.len() + self.history.len()
    }

    fn home_entry(&self, index: usize) -> Option<&str> {
        if index < self.bookmarks.len() {
            self.bookmarks.get(index)
        } else {
            self.history.get(index - self.bookmarks.len())
        }
    }

    fn editable(&self) -> Vec<usize, MAX_FIELDS> {
        self.doc
            .forms
            .get(self.form)
            .map(|f| {
                f.fields
                    .iter()
                    .enumerate()
                    .filter(|(_, field)| field.kind.is_editable())
                    .map(|(i, _)| i)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn wifi_key(&mut self, key: u8) -> Outcome {
        if self.asking_password {
            return match self.password.handle(key) {
                FieldEvent::None => Outcome::Ignored,
                FieldEvent::Changed => Outcome::Handled,
                FieldEvent::Cancel => {
                    self.asking_password = false;
                    Outcome::Handled
                }
                FieldEvent::Submit => {
                    self.asking_password = false;
                    if let Some(creds) = &mut self.creds {
                        creds.password.clear();
                        let _ = creds.password.push_str(self.password.as_str());
                    }
                    self.mode = WebMode::Connecting;
                    Outcome::Handled
                }
            };
        }
        if self.cursor.handle(key, self.networks.len()) {
            return Outcome::Handled;
        }
        if is_back(key) {
            return Outcome::Back;
        }
        match key {
            KEY_ENTER => {
                let Some(net) = self.networks.get(self.cursor.index) else {
                    return Outcome::Ignored;
                };
                self.creds = Some(WifiCredentials {
                    ssid: net.ssid.clone(),
                    password: String::new(),
                });
                if net.secured {
                    self.password.clear();
                    self.asking_password = true;
                } else {
                    self.mode = WebMode::Connecting;
                }
                Outcome::Handled
            }
            b'r' | b'R' => {
                self.scanned = false;
                Outcome::Handled
            }
            _ => Outcome::Ignored,
        }
    }

    async fn home_key(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        if self.cursor.handle(key, self.home_len()) {
            return Ok(Outcome::Handled);
        }
        if is_back(key) {
            return Ok(Outcome::Back);
        }
        match key {
            KEY_ENTER => {
                let Some(entry) = self.home_entry(self.cursor.index) else {
                    return Ok(Outcome::Ignored);
                };
                let url = Url::parse(entry)?;
                self.go(url);
                Ok(Outcome::Handled)
            }
            b'u' | b'U' => {
                self.url.set("https://");
                self.mode = WebMode::UrlEntry;
                Ok(Outcome::Handled)
            }
            b'x' | b'X' => {
                let index = self.cursor.index;
                if index < self.bookmarks.len() {
                    self.bookmarks.remove(index);
                    self.bookmarks.save_default(&mut cx.sd).await?;
                } else if self.history.remove(index - self.bookmarks.len()).is_some() {
                    self.history.save_default(&mut cx.sd).await?;
                }
                self.cursor.clamp(self.home_len());
                Ok(Outcome::Handled)
            }
            b'w' | b'W' => {
                self.wifi.disconnect();
                self.scanned = false;
                self.mode = WebMode::WifiSetup;
                Ok(Outcome::Handled)
            }
            _ => Ok(Outcome::Ignored),
        }
    }

    fn url_key(&mut self, key: u8, cx: &mut Context<B>) -> Outcome {
        match self.url.handle(key) {
            FieldEvent::None => Outcome::Ignored,
            FieldEvent::Changed => Outcome::Handled,
            FieldEvent::Cancel => {
                self.mode = WebMode::Home;
                Outcome::Handled
            }
            FieldEvent::Submit => {
                let typed = self.url.as_str().trim();
                let mut full: String<MAX_URL> = String::new();
                if !typed.contains("://") {
                    let _ = full.push_str("https://");
                }
                let _ = full.push_str(typed);
                match Url::parse(&full) {
                    Ok(url) => self.go(url),
                    Err(e) => cx.say(e.banner()),
                }
                Outcome::Handled
            }
        }
    }

    async fn reading_key(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        if is_back(key) {
            self.mode = WebMode::Home;
            self.cursor.reset();
            return Ok(Outcome::Handled);
        }
        let last = self.pages.page_count().saturating_sub(1);
        match (nav(key), key) {
            (Some(Nav::Right | Nav::Down), _) | (_, KEY_ENTER | b' ') => {
                self.page = (self.page + 1).min(last);
                Ok(Outcome::Handled)
            }
            (Some(Nav::Left | Nav::Up), _) => {
                self.page = self.page.saturating_sub(1);
                Ok(Outcome::Handled)
            }
            (_, b'l' | b'L') => {
                if self.doc.links.is_empty() {
                    cx.say("No links on this page");
                } else {
                    self.cursor.reset();
                    self.mode = WebMode::LinkSelect;
                }
                Ok(Outcome::Handled)
            }
            (_, b'f' | b'F') => {
                if self.doc.forms.is_empty() {
                    cx.say("No forms on this page");
                } else {
                    self.field_cursor.reset();
                    self.editing = false;
                    self.mode = WebMode::FormFill;
                }
                Ok(Outcome::Handled)
            }
            (_, b'b' | b'B') => {
                if let Some(url) = &self.current {
                    self.bookmarks.push(url.as_str());
                    self.bookmarks.save_default(&mut cx.sd).await?;
                    cx.say("Bookmarked");
                }
                Ok(Outcome::Handled)
            }
            (_, b'u' | b'U') => {
                let current = self.current.as_ref().map_or("https://", Url::as_str);
                let mut text: String<MAX_URL> = String::new();
                let _ = text.push_str(current);
                self.url.set(&text);
                self.mode = WebMode::UrlEntry;
                Ok(Outcome::Handled)
            }
            _ => Ok(Outcome::Ignored),
        }
    }

    fn link_key(&mut self, key: u8) -> Result<Outcome, AppError> {
        if self.cursor.handle(key, self.doc.links.len()) {
            return Ok(Outcome::Handled);
        }
        if is_back(key) {
            self.mode = WebMode::Reading;
            return Ok(Outcome::Handled);
        }
        if key != KEY_ENTER {
            return Ok(Outcome::Ignored);
        }
        let (Some(link), Some(base)) = (self.doc.links.get(self.cursor.index), &self.current) else {
            return Ok(Outcome::Ignored);
        };
        let url = base.resolve(&link.href)?;
        self.go(url);
        Ok(Outcome::Handled)
    }

    fn form_key(&mut self, key: u8) -> Outcome {
        let editable = self.editable();
        if self.editing {
            match self.value.handle(key) {
                FieldEvent::None => return Outcome::Ignored,
                FieldEvent::Changed => return Outcome::Handled,
                FieldEvent::Cancel => self.editing = false,
                FieldEvent::Submit => {
                    self.editing = false;
                    let slot = editable.get(self.field_cursor.index).copied();
                    if let Some(field) = slot
                        .and_then(|i| self.doc.forms.get_mut(self.form)?.fields.get_mut(i))
                    {
                        field.value.clear();
                        let _ = field.value.push_str(self.value.as_str());
                    }
                }
            }
            return Outcome::Handled;
        }
        // Rows: each editable field, then Submit.
        let rows = editable.len() + 1;
        if self.field_cursor.handle(key, rows) {
            return Outcome::Handled;
        }
        if is_back(key) {
            self.mode = WebMode::Reading;
            return Outcome::Handled;
        }
        match (nav(key), key) {
            (Some(Nav::Left), _) if self.form > 0 => {
                self.form -= 1;
                self.field_cursor.reset();
                Outcome::Handled
            }
            (Some(Nav::Right), _) if self.form + 1 < self.doc.forms.len() => {
                self.form += 1;
                self.field_cursor.reset();
                Outcome::Handled
            }
            (_, KEY_ENTER) => {
                let Some(form) = self.doc.forms.get(self.form) else {
                    return Outcome::Ignored;
                };
                match editable.get(self.field_cursor.index).and_then(|&i| form.fields.get(i)) {
                    Some(field) => {
                        self.value = if field.kind == web::FieldKind::Password {
                            TextField::masked()
                        } else {
                            TextField::new()
                        };
                        self.value.set(&field.value);
                        self.editing = true;
                    }
                    None => {
                        self.pending = Some(Pending::Submit(form.clone()));
                        self.mode = WebMode::Fetching;
                    }
                }
                Outcome::Handled
            }
            _ => Outcome::Ignored,
        }
    }

    fn render_home<D>(&mut self, frame: &mut Frame<'_, D>) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        frame.text(0, 0, "Web")?;
        let len = self.home_len();
        if len == 0 {
            frame.text(0, LIST_TOP, "No bookmarks or history.")?;
            frame.text(0, LIST_TOP + 1, "Press u to enter a URL.")?;
        }
        let window = self.cursor.visible(len, BODY_ROWS - LIST_TOP);
        for (line_no, i) in window.enumerate() {
            let Some(entry) = self.home_entry(i) else { break };
            let mut line: String<80> = String::new();
            let mark = if i < self.bookmarks.len() { '*' } else { ' ' };
            let _ = write!(line, "{}{}", mark, entry.split_once("://").map_or(entry, |(_, rest)| rest));
            frame.row(LIST_TOP + line_no, &line, i == self.cursor.index)?;
        }
        frame.hint("Enter go  u URL  x remove  w WiFi")
    }

    fn render_form<D>(&mut self, frame: &mut Frame<'_, D>) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let editable = self.editable();
        let Some(form) = self.doc.forms.get(self.form) else {
            return frame.text(0, LIST_TOP, "No form");
        };
        let mut head: String<48> = String::new();
        let _ = write!(head, "Form {}/{}", self.form + 1, self.doc.forms.len());
        frame.row(0, &head, true)?;
        let mut row = LIST_TOP;
        for (slot, &i) in editable.iter().enumerate() {
            let Some(field) = form.fields.get(i) else { continue };
            let mut line: String<80> = String::new();
            let _ = write!(line, "{}: ", field.name);
            if field.kind == web::FieldKind::Password {
                for _ in field.value.chars() {
                    let _ = line.push('*');
                }
            } else {
                let _ = line.push_str(&field.value);
            }
            frame.row(row, &line, slot == self.field_cursor.index && !self.editing)?;
            row += 1;
        }
        frame.row(row, "[Submit]", self.field_cursor.index == editable.len())?;
        if self.editing {
            frame.text(0, row + 2, "Value:")?;
            frame.text(0, row + 3, &self.value.display())?;
            frame.hint("Enter set  Bksp on empty cancels")
        } else {
            frame.hint("Enter edit/submit  <> form  q page")
        }
    }
}

impl<B: Board> Screen<B> for Web<B> {
    async fn handle_input(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        match self.mode {
            WebMode::WifiSetup => Ok(self.wifi_key(key)),
            WebMode::Home => self.home_key(key, cx).await,
            WebMode::UrlEntry => Ok(self.url_key(key, cx)),
            WebMode::Reading => self.reading_key(key, cx).await,
            WebMode::LinkSelect => self.link_key(key),
            WebMode::FormFill => Ok(self.form_key(key)),
            WebMode::Connecting | WebMode::Fetching => Ok(Outcome::Ignored),
        }
    }

    async fn poll(&mut self, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        if !self.started {
            self.start(cx).await?;
            return Ok(Outcome::Handled);
        }
        match self.mode {
            WebMode::Connecting => self.connect(cx).await.map(|()| Outcome::Handled),
            WebMode::Fetching => self.fetch(cx).await.map(|()| Outcome::Handled),
            WebMode::WifiSetup if !self.scanned && !self.asking_password => {
                self.scan(cx).await.map(|()| Outcome::Handled)
            }
            _ => Ok(Outcome::Ignored),
        }
    }

    async fn leave(&mut self, _cx: &mut Context<B>) -> Result<(), AppError> {
        self.fetcher.disconnect();
        Ok(())
    }

    fn render<D>(&mut self, frame: &mut Frame<'_, D>, _view: &View) -> Result<u32, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        match self.mode {
            WebMode::WifiSetup => {
                frame.text(0, 0, "WiFi networks")?;
                if self.asking_password {
                    let ssid = self.creds.as_ref().map_or("", |c| c.ssid.as_str());
                    let mut line: String<48> = String::new();
                    let _ = write!(line, "Password for {}:", ssid);
                    frame.text(0, LIST_TOP, &line)?;
                    frame.text(0, LIST_TOP + 1, &self.password.display())?;
                    frame.hint("Enter connect  Bksp on empty cancels")?;
                    return Ok(TYPING_REFRESH_MS);
                }
                if self.networks.is_empty() {
                    frame.text(0, LIST_TOP, if self.scanned { "No networks found." } else { "Scanning..." })?;
                }
                let window = self.cursor.visible(self.networks.len(), BODY_ROWS - LIST_TOP);
                for (line_no, i) in window.enumerate() {
                    let Some(net) = self.networks.get(i) else { break };
                    let mut line: String<64> = String::new();
                    let lock = if net.secured { '#' } else { ' ' };
                    let _ = write!(line, "{}{} {}dBm", lock, net.ssid, net.rssi);
                    frame.row(LIST_TOP + line_no, &line, i == self.cursor.index)?;
                }
                frame.hint("Enter join  r rescan  q back")?;
            }
            WebMode::Connecting => {
                frame.text(0, LIST_TOP, "Connecting...")?;
            }
            WebMode::Fetching => {
                frame.text(0, LIST_TOP, "Fetching...")?;
            }
            WebMode::Home => self.render_home(frame)?,
            WebMode::UrlEntry => {
                frame.text(0, 0, "Go to URL")?;
                frame.paragraph(LIST_TOP, 4, self.url.display().as_bytes())?;
                frame.hint("Enter go  Bksp on empty cancels")?;
                return Ok(TYPING_REFRESH_MS);
            }
            WebMode::Reading => {
                let text = self.page_buf.as_deref().map_or(&[][..], |b| self.doc.text(b));
                if let Some((start, end)) = self.pages.page_range(self.page) {
                    frame.paragraph(0, BODY_ROWS, text.get(start..end).unwrap_or(&[]))?;
                }
                let mut hint: String<48> = String::new();
                let _ = write!(
                    hint,
                    "{}/{}  l links  f form  b mark",
                    self.page + 1,
                    self.pages.page_count().max(1)
                );
                frame.hint(&hint)?;
            }
            WebMode::LinkSelect => {
                frame.row(0, "Links", true)?;
                let window = self.cursor.visible(self.doc.links.len(), BODY_ROWS - LIST_TOP);
                for (line_no, i) in window.enumerate() {
                    let Some(link) = self.doc.links.get(i) else { break };
                    let mut line: String<64> = String::new();
                    let _ = write!(line, "[{}] {}", i + 1, link.text);
                    frame.row(LIST_TOP + line_no, &line, i == self.cursor.index)?;
                }
                frame.hint("Enter follow  q page")?;
            }
            WebMode::FormFill => {
                self.render_form(frame)?;
                return Ok(TYPING_REFRESH_MS);
            }
        }
        Ok(WEB_REFRESH_MS)
    }
}
