//! SMS: inbox, conversation view, compose and the contact list.
//!
//! Messages go out through [`modem::SMS_QUEUES`]; the runtime drains the
//! receive queue and calls [`Sms::invalidate`] so the inbox re-reads the
//! card the next time it is shown.

use core::fmt::Write as _;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::DrawTarget;
use heapless::{String, Vec};
use platform::config::TEXT_COLUMNS;
use store::contacts::{Contacts, MAX_CONTACT_NAME};
use store::sms::{
    self, normalize_phone, Conversation, Direction, Phone, SmsRecord, MAX_BODY, MAX_CONVERSATIONS,
    MAX_PHONE,
};
use text::lines;
use ui::keys::{is_back, KEY_ENTER};
use ui::screen::SmsMode;

use super::{Context, FieldEvent, ListCursor, Outcome, Screen, TextField, View};
use crate::board::Board;
use crate::error::AppError;
use crate::render::{Frame, BODY_ROWS};

/// Messages kept in memory for the conversation view.
pub const THREAD_DEPTH: usize = 16;

/// Redraw period of the message views.
pub const SMS_REFRESH_MS: u32 = 10_000;

/// Redraw period while typing.
pub const COMPOSE_REFRESH_MS: u32 = 700;

const LIST_TOP: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContactStep {
    Browse,
    Name,
    Phone,
}

/// SMS screen.
pub struct Sms {
    mode: SmsMode,
    inbox: Vec<Conversation, MAX_CONVERSATIONS>,
    loaded: bool,
    cursor: ListCursor,
    peer: Phone,
    thread: Vec<SmsRecord, THREAD_DEPTH>,
    recipient: TextField<MAX_PHONE>,
    body: TextField<MAX_BODY>,
    contact_name: TextField<MAX_CONTACT_NAME>,
    contact_step: ContactStep,
    contact_cursor: ListCursor,
}

impl Default for Sms {
    fn default() -> Self {
        Self::new()
    }
}

impl Sms {
    /// Screen that reads the inbox on first poll.
    pub fn new() -> Self {
        Self {
            mode: SmsMode::Inbox,
            inbox: Vec::new(),
            loaded: false,
            cursor: ListCursor::default(),
            peer: Phone::new(),
            thread: Vec::new(),
            recipient: TextField::new(),
            body: TextField::new(),
            contact_name: TextField::new(),
            contact_step: ContactStep::Browse,
            contact_cursor: ListCursor::default(),
        }
    }

    /// Current sub-mode.
    pub fn mode(&self) -> SmsMode {
        self.mode
    }

    /// Conversations, newest first.
    pub fn inbox(&self) -> &[Conversation] {
        &self.inbox
    }

    /// Messages of the open conversation, oldest first.
    pub fn thread(&self) -> &[SmsRecord] {
        &self.thread
    }

    /// The card changed underneath: re-read on the next poll.
    pub fn invalidate(&mut self) {
        self.loaded = false;
    }

    async fn reload<B: Board>(&mut self, cx: &mut Context<B>) -> Result<(), AppError> {
        self.inbox = sms::list_conversations(&mut cx.sd).await?;
        self.cursor.clamp(self.inbox.len());
        if self.mode == SmsMode::Conversation {
            sms::load_conversation(&mut cx.sd, &self.peer, &mut self.thread).await?;
        }
        self.loaded = true;
        Ok(())
    }

    async fn open_thread<B: Board>(&mut self, cx: &mut Context<B>, phone: &str) -> Result<(), AppError> {
        self.peer = normalize_phone(phone);
        sms::load_conversation(&mut cx.sd, &self.peer, &mut self.thread).await?;
        self.mode = SmsMode::Conversation;
        Ok(())
    }

    fn start_compose(&mut self, phone: &str) {
        self.peer = normalize_phone(phone);
        self.body.clear();
        self.mode = SmsMode::Compose;
    }

    async fn send<B: Board>(&mut self, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        if self.body.is_empty() {
            return Ok(Outcome::Handled);
        }
        if !(cx.has_modem && cx.modem_enabled) {
            cx.say("Modem is off");
            return Ok(Outcome::Handled);
        }
        if cx.shared.queues.outbox_full() {
            cx.say("Send queue full");
            return Ok(Outcome::Handled);
        }
        let now = cx.now();
        let timestamp = cx.shared.wall.epoch_at(now).unwrap_or(0);
        let record = SmsRecord::new(timestamp, Direction::Sent, &self.peer, self.body.as_str());
        // Stored before the modem sees it.
        sms::append(&mut cx.sd, &record).await?;
        if !cx.shared.queues.send_sms(&self.peer, self.body.as_str()) {
            cx.say("Send queue full");
            return Ok(Outcome::Handled);
        }
        tracing::info!("sms: queued {} chars to {}", self.body.as_str().len(), self.peer.as_str());
        self.body.clear();
        let peer = self.peer.clone();
        self.open_thread(cx, &peer).await?;
        self.loaded = false;
        Ok(Outcome::Handled)
    }

    async fn inbox_key<B: Board>(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        if self.cursor.handle(key, self.inbox.len()) {
            return Ok(Outcome::Handled);
        }
        if is_back(key) {
            return Ok(Outcome::Back);
        }
        match key {
            KEY_ENTER => {
                let Some(phone) = self.inbox.get(self.cursor.index).map(|c| c.phone.clone()) else {
                    return Ok(Outcome::Ignored);
                };
                self.open_thread(cx, &phone).await?;
                Ok(Outcome::Handled)
            }
            b'n' | b'N' => {
                self.recipient.clear();
                self.mode = SmsMode::NewRecipient;
                Ok(Outcome::Handled)
            }
            b'c' | b'C' => {
                self.contact_step = ContactStep::Browse;
                self.contact_cursor.reset();
                self.mode = SmsMode::Contacts;
                Ok(Outcome::Handled)
            }
            b'x' | b'X' => {
                let Some(phone) = self.inbox.get(self.cursor.index).map(|c| c.phone.clone()) else {
                    return Ok(Outcome::Ignored);
                };
                sms::delete_conversation(&mut cx.sd, &phone).await?;
                tracing::info!("sms: deleted conversation {}", phone.as_str());
                self.reload(cx).await?;
                cx.say("Conversation deleted");
                Ok(Outcome::Handled)
            }
            _ => Ok(Outcome::Ignored),
        }
    }

    async fn contacts_key<B: Board>(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        match self.contact_step {
            ContactStep::Browse => {
                let len = cx.contacts.len();
                if self.contact_cursor.handle(key, len) {
                    return Ok(Outcome::Handled);
                }
                if is_back(key) {
                    self.mode = SmsMode::Inbox;
                    return Ok(Outcome::Handled);
                }
                match key {
                    KEY_ENTER => {
                        let Some(phone) = cx
                            .contacts
                            .entries()
                            .get(self.contact_cursor.index)
                            .map(|c| c.phone.clone())
                        else {
                            return Ok(Outcome::Ignored);
                        };
                        self.start_compose(&phone);
                        Ok(Outcome::Handled)
                    }
                    b'a' | b'A' => {
                        self.contact_name.clear();
                        self.recipient.clear();
                        self.contact_step = ContactStep::Name;
                        Ok(Outcome::Handled)
                    }
                    b'x' | b'X' => {
                        if cx.contacts.remove(self.contact_cursor.index).is_some() {
                            cx.contacts.save(&mut cx.sd).await?;
                            self.contact_cursor.clamp(cx.contacts.len());
                            cx.say("Contact removed");
                        }
                        Ok(Outcome::Handled)
                    }
                    _ => Ok(Outcome::Ignored),
                }
            }
            ContactStep::Name => match self.contact_name.handle(key) {
                FieldEvent::None => Ok(Outcome::Ignored),
                FieldEvent::Changed => Ok(Outcome::Handled),
                FieldEvent::Cancel => {
                    self.contact_step = ContactStep::Browse;
                    Ok(Outcome::Handled)
                }
                FieldEvent::Submit => {
                    if !self.contact_name.is_empty() {
                        self.contact_step = ContactStep::Phone;
                    }
                    Ok(Outcome::Handled)
                }
            },
            ContactStep::Phone => match self.recipient.handle(key) {
                FieldEvent::None => Ok(Outcome::Ignored),
                FieldEvent::Changed => Ok(Outcome::Handled),
                FieldEvent::Cancel => {
                    self.contact_step = ContactStep::Name;
                    Ok(Outcome::Handled)
                }
                FieldEvent::Submit => {
                    self.contact_step = ContactStep::Browse;
                    cx.contacts
                        .upsert(self.contact_name.as_str(), self.recipient.as_str())?;
                    cx.contacts.save(&mut cx.sd).await?;
                    cx.say("Contact saved");
                    Ok(Outcome::Handled)
                }
            },
        }
    }

    fn render_inbox<D>(&mut self, frame: &mut Frame<'_, D>, contacts: &Contacts) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        frame.text(0, 0, "Messages")?;
        if self.inbox.is_empty() {
            frame.text(0, LIST_TOP, "No messages.")?;
            frame.hint("n new  c contacts  q back")?;
            return Ok(());
        }
        let window = self.cursor.visible(self.inbox.len(), (BODY_ROWS - LIST_TOP) / 2);
        for (slot, i) in window.enumerate() {
            let Some(conv) = self.inbox.get(i) else { break };
            let who = contacts.name_for(&conv.phone).unwrap_or(&conv.phone);
            let mut head: String<48> = String::new();
            let _ = write!(head, "{} ({})", who, conv.count);
            let row = LIST_TOP + slot * 2;
            frame.row(row, &head, i == self.cursor.index)?;
            frame.text(1, row + 1, &conv.preview())?;
        }
        frame.hint("Enter open  n new  c contacts  x del")?;
        Ok(())
    }

    fn render_thread<D>(&mut self, frame: &mut Frame<'_, D>, who: &str) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        frame.row(0, who, true)?;
        let rows = BODY_ROWS - 1;
        // Newest messages at the bottom: walk back until the window is full.
        let mut used = 0usize;
        let mut first = self.thread.len();
        for (i, rec) in self.thread.iter().enumerate().rev() {
            let need = message_line(rec).map_or(1, |l| lines(l.as_bytes(), TEXT_COLUMNS).count().max(1));
            if used + need > rows {
                break;
            }
            used += need;
            first = i;
        }
        let mut row = 1 + rows - used;
        for rec in self.thread.iter().skip(first) {
            let Some(line) = message_line(rec) else { continue };
            let need = lines(line.as_bytes(), TEXT_COLUMNS).count().max(1);
            frame.paragraph(row, need, line.as_bytes())?;
            row += need;
        }
        frame.hint("Enter reply  q inbox")?;
        Ok(())
    }
}

fn message_line(rec: &SmsRecord) -> Option<String<{ MAX_BODY + 4 }>> {
    let mut line = String::new();
    write!(line, "{} {}", rec.direction.marker(), rec.body).ok()?;
    Some(line)
}

impl<B: Board> Screen<B> for Sms {
    async fn handle_input(&mut self, key: u8, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        match self.mode {
            SmsMode::Inbox => self.inbox_key(key, cx).await,
            SmsMode::Conversation => {
                if is_back(key) {
                    self.mode = SmsMode::Inbox;
                    return Ok(Outcome::Handled);
                }
                match key {
                    KEY_ENTER | b'r' | b'R' => {
                        let peer = self.peer.clone();
                        self.start_compose(&peer);
                        Ok(Outcome::Handled)
                    }
                    _ => Ok(Outcome::Ignored),
                }
            }
            SmsMode::NewRecipient => match self.recipient.handle(key) {
                FieldEvent::None => Ok(Outcome::Ignored),
                FieldEvent::Changed => Ok(Outcome::Handled),
                FieldEvent::Cancel => {
                    self.mode = SmsMode::Inbox;
                    Ok(Outcome::Handled)
                }
                FieldEvent::Submit => {
                    let phone = normalize_phone(self.recipient.as_str());
                    if phone.is_empty() {
                        cx.say("Enter a phone number");
                    } else {
                        self.start_compose(&phone);
                    }
                    Ok(Outcome::Handled)
                }
            },
            SmsMode::Compose => match self.body.handle(key) {
                FieldEvent::None => Ok(Outcome::Ignored),
                FieldEvent::Changed => Ok(Outcome::Handled),
                FieldEvent::Cancel => {
                    let peer = self.peer.clone();
                    self.open_thread(cx, &peer).await?;
                    Ok(Outcome::Handled)
                }
                FieldEvent::Submit => self.send(cx).await,
            },
            SmsMode::Contacts => self.contacts_key(key, cx).await,
        }
    }

    async fn poll(&mut self, cx: &mut Context<B>) -> Result<Outcome, AppError> {
        if self.loaded {
            return Ok(Outcome::Ignored);
        }
        self.reload(cx).await?;
        Ok(Outcome::Handled)
    }

    async fn leave(&mut self, _cx: &mut Context<B>) -> Result<(), AppError> {
        self.loaded = false;
        Ok(())
    }

    fn render<D>(&mut self, frame: &mut Frame<'_, D>, view: &View) -> Result<u32, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let peer = self.peer.clone();
        let who = view.contacts.name_for(&peer).unwrap_or(&peer);
        match self.mode {
            SmsMode::Inbox => {
                self.render_inbox(frame, &view.contacts)?;
                Ok(SMS_REFRESH_MS)
            }
            SmsMode::Conversation => {
                self.render_thread(frame, who)?;
                Ok(SMS_REFRESH_MS)
            }
            SmsMode::NewRecipient => {
                frame.text(0, 0, "New message")?;
                frame.text(0, LIST_TOP, "To (phone number):")?;
                frame.text(0, LIST_TOP + 1, &self.recipient.display())?;
                frame.hint("Enter next  Bksp on empty cancels")?;
                Ok(COMPOSE_REFRESH_MS)
            }
            SmsMode::Compose => {
                let mut head: String<48> = String::new();
                let _ = write!(head, "To {}", who);
                frame.row(0, &head, true)?;
                let mut text: String<{ MAX_BODY + 1 }> = String::new();
                let _ = write!(text, "{}_", self.body.as_str());
                frame.paragraph(LIST_TOP, BODY_ROWS - LIST_TOP - 1, text.as_bytes())?;
                let mut count: String<16> = String::new();
                let _ = write!(count, "{}/{}", self.body.as_str().len(), MAX_BODY);
                frame.text(0, BODY_ROWS - 1, &count)?;
                frame.hint("Enter send  Bksp on empty cancels")?;
                Ok(COMPOSE_REFRESH_MS)
            }
            SmsMode::Contacts => {
                frame.text(0, 0, "Contacts")?;
                match self.contact_step {
                    ContactStep::Browse => {
                        if view.contacts.is_empty() {
                            frame.text(0, LIST_TOP, "No contacts.")?;
                        }
                        let entries = view.contacts.entries();
                        let window = self.contact_cursor.visible(entries.len(), BODY_ROWS - LIST_TOP);
                        for (line_no, i) in window.enumerate() {
                            let Some(contact) = entries.get(i) else { break };
                            let mut line: String<64> = String::new();
                            let _ = write!(line, "{} {}", contact.name, contact.phone);
                            frame.row(LIST_TOP + line_no, &line, i == self.contact_cursor.index)?;
                        }
                        frame.hint("Enter write  a add  x remove  q back")?;
                    }
                    ContactStep::Name => {
                        frame.text(0, LIST_TOP, "Name:")?;
                        frame.text(0, LIST_TOP + 1, &self.contact_name.display())?;
                        frame.hint("Enter next")?;
                    }
                    ContactStep::Phone => {
                        frame.text(0, LIST_TOP, "Name:")?;
                        frame.text(0, LIST_TOP + 1, self.contact_name.as_str())?;
                        frame.text(0, LIST_TOP + 3, "Phone:")?;
                        frame.text(0, LIST_TOP + 4, &self.recipient.display())?;
                        frame.hint("Enter save")?;
                    }
                }
                Ok(COMPOSE_REFRESH_MS)
            }
        }
    }
}
