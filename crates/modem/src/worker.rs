//! Modem worker state machine.
//!
//! ```text
//! Off -> PoweringOn -> Initializing -> Registering -> Ready
//!             \              \              \          |
//!              +--------------+--------------+--> Error (30 s) -> Off
//! ```
//!
//! [`ModemWorker::step`] runs one state's work and returns the new state;
//! [`ModemWorker::run`] loops over it until a shutdown is requested.

use core::fmt::Write as _;

use embedded_hal_async::delay::DelayNs;
use heapless::{String, Vec};
use platform::clock::WallClock;
use platform::modem::{AtLine, AtPort, ModemPower};
use platform::Clock;

use crate::at::{self, Line};
use crate::error::transport;
use crate::queue::{IncomingSms, OutgoingSms, RECV_QUEUE_DEPTH};
use crate::{AtError, ModemState, ModemStatus, SmsQueues};

/// Reset pulse width.
pub const RESET_PULSE_MS: u32 = 200;
/// PWRKEY low time.
pub const PWRKEY_PULSE_MS: u32 = 1_500;
/// Boot wait after PWRKEY.
pub const BOOT_WAIT_MS: u32 = 5_000;
/// `AT` pings before giving up.
pub const PING_ATTEMPTS: u32 = 10;
/// Registration window.
pub const REGISTRATION_TIMEOUT_MS: u64 = 60_000;
/// Pause between `+CREG?` polls.
pub const REGISTRATION_POLL_MS: u32 = 2_000;
/// `+CCLK?` attempts.
pub const CLOCK_SYNC_ATTEMPTS: u32 = 5;
/// Main loop period.
pub const CYCLE_MS: u32 = 500;
/// Inbox poll period.
pub const SMS_POLL_MS: u64 = 10_000;
/// Signal poll period.
pub const CSQ_POLL_MS: u64 = 30_000;
/// Time in Error before the power cycle.
pub const ERROR_RESTART_MS: u64 = 30_000;
/// Typical command timeout.
pub const COMMAND_TIMEOUT_MS: u32 = 2_000;
/// Wait for the `> ` prompt.
pub const PROMPT_TIMEOUT_MS: u32 = 5_000;
/// `AT+CMGL` listing timeout.
pub const POLL_TIMEOUT_MS: u32 = 5_000;
/// `AT+CMGS` result timeout.
pub const SEND_TIMEOUT_MS: u32 = 30_000;

const CTRL_Z: u8 = 0x1A;
const ESC: u8 = 0x1B;

const INIT_SEQUENCE: [&str; 5] = [
    "ATE0",
    "AT+CMGF=1",
    "AT+CSCS=\"GSM\"",
    "AT+CNMI=2,1,0,0,0",
    "AT+CTZU=1",
];

type Command = String<48>;

struct Pending {
    index: u16,
    sms: IncomingSms,
}

/// Drives one modem through power-up, registration and SMS service.
pub struct ModemWorker<'a, P, U, D, C> {
    power: P,
    port: U,
    delay: D,
    clock: C,
    status: &'a ModemStatus,
    queues: &'a SmsQueues,
    wall: &'a WallClock,
    line: AtLine,
    error_since_ms: u64,
    last_sms_poll_ms: Option<u64>,
    last_csq_ms: Option<u64>,
    new_message: bool,
}

impl<'a, P, U, D, C> ModemWorker<'a, P, U, D, C>
where
    P: ModemPower,
    U: AtPort,
    D: DelayNs,
    C: Clock,
{
    /// Worker over the given control lines and UART.
    pub fn new(
        power: P,
        port: U,
        delay: D,
        clock: C,
        status: &'a ModemStatus,
        queues: &'a SmsQueues,
        wall: &'a WallClock,
    ) -> Self {
        Self {
            power,
            port,
            delay,
            clock,
            status,
            queues,
            wall,
            line: AtLine::new(),
            error_since_ms: 0,
            last_sms_poll_ms: None,
            last_csq_ms: None,
            new_message: false,
        }
    }

    /// Loop until [`ModemStatus::request_shutdown`], then power down.
    pub async fn run(&mut self) {
        loop {
            if self.status.take_shutdown() {
                self.shutdown().await;
                return;
            }
            self.step().await;
        }
    }

    /// Do one state's worth of work.
    pub async fn step(&mut self) -> ModemState {
        let next = match self.status.state() {
            ModemState::Off
            | ModemState::PoweringOn
            | ModemState::Initializing
            | ModemState::Registering => match self.bring_up().await {
                Ok(()) => ModemState::Ready,
                Err(e) => self.fail(e),
            },
            ModemState::Ready => match self.cycle().await {
                Ok(()) => {
                    self.delay.delay_ms(CYCLE_MS).await;
                    ModemState::Ready
                }
                Err(e) => self.fail(e),
            },
            ModemState::Error => {
                if self.clock.since(self.error_since_ms) >= ERROR_RESTART_MS {
                    tracing::info!("modem: restarting after error");
                    self.cut_power();
                    ModemState::Off
                } else {
                    self.delay.delay_ms(CYCLE_MS).await;
                    ModemState::Error
                }
            }
        };
        self.status.set_state(next);
        next
    }

    fn fail(&mut self, err: AtError) -> ModemState {
        tracing::warn!("modem: {} in {}", err, self.status.state().label());
        self.error_since_ms = self.clock.now_ms();
        ModemState::Error
    }

    fn cut_power(&mut self) {
        self.port.close();
        self.power.set_dtr(true);
        self.power.set_rail(false);
        self.status.reset();
    }

    /// `AT+CPOF`, cut the rail, close the UART.
    pub async fn shutdown(&mut self) {
        if self.status.state() != ModemState::Off {
            if let Err(e) = self.command("AT+CPOF", COMMAND_TIMEOUT_MS, |_| {}).await {
                tracing::warn!("modem: power-off command failed: {}", e);
            }
        }
        self.cut_power();
        self.status.set_state(ModemState::Off);
    }

    async fn bring_up(&mut self) -> Result<(), AtError> {
        self.status.set_state(ModemState::PoweringOn);
        self.power_on().await?;
        self.status.set_state(ModemState::Initializing);
        for cmd in INIT_SEQUENCE {
            self.command(cmd, COMMAND_TIMEOUT_MS, |_| {}).await?;
        }
        self.status.set_state(ModemState::Registering);
        self.register().await?;
        self.read_operator().await;
        self.sync_time().await;
        self.command("AT+CMGD=1,4", COMMAND_TIMEOUT_MS, |_| {}).await?;
        self.poll_csq().await?;
        self.last_sms_poll_ms = None;
        Ok(())
    }

    async fn power_on(&mut self) -> Result<(), AtError> {
        self.power.set_rail(true);
        self.power.set_reset(false);
        self.delay.delay_ms(RESET_PULSE_MS).await;
        self.power.set_reset(true);
        self.power.set_pwrkey(false);
        self.delay.delay_ms(PWRKEY_PULSE_MS).await;
        self.power.set_pwrkey(true);
        self.delay.delay_ms(BOOT_WAIT_MS).await;
        self.power.set_dtr(false);
        self.port.open().await.map_err(transport)?;

        for attempt in 1..=PING_ATTEMPTS {
            match self.command("AT", 1_000, |_| {}).await {
                Ok(()) => {
                    tracing::debug!("modem: AT answered on attempt {}", attempt);
                    return Ok(());
                }
                Err(AtError::Timeout) => self.delay.delay_ms(CYCLE_MS).await,
                Err(e) => return Err(e),
            }
        }
        Err(AtError::Timeout)
    }

    async fn register(&mut self) -> Result<(), AtError> {
        let start = self.clock.now_ms();
        loop {
            let mut stat = None;
            self.command("AT+CREG?", COMMAND_TIMEOUT_MS, |l| {
                stat = stat.or(at::parse_creg(l));
            })
            .await?;
            if stat.is_some_and(at::is_registered) {
                tracing::info!("modem: registered (stat {})", stat.unwrap_or(0));
                return Ok(());
            }
            if self.clock.since(start) >= REGISTRATION_TIMEOUT_MS {
                return Err(AtError::NotRegistered);
            }
            self.delay.delay_ms(REGISTRATION_POLL_MS).await;
        }
    }

    async fn read_operator(&mut self) {
        let mut name: String<{ crate::status::MAX_OPERATOR }> = String::new();
        let res = self
            .command("AT+COPS?", COMMAND_TIMEOUT_MS, |l| {
                if let Some(op) = at::parse_cops(l) {
                    name.clear();
                    for c in op.chars() {
                        if name.push(c).is_err() {
                            break;
                        }
                    }
                }
            })
            .await;
        match res {
            Ok(()) => self.status.set_operator(&name),
            Err(e) => tracing::warn!("modem: operator query failed: {}", e),
        }
    }

    async fn sync_time(&mut self) {
        for _ in 0..CLOCK_SYNC_ATTEMPTS {
            let mut epoch = None;
            let res = self
                .command("AT+CCLK?", COMMAND_TIMEOUT_MS, |l| {
                    epoch = epoch.or(at::parse_cclk(l));
                })
                .await;
            if let (Ok(()), Some(epoch)) = (res, epoch) {
                self.wall.sync(epoch, self.clock.now_ms());
                tracing::info!("modem: wall clock set to {}", epoch);
                return;
            }
            self.delay.delay_ms(1_000).await;
        }
        tracing::warn!("modem: network time unavailable");
    }

    /// One main-loop pass: one outgoing SMS, then the periodic polls.
    async fn cycle(&mut self) -> Result<(), AtError> {
        if let Some(msg) = self.queues.next_outgoing() {
            match self.send(&msg).await {
                Ok(()) => tracing::info!("modem: SMS sent to {}", msg.phone.as_str()),
                Err(AtError::Timeout) => {
                    self.queues.requeue(msg);
                    return Err(AtError::Timeout);
                }
                Err(AtError::NoPrompt) => {
                    tracing::warn!("modem: no prompt for SMS to {}", msg.phone.as_str());
                    self.queues.requeue(msg);
                }
                Err(e) => tracing::warn!("modem: SMS to {} failed: {}", msg.phone.as_str(), e),
            }
        }
        let now = self.clock.now_ms();
        let sms_due = self
            .last_sms_poll_ms
            .map_or(true, |t| now.saturating_sub(t) >= SMS_POLL_MS);
        if sms_due || self.new_message {
            self.new_message = false;
            self.poll_inbox().await?;
            self.last_sms_poll_ms = Some(now);
        }
        let csq_due = self
            .last_csq_ms
            .map_or(true, |t| now.saturating_sub(t) >= CSQ_POLL_MS);
        if csq_due {
            self.poll_csq().await?;
        }
        Ok(())
    }

    async fn poll_csq(&mut self) -> Result<(), AtError> {
        let mut csq = None;
        self.command("AT+CSQ", COMMAND_TIMEOUT_MS, |l| csq = csq.or(at::parse_csq(l)))
            .await?;
        if let Some(csq) = csq {
            self.status.set_csq(csq);
        }
        self.last_csq_ms = Some(self.clock.now_ms());
        Ok(())
    }

    async fn send(&mut self, msg: &OutgoingSms) -> Result<(), AtError> {
        let mut cmd = Command::new();
        write!(cmd, "AT+CMGS=\"{}\"\r", msg.phone.as_str()).map_err(|_| AtError::TooLong)?;
        self.port.write(cmd.as_bytes()).await.map_err(transport)?;
        loop {
            let got = self
                .port
                .read_line(&mut self.line, PROMPT_TIMEOUT_MS)
                .await
                .map_err(transport)?;
            if !got {
                self.port.write(&[ESC]).await.map_err(transport)?;
                return Err(AtError::NoPrompt);
            }
            match at::classify(&self.line) {
                Line::Prompt => break,
                Line::Error => return Err(AtError::Rejected),
                Line::CmsError(code) => return Err(AtError::Cms(code)),
                Line::NewMessage => self.new_message = true,
                Line::Ok | Line::Info(_) => {}
            }
        }
        self.port.write(msg.body.as_bytes()).await.map_err(transport)?;
        self.port.write(&[CTRL_Z]).await.map_err(transport)?;
        self.finish(SEND_TIMEOUT_MS, |_| {}).await
    }

    async fn poll_inbox(&mut self) -> Result<(), AtError> {
        let mut pending: Vec<Pending, RECV_QUEUE_DEPTH> = Vec::new();
        let mut header: Option<(u16, store::sms::Phone, u32)> = None;
        self.command("AT+CMGL=\"REC UNREAD\"", POLL_TIMEOUT_MS, |l| {
            if let Some(h) = at::parse_cmgl(l) {
                header = Some((
                    h.index,
                    store::sms::normalize_phone(h.phone),
                    h.timestamp.unwrap_or(0),
                ));
            } else if let Some((index, phone, ts)) = header.take() {
                if pending
                    .push(Pending {
                        index,
                        sms: IncomingSms::new(&phone, l, ts),
                    })
                    .is_err()
                {
                    tracing::debug!("modem: more unread messages than one poll takes");
                }
            }
        })
        .await?;

        for p in pending {
            let index = p.index;
            if let Err(dropped) = self.queues.deliver(p.sms) {
                // Left on the SIM; the next poll picks it up again.
                tracing::warn!("modem: receive queue full, kept {} on SIM", dropped.phone.as_str());
                break;
            }
            let mut cmd = Command::new();
            write!(cmd, "AT+CMGD={index}").map_err(|_| AtError::TooLong)?;
            self.command(&cmd, COMMAND_TIMEOUT_MS, |_| {}).await?;
            tracing::info!("modem: SMS received (SIM slot {})", index);
        }
        Ok(())
    }

    /// Send `cmd` and collect information lines until a final result code.
    async fn command<F>(&mut self, cmd: &str, timeout_ms: u32, on_info: F) -> Result<(), AtError>
    where
        F: FnMut(&str),
    {
        let mut buf = Command::new();
        buf.push_str(cmd).map_err(|_| AtError::TooLong)?;
        buf.push('\r').map_err(|_| AtError::TooLong)?;
        self.port.write(buf.as_bytes()).await.map_err(transport)?;
        self.finish(timeout_ms, on_info).await
    }

    async fn finish<F>(&mut self, timeout_ms: u32, mut on_info: F) -> Result<(), AtError>
    where
        F: FnMut(&str),
    {
        loop {
            if !self
                .port
                .read_line(&mut self.line, timeout_ms)
                .await
                .map_err(transport)?
            {
                return Err(AtError::Timeout);
            }
            match at::classify(&self.line) {
                Line::Ok => return Ok(()),
                Line::Error => return Err(AtError::Rejected),
                Line::CmsError(code) => return Err(AtError::Cms(code)),
                Line::NewMessage => self.new_message = true,
                Line::Prompt => {}
                Line::Info(text) => on_info(text),
            }
        }
    }
}
