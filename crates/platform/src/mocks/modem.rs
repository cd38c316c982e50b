//! Simulated cellular modem answering the AT dialect the worker speaks.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::MockClock;
use crate::modem::{AtLine, AtPort, ModemPower};

/// A message sitting on the simulated SIM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimSms {
    /// SIM storage index.
    pub index: u16,
    /// Sender.
    pub phone: String,
    /// Body.
    pub body: String,
    /// Service-centre timestamp as the modem prints it.
    pub stamp: String,
}

#[derive(Debug)]
struct SimState {
    rail: bool,
    pwrkey_pulsed: bool,
    dtr_low: bool,
    open: bool,
    booted: bool,
    ignore_pings: u32,
    creg_polls_until_registered: u32,
    creg_stat: u8,
    operator: String,
    csq: u8,
    cclk: Option<String>,
    cclk_failures: u32,
    inbox: Vec<SimSms>,
    next_index: u16,
    sent: Vec<(String, String)>,
    fail_sends: bool,
    silent_sends: u32,
    commands: Vec<String>,
    pending_cmgs: Option<String>,
    line: Vec<u8>,
    out: VecDeque<String>,
    powered_off: bool,
}

/// Simulated modem: implements both [`ModemPower`] and [`AtPort`].
///
/// It boots once the rail is on and PWRKEY has been pulsed low, answers `AT`
/// only after the UART has been opened, and reports registration after a
/// configurable number of `+CREG?` polls.
#[derive(Debug, Clone)]
pub struct SimModem {
    state: Rc<RefCell<SimState>>,
    clock: Option<MockClock>,
}

impl SimModem {
    /// Registered-home modem with decent signal.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState {
                rail: false,
                pwrkey_pulsed: false,
                dtr_low: false,
                open: false,
                booted: false,
                ignore_pings: 0,
                creg_polls_until_registered: 0,
                creg_stat: 1,
                operator: "MeshTel".to_string(),
                csq: 21,
                cclk: Some("24/05/01,12:30:00+00".to_string()),
                cclk_failures: 0,
                inbox: Vec::new(),
                next_index: 1,
                sent: Vec::new(),
                fail_sends: false,
                silent_sends: 0,
                commands: Vec::new(),
                pending_cmgs: None,
                line: Vec::new(),
                out: VecDeque::new(),
                powered_off: false,
            })),
            clock: None,
        }
    }

    /// Advance `clock` by the timeout whenever a read times out.
    pub fn with_clock(mut self, clock: MockClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Drop the first `n` `AT` pings.
    pub fn ignore_pings(&self, n: u32) {
        self.state.borrow_mut().ignore_pings = n;
    }

    /// Report "searching" for `polls` `+CREG?` queries, then `stat`.
    pub fn register_after(&self, polls: u32, stat: u8) {
        let mut s = self.state.borrow_mut();
        s.creg_polls_until_registered = polls;
        s.creg_stat = stat;
    }

    /// Set the reported signal quality.
    pub fn set_csq(&self, csq: u8) {
        self.state.borrow_mut().csq = csq;
    }

    /// Answer `+CCLK?` with `ERROR` `n` times first.
    pub fn fail_cclk(&self, n: u32) {
        self.state.borrow_mut().cclk_failures = n;
    }

    /// Make `AT+CMGS` fail.
    pub fn fail_sends(&self, fail: bool) {
        self.state.borrow_mut().fail_sends = fail;
    }

    /// Swallow the next `n` message bodies without any result line.
    pub fn drop_sends(&self, n: u32) {
        self.state.borrow_mut().silent_sends = n;
    }

    /// Deliver a message to the SIM.
    pub fn deliver(&self, phone: &str, body: &str) {
        let mut s = self.state.borrow_mut();
        let index = s.next_index;
        s.next_index += 1;
        s.inbox.push(SimSms {
            index,
            phone: phone.to_string(),
            body: body.to_string(),
            stamp: "24/05/01,12:31:00+00".to_string(),
        });
    }

    /// Messages still on the SIM.
    pub fn inbox(&self) -> Vec<SimSms> {
        self.state.borrow().inbox.clone()
    }

    /// `(phone, body)` of every successful `AT+CMGS`.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.state.borrow().sent.clone()
    }

    /// Every command line received.
    pub fn commands(&self) -> Vec<String> {
        self.state.borrow().commands.clone()
    }

    /// `true` while the supply rail is enabled.
    pub fn rail_on(&self) -> bool {
        self.state.borrow().rail
    }

    /// `true` after `AT+CPOF`.
    pub fn powered_off(&self) -> bool {
        self.state.borrow().powered_off
    }

    /// `true` while DTR is held low.
    pub fn dtr_low(&self) -> bool {
        self.state.borrow().dtr_low
    }
}

impl Default for SimModem {
    fn default() -> Self {
        Self::new()
    }
}

impl SimState {
    fn ok(&mut self) {
        self.out.push_back("OK".to_string());
    }

    fn command(&mut self, cmd: &str) {
        self.commands.push(cmd.to_string());
        if !self.booted || !self.open || self.powered_off {
            return;
        }
        match cmd {
            "AT" => {
                if self.ignore_pings > 0 {
                    self.ignore_pings -= 1;
                } else {
                    self.ok();
                }
            }
            "ATE0" | "AT+CMGF=1" | "AT+CSCS=\"GSM\"" | "AT+CNMI=2,1,0,0,0" | "AT+CTZU=1" => {
                self.ok();
            }
            "AT+CREG?" => {
                let stat = if self.creg_polls_until_registered > 0 {
                    self.creg_polls_until_registered -= 1;
                    2
                } else {
                    self.creg_stat
                };
                self.out.push_back(format!("+CREG: 0,{stat}"));
                self.ok();
            }
            "AT+COPS?" => {
                self.out.push_back(format!("+COPS: 0,0,\"{}\",7", self.operator));
                self.ok();
            }
            "AT+CSQ" => {
                self.out.push_back(format!("+CSQ: {},99", self.csq));
                self.ok();
            }
            "AT+CCLK?" => {
                if self.cclk_failures > 0 {
                    self.cclk_failures -= 1;
                    self.out.push_back("ERROR".to_string());
                } else if let Some(stamp) = self.cclk.clone() {
                    self.out.push_back(format!("+CCLK: \"{stamp}\""));
                    self.ok();
                } else {
                    self.out.push_back("ERROR".to_string());
                }
            }
            "AT+CMGL=\"REC UNREAD\"" => {
                let msgs = self.inbox.clone();
                for m in msgs {
                    self.out.push_back(format!(
                        "+CMGL: {},\"REC UNREAD\",\"{}\",\"\",\"{}\"",
                        m.index, m.phone, m.stamp
                    ));
                    self.out.push_back(m.body.clone());
                }
                self.ok();
            }
            "AT+CMGD=1,4" => {
                self.inbox.clear();
                self.ok();
            }
            "AT+CPOF" => {
                self.ok();
                self.powered_off = true;
            }
            _ => {
                if let Some(idx) = cmd.strip_prefix("AT+CMGD=") {
                    if let Ok(idx) = idx.parse::<u16>() {
                        self.inbox.retain(|m| m.index != idx);
                    }
                    self.ok();
                } else if let Some(rest) = cmd.strip_prefix("AT+CMGS=\"") {
                    let phone = rest.trim_end_matches('"').to_string();
                    self.pending_cmgs = Some(phone);
                    self.out.push_back("> ".to_string());
                } else {
                    self.out.push_back("ERROR".to_string());
                }
            }
        }
    }

    fn byte(&mut self, b: u8) {
        if self.pending_cmgs.is_some() {
            match b {
                0x1A => {
                    let phone = self.pending_cmgs.take().unwrap_or_default();
                    let body = String::from_utf8_lossy(&self.line).into_owned();
                    self.line.clear();
                    if self.silent_sends > 0 {
                        self.silent_sends -= 1;
                    } else if self.fail_sends {
                        self.out.push_back("+CMS ERROR: 500".to_string());
                    } else {
                        self.sent.push((phone, body));
                        self.out.push_back(format!("+CMGS: {}", self.sent.len()));
                        self.ok();
                    }
                }
                0x1B => {
                    self.pending_cmgs = None;
                    self.line.clear();
                }
                _ => self.line.push(b),
            }
            return;
        }
        match b {
            b'\r' => {
                let cmd = String::from_utf8_lossy(&self.line).trim().to_string();
                self.line.clear();
                if !cmd.is_empty() {
                    self.command(&cmd);
                }
            }
            b'\n' => {}
            _ => self.line.push(b),
        }
    }
}

impl ModemPower for SimModem {
    fn set_rail(&mut self, on: bool) {
        let mut s = self.state.borrow_mut();
        s.rail = on;
        if !on {
            s.booted = false;
            s.pwrkey_pulsed = false;
            s.powered_off = false;
        }
    }

    fn set_reset(&mut self, _high: bool) {}

    fn set_pwrkey(&mut self, high: bool) {
        let mut s = self.state.borrow_mut();
        if !high && s.rail {
            s.pwrkey_pulsed = true;
        }
        if high && s.pwrkey_pulsed {
            s.booted = true;
        }
    }

    fn set_dtr(&mut self, high: bool) {
        self.state.borrow_mut().dtr_low = !high;
    }
}

/// The simulator never fails at the transport level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPortError;

impl AtPort for SimModem {
    type Error = SimPortError;

    async fn open(&mut self) -> Result<(), SimPortError> {
        self.state.borrow_mut().open = true;
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), SimPortError> {
        let mut s = self.state.borrow_mut();
        for b in data {
            s.byte(*b);
        }
        Ok(())
    }

    async fn read_line(&mut self, line: &mut AtLine, timeout_ms: u32) -> Result<bool, SimPortError> {
        let next = self.state.borrow_mut().out.pop_front();
        match next {
            Some(text) => {
                line.clear();
                for ch in text.chars() {
                    if line.push(ch).is_err() {
                        break;
                    }
                }
                Ok(true)
            }
            None => {
                if let Some(clock) = &self.clock {
                    clock.advance(u64::from(timeout_ms));
                }
                Ok(false)
            }
        }
    }

    fn close(&mut self) {
        self.state.borrow_mut().open = false;
    }
}
