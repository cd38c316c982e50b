//! Mock mesh radio, fuel gauge, sleep controller, core clock and GNSS.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::power::{CpuClock, DeepSleep, Gnss, PowerMonitor, SleepPlan};
use crate::radio::{MeshEvent, MeshRadio, RadioParams};

#[derive(Debug, Default)]
struct RadioState {
    tx_pending: bool,
    applied: Vec<RadioParams>,
    events: VecDeque<MeshEvent>,
    pumps: usize,
    fail_apply: bool,
}

/// Mesh radio whose transmit-pending flag is set by the test.
#[derive(Debug, Clone)]
pub struct MockRadio {
    state: Rc<RefCell<RadioState>>,
    max_tx_dbm: i8,
}

impl MockRadio {
    /// Radio with the given board TX ceiling.
    pub fn new(max_tx_dbm: i8) -> Self {
        Self {
            state: Rc::default(),
            max_tx_dbm,
        }
    }

    /// Simulate a queued transmit.
    pub fn set_tx_pending(&self, pending: bool) {
        self.state.borrow_mut().tx_pending = pending;
    }

    /// Queue an event for the next pump.
    pub fn push_event(&self, event: MeshEvent) {
        self.state.borrow_mut().events.push_back(event);
    }

    /// Every parameter set passed to `apply`.
    pub fn applied(&self) -> Vec<RadioParams> {
        self.state.borrow().applied.clone()
    }

    /// Number of pumps.
    pub fn pumps(&self) -> usize {
        self.state.borrow().pumps
    }

    /// Make `apply` fail.
    pub fn fail_apply(&self, fail: bool) {
        self.state.borrow_mut().fail_apply = fail;
    }
}

/// Error of [`MockRadio::apply`] when armed to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioFault;

impl MeshRadio for MockRadio {
    type Error = RadioFault;

    async fn pump(&mut self) -> Result<Option<MeshEvent>, RadioFault> {
        let mut s = self.state.borrow_mut();
        s.pumps += 1;
        Ok(s.events.pop_front())
    }

    fn tx_pending(&self) -> bool {
        self.state.borrow().tx_pending
    }

    async fn apply(&mut self, params: &RadioParams) -> Result<(), RadioFault> {
        let mut s = self.state.borrow_mut();
        if s.fail_apply {
            return Err(RadioFault);
        }
        s.applied.push(*params);
        Ok(())
    }

    fn max_tx_dbm(&self) -> i8 {
        self.max_tx_dbm
    }
}

/// Fixed-reading fuel gauge.
#[derive(Debug, Clone, Copy)]
pub struct MockGauge {
    /// Reported percentage.
    pub percent: Option<u8>,
    /// Reported voltage.
    pub millivolts: Option<u16>,
    /// Charging flag.
    pub charging: bool,
    /// Configured design capacity.
    pub design_mah: u16,
}

impl Default for MockGauge {
    fn default() -> Self {
        Self {
            percent: Some(80),
            millivolts: Some(3_950),
            charging: false,
            design_mah: 1_400,
        }
    }
}

impl PowerMonitor for MockGauge {
    fn battery_voltage(&self) -> Option<u16> {
        self.millivolts
    }

    fn battery_percentage(&self) -> Option<u8> {
        self.percent
    }

    fn is_charging(&self) -> bool {
        self.charging
    }

    fn design_capacity_mah(&self) -> u16 {
        self.design_mah
    }
}

/// Records sleep plans instead of sleeping.
#[derive(Debug, Clone, Default)]
pub struct MockSleep {
    plans: Rc<RefCell<Vec<SleepPlan>>>,
}

impl MockSleep {
    /// Plans passed to `enter`.
    pub fn plans(&self) -> Vec<SleepPlan> {
        self.plans.borrow().clone()
    }
}

impl DeepSleep for MockSleep {
    fn enter(&mut self, plan: &SleepPlan) {
        self.plans.borrow_mut().push(*plan);
    }
}

/// Records every frequency switch.
#[derive(Debug, Clone, Default)]
pub struct MockCpu {
    switches: Rc<RefCell<Vec<u32>>>,
}

impl MockCpu {
    /// Frequencies set, in order.
    pub fn switches(&self) -> Vec<u32> {
        self.switches.borrow().clone()
    }
}

impl CpuClock for MockCpu {
    fn set_mhz(&mut self, mhz: u32) {
        self.switches.borrow_mut().push(mhz);
    }
}

#[derive(Debug, Default)]
struct GnssState {
    powered: bool,
    fix: bool,
    power_changes: usize,
}

/// Receiver whose fixes are injected by the test.
#[derive(Debug, Clone, Default)]
pub struct MockGnss {
    state: Rc<RefCell<GnssState>>,
}

impl MockGnss {
    /// Report a fix on the next poll.
    pub fn inject_fix(&self) {
        self.state.borrow_mut().fix = true;
    }

    /// Current power level.
    pub fn is_powered(&self) -> bool {
        self.state.borrow().powered
    }

    /// Number of `set_power` calls.
    pub fn power_changes(&self) -> usize {
        self.state.borrow().power_changes
    }
}

impl Gnss for MockGnss {
    fn set_power(&mut self, on: bool) {
        let mut s = self.state.borrow_mut();
        s.powered = on;
        s.power_changes += 1;
    }

    fn take_fix(&mut self) -> bool {
        let mut s = self.state.borrow_mut();
        s.powered && core::mem::take(&mut s.fix)
    }
}
