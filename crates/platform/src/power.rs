//! Power management: CPU frequency governor, GPS duty cycle, deep sleep.
//!
//! The governors are pure state machines driven by a millisecond timestamp.
//! They return the action the board must perform, if any, so the caller owns
//! the side effects.

/// Idle CPU set point (MHz).
pub const CPU_IDLE_MHZ: u32 = 80;
/// Boost CPU set point (MHz).
pub const CPU_BOOST_MHZ: u32 = 240;
/// How long a boost request holds the high set point.
pub const BOOST_HOLD_MS: u64 = 10_000;

/// GPS acquisition gives up after this long without a fix.
pub const GPS_ACQUIRE_TIMEOUT_MS: u64 = 180_000;
/// Minimum time the receiver stays on after the first fix.
pub const GPS_FIX_HOLD_MS: u64 = 5_000;
/// Sleep between acquisitions.
pub const GPS_SLEEP_MS: u64 = 900_000;

/// Two-level CPU frequency governor.
///
/// Peripherals clock from the APB domain and are unaffected by changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuGovernor {
    mhz: u32,
    boost_until: Option<u64>,
}

impl CpuGovernor {
    /// Start at the idle set point.
    pub const fn new() -> Self {
        Self {
            mhz: CPU_IDLE_MHZ,
            boost_until: None,
        }
    }

    /// Current set point.
    pub fn mhz(&self) -> u32 {
        self.mhz
    }

    /// Move to the boost set point and re-arm the hold timer.
    ///
    /// Returns the new frequency if the set point changed.
    pub fn boost(&mut self, now_ms: u64) -> Option<u32> {
        self.boost_until = Some(now_ms.saturating_add(BOOST_HOLD_MS));
        self.set(CPU_BOOST_MHZ)
    }

    /// Return to idle once the hold timer elapses.
    pub fn tick(&mut self, now_ms: u64) -> Option<u32> {
        match self.boost_until {
            Some(until) if now_ms >= until => {
                self.boost_until = None;
                self.set(CPU_IDLE_MHZ)
            }
            _ => None,
        }
    }

    fn set(&mut self, mhz: u32) -> Option<u32> {
        if self.mhz == mhz {
            None
        } else {
            tracing::debug!("cpu: {} -> {} MHz", self.mhz, mhz);
            self.mhz = mhz;
            Some(mhz)
        }
    }
}

impl Default for CpuGovernor {
    fn default() -> Self {
        Self::new()
    }
}

/// GPS duty-cycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpsState {
    /// Disabled by the user.
    Off,
    /// Receiver powered, waiting for a fix.
    Acquiring,
    /// Receiver powered down until the next cycle.
    Sleeping,
}

/// Power action for the GPS receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpsPower {
    /// Power the receiver up.
    On,
    /// Power the receiver down.
    Off,
}

/// `Off → Acquiring → Sleeping → Acquiring …` with user enable/disable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsDutyCycle {
    state: GpsState,
    entered_ms: u64,
    fix_ms: Option<u64>,
}

impl GpsDutyCycle {
    /// Disabled receiver.
    pub const fn new() -> Self {
        Self {
            state: GpsState::Off,
            entered_ms: 0,
            fix_ms: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> GpsState {
        self.state
    }

    fn enter(&mut self, state: GpsState, now_ms: u64) -> Option<GpsPower> {
        tracing::debug!("gps: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.entered_ms = now_ms;
        self.fix_ms = None;
        match state {
            GpsState::Acquiring => Some(GpsPower::On),
            GpsState::Off | GpsState::Sleeping => Some(GpsPower::Off),
        }
    }

    /// User enable: start acquiring (no-op if already enabled).
    pub fn enable(&mut self, now_ms: u64) -> Option<GpsPower> {
        match self.state {
            GpsState::Off => self.enter(GpsState::Acquiring, now_ms),
            GpsState::Acquiring | GpsState::Sleeping => None,
        }
    }

    /// User disable from any state.
    pub fn disable(&mut self, now_ms: u64) -> Option<GpsPower> {
        match self.state {
            GpsState::Off => None,
            GpsState::Acquiring => self.enter(GpsState::Off, now_ms),
            GpsState::Sleeping => {
                // Receiver is already unpowered.
                self.enter(GpsState::Off, now_ms);
                None
            }
        }
    }

    /// Wake early from `Sleeping`. Ignored in other states.
    pub fn force_wake(&mut self, now_ms: u64) -> Option<GpsPower> {
        match self.state {
            GpsState::Sleeping => self.enter(GpsState::Acquiring, now_ms),
            GpsState::Off | GpsState::Acquiring => None,
        }
    }

    /// A position fix was decoded.
    pub fn on_fix(&mut self, now_ms: u64) {
        if self.state == GpsState::Acquiring && self.fix_ms.is_none() {
            self.fix_ms = Some(now_ms);
        }
    }

    /// Advance timers.
    pub fn tick(&mut self, now_ms: u64) -> Option<GpsPower> {
        match self.state {
            GpsState::Off => None,
            GpsState::Acquiring => {
                let done = match self.fix_ms {
                    Some(fix) => now_ms.saturating_sub(fix) >= GPS_FIX_HOLD_MS,
                    None => now_ms.saturating_sub(self.entered_ms) >= GPS_ACQUIRE_TIMEOUT_MS,
                };
                if done {
                    self.enter(GpsState::Sleeping, now_ms)
                } else {
                    None
                }
            }
            GpsState::Sleeping => {
                if now_ms.saturating_sub(self.entered_ms) >= GPS_SLEEP_MS {
                    self.enter(GpsState::Acquiring, now_ms)
                } else {
                    None
                }
            }
        }
    }
}

impl Default for GpsDutyCycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Wake-up source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeSource {
    /// RTC timer after the given number of seconds.
    Timer(u32),
    /// Radio DIO1 (a LoRa packet arrived).
    RadioDio1,
    /// User button.
    Button,
}

/// What to arm before deep sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepPlan {
    /// Optional timer wake.
    pub timer_s: Option<u32>,
    /// Optional user-button wake.
    pub button: bool,
}

impl SleepPlan {
    /// Radio wake only.
    pub const fn radio_only() -> Self {
        Self {
            timer_s: None,
            button: false,
        }
    }

    /// Wake sources in arming order. Radio DIO1 is always armed.
    pub fn wake_sources(&self) -> heapless::Vec<WakeSource, 3> {
        let mut out = heapless::Vec::new();
        if let Some(s) = self.timer_s {
            let _ = out.push(WakeSource::Timer(s));
        }
        let _ = out.push(WakeSource::RadioDio1);
        if self.button {
            let _ = out.push(WakeSource::Button);
        }
        out
    }

    /// The radio NSS line is always latched through sleep so the
    /// transceiver keeps its configuration.
    pub const fn holds_radio_nss(&self) -> bool {
        true
    }
}

/// Board deep-sleep entry.
pub trait DeepSleep {
    /// Arm `plan`'s wake sources, latch radio NSS and sleep.
    ///
    /// On hardware this does not return (wake is a reset).
    fn enter(&mut self, plan: &SleepPlan);
}

/// Core clock control.
pub trait CpuClock {
    /// Switch the application core to `mhz`.
    fn set_mhz(&mut self, mhz: u32);
}

/// GNSS receiver: a power switch and a fix indicator.
pub trait Gnss {
    /// Power the receiver up or down.
    fn set_power(&mut self, on: bool);

    /// `true` once per decoded position fix.
    fn take_fix(&mut self) -> bool;
}

/// Power state monitor (fuel gauge)
pub trait PowerMonitor {
    /// Get battery voltage (mV)
    fn battery_voltage(&self) -> Option<u16>;

    /// Get battery percentage (0-100)
    fn battery_percentage(&self) -> Option<u8>;

    /// Check if charging
    fn is_charging(&self) -> bool;

    /// Nominal capacity the gauge was configured with (mAh). Distinct from
    /// the learned full-charge capacity.
    fn design_capacity_mah(&self) -> u16;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boost_then_idle_after_hold() {
        let mut cpu = CpuGovernor::new();
        assert_eq!(cpu.boost(1_000), Some(CPU_BOOST_MHZ));
        assert_eq!(cpu.tick(10_999), None);
        assert_eq!(cpu.tick(11_000), Some(CPU_IDLE_MHZ));
        assert_eq!(cpu.mhz(), CPU_IDLE_MHZ);
    }

    #[test]
    fn test_boost_rearms_timer() {
        let mut cpu = CpuGovernor::new();
        cpu.boost(0);
        assert_eq!(cpu.boost(8_000), None); // already boosted
        assert_eq!(cpu.tick(12_000), None);
        assert_eq!(cpu.tick(18_000), Some(CPU_IDLE_MHZ));
    }

    #[test]
    fn test_gps_timeout_without_fix_sleeps() {
        let mut gps = GpsDutyCycle::new();
        assert_eq!(gps.enable(0), Some(GpsPower::On));
        assert_eq!(gps.tick(179_999), None);
        assert_eq!(gps.tick(180_000), Some(GpsPower::Off));
        assert_eq!(gps.state(), GpsState::Sleeping);
        assert_eq!(gps.tick(180_000 + GPS_SLEEP_MS), Some(GpsPower::On));
        assert_eq!(gps.state(), GpsState::Acquiring);
    }

    #[test]
    fn test_gps_fix_holds_five_seconds() {
        let mut gps = GpsDutyCycle::new();
        gps.enable(0);
        gps.on_fix(20_000);
        assert_eq!(gps.tick(24_999), None);
        assert_eq!(gps.tick(25_000), Some(GpsPower::Off));
    }

    #[test]
    fn test_gps_force_wake_only_from_sleeping() {
        let mut gps = GpsDutyCycle::new();
        assert_eq!(gps.force_wake(0), None);
        gps.enable(0);
        assert_eq!(gps.force_wake(1), None);
        gps.tick(GPS_ACQUIRE_TIMEOUT_MS);
        assert_eq!(gps.force_wake(GPS_ACQUIRE_TIMEOUT_MS + 10), Some(GpsPower::On));
    }

    #[test]
    fn test_gps_disable_from_sleeping_needs_no_power_action() {
        let mut gps = GpsDutyCycle::new();
        gps.enable(0);
        gps.tick(GPS_ACQUIRE_TIMEOUT_MS);
        assert_eq!(gps.disable(GPS_ACQUIRE_TIMEOUT_MS + 1), None);
        assert_eq!(gps.state(), GpsState::Off);
    }

    #[test]
    fn test_sleep_plan_always_arms_radio() {
        let plan = SleepPlan::radio_only();
        assert_eq!(plan.wake_sources().as_slice(), &[WakeSource::RadioDio1]);
        let plan = SleepPlan {
            timer_s: Some(3600),
            button: true,
        };
        assert_eq!(
            plan.wake_sources().as_slice(),
            &[WakeSource::Timer(3600), WakeSource::RadioDio1, WakeSource::Button]
        );
        assert!(plan.holds_radio_nss());
    }
}
