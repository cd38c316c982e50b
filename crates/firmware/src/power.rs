//! Power manager: CPU frequency governor and GPS duty cycle wired to the
//! board's clock and GNSS controls.

use platform::power::GPS_SLEEP_MS;
use platform::{CpuClock, CpuGovernor, Gnss, GpsDutyCycle, GpsPower, GpsState, SleepPlan};

/// Drives [`CpuGovernor`] and [`GpsDutyCycle`] against real devices.
pub struct PowerManager<C, G> {
    cpu: C,
    governor: CpuGovernor,
    gnss: Option<G>,
    gps: GpsDutyCycle,
}

impl<C: CpuClock, G: Gnss> PowerManager<C, G> {
    /// Start idle with GPS off. The core is set to the idle clock.
    pub fn new(mut cpu: C, gnss: Option<G>) -> Self {
        let governor = CpuGovernor::new();
        cpu.set_mhz(governor.mhz());
        Self {
            cpu,
            governor,
            gnss,
            gps: GpsDutyCycle::new(),
        }
    }

    /// Any key press: boost the core.
    pub fn on_input(&mut self, now_ms: u64) {
        if let Some(mhz) = self.governor.boost(now_ms) {
            self.cpu.set_mhz(mhz);
        }
    }

    /// Once per tick.
    pub fn tick(&mut self, now_ms: u64) {
        if let Some(mhz) = self.governor.tick(now_ms) {
            self.cpu.set_mhz(mhz);
        }
        let Some(gnss) = self.gnss.as_mut() else {
            return;
        };
        if self.gps.state() == GpsState::Acquiring && gnss.take_fix() {
            tracing::debug!("gps: fix");
            self.gps.on_fix(now_ms);
        }
        let change = self.gps.tick(now_ms);
        self.drive(change);
    }

    /// Switch GPS duty cycling on or off. Returns the new state.
    pub fn toggle_gps(&mut self, now_ms: u64) -> GpsState {
        if self.gnss.is_none() {
            return GpsState::Off;
        }
        let change = if self.gps.state() == GpsState::Off {
            self.gps.enable(now_ms)
        } else {
            self.gps.disable(now_ms)
        };
        self.drive(change);
        self.gps.state()
    }

    fn drive(&mut self, change: Option<GpsPower>) {
        if let (Some(power), Some(gnss)) = (change, self.gnss.as_mut()) {
            tracing::info!("gps: power {:?}", power);
            gnss.set_power(power == GpsPower::On);
        }
    }

    /// GPS duty-cycle state.
    pub fn gps_state(&self) -> GpsState {
        self.gps.state()
    }

    /// `true` if a GNSS receiver is fitted.
    pub fn has_gps(&self) -> bool {
        self.gnss.is_some()
    }

    /// Current core clock.
    pub fn cpu_mhz(&self) -> u32 {
        self.governor.mhz()
    }

    /// Wake sources for deep sleep. A sleeping GPS arms the timer so the
    /// next acquisition window still happens.
    pub fn sleep_plan(&self) -> SleepPlan {
        let timer_s = (self.gps.state() == GpsState::Sleeping)
            .then(|| u32::try_from(GPS_SLEEP_MS / 1000).unwrap_or(u32::MAX));
        SleepPlan {
            timer_s,
            button: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::{MockCpu, MockGnss};
    use platform::power::{BOOST_HOLD_MS, CPU_BOOST_MHZ, CPU_IDLE_MHZ, GPS_FIX_HOLD_MS};

    #[test]
    fn test_input_boosts_then_idles() {
        let cpu = MockCpu::default();
        let mut pm = PowerManager::new(cpu.clone(), None::<MockGnss>);
        pm.on_input(0);
        assert_eq!(pm.cpu_mhz(), CPU_BOOST_MHZ);
        pm.tick(BOOST_HOLD_MS + 1);
        assert_eq!(pm.cpu_mhz(), CPU_IDLE_MHZ);
        assert_eq!(cpu.switches(), vec![CPU_IDLE_MHZ, CPU_BOOST_MHZ, CPU_IDLE_MHZ]);
    }

    #[test]
    fn test_gps_toggle_without_receiver_is_off() {
        let mut pm = PowerManager::new(MockCpu::default(), None::<MockGnss>);
        assert_eq!(pm.toggle_gps(0), GpsState::Off);
        assert!(!pm.has_gps());
    }

    #[test]
    fn test_fix_puts_gps_to_sleep_and_arms_timer() {
        let gnss = MockGnss::default();
        let mut pm = PowerManager::new(MockCpu::default(), Some(gnss.clone()));
        assert_eq!(pm.toggle_gps(0), GpsState::Acquiring);
        assert!(gnss.is_powered());
        gnss.inject_fix();
        pm.tick(100);
        pm.tick(100 + GPS_FIX_HOLD_MS + 1);
        assert_eq!(pm.gps_state(), GpsState::Sleeping);
        assert!(!gnss.is_powered());
        assert_eq!(pm.sleep_plan().timer_s, Some(900));
        assert!(pm.sleep_plan().button);
    }

    #[test]
    fn test_gps_off_has_no_timer_wake() {
        let pm = PowerManager::new(MockCpu::default(), Some(MockGnss::default()));
        assert_eq!(pm.sleep_plan().timer_s, None);
    }
}
