//! Shared SPI bus arbitration and chip-select discipline.
//!
//! The radio, the e-ink panel and the SD card share MOSI/MISO/SCK and differ
//! only by their chip-select line. Two rules hold on the application core:
//!
//! 1. After any transaction returns, on success and on error, the slave's CS
//!    line is high. [`CsGuard`] makes this structural: CS goes low when the
//!    guard is created and high when it is dropped.
//! 2. Only one slave owns the bus at a time. The cooperative scheduler runs
//!    every bus user to completion, so a second [`SpiArbiter::select`] while a
//!    guard is alive is a programming error and is refused with
//!    [`SpiError::Busy`].
//!
//! The arbiter is built from atomics so a single instance can live in a
//! `static` and be shared by every bus user. [`CsReleasingStorage`],
//! [`CsPanel`] and [`CsRadio`] wrap the three slaves so that every call
//! touching the bus runs inside a guard.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{Dimensions, DrawTarget, Pixel, Size};
use embedded_graphics::primitives::Rectangle;
use embedded_hal::digital::OutputPin;

use crate::display::{EinkPanel, RefreshMode};
use crate::radio::{MeshEvent, MeshRadio, RadioParams};
use crate::storage::{DirEntry, Storage};

/// The three slaves on the shared bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusOwner {
    /// SX1262 LoRa transceiver.
    Radio,
    /// E-ink panel controller.
    Display,
    /// SD card.
    Sd,
}

impl BusOwner {
    const fn code(self) -> u8 {
        match self {
            Self::Radio => 1,
            Self::Display => 2,
            Self::Sd => 3,
        }
    }

    const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Radio),
            2 => Some(Self::Display),
            3 => Some(Self::Sd),
            _ => None,
        }
    }

    /// Short label for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Radio => "radio",
            Self::Display => "display",
            Self::Sd => "sd",
        }
    }
}

/// Bus arbitration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiError {
    /// Another slave still holds the bus.
    #[error("SPI bus held by {}", .0.name())]
    Busy(BusOwner),
    /// The chip-select GPIO could not be driven.
    #[error("chip-select pin fault")]
    Pin,
}

/// Records the current bus owner.
pub struct SpiArbiter {
    owner: AtomicU8,
    transactions: AtomicU32,
    pin_faults: AtomicU32,
}

impl SpiArbiter {
    /// Idle arbiter; usable in a `static`.
    pub const fn new() -> Self {
        Self {
            owner: AtomicU8::new(0),
            transactions: AtomicU32::new(0),
            pin_faults: AtomicU32::new(0),
        }
    }

    /// Current owner, `None` when every CS line is released.
    pub fn owner(&self) -> Option<BusOwner> {
        BusOwner::from_code(self.owner.load(Ordering::Acquire))
    }

    /// `true` when no guard is alive.
    pub fn all_released(&self) -> bool {
        self.owner().is_none()
    }

    /// Number of guards handed out since boot.
    pub fn transactions(&self) -> u32 {
        self.transactions.load(Ordering::Relaxed)
    }

    /// Number of times a CS line failed to go high on release.
    pub fn pin_faults(&self) -> u32 {
        self.pin_faults.load(Ordering::Relaxed)
    }

    /// Claim the bus for `who` and drive `cs` low.
    pub fn select<'a, P: OutputPin>(
        &'a self,
        who: BusOwner,
        cs: &'a mut P,
    ) -> Result<CsGuard<'a, P>, SpiError> {
        if let Err(current) =
            self.owner
                .compare_exchange(0, who.code(), Ordering::AcqRel, Ordering::Acquire)
        {
            let holder = BusOwner::from_code(current).unwrap_or(who);
            tracing::warn!("spi: {} refused, bus held by {}", who.name(), holder.name());
            return Err(SpiError::Busy(holder));
        }
        if cs.set_low().is_err() {
            // Leave the line released and the bus free.
            let _ = cs.set_high();
            self.owner.store(0, Ordering::Release);
            return Err(SpiError::Pin);
        }
        self.transactions.fetch_add(1, Ordering::Relaxed);
        Ok(CsGuard {
            arbiter: self,
            cs,
            owner: who,
        })
    }
}

impl Default for SpiArbiter {
    fn default() -> Self {
        Self::new()
    }
}

/// The board's one shared bus.
pub static SPI_BUS: SpiArbiter = SpiArbiter::new();

/// Active chip-select. Dropping it drives CS high and frees the bus.
pub struct CsGuard<'a, P: OutputPin> {
    arbiter: &'a SpiArbiter,
    cs: &'a mut P,
    owner: BusOwner,
}

impl<P: OutputPin> CsGuard<'_, P> {
    /// The slave this guard selected.
    pub fn owner(&self) -> BusOwner {
        self.owner
    }
}

impl<P: OutputPin> Drop for CsGuard<'_, P> {
    fn drop(&mut self) {
        if self.cs.set_high().is_err() {
            self.arbiter.pin_faults.fetch_add(1, Ordering::Relaxed);
            tracing::error!("spi: {} CS failed to release", self.owner.name());
        }
        self.arbiter.owner.store(0, Ordering::Release);
    }
}

/// Error of a guarded device call.
#[derive(Debug, thiserror::Error)]
pub enum CsError<E: core::fmt::Debug> {
    /// The bus could not be claimed.
    #[error("bus: {0}")]
    Bus(#[from] SpiError),
    /// The wrapped device failed; CS was still released.
    #[error("device: {0:?}")]
    Device(E),
}

/// Wraps a [`Storage`] so that every operation runs inside a [`CsGuard`].
pub struct CsReleasingStorage<'a, S, P> {
    inner: S,
    cs: P,
    bus: &'a SpiArbiter,
}

impl<'a, S: Storage, P: OutputPin> CsReleasingStorage<'a, S, P> {
    /// Wrap `inner`, whose chip-select is `cs`. CS is driven high immediately.
    pub fn new(inner: S, mut cs: P, bus: &'a SpiArbiter) -> Self {
        let _ = cs.set_high();
        Self { inner, cs, bus }
    }

    /// Borrow the wrapped storage.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Borrow the chip-select pin.
    pub fn cs(&self) -> &P {
        &self.cs
    }

    /// The shared arbiter.
    pub fn bus(&self) -> &'a SpiArbiter {
        self.bus
    }
}

impl<S: Storage, P: OutputPin> Storage for CsReleasingStorage<'_, S, P> {
    type Error = CsError<S::Error>;

    async fn read_at(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let _cs = self.bus.select(BusOwner::Sd, &mut self.cs)?;
        self.inner
            .read_at(path, offset, buf)
            .await
            .map_err(CsError::Device)
    }

    async fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), Self::Error> {
        let _cs = self.bus.select(BusOwner::Sd, &mut self.cs)?;
        self.inner
            .write_file(path, data)
            .await
            .map_err(CsError::Device)
    }

    async fn append(&mut self, path: &str, data: &[u8]) -> Result<(), Self::Error> {
        let _cs = self.bus.select(BusOwner::Sd, &mut self.cs)?;
        self.inner
            .append(path, data)
            .await
            .map_err(CsError::Device)
    }

    async fn remove(&mut self, path: &str) -> Result<(), Self::Error> {
        let _cs = self.bus.select(BusOwner::Sd, &mut self.cs)?;
        self.inner.remove(path).await.map_err(CsError::Device)
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<(), Self::Error> {
        let _cs = self.bus.select(BusOwner::Sd, &mut self.cs)?;
        self.inner
            .rename(from, to)
            .await
            .map_err(CsError::Device)
    }

    async fn exists(&mut self, path: &str) -> Result<bool, Self::Error> {
        let _cs = self.bus.select(BusOwner::Sd, &mut self.cs)?;
        self.inner.exists(path).await.map_err(CsError::Device)
    }

    async fn file_size(&mut self, path: &str) -> Result<Option<u64>, Self::Error> {
        let _cs = self.bus.select(BusOwner::Sd, &mut self.cs)?;
        self.inner
            .file_size(path)
            .await
            .map_err(CsError::Device)
    }

    async fn create_dir(&mut self, path: &str) -> Result<(), Self::Error> {
        let _cs = self.bus.select(BusOwner::Sd, &mut self.cs)?;
        self.inner
            .create_dir(path)
            .await
            .map_err(CsError::Device)
    }

    async fn list_dir<F>(&mut self, path: &str, visit: F) -> Result<(), Self::Error>
    where
        F: FnMut(&DirEntry),
    {
        let _cs = self.bus.select(BusOwner::Sd, &mut self.cs)?;
        self.inner
            .list_dir(path, visit)
            .await
            .map_err(CsError::Device)
    }
}

/// E-ink panel whose refresh and sleep commands run inside a guard.
///
/// Drawing only touches the controller's framebuffer copy in RAM and goes
/// straight through.
pub struct CsPanel<'a, D, P> {
    inner: D,
    cs: P,
    bus: &'a SpiArbiter,
}

impl<'a, D: EinkPanel, P: OutputPin> CsPanel<'a, D, P> {
    /// Wrap `inner`, whose chip-select is `cs`. CS is driven high immediately.
    pub fn new(inner: D, mut cs: P, bus: &'a SpiArbiter) -> Self {
        let _ = cs.set_high();
        Self { inner, cs, bus }
    }

    /// Borrow the wrapped panel.
    pub fn inner(&self) -> &D {
        &self.inner
    }
}

impl<D: EinkPanel, P> Dimensions for CsPanel<'_, D, P> {
    fn bounding_box(&self) -> Rectangle {
        self.inner.bounding_box()
    }
}

impl<D: EinkPanel, P> DrawTarget for CsPanel<'_, D, P> {
    type Color = BinaryColor;
    type Error = D::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<BinaryColor>>,
    {
        self.inner.draw_iter(pixels)
    }

    fn fill_solid(&mut self, area: &Rectangle, color: BinaryColor) -> Result<(), Self::Error> {
        self.inner.fill_solid(area, color)
    }

    fn clear(&mut self, color: BinaryColor) -> Result<(), Self::Error> {
        self.inner.clear(color)
    }
}

impl<D: EinkPanel, P: OutputPin> EinkPanel for CsPanel<'_, D, P> {
    type PanelError = CsError<D::PanelError>;

    async fn refresh(&mut self, mode: RefreshMode) -> Result<(), Self::PanelError> {
        let _cs = self.bus.select(BusOwner::Display, &mut self.cs)?;
        self.inner.refresh(mode).await.map_err(CsError::Device)
    }

    async fn sleep(&mut self) -> Result<(), Self::PanelError> {
        let _cs = self.bus.select(BusOwner::Display, &mut self.cs)?;
        self.inner.sleep().await.map_err(CsError::Device)
    }

    fn dimensions(&self) -> Size {
        self.inner.dimensions()
    }
}

/// Mesh radio whose transceiver accesses run inside a guard.
pub struct CsRadio<'a, R, P> {
    inner: R,
    cs: P,
    bus: &'a SpiArbiter,
}

impl<'a, R: MeshRadio, P: OutputPin> CsRadio<'a, R, P> {
    /// Wrap `inner`, whose chip-select is `cs`. CS is driven high immediately.
    pub fn new(inner: R, mut cs: P, bus: &'a SpiArbiter) -> Self {
        let _ = cs.set_high();
        Self { inner, cs, bus }
    }

    /// Borrow the wrapped radio.
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: MeshRadio, P: OutputPin> MeshRadio for CsRadio<'_, R, P> {
    type Error = CsError<R::Error>;

    async fn pump(&mut self) -> Result<Option<MeshEvent>, Self::Error> {
        let _cs = self.bus.select(BusOwner::Radio, &mut self.cs)?;
        self.inner.pump().await.map_err(CsError::Device)
    }

    fn tx_pending(&self) -> bool {
        self.inner.tx_pending()
    }

    async fn apply(&mut self, params: &RadioParams) -> Result<(), Self::Error> {
        let _cs = self.bus.select(BusOwner::Radio, &mut self.cs)?;
        self.inner.apply(params).await.map_err(CsError::Device)
    }

    fn max_tx_dbm(&self) -> i8 {
        self.inner.max_tx_dbm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MemStorage, MockClock, MockPanel, MockRadio, RecordingPin, StorageOp};
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    #[test]
    fn test_guard_drives_cs_low_then_high() {
        let expectations = [Transaction::set(State::Low), Transaction::set(State::High)];
        let mut pin = PinMock::new(&expectations);
        let bus = SpiArbiter::new();
        {
            let guard = bus.select(BusOwner::Display, &mut pin).unwrap();
            assert_eq!(guard.owner(), BusOwner::Display);
            assert_eq!(bus.owner(), Some(BusOwner::Display));
        }
        assert!(bus.all_released());
        pin.done();
    }

    #[test]
    fn test_second_owner_is_refused_while_guard_alive() {
        let bus = SpiArbiter::new();
        let mut radio_cs = RecordingPin::new();
        let mut sd_cs = RecordingPin::new();
        let _radio = bus.select(BusOwner::Radio, &mut radio_cs).unwrap();
        let err = bus.select(BusOwner::Sd, &mut sd_cs).err();
        assert_eq!(err, Some(SpiError::Busy(BusOwner::Radio)));
        assert!(sd_cs.history().is_empty());
    }

    #[test]
    fn test_bus_free_after_guard_dropped() {
        let bus = SpiArbiter::new();
        let mut pin = RecordingPin::new();
        drop(bus.select(BusOwner::Radio, &mut pin).unwrap());
        assert!(bus.select(BusOwner::Sd, &mut pin).is_ok());
        assert_eq!(bus.transactions(), 2);
    }

    #[test]
    fn test_release_fault_is_counted() {
        let bus = SpiArbiter::new();
        let mut pin = RecordingPin::new();
        let watch = pin.clone();
        {
            let _g = bus.select(BusOwner::Sd, &mut pin).unwrap();
            watch.fail_set_high(true);
        }
        assert_eq!(bus.pin_faults(), 1);
        assert!(bus.all_released());
    }

    #[tokio::test]
    async fn test_storage_wrapper_releases_cs_on_success() {
        let bus = SpiArbiter::new();
        let cs = RecordingPin::new();
        let watch = cs.clone();
        let mut sd = CsReleasingStorage::new(MemStorage::new(), cs, &bus);
        sd.write_file("/a.txt", b"hi").await.unwrap();
        let mut buf = [0u8; 4];
        let n = sd.read_at("/a.txt", 0, &mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hi");
        assert!(watch.is_high());
        assert!(bus.all_released());
    }

    #[tokio::test]
    async fn test_storage_wrapper_releases_cs_on_error() {
        let bus = SpiArbiter::new();
        let cs = RecordingPin::new();
        let watch = cs.clone();
        let mem = MemStorage::new();
        mem.fail_next(StorageOp::Read);
        let mut sd = CsReleasingStorage::new(mem, cs, &bus);
        let mut buf = [0u8; 4];
        assert!(sd.read_at("/missing", 0, &mut buf).await.is_err());
        assert!(watch.is_high());
        assert!(bus.all_released());
        // low, high for the failed read, after the initial high from `new`
        assert_eq!(watch.history(), vec![true, false, true]);
    }

    #[tokio::test]
    async fn test_panel_refresh_and_sleep_are_guarded() {
        let bus = SpiArbiter::new();
        let cs = RecordingPin::new();
        let watch = cs.clone();
        let mock = MockPanel::new(64, 32, MockClock::new(), 0);
        let mut panel = CsPanel::new(mock.clone(), cs, &bus);
        panel.clear(BinaryColor::On).unwrap();
        assert_eq!(watch.history(), vec![true]);
        panel.refresh(RefreshMode::Partial).await.unwrap();
        panel.sleep().await.unwrap();
        assert_eq!(watch.history(), vec![true, false, true, false, true]);
        assert_eq!(mock.refresh_count(), 1);
        assert_eq!(panel.bounding_box().size, Size::new(64, 32));
        assert_eq!(bus.transactions(), 2);
    }

    #[tokio::test]
    async fn test_radio_refused_while_bus_held() {
        let bus = SpiArbiter::new();
        let mut sd_cs = RecordingPin::new();
        let mut radio = CsRadio::new(MockRadio::new(22), RecordingPin::new(), &bus);
        {
            let _sd = bus.select(BusOwner::Sd, &mut sd_cs).unwrap();
            assert!(matches!(radio.pump().await, Err(CsError::Bus(SpiError::Busy(BusOwner::Sd)))));
        }
        assert!(radio.pump().await.unwrap().is_none());
        assert_eq!(radio.max_tx_dbm(), 22);
        assert!(bus.all_released());
    }
}
