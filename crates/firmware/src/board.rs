//! Board bundle: the concrete device types the runtime is built over.
//!
//! A board (the real handheld, or the mock rig in tests) names one type per
//! device trait and hands the instances over in [`Devices`]. Everything in
//! this crate is generic over [`Board`] so the same runtime drives both.
//!
//! The SD card, the panel and the radio share one SPI bus. The runtime wraps
//! each of them with its chip-select pin and the board's [`SpiArbiter`], so
//! screens only ever see the guarded [`SdCard`], [`Panel`] and [`Radio`].

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use library::TagParser;
use modem::{ModemStatus, SmsQueues, MODEM_STATUS, SMS_QUEUES};
use platform::audio::EofLatch;
use platform::clock::WALL_CLOCK;
use platform::{
    AudioDecoder, Clock, Connector, CpuClock, CsPanel, CsRadio, CsReleasingStorage, DeepSleep,
    EinkPanel, Gnss, Keyboard, MeshRadio, PowerMonitor, SpiArbiter, Storage, WallClock, WifiLink,
};
use static_cell::ConstStaticCell;

/// Device types of one board.
pub trait Board {
    /// E-ink panel.
    type Panel: EinkPanel;
    /// Keyboard controller.
    type Keyboard: Keyboard;
    /// SD card driver.
    type Storage: Storage;
    /// SD card chip-select.
    type SdCs: OutputPin;
    /// Panel chip-select.
    type PanelCs: OutputPin;
    /// Radio chip-select.
    type RadioCs: OutputPin;
    /// Audio decoder library.
    type Decoder: AudioDecoder;
    /// DAC power-enable line.
    type DacPin: OutputPin;
    /// Tag reader used by the audiobook scan.
    type Tags: TagParser;
    /// Mesh transceiver and stack.
    type Radio: MeshRadio;
    /// Fuel gauge.
    type Gauge: PowerMonitor;
    /// Deep-sleep controller.
    type Sleep: DeepSleep;
    /// Core clock control.
    type Cpu: CpuClock;
    /// GNSS receiver.
    type Gnss: Gnss;
    /// WiFi station.
    type Wifi: WifiLink;
    /// TCP/TLS connector.
    type Connector: Connector;
    /// Monotonic clock.
    type Clock: Clock + Clone;
    /// Async delay.
    type Delay: DelayNs + Clone;
}

/// SD card as the screens use it: every call selects and releases its CS.
pub type SdCard<B> = CsReleasingStorage<'static, <B as Board>::Storage, <B as Board>::SdCs>;

/// Panel with guarded refresh and sleep.
pub type Panel<B> = CsPanel<'static, <B as Board>::Panel, <B as Board>::PanelCs>;

/// Mesh radio with guarded transceiver access.
pub type Radio<B> = CsRadio<'static, <B as Board>::Radio, <B as Board>::RadioCs>;

/// Page buffer for the web reader.
pub const PAGE_BUF: usize = 48 * 1024;

/// Text buffer for the e-book reader.
pub const BOOK_BUF: usize = 64 * 1024;

static PAGE: ConstStaticCell<[u8; PAGE_BUF]> = ConstStaticCell::new([0; PAGE_BUF]);
static BOOK: ConstStaticCell<[u8; BOOK_BUF]> = ConstStaticCell::new([0; BOOK_BUF]);

/// Large buffers handed out once at boot.
///
/// A screen whose buffer is missing refuses to start and says so; the rest
/// of the device keeps running.
#[derive(Debug, Default)]
pub struct Buffers {
    /// Web page body, extracted in place.
    pub page: Option<&'static mut [u8]>,
    /// E-book text.
    pub book: Option<&'static mut [u8]>,
}

impl Buffers {
    /// Take the static buffers. A second call gets nothing.
    pub fn take() -> Self {
        let page = PAGE.try_take().map(|b| b.as_mut_slice());
        let book = BOOK.try_take().map(|b| b.as_mut_slice());
        if page.is_none() || book.is_none() {
            tracing::error!("boot: reader buffers already taken");
        }
        Self { page, book }
    }
}

/// Process-wide state shared with the modem worker.
#[derive(Clone, Copy)]
pub struct Shared {
    /// SMS send and receive queues.
    pub queues: &'static SmsQueues,
    /// Modem status atoms.
    pub status: &'static ModemStatus,
    /// Wall-clock anchor set by the modem.
    pub wall: &'static WallClock,
}

impl Shared {
    /// The global singletons.
    pub fn global() -> Self {
        Self {
            queues: &SMS_QUEUES,
            status: &MODEM_STATUS,
            wall: &WALL_CLOCK,
        }
    }
}

/// Device instances for one board.
pub struct Devices<B: Board> {
    /// E-ink panel.
    pub panel: B::Panel,
    /// Keyboard.
    pub keyboard: B::Keyboard,
    /// SD card.
    pub sd: B::Storage,
    /// Chip-selects of the three bus slaves.
    pub sd_cs: B::SdCs,
    /// Panel chip-select.
    pub panel_cs: B::PanelCs,
    /// Radio chip-select.
    pub radio_cs: B::RadioCs,
    /// Arbiter of the shared SPI bus, usually [`platform::SPI_BUS`].
    pub bus: &'static SpiArbiter,
    /// Audio decoder.
    pub decoder: B::Decoder,
    /// DAC enable.
    pub dac: B::DacPin,
    /// Latch the decoder's end-of-file callback sets.
    pub eof: &'static EofLatch,
    /// Tag reader.
    pub tags: B::Tags,
    /// Mesh radio.
    pub radio: B::Radio,
    /// Fuel gauge.
    pub gauge: B::Gauge,
    /// Deep sleep.
    pub sleep: B::Sleep,
    /// CPU clock.
    pub cpu: B::Cpu,
    /// GNSS, if fitted.
    pub gnss: Option<B::Gnss>,
    /// WiFi.
    pub wifi: B::Wifi,
    /// Network connector.
    pub connector: B::Connector,
    /// Clock.
    pub clock: B::Clock,
    /// Delay.
    pub delay: B::Delay,
    /// `true` if a cellular modem is fitted.
    pub has_modem: bool,
    /// Reader buffers.
    pub buffers: Buffers,
    /// Modem queues and status.
    pub shared: Shared,
}
