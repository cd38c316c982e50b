//! Mock board and a rig that drives [`Runtime`] key by key.

#![allow(dead_code, clippy::unwrap_used)]

use firmware::{Board, Buffers, Devices, Runtime, Shared};
use library::metadata::NoTags;
use modem::{ModemStatus, SmsQueues};
use platform::audio::EofLatch;
use platform::clock::WallClock;
use platform::config::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use platform::mocks::{
    http_response, BusTrace, MemStorage, MockClock, MockConnector, MockCpu, MockDecoder,
    MockDelay, MockGauge, MockGnss, MockKeyboard, MockPanel, MockRadio, MockSleep, MockWifi,
    RecordingPin,
};
use platform::SpiArbiter;

/// Board made of host mocks.
pub struct MockBoard;

impl Board for MockBoard {
    type Panel = MockPanel;
    type Keyboard = MockKeyboard;
    type Storage = MemStorage;
    type SdCs = RecordingPin;
    type PanelCs = RecordingPin;
    type RadioCs = RecordingPin;
    type Decoder = MockDecoder;
    type DacPin = RecordingPin;
    type Tags = NoTags;
    type Radio = MockRadio;
    type Gauge = MockGauge;
    type Sleep = MockSleep;
    type Cpu = MockCpu;
    type Gnss = MockGnss;
    type Wifi = MockWifi;
    type Connector = MockConnector;
    type Clock = MockClock;
    type Delay = MockDelay;
}

pub const SSID: &str = "HomeNet";
pub const PASSWORD: &str = "hunter22";

/// Page every mock web request is answered with.
pub const PAGE: &str = "<html><head><title>Example</title></head><body>\
    <h1>Example Domain</h1><p>This domain is for use in examples.</p>\
    <a href=\"/more\">More information</a></body></html>";

/// Handles on every mock, plus the runtime that owns their twins.
pub struct Rig {
    pub rt: Runtime<MockBoard>,
    pub fs: MemStorage,
    pub keys: MockKeyboard,
    pub clock: MockClock,
    pub panel: MockPanel,
    pub radio: MockRadio,
    pub sleep: MockSleep,
    pub wifi: MockWifi,
    pub net: MockConnector,
    pub decoder: MockDecoder,
    pub shared: Shared,
    /// Every chip-select edge on the shared bus, in order.
    pub bus_trace: BusTrace,
    pub bus: &'static SpiArbiter,
}

/// Log to the test harness; `RUST_LOG=debug` shows the runtime's tracing.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn leak<T>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

fn leak_buf(size: usize) -> Option<&'static mut [u8]> {
    Some(Box::leak(vec![0u8; size].into_boxed_slice()))
}

impl Rig {
    /// Rig over `fs`, with or without the cellular modem fitted.
    pub fn with_card(fs: MemStorage, has_modem: bool) -> Self {
        init_tracing();
        let clock = MockClock::new();
        clock.set(1_000);
        let eof: &'static EofLatch = leak(EofLatch::new());
        let keys = MockKeyboard::new();
        let panel = MockPanel::new(DISPLAY_WIDTH, DISPLAY_HEIGHT, clock.clone(), 0);
        let radio = MockRadio::new(22);
        let sleep = MockSleep::default();
        let wifi = MockWifi::accepting(SSID, PASSWORD);
        let net = MockConnector::new(|_| {
            http_response(200, &[("Content-Type", "text/html; charset=utf-8")], PAGE)
        });
        let shared = Shared {
            queues: leak(SmsQueues::new()),
            status: leak(ModemStatus::new()),
            wall: leak(WallClock::new()),
        };
        let decoder = MockDecoder::new(clock.clone(), fs.clone(), eof);
        let bus_trace = BusTrace::new();
        let bus: &'static SpiArbiter = leak(SpiArbiter::new());
        let devices = Devices::<MockBoard> {
            panel: panel.clone(),
            keyboard: keys.clone(),
            sd: fs.clone(),
            sd_cs: bus_trace.pin("sd"),
            panel_cs: bus_trace.pin("panel"),
            radio_cs: bus_trace.pin("radio"),
            bus,
            decoder: decoder.clone(),
            dac: RecordingPin::new(),
            eof,
            tags: NoTags,
            radio: radio.clone(),
            gauge: MockGauge::default(),
            sleep: sleep.clone(),
            cpu: MockCpu::default(),
            gnss: Some(MockGnss::default()),
            wifi: wifi.clone(),
            connector: net.clone(),
            clock: clock.clone(),
            delay: MockDelay::new(clock.clone()),
            has_modem,
            buffers: Buffers {
                page: leak_buf(16 * 1024),
                book: leak_buf(16 * 1024),
            },
            shared,
        };
        Self {
            rt: Runtime::new(devices),
            fs,
            keys,
            clock,
            panel,
            radio,
            sleep,
            wifi,
            net,
            decoder,
            shared,
            bus_trace,
            bus,
        }
    }

    /// Rig on an empty card.
    pub fn new() -> Self {
        Self::with_card(MemStorage::new(), true)
    }

    /// Boot, and write onboarded settings first so the launcher comes up.
    pub async fn booted(fs: MemStorage) -> Self {
        let mut sd = fs.clone();
        store::settings::DeviceSettings {
            onboarded: true,
            ..Default::default()
        }
        .save(&mut sd)
        .await
        .unwrap();
        let mut rig = Self::with_card(fs, true);
        rig.rt.boot().await;
        rig.idle(2).await;
        rig
    }

    /// Press one key and run a tick, then one more for the screen's poll.
    pub async fn press(&mut self, key: u8) {
        self.keys.press(key);
        self.rt.tick().await;
        self.clock.advance(10);
        self.rt.tick().await;
    }

    /// Type `text`, one tick per byte.
    pub async fn type_str(&mut self, text: &str) {
        for b in text.bytes() {
            self.press(b).await;
        }
    }

    /// `n` ticks with no key, 10 ms apart.
    pub async fn idle(&mut self, n: usize) {
        for _ in 0..n {
            self.clock.advance(10);
            self.rt.tick().await;
        }
    }

    /// Banner on the hint row now.
    pub fn banner(&self) -> Option<String> {
        let cx = self.rt.context();
        cx.banner.active(cx.now()).map(str::to_string)
    }
}
