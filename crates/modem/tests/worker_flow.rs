//! Worker against the simulated modem, in mock time.

use platform::clock::WallClock;
use platform::mocks::{MockClock, MockDelay, SimModem};
use platform::Clock;

use modem::worker::{ERROR_RESTART_MS, REGISTRATION_TIMEOUT_MS, SMS_POLL_MS};
use modem::queue::MAX_SEND_ATTEMPTS;
use modem::{ModemState, ModemStatus, ModemWorker, SmsQueues};

type Worker<'a> = ModemWorker<'a, SimModem, SimModem, MockDelay, MockClock>;

struct Env {
    sim: SimModem,
    clock: MockClock,
    status: ModemStatus,
    queues: SmsQueues,
    wall: WallClock,
}

impl Env {
    fn new() -> Self {
        let clock = MockClock::new();
        Self {
            sim: SimModem::new().with_clock(clock.clone()),
            clock,
            status: ModemStatus::new(),
            queues: SmsQueues::new(),
            wall: WallClock::new(),
        }
    }

    fn worker(&self) -> Worker<'_> {
        ModemWorker::new(
            self.sim.clone(),
            self.sim.clone(),
            MockDelay::new(self.clock.clone()),
            self.clock.clone(),
            &self.status,
            &self.queues,
            &self.wall,
        )
    }
}

#[tokio::test]
async fn bring_up_reaches_ready() {
    let env = Env::new();
    let mut w = env.worker();
    assert_eq!(w.step().await, ModemState::Ready);

    let cmds = env.sim.commands();
    let pos = |c: &str| cmds.iter().position(|x| x == c).unwrap();
    assert!(pos("AT") < pos("ATE0"));
    assert!(pos("ATE0") < pos("AT+CMGF=1"));
    assert!(pos("AT+CMGF=1") < pos("AT+CSCS=\"GSM\""));
    assert!(pos("AT+CNMI=2,1,0,0,0") < pos("AT+CTZU=1"));
    assert!(pos("AT+CTZU=1") < pos("AT+CREG?"));
    assert!(pos("AT+CREG?") < pos("AT+COPS?"));
    assert!(pos("AT+CCLK?") < pos("AT+CMGD=1,4"));

    assert!(env.sim.rail_on());
    assert!(env.sim.dtr_low());
    assert_eq!(env.status.operator().as_str(), "MeshTel");
    assert_eq!(env.status.csq(), 21);
    assert!(env.wall.is_synced());
    assert_eq!(env.wall.epoch_at(env.clock.now_ms()), Some(1_714_566_600));
    // 200 ms reset + 1.5 s PWRKEY + 5 s boot wait.
    assert!(env.clock.now_ms() >= 6_700);
}

#[tokio::test]
async fn roaming_registration_accepted_after_search() {
    let env = Env::new();
    env.sim.register_after(3, 5);
    let mut w = env.worker();
    assert_eq!(w.step().await, ModemState::Ready);
    let polls = env.sim.commands().iter().filter(|c| *c == "AT+CREG?").count();
    assert_eq!(polls, 4);
}

#[tokio::test]
async fn slow_boot_answers_within_ten_pings() {
    let env = Env::new();
    env.sim.ignore_pings(3);
    let mut w = env.worker();
    assert_eq!(w.step().await, ModemState::Ready);
}

#[tokio::test]
async fn silent_modem_errors_then_restarts() {
    let env = Env::new();
    env.sim.ignore_pings(10);
    let mut w = env.worker();
    assert_eq!(w.step().await, ModemState::Error);
    assert_eq!(env.status.state(), ModemState::Error);
    let pings = env.sim.commands().iter().filter(|c| *c == "AT").count();
    assert_eq!(pings, 10);

    let failed_at = env.clock.now_ms();
    let mut state = ModemState::Error;
    while state == ModemState::Error {
        state = w.step().await;
    }
    assert_eq!(state, ModemState::Off);
    assert!(env.clock.now_ms() - failed_at >= ERROR_RESTART_MS);
    assert!(!env.sim.rail_on());

    // The pings are exhausted now, so the second power-up succeeds.
    assert_eq!(w.step().await, ModemState::Ready);
}

#[tokio::test]
async fn registration_gives_up_after_sixty_seconds() {
    let env = Env::new();
    env.sim.register_after(10_000, 2);
    let mut w = env.worker();
    let start = env.clock.now_ms();
    assert_eq!(w.step().await, ModemState::Error);
    assert!(env.clock.now_ms() - start >= REGISTRATION_TIMEOUT_MS);
}

#[tokio::test]
async fn clock_sync_retries() {
    let env = Env::new();
    env.sim.fail_cclk(2);
    let mut w = env.worker();
    assert_eq!(w.step().await, ModemState::Ready);
    assert!(env.wall.is_synced());

    let env = Env::new();
    env.sim.fail_cclk(5);
    let mut w = env.worker();
    assert_eq!(w.step().await, ModemState::Ready);
    assert!(!env.wall.is_synced());
    let tries = env.sim.commands().iter().filter(|c| *c == "AT+CCLK?").count();
    assert_eq!(tries, 5);
}

#[tokio::test]
async fn queued_sms_is_sent_one_per_cycle() {
    let env = Env::new();
    let mut w = env.worker();
    w.step().await;
    assert!(env.queues.send_sms("+1 234", "hello"));
    assert!(env.queues.send_sms("+1234", "again"));
    w.step().await;
    assert_eq!(env.sim.sent(), vec![("+1234".to_string(), "hello".to_string())]);
    w.step().await;
    assert_eq!(env.sim.sent().len(), 2);
    assert_eq!(env.queues.pending_outgoing(), 0);
}

#[tokio::test]
async fn failed_send_is_dropped_and_worker_stays_ready() {
    let env = Env::new();
    env.sim.fail_sends(true);
    let mut w = env.worker();
    w.step().await;
    env.queues.send_sms("+1234", "lost");
    assert_eq!(w.step().await, ModemState::Ready);
    assert!(env.sim.sent().is_empty());
    assert_eq!(env.queues.pending_outgoing(), 0);
}

#[tokio::test]
async fn unanswered_send_is_retried_after_restart() {
    let env = Env::new();
    env.sim.drop_sends(1);
    let mut w = env.worker();
    w.step().await;
    env.queues.send_sms("+1234", "again");
    assert_eq!(w.step().await, ModemState::Error);
    assert_eq!(env.queues.pending_outgoing(), 1);

    env.clock.advance(ERROR_RESTART_MS);
    assert_eq!(w.step().await, ModemState::Off);
    assert_eq!(w.step().await, ModemState::Ready);
    w.step().await;
    assert_eq!(env.sim.sent(), vec![("+1234".to_string(), "again".to_string())]);
    assert_eq!(env.queues.pending_outgoing(), 0);
}

#[tokio::test]
async fn unanswered_send_given_up_after_max_attempts() {
    let env = Env::new();
    env.sim.drop_sends(MAX_SEND_ATTEMPTS.into());
    let mut w = env.worker();
    w.step().await;
    env.queues.send_sms("+1234", "void");
    for attempt in 1..=MAX_SEND_ATTEMPTS {
        assert_eq!(w.step().await, ModemState::Error);
        let left = usize::from(attempt < MAX_SEND_ATTEMPTS);
        assert_eq!(env.queues.pending_outgoing(), left);
        env.clock.advance(ERROR_RESTART_MS);
        w.step().await;
        w.step().await;
    }
    assert!(env.sim.sent().is_empty());
    assert_eq!(env.queues.pending_outgoing(), 0);
}

#[tokio::test]
async fn incoming_sms_reaches_queue_and_leaves_sim() {
    let env = Env::new();
    let mut w = env.worker();
    w.step().await;
    w.step().await;
    env.sim.deliver("+1234", "ack");
    assert!(env.queues.recv_sms().is_none());

    let start = env.clock.now_ms();
    while env.clock.now_ms() - start < SMS_POLL_MS + 500 {
        w.step().await;
    }
    let sms = env.queues.recv_sms().unwrap();
    assert_eq!(sms.phone.as_str(), "+1234");
    assert_eq!(sms.body.as_str(), "ack");
    assert_eq!(sms.timestamp, 1_714_566_660);
    assert!(env.sim.inbox().is_empty());
    assert!(env.sim.commands().iter().any(|c| c == "AT+CMGD=1"));
}

#[tokio::test]
async fn shutdown_powers_off() {
    let env = Env::new();
    let mut w = env.worker();
    w.step().await;
    env.status.request_shutdown();
    w.run().await;
    assert_eq!(env.status.state(), ModemState::Off);
    assert_eq!(env.sim.commands().last().map(String::as_str), Some("AT+CPOF"));
    assert!(!env.sim.rail_on());
    assert!(!env.sim.dtr_low());
}
