//! Channel bank + evaluators driven step by step against a manual clock.

use std::sync::Arc;

use netrelay::actuator::bank::ChannelBank;
use netrelay::actuator::deadline::DeadlineStore;
use netrelay::actuator::evaluator::Evaluator;
use netrelay::actuator::indicator::IndicatorChannel;
use netrelay::actuator::relay::RelayChannel;
use netrelay::actuator::Channel;
use netrelay::app::ports::Clock;
use netrelay::protocol::codec::Command;
use netrelay::safety::EvaluatorSupervisor;

use super::mock_hw::{last, ManualClock, RecordingPin, RecordingPwm, MOCK_MAX_DUTY};

const PULSE_MS: u32 = 100;

struct Rig {
    clock: Arc<ManualClock>,
    bank: ChannelBank,
    relay: Arc<RelayChannel<RecordingPin>>,
    indicator: Arc<IndicatorChannel<RecordingPwm>>,
    relay_eval: Evaluator,
    indicator_eval: Evaluator,
    relay_pin: Arc<std::sync::Mutex<Vec<bool>>>,
    indicator_pwm: Arc<std::sync::Mutex<Vec<u16>>>,
}

impl Rig {
    fn new() -> Self {
        let clock = ManualClock::at(1_000);
        let (pin, relay_pin) = RecordingPin::new();
        let (pwm, indicator_pwm) = RecordingPwm::new();
        let relay = Arc::new(RelayChannel::new("relay", pin, clock.now_ms()));
        let indicator = Arc::new(IndicatorChannel::new("indicator", pwm, PULSE_MS, clock.now_ms()));

        let mut bank = ChannelBank::new();
        bank.push(relay.clone()).unwrap();
        bank.push(indicator.clone()).unwrap();

        let relay_eval = Evaluator::new(relay.clone(), clock.clone());
        let indicator_eval = Evaluator::new(indicator.clone(), clock.clone());
        Self {
            clock,
            bank,
            relay,
            indicator,
            relay_eval,
            indicator_eval,
            relay_pin,
            indicator_pwm,
        }
    }

    fn command(&self, duration_ms: u32) {
        self.bank.apply(self.clock.now_ms(), &Command { duration_ms });
    }

    fn tick(&self) {
        self.relay_eval.step().unwrap();
        self.indicator_eval.step().unwrap();
    }

    fn at(&self, ms: u64) {
        self.clock.set(1_000 + ms);
        self.tick();
    }

    fn relay_on(&self) -> bool {
        last(&self.relay_pin)
    }

    fn duty(&self) -> u16 {
        last(&self.indicator_pwm)
    }
}

// ── Relay ─────────────────────────────────────────────────────

#[test]
fn relay_follows_activation_window() {
    let rig = Rig::new();
    rig.command(500);

    rig.at(0);
    assert!(rig.relay_on());
    rig.at(499);
    assert!(rig.relay_on());
    rig.at(500);
    assert!(!rig.relay_on(), "deadline is exclusive");

    // Exactly one on-edge and one off-edge were written.
    assert_eq!(*rig.relay_pin.lock().unwrap(), vec![true, false]);
}

#[test]
fn later_command_overwrites_earlier_one() {
    let rig = Rig::new();
    rig.command(1_000);
    rig.at(0);

    rig.clock.set(1_010);
    rig.command(100);
    rig.at(109);
    assert!(rig.relay_on());
    rig.at(110);
    assert!(!rig.relay_on(), "a shorter command shortens the activation");
}

#[test]
fn zero_duration_stops_an_activation() {
    let rig = Rig::new();
    rig.command(5_000);
    rig.at(0);
    assert!(rig.relay_on());

    rig.clock.set(1_200);
    rig.command(0);
    rig.at(200);
    assert!(!rig.relay_on());
    assert!(!rig.relay.is_active(rig.clock.now_ms()));
}

#[test]
fn idle_ticks_do_not_write() {
    let rig = Rig::new();
    for ms in (0..200).step_by(10) {
        rig.at(ms);
    }
    assert!(rig.relay_pin.lock().unwrap().is_empty());
    assert!(rig.indicator_pwm.lock().unwrap().is_empty());
}

// ── Indicator ─────────────────────────────────────────────────

#[test]
fn indicator_fades_and_is_gated_by_activity_pulse() {
    let rig = Rig::new();
    rig.command(1_000);

    rig.at(0);
    assert_eq!(rig.duty(), MOCK_MAX_DUTY);
    rig.at(50);
    // 1023 · (950/1000)³
    assert_eq!(rig.duty(), 877);
    rig.at(99);
    assert!(rig.duty() > 0);
    rig.at(100);
    assert_eq!(rig.duty(), 0, "pulse closed while the fade is still running");

    // Relay is unaffected by the pulse.
    assert!(rig.relay_on());
    assert!(rig.indicator.level_at(rig.clock.now_ms()) == 0);
}

#[test]
fn short_command_fades_fully_within_pulse() {
    let rig = Rig::new();
    rig.command(40);

    let mut seen = Vec::new();
    for ms in (0..=50).step_by(10) {
        rig.at(ms);
        seen.push(rig.duty());
    }
    assert_eq!(seen.first(), Some(&MOCK_MAX_DUTY));
    assert_eq!(seen.last(), Some(&0));
    assert!(seen.windows(2).all(|w| w[1] <= w[0]), "fade is non-increasing: {seen:?}");
}

#[test]
fn repeated_commands_restart_fade_and_pulse() {
    let rig = Rig::new();
    rig.command(1_000);
    rig.at(80);
    let faded = rig.duty();
    assert!(faded < MOCK_MAX_DUTY);

    rig.clock.set(1_090);
    rig.command(1_000);
    rig.at(90);
    assert_eq!(rig.duty(), MOCK_MAX_DUTY);
    rig.at(180);
    assert!(rig.duty() > 0, "pulse reopened at 90 ms, closes at 190 ms");
    rig.at(190);
    assert_eq!(rig.duty(), 0);
}

// ── Bank status / supervision ────────────────────────────────

#[test]
fn status_reports_each_channel() {
    let rig = Rig::new();
    rig.command(300);
    rig.at(50);

    let status = rig.bank.status(rig.clock.now_ms());
    assert_eq!(status.len(), 2);
    assert_eq!(status[0].name, "relay");
    assert!(status[0].active);
    assert_eq!(status[0].remaining_ms, 250);
    assert_eq!(status[1].name, "indicator");
    assert!(status[1].active);
    assert_eq!(status[1].remaining_ms, 50, "bounded by the pulse");
}

#[test]
fn status_shows_pulse_for_command_shorter_than_it() {
    let rig = Rig::new();
    rig.command(0);

    let status = rig.bank.status(rig.clock.now_ms());
    assert!(!status[0].active && !status[0].pulse, "relay has no pulse");
    assert!(!status[1].active);
    assert!(status[1].pulse);

    rig.at(100);
    assert!(!rig.bank.status(rig.clock.now_ms())[1].pulse);
}

#[test]
fn supervisor_flags_only_the_silent_evaluator() {
    let rig = Rig::new();
    let mut supervisor = EvaluatorSupervisor::new(100);
    supervisor.watch(rig.relay_eval.heartbeat()).unwrap();
    supervisor.watch(rig.indicator_eval.heartbeat()).unwrap();

    rig.at(50);
    assert!(supervisor.healthy(rig.clock.now_ms()));

    // Only the relay keeps ticking.
    rig.clock.set(1_300);
    rig.relay_eval.step().unwrap();
    let stalls = supervisor.check(rig.clock.now_ms());
    assert_eq!(stalls.len(), 1);
    assert_eq!(stalls[0].channel, "indicator");
    assert_eq!(stalls[0].silent_ms, 250);
}

// ── Concurrency ───────────────────────────────────────────────

#[test]
fn concurrent_extends_and_ticks_stay_consistent() {
    let rig = Arc::new(Rig::new());
    let writers: Vec<_> = (0..4u32)
        .map(|i| {
            let rig = Arc::clone(&rig);
            std::thread::spawn(move || {
                for n in 0..500u32 {
                    rig.command(100 + (n * 7 + i) % 400);
                }
            })
        })
        .collect();

    for _ in 0..500 {
        rig.clock.advance(1);
        rig.tick();
    }
    for w in writers {
        w.join().unwrap();
    }

    // Whatever won the race, the committed outputs match the deadlines.
    let now = rig.clock.now_ms();
    rig.tick();
    assert_eq!(rig.relay.committed(), rig.relay.is_active(now));
    assert_eq!(rig.indicator.committed(), rig.indicator.level_at(now));

    // Run out every window: everything ends dark.
    rig.clock.advance(1_000);
    rig.tick();
    assert!(!rig.relay_on());
    assert_eq!(rig.duty(), 0);
}

#[test]
fn concurrent_extends_never_tear_the_deadline() {
    const HIGH: u64 = 1 << 32;
    const ROUNDS: u32 = 20_000;

    let store = Arc::new(DeadlineStore::new(0, ()));
    let writer = |base: u64| {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            for n in 0..ROUNDS {
                store.extend(base, 1 + n % 1_000);
            }
        })
    };
    // Low writer stays below 2^32, high writer above it: a torn read
    // would mix the two halves.
    let low = writer(0);
    let high = writer(HIGH);

    let mut seen = 0;
    while !(low.is_finished() && high.is_finished()) || seen == 0 {
        let dl = store.deadline();
        let until = dl.active_until();
        let from_low = (1..=1_000).contains(&until) && dl.started_at() == 0;
        let from_high = (HIGH + 1..=HIGH + 1_000).contains(&until) && dl.started_at() == HIGH;
        let initial = until == 0 && dl.started_at() == 0;
        assert!(from_low || from_high || initial, "torn deadline {dl:?}");
        seen += 1;
    }
    low.join().unwrap();
    high.join().unwrap();
}
