//! Whole device over real TCP: listener, handlers, evaluator threads and
//! mock outputs, on an ephemeral port with the host clock.

use std::io::Write;
use std::net::{Ipv4Addr, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use netrelay::adapters::time::MonotonicClock;
use netrelay::app::events::{AppEvent, RejectReason};
use netrelay::app::service::DeviceService;
use netrelay::config::SystemConfig;
use netrelay::protocol::codec::{encode_command, ByteOrder, Command};

use super::mock_hw::{last, CollectingSink, RecordingPin, RecordingPwm};

struct Device {
    service: DeviceService,
    relay: Arc<Mutex<Vec<bool>>>,
    indicator: Arc<Mutex<Vec<u16>>>,
    sink: Arc<CollectingSink>,
}

fn start(max_connections: u8) -> Device {
    let config = SystemConfig {
        server_port: 0,
        max_connections,
        activity_pulse_ms: 100,
        ..SystemConfig::default()
    };
    let (pin, relay) = RecordingPin::new();
    let (pwm, indicator) = RecordingPwm::new();
    let sink = CollectingSink::new();
    let service = DeviceService::start(
        &config,
        pin,
        pwm,
        Arc::new(MonotonicClock::new()),
        sink.clone(),
    )
    .unwrap();
    Device {
        service,
        relay,
        indicator,
        sink,
    }
}

fn connect(port: u16) -> TcpStream {
    let stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
    stream.set_nodelay(true).unwrap();
    stream
}

fn wait_until(what: &str, timeout_ms: u64, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn tcp_command_drives_both_outputs() {
    let dev = start(4);
    assert!(dev
        .sink
        .snapshot()
        .iter()
        .any(|e| matches!(e, AppEvent::Started { port, channels: 2 } if *port == dev.service.port())));

    let mut client = connect(dev.service.port());
    client
        .write_all(&encode_command(Command { duration_ms: 500 }, ByteOrder::Native))
        .unwrap();
    let sent = Instant::now();

    wait_until("relay on", 300, || last(&dev.relay));
    wait_until("indicator lit", 300, || {
        dev.indicator.lock().unwrap().iter().any(|&d| d > 0)
    });
    wait_until("indicator dark after pulse", 400, || last(&dev.indicator) == 0);
    assert!(last(&dev.relay), "relay outlives the activity pulse");

    wait_until("relay off", 1_500, || !last(&dev.relay));
    assert!(sent.elapsed() >= Duration::from_millis(490));

    // Boot force-off, then exactly one activation.
    assert_eq!(*dev.relay.lock().unwrap(), vec![false, true, false]);

    // Fade samples never brighten within one activation.
    let duties = dev.indicator.lock().unwrap().clone();
    let lit: Vec<u16> = duties.iter().copied().skip_while(|&d| d == 0).take_while(|&d| d > 0).collect();
    assert!(lit.windows(2).all(|w| w[1] <= w[0]), "{lit:?}");
}

#[test]
fn malformed_frame_over_tcp_is_ignored() {
    let dev = start(4);
    let mut client = connect(dev.service.port());
    client.write_all(&[0x10, 0x27, 0x00]).unwrap();

    wait_until("frame rejected", 1_000, || {
        dev.sink.count(|e| matches!(e, AppEvent::FrameRejected { .. })) == 1
    });
    std::thread::sleep(Duration::from_millis(50));
    assert!(!dev.relay.lock().unwrap().contains(&true));
}

#[test]
fn connections_beyond_capacity_are_refused() {
    let dev = start(1);
    let _first = connect(dev.service.port());
    wait_until("first admitted", 1_000, || {
        dev.sink.count(|e| matches!(e, AppEvent::ClientConnected { .. })) == 1
    });
    assert_eq!(dev.service.status().connections, 1);

    let _second = connect(dev.service.port());
    wait_until("second refused", 1_000, || {
        dev.sink.count(|e| {
            matches!(e, AppEvent::ClientRejected { reason: RejectReason::AtCapacity, .. })
        }) == 1
    });

    drop(_first);
    wait_until("slot released", 1_000, || dev.service.status().connections == 0);
}

#[test]
fn running_evaluators_keep_supervisor_healthy() {
    let mut dev = start(4);
    std::thread::sleep(Duration::from_millis(50));
    assert!(dev.service.supervise());
    assert_eq!(dev.sink.count(|e| matches!(e, AppEvent::EvaluatorStalled { .. })), 0);

    dev.service.report_status();
    let status = dev
        .sink
        .snapshot()
        .into_iter()
        .find_map(|e| match e {
            AppEvent::Status(s) => Some(s),
            _ => None,
        })
        .unwrap();
    assert_eq!(status.channels.len(), 2);
    assert!(status.channels.iter().all(|c| !c.active));
}
