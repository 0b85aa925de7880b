//! Connection handler → channel bank, over a scripted transport.

use std::sync::Arc;

use netrelay::actuator::bank::ChannelBank;
use netrelay::actuator::relay::RelayChannel;
use netrelay::actuator::Channel;
use netrelay::app::events::AppEvent;
use netrelay::app::ports::Clock;
use netrelay::error::FrameError;
use netrelay::protocol::codec::{encode_command, ByteOrder, Command, Framing};
use netrelay::protocol::handler::{ConnectionHandler, HandlerContext, Termination};

use super::mock_hw::{CollectingSink, ManualClock, RecordingPin, ScriptedTransport};

struct Setup {
    relay: Arc<RelayChannel<RecordingPin>>,
    sink: Arc<CollectingSink>,
    clock: Arc<ManualClock>,
    ctx: HandlerContext,
}

fn setup(byte_order: ByteOrder, framing: Framing) -> Setup {
    let clock = ManualClock::at(10_000);
    let (pin, _) = RecordingPin::new();
    let relay = Arc::new(RelayChannel::new("relay", pin, 10_000));
    let mut bank = ChannelBank::new();
    bank.push(relay.clone()).unwrap();
    let sink = CollectingSink::new();
    let ctx = HandlerContext {
        bank: Arc::new(bank),
        clock: clock.clone(),
        events: sink.clone(),
        byte_order,
        framing,
    };
    Setup {
        relay,
        sink,
        clock,
        ctx,
    }
}

fn frame(ms: u32, order: ByteOrder) -> [u8; 4] {
    encode_command(Command { duration_ms: ms }, order)
}

fn accepted(sink: &CollectingSink) -> Vec<u32> {
    sink.snapshot()
        .into_iter()
        .filter_map(|e| match e {
            AppEvent::CommandAccepted { duration_ms, .. } => Some(duration_ms),
            _ => None,
        })
        .collect()
}

#[test]
fn one_frame_per_read_extends_the_bank() {
    let s = setup(ByteOrder::Native, Framing::PerRead);
    let f = frame(250, ByteOrder::Native);
    let term = ConnectionHandler::new(ScriptedTransport::chunks(&[&f]), s.ctx.clone()).run();

    assert_eq!(term, Termination::PeerClosed);
    assert_eq!(accepted(&s.sink), vec![250]);
    assert!(s.relay.is_active(10_249));
    assert!(!s.relay.is_active(10_250));
}

#[test]
fn wrong_length_read_is_dropped_without_side_effects() {
    let s = setup(ByteOrder::Native, Framing::PerRead);
    let eight = [frame(100, ByteOrder::Native), frame(200, ByteOrder::Native)].concat();
    ConnectionHandler::new(ScriptedTransport::chunks(&[&[1, 2, 3], &eight]), s.ctx.clone()).run();

    assert!(accepted(&s.sink).is_empty());
    assert!(!s.relay.is_active(s.clock.now_ms()));
    let rejected: Vec<_> = s
        .sink
        .snapshot()
        .into_iter()
        .filter_map(|e| match e {
            AppEvent::FrameRejected { error, .. } => Some(error),
            _ => None,
        })
        .collect();
    assert_eq!(
        rejected,
        vec![
            FrameError::BadLength { got: 3, expected: 4 },
            FrameError::BadLength { got: 8, expected: 4 },
        ]
    );
}

#[test]
fn bad_frame_does_not_end_the_connection() {
    let s = setup(ByteOrder::Native, Framing::PerRead);
    let good = frame(500, ByteOrder::Native);
    ConnectionHandler::new(ScriptedTransport::chunks(&[&[9; 5], &good]), s.ctx.clone()).run();
    assert_eq!(accepted(&s.sink), vec![500]);
}

#[test]
fn big_endian_configuration() {
    let s = setup(ByteOrder::Big, Framing::PerRead);
    ConnectionHandler::new(ScriptedTransport::chunks(&[&[0, 0, 0x01, 0xF4]]), s.ctx.clone()).run();
    assert_eq!(accepted(&s.sink), vec![500]);
}

#[test]
fn stream_framing_reassembles_split_and_coalesced_frames() {
    let s = setup(ByteOrder::Little, Framing::Stream);
    let a = frame(100, ByteOrder::Little);
    let b = frame(200, ByteOrder::Little);
    let c = frame(300, ByteOrder::Little);
    let ab = [a, b].concat();
    ConnectionHandler::new(
        ScriptedTransport::chunks(&[&ab, &c[..1], &c[1..3], &c[3..], &[0xAA, 0xBB]]),
        s.ctx.clone(),
    )
    .run();

    assert_eq!(accepted(&s.sink), vec![100, 200, 300]);
    assert_eq!(s.sink.count(|e| matches!(e, AppEvent::FrameRejected { .. })), 0);
}

#[test]
fn later_command_from_another_connection_wins() {
    let s = setup(ByteOrder::Native, Framing::PerRead);
    let long = frame(5_000, ByteOrder::Native);
    ConnectionHandler::new(ScriptedTransport::chunks(&[&long]), s.ctx.clone()).run();

    s.clock.advance(100);
    let short = frame(50, ByteOrder::Native);
    ConnectionHandler::new(ScriptedTransport::chunks(&[&short]), s.ctx.clone()).run();

    assert!(s.relay.is_active(10_149));
    assert!(!s.relay.is_active(10_150));
}

#[test]
fn io_error_terminates_and_is_reported() {
    let s = setup(ByteOrder::Native, Framing::PerRead);
    let f = frame(10, ByteOrder::Native);
    let transport = ScriptedTransport::new(vec![Ok(f.to_vec()), Err("connection reset".into())]);
    let term = ConnectionHandler::new(transport, s.ctx.clone()).run();

    assert!(matches!(&term, Termination::IoError(msg) if msg.as_str() == "connection reset"));
    let last = s.sink.snapshot().pop().unwrap();
    assert!(matches!(last, AppEvent::ClientDisconnected { termination, .. } if termination == term));
    assert_eq!(accepted(&s.sink), vec![10]);
}
