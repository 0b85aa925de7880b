//! Fuzz target: command decoding and stream reassembly
//!
//! Drives arbitrary byte sequences through both framing modes and checks
//! that they never panic, that per-read decoding accepts exactly 4-byte
//! reads, and that stream framing is independent of how the bytes were
//! split across reads.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use netrelay::protocol::codec::{decode_command, ByteOrder, StreamFramer, COMMAND_LEN};

fuzz_target!(|data: &[u8]| {
    for order in [ByteOrder::Native, ByteOrder::Little, ByteOrder::Big] {
        let decoded = decode_command(data, order);
        assert_eq!(decoded.is_ok(), data.len() == COMMAND_LEN);
    }

    // First byte picks a split point; the rest is the stream.
    let Some((&split, stream)) = data.split_first() else {
        return;
    };
    let cut = usize::from(split) % (stream.len() + 1);

    let mut whole = Vec::new();
    StreamFramer::new().feed(stream, |f| whole.push(f));

    let mut framer = StreamFramer::new();
    let mut pieces = Vec::new();
    framer.feed(&stream[..cut], |f| pieces.push(f));
    framer.feed(&stream[cut..], |f| pieces.push(f));

    assert_eq!(whole, pieces);
    assert_eq!(whole.len(), stream.len() / COMMAND_LEN);
    assert!(framer.pending() < COMMAND_LEN);

    framer.reset();
    assert_eq!(framer.pending(), 0);
});
