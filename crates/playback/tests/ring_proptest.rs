//! Property-based tests for the PCM ring handshake.
//! Random interleavings of the reader (packet path) and the writer (refill).

// Test files legitimately use arithmetic and indexing for verification.
#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::unwrap_used)]

use playback::{AudioRing, RefillRequest};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    /// Packet path consumes up to n frames.
    Read(usize),
    /// Packet path checks the watermark.
    Poll,
    /// Refill interrupt picks up the request.
    Take,
    /// Refill interrupt writes the region it took.
    Fill,
    /// Refill interrupt hands the region back.
    Grant,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize..=4).prop_map(Op::Read),
        2 => Just(Op::Poll),
        1 => Just(Op::Take),
        1 => Just(Op::Fill),
        1 => Just(Op::Grant),
    ]
}

fn stamp(region: &mut [i16], produced: &mut i16) {
    for s in region.chunks_exact_mut(2) {
        s[0] = *produced;
        s[1] = !*produced;
        *produced = produced.wrapping_add(1);
    }
}

/// `true` if frame `f` lies in `[start, start + len)` modulo `size`.
fn covers(start: usize, len: usize, f: usize, size: usize) -> bool {
    (f + size - start) % size < len
}

proptest::proptest! {
    #[test]
    fn prop_interleaved_refills_preserve_order(
        quarter in 1usize..16,
        ops in proptest::collection::vec(op(), 1..600),
    ) {
        let frames = quarter * 4;
        let mut buf = vec![0i16; frames * 2];
        let mut ring = AudioRing::new(&mut buf).unwrap();
        let mut produced = 0i16;
        ring.prime(|region, _| stamp(region, &mut produced));
        let mut expected = 0i16;

        let (mut reader, mut writer) = ring.split();
        let mut taken: Option<RefillRequest> = None;
        let mut filled = false;
        let mut posted = false;

        for op in ops {
            match op {
                Op::Read(want) => {
                    let mut out = [[0i16; 2]; 4];
                    let n = reader.read_frames(&mut out[..want]);
                    for frame in &out[..n] {
                        prop_assert_eq!(*frame, [expected, !expected]);
                        expected = expected.wrapping_add(1);
                    }
                }
                Op::Poll => {
                    if reader.poll_refill() {
                        prop_assert!(!posted && taken.is_none(), "second request posted while one is in flight");
                        prop_assert!(reader.in_flight());
                        posted = true;
                    }
                }
                Op::Take => {
                    let request = writer.take_request();
                    if posted {
                        prop_assert!(request.is_some());
                        posted = false;
                        taken = request;
                        filled = false;
                    } else {
                        prop_assert!(request.is_none(), "request taken twice");
                    }
                }
                Op::Fill => {
                    if taken.is_some() && !filled {
                        stamp(writer.region_mut().unwrap(), &mut produced);
                        filled = true;
                    }
                }
                Op::Grant => {
                    if taken.is_some() {
                        if !filled {
                            stamp(writer.region_mut().unwrap(), &mut produced);
                        }
                        prop_assert!(writer.grant());
                        taken = None;
                    } else {
                        prop_assert!(!writer.grant());
                    }
                }
            }

            let read = usize::from(reader.read_cursor());
            let write = usize::from(reader.write_cursor());
            let available = usize::from(reader.available());
            prop_assert!(available <= frames);
            prop_assert_eq!((read + available) % frames, write);
            if let Some(request) = taken {
                // The writer's region never overlaps what the reader may read.
                let start = usize::from(request.offset);
                let len = usize::from(request.frames);
                prop_assert!(available + len <= frames);
                for f in 0..available {
                    prop_assert!(!covers(start, len, (read + f) % frames, frames));
                }
            }
        }
    }
}
