//! Property-based tests for the audio path.
//! Scheduler firing rate per video frame.

// Test files legitimately use arithmetic and indexing for verification.
#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::unwrap_used)]

use playback::{AudioClock, PacketScheduler};
use proptest::prelude::*;

const RATES: [u32; 5] = [32_000, 44_100, 48_000, 88_200, 96_000];

/// Run one video frame of `v_total` eligible lines. Returns (packets, frames).
fn run_frame(scheduler: &mut PacketScheduler, v_total: u32) -> (u32, u32) {
    scheduler.start_frame();
    let mut packets = 0;
    let mut frames = 0;
    for _ in 0..v_total {
        if let Some(n) = scheduler.tick() {
            packets += 1;
            frames += u32::from(n);
        }
    }
    (packets, frames)
}

proptest::proptest! {
    #[test]
    fn prop_firings_per_frame_track_packet_rate(
        (rate, h_total, v_total, line_rate) in
            (0..RATES.len(), 400u32..2_000, 262u32..1_200, 31_500u32..90_000),
    ) {
        // At most ~3 samples per line, so one packet per line always suffices.
        let clock = AudioClock::new(RATES[rate], h_total * line_rate, h_total, v_total).unwrap();
        let ppf = u64::from(clock.packets_per_frame());
        let mut scheduler = PacketScheduler::new(clock.add, None);
        for _ in 0..8 {
            let (packets, _) = run_frame(&mut scheduler, v_total);
            let scaled = u64::from(packets) << 16;
            prop_assert!(scaled + (1 << 16) >= ppf, "{packets} packets for ppf {ppf}");
            prop_assert!(scaled <= ppf + u64::from(v_total) + (1 << 16), "{packets} packets for ppf {ppf}");
        }
    }

    #[test]
    fn prop_framesync_is_identical_every_frame(
        (rate, v_total) in (0..RATES.len(), 262u32..1_200),
        h_tens in 40u32..200,
    ) {
        // Pick the pixel clock that yields exactly 1000 samples per frame.
        let h_total = h_tens * 10;
        let pixel_clock = RATES[rate] / 100 * h_total / 10 * v_total;
        let clock = AudioClock::new(RATES[rate], pixel_clock, h_total, v_total).unwrap();
        let reload = clock.framesync_samples();
        prop_assert_eq!(reload, Some(1_000));

        let mut scheduler = PacketScheduler::new(clock.add, reload);
        let first = run_frame(&mut scheduler, v_total);
        prop_assert!(first.1 <= 1_000);
        for _ in 0..6 {
            prop_assert_eq!(run_frame(&mut scheduler, v_total), first);
        }
    }
}
