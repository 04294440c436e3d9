//! HDMI audio path: PCM ring, packet scheduler and clock regeneration
//!
//! Everything here is plain state with no hardware access. The scanout driver
//! owns one instance of each and drives them from its interrupt handlers; the
//! ring splits into a reader and a writer so the refill can run at a lower
//! priority than the packet path.

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)]
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod clock;
pub mod ring_buffer;
pub mod scheduler;

pub use clock::{acr_cts, acr_n, AudioClock, ClockError};
pub use ring_buffer::{AudioRing, RefillRequest, RingError, RingReader, RingWriter};
pub use scheduler::{FrameBudget, PacketScheduler, FRAMES_PER_PACKET};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Tests use unwrap() for readable assertions
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
mod tests {
    /// Ring buffer tests
    mod ring_buffer_tests {
        use crate::ring_buffer::{AudioRing, RefillRequest, RingError};

        fn count_from(start: i16) -> impl FnOnce(&mut [i16], usize) {
            move |region, _| {
                for (i, s) in region.iter_mut().enumerate() {
                    *s = start + i as i16;
                }
            }
        }

        #[test]
        fn test_ring_rejects_bad_sizes() {
            let mut empty: [i16; 0] = [];
            assert_eq!(AudioRing::new(&mut empty).err(), Some(RingError::BadSize { frames: 0 }));
            let mut six = [0i16; 12];
            assert_eq!(AudioRing::new(&mut six).err(), Some(RingError::BadSize { frames: 6 }));
            let mut eight = [0i16; 16];
            assert!(AudioRing::new(&mut eight).is_ok());
        }

        #[test]
        fn test_prime_fills_whole_ring() {
            let mut buf = [0i16; 32];
            let mut ring = AudioRing::new(&mut buf).unwrap();
            ring.prime(count_from(0));
            assert_eq!(ring.available(), 16);
            assert!(!ring.in_flight());

            let mut out = [[0i16; 2]; 4];
            assert_eq!(ring.reader().read_frames(&mut out), 4);
            assert_eq!(out, [[0, 1], [2, 3], [4, 5], [6, 7]]);
            assert_eq!(ring.available(), 12);
        }

        #[test]
        fn test_grant_is_invisible_until_next_read() {
            let mut buf = [0i16; 32];
            let mut ring = AudioRing::new(&mut buf).unwrap();
            ring.prime(count_from(0));
            let (mut reader, mut writer) = ring.split();
            let mut out = [[0i16; 2]; 4];
            reader.read_frames(&mut out);
            reader.read_frames(&mut out);
            assert!(reader.poll_refill());
            assert!(writer.refill(count_from(100)));
            assert_eq!(reader.available(), 8);

            reader.read_frames(&mut out);
            assert_eq!(reader.available(), 12);
            assert!(!reader.in_flight());
        }

        #[test]
        fn test_refill_posted_once_at_half() {
            let mut buf = [0i16; 32];
            let mut ring = AudioRing::new(&mut buf).unwrap();
            ring.prime(count_from(0));
            let (mut reader, mut writer) = ring.split();
            let mut out = [[0i16; 2]; 4];

            reader.read_frames(&mut out);
            assert!(!reader.poll_refill(), "12 of 16 frames left");
            reader.read_frames(&mut out);
            assert!(reader.poll_refill(), "8 of 16 frames left");
            assert!(!reader.poll_refill(), "request already outstanding");

            let request = writer.take_request().unwrap();
            assert_eq!(request, RefillRequest { offset: 0, frames: 8 });
            assert!(writer.take_request().is_none());
        }

        #[test]
        fn test_no_second_request_while_first_is_filling() {
            let mut buf = [0i16; 32];
            let mut ring = AudioRing::new(&mut buf).unwrap();
            ring.prime(count_from(0));
            let (mut reader, mut writer) = ring.split();
            let mut out = [[0i16; 2]; 4];
            reader.read_frames(&mut out);
            reader.read_frames(&mut out);
            assert!(reader.poll_refill());
            assert_eq!(writer.take_request(), Some(RefillRequest { offset: 0, frames: 8 }));

            // The packet path keeps draining while the refill is half done.
            let region = writer.region_mut().unwrap();
            region[..4].copy_from_slice(&[-1, -2, -3, -4]);
            assert_eq!(reader.read_frames(&mut out), 4);
            assert_eq!(out, [[16, 17], [18, 19], [20, 21], [22, 23]]);
            assert!(!reader.poll_refill(), "refill still in flight");
            assert!(reader.in_flight());
            region[4..].fill(-5);
            assert!(writer.take_request().is_none());

            assert!(writer.grant());
            assert!(!writer.grant());
            assert_eq!(reader.read_frames(&mut out), 4);
            assert_eq!(out, [[24, 25], [26, 27], [28, 29], [30, 31]]);
            assert_eq!(reader.available(), 8);
            assert_eq!(reader.write_cursor(), 8);
            assert_eq!(reader.read_frames(&mut out[..1]), 1);
            assert_eq!(out[0], [-1, -2]);
        }

        #[test]
        fn test_reads_wrap_across_ring_end() {
            let mut buf = [0i16; 16];
            let mut ring = AudioRing::new(&mut buf).unwrap();
            ring.prime(count_from(100));
            let (mut reader, mut writer) = ring.split();
            let mut out = [[0i16; 2]; 4];
            reader.read_frames(&mut out);
            assert!(reader.poll_refill());
            assert!(writer.refill(count_from(-100)));
            reader.read_frames(&mut out[..2]);

            // 2 old frames at the end, then 2 refilled frames from the start.
            assert_eq!(reader.read_frames(&mut out), 4);
            assert_eq!(out, [[112, 113], [114, 115], [-100, -99], [-98, -97]]);
        }

        #[test]
        fn test_underrun_leaves_tail_untouched() {
            let mut buf = [0i16; 16];
            let mut ring = AudioRing::new(&mut buf).unwrap();
            let mut out = [[7i16; 2]; 4];
            assert_eq!(ring.reader().read_frames(&mut out), 0);
            assert_eq!(out, [[7, 7]; 4]);
        }

        #[test]
        fn test_reset_drops_request_in_flight() {
            let mut buf = [0i16; 16];
            let mut ring = AudioRing::new(&mut buf).unwrap();
            ring.prime(count_from(0));
            {
                let (mut reader, mut writer) = ring.split();
                let mut out = [[0i16; 2]; 4];
                reader.read_frames(&mut out);
                assert!(reader.poll_refill());
                writer.take_request().unwrap();
            }
            ring.reset();
            assert!(!ring.in_flight());
            assert!(ring.writer().region_mut().is_none());
        }
    }

    /// Packet scheduler tests
    mod scheduler_tests {
        use crate::scheduler::PacketScheduler;

        #[test]
        fn test_fires_on_carry() {
            let mut s = PacketScheduler::new(0x8000, None);
            assert_eq!(s.acc(), 0x8000);
            assert_eq!(s.tick(), Some(4));
            assert_eq!(s.acc(), 0);
            assert_eq!(s.tick(), None);
            assert_eq!(s.tick(), Some(4));
        }

        #[test]
        fn test_framesync_budget_caps_frames() {
            let mut s = PacketScheduler::new(0xFFFF, Some(6));
            assert_eq!(s.tick(), Some(4));
            assert_eq!(s.tick(), Some(2));
            assert_eq!(s.tick(), Some(0));
            s.start_frame();
            assert_eq!(s.budget().unwrap().remaining, 6);
            assert_eq!(s.acc(), 0xFFFF);
        }

        #[test]
        fn test_free_running_keeps_phase_across_frames() {
            let mut s = PacketScheduler::new(0x5000, None);
            s.tick();
            let acc = s.acc();
            s.start_frame();
            assert_eq!(s.acc(), acc);
        }
    }

    /// Clock regeneration tests
    mod clock_tests {
        use crate::clock::{acr_n, AudioClock, ClockError};

        #[test]
        fn test_acr_n_recommended_values() {
            assert_eq!(acr_n(32_000), Ok(4096));
            assert_eq!(acr_n(44_100), Ok(6272));
            assert_eq!(acr_n(48_000), Ok(6144));
            assert_eq!(acr_n(88_200), Ok(12_544));
            assert_eq!(acr_n(96_000), Ok(12_288));
            assert_eq!(acr_n(22_050), Err(ClockError::UnsupportedRate { rate: 22_050 }));
        }

        #[test]
        fn test_640x480_at_48k_is_framesync() {
            let clock = AudioClock::new(48_000, 25_200_000, 800, 525).unwrap();
            assert_eq!(clock.n, 6144);
            assert_eq!(clock.cts, 25_200);
            assert_eq!(clock.samples_per_frame, 800 << 16);
            assert_eq!(clock.add, 24_967);
            assert_eq!(clock.framesync_samples(), Some(800));
        }

        #[test]
        fn test_640x480_at_44k1() {
            let clock = AudioClock::new(44_100, 25_200_000, 800, 525).unwrap();
            assert_eq!(clock.n, 6272);
            assert_eq!(clock.cts, 28_000);
            assert_eq!(clock.samples_per_frame, 735 << 16);
            assert_eq!(clock.add, 22_938);
            assert_eq!(clock.framesync_samples(), Some(735));
        }

        #[test]
        fn test_27mhz_frame_is_fractional() {
            let clock = AudioClock::new(48_000, 27_000_000, 858, 525).unwrap();
            assert_eq!(clock.framesync_samples(), None);
            assert!(clock.packets_per_frame() > 200 << 16);
        }

        #[test]
        fn test_zero_clock_rejected() {
            assert_eq!(AudioClock::new(48_000, 0, 800, 525), Err(ClockError::ZeroClock));
        }

        #[test]
        fn test_rate_too_high_for_line_rate() {
            // 192 kHz over 16 lines needs more than one packet per line.
            assert_eq!(
                AudioClock::new(192_000, 25_200_000, 800, 16).err(),
                Some(ClockError::RateTooHigh { rate: 192_000 })
            );
        }
    }
}
