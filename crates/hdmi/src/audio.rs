//! Audio sample packets (HDMI 1.4 §5.3.4, IEC 60958 subframes).
//!
//! Each subpacket carries one stereo frame: 24-bit left and right samples
//! (16-bit PCM in the top two bytes) followed by the validity, user,
//! channel-status and parity bits of both subframes.

use crate::infoframe::TYPE_AUDIO_SAMPLE;
use crate::packet::DataPacket;

/// Frames per IEC 60958 channel-status block.
pub const BLOCK_FRAMES: u8 = 192;

/// Stereo frames per audio sample packet.
pub const MAX_FRAMES_PER_PACKET: usize = 4;

/// Even parity bit over a 16-bit sample and its V/U/C bits.
#[inline]
fn subframe_parity(sample: i16, vuc: u8) -> u8 {
    ((sample as u16).count_ones() + u32::from(vuc).count_ones()) as u8 & 1
}

/// Build an audio sample packet from up to four stereo frames.
///
/// `block_pos` is the IEC 60958 block position of the first frame; the
/// returned value is the position after this packet. The block-start flag is
/// raised on whichever subpacket lands on position 0.
///
/// Frames beyond the fourth are ignored. An empty slice yields a packet with
/// no samples present, which sinks treat as a gap.
#[allow(clippy::arithmetic_side_effects)] // Safety: k < 4, block_pos < 192; sums stay far below u8/usize limits
#[allow(clippy::indexing_slicing)] // Safety: zip bounds k by subpackets.len() == 4
pub fn audio_sample_packet(frames: &[[i16; 2]], block_pos: u8) -> (DataPacket, u8) {
    let count = frames.len().min(MAX_FRAMES_PER_PACKET);
    let block_pos = block_pos % BLOCK_FRAMES;

    let present = (1u8 << count) - 1;
    let mut block_start = 0u8;
    for k in 0..count {
        if (usize::from(block_pos) + k) % usize::from(BLOCK_FRAMES) == 0 {
            block_start |= 1 << k;
        }
    }

    // Layout 0 (2 channel), sample_present, B.X flags; sample_flat all clear.
    let mut p = DataPacket::with_header(TYPE_AUDIO_SAMPLE, present, block_start << 4);
    p.compute_header_parity();

    let vuc = 0u8; // valid, no user data, no channel status
    for (sp, &[l, r]) in p.subpackets.iter_mut().zip(frames.iter().take(count)) {
        let [l0, l1] = l.to_le_bytes();
        let [r0, r1] = r.to_le_bytes();
        sp[0] = 0;
        sp[1] = l0;
        sp[2] = l1;
        sp[3] = 0;
        sp[4] = r0;
        sp[5] = r1;
        sp[6] = vuc | subframe_parity(l, vuc) << 3 | vuc << 4 | subframe_parity(r, vuc) << 7;
    }
    p.compute_subpacket_parity();

    let next = ((usize::from(block_pos) + count) % usize::from(BLOCK_FRAMES)) as u8;
    (p, next)
}
