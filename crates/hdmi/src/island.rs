//! Data-island word streams.
//!
//! An island is a leading guard band, one or more 32-period packets and a
//! trailing guard band. Each serializer word carries one pixel period for all
//! three lanes (10 bits each, lane 0 in the low bits).
//!
//! ```text
//! | guard (2) | packet 0 (32) | ... | packet n-1 (32) | guard (2) |
//! ```
//!
//! The data-island preamble (8 periods of control symbols) precedes the island
//! but is emitted by the caller as a repeated control word.

use crate::packet::{DataPacket, PacketError};
use crate::terc4::{self, LANE1_SHIFT, LANE2_SHIFT};

/// Guard band length in pixel periods.
pub const W_GUARDBAND: usize = 2;
/// Preamble length in pixel periods.
pub const W_PREAMBLE: usize = 8;
/// Packet length in pixel periods.
pub const W_DATA_PACKET: usize = 32;
/// Largest number of packets placed in a single island.
pub const MAX_ISLAND_PACKETS: usize = 4;

/// Serializer words of an island carrying `packets` packets.
#[allow(clippy::arithmetic_side_effects)] // Safety: callers pass at most MAX_ISLAND_PACKETS
pub const fn island_words(packets: usize) -> usize {
    2 * W_GUARDBAND + W_DATA_PACKET * packets
}

/// Lane 0 of one packet: header bits with the line's sync levels.
///
/// D3 is clear only on the very first period of the island.
#[allow(clippy::indexing_slicing)] // Safety: dst is exactly W_DATA_PACKET words; 4 × 8 periods
fn encode_header(header: &[u8; 4], dst: &mut [u32; W_DATA_PACKET], hv: u32, first: bool) {
    let hv1 = hv | 0b1000;
    let mut hv0 = if first { hv } else { hv1 };
    for (byte, out) in header.iter().zip(dst.chunks_exact_mut(8)) {
        let h = u32::from(*byte) << 2;
        for (bit, word) in out.iter_mut().enumerate() {
            let d2 = (h >> bit) & 0b100;
            *word = terc4::symbol(hv0 | d2);
            hv0 = hv1;
        }
    }
}

/// Lanes 1 and 2 of one packet.
///
/// Period `4i + k` of lane 1 carries bit `2k` of byte `i` of each of the
/// four subpackets; lane 2 carries bit `2k + 1`. The byte column across the
/// four subpackets is bit-transposed in one 32-bit word so each nibble can
/// be looked up directly.
fn encode_subpackets(subpackets: &[[u8; 8]; 4], dst: &mut [u32; W_DATA_PACKET]) {
    for (i, out) in dst.chunks_exact_mut(4).enumerate() {
        let column = |sp: usize| u32::from(subpackets.get(sp).and_then(|s| s.get(i)).copied().unwrap_or(0));
        let mut v = column(0) | column(1) << 8 | column(2) << 16 | column(3) << 24;
        let t = (v ^ (v >> 7)) & 0x00aa_00aa;
        v = v ^ t ^ (t << 7);
        let t = (v ^ (v >> 14)) & 0x0000_cccc;
        v = v ^ t ^ (t << 14);
        let lanes = [(v, v >> 8), (v >> 16, v >> 24), (v >> 4, v >> 12), (v >> 20, v >> 28)];
        for (word, (l1, l2)) in out.iter_mut().zip(lanes) {
            *word |= terc4::symbol(l1) << LANE1_SHIFT | terc4::symbol(l2) << LANE2_SHIFT;
        }
    }
}

/// Encode a single packet's 32 periods.
pub fn encode_packet(packet: &DataPacket, dst: &mut [u32; W_DATA_PACKET], hv: u8, first: bool) {
    encode_header(&packet.header, dst, u32::from(hv & 0b11), first);
    encode_subpackets(&packet.subpackets, dst);
}

/// Encode `packets` as one data island into `dst`.
///
/// `hv` carries the H (bit 0) and V (bit 1) sync levels that lane 0 must keep
/// signalling for the island's duration. Returns the number of words written,
/// always [`island_words`]`(packets.len())`.
pub fn encode_data_island(dst: &mut [u32], packets: &[DataPacket], hv: u8) -> Result<usize, PacketError> {
    if packets.is_empty() || packets.len() > MAX_ISLAND_PACKETS {
        return Err(PacketError::PacketCount {
            count: packets.len(),
        });
    }
    let needed = island_words(packets.len());
    let available = dst.len();
    let Some(out) = dst.get_mut(..needed) else {
        return Err(PacketError::BufferTooSmall { needed, available });
    };

    let guard = terc4::guard_band_word(hv);
    let (lead, rest) = out.split_at_mut(W_GUARDBAND);
    lead.fill(guard);
    let (body, trail) = rest.split_at_mut(W_DATA_PACKET * packets.len());
    trail.fill(guard);

    for (i, (packet, chunk)) in packets.iter().zip(body.chunks_exact_mut(W_DATA_PACKET)).enumerate() {
        if let Ok(words) = <&mut [u32; W_DATA_PACKET]>::try_from(chunk) {
            encode_packet(packet, words, hv, i == 0);
        }
    }
    Ok(needed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terc4::SYMBOLS;

    #[test]
    fn island_is_framed_by_guard_bands() {
        let mut dst = [0u32; 40];
        let n = encode_data_island(&mut dst, &[DataPacket::NULL], 0b11).unwrap_or(0);
        assert_eq!(n, 36);
        let guard = terc4::guard_band_word(0b11);
        assert_eq!(&dst[..2], &[guard, guard]);
        assert_eq!(&dst[34..36], &[guard, guard]);
        assert_eq!(dst[36], 0);
    }

    #[test]
    fn only_first_period_clears_d3() {
        let mut dst = [0u32; island_words(2)];
        let _ = encode_data_island(&mut dst, &[DataPacket::NULL; 2], 0b01);
        assert_eq!(dst[2] & 0x3ff, SYMBOLS[0b0001] as u32);
        assert_eq!(dst[3] & 0x3ff, SYMBOLS[0b1001] as u32);
        // first period of the second packet keeps D3 set
        assert_eq!(dst[34] & 0x3ff, SYMBOLS[0b1001] as u32);
    }

    #[test]
    fn header_bits_land_in_d2() {
        let mut p = DataPacket::NULL;
        p.header[0] = 0b0000_0010;
        let mut dst = [0u32; W_DATA_PACKET];
        encode_packet(&p, &mut dst, 0, false);
        assert_eq!(dst[0] & 0x3ff, SYMBOLS[0b1000] as u32);
        assert_eq!(dst[1] & 0x3ff, SYMBOLS[0b1100] as u32);
    }

    #[test]
    fn rejects_bad_counts_and_short_buffers() {
        let mut dst = [0u32; 200];
        assert_eq!(
            encode_data_island(&mut dst, &[], 0),
            Err(PacketError::PacketCount { count: 0 })
        );
        assert_eq!(
            encode_data_island(&mut dst, &[DataPacket::NULL; 5], 0),
            Err(PacketError::PacketCount { count: 5 })
        );
        assert_eq!(
            encode_data_island(&mut dst[..35], &[DataPacket::NULL], 0),
            Err(PacketError::BufferTooSmall {
                needed: 36,
                available: 35
            })
        );
    }
}
