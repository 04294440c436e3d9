//! HDMI data packet layout.

use thiserror_no_std::Error;

use crate::bch;

/// Errors from packet and island encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// An island needs between one and [`MAX_ISLAND_PACKETS`](crate::island::MAX_ISLAND_PACKETS) packets.
    #[error("data island packet count out of range: {count}")]
    PacketCount {
        /// Requested packet count.
        count: usize,
    },
    /// The destination cannot hold the encoded island.
    #[error("buffer too small: need {needed} words, have {available}")]
    BufferTooSmall {
        /// Words required.
        needed: usize,
        /// Words available.
        available: usize,
    },
}

/// One HDMI data packet: a 4-byte header (3 bytes + BCH parity) and four
/// 8-byte subpackets (7 bytes + BCH parity each).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataPacket {
    /// `HB0..HB2` plus parity in byte 3.
    pub header: [u8; 4],
    /// `SB0..SB6` plus parity in byte 7, for subpackets 0 to 3.
    pub subpackets: [[u8; 8]; 4],
}

impl DataPacket {
    /// The null packet (packet type 0, all zero).
    pub const NULL: Self = Self {
        header: [0; 4],
        subpackets: [[0; 8]; 4],
    };

    /// Packet with the given header bytes and zero payload; parity not yet computed.
    pub const fn with_header(hb0: u8, hb1: u8, hb2: u8) -> Self {
        Self {
            header: [hb0, hb1, hb2, 0],
            subpackets: [[0; 8]; 4],
        }
    }

    /// Recompute the header parity byte.
    pub fn compute_header_parity(&mut self) {
        let [hb0, hb1, hb2, _] = self.header;
        self.header[3] = bch::header_parity(&[hb0, hb1, hb2]);
    }

    /// Recompute the parity byte of every subpacket.
    pub fn compute_subpacket_parity(&mut self) {
        for sp in &mut self.subpackets {
            let [b0, b1, b2, b3, b4, b5, b6, _] = *sp;
            sp[7] = bch::subpacket_parity(&[b0, b1, b2, b3, b4, b5, b6]);
        }
    }

    /// Recompute all parity bytes.
    pub fn compute_parity(&mut self) {
        self.compute_header_parity();
        self.compute_subpacket_parity();
    }

    /// Write the info-frame checksum into `SB0` of subpacket 0.
    ///
    /// The checksum makes the byte sum of `HB0..HB2` plus the first
    /// `length + 1` payload bytes zero, with `length` taken from `HB2`.
    /// Payload bytes are counted across subpackets, seven per subpacket.
    pub fn compute_infoframe_checksum(&mut self) {
        self.subpackets[0][0] = 0;
        let header_sum = self.header[..3]
            .iter()
            .fold(0u8, |s, &b| s.wrapping_add(b));
        let sum = self
            .subpackets
            .iter()
            .flat_map(|sp| sp.iter().take(7))
            .take(usize::from(self.header[2]).saturating_add(1))
            .fold(header_sum, |s, &b| s.wrapping_add(b));
        self.subpackets[0][0] = sum.wrapping_neg();
    }

    /// `true` if the header and every subpacket carry valid BCH parity.
    pub fn has_valid_parity(&self) -> bool {
        bch::is_codeword(&self.header) && self.subpackets.iter().all(|sp| bch::is_codeword(sp))
    }

    /// Copy subpacket 0 into subpackets 1 to 3.
    pub(crate) fn replicate_subpacket0(&mut self) {
        let sp0 = self.subpackets[0];
        for sp in self.subpackets.iter_mut().skip(1) {
            *sp = sp0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_packet_has_valid_parity() {
        assert!(DataPacket::NULL.has_valid_parity());
    }

    #[test]
    fn checksum_zeroes_the_byte_sum() {
        let mut p = DataPacket::with_header(0x82, 2, 13);
        p.subpackets[0][1] = 0x10;
        p.subpackets[0][2] = 0x18;
        p.subpackets[0][4] = 1;
        p.subpackets[1][0] = 0x55; // byte 7 of the payload, inside the length
        p.compute_infoframe_checksum();
        let mut sum = 0x82u8.wrapping_add(2).wrapping_add(13);
        for (i, b) in p.subpackets.iter().flat_map(|sp| sp.iter().take(7)).enumerate() {
            if i <= 13 {
                sum = sum.wrapping_add(*b);
            }
        }
        assert_eq!(sum, 0);
    }

    #[test]
    fn corrupting_a_byte_breaks_parity() {
        let mut p = DataPacket::with_header(0x84, 1, 10);
        p.subpackets[2][3] = 0x5a;
        p.compute_parity();
        assert!(p.has_valid_parity());
        p.subpackets[2][3] ^= 0x04;
        assert!(!p.has_valid_parity());
    }
}
