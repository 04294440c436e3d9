//! BCH parity for HDMI packet headers and subpackets.
//!
//! Headers are BCH(32,24): three payload bytes and one parity byte.
//! Subpackets are BCH(64,56): seven payload bytes and one parity byte.
//! Both use generator polynomial `x^8 + x^7 + x^6 + 1`, shifted in LSB first.
//!
//! The table below is that LFSR advanced by one byte. Folding a payload
//! through it yields the parity byte; folding payload and parity together
//! yields zero.

/// Bit-reversed generator polynomial (`x^8 + x^7 + x^6 + 1` without the `x^8` term).
pub const POLYNOMIAL: u8 = 0x83;

/// LFSR state after shifting in each byte value from a zero state.
pub const TABLE: [u8; 256] = [
    0x00, 0xd9, 0xb5, 0x6c, 0x6d, 0xb4, 0xd8, 0x01, 0xda, 0x03, 0x6f, 0xb6, 0xb7, 0x6e, 0x02, 0xdb,
    0xb3, 0x6a, 0x06, 0xdf, 0xde, 0x07, 0x6b, 0xb2, 0x69, 0xb0, 0xdc, 0x05, 0x04, 0xdd, 0xb1, 0x68,
    0x61, 0xb8, 0xd4, 0x0d, 0x0c, 0xd5, 0xb9, 0x60, 0xbb, 0x62, 0x0e, 0xd7, 0xd6, 0x0f, 0x63, 0xba,
    0xd2, 0x0b, 0x67, 0xbe, 0xbf, 0x66, 0x0a, 0xd3, 0x08, 0xd1, 0xbd, 0x64, 0x65, 0xbc, 0xd0, 0x09,
    0xc2, 0x1b, 0x77, 0xae, 0xaf, 0x76, 0x1a, 0xc3, 0x18, 0xc1, 0xad, 0x74, 0x75, 0xac, 0xc0, 0x19,
    0x71, 0xa8, 0xc4, 0x1d, 0x1c, 0xc5, 0xa9, 0x70, 0xab, 0x72, 0x1e, 0xc7, 0xc6, 0x1f, 0x73, 0xaa,
    0xa3, 0x7a, 0x16, 0xcf, 0xce, 0x17, 0x7b, 0xa2, 0x79, 0xa0, 0xcc, 0x15, 0x14, 0xcd, 0xa1, 0x78,
    0x10, 0xc9, 0xa5, 0x7c, 0x7d, 0xa4, 0xc8, 0x11, 0xca, 0x13, 0x7f, 0xa6, 0xa7, 0x7e, 0x12, 0xcb,
    0x83, 0x5a, 0x36, 0xef, 0xee, 0x37, 0x5b, 0x82, 0x59, 0x80, 0xec, 0x35, 0x34, 0xed, 0x81, 0x58,
    0x30, 0xe9, 0x85, 0x5c, 0x5d, 0x84, 0xe8, 0x31, 0xea, 0x33, 0x5f, 0x86, 0x87, 0x5e, 0x32, 0xeb,
    0xe2, 0x3b, 0x57, 0x8e, 0x8f, 0x56, 0x3a, 0xe3, 0x38, 0xe1, 0x8d, 0x54, 0x55, 0x8c, 0xe0, 0x39,
    0x51, 0x88, 0xe4, 0x3d, 0x3c, 0xe5, 0x89, 0x50, 0x8b, 0x52, 0x3e, 0xe7, 0xe6, 0x3f, 0x53, 0x8a,
    0x41, 0x98, 0xf4, 0x2d, 0x2c, 0xf5, 0x99, 0x40, 0x9b, 0x42, 0x2e, 0xf7, 0xf6, 0x2f, 0x43, 0x9a,
    0xf2, 0x2b, 0x47, 0x9e, 0x9f, 0x46, 0x2a, 0xf3, 0x28, 0xf1, 0x9d, 0x44, 0x45, 0x9c, 0xf0, 0x29,
    0x20, 0xf9, 0x95, 0x4c, 0x4d, 0x94, 0xf8, 0x21, 0xfa, 0x23, 0x4f, 0x96, 0x97, 0x4e, 0x22, 0xfb,
    0x93, 0x4a, 0x26, 0xff, 0xfe, 0x27, 0x4b, 0x92, 0x49, 0x90, 0xfc, 0x25, 0x24, 0xfd, 0x91, 0x48,
];

/// Fold `bytes` through the BCH LFSR.
#[inline]
#[allow(clippy::indexing_slicing)] // Safety: u8 index into a 256-entry table
pub fn parity(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| TABLE[(acc ^ b) as usize])
}

/// Parity byte for a three-byte packet header.
#[inline]
pub fn header_parity(header: &[u8; 3]) -> u8 {
    parity(header)
}

/// Parity byte for a seven-byte subpacket payload.
#[inline]
pub fn subpacket_parity(payload: &[u8; 7]) -> u8 {
    parity(payload)
}

/// `true` if `codeword` (payload followed by its parity byte) has a zero
/// syndrome.
#[inline]
pub fn is_codeword(codeword: &[u8]) -> bool {
    parity(codeword) == 0
}
