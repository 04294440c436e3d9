//! TERC4 (TMDS Error Reduction Coding, 4-bit) symbols.
//!
//! During a data island every TMDS lane carries one 10-bit TERC4 codeword
//! per pixel clock. Lane 0 encodes `{D3, D2, V, H}`; lanes 1 and 2 each carry
//! one nibble of subpacket data.

/// TERC4 codewords indexed by the 4-bit data value.
pub const SYMBOLS: [u16; 16] = [
    0b1010011100,
    0b1001100011,
    0b1011100100,
    0b1011100010,
    0b0101110001,
    0b0100011110,
    0b0110001110,
    0b0100111100,
    0b1011001100,
    0b0100111001,
    0b0110011100,
    0b1011000110,
    0b1010001110,
    0b1001110001,
    0b0101100011,
    0b1011000011,
];

/// Data-island guard band codeword on lanes 1 and 2.
pub const DATA_GUARD_BAND: u16 = 0b0100110011;

/// Lane shift of lane 1 within a serializer word.
pub const LANE1_SHIFT: u32 = 10;
/// Lane shift of lane 2 within a serializer word.
pub const LANE2_SHIFT: u32 = 20;

/// TERC4 codeword for the low nibble of `value`.
#[inline]
#[allow(clippy::indexing_slicing)] // Safety: index masked to 0..16
pub fn symbol(value: u32) -> u32 {
    SYMBOLS[(value & 0xf) as usize] as u32
}

/// Serializer word for one data-island guard band period.
///
/// `hv` carries the line's H (bit 0) and V (bit 1) sync levels.
#[inline]
pub fn guard_band_word(hv: u8) -> u32 {
    symbol(u32::from(hv & 0b11) | 0b1100)
        | (DATA_GUARD_BAND as u32) << LANE1_SHIFT
        | (DATA_GUARD_BAND as u32) << LANE2_SHIFT
}
