//! Serializer command words and sync symbols.
//!
//! A command word carries a 4-bit opcode and a 12-bit length. `RAW` and
//! `TMDS` stream `len` data words that follow in the FIFO; the `*_REPEAT`
//! forms repeat the single following word `len` times.

use crate::timing::SyncLevels;

/// Raw 30-bit symbols, one per output pixel.
pub const CMD_RAW: u32 = 0x0 << 12;
/// One raw symbol repeated.
pub const CMD_RAW_REPEAT: u32 = 0x1 << 12;
/// Pixel data through the TMDS encoders.
pub const CMD_TMDS: u32 = 0x2 << 12;
/// One TMDS-encoded pixel repeated.
pub const CMD_TMDS_REPEAT: u32 = 0x3 << 12;
/// No operation.
pub const CMD_NOP: u32 = 0xf << 12;
/// Length field.
pub const LEN_MASK: u32 = 0xFFF;

/// TMDS control symbol for C1:C0 = 00.
pub const TMDS_CTRL_00: u32 = 0x354;
/// C1:C0 = 01.
pub const TMDS_CTRL_01: u32 = 0x0ab;
/// C1:C0 = 10.
pub const TMDS_CTRL_10: u32 = 0x154;
/// C1:C0 = 11.
pub const TMDS_CTRL_11: u32 = 0x2ab;

const LANE1: u32 = 10;
const LANE2: u32 = 20;

/// Video leading guard band, sent immediately before active pixels.
pub const TMDS_VIDEO_GUARD_BAND: u32 = 0x2cc | 0x133 << LANE1 | 0x2cc << LANE2;

/// VGA VSYNC pin in every phase.
pub const VGA_VSYNC: u32 = 0x8080_8080;
/// VGA HSYNC pin in every phase.
pub const VGA_HSYNC: u32 = 0x4040_4040;

/// Command `op` with length `len`, or `None` if `len` does not fit.
pub const fn command(op: u32, len: u32) -> Option<u32> {
    if len > LEN_MASK {
        None
    } else {
        Some(op | len)
    }
}

/// Length field of a command word.
pub const fn command_len(word: u32) -> u32 {
    word & LEN_MASK
}

/// Replace the length field of a command word.
pub const fn with_len(word: u32, len: u32) -> u32 {
    (word & !LEN_MASK) | (len & LEN_MASK)
}

#[inline]
const fn ctrl(h: bool, v: bool) -> u32 {
    match (v, h) {
        (false, false) => TMDS_CTRL_00,
        (false, true) => TMDS_CTRL_01,
        (true, false) => TMDS_CTRL_10,
        (true, true) => TMDS_CTRL_11,
    }
}

/// Control period symbol: lane 0 carries the sync levels, lanes 1 and 2
/// are idle.
#[allow(clippy::arithmetic_side_effects)] // Safety: 10-bit symbols shifted into fixed lanes
pub const fn tmds_sync_word(levels: SyncLevels) -> u32 {
    ctrl(levels.h, levels.v) | TMDS_CTRL_00 << LANE1 | TMDS_CTRL_00 << LANE2
}

/// Video period preamble (CTL0 = 1, CTL1..3 = 0).
#[allow(clippy::arithmetic_side_effects)] // Safety: 10-bit symbols shifted into fixed lanes
pub const fn tmds_video_preamble(levels: SyncLevels) -> u32 {
    ctrl(levels.h, levels.v) | TMDS_CTRL_01 << LANE1 | TMDS_CTRL_00 << LANE2
}

/// Data island preamble (CTL0 = 1, CTL2 = 1).
#[allow(clippy::arithmetic_side_effects)] // Safety: 10-bit symbols shifted into fixed lanes
pub const fn tmds_data_preamble(levels: SyncLevels) -> u32 {
    ctrl(levels.h, levels.v) | TMDS_CTRL_01 << LANE1 | TMDS_CTRL_01 << LANE2
}

/// Blank VGA symbol with the given sync pin levels.
pub const fn vga_sync_word(levels: SyncLevels) -> u32 {
    (if levels.h { VGA_HSYNC } else { 0 }) | (if levels.v { VGA_VSYNC } else { 0 })
}
