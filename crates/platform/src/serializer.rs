//! Serializer (HSTX) command-expander configuration.
//!
//! The expander turns each 32-bit word popped from the FIFO into one or more
//! output symbols. In TMDS lane mode each of the three lanes takes a rotated
//! bit field of the word and TMDS-encodes it; in raw mode the word is shifted
//! out 8 bits per output clock straight onto the pins (VGA).
//!
//! Field positions follow the RP2350 `EXPAND_TMDS` / `EXPAND_SHIFT` registers.

/// How the three output lanes are driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LaneMode {
    /// Three TMDS lanes plus a clock pair (DVI/HDMI).
    Tmds,
    /// Eight raw pins: 2 bits each of R, G, B plus HSYNC and VSYNC (VGA).
    Raw8,
}

/// Expander register values for one pixel mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerializerConfig {
    /// Lane drive mode.
    pub lanes: LaneMode,
    /// `EXPAND_TMDS` value (lane rotations and bit counts).
    pub expand_tmds: u32,
    /// `EXPAND_SHIFT` value (shifts per word for encoded and raw data).
    pub expand_shift: u32,
}

/// `EXPAND_TMDS` field offsets.
pub mod expand_tmds {
    /// Lane 0 rotate right.
    pub const L0_ROT_LSB: u32 = 0;
    /// Lane 0 bit count minus one.
    pub const L0_NBITS_LSB: u32 = 5;
    /// Lane 1 rotate right.
    pub const L1_ROT_LSB: u32 = 8;
    /// Lane 1 bit count minus one.
    pub const L1_NBITS_LSB: u32 = 13;
    /// Lane 2 rotate right.
    pub const L2_ROT_LSB: u32 = 16;
    /// Lane 2 bit count minus one.
    pub const L2_NBITS_LSB: u32 = 21;
}

/// `EXPAND_SHIFT` field offsets.
pub mod expand_shift {
    /// Raw data shift per output.
    pub const RAW_SHIFT_LSB: u32 = 0;
    /// Raw outputs per word (0 = 32).
    pub const RAW_N_SHIFTS_LSB: u32 = 8;
    /// Encoded data shift per output.
    pub const ENC_SHIFT_LSB: u32 = 16;
    /// Encoded outputs per word (0 = 32).
    pub const ENC_N_SHIFTS_LSB: u32 = 24;
}
