//! Pixel modes and their serializer settings.

use platform::serializer::{expand_shift, expand_tmds};
use platform::{LaneMode, SerializerConfig};

use crate::linebuf::LINE_SLOTS;
use crate::timing::Timings;

/// How line buffer words turn into output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelMode {
    /// 1 bit per pixel, 32 pixels per word, LSB first. White on black.
    Mono1Bpp,
    /// One `0x00RRGGBB` word per pixel, TMDS encoded.
    Xrgb8888,
    /// One word per pixel holding four raw 8-pin phases for a PWM VGA DAC.
    VgaPwm,
}

impl PixelMode {
    /// Pixels carried by one line buffer word.
    pub const fn pixels_per_word(self) -> u16 {
        match self {
            PixelMode::Mono1Bpp => 32,
            PixelMode::Xrgb8888 | PixelMode::VgaPwm => 1,
        }
    }

    /// Line buffer words for `pixels` source pixels.
    #[allow(clippy::arithmetic_side_effects)] // Safety: pixels_per_word() is never zero
    pub const fn words_for(self, pixels: u16) -> u16 {
        pixels / self.pixels_per_word()
    }

    /// Whether the expander repeats each word `pixel_rep` times.
    pub const fn repeats_pixels(self) -> bool {
        !matches!(self, PixelMode::Mono1Bpp)
    }

    /// Command expander settings for this mode.
    #[allow(clippy::arithmetic_side_effects)] // Safety: constant shifts into register fields
    pub fn serializer_config(self, pixel_rep: u16) -> SerializerConfig {
        let rep = u32::from(pixel_rep) & 31;
        match self {
            PixelMode::Mono1Bpp => {
                // Every lane takes bit 0 rotated into the MSB of an 8-bit field.
                let rot = 25;
                SerializerConfig {
                    lanes: LaneMode::Tmds,
                    expand_tmds: rot << expand_tmds::L0_ROT_LSB
                        | rot << expand_tmds::L1_ROT_LSB
                        | rot << expand_tmds::L2_ROT_LSB,
                    expand_shift: 1 << expand_shift::ENC_SHIFT_LSB | 1 << expand_shift::RAW_N_SHIFTS_LSB,
                }
            }
            PixelMode::Xrgb8888 => SerializerConfig {
                lanes: LaneMode::Tmds,
                expand_tmds: 7 << expand_tmds::L2_NBITS_LSB
                    | 16 << expand_tmds::L2_ROT_LSB
                    | 7 << expand_tmds::L1_NBITS_LSB
                    | 8 << expand_tmds::L1_ROT_LSB
                    | 7 << expand_tmds::L0_NBITS_LSB,
                expand_shift: rep << expand_shift::ENC_N_SHIFTS_LSB | 1 << expand_shift::RAW_N_SHIFTS_LSB,
            },
            PixelMode::VgaPwm => SerializerConfig {
                lanes: LaneMode::Raw8,
                expand_tmds: 0,
                expand_shift: rep << expand_shift::ENC_N_SHIFTS_LSB | 1 << expand_shift::RAW_N_SHIFTS_LSB,
            },
        }
    }
}

/// Words of line buffer memory the driver needs for `timings` (already
/// adjusted) in `mode` at `pixel_rep`: one line per slot.
#[allow(clippy::arithmetic_side_effects)] // Safety: u16 word count times a small constant
pub fn line_buffer_words(timings: &Timings, mode: PixelMode, pixel_rep: u16) -> usize {
    let pixels = timings.source_widths(pixel_rep).active;
    usize::from(mode.words_for(pixels)) * LINE_SLOTS
}
