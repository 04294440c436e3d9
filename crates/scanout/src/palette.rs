//! Palette helpers for palette-indexed renderers.
//!
//! Renderers usually keep 8-bit pixel indices and expand them into line
//! buffer words in their [`LineRenderer`](crate::LineRenderer). For VGA the
//! word holds four PWM phases of the 8 output pins:
//!
//! ```text
//! bit  7     6     5..4  3..2  1..0
//!      VSYNC HSYNC R     G     B
//! ```
//!
//! Each 2-bit channel is driven through a 4-phase pattern so the average
//! level approximates 4 bits of intensity.

use crate::hstx::vga_sync_word;
use crate::timing::SyncPolarity;

#[allow(clippy::arithmetic_side_effects)] // Safety: 2-bit values into separate bytes
const fn phases(p3: u32, p2: u32, p1: u32, p0: u32) -> u32 {
    p3 << 24 | p2 << 16 | p1 << 8 | p0
}

/// PWM phase patterns for a 4-bit intensity, two bits per phase.
pub const VGA_PWM: [u32; 16] = [
    phases(0, 0, 0, 0),
    phases(0, 0, 0, 1),
    phases(0, 1, 0, 1),
    phases(0, 1, 0, 1),
    phases(0, 1, 1, 1),
    phases(1, 1, 1, 1),
    phases(1, 1, 1, 2),
    phases(1, 2, 1, 2),
    phases(1, 2, 1, 2),
    phases(1, 2, 2, 2),
    phases(2, 2, 2, 2),
    phases(2, 2, 2, 3),
    phases(2, 3, 2, 3),
    phases(2, 3, 2, 3),
    phases(2, 3, 3, 3),
    phases(3, 3, 3, 3),
];

/// Sync pin bits every VGA pixel word must carry.
pub const fn pixel_sync_mask(polarity: SyncPolarity) -> u32 {
    vga_sync_word(polarity.levels(false, false))
}

#[inline]
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)] // Safety: v >> 4 < 16
const fn pwm(v: u8) -> u32 {
    VGA_PWM[(v >> 4) as usize]
}

/// VGA pixel word for an 8-bit RGB colour.
#[allow(clippy::arithmetic_side_effects)] // Safety: 2-bit fields shifted inside each byte
pub const fn vga_pwm_color(r: u8, g: u8, b: u8, polarity: SyncPolarity) -> u32 {
    pixel_sync_mask(polarity) | pwm(b) | pwm(g) << 2 | pwm(r) << 4
}

/// `0x00RRGGBB` pixel word for TMDS output.
#[allow(clippy::arithmetic_side_effects)] // Safety: bytes widened to u32
pub const fn xrgb8888(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// 256-entry colour table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [u32; 256],
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl Palette {
    /// All entries zero.
    #[allow(clippy::large_stack_arrays)] // Safety: 1 KiB; applications keep palettes in statics
    pub const fn new() -> Self {
        Self { entries: [0; 256] }
    }

    /// Palette with every entry set to `word`.
    #[allow(clippy::large_stack_arrays)] // Safety: 1 KiB; applications keep palettes in statics
    pub const fn filled(word: u32) -> Self {
        Self { entries: [word; 256] }
    }

    /// Set entry `index`.
    #[allow(clippy::indexing_slicing)] // Safety: u8 index into 256 entries
    pub fn set(&mut self, index: u8, word: u32) {
        self.entries[usize::from(index)] = word;
    }

    /// Entry `index`.
    #[allow(clippy::indexing_slicing)] // Safety: u8 index into 256 entries
    pub fn get(&self, index: u8) -> u32 {
        self.entries[usize::from(index)]
    }

    /// Translate indexed pixels into line buffer words. Stops at the shorter
    /// of the two slices.
    pub fn expand_line(&self, src: &[u8], dst: &mut [u32]) {
        for (word, &index) in dst.iter_mut().zip(src) {
            *word = self.get(index);
        }
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn pwm_ramp_averages_up() {
        let level = |w: u32| w.to_le_bytes().iter().map(|&b| u32::from(b)).sum::<u32>();
        assert!(VGA_PWM.windows(2).all(|w| level(w[0]) <= level(w[1])));
        assert_eq!(level(VGA_PWM[0]), 0);
        assert_eq!(level(VGA_PWM[15]), 12);
    }

    #[test]
    fn black_vga_pixel_keeps_idle_sync_levels() {
        assert_eq!(vga_pwm_color(0, 0, 0, SyncPolarity::NEGATIVE), 0xC0C0_C0C0);
        assert_eq!(vga_pwm_color(0, 0, 0, SyncPolarity::POSITIVE), 0);
        assert_eq!(vga_pwm_color(0xFF, 0, 0, SyncPolarity::POSITIVE), 0x3030_3030);
        assert_eq!(vga_pwm_color(0, 0, 0xFF, SyncPolarity::POSITIVE), 0x0303_0303);
    }

    #[test]
    fn expand_line_maps_indices() {
        let mut palette = Palette::new();
        palette.set(1, xrgb8888(0x12, 0x34, 0x56));
        let mut dst = [0xFFFF_FFFF; 3];
        palette.expand_line(&[0, 1], &mut dst);
        assert_eq!(dst, [0, 0x0012_3456, 0xFFFF_FFFF]);
    }
}
