//! Timing model.
//!
//! A [`Timings`] value describes one video mode in output pixels and lines.
//! [`Timings::adjust`] validates it against a pixel mode and repetition factor
//! and returns a copy with totals and refresh rate filled in; the input is
//! never modified.
//!
//! Horizontal phases are emitted in this order, which is also the order the
//! totals are summed in:
//!
//! ```text
//! | border_right | front_porch | sync | back_porch | border_left | active |
//! ```

use crate::error::TimingError;
use crate::mode::PixelMode;

/// Horizontal phase lengths in output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HorizontalTimings {
    /// Front porch.
    pub front_porch: u16,
    /// Sync pulse.
    pub sync: u16,
    /// Back porch.
    pub back_porch: u16,
    /// Active pixels.
    pub active: u16,
    /// Left border.
    pub border_left: u16,
    /// Right border.
    pub border_right: u16,
    /// Sum of all phases. Filled in by [`Timings::adjust`].
    pub total: u32,
}

/// Vertical phase lengths in lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VerticalTimings {
    /// Front porch.
    pub front_porch: u16,
    /// Sync pulse.
    pub sync: u16,
    /// Back porch.
    pub back_porch: u16,
    /// Active lines.
    pub active: u16,
    /// Top border.
    pub border_top: u16,
    /// Bottom border.
    pub border_bottom: u16,
    /// Sum of all phases. Filled in by [`Timings::adjust`].
    pub total: u32,
}

/// Sync pulse polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncPolarity {
    /// HSYNC is active low.
    pub h_negative: bool,
    /// VSYNC is active low.
    pub v_negative: bool,
}

impl SyncPolarity {
    /// Both pulses active low (VGA-era modes).
    pub const NEGATIVE: Self = Self {
        h_negative: true,
        v_negative: true,
    };
    /// Both pulses active high (most HD modes).
    pub const POSITIVE: Self = Self {
        h_negative: false,
        v_negative: false,
    };

    /// Line levels while the given pulses are asserted.
    pub const fn levels(self, h_pulse: bool, v_pulse: bool) -> SyncLevels {
        SyncLevels {
            h: h_pulse != self.h_negative,
            v: v_pulse != self.v_negative,
        }
    }
}

/// Electrical HSYNC / VSYNC levels (`true` = high).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncLevels {
    /// HSYNC level.
    pub h: bool,
    /// VSYNC level.
    pub v: bool,
}

impl SyncLevels {
    /// Levels packed as H in bit 0 and V in bit 1, as carried by TMDS lane 0.
    #[allow(clippy::arithmetic_side_effects)] // Safety: two single-bit flags
    pub const fn bits(self) -> u8 {
        (self.h as u8) | ((self.v as u8) << 1)
    }
}

/// Adjustment options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdjustFlags {
    /// Divide every horizontal value by the pixel repetition. Used for raw
    /// VGA output, where the serializer clock already runs at the source
    /// pixel rate.
    pub vga_fixup: bool,
}

/// Full timing description of a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timings {
    /// Horizontal phases.
    pub h: HorizontalTimings,
    /// Vertical phases.
    pub v: VerticalTimings,
    /// Pixel clock in Hz.
    pub pixel_clock: u32,
    /// Refresh rate in mHz. Filled in by [`Timings::adjust`].
    pub refresh: u32,
    /// Sync polarity.
    pub polarity: SyncPolarity,
}

/// Horizontal widths in line buffer pixels, after pixel repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SourceWidths {
    /// Active width.
    pub active: u16,
    /// Left border.
    pub border_left: u16,
    /// Right border.
    pub border_right: u16,
}

impl Timings {
    /// Validate and complete the timings for `mode` at `pixel_rep`.
    ///
    /// Fails without touching `self` when the active area plus borders is not
    /// a multiple of `pixel_rep`, when the pixel clock is zero, or when a
    /// 1bpp mode cannot be word aligned.
    #[allow(clippy::arithmetic_side_effects)] // Safety: divisions by non-zero pixel_rep; sums in u32 of u16 terms
    pub fn adjust(&self, mode: PixelMode, pixel_rep: u16, flags: AdjustFlags) -> Result<Timings, TimingError> {
        if pixel_rep == 0 {
            return Err(TimingError::ZeroPixelRep);
        }
        let mut t = *self;
        let width = u32::from(t.h.active) + u32::from(t.h.border_left) + u32::from(t.h.border_right);
        if width % u32::from(pixel_rep) != 0 {
            return Err(TimingError::NotDivisible {
                width: u16::try_from(width).unwrap_or(u16::MAX),
                pixel_rep,
            });
        }
        if t.pixel_clock == 0 {
            return Err(TimingError::ZeroPixelClock);
        }

        if flags.vga_fixup {
            t.h.border_right /= pixel_rep;
            t.h.back_porch /= pixel_rep;
            t.h.sync /= pixel_rep;
            t.h.front_porch /= pixel_rep;
            t.h.border_left /= pixel_rep;
            t.h.active /= pixel_rep;
        }

        if mode == PixelMode::Mono1Bpp {
            if pixel_rep != 1 {
                return Err(TimingError::MonoRepetition { pixel_rep });
            }
            let folded = u16::try_from(width).map_err(|_| TimingError::MonoAlignment { width: u16::MAX })?;
            if folded % 32 != 0 {
                return Err(TimingError::MonoAlignment { width: folded });
            }
            t.h.active = folded;
            t.h.border_left = 0;
            t.h.border_right = 0;
        }

        t.h.total = u32::from(t.h.border_right)
            + u32::from(t.h.back_porch)
            + u32::from(t.h.sync)
            + u32::from(t.h.front_porch)
            + u32::from(t.h.border_left)
            + u32::from(t.h.active);
        t.v.total = u32::from(t.v.sync)
            + u32::from(t.v.front_porch)
            + u32::from(t.v.border_top)
            + u32::from(t.v.active)
            + u32::from(t.v.border_bottom)
            + u32::from(t.v.back_porch);
        if t.h.total == 0 || t.v.total == 0 {
            return Err(TimingError::ZeroTotal);
        }

        let frame = u64::from(t.h.total) * u64::from(t.v.total);
        t.refresh = u32::try_from(u64::from(t.pixel_clock) * 1000 / frame).unwrap_or(u32::MAX);
        Ok(t)
    }

    /// Widths in line buffer pixels for `pixel_rep` (1 after a VGA fixup).
    #[allow(clippy::arithmetic_side_effects)] // Safety: pixel_rep clamped to >= 1
    pub fn source_widths(&self, pixel_rep: u16) -> SourceWidths {
        let rep = pixel_rep.max(1);
        SourceWidths {
            active: self.h.active / rep,
            border_left: self.h.border_left / rep,
            border_right: self.h.border_right / rep,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests use unwrap() for readable assertions
mod tests {
    use super::*;

    fn vga_640x480() -> Timings {
        Timings {
            h: HorizontalTimings {
                front_porch: 16,
                sync: 96,
                back_porch: 48,
                active: 640,
                ..Default::default()
            },
            v: VerticalTimings {
                front_porch: 10,
                sync: 2,
                back_porch: 33,
                active: 480,
                ..Default::default()
            },
            pixel_clock: 25_200_000,
            refresh: 0,
            polarity: SyncPolarity::NEGATIVE,
        }
    }

    #[test]
    fn adjust_fills_totals_and_refresh() {
        let t = vga_640x480().adjust(PixelMode::Xrgb8888, 2, AdjustFlags::default()).unwrap();
        assert_eq!(t.h.total, 800);
        assert_eq!(t.v.total, 525);
        assert_eq!(t.refresh, 60_000);
        assert_eq!(t.source_widths(2).active, 320);
    }

    #[test]
    fn adjust_rejects_indivisible_width() {
        let src = vga_640x480();
        assert_eq!(
            src.adjust(PixelMode::Xrgb8888, 3, AdjustFlags::default()),
            Err(TimingError::NotDivisible { width: 640, pixel_rep: 3 })
        );
        assert_eq!(src.h.total, 0, "input untouched");
    }

    #[test]
    fn adjust_rejects_zero_clock() {
        let mut src = vga_640x480();
        src.pixel_clock = 0;
        assert_eq!(
            src.adjust(PixelMode::Xrgb8888, 1, AdjustFlags::default()),
            Err(TimingError::ZeroPixelClock)
        );
    }

    #[test]
    fn vga_fixup_divides_horizontal_values() {
        let t = vga_640x480()
            .adjust(PixelMode::VgaPwm, 2, AdjustFlags { vga_fixup: true })
            .unwrap();
        assert_eq!(t.h.active, 320);
        assert_eq!(t.h.sync, 48);
        assert_eq!(t.h.total, 400);
    }

    #[test]
    fn mono_folds_borders_into_active() {
        let mut src = vga_640x480();
        src.h.active = 576;
        src.h.border_left = 32;
        src.h.border_right = 32;
        let t = src.adjust(PixelMode::Mono1Bpp, 1, AdjustFlags::default()).unwrap();
        assert_eq!((t.h.active, t.h.border_left, t.h.border_right), (640, 0, 0));
        assert_eq!(t.h.total, 800);

        src.h.border_left = 16;
        src.h.border_right = 20;
        assert_eq!(
            src.adjust(PixelMode::Mono1Bpp, 1, AdjustFlags::default()),
            Err(TimingError::MonoAlignment { width: 612 })
        );
    }

    #[test]
    fn positive_polarity_pulses_high() {
        let l = SyncPolarity::POSITIVE.levels(true, false);
        assert_eq!((l.h, l.v), (true, false));
        let l = SyncPolarity::NEGATIVE.levels(true, false);
        assert_eq!((l.h, l.v), (false, true));
        assert_eq!(l.bits(), 0b10);
    }
}
