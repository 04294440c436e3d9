//! Built-in video modes.

use hdmi::infoframe::{AviInfo, PictureAspect};

use crate::config::{Output, ScanoutConfig};
use crate::mode::PixelMode;
use crate::timing::{AdjustFlags, HorizontalTimings, SyncPolarity, Timings, VerticalTimings};

/// A named mode: output timings plus the source resolution drawn into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VideoMode {
    /// Human-readable name.
    pub name: &'static str,
    /// Source width in pixels.
    pub width: u16,
    /// Source height in lines.
    pub height: u16,
    /// Horizontal pixel repetition.
    pub pixel_rep: u16,
    /// Vertical line repetition.
    pub line_rep: u16,
    /// CEA-861 video identification code.
    pub vic: u8,
    /// Picture aspect signalled in the AVI info frame.
    pub aspect: PictureAspect,
    /// Output timings (totals and refresh filled in at setup).
    pub timings: Timings,
}

const H_640X480: HorizontalTimings = HorizontalTimings {
    front_porch: 16,
    sync: 96,
    back_porch: 48,
    active: 640,
    border_left: 0,
    border_right: 0,
    total: 0,
};

const V_640X480: VerticalTimings = VerticalTimings {
    front_porch: 10,
    sync: 2,
    back_porch: 33,
    active: 480,
    border_top: 0,
    border_bottom: 0,
    total: 0,
};

impl VideoMode {
    /// 320x240 doubled in both directions into 640x480 at 60 Hz.
    pub const MODE_320X240: Self = Self {
        name: "320x240",
        width: 320,
        height: 240,
        pixel_rep: 2,
        line_rep: 2,
        vic: 1,
        aspect: PictureAspect::Aspect4x3,
        timings: Timings {
            h: H_640X480,
            v: V_640X480,
            pixel_clock: 25_200_000,
            refresh: 60_000,
            polarity: SyncPolarity::NEGATIVE,
        },
    };

    /// 640x480 at 60 Hz.
    pub const MODE_640X480: Self = Self {
        name: "640x480",
        width: 640,
        height: 480,
        pixel_rep: 1,
        line_rep: 1,
        vic: 1,
        aspect: PictureAspect::Aspect4x3,
        timings: Timings {
            h: H_640X480,
            v: V_640X480,
            pixel_clock: 25_200_000,
            refresh: 60_000,
            polarity: SyncPolarity::NEGATIVE,
        },
    };

    /// 640x360 letterboxed in a 640x480 frame.
    pub const MODE_640X360: Self = Self {
        name: "640x360 letterbox",
        width: 640,
        height: 360,
        pixel_rep: 1,
        line_rep: 1,
        vic: 1,
        aspect: PictureAspect::Aspect4x3,
        timings: Timings {
            h: H_640X480,
            v: VerticalTimings {
                active: 360,
                border_top: 60,
                border_bottom: 60,
                ..V_640X480
            },
            pixel_clock: 25_200_000,
            refresh: 60_000,
            polarity: SyncPolarity::NEGATIVE,
        },
    };

    /// 640x360 boxed in a 720x480 frame at 27 MHz, for sinks that reject
    /// 25.2 MHz.
    pub const MODE_640X360_27MHZ: Self = Self {
        name: "640x360 in 720x480",
        width: 640,
        height: 360,
        pixel_rep: 1,
        line_rep: 1,
        vic: 2,
        aspect: PictureAspect::Aspect4x3,
        timings: Timings {
            h: HorizontalTimings {
                front_porch: 16,
                sync: 62,
                back_porch: 60,
                active: 640,
                border_left: 40,
                border_right: 40,
                total: 0,
            },
            v: VerticalTimings {
                front_porch: 9,
                sync: 6,
                back_porch: 30,
                active: 360,
                border_top: 60,
                border_bottom: 60,
                total: 0,
            },
            pixel_clock: 27_000_000,
            refresh: 59_940,
            polarity: SyncPolarity::NEGATIVE,
        },
    };

    /// Every built-in mode.
    pub const ALL: [Self; 4] = [
        Self::MODE_320X240,
        Self::MODE_640X480,
        Self::MODE_640X360,
        Self::MODE_640X360_27MHZ,
    ];

    /// Driver configuration for this mode on `output`.
    ///
    /// TMDS outputs use [`PixelMode::Xrgb8888`]; VGA uses
    /// [`PixelMode::VgaPwm`] with the horizontal values divided down to the
    /// source pixel rate.
    pub fn config(&self, output: Output) -> ScanoutConfig {
        let vga = matches!(output, Output::Vga);
        ScanoutConfig {
            timings: self.timings,
            mode: if vga { PixelMode::VgaPwm } else { PixelMode::Xrgb8888 },
            output,
            pixel_rep: self.pixel_rep,
            line_rep: self.line_rep,
            flags: AdjustFlags { vga_fixup: vga },
        }
    }

    /// AVI flags for this mode.
    pub const fn avi(&self) -> AviInfo {
        AviInfo::rgb(self.aspect)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests use unwrap() for readable assertions
mod tests {
    use super::*;

    #[test]
    fn every_mode_adjusts_to_its_nominal_refresh() {
        for mode in VideoMode::ALL {
            let t = mode
                .timings
                .adjust(PixelMode::Xrgb8888, mode.pixel_rep, AdjustFlags::default())
                .unwrap();
            assert_eq!(t.refresh / 1000, mode.timings.refresh / 1000, "{}", mode.name);
            assert_eq!(t.source_widths(mode.pixel_rep).active, mode.width);
            assert_eq!(u32::from(t.v.active / mode.line_rep), u32::from(mode.height));
        }
    }

    #[test]
    fn vga_config_divides_horizontal_values() {
        let config = VideoMode::MODE_320X240.config(Output::Vga);
        assert_eq!(config.mode, PixelMode::VgaPwm);
        assert!(config.flags.vga_fixup);
    }
}
