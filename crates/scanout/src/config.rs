//! Driver configuration.

use hdmi::infoframe::AviInfo;

use crate::error::TimingError;
use crate::mode::{self, PixelMode};
use crate::timing::{AdjustFlags, Timings};

/// HDMI metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HdmiConfig {
    /// AVI info frame flags.
    pub avi: AviInfo,
    /// CEA-861 video identification code.
    pub vic: u8,
    /// Audio sample rate in Hz, or 0 for video only.
    pub sample_rate: u32,
}

impl HdmiConfig {
    /// `true` when audio packets are sent.
    pub const fn has_audio(&self) -> bool {
        self.sample_rate != 0
    }
}

/// Output signal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Output {
    /// TMDS without data islands.
    Dvi,
    /// TMDS with info frames and optional audio.
    Hdmi(HdmiConfig),
    /// Raw RGB and sync pins through a resistor DAC.
    Vga,
}

/// Everything [`Scanout::new`](crate::Scanout::new) needs besides memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanoutConfig {
    /// Output timings, adjusted during setup.
    pub timings: Timings,
    /// Line buffer pixel format.
    pub mode: PixelMode,
    /// Signal type.
    pub output: Output,
    /// Horizontal pixel repetition.
    pub pixel_rep: u16,
    /// Vertical line repetition.
    pub line_rep: u16,
    /// Timing adjustment options.
    pub flags: AdjustFlags,
}

impl ScanoutConfig {
    /// HDMI settings, if the output is HDMI.
    pub const fn hdmi(&self) -> Option<&HdmiConfig> {
        match &self.output {
            Output::Hdmi(hdmi) => Some(hdmi),
            Output::Dvi | Output::Vga => None,
        }
    }

    /// Pixel repetition the line buffer is laid out for. VGA timings already
    /// run at the source rate after the fixup.
    pub const fn source_pixel_rep(&self) -> u16 {
        if self.flags.vga_fixup {
            1
        } else {
            self.pixel_rep
        }
    }

    /// Words of line buffer memory [`Scanout::new`](crate::Scanout::new)
    /// needs for this configuration.
    pub fn line_buffer_words(&self) -> Result<usize, TimingError> {
        let timings = self.timings.adjust(self.mode, self.pixel_rep, self.flags)?;
        Ok(mode::line_buffer_words(&timings, self.mode, self.source_pixel_rep()))
    }
}
