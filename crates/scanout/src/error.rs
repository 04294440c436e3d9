//! Configuration errors.
//!
//! Runtime starvation (late line render, audio underrun) is never an error:
//! it degrades to stale pixels or silence and is only counted.

use hdmi::PacketError;
use platform::BackendError;
use playback::{ClockError, RingError};
use thiserror_no_std::Error;

/// Timing validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimingError {
    /// Pixel repetition must be at least 1.
    #[error("pixel repetition must be non-zero")]
    ZeroPixelRep,
    /// Active width plus borders is not a multiple of the pixel repetition.
    #[error("active+borders width {width} is not divisible by pixel repetition {pixel_rep}")]
    NotDivisible {
        /// Active plus border width.
        width: u16,
        /// Requested repetition.
        pixel_rep: u16,
    },
    /// 1bpp lines must be a whole number of 32-pixel words.
    #[error("1bpp active width {width} is not a multiple of 32")]
    MonoAlignment {
        /// Active width after folding the borders in.
        width: u16,
    },
    /// The 1bpp expander cannot repeat pixels.
    #[error("1bpp mode does not support pixel repetition {pixel_rep}")]
    MonoRepetition {
        /// Requested repetition.
        pixel_rep: u16,
    },
    /// Deriving the pixel clock from a refresh rate is not supported.
    #[error("pixel clock must be non-zero")]
    ZeroPixelClock,
    /// A horizontal or vertical total is zero.
    #[error("horizontal and vertical totals must be non-zero")]
    ZeroTotal,
}

/// Errors returned by driver setup. Setup has no hardware side effects when
/// it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Invalid timings.
    #[error("invalid timings: {0}")]
    Timing(TimingError),
    /// Info packets do not fit their data island.
    #[error("info packet encoding failed: {0}")]
    Packet(PacketError),
    /// Unusable audio buffer.
    #[error("audio buffer rejected: {0}")]
    Ring(RingError),
    /// Unsupported audio rate for this mode.
    #[error("audio clock: {0}")]
    Clock(ClockError),
    /// The caller's line buffer cannot hold every slot.
    #[error("line buffer holds {available} words, {needed} needed")]
    LineBufferTooSmall {
        /// Words required.
        needed: usize,
        /// Words provided.
        available: usize,
    },
    /// A blanking phase is too short for its command words, preambles or
    /// data islands, or longer than one command can repeat.
    #[error("horizontal blanking too short for the selected output")]
    HorizontalBudget,
    /// Vertical sync, active area and front porch must each span at least
    /// one line.
    #[error("vertical sync, active and front porch must be non-empty")]
    VerticalBudget,
    /// Active lines are not a multiple of the line repetition.
    #[error("{active} active lines are not divisible by line repetition {line_rep}")]
    LineRepetition {
        /// Active lines.
        active: u16,
        /// Requested repetition.
        line_rep: u16,
    },
    /// A compiled line table exceeds its fixed capacity.
    #[error("command table overflow")]
    TableOverflow,
    /// The operation needs a stopped driver.
    #[error("scanout is running")]
    NotIdle,
    /// Audio was attached to an output without HDMI audio.
    #[error("output has no HDMI audio")]
    AudioDisabled,
    /// A backend resource could not be claimed.
    #[error("backend: {0}")]
    Backend(BackendError),
}

impl From<TimingError> for ConfigError {
    fn from(e: TimingError) -> Self {
        Self::Timing(e)
    }
}

impl From<PacketError> for ConfigError {
    fn from(e: PacketError) -> Self {
        Self::Packet(e)
    }
}

impl From<RingError> for ConfigError {
    fn from(e: RingError) -> Self {
        Self::Ring(e)
    }
}

impl From<ClockError> for ConfigError {
    fn from(e: ClockError) -> Self {
        Self::Clock(e)
    }
}

impl From<BackendError> for ConfigError {
    fn from(e: BackendError) -> Self {
        Self::Backend(e)
    }
}
