//! HDMI audio clock regeneration and per-frame packet rate.

use thiserror_no_std::Error;

/// Clock-regeneration setup errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// Only whole-kHz rates and the 44.1 kHz family are supported.
    #[error("unsupported sample rate {rate} Hz")]
    UnsupportedRate {
        /// Requested rate.
        rate: u32,
    },
    /// The pixel clock or frame size is zero.
    #[error("pixel clock and frame totals must be non-zero")]
    ZeroClock,
    /// More than one packet per line would be needed.
    #[error("sample rate {rate} Hz needs more than one packet per line")]
    RateTooHigh {
        /// Requested rate.
        rate: u32,
    },
}

/// Derived audio clock parameters for one video mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AudioClock {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Clock regeneration numerator.
    pub n: u32,
    /// Cycle time stamp.
    pub cts: u32,
    /// Sample frames per video frame, Q16.
    pub samples_per_frame: u32,
    /// Scheduler increment per eligible line.
    pub add: u16,
}

impl AudioClock {
    /// Derive N, CTS and the scheduler increment.
    ///
    /// # Errors
    ///
    /// See [`ClockError`].
    #[allow(clippy::arithmetic_side_effects)] // Safety: divisors checked non-zero, products computed in u64
    pub fn new(sample_rate: u32, pixel_clock: u32, h_total: u32, v_total: u32) -> Result<Self, ClockError> {
        if pixel_clock == 0 || h_total == 0 || v_total == 0 {
            return Err(ClockError::ZeroClock);
        }
        let n = acr_n(sample_rate)?;
        let cts = acr_cts(pixel_clock, n, sample_rate);
        let spf = u64::from(sample_rate) * (1 << 16) * u64::from(h_total) * u64::from(v_total)
            / u64::from(pixel_clock);
        let samples_per_frame =
            u32::try_from(spf).map_err(|_| ClockError::RateTooHigh { rate: sample_rate })?;
        let packets_per_frame = samples_per_frame >> 2;
        let add = packets_per_frame.div_ceil(v_total);
        let add = u16::try_from(add).map_err(|_| ClockError::RateTooHigh { rate: sample_rate })?;
        Ok(Self {
            sample_rate,
            n,
            cts,
            samples_per_frame,
            add,
        })
    }

    /// Packets per video frame, Q16.
    pub const fn packets_per_frame(&self) -> u32 {
        self.samples_per_frame >> 2
    }

    /// Whole samples per video frame when that count is exactly integral.
    pub fn framesync_samples(&self) -> Option<u16> {
        if self.samples_per_frame & 0xFFFF == 0 {
            u16::try_from(self.samples_per_frame >> 16).ok()
        } else {
            None
        }
    }
}

/// Recommended clock-regeneration `N` for `rate`.
///
/// # Errors
///
/// [`ClockError::UnsupportedRate`] for zero and for rates outside the 44.1 kHz
/// family that are not whole kHz.
#[allow(clippy::arithmetic_side_effects)] // Safety: rate / 1000 * 128 fits u32 for any u32 rate
pub fn acr_n(rate: u32) -> Result<u32, ClockError> {
    match rate {
        44_100 => Ok(6272),
        88_200 => Ok(12_544),
        176_400 => Ok(25_088),
        0 => Err(ClockError::UnsupportedRate { rate }),
        _ if rate % 1000 != 0 => Err(ClockError::UnsupportedRate { rate }),
        _ => Ok(128 * (rate / 1000)),
    }
}

/// Cycle time stamp for `pixel_clock`, `n` and a non-zero `rate`.
#[allow(clippy::arithmetic_side_effects)] // Safety: u64 product; caller passes rate != 0
#[allow(clippy::cast_possible_truncation)] // CTS is at most pixel_clock * N / (128 * rate) < 2^32 for valid N
pub fn acr_cts(pixel_clock: u32, n: u32, rate: u32) -> u32 {
    (u64::from(pixel_clock) * u64::from(n) / (128 * u64::from(rate))) as u32
}
