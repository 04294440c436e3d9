//! Audio packet scheduler.
//!
//! A Q16 accumulator advanced once per packet-eligible scanline. Each carry
//! out of bit 15 schedules one audio sample packet, which spreads a
//! fractional packets-per-frame count evenly over the frame.

/// Most frames one audio sample packet carries.
pub const FRAMES_PER_PACKET: u16 = 4;

/// Per-video-frame sample budget used in frame-sync mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameBudget {
    /// Samples carried per video frame.
    pub reload: u16,
    /// Samples left in the current video frame.
    pub remaining: u16,
}

/// Bresenham-style packet scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PacketScheduler {
    add: u16,
    acc: u16,
    budget: Option<FrameBudget>,
}

impl PacketScheduler {
    /// Scheduler advancing by `add` per eligible line.
    ///
    /// `frame_samples` enables frame-sync mode with that many samples per
    /// video frame.
    pub const fn new(add: u16, frame_samples: Option<u16>) -> Self {
        let budget = match frame_samples {
            Some(reload) => Some(FrameBudget {
                reload,
                remaining: reload,
            }),
            None => None,
        };
        Self {
            add,
            acc: add,
            budget,
        }
    }

    /// Accumulator increment.
    pub const fn add(&self) -> u16 {
        self.add
    }

    /// Current accumulator value.
    pub const fn acc(&self) -> u16 {
        self.acc
    }

    /// `true` when a per-frame budget is enforced.
    pub const fn is_framesync(&self) -> bool {
        self.budget.is_some()
    }

    /// Frame-sync state, if enabled.
    pub const fn budget(&self) -> Option<FrameBudget> {
        self.budget
    }

    /// Return to the post-construction state.
    pub fn reset(&mut self) {
        self.acc = self.add;
        if let Some(budget) = self.budget.as_mut() {
            budget.remaining = budget.reload;
        }
    }

    /// Called once per video frame at the info-packet line. Only frame-sync
    /// mode reacts; free-running mode keeps its phase across frames.
    pub fn start_frame(&mut self) {
        if self.budget.is_some() {
            self.reset();
        }
    }

    /// Advance by one eligible line.
    ///
    /// Returns the number of frames the packet should carry when a packet
    /// fires, `None` otherwise. In frame-sync mode the count is capped by the
    /// samples left in the frame and may be zero once the budget is spent.
    pub fn tick(&mut self) -> Option<u16> {
        let (acc, carry) = self.acc.overflowing_add(self.add);
        self.acc = acc;
        if !carry {
            return None;
        }
        Some(match self.budget.as_mut() {
            Some(budget) => {
                let frames = budget.remaining.min(FRAMES_PER_PACKET);
                budget.remaining = budget.remaining.saturating_sub(FRAMES_PER_PACKET);
                frames
            }
            None => FRAMES_PER_PACKET,
        })
    }
}
