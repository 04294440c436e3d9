//! NVIC helper for Cortex-M backends.
//!
//! Maps the driver's three [`IrqRole`]s onto device interrupt numbers and the
//! two priority tiers onto NVIC priority values. A concrete backend forwards
//! its interrupt methods here.
//!
//! Priority 0 is left free for the system (fault handlers, SysTick users).

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::NVIC;

use crate::backend::{IrqPriority, IrqRole};

/// NVIC priority value for a tier on a part with `bits` implemented
/// priority bits (clamped to 2..=8).
///
/// Lower values preempt higher ones, so Tier 1 gets level 1 and Tier 2
/// level 2.
#[allow(clippy::arithmetic_side_effects)] // Safety: bits is clamped to 2..=8, so level << (8 - bits) fits in u8
pub const fn raw_priority(tier: IrqPriority, bits: u8) -> u8 {
    let bits = if bits < 2 {
        2
    } else if bits > 8 {
        8
    } else {
        bits
    };
    let level: u8 = match tier {
        IrqPriority::Tier1 => 1,
        IrqPriority::Tier2 => 2,
    };
    level << (8 - bits)
}

/// Interrupt numbers bound to each driver role.
#[derive(Debug, Clone, Copy)]
pub struct NvicLines<I> {
    lines: [I; 3],
    priority_bits: u8,
}

impl<I: InterruptNumber> NvicLines<I> {
    /// Bind device interrupts to roles.
    pub const fn new(dma_complete: I, line_render: I, audio_refill: I, priority_bits: u8) -> Self {
        Self {
            lines: [dma_complete, line_render, audio_refill],
            priority_bits,
        }
    }

    #[allow(clippy::indexing_slicing)] // Safety: IrqRole::index() is always < 3
    fn line(&self, role: IrqRole) -> I {
        self.lines[role.index()]
    }

    /// Program the NVIC priority of `role`.
    pub fn set_priority(&self, nvic: &mut NVIC, role: IrqRole, tier: IrqPriority) {
        // SAFETY: the driver only ever lowers Tier 2 below Tier 1; no
        // priority-based critical section in this firmware relies on the
        // lines being at any other level.
        unsafe { nvic.set_priority(self.line(role), raw_priority(tier, self.priority_bits)) };
    }

    /// Unmask or mask `role`.
    pub fn enable(&self, role: IrqRole, enabled: bool) {
        if enabled {
            // SAFETY: handlers for all three lines are installed before the
            // driver enables them, and none of them relies on being masked
            // for memory safety.
            unsafe { NVIC::unmask(self.line(role)) };
        } else {
            NVIC::mask(self.line(role));
        }
    }

    /// Set `role` pending.
    pub fn pend(&self, role: IrqRole) {
        NVIC::pend(self.line(role));
    }

    /// Clear the pending bit of `role`.
    pub fn unpend(&self, role: IrqRole) {
        NVIC::unpend(self.line(role));
    }
}
