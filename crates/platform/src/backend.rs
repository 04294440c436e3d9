//! The narrow backend interface the scanout driver is written against.

use thiserror_no_std::Error;

use crate::dma::{ChainConfig, ChainControl, ChannelId, ChannelRole};
use crate::serializer::SerializerConfig;

// ── Interrupt lines ──────────────────────────────────────────────────────────

/// Interrupt lines used by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqRole {
    /// List-reset channel completion; runs the display state machine.
    DmaComplete,
    /// Software-raised; runs the line renderer.
    LineRender,
    /// Software-raised; runs the audio source.
    AudioRefill,
}

impl IrqRole {
    /// All roles.
    pub const ALL: [IrqRole; 3] = [IrqRole::DmaComplete, IrqRole::LineRender, IrqRole::AudioRefill];

    /// Dense index of this role (0..3).
    pub const fn index(self) -> usize {
        match self {
            IrqRole::DmaComplete => 0,
            IrqRole::LineRender => 1,
            IrqRole::AudioRefill => 2,
        }
    }

    /// Priority tier this line must run at.
    pub const fn tier(self) -> IrqPriority {
        match self {
            IrqRole::DmaComplete => IrqPriority::Tier1,
            IrqRole::LineRender | IrqRole::AudioRefill => IrqPriority::Tier2,
        }
    }
}

/// Interrupt priority tiers.
///
/// `Tier1` must preempt `Tier2`, and `Tier2` must preempt ordinary code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqPriority {
    /// DMA completion. Deadline well under one scanline.
    Tier1,
    /// Deferred callbacks raised by Tier 1.
    Tier2,
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Backend resource errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BackendError {
    /// No free DMA channel.
    #[error("no free DMA channel")]
    NoChannel,
    /// Interrupt line unavailable or already claimed.
    #[error("interrupt line unavailable")]
    NoInterrupt,
    /// The requested serializer configuration is not supported.
    #[error("unsupported serializer configuration")]
    Unsupported,
}

// ── Backend trait ────────────────────────────────────────────────────────────

/// Hardware backend for the scanout driver.
///
/// Methods called from the DMA interrupt ([`raise_pending`], [`acknowledge`])
/// must be wait-free: a single register write on real hardware. Only the
/// DMA interrupt holds the backend while streaming; the Tier-2 handlers never
/// call into it.
///
/// [`raise_pending`]: ScanoutBackend::raise_pending
/// [`acknowledge`]: ScanoutBackend::acknowledge
pub trait ScanoutBackend {
    /// Claim a DMA channel for `role`.
    fn claim_channel(&mut self, role: ChannelRole) -> Result<ChannelId, BackendError>;

    /// Return a channel claimed with [`claim_channel`](Self::claim_channel).
    fn unclaim_channel(&mut self, channel: ChannelId);

    /// Program the serializer's command expander.
    fn configure_serializer(&mut self, config: &SerializerConfig) -> Result<(), BackendError>;

    /// Wire the three channels into a self-perpetuating chain.
    ///
    /// The record ring and reset table addresses in `chain` stay valid until
    /// the chain is aborted.
    fn configure_chain(&mut self, chain: &ChainConfig) -> Result<ChainControl, BackendError>;

    /// Start `channel` without waiting for a chain trigger.
    fn arm(&mut self, channel: ChannelId);

    /// Abort any transfer on `channel` and clear its chain.
    fn abort(&mut self, channel: ChannelId);

    /// Claim exclusive use of an interrupt line.
    fn claim_interrupt(&mut self, role: IrqRole) -> Result<(), BackendError>;

    /// Release an interrupt line claimed with [`claim_interrupt`](Self::claim_interrupt).
    fn release_interrupt(&mut self, role: IrqRole);

    /// Set the priority tier of an interrupt line.
    fn set_priority(&mut self, role: IrqRole, priority: IrqPriority);

    /// Unmask (`true`) or mask (`false`) an interrupt line.
    fn enable(&mut self, role: IrqRole, enabled: bool);

    /// Software-raise an interrupt line.
    fn raise_pending(&mut self, role: IrqRole);

    /// Clear the completion status behind `role` from inside its handler.
    ///
    /// Software-raised lines are cleared by the interrupt controller on
    /// entry and need no acknowledge.
    fn acknowledge(&mut self, role: IrqRole);
}

impl<T: ScanoutBackend + ?Sized> ScanoutBackend for &mut T {
    fn claim_channel(&mut self, role: ChannelRole) -> Result<ChannelId, BackendError> {
        (**self).claim_channel(role)
    }

    fn unclaim_channel(&mut self, channel: ChannelId) {
        (**self).unclaim_channel(channel);
    }

    fn configure_serializer(&mut self, config: &SerializerConfig) -> Result<(), BackendError> {
        (**self).configure_serializer(config)
    }

    fn configure_chain(&mut self, chain: &ChainConfig) -> Result<ChainControl, BackendError> {
        (**self).configure_chain(chain)
    }

    fn arm(&mut self, channel: ChannelId) {
        (**self).arm(channel);
    }

    fn abort(&mut self, channel: ChannelId) {
        (**self).abort(channel);
    }

    fn claim_interrupt(&mut self, role: IrqRole) -> Result<(), BackendError> {
        (**self).claim_interrupt(role)
    }

    fn release_interrupt(&mut self, role: IrqRole) {
        (**self).release_interrupt(role);
    }

    fn set_priority(&mut self, role: IrqRole, priority: IrqPriority) {
        (**self).set_priority(role, priority);
    }

    fn enable(&mut self, role: IrqRole, enabled: bool) {
        (**self).enable(role, enabled);
    }

    fn raise_pending(&mut self, role: IrqRole) {
        (**self).raise_pending(role);
    }

    fn acknowledge(&mut self, role: IrqRole) {
        (**self).acknowledge(role);
    }
}
