//! Mock backend for host testing.
//!
//! [`MockBackend`] records every call the driver makes and lets tests play
//! the interrupt controller: the driver raises a Tier-2 line, the test sees it
//! through [`MockBackend::take_pending`] and calls the matching handler.

#![cfg(any(test, feature = "std"))]

use crate::*;

/// Serializer FIFO address reported by the mock.
pub const MOCK_FIFO_ADDR: usize = 0x5060_0004;
/// Control word the mock hands out for records that chain onward.
pub const MOCK_CTRL_CONTINUE: u32 = 0x0000_0c01;
/// Control word the mock hands out for the last record of a pair.
pub const MOCK_CTRL_WRAP: u32 = 0x0000_0c03;

/// Mock scanout backend
pub struct MockBackend {
    next_channel: u8,
    channel_limit: usize,
    channels: heapless::Vec<(ChannelRole, ChannelId), 3>,
    denied_interrupt: Option<IrqRole>,
    interrupts: [bool; 3],
    enabled: [bool; 3],
    pending: [bool; 3],
    raised: [u32; 3],
    acknowledged: [u32; 3],
    priorities: [Option<IrqPriority>; 3],
    chain: Option<ChainConfig>,
    serializer: Option<SerializerConfig>,
    armed: heapless::Vec<ChannelId, 16>,
    aborted: heapless::Vec<ChannelId, 16>,
}

impl MockBackend {
    /// Create a mock with plenty of free channels and interrupt lines.
    pub fn new() -> Self {
        Self {
            next_channel: 4,
            channel_limit: 3,
            channels: heapless::Vec::new(),
            denied_interrupt: None,
            interrupts: [false; 3],
            enabled: [false; 3],
            pending: [false; 3],
            raised: [0; 3],
            acknowledged: [0; 3],
            priorities: [None; 3],
            chain: None,
            serializer: None,
            armed: heapless::Vec::new(),
            aborted: heapless::Vec::new(),
        }
    }

    /// Allow only `limit` channel claims to succeed.
    pub fn with_channel_limit(mut self, limit: usize) -> Self {
        self.channel_limit = limit.min(3);
        self
    }

    /// Make claiming `role` fail.
    pub fn deny_interrupt(mut self, role: IrqRole) -> Self {
        self.denied_interrupt = Some(role);
        self
    }

    /// Channel currently claimed for `role`.
    pub fn channel(&self, role: ChannelRole) -> Option<ChannelId> {
        self.channels
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, id)| *id)
    }

    /// Number of channels currently claimed.
    pub fn claimed_channels(&self) -> usize {
        self.channels.len()
    }

    /// `true` if `role`'s interrupt line is claimed.
    #[allow(clippy::indexing_slicing)] // Safety: IrqRole::index() < 3
    pub fn interrupt_claimed(&self, role: IrqRole) -> bool {
        self.interrupts[role.index()]
    }

    /// `true` if `role` is unmasked.
    #[allow(clippy::indexing_slicing)] // Safety: IrqRole::index() < 3
    pub fn is_enabled(&self, role: IrqRole) -> bool {
        self.enabled[role.index()]
    }

    /// Priority programmed for `role`.
    #[allow(clippy::indexing_slicing)] // Safety: IrqRole::index() < 3
    pub fn priority(&self, role: IrqRole) -> Option<IrqPriority> {
        self.priorities[role.index()]
    }

    /// Clear and return the pending bit of `role`.
    #[allow(clippy::indexing_slicing)] // Safety: IrqRole::index() < 3
    pub fn take_pending(&mut self, role: IrqRole) -> bool {
        core::mem::replace(&mut self.pending[role.index()], false)
    }

    /// `true` if `role` is pending.
    #[allow(clippy::indexing_slicing)] // Safety: IrqRole::index() < 3
    pub fn is_pending(&self, role: IrqRole) -> bool {
        self.pending[role.index()]
    }

    /// How often `role` was software-raised.
    #[allow(clippy::indexing_slicing)] // Safety: IrqRole::index() < 3
    pub fn raised_count(&self, role: IrqRole) -> u32 {
        self.raised[role.index()]
    }

    /// How often `role` was acknowledged.
    #[allow(clippy::indexing_slicing)] // Safety: IrqRole::index() < 3
    pub fn acknowledged_count(&self, role: IrqRole) -> u32 {
        self.acknowledged[role.index()]
    }

    /// Last chain configuration.
    pub fn chain(&self) -> Option<ChainConfig> {
        self.chain
    }

    /// Last serializer configuration.
    pub fn serializer(&self) -> Option<SerializerConfig> {
        self.serializer
    }

    /// Channels armed so far, in order.
    pub fn armed(&self) -> &[ChannelId] {
        &self.armed
    }

    /// Channels aborted so far, in order.
    pub fn aborted(&self) -> &[ChannelId] {
        &self.aborted
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanoutBackend for MockBackend {
    #[allow(clippy::arithmetic_side_effects)] // Safety: at most 3 live claims; next_channel never nears u8::MAX in tests
    fn claim_channel(&mut self, role: ChannelRole) -> Result<ChannelId, BackendError> {
        if self.channels.len() >= self.channel_limit || self.channel(role).is_some() {
            return Err(BackendError::NoChannel);
        }
        let id = ChannelId(self.next_channel);
        self.next_channel += 1;
        self.channels
            .push((role, id))
            .map_err(|_| BackendError::NoChannel)?;
        Ok(id)
    }

    fn unclaim_channel(&mut self, channel: ChannelId) {
        self.channels.retain(|(_, id)| *id != channel);
    }

    fn configure_serializer(&mut self, config: &SerializerConfig) -> Result<(), BackendError> {
        self.serializer = Some(*config);
        Ok(())
    }

    fn configure_chain(&mut self, chain: &ChainConfig) -> Result<ChainControl, BackendError> {
        self.chain = Some(*chain);
        Ok(ChainControl {
            fifo_addr: MOCK_FIFO_ADDR,
            ctrl_continue: MOCK_CTRL_CONTINUE,
            ctrl_wrap: MOCK_CTRL_WRAP,
        })
    }

    fn arm(&mut self, channel: ChannelId) {
        let _ = self.armed.push(channel);
    }

    fn abort(&mut self, channel: ChannelId) {
        let _ = self.aborted.push(channel);
    }

    #[allow(clippy::indexing_slicing)] // Safety: IrqRole::index() < 3
    fn claim_interrupt(&mut self, role: IrqRole) -> Result<(), BackendError> {
        if self.denied_interrupt == Some(role) || self.interrupts[role.index()] {
            return Err(BackendError::NoInterrupt);
        }
        self.interrupts[role.index()] = true;
        Ok(())
    }

    #[allow(clippy::indexing_slicing)] // Safety: IrqRole::index() < 3
    fn release_interrupt(&mut self, role: IrqRole) {
        self.interrupts[role.index()] = false;
    }

    #[allow(clippy::indexing_slicing)] // Safety: IrqRole::index() < 3
    fn set_priority(&mut self, role: IrqRole, priority: IrqPriority) {
        self.priorities[role.index()] = Some(priority);
    }

    #[allow(clippy::indexing_slicing)] // Safety: IrqRole::index() < 3
    fn enable(&mut self, role: IrqRole, enabled: bool) {
        self.enabled[role.index()] = enabled;
    }

    #[allow(clippy::indexing_slicing)] // Safety: IrqRole::index() < 3
    #[allow(clippy::arithmetic_side_effects)] // Safety: test-only counter
    fn raise_pending(&mut self, role: IrqRole) {
        self.pending[role.index()] = true;
        self.raised[role.index()] += 1;
    }

    #[allow(clippy::indexing_slicing)] // Safety: IrqRole::index() < 3
    #[allow(clippy::arithmetic_side_effects)] // Safety: test-only counter
    fn acknowledge(&mut self, role: IrqRole) {
        self.pending[role.index()] = false;
        self.acknowledged[role.index()] += 1;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests use unwrap() for readable assertions
mod tests {
    use super::*;

    #[test]
    fn channel_limit_is_enforced() {
        let mut backend = MockBackend::new().with_channel_limit(2);
        assert!(backend.claim_channel(ChannelRole::Stream).is_ok());
        assert!(backend.claim_channel(ChannelRole::DisplayList).is_ok());
        assert_eq!(
            backend.claim_channel(ChannelRole::ListReset),
            Err(BackendError::NoChannel)
        );
    }

    #[test]
    fn unclaim_frees_channel() {
        let mut backend = MockBackend::new();
        let id = backend.claim_channel(ChannelRole::Stream).unwrap();
        backend.unclaim_channel(id);
        assert_eq!(backend.claimed_channels(), 0);
        assert!(backend.channel(ChannelRole::Stream).is_none());
    }

    #[test]
    fn raised_line_stays_pending_until_taken() {
        let mut backend = MockBackend::new();
        backend.raise_pending(IrqRole::LineRender);
        backend.raise_pending(IrqRole::LineRender);
        assert_eq!(backend.raised_count(IrqRole::LineRender), 2);
        assert!(backend.take_pending(IrqRole::LineRender));
        assert!(!backend.take_pending(IrqRole::LineRender));
    }

    #[test]
    fn denied_interrupt_fails_to_claim() {
        let mut backend = MockBackend::new().deny_interrupt(IrqRole::AudioRefill);
        assert!(backend.claim_interrupt(IrqRole::DmaComplete).is_ok());
        assert_eq!(
            backend.claim_interrupt(IrqRole::AudioRefill),
            Err(BackendError::NoInterrupt)
        );
    }
}
