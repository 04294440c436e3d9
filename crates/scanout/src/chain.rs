//! Descriptor record ring.
//!
//! Four records in two pairs. The display-list channel walks one pair while
//! software refills the other; the last record of each pair chains to the
//! list-reset channel, which points the display-list channel at the other
//! pair through `reset_table`.
//!
//! The ring is read by DMA through raw addresses, so it must stay at a fixed
//! address from [`ChainConfig`] creation until the chain is aborted.

use platform::{ChainConfig, ChainControl, ChannelId, DmaDescriptor};

/// Records in the ring.
pub const RECORDS: usize = 4;
/// Records filled per completion interrupt.
pub const PAIR: usize = 2;

/// Double-buffered descriptor records.
#[derive(Debug)]
#[repr(C, align(16))]
pub struct DescriptorRing {
    records: [DmaDescriptor; RECORDS],
    reset_table: [usize; 2],
    control: Option<ChainControl>,
    next_pair: usize,
}

impl Default for DescriptorRing {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorRing {
    /// Empty ring.
    pub const fn new() -> Self {
        Self {
            records: [DmaDescriptor::EMPTY; RECORDS],
            reset_table: [0; 2],
            control: None,
            next_pair: 0,
        }
    }

    /// Chain description for the backend. Also captures the reset table
    /// addresses, so the ring must not move afterwards.
    pub fn chain_config(&mut self, stream: ChannelId, display_list: ChannelId, list_reset: ChannelId) -> ChainConfig {
        self.reset_table = [self.record_addr(PAIR), self.record_addr(0)];
        ChainConfig {
            stream,
            display_list,
            list_reset,
            records: self.record_addr(0),
            record_count: RECORDS,
            reset_table: self.reset_table.as_ptr() as usize,
            reset_entries: self.reset_table.len(),
        }
    }

    fn record_addr(&self, index: usize) -> usize {
        self.records.as_ptr().wrapping_add(index) as usize
    }

    /// Control words and FIFO address returned by the backend.
    pub fn set_control(&mut self, control: ChainControl) {
        self.control = Some(control);
    }

    /// Start over at the first pair.
    pub fn reset(&mut self) {
        self.next_pair = 0;
        self.records = [DmaDescriptor::EMPTY; RECORDS];
    }

    /// First record index of the pair the next [`write`](Self::write) calls
    /// fill.
    pub const fn next_pair(&self) -> usize {
        self.next_pair
    }

    /// All records.
    pub fn records(&self) -> &[DmaDescriptor; RECORDS] {
        &self.records
    }

    /// Address table read by the list-reset channel.
    pub fn reset_table(&self) -> &[usize; 2] {
        &self.reset_table
    }

    /// Rewrite record `index` (0 or 1) of the pair being filled to stream
    /// `count` words from `read_addr`.
    #[allow(clippy::arithmetic_side_effects)] // Safety: next_pair is 0 or 2 and index < PAIR
    pub fn write(&mut self, index: usize, read_addr: usize, count: u32) {
        let Some(control) = self.control else {
            return;
        };
        let ctrl = if index + 1 == PAIR {
            control.ctrl_wrap
        } else {
            control.ctrl_continue
        };
        if let Some(record) = self.records.get_mut(self.next_pair + index) {
            *record = DmaDescriptor {
                read_addr,
                write_addr: control.fifo_addr,
                transfer_count: count,
                ctrl,
            };
        }
    }

    /// Done with the current pair; the next writes fill the other one.
    pub fn finish_pair(&mut self) {
        self.next_pair ^= PAIR;
    }
}
