//! Descriptor-chain DMA types.
//!
//! Scanout runs on three cooperating channels:
//!
//! | Role | Reads | Writes | Chains to |
//! |---|---|---|---|
//! | [`ChannelRole::DisplayList`] | next [`DmaDescriptor`] record | stream channel trigger registers | (trigger) |
//! | [`ChannelRole::Stream`] | command words / line buffer | serializer FIFO | display list, or list reset on the last record of a pair |
//! | [`ChannelRole::ListReset`] | alternate pair address | display list read pointer | display list |
//!
//! The records live in driver memory; the backend only learns their address
//! through [`ChainConfig`] and never copies them.

// ── Channel identity ─────────────────────────────────────────────────────────

/// Role of a DMA channel within the scanout chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelRole {
    /// Transfers command words and pixel data to the serializer FIFO.
    Stream,
    /// Copies one descriptor record into the stream channel and triggers it.
    DisplayList,
    /// Rewinds the display-list channel to the alternate record pair.
    ListReset,
}

impl ChannelRole {
    /// All roles, in claim order.
    pub const ALL: [ChannelRole; 3] = [
        ChannelRole::Stream,
        ChannelRole::DisplayList,
        ChannelRole::ListReset,
    ];

    /// Dense index of this role (0..3).
    pub const fn index(self) -> usize {
        match self {
            ChannelRole::Stream => 0,
            ChannelRole::DisplayList => 1,
            ChannelRole::ListReset => 2,
        }
    }
}

/// Hardware channel number handed out by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct ChannelId(pub u8);

// ── Descriptor record ────────────────────────────────────────────────────────

/// One descriptor record, laid out exactly as the stream channel's
/// read-address / write-address / count / control-and-trigger alias.
///
/// Records are fully rewritten before every use; no field carries state
/// between lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C, align(16))]
pub struct DmaDescriptor {
    /// Source address of the words to stream.
    pub read_addr: usize,
    /// Destination address (the serializer FIFO).
    pub write_addr: usize,
    /// Number of 32-bit words to transfer.
    pub transfer_count: u32,
    /// Channel control word; writing it triggers the transfer.
    pub ctrl: u32,
}

impl DmaDescriptor {
    /// An all-zero record.
    pub const EMPTY: Self = Self {
        read_addr: 0,
        write_addr: 0,
        transfer_count: 0,
        ctrl: 0,
    };
}

// ── Chain configuration ──────────────────────────────────────────────────────

/// Everything a backend needs to wire the three channels together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChainConfig {
    /// Channel streaming words into the serializer.
    pub stream: ChannelId,
    /// Channel copying records into `stream`.
    pub display_list: ChannelId,
    /// Channel rewinding `display_list`.
    pub list_reset: ChannelId,
    /// Address of the first [`DmaDescriptor`] record.
    pub records: usize,
    /// Number of records in the ring (two pairs).
    pub record_count: usize,
    /// Address of the table of pair start addresses read by `list_reset`.
    pub reset_table: usize,
    /// Number of entries in the reset table.
    pub reset_entries: usize,
}

/// Values the backend computes once the chain is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChainControl {
    /// Serializer FIFO address, written to every record's `write_addr`.
    pub fifo_addr: usize,
    /// Control word for records that chain back to the display-list channel.
    pub ctrl_continue: u32,
    /// Control word for the last record of a pair; chains to list reset.
    pub ctrl_wrap: u32,
}
