//! HDMI auxiliary-channel encoder.
//!
//! Pure, allocation-free functions that turn HDMI data packets into the
//! 30-bit serializer words of a data island:
//!
//! - [`bch`] - BCH(32,24) / BCH(64,56) parity bytes
//! - [`terc4`] - TMDS error reduction coding symbols
//! - [`packet`] - [`DataPacket`] layout and parity/checksum helpers
//! - [`infoframe`] - AVI / audio info frames, clock regeneration, general control
//! - [`audio`] - IEC 60958 audio sample packets
//! - [`island`] - guard-banded data-island word streams
//!
//! Every function here may run from the DMA completion interrupt: no
//! allocation, no loops that depend on anything but the packet count.

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Bit-level codec: narrowing casts are the point of most expressions here.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::unreadable_literal)] // TERC4 codewords are written as in the HDMI tables

pub mod audio;
pub mod bch;
pub mod infoframe;
pub mod island;
pub mod packet;
pub mod terc4;

pub use island::{encode_data_island, island_words, W_DATA_PACKET, W_GUARDBAND, W_PREAMBLE};
pub use packet::{DataPacket, PacketError};
