//! DVI / HDMI / VGA scanout over descriptor-chained DMA.
//!
//! The driver streams a 30-bit serializer one scanline at a time. Blanking
//! and sync are precompiled command tables; active lines come from a small
//! pool of line buffers refilled by a [`LineRenderer`]. HDMI outputs carry
//! info frames on one line per frame and, optionally, audio sample packets
//! spliced into the horizontal sync of every line.
//!
//! ```text
//! ┌────────────────┐ records ┌────────────┐ commands ┌────────────┐
//! │ DescriptorRing ├────────►│ stream DMA ├─────────►│ serializer │
//! └───────▲────────┘         └────────────┘          └────────────┘
//!         │ fill_pair (Tier 1)
//! ┌───────┴────────┐  LineTask (Tier 2)  ┌──────────────┐
//! │  StateMachine  ├────────────────────►│ LineRenderer │
//! └────────────────┘                     └──────────────┘
//! ```
//!
//! Hardware access goes through [`platform::ScanoutBackend`]; the host tests
//! run the whole driver against the `platform` mock backend. Each interrupt
//! gets its own handle from [`Scanout::split`].

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
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)] // register and signal names in doc comments

#[macro_use]
mod fmt;

pub mod audio_path;
pub mod chain;
pub mod compiler;
pub mod config;
pub mod driver;
pub mod error;
pub mod hstx;
pub mod linebuf;
pub mod mode;
pub mod modes;
pub mod palette;
pub mod state;
pub mod timing;

pub use audio_path::{AudioSource, AudioStats, AudioTx};
pub use config::{HdmiConfig, Output, ScanoutConfig};
pub use driver::{AudioService, LineService, Scanout, ScanoutIrq};
pub use error::{ConfigError, TimingError};
pub use linebuf::{LineFeed, LineRenderer, LineSlots, LineTask};
pub use mode::PixelMode;
pub use modes::VideoMode;
pub use palette::Palette;
pub use state::ScanState;
pub use timing::{AdjustFlags, HorizontalTimings, SyncPolarity, Timings, VerticalTimings};
