//! Hardware abstraction for HSTX scanout.
//!
//! The scanout driver is written purely against the [`ScanoutBackend`] trait
//! defined here. A backend owns the three DMA channels of the descriptor
//! chain, the three interrupt lines the driver runs on, and the serial output
//! peripheral's expander configuration. Nothing in the driver touches a
//! register directly.
//!
//! # Architecture Layers
//!
//! ```text
//! Application (renderer, mixer, main loop)
//!         ↓
//! scanout (timing, compiler, state machine, descriptor chain)
//!         ↓                      ↓
//!      hdmi, playback      platform (this crate - backend trait)
//!                                ↓
//!                   MCU HAL / PAC (DMA, NVIC, HSTX)
//! ```
//!
//! # Guarantees a backend must provide
//!
//! - A descriptor record written by the display-list channel is installed
//!   atomically into the stream channel's trigger registers.
//! - The stream channel chains to the display-list channel, or to the
//!   list-reset channel when the record's control word says so, without CPU
//!   involvement.
//! - Interrupt lines can be raised from software and are serviced at the
//!   priority tier they were given.
//!
//! # Features
//!
//! - `std`: Expose [`mocks`] to dependent crates (host tests)
//! - `defmt`: Derive `defmt::Format` on all public types
//! - `cortex-m`: [`nvic`] helper for interrupt lines on Cortex-M parts

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors; callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod backend;
pub mod dma;
pub mod serializer;

#[cfg(feature = "cortex-m")]
pub mod nvic;

pub mod mocks;

pub use backend::{BackendError, IrqPriority, IrqRole, ScanoutBackend};
pub use dma::{ChainConfig, ChainControl, ChannelId, ChannelRole, DmaDescriptor};
pub use serializer::{LaneMode, SerializerConfig};
