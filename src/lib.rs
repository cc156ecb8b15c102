//! # rf1a-link
//!
//! A portable, no_std Rust link driver for the RF1A radio core of the CC430
//! family: a CC1101 sub-GHz transceiver reached through a memory-mapped
//! instruction/data register window instead of SPI.
//!
//! The driver implements a half-duplex packet link for battery-powered sensor
//! nodes using:
//! - `embedded-hal` traits for delays and the on-air indicator pin
//! - a [`RadioInterface`](bus::RadioInterface) trait for the register window,
//!   implemented by the HAL
//! - `heapless` buffers for the outbound queue and received frames
//! - interrupt-safe sharing with `critical-section`
//!
//! ## Crate features
//! | Feature          | Description |
//! |------------------|-------------|
//! | `std`            | Disables `#![no_std]` |
//! | `isr` (default)  | Helpers for sharing the driver with the interrupt vector via `critical_section::with` |
//! | `defmt-0-3`      | Uses `defmt` logging and derives `defmt::Format` on public types |
//! | `log`            | Uses `log` logging |
//!
//! ## Software Features
//!
//! - **Bus access layer** speaking the command strobe and register protocol,
//!   with the RF1A7 erratum workaround and bounded busy-waits
//! - **Bit-exact register profiles** for receiver sensitivity or low current
//! - **Interrupt-driven state machine** sharing one completion signal between
//!   TX and RX
//! - **Receive validation** of radio state, length, FIFO overflow and CRC
//! - **Terminator-delimited outbound queue** with full and forced flushes
//! - **Sticky faults** and a bounded wait-then-reset recovery cycle
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rf1a_link::config::LinkConfig;
//! use rf1a_link::driver::LinkDriver;
//! use rf1a_link::queue::SendMode;
//!
//! let mut link = LinkDriver::new(rf1a, delay, Some(led), uart_bytes, LinkConfig::default());
//! link.init()?;
//! loop {
//!     link.resume_listening()?;
//!     link.append(b"t=21.5\n")?;
//!     link.send_next(SendMode::Full)?;
//! }
//! ```
//!
//! With the `isr` feature, keep the driver in a static and dispatch the
//! interrupt through it:
//!
//! ```rust,ignore
//! rf1a_link::init_radio_link!(Rf1a, Delay, Led, Deque<ReceivedFrame, 4>);
//!
//! #[interrupt]
//! fn CC1101() {
//!     let _ = rf1a_link::radio_link_interrupt!();
//! }
//! ```
//!
//! ## Integration Notes
//!
//! - The radio core raises one end-of-packet interrupt for both directions;
//!   the HAL must route it to [`LinkDriver::on_completion_interrupt`](driver::LinkDriver::on_completion_interrupt).
//! - The register tables are fixed for compatibility with deployed nodes.
//! - Only one driver instance may own the radio core.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "isr")]
pub use critical_section;

pub use heapless;

// Declared first so the other modules see its macros.
pub(crate) mod fmt;

pub mod bus;
pub mod config;
pub mod consts;
pub mod driver;
pub mod error;
pub mod frame;
#[cfg(feature = "isr")]
pub mod isr;
pub mod queue;

#[cfg(any(test, feature = "std"))]
#[doc(hidden)]
pub mod sim;

pub use driver::{Completion, LinkDriver, LinkState};
pub use error::{Error, Fault};
