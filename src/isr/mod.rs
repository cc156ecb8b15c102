//! Sharing the link driver with the radio core interrupt.
//!
//! The driver is kept in a `static` [`critical_section::Mutex`]. The main loop
//! and the interrupt vector both reach it through `critical_section::with`,
//! which on a single-core MCU masks interrupts for the duration of the
//! closure. Keep every access short: a register sequence or a queue
//! operation.
//!
//! Contains:
//! - [`global_link_init`]: const initializer for the `static`
//! - [`global_link_setup`]: builds, initialises and installs the driver
//! - [`global_completion_interrupt`]: the body of the interrupt vector
//! - [`with_global_link`]: main-loop access to the driver
//! - [`global_wait_transmit_done`]: bounded wait for the current frame to leave
//! - `init_radio_link!`, `setup_radio_link!` and `radio_link_interrupt!`,
//!   the same operations on a crate-named `RADIO_LINK` static
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::digital::Mock as Led;
//! # use rf1a_link::sim::{SimCore as Rf1a, SimDelay as Delay};
//! use rf1a_link::config::LinkConfig;
//! use rf1a_link::frame::ReceivedFrame;
//! use rf1a_link::heapless::Deque;
//! use rf1a_link::isr::{SharedLink, global_completion_interrupt, global_link_init, global_link_setup};
//!
//! type Mailbox = Deque<ReceivedFrame, 4>;
//!
//! static LINK: SharedLink<Rf1a, Delay, Led, Mailbox> = global_link_init();
//!
//! // Bound to the radio core interrupt vector.
//! fn cc1101_handler() {
//!     let _ = global_completion_interrupt(&LINK);
//! }
//!
//! global_link_setup(&LINK, Rf1a::new(), Delay::default(), None, Deque::new(), LinkConfig::default())?;
//! cc1101_handler();
//! # Ok::<(), rf1a_link::Error>(())
//! ```

mod global;
mod macros;

pub use global::*;
