//! Error and fault types for the link driver.
//!
//! Two families are kept apart:
//!
//! - [`Error`] is returned from an operation that could not be carried out.
//!   The caller decides what to do with it.
//! - [`Fault`] is a transceiver integrity failure detected by the driver itself,
//!   usually in interrupt context. It is latched as a sticky indicator inside
//!   the driver and only cleared by [`LinkDriver::init`](crate::driver::LinkDriver::init).

use crate::driver::LinkState;
use thiserror::Error;

/// Interface flag a bus busy-wait was polling when it gave up.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum BusFlag {
    /// Radio core ready to accept the next instruction.
    InstructionReady,
    /// Radio core consumed the last data-in byte.
    DataIn,
    /// Radio core placed a byte in the data-out register.
    DataOut,
    /// Status byte of the last strobe is available.
    StatusReady,
    /// Radio core left sleep after a strobe (GDO2 chip-ready).
    ChipReady,
}

/// Errors returned by link driver operations.
#[derive(Error, PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Error {
    /// A busy-wait on the radio core interface exceeded the configured poll limit.
    #[error("radio core did not raise {0:?} within the poll limit")]
    BusTimeout(BusFlag),
    /// The raw opcode is not part of the command strobe set.
    #[error("{0:#04x} is not a command strobe")]
    InvalidStrobe(u8),
    /// The operation is not legal in the current link state.
    #[error("operation not permitted while {0:?}")]
    InvalidState(LinkState),
    /// A fault is latched; the link must be re-initialised first.
    #[error("link is faulted ({0}), re-initialise before listening")]
    Faulted(Fault),
    /// The outbound queue does not have room for the whole message.
    #[error("queue has room for {available} bytes, {requested} requested")]
    QueueOverflow {
        /// Bytes the caller tried to append.
        requested: usize,
        /// Free space left in the queue.
        available: usize,
    },
    /// The payload does not fit into a single frame.
    #[error("payload of {0} bytes exceeds the frame limit")]
    FrameTooLong(usize),
    /// The radio did not settle in the Idle state within the retry budget.
    #[error("radio did not return to idle")]
    IdleTimeout,
}

/// Transceiver integrity failures latched by the driver.
///
/// Every variant requires a full [`init`](crate::driver::LinkDriver::init)
/// before the next listen cycle.
#[derive(Error, PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Fault {
    /// The radio was not Idle when a received frame was about to be drained.
    #[error("radio reported state {status:#04x} instead of idle")]
    StateMismatch {
        /// Raw status byte returned by the no-op strobe.
        status: u8,
    },
    /// The RX FIFO held fewer bytes than the smallest valid frame.
    #[error("received {0} bytes, too short for a frame")]
    ShortFrame(u8),
    /// The RX FIFO reported more bytes than the scratch buffer can hold, or the
    /// overflow flag was set.
    #[error("RX FIFO reported {0:#04x} bytes")]
    FrameOverflow(u8),
    /// The radio's CRC check failed for the received frame.
    #[error("CRC check failed")]
    CrcFailure,
    /// A bus access timed out while the driver was handling an event.
    #[error("bus timeout waiting for {0:?}")]
    BusTimeout(BusFlag),
    /// The radio did not reach the Idle state within the retry budget.
    #[error("radio did not return to idle")]
    IdleTimeout,
    /// The end-of-packet signal for an outbound frame never arrived.
    #[error("transmission did not complete")]
    TxTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::InvalidStrobe(0x2f).to_string(),
            "0x2f is not a command strobe"
        );
        assert_eq!(
            Error::QueueOverflow {
                requested: 10,
                available: 4
            }
            .to_string(),
            "queue has room for 4 bytes, 10 requested"
        );
        assert_eq!(
            Error::Faulted(Fault::CrcFailure).to_string(),
            "link is faulted (CRC check failed), re-initialise before listening"
        );
        assert_eq!(
            Fault::StateMismatch { status: 0x10 }.to_string(),
            "radio reported state 0x10 instead of idle"
        );
        assert_eq!(
            Error::Faulted(Fault::TxTimeout).to_string(),
            "link is faulted (transmission did not complete), re-initialise before listening"
        );
    }
}
