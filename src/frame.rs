//! Received frames and where they go.
//!
//! On air a frame is `[length][payload][RSSI][status]`. The radio strips the
//! preamble and sync word, checks the CRC, and appends the RSSI and a status
//! byte carrying the CRC-ok flag (bit 7) and the link quality indicator
//! (bits 6..0).
//!
//! The driver drains the RX FIFO into a scratch buffer and hands the bytes to
//! [`parse_frame`]. Slicing follows the RX FIFO byte count, not the on-air
//! length byte, so a corrupted length can never index past the data that was
//! actually read.
//!
//! ## Example
//!
//! ```rust
//! use rf1a_link::frame::{FrameSink, ReceivedFrame, Rssi, parse_frame};
//! use rf1a_link::heapless::Deque;
//!
//! let frame = parse_frame(&[0x02, b'o', b'k', 0xA3, 0x91]).unwrap();
//! assert_eq!(frame.payload.as_slice(), b"ok");
//! assert_eq!(frame.rssi, Rssi(0xA3));
//! assert_eq!(frame.link_quality, 0x11);
//!
//! let mut mailbox: Deque<ReceivedFrame, 1> = Deque::new();
//! assert!(mailbox.deliver(&frame));
//! assert!(!mailbox.deliver(&frame));
//! ```

use crate::consts::{CRC_OK, FIFO_SIZE, LQI_MASK, MAX_RX_PAYLOAD_LEN, MIN_RX_FRAME_LEN, RSSI_OFFSET_DB};
use crate::error::Fault;
use heapless::{Deque, Vec};

/// Raw RSSI byte as appended by the radio.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Rssi(pub u8);

impl Rssi {
    /// Signal strength in half-dBm steps.
    ///
    /// The raw value is a two's complement number in half-dB units with a
    /// fixed offset, so `dbm_x2() / 2` is the strength in dBm.
    pub fn dbm_x2(self) -> i16 {
        i16::from(self.0 as i8) - 2 * RSSI_OFFSET_DB
    }

    /// Unsigned 0..=255 scale, centred on a raw reading of zero.
    pub fn level(self) -> u8 {
        (i16::from(self.0 as i8) + 128) as u8
    }
}

/// One validated frame taken out of the RX FIFO.
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ReceivedFrame {
    /// Frame body without the length byte and the trailer.
    pub payload: Vec<u8, MAX_RX_PAYLOAD_LEN>,
    /// Received signal strength.
    pub rssi: Rssi,
    /// Link quality indicator, 7 bits.
    pub link_quality: u8,
}

/// Validates the raw RX FIFO content of one frame and splits it up.
///
/// `bytes` is exactly what the FIFO held: length byte, payload, RSSI, status.
pub fn parse_frame(bytes: &[u8]) -> Result<ReceivedFrame, Fault> {
    let n = bytes.len();
    if n < MIN_RX_FRAME_LEN {
        return Err(Fault::ShortFrame(n as u8));
    }
    if n > FIFO_SIZE {
        return Err(Fault::FrameOverflow(n.min(usize::from(u8::MAX)) as u8));
    }

    let status = bytes[n - 1];
    if status & CRC_OK == 0 {
        return Err(Fault::CrcFailure);
    }

    let payload = Vec::from_slice(&bytes[1..n - 2]).map_err(|_| Fault::FrameOverflow(n as u8))?;
    Ok(ReceivedFrame {
        payload,
        rssi: Rssi(bytes[n - 2]),
        link_quality: status & LQI_MASK,
    })
}

/// Consumer of received frames.
///
/// Called from the completion interrupt, so implementations must not block.
pub trait FrameSink {
    /// Takes a frame. Returns `false` if there is no room for it, in which
    /// case the frame is dropped.
    fn deliver(&mut self, frame: &ReceivedFrame) -> bool;
}

/// Mailbox of whole frames.
impl<const N: usize> FrameSink for Deque<ReceivedFrame, N> {
    fn deliver(&mut self, frame: &ReceivedFrame) -> bool {
        self.push_back(frame.clone()).is_ok()
    }
}

/// Byte stream of payloads, for bridging to a serial port. A payload is
/// appended whole or not at all.
impl<const N: usize> FrameSink for Vec<u8, N> {
    fn deliver(&mut self, frame: &ReceivedFrame) -> bool {
        self.extend_from_slice(&frame.payload).is_ok()
    }
}
