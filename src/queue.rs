//! Outbound message queue.
//!
//! Callers append bytes as they become available; the driver takes them out
//! one frame at a time. Message boundaries are marked by a terminator byte
//! that stays part of the payload, so the receiver can reassemble lines.
//!
//! The queue is a ring buffer: taking a frame off the front costs the frame
//! length, not the queue length.
//!
//! ## Example
//!
//! ```rust
//! use rf1a_link::queue::{SendMode, TxQueue};
//!
//! let mut queue = TxQueue::new(b'\n');
//! queue.append(b"t=21.5\nt=2").unwrap();
//!
//! let frame = queue.peek_frame(SendMode::Full).unwrap();
//! assert_eq!(frame.as_slice(), b"\x07t=21.5\n");
//! queue.consume(&frame);
//!
//! // The rest waits for its terminator unless forced out.
//! assert!(queue.peek_frame(SendMode::Full).is_none());
//! assert_eq!(queue.peek_frame(SendMode::Force).unwrap().as_slice(), b"\x03t=2");
//! ```

use crate::consts::{MAX_FRAME_LEN, MAX_PAYLOAD_LEN, TX_QUEUE_LEN};
use crate::error::Error;
use heapless::{Deque, Vec};

/// A frame ready for the TX FIFO: `[len, payload..]`.
pub type OutboundFrame = Vec<u8, MAX_FRAME_LEN>;

/// How much of the queue one send takes.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum SendMode {
    /// Only a complete message: everything up to and including the first
    /// terminator. Nothing is sent while no terminator is queued.
    #[default]
    Full,
    /// Everything queued, terminated or not.
    Force,
}

/// Bounded, terminator-delimited byte queue.
#[derive(Debug)]
pub struct TxQueue {
    bytes: Deque<u8, TX_QUEUE_LEN>,
    terminator: u8,
}

impl TxQueue {
    /// Creates an empty queue splitting messages at `terminator`.
    pub const fn new(terminator: u8) -> Self {
        Self {
            bytes: Deque::new(),
            terminator,
        }
    }

    /// The message terminator.
    pub fn terminator(&self) -> u8 {
        self.terminator
    }

    /// Bytes currently queued.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Free space, in bytes.
    pub fn available(&self) -> usize {
        self.bytes.capacity() - self.bytes.len()
    }

    /// Drops everything queued.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Queued bytes, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &u8> {
        self.bytes.iter()
    }

    /// Appends `data` as a whole.
    ///
    /// Fails with [`Error::QueueOverflow`] and leaves the queue untouched if
    /// there is not enough room for all of it.
    pub fn append(&mut self, data: &[u8]) -> Result<(), Error> {
        let available = self.available();
        if data.len() > available {
            return Err(Error::QueueOverflow {
                requested: data.len(),
                available,
            });
        }
        for &byte in data {
            let _ = self.bytes.push_back(byte);
        }
        Ok(())
    }

    /// Builds the next frame without taking it off the queue.
    ///
    /// Returns `None` if the queue is empty, or in [`SendMode::Full`] if no
    /// terminator is queued. A frame never carries more than
    /// [`MAX_PAYLOAD_LEN`] bytes; a longer message goes out in pieces.
    pub fn peek_frame(&self, mode: SendMode) -> Option<OutboundFrame> {
        let take = match mode {
            SendMode::Full => self.bytes.iter().position(|&b| b == self.terminator)? + 1,
            SendMode::Force => self.bytes.len(),
        }
        .min(MAX_PAYLOAD_LEN);
        if take == 0 {
            return None;
        }

        let mut frame = OutboundFrame::new();
        let _ = frame.push(take as u8);
        for &byte in self.bytes.iter().take(take) {
            let _ = frame.push(byte);
        }
        Some(frame)
    }

    /// Removes the payload of a frame returned by [`peek_frame`](Self::peek_frame).
    pub fn consume(&mut self, frame: &OutboundFrame) {
        let payload_len = frame.len().saturating_sub(1);
        for _ in 0..payload_len {
            if self.bytes.pop_front().is_none() {
                break;
            }
        }
    }
}

impl Default for TxQueue {
    fn default() -> Self {
        Self::new(crate::consts::DEFAULT_TERMINATOR)
    }
}
