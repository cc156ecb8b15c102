//! Constants used across the RF1A link implementation.
//!
//! This module defines the radio core's register map, instruction encodings,
//! status byte layout and the buffer sizes the link driver is built around.
//!
//! The register addresses and instruction bits are those of the CC1101 core
//! embedded in the CC430 family. They must match the silicon bit for bit.
//!
//! ## Key Concepts
//!
//! - **Instructions**: A register address is OR-ed with an access-type prefix
//!   (single/burst, read/write) to form the instruction byte.
//! - **Status registers**: Share their addresses with the command strobes and are
//!   only reachable with the burst bit set.
//! - **Frame limits**: Bounded by the 64-byte hardware FIFOs and the payload size
//!   that deployed peers expect.

/// Single-register write prefix.
pub const RF_SNGLREGWR: u8 = 0x00;

/// Burst-register write prefix.
pub const RF_REGWR: u8 = 0x40;

/// Single-register read prefix (configuration space).
pub const RF_SNGLREGRD: u8 = 0x80;

/// Burst-register read prefix.
pub const RF_REGRD: u8 = 0xC0;

/// Status-register read prefix.
///
/// Status registers live at `0x30..=0x3D` and are only readable with the burst
/// bit set; a plain read at those addresses is decoded as a command strobe.
pub const RF_STATREGRD: u8 = 0xC0;

/// Last address of the configuration register space.
pub const CONFIG_SPACE_END: u8 = 0x2E;

/// Power amplifier table address.
pub const PATABLE: u8 = 0x3E;

/// FIFO port address. Written for TX, read for RX.
pub const FIFO: u8 = 0x3F;

/// GDO2 output pin configuration.
pub const IOCFG2: u8 = 0x00;
/// GDO1 output pin configuration.
pub const IOCFG1: u8 = 0x01;
/// GDO0 output pin configuration.
pub const IOCFG0: u8 = 0x02;
/// RX FIFO and TX FIFO thresholds.
pub const FIFOTHR: u8 = 0x03;
/// Sync word, high byte.
pub const SYNC1: u8 = 0x04;
/// Sync word, low byte.
pub const SYNC0: u8 = 0x05;
/// Packet length.
pub const PKTLEN: u8 = 0x06;
/// Packet automation control.
pub const PKTCTRL1: u8 = 0x07;
/// Packet automation control.
pub const PKTCTRL0: u8 = 0x08;
/// Device address.
pub const ADDR: u8 = 0x09;
/// Channel number.
pub const CHANNR: u8 = 0x0A;
/// Frequency synthesizer control.
pub const FSCTRL1: u8 = 0x0B;
/// Frequency synthesizer control.
pub const FSCTRL0: u8 = 0x0C;
/// Frequency control word, high byte.
pub const FREQ2: u8 = 0x0D;
/// Frequency control word, middle byte.
pub const FREQ1: u8 = 0x0E;
/// Frequency control word, low byte.
pub const FREQ0: u8 = 0x0F;
/// Modem configuration.
pub const MDMCFG4: u8 = 0x10;
/// Modem configuration.
pub const MDMCFG3: u8 = 0x11;
/// Modem configuration.
pub const MDMCFG2: u8 = 0x12;
/// Modem configuration.
pub const MDMCFG1: u8 = 0x13;
/// Modem configuration.
pub const MDMCFG0: u8 = 0x14;
/// Modem deviation setting.
pub const DEVIATN: u8 = 0x15;
/// Main radio control state machine configuration.
pub const MCSM2: u8 = 0x16;
/// Main radio control state machine configuration.
pub const MCSM1: u8 = 0x17;
/// Main radio control state machine configuration.
pub const MCSM0: u8 = 0x18;
/// Frequency offset compensation configuration.
pub const FOCCFG: u8 = 0x19;
/// Bit synchronization configuration.
pub const BSCFG: u8 = 0x1A;
/// AGC control.
pub const AGCCTRL2: u8 = 0x1B;
/// AGC control.
pub const AGCCTRL1: u8 = 0x1C;
/// AGC control.
pub const AGCCTRL0: u8 = 0x1D;
/// High byte event0 timeout.
pub const WOREVT1: u8 = 0x1E;
/// Low byte event0 timeout.
pub const WOREVT0: u8 = 0x1F;
/// Wake on radio control.
pub const WORCTRL: u8 = 0x20;
/// Front end RX configuration.
pub const FREND1: u8 = 0x21;
/// Front end TX configuration.
pub const FREND0: u8 = 0x22;
/// Frequency synthesizer calibration.
pub const FSCAL3: u8 = 0x23;
/// Frequency synthesizer calibration.
pub const FSCAL2: u8 = 0x24;
/// Frequency synthesizer calibration.
pub const FSCAL1: u8 = 0x25;
/// Frequency synthesizer calibration.
pub const FSCAL0: u8 = 0x26;
/// Frequency synthesizer calibration control.
pub const FSTEST: u8 = 0x29;
/// Production test.
pub const PTEST: u8 = 0x2A;
/// AGC test.
pub const AGCTEST: u8 = 0x2B;
/// Various test settings.
pub const TEST2: u8 = 0x2C;
/// Various test settings.
pub const TEST1: u8 = 0x2D;
/// Various test settings.
pub const TEST0: u8 = 0x2E;

/// Number of bytes waiting in the RX FIFO (status register).
///
/// Bit 7 flags an RX FIFO overflow; bits 6..0 hold the byte count.
pub const RXBYTES: u8 = 0x3B;

/// RX FIFO overflow flag in [`RXBYTES`].
pub const RXBYTES_OVERFLOW: u8 = 0x80;

/// IOCFG2 value routing the chip-ready signal (`CHIP_RDYn`) to GDO2.
pub const IOCFG2_CHIP_READY: u8 = 0x29;

/// Mask selecting the chip state field of a status byte.
pub const STATUS_STATE_MASK: u8 = 0x70;

/// Mask selecting the FIFO byte count field of a status byte.
pub const STATUS_FIFO_MASK: u8 = 0x0F;

/// CRC-ok flag in the appended packet status byte.
pub const CRC_OK: u8 = 0x80;

/// Link quality indicator field in the appended packet status byte.
pub const LQI_MASK: u8 = 0x7F;

/// Depth of each hardware FIFO, in bytes.
///
/// The receive scratch buffer is sized to this so that a full FIFO can always
/// be drained in one burst.
pub const FIFO_SIZE: usize = 64;

/// Maximum payload carried by one outbound frame.
///
/// Deployed peers are built with the same limit; raising it breaks
/// compatibility.
pub const MAX_PAYLOAD_LEN: usize = 60;

/// Maximum payload carried by one inbound frame (FIFO minus length, RSSI and status).
pub const MAX_RX_PAYLOAD_LEN: usize = FIFO_SIZE - 3;

/// Smallest RX FIFO content that can hold a frame: length, one payload byte,
/// RSSI and status.
pub const MIN_RX_FRAME_LEN: usize = 4;

/// Capacity of the outbound byte queue. Room for several messages.
pub const TX_QUEUE_LEN: usize = MAX_PAYLOAD_LEN * 3;

/// The default message terminator.
pub const DEFAULT_TERMINATOR: u8 = b'\n';

/// Offset used by the radio when reporting RSSI, in dB.
pub const RSSI_OFFSET_DB: i16 = 74;

/// Largest outbound frame: the length byte followed by a maximum payload.
pub const MAX_FRAME_LEN: usize = MAX_PAYLOAD_LEN + 1;
