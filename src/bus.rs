//! Bus access layer for the RF1A radio core.
//!
//! The CC430 talks to its embedded CC1101 core through a small register window
//! rather than SPI: an instruction register, a data-in and a data-out register,
//! a status register and a set of interface flags. This module provides the
//! [`RadioInterface`] trait describing that window and [`Bus`], which speaks the
//! command/register protocol on top of it:
//!
//! - command strobes, including the RF1A7 erratum workaround
//! - single and burst register reads and writes
//! - power amplifier table writes
//!
//! Every busy-wait is bounded by a poll limit and reports
//! [`Error::BusTimeout`] instead of hanging when the core stops responding.
//!
//! ## Example
//!
//! ```rust
//! # use rf1a_link::sim::{SimCore, SimDelay};
//! use rf1a_link::bus::{Bus, Strobe};
//! use rf1a_link::consts::CHANNR;
//!
//! # let radio_core = SimCore::new();
//! # let delay = SimDelay::default();
//! let mut bus = Bus::new(radio_core, delay, 100_000, 810);
//! let status = bus.strobe(Strobe::Nop)?;
//! if status.is_idle() {
//!     bus.write_register(CHANNR, 0)?;
//! }
//! # assert_eq!(bus.read_register(CHANNR)?, 0);
//! # Ok::<(), rf1a_link::Error>(())
//! ```

use crate::consts::{
    CONFIG_SPACE_END, IOCFG2, IOCFG2_CHIP_READY, PATABLE, RF_REGRD, RF_REGWR, RF_SNGLREGRD,
    RF_SNGLREGWR, RF_STATREGRD, STATUS_FIFO_MASK, STATUS_STATE_MASK,
};
use crate::error::{BusFlag, Error};
use embedded_hal::delay::DelayNs;

/// Register window of the radio core.
///
/// Each method maps onto one access of the RF1A interface registers. A HAL
/// implements this for the memory-mapped peripheral; tests implement it with a
/// simulated core.
pub trait RadioInterface {
    /// Reads the interface flag register (`RF1AIFCTL1`).
    fn flags(&mut self) -> InterfaceFlags;

    /// Clears the status-ready flag (`RFSTATIFG`).
    fn clear_status_ready(&mut self);

    /// Writes an instruction byte (`RF1AINSTRB`).
    fn write_instruction(&mut self, instruction: u8);

    /// Writes an instruction together with its first data byte (`RF1AINSTRW`).
    fn write_instruction_word(&mut self, instruction: u8, data: u8);

    /// Writes an instruction that triggers an automatic read of the first
    /// data byte (`RF1AINSTR1B`).
    fn write_instruction_auto_read(&mut self, instruction: u8);

    /// Writes a data byte (`RF1ADINB`).
    fn write_data(&mut self, data: u8);

    /// Reads the data-out register, clearing the data-out flag (`RF1ADOUTB`).
    fn read_data(&mut self) -> u8;

    /// Reads the data-out register and starts the auto-read of the next byte
    /// (`RF1ADOUT1B`).
    fn read_data_auto(&mut self) -> u8;

    /// Reads the data-out register without starting another auto-read
    /// (`RF1ADOUT0B`).
    fn read_data_last(&mut self) -> u8;

    /// Reads the status byte of the last strobe (`RF1ASTATB`).
    fn read_status(&mut self) -> u8;

    /// Returns `true` while GDO2 reports the chip as not ready.
    ///
    /// Only meaningful while IOCFG2 routes the chip-ready signal to GDO2.
    fn chip_asleep(&mut self) -> bool;

    /// Selects the falling edge for the completion interrupt (`RF1AIES`).
    fn select_falling_edge(&mut self);

    /// Clears a pending completion interrupt (`RF1AIFG`).
    fn clear_completion(&mut self);

    /// Enables or disables the completion interrupt (`RF1AIE`).
    fn set_completion_enabled(&mut self, enabled: bool);
}

/// Snapshot of the interface flag register.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct InterfaceFlags(pub u8);

impl InterfaceFlags {
    /// Ready for the next instruction (`RFINSTRIFG`).
    pub const INSTRUCTION_READY: u8 = 0x10;
    /// Data-in register consumed (`RFDINIFG`).
    pub const DATA_IN: u8 = 0x20;
    /// Status byte available (`RFSTATIFG`).
    pub const STATUS_READY: u8 = 0x40;
    /// Data-out register holds a byte (`RFDOUTIFG`).
    pub const DATA_OUT: u8 = 0x80;

    /// Whether the flag a busy-wait is polling for is raised.
    pub fn contains(self, flag: BusFlag) -> bool {
        let mask = match flag {
            BusFlag::InstructionReady => Self::INSTRUCTION_READY,
            BusFlag::DataIn => Self::DATA_IN,
            BusFlag::DataOut => Self::DATA_OUT,
            BusFlag::StatusReady => Self::STATUS_READY,
            BusFlag::ChipReady => return false,
        };
        self.0 & mask != 0
    }
}

/// Command strobes understood by the radio core.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum Strobe {
    /// Reset chip.
    Reset = 0x30,
    /// Enable and calibrate frequency synthesizer.
    FsTxOn = 0x31,
    /// Turn off crystal oscillator.
    XOff = 0x32,
    /// Calibrate frequency synthesizer and turn it off.
    Calibrate = 0x33,
    /// Enable RX.
    Rx = 0x34,
    /// Enable TX.
    Tx = 0x35,
    /// Exit RX/TX, turn off frequency synthesizer.
    Idle = 0x36,
    /// Automatic frequency compensation.
    Afc = 0x37,
    /// Start automatic RX polling sequence (wake-on-radio).
    Wor = 0x38,
    /// Enter power down mode.
    PowerDown = 0x39,
    /// Flush the RX FIFO.
    FlushRx = 0x3A,
    /// Flush the TX FIFO.
    FlushTx = 0x3B,
    /// Reset the real time clock.
    WorReset = 0x3C,
    /// No operation. The status byte reports free TX FIFO space.
    Nop = 0x3D,
    /// No operation with the read bit set. The status byte reports the RX FIFO count.
    NopRx = 0xBD,
}

impl Strobe {
    /// The raw opcode.
    pub const fn opcode(self) -> u8 {
        self as u8
    }

    /// Operational strobes, strictly between reset and no-op, go through the
    /// RF1A7 chip-ready workaround.
    pub const fn needs_wake_workaround(self) -> bool {
        let op = self.opcode();
        op > Strobe::Reset.opcode() && op < Strobe::Nop.opcode()
    }

    /// Strobes that leave the chip asleep, so waiting for chip-ready would hang.
    pub const fn is_sleep_command(self) -> bool {
        matches!(self, Strobe::XOff | Strobe::PowerDown | Strobe::Wor)
    }
}

impl TryFrom<u8> for Strobe {
    type Error = Error;

    fn try_from(opcode: u8) -> Result<Self, Self::Error> {
        Ok(match opcode {
            0x30 => Strobe::Reset,
            0x31 => Strobe::FsTxOn,
            0x32 => Strobe::XOff,
            0x33 => Strobe::Calibrate,
            0x34 => Strobe::Rx,
            0x35 => Strobe::Tx,
            0x36 => Strobe::Idle,
            0x37 => Strobe::Afc,
            0x38 => Strobe::Wor,
            0x39 => Strobe::PowerDown,
            0x3A => Strobe::FlushRx,
            0x3B => Strobe::FlushTx,
            0x3C => Strobe::WorReset,
            0x3D => Strobe::Nop,
            0xBD => Strobe::NopRx,
            other => return Err(Error::InvalidStrobe(other)),
        })
    }
}

/// Main radio control state, as reported in a status byte.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum ChipState {
    /// Idle.
    Idle,
    /// Receive mode.
    Rx,
    /// Transmit mode.
    Tx,
    /// Fast TX ready.
    FsTxOn,
    /// Frequency synthesizer calibration running.
    Calibrate,
    /// PLL settling.
    Settling,
    /// RX FIFO overflowed, needs a flush.
    RxFifoOverflow,
    /// TX FIFO underflowed, needs a flush.
    TxFifoUnderflow,
}

/// Status byte returned by every command strobe.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct StatusByte(pub u8);

impl StatusByte {
    /// The chip state field.
    pub fn state(self) -> ChipState {
        match (self.0 & STATUS_STATE_MASK) >> 4 {
            0 => ChipState::Idle,
            1 => ChipState::Rx,
            2 => ChipState::Tx,
            3 => ChipState::FsTxOn,
            4 => ChipState::Calibrate,
            5 => ChipState::Settling,
            6 => ChipState::RxFifoOverflow,
            _ => ChipState::TxFifoUnderflow,
        }
    }

    /// FIFO byte count, saturating at 15.
    pub fn fifo_bytes(self) -> u8 {
        self.0 & STATUS_FIFO_MASK
    }

    /// Whether the chip reports the Idle state.
    pub fn is_idle(self) -> bool {
        self.0 & STATUS_STATE_MASK == 0
    }
}

/// Command/register protocol driver over a [`RadioInterface`].
///
/// The bus owns the interface and a delay source used for the erratum settle
/// time. It holds no protocol state of its own.
#[derive(Debug)]
pub struct Bus<I, D> {
    iface: I,
    delay: D,
    poll_limit: u32,
    settle_us: u32,
}

impl<I, D> Bus<I, D>
where
    I: RadioInterface,
    D: DelayNs,
{
    /// Creates a bus over the given interface.
    ///
    /// # Arguments
    /// - `iface`: The radio core register window.
    /// - `delay`: Delay source for the erratum settle time and retry loops.
    /// - `poll_limit`: Maximum iterations of any busy-wait before [`Error::BusTimeout`].
    /// - `settle_us`: Settle time after the chip wakes from sleep (RF1A7).
    pub fn new(iface: I, delay: D, poll_limit: u32, settle_us: u32) -> Self {
        Self {
            iface,
            delay,
            poll_limit,
            settle_us,
        }
    }

    /// Gives the interface and delay back.
    pub fn release(self) -> (I, D) {
        (self.iface, self.delay)
    }

    /// Direct access to the register window.
    pub fn interface_mut(&mut self) -> &mut I {
        &mut self.iface
    }

    pub(crate) fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    fn wait_for(&mut self, flag: BusFlag) -> Result<(), Error> {
        for _ in 0..self.poll_limit {
            if self.iface.flags().contains(flag) {
                return Ok(());
            }
        }
        warn!("bus timeout waiting for {:?}", flag);
        Err(Error::BusTimeout(flag))
    }

    fn wait_chip_ready(&mut self) -> Result<(), Error> {
        for _ in 0..self.poll_limit {
            if !self.iface.chip_asleep() {
                return Ok(());
            }
        }
        warn!("bus timeout waiting for {:?}", BusFlag::ChipReady);
        Err(Error::BusTimeout(BusFlag::ChipReady))
    }

    /// Issues a command strobe and returns the status byte that follows it.
    ///
    /// Operational strobes temporarily route chip-ready to GDO2. If the chip
    /// was asleep and the strobe wakes it, the call waits for chip-ready and
    /// holds the settle delay before restoring IOCFG2 (erratum RF1A7).
    pub fn strobe(&mut self, cmd: Strobe) -> Result<StatusByte, Error> {
        self.iface.clear_status_ready();
        self.wait_for(BusFlag::InstructionReady)?;

        if cmd.needs_wake_workaround() {
            let gdo2 = self.read_register(IOCFG2)?;
            self.write_register(IOCFG2, IOCFG2_CHIP_READY)?;

            self.iface.write_instruction(cmd.opcode());
            if self.iface.chip_asleep() && !cmd.is_sleep_command() {
                self.wait_chip_ready()?;
                self.delay.delay_us(self.settle_us);
            }

            self.write_register(IOCFG2, gdo2)?;
            self.wait_for(BusFlag::StatusReady)?;
        } else {
            self.iface.write_instruction(cmd.opcode());
        }

        let status = StatusByte(self.iface.read_status());
        trace!("strobe {:?} -> {:?}", cmd, status);
        Ok(status)
    }

    /// Validates a raw opcode and issues it as a strobe.
    pub fn strobe_raw(&mut self, opcode: u8) -> Result<StatusByte, Error> {
        let cmd = Strobe::try_from(opcode)?;
        self.strobe(cmd)
    }

    /// Reads a single register.
    ///
    /// Configuration addresses (and the PA table alias) use the single read
    /// instruction; everything else is read as a status register.
    pub fn read_register(&mut self, addr: u8) -> Result<u8, Error> {
        let instruction = if addr <= CONFIG_SPACE_END || addr == PATABLE {
            addr | RF_SNGLREGRD
        } else {
            addr | RF_STATREGRD
        };
        self.wait_for(BusFlag::InstructionReady)?;
        self.iface.write_instruction_auto_read(instruction);
        self.wait_for(BusFlag::DataOut)?;
        Ok(self.iface.read_data())
    }

    /// Writes a single register.
    pub fn write_register(&mut self, addr: u8, value: u8) -> Result<(), Error> {
        self.wait_for(BusFlag::InstructionReady)?;
        self.iface.write_instruction(addr | RF_SNGLREGWR);
        self.iface.write_data(value);
        Ok(())
    }

    /// Reads `buf.len()` consecutive bytes starting at `addr`.
    ///
    /// Reading the FIFO address drains that many bytes from the RX FIFO. The
    /// last byte is taken without auto-read so no byte beyond the requested
    /// count is pulled out of the FIFO. An empty buffer is a no-op.
    pub fn read_burst(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), Error> {
        let Some((last, head)) = buf.split_last_mut() else {
            return Ok(());
        };
        self.wait_for(BusFlag::InstructionReady)?;
        self.iface.write_instruction_auto_read(addr | RF_REGRD);
        for byte in head {
            self.wait_for(BusFlag::DataOut)?;
            *byte = self.iface.read_data_auto();
        }
        self.wait_for(BusFlag::DataOut)?;
        *last = self.iface.read_data_last();
        Ok(())
    }

    /// Writes `buf` to consecutive registers starting at `addr`.
    ///
    /// Writing the FIFO address appends to the TX FIFO. An empty buffer is a no-op.
    pub fn write_burst(&mut self, addr: u8, buf: &[u8]) -> Result<(), Error> {
        self.stream_out(addr | RF_REGWR, buf)
    }

    /// Writes a single PA table entry and resets the table pointer.
    pub fn write_power_table(&mut self, value: u8) -> Result<(), Error> {
        self.wait_for(BusFlag::InstructionReady)?;
        self.iface.write_instruction_word(PATABLE | RF_SNGLREGWR, value);
        self.reset_table_pointer()
    }

    /// Writes consecutive PA table entries and resets the table pointer.
    pub fn write_power_table_burst(&mut self, values: &[u8]) -> Result<(), Error> {
        self.stream_out(PATABLE | RF_REGWR, values)?;
        self.reset_table_pointer()
    }

    fn stream_out(&mut self, instruction: u8, buf: &[u8]) -> Result<(), Error> {
        let Some((first, rest)) = buf.split_first() else {
            return Ok(());
        };
        self.wait_for(BusFlag::InstructionReady)?;
        self.iface.write_instruction_word(instruction, *first);
        for byte in rest {
            self.iface.write_data(*byte);
            self.wait_for(BusFlag::DataIn)?;
        }
        // Data-out holds the status byte of the transfer; reading it clears the flag.
        let _ = self.iface.read_data();
        Ok(())
    }

    fn reset_table_pointer(&mut self) -> Result<(), Error> {
        self.wait_for(BusFlag::InstructionReady)?;
        self.iface.write_instruction(Strobe::Nop.opcode());
        Ok(())
    }
}
