//! Simulated RF1A radio core for host tests.
//!
//! Decodes the instruction stream the way the silicon does: strobes, single and
//! burst register access, the FIFO port, the PA table and the status registers.
//! Everything the driver does is recorded so tests can assert on it.

use crate::bus::{InterfaceFlags, RadioInterface};
use crate::consts::{FIFO, FIFO_SIZE, IOCFG2, IOCFG2_CHIP_READY, PATABLE, RXBYTES};
use embedded_hal::delay::DelayNs;
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug)]
struct Access {
    addr: u8,
    burst: bool,
    read: bool,
}

/// In-memory model of the radio core.
#[derive(Debug)]
pub struct SimCore {
    /// Configuration register file.
    pub regs: [u8; 0x40],
    /// Every value written to IOCFG2, in order.
    pub iocfg2_writes: Vec<u8>,
    /// Power amplifier table.
    pub patable: Vec<u8>,
    patable_ptr: usize,
    /// Pending received bytes.
    pub rx_fifo: VecDeque<u8>,
    /// Sets the overflow bit of RXBYTES.
    pub rx_overflow: bool,
    /// Current TX FIFO content.
    pub tx_fifo: Vec<u8>,
    /// One entry per burst written to the TX FIFO.
    pub tx_writes: Vec<Vec<u8>>,
    /// Strobe opcodes, in issue order.
    pub strobes: Vec<u8>,
    /// Last instruction byte of any kind.
    pub last_instruction: Option<u8>,
    /// Main radio control state (status byte bits 6..4).
    pub state: u8,
    /// Chip is in a sleep state.
    pub asleep: bool,
    /// Chip ignores wake-up strobes.
    pub never_wake: bool,
    wake_polls: Option<u8>,
    /// Interface never raises any flag.
    pub stall: bool,
    status_ready: bool,
    status: u8,
    access: Option<Access>,
    dout: u8,
    /// Completion interrupt enabled.
    pub irq_enabled: bool,
    /// Completion interrupt set to the falling edge.
    pub irq_falling_edge: bool,
    /// Completion interrupt pending.
    pub irq_pending: bool,
}

impl SimCore {
    /// A core fresh out of reset.
    pub fn new() -> Self {
        let mut core = Self {
            regs: [0; 0x40],
            iocfg2_writes: Vec::new(),
            patable: Vec::new(),
            patable_ptr: 0,
            rx_fifo: VecDeque::new(),
            rx_overflow: false,
            tx_fifo: Vec::new(),
            tx_writes: Vec::new(),
            strobes: Vec::new(),
            last_instruction: None,
            state: 0,
            asleep: false,
            never_wake: false,
            wake_polls: None,
            stall: false,
            status_ready: false,
            status: 0,
            access: None,
            dout: 0,
            irq_enabled: false,
            irq_falling_edge: false,
            irq_pending: false,
        };
        core.reset();
        core
    }

    fn reset(&mut self) {
        self.regs = [0; 0x40];
        self.regs[IOCFG2 as usize] = IOCFG2_CHIP_READY;
        self.rx_fifo.clear();
        self.tx_fifo.clear();
        self.state = 0;
        self.asleep = false;
        self.wake_polls = None;
    }

    /// The radio finished sending: FIFO empty, back to idle, edge raised.
    pub fn finish_tx(&mut self) {
        self.tx_fifo.clear();
        self.state = 0;
        self.irq_pending = true;
    }

    /// A frame arrived: bytes in the RX FIFO, back to idle, edge raised.
    pub fn receive(&mut self, bytes: &[u8]) {
        self.rx_fifo.extend(bytes.iter().copied());
        self.state = 0;
        self.irq_pending = true;
    }

    fn strobe(&mut self, opcode: u8) {
        self.strobes.push(opcode);
        self.patable_ptr = 0;

        let sleep_cmd = matches!(opcode, 0x32 | 0x38 | 0x39);
        if self.asleep && !sleep_cmd && opcode != 0x30 && opcode & 0x3F != 0x3D {
            if !self.never_wake {
                self.wake_polls = Some(2);
            }
        }

        match opcode {
            0x30 => self.reset(),
            0x32 | 0x38 | 0x39 => {
                self.state = 0;
                self.asleep = true;
            }
            0x34 => self.state = 1,
            0x35 => self.state = 2,
            0x36 => self.state = 0,
            0x3A => self.rx_fifo.clear(),
            0x3B => self.tx_fifo.clear(),
            _ => {}
        }

        let fifo = if opcode & 0x80 != 0 {
            self.rx_fifo.len()
        } else {
            FIFO_SIZE - self.tx_fifo.len()
        };
        self.status = (self.state << 4) | (fifo.min(15) as u8);
        self.status_ready = true;
    }

    fn fetch(&mut self) -> u8 {
        let Some(access) = self.access.as_mut() else {
            return 0;
        };
        let addr = access.addr;
        if access.burst && addr != FIFO {
            access.addr = (addr + 1) & 0x3F;
        }
        let status_space = access.burst && (0x30..=0x3D).contains(&addr);
        match addr {
            FIFO => self.rx_fifo.pop_front().unwrap_or(0),
            PATABLE => {
                let v = self.patable.get(self.patable_ptr).copied().unwrap_or(0);
                self.patable_ptr += 1;
                v
            }
            RXBYTES if status_space => {
                let count = self.rx_fifo.len().min(0x7F) as u8;
                if self.rx_overflow { count | 0x80 } else { count }
            }
            _ if status_space => 0,
            _ => self.regs[addr as usize],
        }
    }
}

impl RadioInterface for SimCore {
    fn flags(&mut self) -> InterfaceFlags {
        if self.stall {
            return InterfaceFlags(0);
        }
        let mut bits =
            InterfaceFlags::INSTRUCTION_READY | InterfaceFlags::DATA_IN | InterfaceFlags::DATA_OUT;
        if self.status_ready {
            bits |= InterfaceFlags::STATUS_READY;
        }
        InterfaceFlags(bits)
    }

    fn clear_status_ready(&mut self) {
        self.status_ready = false;
    }

    fn write_instruction(&mut self, instruction: u8) {
        self.last_instruction = Some(instruction);
        let addr = instruction & 0x3F;
        if instruction & 0x40 == 0 && (0x30..=0x3D).contains(&addr) {
            self.access = None;
            self.strobe(instruction);
            return;
        }
        if addr == FIFO && instruction & 0x80 == 0 {
            self.tx_writes.push(Vec::new());
        }
        self.access = Some(Access {
            addr,
            burst: instruction & 0x40 != 0,
            read: instruction & 0x80 != 0,
        });
    }

    fn write_instruction_word(&mut self, instruction: u8, data: u8) {
        self.write_instruction(instruction);
        self.write_data(data);
    }

    fn write_instruction_auto_read(&mut self, instruction: u8) {
        self.write_instruction(instruction);
        self.dout = self.fetch();
    }

    fn write_data(&mut self, data: u8) {
        let Some(access) = self.access.as_mut() else {
            return;
        };
        if access.read {
            return;
        }
        let addr = access.addr;
        if access.burst && addr != FIFO && addr != PATABLE {
            access.addr = (addr + 1) & 0x3F;
        }
        match addr {
            FIFO => {
                self.tx_fifo.push(data);
                if let Some(burst) = self.tx_writes.last_mut() {
                    burst.push(data);
                }
            }
            PATABLE => {
                if self.patable_ptr < self.patable.len() {
                    self.patable[self.patable_ptr] = data;
                } else {
                    self.patable.push(data);
                }
                self.patable_ptr += 1;
            }
            _ => {
                if addr == IOCFG2 {
                    self.iocfg2_writes.push(data);
                }
                self.regs[addr as usize] = data;
            }
        }
    }

    fn read_data(&mut self) -> u8 {
        self.dout
    }

    fn read_data_auto(&mut self) -> u8 {
        let value = self.dout;
        self.dout = self.fetch();
        value
    }

    fn read_data_last(&mut self) -> u8 {
        self.dout
    }

    fn read_status(&mut self) -> u8 {
        self.status
    }

    fn chip_asleep(&mut self) -> bool {
        if self.regs[IOCFG2 as usize] != IOCFG2_CHIP_READY || !self.asleep {
            return false;
        }
        match self.wake_polls {
            Some(0) => {
                self.asleep = false;
                self.wake_polls = None;
                false
            }
            Some(n) => {
                self.wake_polls = Some(n - 1);
                true
            }
            None => true,
        }
    }

    fn select_falling_edge(&mut self) {
        self.irq_falling_edge = true;
    }

    fn clear_completion(&mut self) {
        self.irq_pending = false;
    }

    fn set_completion_enabled(&mut self, enabled: bool) {
        self.irq_enabled = enabled;
    }
}

/// Delay source that only adds up the time it was asked to wait.
#[derive(Debug, Default)]
pub struct SimDelay {
    /// Nanoseconds requested so far.
    pub total_ns: u64,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}
