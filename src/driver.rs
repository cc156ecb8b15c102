//! Half-duplex packet link over the RF1A radio core.
//!
//! This module provides [`LinkDriver`], which owns the radio core and
//! everything the link shares with the completion interrupt: the link state,
//! the outbound queue, the receive scratch buffer and the frame sink.
//!
//! The radio has a single end-of-packet signal for both directions. The
//! driver tells the two apart by its own state: a completion while
//! transmitting means the frame is out, a completion while listening means a
//! frame is waiting in the RX FIFO.
//!
//! ## Features
//!
//! - Idle/Listening/Transmitting/Fault state machine with a sticky fault
//! - Receive drain with state, length, overflow and CRC validation
//! - Terminator-delimited outbound queue with full and forced flushes
//! - Optional on-air indicator pin using `embedded-hal`
//! - Bounded waits for the Idle state and the main-loop recovery cycle
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::digital::{Mock as Pin, State as PinState, Transaction as PinTransaction};
//! # use rf1a_link::sim::{SimCore, SimDelay};
//! use rf1a_link::config::LinkConfig;
//! use rf1a_link::driver::{Completion, LinkDriver};
//! use rf1a_link::frame::ReceivedFrame;
//! use rf1a_link::heapless::Deque;
//! use rf1a_link::queue::SendMode;
//!
//! fn main() -> Result<(), rf1a_link::Error> {
//!     # let radio_core = SimCore::new();
//!     # let delay = SimDelay::default();
//!     # let led = Pin::new(&[PinTransaction::set(PinState::High), PinTransaction::set(PinState::Low)]);
//!     let mailbox: Deque<ReceivedFrame, 4> = Deque::new();
//!     let mut link = LinkDriver::new(radio_core, delay, Some(led), mailbox, LinkConfig::default());
//!     link.init()?;
//!     link.enter_listening()?;
//!
//!     // From the radio core interrupt:
//!     # link.bus_mut().interface_mut().receive(&[0x02, b'o', b'k', 0xA3, 0x91]);
//!     if let Ok(Completion::Received) = link.on_completion_interrupt() {
//!         let frame = link.sink_mut().pop_front();
//!         # assert_eq!(frame.unwrap().payload.as_slice(), b"ok");
//!     }
//!
//!     // From the main loop:
//!     link.append(b"t=21.5\n")?;
//!     link.send_next(SendMode::Full)?;
//!     # link.bus_mut().interface_mut().finish_tx();
//!     # assert_eq!(link.on_completion_interrupt(), Ok(Completion::Sent));
//!     # let _ = link.on_air.as_mut().map(|pin| pin.done());
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! Faults are detected in interrupt context and cannot be returned to
//! anyone, so they are latched in the driver. The state machine does not
//! heal itself: once faulted, [`LinkDriver::init`] is the only way back.
//! [`LinkDriver::resume_listening`] wraps the usual recovery cycle.
//!
//! For sharing the driver with an interrupt handler, see [`crate::isr`].

use crate::bus::{Bus, RadioInterface, Strobe};
use crate::config::LinkConfig;
use crate::consts::{FIFO, FIFO_SIZE, MAX_PAYLOAD_LEN, MIN_RX_FRAME_LEN, RXBYTES, RXBYTES_OVERFLOW};
use crate::error::{Error, Fault};
use crate::frame::{FrameSink, parse_frame};
use crate::queue::{OutboundFrame, SendMode, TxQueue};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use core::convert::Infallible;

/// Operational state of the link.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum LinkState {
    /// Radio idle, no completion expected.
    #[default]
    Idle,
    /// Receiver armed, waiting for a frame.
    Listening,
    /// A frame is on its way out.
    Transmitting,
    /// A fault is latched. Only [`LinkDriver::init`] leaves this state.
    Fault,
}

/// What a completion interrupt turned out to be.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Completion {
    /// The outbound frame was sent.
    Sent,
    /// A frame was received and handed to the sink.
    Received,
    /// A valid frame was received but the sink had no room for it.
    Dropped,
    /// The receive drain found a problem. The fault is latched.
    Fault(Fault),
    /// No completion was expected in the current state.
    Spurious,
}

/// Link counters. Kept across [`LinkDriver::init`].
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct LinkStats {
    /// Frames sent.
    pub tx_good: u32,
    /// Frames delivered to the sink.
    pub rx_good: u32,
    /// Frames discarded for a failed CRC.
    pub rx_bad_crc: u32,
    /// Drains that found too few bytes for a frame.
    pub rx_short: u32,
    /// Drains that found an overflowed RX FIFO.
    pub rx_overflow: u32,
    /// Completions that found the radio outside the Idle state.
    pub state_mismatch: u32,
    /// Valid frames the sink refused.
    pub sink_overflow: u32,
    /// Bus accesses that timed out.
    pub bus_timeouts: u32,
    /// Waits for the Idle state that ran out of retries.
    pub idle_timeouts: u32,
    /// Appends refused for lack of queue space.
    pub queue_rejected: u32,
    /// Frames whose completion never arrived.
    pub tx_timeouts: u32,
}

/// Packet link driver for the RF1A radio core.
///
/// ## Type Parameters
///
/// - `I`: The radio core register window, see [`RadioInterface`]
/// - `D`: A delay source for the erratum settle time and the Idle retry loop
/// - `P`: An [`OutputPin`] lit while a frame is on air (LED or PA enable)
/// - `S`: Where received frames go, see [`FrameSink`]
///
/// ## Notes
///
/// - Nothing touches the hardware before [`init()`](Self::init).
/// - The driver must be the only user of the radio core.
#[derive(Debug)]
pub struct LinkDriver<I, D, P, S>
where
    I: RadioInterface,
    D: DelayNs,
    P: OutputPin,
    S: FrameSink,
{
    bus: Bus<I, D>,
    /// Optional on-air indicator.
    pub on_air: Option<P>,
    config: LinkConfig,
    state: LinkState,
    fault: Option<Fault>,
    queue: TxQueue,
    scratch: [u8; FIFO_SIZE],
    sink: S,
    stats: LinkStats,
}

impl<I, D, P, S> LinkDriver<I, D, P, S>
where
    I: RadioInterface,
    D: DelayNs,
    P: OutputPin,
    S: FrameSink,
{
    /// Creates a new `LinkDriver`.
    ///
    /// # Arguments
    /// - `iface`: The radio core register window.
    /// - `delay`: Delay source.
    /// - `on_air`: Optional pin raised while transmitting.
    /// - `sink`: Receiver of validated frames.
    /// - `config`: Link configuration.
    pub fn new(iface: I, delay: D, on_air: Option<P>, sink: S, config: LinkConfig) -> Self {
        Self {
            bus: Bus::new(iface, delay, config.poll_limit, config.erratum_settle_us),
            on_air,
            config,
            state: LinkState::Idle,
            fault: None,
            queue: TxQueue::new(config.terminator),
            scratch: [0; FIFO_SIZE],
            sink,
            stats: LinkStats::default(),
        }
    }

    /// Resets and programs the radio.
    ///
    /// Clears the latched fault and the outbound queue, writes the register
    /// table of the configured profile and the PA table. The link is Idle
    /// afterwards.
    pub fn init(&mut self) -> Result<(), Error> {
        if self.state == LinkState::Transmitting {
            self.write_on_air(false);
        }
        self.state = LinkState::Idle;
        self.fault = None;
        self.queue.clear();

        let result = self.program();
        self.track(result)?;
        debug!("radio initialised, profile {:?}", self.config.profile);
        Ok(())
    }

    fn program(&mut self) -> Result<(), Error> {
        let iface = self.bus.interface_mut();
        iface.set_completion_enabled(false);
        iface.clear_completion();

        let _ = self.bus.strobe(Strobe::Reset)?;
        // Resets the PA table pointer.
        let _ = self.bus.strobe(Strobe::Nop)?;

        for &(addr, value) in self.config.profile.settings() {
            self.bus.write_register(addr, value)?;
        }
        self.bus.write_power_table(self.config.tx_power.pa_value())
    }

    /// Arms the receiver.
    ///
    /// Only legal from Idle with no fault latched.
    pub fn enter_listening(&mut self) -> Result<(), Error> {
        if let Some(fault) = self.fault {
            return Err(Error::Faulted(fault));
        }
        if self.state != LinkState::Idle {
            return Err(Error::InvalidState(self.state));
        }

        let result = self.arm(Strobe::Rx);
        self.track(result)?;
        self.state = LinkState::Listening;
        trace!("listening");
        Ok(())
    }

    /// Stops the receiver and flushes whatever it may have half received.
    ///
    /// A latched fault stays latched. Not allowed while transmitting.
    pub fn exit_listening(&mut self) -> Result<(), Error> {
        if self.state == LinkState::Transmitting {
            return Err(Error::InvalidState(self.state));
        }

        let result = self.disarm_receiver();
        self.track(result)?;
        if self.state == LinkState::Listening {
            self.state = LinkState::Idle;
        }
        trace!("receiver off");
        Ok(())
    }

    fn disarm_receiver(&mut self) -> Result<(), Error> {
        let iface = self.bus.interface_mut();
        iface.set_completion_enabled(false);
        iface.clear_completion();

        let _ = self.bus.strobe(Strobe::Idle)?;
        let _ = self.bus.strobe(Strobe::FlushRx)?;
        Ok(())
    }

    fn arm(&mut self, cmd: Strobe) -> Result<(), Error> {
        let iface = self.bus.interface_mut();
        iface.select_falling_edge();
        iface.clear_completion();
        iface.set_completion_enabled(true);

        let _ = self.bus.strobe(cmd)?;
        Ok(())
    }

    /// Sends one frame carrying `payload`.
    ///
    /// Rejected while a frame is already on its way out, in which case the
    /// TX FIFO is not touched. Stops the receiver first if listening.
    pub fn begin_transmit(&mut self, payload: &[u8]) -> Result<(), Error> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(Error::FrameTooLong(payload.len()));
        }
        let mut frame = OutboundFrame::new();
        let _ = frame.push(payload.len() as u8);
        let _ = frame.extend_from_slice(payload);
        self.transmit(&frame)
    }

    fn transmit(&mut self, frame: &OutboundFrame) -> Result<(), Error> {
        if self.state == LinkState::Transmitting {
            return Err(Error::InvalidState(self.state));
        }
        if let Some(fault) = self.fault {
            return Err(Error::Faulted(fault));
        }
        if self.state == LinkState::Listening {
            self.exit_listening()?;
        }

        let result = self.load_and_fire(frame);
        self.track(result)?;
        self.state = LinkState::Transmitting;
        self.write_on_air(true);
        debug!("transmitting {} bytes", frame.len());
        Ok(())
    }

    fn load_and_fire(&mut self, frame: &OutboundFrame) -> Result<(), Error> {
        let iface = self.bus.interface_mut();
        iface.select_falling_edge();
        iface.clear_completion();
        iface.set_completion_enabled(true);

        self.bus.write_burst(FIFO, frame)?;
        let _ = self.bus.strobe(Strobe::Tx)?;
        Ok(())
    }

    /// Handles the end-of-packet interrupt.
    ///
    /// Call this from the radio core interrupt vector. Disables the
    /// completion interrupt first; whoever runs the link re-arms it.
    ///
    /// Integrity problems with a received frame are reported as
    /// [`Completion::Fault`] and latched. An `Err` means the bus itself
    /// failed; that is latched as well.
    pub fn on_completion_interrupt(&mut self) -> Result<Completion, Error> {
        self.bus.interface_mut().set_completion_enabled(false);

        match self.state {
            LinkState::Transmitting => {
                self.write_on_air(false);
                self.state = LinkState::Idle;
                self.stats.tx_good = self.stats.tx_good.wrapping_add(1);
                trace!("frame sent");
                Ok(Completion::Sent)
            }
            LinkState::Listening => {
                let result = self.drain();
                self.track(result)
            }
            LinkState::Idle | LinkState::Fault => {
                trace!("spurious completion while {:?}", self.state);
                Ok(Completion::Spurious)
            }
        }
    }

    fn drain(&mut self) -> Result<Completion, Error> {
        self.state = LinkState::Idle;

        let status = self.bus.strobe(Strobe::Nop)?;
        if !status.is_idle() {
            return Ok(self.reject(Fault::StateMismatch { status: status.0 }));
        }

        let count = self.bus.read_register(RXBYTES)?;
        let n = usize::from(count);
        if n < MIN_RX_FRAME_LEN {
            return Ok(self.reject(Fault::ShortFrame(count)));
        }
        if count & RXBYTES_OVERFLOW != 0 || n > FIFO_SIZE {
            return Ok(self.reject(Fault::FrameOverflow(count)));
        }

        self.bus.read_burst(FIFO, &mut self.scratch[..n])?;
        let frame = match parse_frame(&self.scratch[..n]) {
            Ok(frame) => frame,
            Err(fault) => return Ok(self.reject(fault)),
        };

        if self.sink.deliver(&frame) {
            self.stats.rx_good = self.stats.rx_good.wrapping_add(1);
            trace!("received {} bytes, rssi {}", frame.payload.len(), frame.rssi.0);
            Ok(Completion::Received)
        } else {
            self.stats.sink_overflow = self.stats.sink_overflow.wrapping_add(1);
            warn!("sink full, dropped {} bytes", frame.payload.len());
            Ok(Completion::Dropped)
        }
    }

    fn reject(&mut self, fault: Fault) -> Completion {
        self.latch(fault);
        Completion::Fault(fault)
    }

    fn latch(&mut self, fault: Fault) {
        if self.state == LinkState::Transmitting {
            self.write_on_air(false);
        }
        let counter = match fault {
            Fault::StateMismatch { .. } => &mut self.stats.state_mismatch,
            Fault::ShortFrame(_) => &mut self.stats.rx_short,
            Fault::FrameOverflow(_) => &mut self.stats.rx_overflow,
            Fault::CrcFailure => &mut self.stats.rx_bad_crc,
            Fault::BusTimeout(_) => &mut self.stats.bus_timeouts,
            Fault::IdleTimeout => &mut self.stats.idle_timeouts,
            Fault::TxTimeout => &mut self.stats.tx_timeouts,
        };
        *counter = counter.wrapping_add(1);
        self.fault = Some(fault);
        self.state = LinkState::Fault;
        warn!("link fault: {:?}", fault);
    }

    fn track<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(Error::BusTimeout(flag)) = result {
            self.latch(Fault::BusTimeout(flag));
        }
        result
    }

    /// Queues bytes for transmission, all or nothing.
    pub fn append(&mut self, data: &[u8]) -> Result<(), Error> {
        self.queue.append(data).inspect_err(|_| {
            self.stats.queue_rejected = self.stats.queue_rejected.wrapping_add(1);
            warn!("queue full, rejected {} bytes", data.len());
        })
    }

    /// Sends the next frame from the queue.
    ///
    /// Returns the payload length sent, or 0 if there was nothing to send in
    /// this mode or a frame is already on its way out. The bytes leave the
    /// queue only once the frame is in the TX FIFO.
    pub fn send_next(&mut self, mode: SendMode) -> Result<usize, Error> {
        if self.state == LinkState::Transmitting {
            return Ok(0);
        }
        let Some(frame) = self.queue.peek_frame(mode) else {
            return Ok(0);
        };
        self.transmit(&frame)?;
        self.queue.consume(&frame);
        Ok(frame.len() - 1)
    }

    /// Puts the radio into power-down.
    ///
    /// Stops the receiver first if listening. Not allowed while transmitting.
    pub fn shutdown(&mut self) -> Result<(), Error> {
        if self.state == LinkState::Transmitting {
            return Err(Error::InvalidState(self.state));
        }
        if self.state == LinkState::Listening {
            self.exit_listening()?;
        }

        let result = self
            .bus
            .strobe(Strobe::Idle)
            .and_then(|_| self.bus.strobe(Strobe::PowerDown));
        let _ = self.track(result)?;
        debug!("radio powered down");
        Ok(())
    }

    /// Checks once whether the radio reports the Idle state.
    pub fn poll_idle(&mut self) -> nb::Result<(), Error> {
        let result = self.bus.strobe(Strobe::Nop);
        let status = self.track(result)?;
        if status.is_idle() {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Waits for the radio to report the Idle state.
    ///
    /// Polls up to `idle_retry_limit` times (at least once), sleeping
    /// `idle_retry_interval_ms` after each miss. Running out of retries
    /// latches [`Fault::IdleTimeout`].
    pub fn wait_for_idle(&mut self) -> Result<(), Error> {
        for _ in 0..self.config.idle_retry_limit.max(1) {
            match self.poll_idle() {
                Ok(()) => return Ok(()),
                Err(nb::Error::Other(e)) => return Err(e),
                Err(nb::Error::WouldBlock) => {
                    let ms = self.config.idle_retry_interval_ms;
                    self.bus.delay_mut().delay_ms(ms);
                }
            }
        }
        self.latch(Fault::IdleTimeout);
        Err(Error::IdleTimeout)
    }

    /// Checks whether the last frame has left.
    pub fn poll_transmit_done(&self) -> nb::Result<(), Infallible> {
        if self.state == LinkState::Transmitting {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }

    /// Gives up on the frame on air.
    ///
    /// If a frame is still out, disables the completion interrupt and latches
    /// [`Fault::TxTimeout`], which drops the on-air indicator. Returns whether
    /// a frame was abandoned.
    pub fn expire_transmit(&mut self) -> bool {
        if self.state != LinkState::Transmitting {
            return false;
        }
        self.bus.interface_mut().set_completion_enabled(false);
        self.latch(Fault::TxTimeout);
        true
    }

    /// Brings the receiver back after a send or a fault.
    ///
    /// Does nothing while transmitting or already listening. Otherwise stops
    /// the receiver, re-initialises if a fault is latched, waits for the
    /// Idle state and listens again.
    pub fn resume_listening(&mut self) -> Result<(), Error> {
        if matches!(self.state, LinkState::Transmitting | LinkState::Listening) {
            return Ok(());
        }

        self.exit_listening()?;
        if let Some(fault) = self.fault {
            debug!("recovering from {:?}", fault);
            self.init()?;
        }
        self.wait_for_idle()?;
        self.enter_listening()
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// The latched fault, if any.
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    /// Whether a frame is on its way out.
    pub fn is_transmitting(&self) -> bool {
        self.state == LinkState::Transmitting
    }

    /// Whether the receiver is armed.
    pub fn is_receiving(&self) -> bool {
        self.state == LinkState::Listening
    }

    /// Link counters.
    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// The outbound queue.
    pub fn queue(&self) -> &TxQueue {
        &self.queue
    }

    /// The active configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// The frame sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The frame sink, for taking frames out.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// The bus, for register access outside the link protocol.
    pub fn bus_mut(&mut self) -> &mut Bus<I, D> {
        &mut self.bus
    }

    /// Gives all owned parts back.
    pub fn release(self) -> (I, D, Option<P>, S) {
        let (iface, delay) = self.bus.release();
        (iface, delay, self.on_air, self.sink)
    }

    fn write_on_air(&mut self, active: bool) {
        let level = active != self.config.on_air_inverted;
        if let Some(ref mut pin) = self.on_air {
            if level {
                let _ = pin.set_high();
            } else {
                let _ = pin.set_low();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Profile, TxPower};
    use crate::consts::{MAX_FRAME_LEN, MDMCFG2, PKTLEN, TX_QUEUE_LEN};
    use crate::error::BusFlag;
    use crate::frame::{ReceivedFrame, Rssi};
    use crate::sim::{SimCore, SimDelay};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use heapless::Deque;

    type Mailbox = Deque<ReceivedFrame, 4>;
    type TestLink = LinkDriver<SimCore, SimDelay, PinMock, Mailbox>;

    const HELLO: [u8; 7] = [0x05, b'H', b'I', b'!', b'!', 0xA3, 0x91];

    fn link() -> TestLink {
        let mut link = LinkDriver::new(
            SimCore::new(),
            SimDelay::default(),
            None,
            Deque::new(),
            LinkConfig::default(),
        );
        link.init().unwrap();
        link
    }

    fn radio(link: &mut TestLink) -> &mut SimCore {
        link.bus.interface_mut()
    }

    fn queued(link: &TestLink) -> Vec<u8> {
        link.queue().iter().copied().collect()
    }

    #[test]
    fn test_new_touches_nothing() {
        let link: TestLink = LinkDriver::new(
            SimCore::new(),
            SimDelay::default(),
            None,
            Deque::new(),
            LinkConfig::default(),
        );
        let (core, _, _, _) = link.release();
        assert_eq!(core.last_instruction, None);
    }

    #[test]
    fn test_init_programs_radio() {
        let mut link = link();
        assert_eq!(link.state(), LinkState::Idle);
        let core = radio(&mut link);
        assert_eq!(&core.strobes[..2], &[0x30, 0x3D]);
        for &(addr, value) in Profile::Sensitivity.settings() {
            assert_eq!(core.regs[addr as usize], value, "register {addr:#04x}");
        }
        assert_eq!(core.patable, vec![0xC3]);
        assert!(!core.irq_enabled);
    }

    #[test]
    fn test_init_low_power_profile() {
        let config = LinkConfig {
            profile: Profile::LowPower,
            tx_power: TxPower::ZeroDbm,
            ..LinkConfig::default()
        };
        let mut link: TestLink =
            LinkDriver::new(SimCore::new(), SimDelay::default(), None, Deque::new(), config);
        link.init().unwrap();
        let core = radio(&mut link);
        assert_eq!(core.regs[MDMCFG2 as usize], 0x93);
        assert_eq!(core.regs[PKTLEN as usize], 0x32);
        assert_eq!(core.patable, vec![0x51]);
    }

    #[test]
    fn test_enter_and_exit_listening() {
        let mut link = link();
        link.enter_listening().unwrap();
        assert_eq!(link.state(), LinkState::Listening);
        assert!(link.is_receiving());
        {
            let core = radio(&mut link);
            assert!(core.irq_enabled);
            assert!(core.irq_falling_edge);
            assert_eq!(core.strobes.last(), Some(&0x34));
            assert_eq!(core.state, 1);
        }
        assert_eq!(
            link.enter_listening(),
            Err(Error::InvalidState(LinkState::Listening))
        );

        radio(&mut link).rx_fifo.extend([1, 2]);
        link.exit_listening().unwrap();
        assert_eq!(link.state(), LinkState::Idle);
        let core = radio(&mut link);
        assert!(!core.irq_enabled);
        assert!(!core.irq_pending);
        assert_eq!(&core.strobes[core.strobes.len() - 2..], &[0x36, 0x3A]);
        assert!(core.rx_fifo.is_empty());
    }

    #[test]
    fn test_receive_frame() {
        let mut link = link();
        link.enter_listening().unwrap();
        radio(&mut link).receive(&HELLO);
        assert!(radio(&mut link).irq_pending);

        assert_eq!(link.on_completion_interrupt(), Ok(Completion::Received));
        assert_eq!(link.state(), LinkState::Idle);
        assert_eq!(link.fault(), None);
        assert!(!radio(&mut link).irq_enabled);
        assert!(radio(&mut link).rx_fifo.is_empty());

        let frame = link.sink_mut().pop_front().unwrap();
        assert_eq!(frame.payload.as_slice(), b"HI!!");
        assert_eq!(frame.rssi, Rssi(0xA3));
        assert_eq!(frame.link_quality, 0x11);
        assert_eq!(link.stats().rx_good, 1);
    }

    #[test]
    fn test_crc_failure_latches_fault() {
        let mut link = link();
        link.enter_listening().unwrap();
        let mut bytes = HELLO;
        bytes[6] = 0x11;
        radio(&mut link).receive(&bytes);

        assert_eq!(
            link.on_completion_interrupt(),
            Ok(Completion::Fault(Fault::CrcFailure))
        );
        assert!(link.sink().is_empty());
        assert_eq!(link.fault(), Some(Fault::CrcFailure));
        assert_eq!(link.state(), LinkState::Fault);
        assert_eq!(link.stats().rx_bad_crc, 1);
        assert_eq!(
            link.enter_listening(),
            Err(Error::Faulted(Fault::CrcFailure))
        );

        link.init().unwrap();
        assert_eq!(link.fault(), None);
        link.enter_listening().unwrap();
        assert_eq!(link.stats().rx_bad_crc, 1);
    }

    #[test]
    fn test_short_frame_is_not_consumed() {
        let mut link = link();
        link.enter_listening().unwrap();
        radio(&mut link).receive(&[0x02, 0xA3, 0x91]);

        assert_eq!(
            link.on_completion_interrupt(),
            Ok(Completion::Fault(Fault::ShortFrame(3)))
        );
        assert_eq!(radio(&mut link).rx_fifo.len(), 3);
        assert_eq!(link.stats().rx_short, 1);
    }

    #[test]
    fn test_radio_not_idle_on_completion() {
        let mut link = link();
        link.enter_listening().unwrap();
        radio(&mut link).rx_fifo.extend(HELLO);

        let completion = link.on_completion_interrupt().unwrap();
        assert!(matches!(
            completion,
            Completion::Fault(Fault::StateMismatch { status }) if status & 0x70 == 0x10
        ));
        assert_eq!(radio(&mut link).rx_fifo.len(), HELLO.len());
        assert_eq!(link.stats().state_mismatch, 1);
    }

    #[test]
    fn test_rx_fifo_overflow() {
        let mut link = link();
        link.enter_listening().unwrap();
        radio(&mut link).rx_overflow = true;
        radio(&mut link).receive(&HELLO);

        assert_eq!(
            link.on_completion_interrupt(),
            Ok(Completion::Fault(Fault::FrameOverflow(0x87)))
        );
        assert_eq!(link.stats().rx_overflow, 1);
    }

    #[test]
    fn test_full_sink_drops_without_fault() {
        let mut link: LinkDriver<SimCore, SimDelay, PinMock, Deque<ReceivedFrame, 1>> =
            LinkDriver::new(
                SimCore::new(),
                SimDelay::default(),
                None,
                Deque::new(),
                LinkConfig::default(),
            );
        link.init().unwrap();

        for expected in [Completion::Received, Completion::Dropped] {
            link.enter_listening().unwrap();
            link.bus.interface_mut().receive(&HELLO);
            assert_eq!(link.on_completion_interrupt(), Ok(expected));
        }
        assert_eq!(link.fault(), None);
        assert_eq!(link.stats().sink_overflow, 1);
        assert_eq!(link.sink().len(), 1);
    }

    #[test]
    fn test_transmit_drives_on_air_pin() {
        let pin = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let mut link = LinkDriver::new(
            SimCore::new(),
            SimDelay::default(),
            Some(pin),
            Mailbox::new(),
            LinkConfig::default(),
        );
        link.init().unwrap();

        link.begin_transmit(b"hello").unwrap();
        assert!(link.is_transmitting());
        assert_eq!(link.poll_transmit_done(), Err(nb::Error::WouldBlock));
        {
            let core = link.bus.interface_mut();
            assert_eq!(core.tx_writes, vec![vec![5, b'h', b'e', b'l', b'l', b'o']]);
            assert_eq!(core.strobes.last(), Some(&0x35));
            assert_eq!(core.state, 2);
            assert!(core.irq_enabled);
        }

        assert_eq!(
            link.begin_transmit(b"again"),
            Err(Error::InvalidState(LinkState::Transmitting))
        );
        assert_eq!(link.bus.interface_mut().tx_writes.len(), 1);

        link.bus.interface_mut().finish_tx();
        assert_eq!(link.on_completion_interrupt(), Ok(Completion::Sent));
        assert_eq!(link.state(), LinkState::Idle);
        assert_eq!(link.poll_transmit_done(), Ok(()));
        assert_eq!(link.stats().tx_good, 1);
        let _ = link.on_air.as_mut().map(|pin| pin.done());
    }

    #[test]
    fn test_inverted_on_air_pin() {
        let pin = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let config = LinkConfig {
            on_air_inverted: true,
            ..LinkConfig::default()
        };
        let mut link =
            LinkDriver::new(SimCore::new(), SimDelay::default(), Some(pin), Mailbox::new(), config);
        link.init().unwrap();
        link.begin_transmit(b"x").unwrap();
        let _ = link.on_air.as_mut().map(|pin| pin.done());
    }

    #[test]
    fn test_transmit_while_listening_stops_receiver() {
        let mut link = link();
        link.enter_listening().unwrap();
        link.begin_transmit(b"ping").unwrap();

        let core = radio(&mut link);
        assert_eq!(&core.strobes[core.strobes.len() - 3..], &[0x36, 0x3A, 0x35]);
        assert_eq!(link.state(), LinkState::Transmitting);
    }

    #[test]
    fn test_transmit_rejects_oversized_payload() {
        let mut link = link();
        assert_eq!(
            link.begin_transmit(&[0; MAX_PAYLOAD_LEN + 1]),
            Err(Error::FrameTooLong(MAX_PAYLOAD_LEN + 1))
        );
        assert!(radio(&mut link).tx_writes.is_empty());
    }

    #[test]
    fn test_faulted_link_refuses_to_transmit() {
        let mut link = link();
        link.enter_listening().unwrap();
        let mut bytes = HELLO;
        bytes[6] = 0x11;
        radio(&mut link).receive(&bytes);
        let _ = link.on_completion_interrupt().unwrap();

        link.append(b"x\n").unwrap();
        assert_eq!(
            link.send_next(SendMode::Full),
            Err(Error::Faulted(Fault::CrcFailure))
        );
        assert_eq!(
            link.begin_transmit(b"x\n"),
            Err(Error::Faulted(Fault::CrcFailure))
        );
        assert!(radio(&mut link).tx_writes.is_empty());
        assert_eq!(queued(&link), b"x\n");
        assert_eq!(link.state(), LinkState::Fault);
    }

    #[test]
    fn test_expire_transmit_latches_fault() {
        let pin = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let mut link = LinkDriver::new(
            SimCore::new(),
            SimDelay::default(),
            Some(pin),
            Mailbox::new(),
            LinkConfig::default(),
        );
        link.init().unwrap();
        assert!(!link.expire_transmit());
        assert_eq!(link.fault(), None);

        link.begin_transmit(b"lost").unwrap();
        assert!(link.expire_transmit());
        assert_eq!(link.fault(), Some(Fault::TxTimeout));
        assert_eq!(link.state(), LinkState::Fault);
        assert_eq!(link.poll_transmit_done(), Ok(()));
        assert_eq!(link.stats().tx_timeouts, 1);
        assert!(!radio(&mut link).irq_enabled);
        let _ = link.on_air.as_mut().map(|pin| pin.done());
    }

    #[test]
    fn test_send_next_full_messages() {
        let mut link: LinkDriver<SimCore, NoopDelay, PinMock, Mailbox> = LinkDriver::new(
            SimCore::new(),
            NoopDelay::new(),
            None,
            Deque::new(),
            LinkConfig::default(),
        );
        link.init().unwrap();
        link.append(b"AB\n").unwrap();
        link.append(b"CD\n").unwrap();

        assert_eq!(link.send_next(SendMode::Full), Ok(3));
        assert_eq!(
            link.bus.interface_mut().tx_writes,
            vec![vec![3, b'A', b'B', b'\n']]
        );
        assert_eq!(link.queue().iter().copied().collect::<Vec<u8>>(), b"CD\n");

        // Still on air.
        assert_eq!(link.send_next(SendMode::Full), Ok(0));
        assert_eq!(link.bus.interface_mut().tx_writes.len(), 1);

        link.bus.interface_mut().finish_tx();
        assert_eq!(link.on_completion_interrupt(), Ok(Completion::Sent));
        assert_eq!(link.send_next(SendMode::Full), Ok(3));
        assert_eq!(
            link.bus.interface_mut().tx_writes[1],
            vec![3, b'C', b'D', b'\n']
        );
        assert!(link.queue().is_empty());
    }

    #[test]
    fn test_send_next_full_without_terminator() {
        let mut link = link();
        link.append(b"no end").unwrap();
        assert_eq!(link.send_next(SendMode::Full), Ok(0));
        assert_eq!(link.send_next(SendMode::Full), Ok(0));
        assert_eq!(link.state(), LinkState::Idle);
        assert!(radio(&mut link).tx_writes.is_empty());
        assert_eq!(queued(&link), b"no end");
    }

    #[test]
    fn test_send_next_force_every_length() {
        let mut link = link();
        for len in 1..=MAX_PAYLOAD_LEN {
            let payload: Vec<u8> = (0..len as u8).collect();
            link.append(&payload).unwrap();
            assert_eq!(link.send_next(SendMode::Force), Ok(len));

            let core = radio(&mut link);
            let written = core.tx_writes.last().unwrap();
            assert_eq!(written[0] as usize, len);
            assert_eq!(&written[1..], payload.as_slice());
            core.finish_tx();
            assert_eq!(link.on_completion_interrupt(), Ok(Completion::Sent));
        }
        assert!(link.queue().is_empty());
    }

    #[test]
    fn test_send_next_caps_frame() {
        let mut link = link();
        link.append(&[b'x'; 75]).unwrap();
        assert_eq!(link.send_next(SendMode::Force), Ok(MAX_PAYLOAD_LEN));
        assert_eq!(radio(&mut link).tx_writes[0].len(), MAX_FRAME_LEN);
        assert_eq!(link.queue().len(), 15);
    }

    #[test]
    fn test_failed_send_keeps_queue() {
        let mut link = link();
        link.append(b"keep\n").unwrap();
        radio(&mut link).stall = true;
        assert_eq!(
            link.send_next(SendMode::Full),
            Err(Error::BusTimeout(BusFlag::InstructionReady))
        );
        assert_eq!(queued(&link), b"keep\n");
        assert_eq!(link.fault(), Some(Fault::BusTimeout(BusFlag::InstructionReady)));
        assert_eq!(link.stats().bus_timeouts, 1);
    }

    #[test]
    fn test_append_overflow() {
        let mut link = link();
        link.append(&[0; TX_QUEUE_LEN - 1]).unwrap();
        let before = queued(&link);
        assert_eq!(
            link.append(b"ab"),
            Err(Error::QueueOverflow {
                requested: 2,
                available: 1
            })
        );
        assert_eq!(queued(&link), before);
        assert_eq!(link.stats().queue_rejected, 1);
    }

    #[test]
    fn test_spurious_completion() {
        let mut link = link();
        assert_eq!(link.on_completion_interrupt(), Ok(Completion::Spurious));
        assert_eq!(link.state(), LinkState::Idle);
    }

    #[test]
    fn test_shutdown_and_wake() {
        let mut link = link();
        link.enter_listening().unwrap();
        link.shutdown().unwrap();
        assert_eq!(link.state(), LinkState::Idle);
        {
            let core = radio(&mut link);
            assert_eq!(&core.strobes[core.strobes.len() - 4..], &[0x36, 0x3A, 0x36, 0x39]);
            assert!(core.asleep);
        }
        assert_eq!(link.bus.delay_mut().total_ns, 0);

        // Waking for RX goes through the settle delay.
        link.enter_listening().unwrap();
        assert!(!radio(&mut link).asleep);
        assert_eq!(link.bus.delay_mut().total_ns, 810_000);
    }

    #[test]
    fn test_shutdown_rejected_while_transmitting() {
        let mut link = link();
        link.begin_transmit(b"x").unwrap();
        assert_eq!(
            link.shutdown(),
            Err(Error::InvalidState(LinkState::Transmitting))
        );
    }

    #[test]
    fn test_wait_for_idle() {
        let mut link = link();
        link.wait_for_idle().unwrap();
        assert_eq!(link.bus.delay_mut().total_ns, 0);

        radio(&mut link).state = 1;
        assert_eq!(link.wait_for_idle(), Err(Error::IdleTimeout));
        assert_eq!(link.bus.delay_mut().total_ns, 20_000_000);
        assert_eq!(link.fault(), Some(Fault::IdleTimeout));
        assert_eq!(link.state(), LinkState::Fault);
        assert_eq!(link.stats().idle_timeouts, 1);
    }

    #[test]
    fn test_wait_for_idle_polls_at_least_once() {
        let config = LinkConfig {
            idle_retry_limit: 0,
            ..LinkConfig::default()
        };
        let mut link: TestLink =
            LinkDriver::new(SimCore::new(), SimDelay::default(), None, Deque::new(), config);
        link.init().unwrap();
        link.wait_for_idle().unwrap();
        assert_eq!(link.fault(), None);

        radio(&mut link).state = 1;
        assert_eq!(link.wait_for_idle(), Err(Error::IdleTimeout));
        assert_eq!(link.bus.delay_mut().total_ns, 1_000_000);
    }

    #[test]
    fn test_resume_listening_recovers_from_fault() {
        let mut link = link();
        link.enter_listening().unwrap();
        let mut bytes = HELLO;
        bytes[6] = 0;
        radio(&mut link).receive(&bytes);
        let _ = link.on_completion_interrupt().unwrap();
        assert_eq!(link.state(), LinkState::Fault);

        link.resume_listening().unwrap();
        assert_eq!(link.state(), LinkState::Listening);
        assert_eq!(link.fault(), None);
        assert_eq!(radio(&mut link).strobes.last(), Some(&0x34));
    }

    #[test]
    fn test_resume_listening_waits_out_transmission() {
        let mut link = link();
        link.begin_transmit(b"x").unwrap();
        let strobes = radio(&mut link).strobes.len();
        link.resume_listening().unwrap();
        assert_eq!(link.state(), LinkState::Transmitting);
        assert_eq!(radio(&mut link).strobes.len(), strobes);

        radio(&mut link).finish_tx();
        let _ = link.on_completion_interrupt().unwrap();
        link.resume_listening().unwrap();
        assert!(link.is_receiving());
    }

    #[test]
    fn test_bus_timeout_latches_fault() {
        let mut link = link();
        radio(&mut link).stall = true;
        assert_eq!(
            link.enter_listening(),
            Err(Error::BusTimeout(BusFlag::InstructionReady))
        );
        assert_eq!(
            link.fault(),
            Some(Fault::BusTimeout(BusFlag::InstructionReady))
        );

        radio(&mut link).stall = false;
        link.init().unwrap();
        link.enter_listening().unwrap();
    }
}
