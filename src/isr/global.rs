use crate::bus::RadioInterface;
use crate::config::LinkConfig;
use crate::driver::{Completion, LinkDriver};
use crate::error::Error;
use crate::frame::FrameSink;
use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// A link driver shared between the main loop and the interrupt vector.
pub type SharedLink<I, D, P, S> = Mutex<RefCell<Option<LinkDriver<I, D, P, S>>>>;

/// Used to initialize the global static link driver for use with
/// `critical_section`.
///
/// # Returns
/// * An empty mutable ref-cell
///
/// # Example
/// ```rust,ignore
/// static LINK: SharedLink<Rf1a, Delay, Led, Mailbox> = global_link_init();
/// ```
pub const fn global_link_init<I, D, P, S>() -> SharedLink<I, D, P, S>
where
    I: RadioInterface,
    D: DelayNs,
    P: OutputPin,
    S: FrameSink,
{
    Mutex::new(RefCell::new(None))
}

/// Builds a driver, initialises the radio and installs the driver.
///
/// The driver is installed even if initialisation fails; the error is
/// returned and the fault stays latched so the usual recovery cycle can take
/// over.
pub fn global_link_setup<I, D, P, S>(
    global_link: &'static SharedLink<I, D, P, S>,
    iface: I,
    delay: D,
    on_air: Option<P>,
    sink: S,
    config: LinkConfig,
) -> Result<(), Error>
where
    I: RadioInterface,
    D: DelayNs,
    P: OutputPin,
    S: FrameSink,
{
    let mut link = LinkDriver::new(iface, delay, on_air, sink, config);
    let result = link.init();
    critical_section::with(|cs| {
        let _ = global_link.borrow(cs).replace(Some(link));
    });
    result
}

/// Dispatches the end-of-packet interrupt.
///
/// Returns `None` if the driver has not been set up yet.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn CC1101() {
///     let _ = global_completion_interrupt(&LINK);
/// }
/// ```
pub fn global_completion_interrupt<I, D, P, S>(
    global_link: &'static SharedLink<I, D, P, S>,
) -> Option<Result<Completion, Error>>
where
    I: RadioInterface,
    D: DelayNs,
    P: OutputPin,
    S: FrameSink,
{
    with_global_link(global_link, |link| link.on_completion_interrupt())
}

/// Runs `f` on the driver with interrupts masked.
///
/// Returns `None` if the driver has not been set up yet.
pub fn with_global_link<I, D, P, S, R>(
    global_link: &'static SharedLink<I, D, P, S>,
    f: impl FnOnce(&mut LinkDriver<I, D, P, S>) -> R,
) -> Option<R>
where
    I: RadioInterface,
    D: DelayNs,
    P: OutputPin,
    S: FrameSink,
{
    critical_section::with(|cs| global_link.borrow(cs).borrow_mut().as_mut().map(f))
}

/// Waits for the frame on air to leave.
///
/// Checks up to `retries` times, sleeping `interval_ms` with interrupts
/// enabled in between so the completion can be handled. Returns whether the
/// link stopped transmitting.
///
/// If the frame is still out once the retries are spent, the driver latches
/// [`Fault::TxTimeout`](crate::error::Fault::TxTimeout) in the same critical
/// section as the last check, so the next
/// [`resume_listening`](LinkDriver::resume_listening) re-initialises the radio.
pub fn global_wait_transmit_done<I, D, P, S, W>(
    global_link: &'static SharedLink<I, D, P, S>,
    delay: &mut W,
    retries: u8,
    interval_ms: u32,
) -> bool
where
    I: RadioInterface,
    D: DelayNs,
    P: OutputPin,
    S: FrameSink,
    W: DelayNs,
{
    for _ in 0..retries {
        let in_flight =
            with_global_link(global_link, |link| link.poll_transmit_done().is_err()).unwrap_or(false);
        if !in_flight {
            return true;
        }
        delay.delay_ms(interval_ms);
    }
    with_global_link(global_link, |link| !link.expire_transmit()).unwrap_or(true)
}
