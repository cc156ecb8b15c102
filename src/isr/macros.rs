/// Declares a static global `RADIO_LINK` protected by a `critical_section` mutex.
///
/// # Arguments
/// - `$iface`: The radio core register window type (implements `RadioInterface`)
/// - `$delay`: The delay type (implements `DelayNs`)
/// - `$pin`: The on-air indicator pin type (implements `OutputPin`)
/// - `$sink`: The frame sink type (implements `FrameSink`)
///
/// # Example
/// ```rust,ignore
/// init_radio_link!(Rf1a, Delay, Led, heapless::Deque<ReceivedFrame, 4>);
/// ```
#[macro_export]
macro_rules! init_radio_link {
    ( $iface:ty, $delay:ty, $pin:ty, $sink:ty ) => {
        pub static RADIO_LINK: $crate::isr::SharedLink<$iface, $delay, $pin, $sink> =
            $crate::isr::global_link_init();
    };
}

/// Builds, initialises and installs the driver in `RADIO_LINK`.
///
/// Evaluates to the result of the radio initialisation.
///
/// # Example
/// ```rust,ignore
/// setup_radio_link!(rf1a, delay, Some(led), Deque::new(), LinkConfig::default())?;
/// ```
///
/// # Notes
/// - Requires `init_radio_link!` to have been used earlier.
#[macro_export]
macro_rules! setup_radio_link {
    ( $iface:expr, $delay:expr, $on_air:expr, $sink:expr, $config:expr ) => {
        $crate::isr::global_link_setup(&RADIO_LINK, $iface, $delay, $on_air, $sink, $config)
    };
}

/// Dispatches the end-of-packet interrupt to `RADIO_LINK`.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn CC1101() {
///     let _ = radio_link_interrupt!();
/// }
/// ```
///
/// # Notes
/// - Does nothing if the link has not been set up yet.
#[macro_export]
macro_rules! radio_link_interrupt {
    () => {
        $crate::isr::global_completion_interrupt(&RADIO_LINK)
    };
}
