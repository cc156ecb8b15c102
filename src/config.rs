//! Radio configuration.
//!
//! The physical layer is set up by writing an ordered list of
//! `(address, value)` pairs once at initialisation. The values are
//! deployment-compatibility constants: nodes in the field were programmed with
//! exactly these tables, and any change makes a node deaf to its peers.
//!
//! Both tables configure 2-GFSK at 38.38 kBaud on 433.99997 MHz with a
//! 101.5 kHz RX filter, 20.6 kHz deviation, 30/32 sync word qualification,
//! CRC enabled and variable packet length. They differ in the modem and
//! synthesizer tuning:
//!
//! | Profile                  | MDMCFG2 | FSCTRL1 | PKTLEN |
//! |--------------------------|---------|---------|--------|
//! | [`Profile::Sensitivity`] | `0x13`  | `0x06`  | `0xFF` |
//! | [`Profile::LowPower`]    | `0x93`  | `0x08`  | `0x32` |

use crate::consts::*;

/// One register write of a configuration table.
pub type RegisterSetting = (u8, u8);

/// Register table optimised for receiver sensitivity. The default.
pub const SENSITIVITY_SETTINGS: [RegisterSetting; 45] = [
    (IOCFG2, 0x29),
    (IOCFG1, 0x2E),
    (IOCFG0, 0x06),
    (FIFOTHR, 0x47),
    (SYNC1, 0xD3),
    (SYNC0, 0x91),
    (PKTLEN, 0xFF),
    (PKTCTRL1, 0x04),
    (PKTCTRL0, 0x05),
    (ADDR, 0x00),
    (CHANNR, 0x00),
    (FSCTRL1, 0x06),
    (FSCTRL0, 0x00),
    (FREQ2, 0x10),
    (FREQ1, 0xB1),
    (FREQ0, 0x3B),
    (MDMCFG4, 0xCA),
    (MDMCFG3, 0x83),
    (MDMCFG2, 0x13),
    (MDMCFG1, 0x22),
    (MDMCFG0, 0xF8),
    (DEVIATN, 0x35),
    (MCSM2, 0x07),
    (MCSM1, 0x30),
    (MCSM0, 0x10),
    (FOCCFG, 0x16),
    (BSCFG, 0x6C),
    (AGCCTRL2, 0x43),
    (AGCCTRL1, 0x40),
    (AGCCTRL0, 0x91),
    (WOREVT1, 0x80),
    (WOREVT0, 0x00),
    (WORCTRL, 0xFB),
    (FREND1, 0x56),
    (FREND0, 0x10),
    (FSCAL3, 0xE9),
    (FSCAL2, 0x2A),
    (FSCAL1, 0x00),
    (FSCAL0, 0x1F),
    (FSTEST, 0x59),
    (PTEST, 0x7F),
    (AGCTEST, 0x3F),
    (TEST2, 0x81),
    (TEST1, 0x35),
    (TEST0, 0x09),
];

/// Register table optimised for current consumption.
pub const LOW_POWER_SETTINGS: [RegisterSetting; 45] = [
    (IOCFG2, 0x29),
    (IOCFG1, 0x2E),
    (IOCFG0, 0x06),
    (FIFOTHR, 0x47),
    (SYNC1, 0xD3),
    (SYNC0, 0x91),
    (PKTLEN, 0x32),
    (PKTCTRL1, 0x04),
    (PKTCTRL0, 0x05),
    (ADDR, 0x00),
    (CHANNR, 0x00),
    (FSCTRL1, 0x08),
    (FSCTRL0, 0x00),
    (FREQ2, 0x10),
    (FREQ1, 0xB1),
    (FREQ0, 0x3B),
    (MDMCFG4, 0xCA),
    (MDMCFG3, 0x83),
    (MDMCFG2, 0x93),
    (MDMCFG1, 0x22),
    (MDMCFG0, 0xF8),
    (DEVIATN, 0x35),
    (MCSM2, 0x07),
    (MCSM1, 0x30),
    (MCSM0, 0x10),
    (FOCCFG, 0x16),
    (BSCFG, 0x6C),
    (AGCCTRL2, 0x43),
    (AGCCTRL1, 0x40),
    (AGCCTRL0, 0x91),
    (WOREVT1, 0x80),
    (WOREVT0, 0x00),
    (WORCTRL, 0xFB),
    (FREND1, 0x56),
    (FREND0, 0x10),
    (FSCAL3, 0xE9),
    (FSCAL2, 0x2A),
    (FSCAL1, 0x00),
    (FSCAL0, 0x1F),
    (FSTEST, 0x59),
    (PTEST, 0x7F),
    (AGCTEST, 0x3F),
    (TEST2, 0x81),
    (TEST1, 0x35),
    (TEST0, 0x09),
];

/// Which register table [`init`](crate::driver::LinkDriver::init) programs.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Profile {
    /// Best receiver sensitivity, maximum packet length.
    #[default]
    Sensitivity,
    /// Lower current draw, 50-byte packet length limit.
    LowPower,
}

impl Profile {
    /// The ordered register table of this profile.
    pub fn settings(self) -> &'static [RegisterSetting] {
        match self {
            Profile::Sensitivity => &SENSITIVITY_SETTINGS,
            Profile::LowPower => &LOW_POWER_SETTINGS,
        }
    }
}

/// Transmit power, written to the first PA table entry.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum TxPower {
    /// +10 dBm.
    #[default]
    Plus10Dbm,
    /// 0 dBm.
    ZeroDbm,
    /// Any other PA table value.
    Raw(u8),
}

impl TxPower {
    /// The PA table value for this power level at 433 MHz.
    pub fn pa_value(self) -> u8 {
        match self {
            TxPower::Plus10Dbm => 0xC3,
            TxPower::ZeroDbm => 0x51,
            TxPower::Raw(v) => v,
        }
    }
}

/// Runtime configuration of a [`LinkDriver`](crate::driver::LinkDriver).
///
/// ## Example
///
/// ```rust
/// use rf1a_link::config::{LinkConfig, Profile, TxPower};
///
/// let config = LinkConfig {
///     profile: Profile::LowPower,
///     tx_power: TxPower::ZeroDbm,
///     ..LinkConfig::default()
/// };
/// assert_eq!(config.terminator, b'\n');
/// ```
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct LinkConfig {
    /// Register table applied at init.
    pub profile: Profile,
    /// PA table value applied at init.
    pub tx_power: TxPower,
    /// Byte that ends a message in the TX queue.
    pub terminator: u8,
    /// Iterations any bus busy-wait may spin before giving up.
    pub poll_limit: u32,
    /// Settle time after the chip wakes from sleep, in microseconds.
    ///
    /// 850 cycles at 1.05 MHz, see erratum RF1A7.
    pub erratum_settle_us: u32,
    /// How many times the driver polls for Idle before declaring a fault.
    pub idle_retry_limit: u8,
    /// Sleep between two Idle polls, in milliseconds.
    pub idle_retry_interval_ms: u32,
    /// Whether the on-air indicator is active low.
    pub on_air_inverted: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            tx_power: TxPower::default(),
            terminator: DEFAULT_TERMINATOR,
            poll_limit: 100_000,
            erratum_settle_us: 810,
            idle_retry_limit: 20,
            idle_retry_interval_ms: 1,
            on_air_inverted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_differ_only_in_modem_tuning() {
        let differing: Vec<u8> = SENSITIVITY_SETTINGS
            .iter()
            .zip(LOW_POWER_SETTINGS.iter())
            .filter(|(a, b)| a != b)
            .map(|(a, _)| a.0)
            .collect();
        assert_eq!(differing, vec![PKTLEN, FSCTRL1, MDMCFG2]);
    }

    #[test]
    fn test_tables_stay_in_config_space() {
        for (addr, _) in SENSITIVITY_SETTINGS.iter().chain(LOW_POWER_SETTINGS.iter()) {
            assert!(*addr <= CONFIG_SPACE_END);
        }
    }

    #[test]
    fn test_tables_start_with_chip_ready_on_gdo2() {
        assert_eq!(Profile::Sensitivity.settings()[0], (IOCFG2, IOCFG2_CHIP_READY));
        assert_eq!(Profile::LowPower.settings()[0], (IOCFG2, IOCFG2_CHIP_READY));
    }

    #[test]
    fn test_tx_power_values() {
        assert_eq!(TxPower::default().pa_value(), 0xC3);
        assert_eq!(TxPower::ZeroDbm.pa_value(), 0x51);
        assert_eq!(TxPower::Raw(0x8E).pa_value(), 0x8E);
    }

    #[test]
    fn test_default_config() {
        let config = LinkConfig::default();
        assert_eq!(config.profile, Profile::Sensitivity);
        assert_eq!(config.erratum_settle_us, 810);
        assert_eq!(config.idle_retry_limit, 20);
        assert!(!config.on_air_inverted);
    }
}
