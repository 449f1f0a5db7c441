//! IEEE 802.11 transmission modes and PLCP timing.
//!
//! A [`WifiMode`] describes one PHY rate: modulation class, channel bandwidth,
//! data rate, convolutional code rate and constellation size. The error rate
//! models dispatch on these fields; the interference tracker uses the PLCP
//! timing functions to split a frame into preamble, header and payload.
//!
//! Timing follows IEEE Std 802.11-2007:
//! - Clause 15/18: DSSS and HR/DSSS (1, 2, 5.5, 11 Mbps)
//! - Clause 17: OFDM at 20, 10 and 5 MHz channel spacing
//! - Clause 19.5: ERP-OFDM

use serde::Deserialize;

use crate::error::PhyError;

use CodeRate::{OneHalf, ThreeQuarters, TwoThirds, Undefined};
use ModulationClass::{Dsss, ErpOfdm, Ofdm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModulationClass {
    Dsss,
    Ofdm,
    ErpOfdm,
}

/// Convolutional code rate. DSSS modes have no code rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeRate {
    Undefined,
    OneHalf,
    TwoThirds,
    ThreeQuarters,
    FiveSixths,
}

impl CodeRate {
    /// `(numerator, denominator)` of the rate, `(1, 1)` when undefined.
    pub const fn fraction(self) -> (u64, u64) {
        match self {
            CodeRate::Undefined => (1, 1),
            CodeRate::OneHalf => (1, 2),
            CodeRate::TwoThirds => (2, 3),
            CodeRate::ThreeQuarters => (3, 4),
            CodeRate::FiveSixths => (5, 6),
        }
    }
}

/// PLCP preamble type. Only DSSS timing depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preamble {
    #[default]
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WifiMode {
    name: &'static str,
    class: ModulationClass,
    mandatory: bool,
    bandwidth_hz: u32,
    data_rate_bps: u64,
    code_rate: CodeRate,
    constellation_size: u16,
}

impl WifiMode {
    /// Build a mode outside the standard tables, e.g. a high-throughput rate.
    pub const fn new(
        name: &'static str,
        class: ModulationClass,
        mandatory: bool,
        bandwidth_hz: u32,
        data_rate_bps: u64,
        code_rate: CodeRate,
        constellation_size: u16,
    ) -> Self {
        Self {
            name,
            class,
            mandatory,
            bandwidth_hz,
            data_rate_bps,
            code_rate,
            constellation_size,
        }
    }

    // Clause 15 and 18 rates (DSSS, HR/DSSS)
    pub const DSSS_1MBPS: WifiMode = Self::new("DsssRate1Mbps", Dsss, true, 22_000_000, 1_000_000, Undefined, 2);
    pub const DSSS_2MBPS: WifiMode = Self::new("DsssRate2Mbps", Dsss, true, 22_000_000, 2_000_000, Undefined, 4);
    pub const DSSS_5_5MBPS: WifiMode = Self::new("DsssRate5_5Mbps", Dsss, true, 22_000_000, 5_500_000, Undefined, 4);
    pub const DSSS_11MBPS: WifiMode = Self::new("DsssRate11Mbps", Dsss, true, 22_000_000, 11_000_000, Undefined, 4);

    // Clause 19.5 rates (ERP-OFDM)
    pub const ERP_OFDM_6MBPS: WifiMode = Self::new("ErpOfdmRate6Mbps", ErpOfdm, true, 20_000_000, 6_000_000, OneHalf, 2);
    pub const ERP_OFDM_9MBPS: WifiMode = Self::new("ErpOfdmRate9Mbps", ErpOfdm, false, 20_000_000, 9_000_000, ThreeQuarters, 2);
    pub const ERP_OFDM_12MBPS: WifiMode = Self::new("ErpOfdmRate12Mbps", ErpOfdm, true, 20_000_000, 12_000_000, OneHalf, 4);
    pub const ERP_OFDM_18MBPS: WifiMode = Self::new("ErpOfdmRate18Mbps", ErpOfdm, false, 20_000_000, 18_000_000, ThreeQuarters, 4);
    pub const ERP_OFDM_24MBPS: WifiMode = Self::new("ErpOfdmRate24Mbps", ErpOfdm, true, 20_000_000, 24_000_000, OneHalf, 16);
    pub const ERP_OFDM_36MBPS: WifiMode = Self::new("ErpOfdmRate36Mbps", ErpOfdm, false, 20_000_000, 36_000_000, ThreeQuarters, 16);
    pub const ERP_OFDM_48MBPS: WifiMode = Self::new("ErpOfdmRate48Mbps", ErpOfdm, false, 20_000_000, 48_000_000, TwoThirds, 64);
    pub const ERP_OFDM_54MBPS: WifiMode = Self::new("ErpOfdmRate54Mbps", ErpOfdm, false, 20_000_000, 54_000_000, ThreeQuarters, 64);

    // Clause 17 rates (OFDM, 20 MHz)
    pub const OFDM_6MBPS: WifiMode = Self::new("OfdmRate6Mbps", Ofdm, true, 20_000_000, 6_000_000, OneHalf, 2);
    pub const OFDM_9MBPS: WifiMode = Self::new("OfdmRate9Mbps", Ofdm, false, 20_000_000, 9_000_000, ThreeQuarters, 2);
    pub const OFDM_12MBPS: WifiMode = Self::new("OfdmRate12Mbps", Ofdm, true, 20_000_000, 12_000_000, OneHalf, 4);
    pub const OFDM_18MBPS: WifiMode = Self::new("OfdmRate18Mbps", Ofdm, false, 20_000_000, 18_000_000, ThreeQuarters, 4);
    pub const OFDM_24MBPS: WifiMode = Self::new("OfdmRate24Mbps", Ofdm, true, 20_000_000, 24_000_000, OneHalf, 16);
    pub const OFDM_36MBPS: WifiMode = Self::new("OfdmRate36Mbps", Ofdm, false, 20_000_000, 36_000_000, ThreeQuarters, 16);
    pub const OFDM_48MBPS: WifiMode = Self::new("OfdmRate48Mbps", Ofdm, false, 20_000_000, 48_000_000, TwoThirds, 64);
    pub const OFDM_54MBPS: WifiMode = Self::new("OfdmRate54Mbps", Ofdm, false, 20_000_000, 54_000_000, ThreeQuarters, 64);

    // 10 MHz channel rates
    pub const OFDM_3MBPS_BW10MHZ: WifiMode = Self::new("OfdmRate3MbpsBW10MHz", Ofdm, true, 10_000_000, 3_000_000, OneHalf, 2);
    pub const OFDM_4_5MBPS_BW10MHZ: WifiMode = Self::new("OfdmRate4_5MbpsBW10MHz", Ofdm, false, 10_000_000, 4_500_000, ThreeQuarters, 2);
    pub const OFDM_6MBPS_BW10MHZ: WifiMode = Self::new("OfdmRate6MbpsBW10MHz", Ofdm, true, 10_000_000, 6_000_000, OneHalf, 4);
    pub const OFDM_9MBPS_BW10MHZ: WifiMode = Self::new("OfdmRate9MbpsBW10MHz", Ofdm, false, 10_000_000, 9_000_000, ThreeQuarters, 4);
    pub const OFDM_12MBPS_BW10MHZ: WifiMode = Self::new("OfdmRate12MbpsBW10MHz", Ofdm, true, 10_000_000, 12_000_000, OneHalf, 16);
    pub const OFDM_18MBPS_BW10MHZ: WifiMode = Self::new("OfdmRate18MbpsBW10MHz", Ofdm, false, 10_000_000, 18_000_000, ThreeQuarters, 16);
    pub const OFDM_24MBPS_BW10MHZ: WifiMode = Self::new("OfdmRate24MbpsBW10MHz", Ofdm, false, 10_000_000, 24_000_000, TwoThirds, 64);
    pub const OFDM_27MBPS_BW10MHZ: WifiMode = Self::new("OfdmRate27MbpsBW10MHz", Ofdm, false, 10_000_000, 27_000_000, ThreeQuarters, 64);

    // 5 MHz channel rates
    pub const OFDM_1_5MBPS_BW5MHZ: WifiMode = Self::new("OfdmRate1_5MbpsBW5MHz", Ofdm, true, 5_000_000, 1_500_000, OneHalf, 2);
    pub const OFDM_2_25MBPS_BW5MHZ: WifiMode = Self::new("OfdmRate2_25MbpsBW5MHz", Ofdm, false, 5_000_000, 2_250_000, ThreeQuarters, 2);
    pub const OFDM_3MBPS_BW5MHZ: WifiMode = Self::new("OfdmRate3MbpsBW5MHz", Ofdm, true, 5_000_000, 3_000_000, OneHalf, 4);
    pub const OFDM_4_5MBPS_BW5MHZ: WifiMode = Self::new("OfdmRate4_5MbpsBW5MHz", Ofdm, false, 5_000_000, 4_500_000, ThreeQuarters, 4);
    pub const OFDM_6MBPS_BW5MHZ: WifiMode = Self::new("OfdmRate6MbpsBW5MHz", Ofdm, true, 5_000_000, 6_000_000, OneHalf, 16);
    pub const OFDM_9MBPS_BW5MHZ: WifiMode = Self::new("OfdmRate9MbpsBW5MHz", Ofdm, false, 5_000_000, 9_000_000, ThreeQuarters, 16);
    pub const OFDM_12MBPS_BW5MHZ: WifiMode = Self::new("OfdmRate12MbpsBW5MHz", Ofdm, false, 5_000_000, 12_000_000, TwoThirds, 64);
    pub const OFDM_13_5MBPS_BW5MHZ: WifiMode = Self::new("OfdmRate13_5MbpsBW5MHz", Ofdm, false, 5_000_000, 13_500_000, ThreeQuarters, 64);

    /// Every mode known to the simulator.
    pub const ALL: [WifiMode; 36] = [
        Self::DSSS_1MBPS,
        Self::DSSS_2MBPS,
        Self::DSSS_5_5MBPS,
        Self::DSSS_11MBPS,
        Self::ERP_OFDM_6MBPS,
        Self::ERP_OFDM_9MBPS,
        Self::ERP_OFDM_12MBPS,
        Self::ERP_OFDM_18MBPS,
        Self::ERP_OFDM_24MBPS,
        Self::ERP_OFDM_36MBPS,
        Self::ERP_OFDM_48MBPS,
        Self::ERP_OFDM_54MBPS,
        Self::OFDM_6MBPS,
        Self::OFDM_9MBPS,
        Self::OFDM_12MBPS,
        Self::OFDM_18MBPS,
        Self::OFDM_24MBPS,
        Self::OFDM_36MBPS,
        Self::OFDM_48MBPS,
        Self::OFDM_54MBPS,
        Self::OFDM_3MBPS_BW10MHZ,
        Self::OFDM_4_5MBPS_BW10MHZ,
        Self::OFDM_6MBPS_BW10MHZ,
        Self::OFDM_9MBPS_BW10MHZ,
        Self::OFDM_12MBPS_BW10MHZ,
        Self::OFDM_18MBPS_BW10MHZ,
        Self::OFDM_24MBPS_BW10MHZ,
        Self::OFDM_27MBPS_BW10MHZ,
        Self::OFDM_1_5MBPS_BW5MHZ,
        Self::OFDM_2_25MBPS_BW5MHZ,
        Self::OFDM_3MBPS_BW5MHZ,
        Self::OFDM_4_5MBPS_BW5MHZ,
        Self::OFDM_6MBPS_BW5MHZ,
        Self::OFDM_9MBPS_BW5MHZ,
        Self::OFDM_12MBPS_BW5MHZ,
        Self::OFDM_13_5MBPS_BW5MHZ,
    ];

    /// Look a mode up by its unique name, e.g. `"OfdmRate24Mbps"`.
    pub fn by_name(name: &str) -> Result<WifiMode, PhyError> {
        Self::ALL
            .iter()
            .find(|m| m.name == name)
            .copied()
            .ok_or_else(|| PhyError::UnknownMode(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn modulation_class(&self) -> ModulationClass {
        self.class
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    pub fn bandwidth_hz(&self) -> u32 {
        self.bandwidth_hz
    }

    pub fn data_rate_bps(&self) -> u64 {
        self.data_rate_bps
    }

    pub fn code_rate(&self) -> CodeRate {
        self.code_rate
    }

    pub fn constellation_size(&self) -> u16 {
        self.constellation_size
    }

    /// Raw PHY bit rate before coding.
    ///
    /// # Formula
    ///
    /// ```text
    /// phy_rate = data_rate / code_rate
    /// ```
    ///
    /// DSSS modes have no code rate, so their PHY rate equals the data rate.
    pub fn phy_rate_bps(&self) -> u64 {
        let (num, den) = self.code_rate.fraction();
        self.data_rate_bps * den / num
    }

    pub fn is_ofdm(&self) -> bool {
        matches!(self.class, ModulationClass::Ofdm | ModulationClass::ErpOfdm)
    }

    /// Mode used to send the PLCP header of a frame sent with `self`.
    pub fn header_mode(&self, preamble: Preamble) -> WifiMode {
        match self.class {
            ModulationClass::Ofdm => match self.bandwidth_hz {
                5_000_000 => Self::OFDM_1_5MBPS_BW5MHZ,
                10_000_000 => Self::OFDM_3MBPS_BW10MHZ,
                _ => Self::OFDM_6MBPS,
            },
            ModulationClass::ErpOfdm => Self::ERP_OFDM_6MBPS,
            ModulationClass::Dsss => match preamble {
                Preamble::Long => Self::DSSS_1MBPS,
                Preamble::Short => Self::DSSS_2MBPS,
            },
        }
    }

    /// PLCP preamble duration in microseconds.
    pub fn plcp_preamble_duration_us(&self, preamble: Preamble) -> u64 {
        match self.class {
            ModulationClass::Ofdm => match self.bandwidth_hz {
                10_000_000 => 32,
                5_000_000 => 64,
                _ => 16,
            },
            ModulationClass::ErpOfdm => 4,
            ModulationClass::Dsss => match preamble {
                Preamble::Short => 72,
                Preamble::Long => 144,
            },
        }
    }

    /// PLCP header duration in microseconds.
    ///
    /// For OFDM this is the SIGNAL field only; the SERVICE field is sent with
    /// the payload mode and is accounted for in [`Self::payload_duration_us`].
    pub fn plcp_header_duration_us(&self, preamble: Preamble) -> u64 {
        match self.class {
            ModulationClass::Ofdm => match self.bandwidth_hz {
                10_000_000 => 8,
                5_000_000 => 16,
                _ => 4,
            },
            ModulationClass::ErpOfdm => 16,
            ModulationClass::Dsss => match preamble {
                Preamble::Short => 24,
                Preamble::Long => 48,
            },
        }
    }

    /// Payload duration in microseconds for `size` bytes.
    ///
    /// # Formula
    ///
    /// ```text
    /// OFDM:  ceil((16 + 8 × size + 6) / N_DBPS) × T_SYM   (+6 µs for ERP)
    /// DSSS:  ceil(8 × size / rate_Mbps)
    /// ```
    ///
    /// Where `N_DBPS = data_rate × T_SYM` and `T_SYM` is 4, 8 or 16 µs for
    /// 20, 10 and 5 MHz channels.
    pub fn payload_duration_us(&self, size: u32) -> u64 {
        match self.class {
            ModulationClass::Ofdm | ModulationClass::ErpOfdm => {
                let symbol_us: u64 = match self.bandwidth_hz {
                    10_000_000 => 8,
                    5_000_000 => 16,
                    _ => 4,
                };
                let bits_per_symbol = self.data_rate_bps as f64 * symbol_us as f64 / 1e6;
                let symbols = ((16.0 + size as f64 * 8.0 + 6.0) / bits_per_symbol).ceil() as u64;
                let duration = symbols * symbol_us;
                if self.class == ModulationClass::ErpOfdm {
                    // Signal extension
                    duration + 6
                } else {
                    duration
                }
            }
            ModulationClass::Dsss => (size as f64 * 8.0 / (self.data_rate_bps as f64 / 1e6)).ceil() as u64,
        }
    }

    /// Total airtime of a frame: preamble, header and payload.
    pub fn tx_duration_us(&self, size: u32, preamble: Preamble) -> u64 {
        self.plcp_preamble_duration_us(preamble) + self.plcp_header_duration_us(preamble) + self.payload_duration_us(size)
    }
}

/// PHY standards and the modes they offer. MAC timing is not modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Standard80211 {
    /// 802.11a, OFDM at 5 GHz.
    A,
    /// 802.11b, DSSS only.
    B,
    /// 802.11g, DSSS plus ERP-OFDM.
    G,
}

impl Standard80211 {
    pub fn modes(&self) -> Vec<WifiMode> {
        WifiMode::ALL
            .iter()
            .filter(|m| match self {
                Standard80211::A => m.class == ModulationClass::Ofdm && m.bandwidth_hz == 20_000_000,
                Standard80211::B => m.class == ModulationClass::Dsss,
                Standard80211::G => m.class == ModulationClass::Dsss || m.class == ModulationClass::ErpOfdm,
            })
            .copied()
            .collect()
    }

    pub fn default_mode(&self) -> WifiMode {
        match self {
            Standard80211::A => WifiMode::OFDM_6MBPS,
            Standard80211::B | Standard80211::G => WifiMode::DSSS_1MBPS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_resolvable() {
        for m in WifiMode::ALL {
            assert_eq!(WifiMode::by_name(m.name()).unwrap(), m);
        }
        let mut names: Vec<_> = WifiMode::ALL.iter().map(|m| m.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), WifiMode::ALL.len());
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert_eq!(
            WifiMode::by_name("OfdmRate7Mbps"),
            Err(PhyError::UnknownMode("OfdmRate7Mbps".to_string()))
        );
    }

    #[test]
    fn phy_rate_undoes_coding() {
        assert_eq!(WifiMode::OFDM_6MBPS.phy_rate_bps(), 12_000_000);
        assert_eq!(WifiMode::OFDM_9MBPS.phy_rate_bps(), 12_000_000);
        assert_eq!(WifiMode::OFDM_48MBPS.phy_rate_bps(), 72_000_000);
        assert_eq!(WifiMode::OFDM_2_25MBPS_BW5MHZ.phy_rate_bps(), 3_000_000);
        assert_eq!(WifiMode::DSSS_11MBPS.phy_rate_bps(), 11_000_000);
    }

    #[test]
    fn header_modes() {
        assert_eq!(WifiMode::OFDM_54MBPS.header_mode(Preamble::Long), WifiMode::OFDM_6MBPS);
        assert_eq!(WifiMode::OFDM_27MBPS_BW10MHZ.header_mode(Preamble::Long), WifiMode::OFDM_3MBPS_BW10MHZ);
        assert_eq!(WifiMode::OFDM_9MBPS_BW5MHZ.header_mode(Preamble::Short), WifiMode::OFDM_1_5MBPS_BW5MHZ);
        assert_eq!(WifiMode::ERP_OFDM_54MBPS.header_mode(Preamble::Long), WifiMode::ERP_OFDM_6MBPS);
        assert_eq!(WifiMode::DSSS_11MBPS.header_mode(Preamble::Long), WifiMode::DSSS_1MBPS);
        assert_eq!(WifiMode::DSSS_11MBPS.header_mode(Preamble::Short), WifiMode::DSSS_2MBPS);
    }

    #[test]
    fn plcp_timing() {
        assert_eq!(WifiMode::OFDM_6MBPS.plcp_preamble_duration_us(Preamble::Long), 16);
        assert_eq!(WifiMode::OFDM_6MBPS_BW10MHZ.plcp_preamble_duration_us(Preamble::Long), 32);
        assert_eq!(WifiMode::OFDM_6MBPS_BW5MHZ.plcp_header_duration_us(Preamble::Long), 16);
        assert_eq!(WifiMode::ERP_OFDM_6MBPS.plcp_preamble_duration_us(Preamble::Long), 4);
        assert_eq!(WifiMode::ERP_OFDM_6MBPS.plcp_header_duration_us(Preamble::Long), 16);
        assert_eq!(WifiMode::DSSS_1MBPS.plcp_preamble_duration_us(Preamble::Long), 144);
        assert_eq!(WifiMode::DSSS_1MBPS.plcp_header_duration_us(Preamble::Short), 24);
    }

    #[test]
    fn payload_durations() {
        // 100 bytes at 6 Mbps: (16 + 800 + 6) / 24 = 34.25 -> 35 symbols
        assert_eq!(WifiMode::OFDM_6MBPS.payload_duration_us(100), 140);
        assert_eq!(WifiMode::ERP_OFDM_6MBPS.payload_duration_us(100), 146);
        // 10 MHz: N_DBPS = 3 Mbps * 8 us = 24, symbol 8 us
        assert_eq!(WifiMode::OFDM_3MBPS_BW10MHZ.payload_duration_us(100), 280);
        assert_eq!(WifiMode::DSSS_1MBPS.payload_duration_us(100), 800);
        assert_eq!(WifiMode::DSSS_11MBPS.payload_duration_us(100), 73);
        assert_eq!(WifiMode::DSSS_5_5MBPS.payload_duration_us(11), 16);
    }

    #[test]
    fn tx_duration_sums_parts() {
        assert_eq!(WifiMode::OFDM_6MBPS.tx_duration_us(100, Preamble::Long), 16 + 4 + 140);
        assert_eq!(WifiMode::DSSS_2MBPS.tx_duration_us(50, Preamble::Short), 72 + 24 + 200);
    }

    #[test]
    fn standards_list_their_modes() {
        assert_eq!(Standard80211::A.modes().len(), 8);
        assert_eq!(Standard80211::B.modes().len(), 4);
        assert_eq!(Standard80211::G.modes().len(), 12);
        assert_eq!(Standard80211::A.default_mode(), WifiMode::OFDM_6MBPS);
        assert_eq!(Standard80211::G.default_mode(), WifiMode::DSSS_1MBPS);
        assert!(Standard80211::B.modes().iter().all(|m| m.is_mandatory()));
    }

    #[test]
    fn preamble_parses_lowercase() {
        let p: Preamble = serde_json::from_str("\"short\"").unwrap();
        assert_eq!(p, Preamble::Short);
    }
}
