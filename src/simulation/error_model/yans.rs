//! YANS OFDM error model.
//!
//! The coded packet error is bounded by the first two terms of the union bound
//! over the code's weight spectrum:
//!
//! ```text
//! Pmu = a_dfree × Pd(dfree) + a_dfree+1 × Pd(dfree + 1)
//! ```
//!
//! where `Pd(d)` is the probability that hard decision decoding picks a wrong
//! path at Hamming distance `d`. Bit error rates use Eb/N0, i.e. the SNR scaled
//! by the channel bandwidth over the raw PHY rate.

use super::Modulation;
use super::math::{FactorialTable, all_bits_survive, erfc};
use crate::simulation::mode::{CodeRate, WifiMode};

/// Weight spectrum parameters of a punctured convolutional code.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CodeSpectrum {
    d_free: u32,
    ad_free: f64,
    ad_free_plus_one: f64,
}

const fn spectrum(d_free: u32, ad_free: f64, ad_free_plus_one: f64) -> CodeSpectrum {
    CodeSpectrum {
        d_free,
        ad_free,
        ad_free_plus_one,
    }
}

fn code_spectrum(modulation: Modulation, code_rate: CodeRate) -> Option<CodeSpectrum> {
    match (modulation, code_rate) {
        // BPSK only uses the first term.
        (Modulation::Bpsk, CodeRate::OneHalf) => Some(spectrum(10, 11.0, 0.0)),
        (Modulation::Bpsk, CodeRate::ThreeQuarters) => Some(spectrum(5, 8.0, 0.0)),
        (Modulation::Qpsk | Modulation::Qam16, CodeRate::OneHalf) => Some(spectrum(10, 11.0, 0.0)),
        (Modulation::Qpsk | Modulation::Qam16, CodeRate::ThreeQuarters) => Some(spectrum(5, 8.0, 31.0)),
        (Modulation::Qam64, CodeRate::TwoThirds) => Some(spectrum(6, 1.0, 16.0)),
        (Modulation::Qam64, CodeRate::ThreeQuarters) => Some(spectrum(5, 8.0, 31.0)),
        _ => None,
    }
}

fn eb_no(mode: &WifiMode, snr: f64) -> f64 {
    snr * mode.bandwidth_hz() as f64 / mode.phy_rate_bps() as f64
}

fn bpsk_ber(eb_no: f64) -> f64 {
    0.5 * erfc(eb_no.sqrt())
}

/// Bit error rate of square M-QAM (QPSK is 4-QAM).
///
/// ```text
/// z   = √(1.5 × log₂M × Eb/N0 / (M - 1))
/// z1  = (1 - 1/√M) × erfc(z)
/// BER = (1 - (1 - z1)²) / log₂M
/// ```
fn qam_ber(m: f64, eb_no: f64) -> f64 {
    let bits = m.log2();
    let z = (1.5 * bits * eb_no / (m - 1.0)).sqrt();
    let z1 = (1.0 - 1.0 / m.sqrt()) * erfc(z);
    let z2 = 1.0 - (1.0 - z1).powi(2);
    z2 / bits
}

/// Pairwise error probability at Hamming distance `d` with bit error rate `ber`.
fn calculate_pd(factorials: &FactorialTable, ber: f64, d: u32) -> f64 {
    if d % 2 == 1 {
        ((d + 1) / 2..d).map(|i| factorials.binomial(i, ber, d)).sum()
    } else {
        let ties = 0.5 * factorials.binomial(d / 2, ber, d);
        let above: f64 = (d / 2 + 1..d).map(|i| factorials.binomial(i, ber, d)).sum();
        above + ties
    }
}

/// Success rate of `nbits` coded OFDM bits, or `None` for code rates with no
/// known weight spectrum (64-QAM 5/6).
pub fn success_rate(
    factorials: &FactorialTable,
    mode: &WifiMode,
    modulation: Modulation,
    code_rate: CodeRate,
    snr: f64,
    nbits: u64,
) -> Option<f64> {
    let code = code_spectrum(modulation, code_rate)?;
    let eb_no = eb_no(mode, snr);
    let ber = match modulation {
        Modulation::Bpsk => bpsk_ber(eb_no),
        other => qam_ber(other.constellation_size() as f64, eb_no),
    };
    if ber == 0.0 {
        return Some(1.0);
    }
    let mut pmu = code.ad_free * calculate_pd(factorials, ber, code.d_free);
    if code.ad_free_plus_one != 0.0 {
        pmu += code.ad_free_plus_one * calculate_pd(factorials, ber, code.d_free + 1);
    }
    Some(all_bits_survive(pmu.min(1.0), nbits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::mode::ModulationClass;

    #[test]
    fn pd_odd_sums_upper_half_without_the_all_wrong_term() {
        let f = FactorialTable::new();
        let p: f64 = 0.1;
        // d = 5: i = 3, 4
        let expected = 10.0 * p.powi(3) * (1.0 - p).powi(2) + 5.0 * p.powi(4) * (1.0 - p);
        assert!((calculate_pd(&f, p, 5) - expected).abs() < 1e-15);
    }

    #[test]
    fn pd_even_splits_ties() {
        let f = FactorialTable::new();
        let p: f64 = 0.1;
        // d = 6: i = 4, 5 plus half of i = 3
        let expected = 15.0 * p.powi(4) * (1.0 - p).powi(2)
            + 6.0 * p.powi(5) * (1.0 - p)
            + 0.5 * 20.0 * p.powi(3) * (1.0 - p).powi(3);
        assert!((calculate_pd(&f, p, 6) - expected).abs() < 1e-15);
    }

    #[test]
    fn qpsk_ber_matches_bpsk_per_bit() {
        // Gray-coded QPSK has the BPSK bit error rate at the same Eb/N0, up to
        // the second-order term of the z2 expansion.
        let eb = 4.0;
        let qpsk = qam_ber(4.0, eb);
        let bpsk = bpsk_ber(eb);
        assert!((qpsk - bpsk).abs() / bpsk < 1e-2);
    }

    #[test]
    fn eb_no_uses_phy_rate() {
        // 20 MHz over 12 Mbps raw
        assert!((eb_no(&WifiMode::OFDM_6MBPS, 3.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn five_sixths_has_no_spectrum() {
        let f = FactorialTable::new();
        let ht = WifiMode::new("HtMcs7", ModulationClass::Ofdm, false, 20_000_000, 65_000_000, CodeRate::FiveSixths, 64);
        assert_eq!(success_rate(&f, &ht, Modulation::Qam64, CodeRate::FiveSixths, 100.0, 8), None);
    }
}
