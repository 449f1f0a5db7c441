//! NIST OFDM error model.
//!
//! Bit error rates come from the uncoded constellation error probabilities; the
//! coded packet error is then bounded with the union bound of the convolutional
//! code, written as a polynomial in the Bhattacharyya parameter
//! `D = √(4p(1 - p))`.
//!
//! Reference: Miller, Pagtzis et al., "Validation of the ns-3 802.11 error
//! models" (NIST), tables 3.1.1 and 3.1.2.

use super::Modulation;
use super::math::{all_bits_survive, erfc};
use crate::simulation::mode::CodeRate;

/// `(coefficient, exponent of D)` terms of the union bound, code rate 1/2.
const RATE_1_2_TERMS: [(f64, i32); 9] = [
    (36.0, 10),
    (211.0, 12),
    (1404.0, 14),
    (11633.0, 16),
    (77433.0, 18),
    (502690.0, 20),
    (3322763.0, 22),
    (21292910.0, 24),
    (134365911.0, 26),
];

/// Code rate 2/3.
const RATE_2_3_TERMS: [(f64, i32); 10] = [
    (3.0, 6),
    (70.0, 7),
    (285.0, 8),
    (1276.0, 9),
    (6160.0, 10),
    (27128.0, 11),
    (117019.0, 12),
    (498860.0, 13),
    (2103891.0, 14),
    (8784123.0, 15),
];

/// Code rate 3/4.
const RATE_3_4_TERMS: [(f64, i32); 10] = [
    (42.0, 5),
    (201.0, 6),
    (1492.0, 7),
    (10469.0, 8),
    (62935.0, 9),
    (379644.0, 10),
    (2253373.0, 11),
    (13073811.0, 12),
    (75152755.0, 13),
    (428005675.0, 14),
];

/// Uncoded bit error rate of a constellation at linear `snr`.
pub fn ber(modulation: Modulation, snr: f64) -> f64 {
    match modulation {
        Modulation::Bpsk => 0.5 * erfc(snr.sqrt()),
        Modulation::Qpsk => 0.5 * erfc((snr / 2.0).sqrt()),
        Modulation::Qam16 => 0.75 * 0.5 * erfc((snr / (5.0 * 2.0)).sqrt()),
        Modulation::Qam64 => 7.0 / 12.0 * 0.5 * erfc((snr / (21.0 * 2.0)).sqrt()),
    }
}

/// The `b` value (puncturing period) of a supported code rate.
fn b_value(code_rate: CodeRate) -> Option<u32> {
    match code_rate {
        CodeRate::OneHalf => Some(1),
        CodeRate::TwoThirds => Some(2),
        CodeRate::ThreeQuarters => Some(3),
        CodeRate::FiveSixths | CodeRate::Undefined => None,
    }
}

/// First-event error probability of the punctured code for bit error rate `p`.
///
/// ```text
/// b = 1:  Pe = 1/2 × Σ c_k D^k
/// b > 1:  Pe = 1/(2b) × Σ c_k D^k
/// ```
fn calculate_pe(p: f64, b: u32) -> f64 {
    let d = (4.0 * p * (1.0 - p)).sqrt();
    let terms: &[(f64, i32)] = match b {
        1 => &RATE_1_2_TERMS,
        2 => &RATE_2_3_TERMS,
        _ => &RATE_3_4_TERMS,
    };
    let sum: f64 = terms.iter().map(|(c, k)| c * d.powi(*k)).sum();
    sum / (2.0 * b as f64)
}

/// Success rate of `nbits` coded OFDM bits, or `None` when the code rate has
/// no coefficient table (64-QAM 5/6).
pub fn success_rate(modulation: Modulation, code_rate: CodeRate, snr: f64, nbits: u64) -> Option<f64> {
    let b = b_value(code_rate)?;
    let ber = ber(modulation, snr);
    if ber == 0.0 {
        return Some(1.0);
    }
    let pe = calculate_pe(ber, b).min(1.0);
    Some(all_bits_survive(pe, nbits))
}
