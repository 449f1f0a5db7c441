//! Bit error rates for the 802.11b DSSS and HR/DSSS rates.
//!
//! - 1 Mbps: DBPSK, closed form
//! - 2 Mbps: DQPSK, closed-form approximation
//! - 5.5 / 11 Mbps: CCK, curve fits of Matlab simulations

use std::f64::consts::{PI, SQRT_2};

use super::math::all_bits_survive;

/// Above this linear SNR the CCK fits report no bit errors.
pub const CCK_SNR_PERFECT: f64 = 10.0;

/// Below this linear SNR every CCK bit is a coin flip.
pub const CCK_SNR_IMPOSSIBLE: f64 = 0.1;

/// DSSS chip rate over symbol rate: 22 MHz spread, 1 Msym/s.
const PROCESSING_GAIN: f64 = 22_000_000.0 / 1_000_000.0;

/// Success rate of `nbits` DBPSK (1 Mbps) bits.
///
/// ```text
/// Eb/N0 = snr × 22
/// BER   = 0.5 × exp(-Eb/N0)
/// ```
pub fn dbpsk_success_rate(snr: f64, nbits: u64) -> f64 {
    let eb_n0 = snr * PROCESSING_GAIN;
    let ber = 0.5 * (-eb_n0).exp();
    all_bits_survive(ber, nbits)
}

/// Success rate of `nbits` DQPSK (2 Mbps) bits. Two bits per symbol, so
/// `Eb/N0 = snr × 22 / 2`.
pub fn dqpsk_success_rate(snr: f64, nbits: u64) -> f64 {
    let eb_n0 = snr * PROCESSING_GAIN / 2.0;
    all_bits_survive(dqpsk_ber(eb_n0), nbits)
}

/// DQPSK bit error approximation.
///
/// ```text
/// BER(x) = (√2 + 1) / √(8π√2) × x^(-1/2) × exp(-(2 - √2) × x)
/// ```
///
/// The approximation grows without bound as `x → 0`; it is clamped to 0.5, the
/// error rate of a random guess.
fn dqpsk_ber(x: f64) -> f64 {
    let scale = (SQRT_2 + 1.0) / (8.0 * PI * SQRT_2).sqrt();
    let ber = scale / x.sqrt() * (-(2.0 - SQRT_2) * x).exp();
    if ber.is_nan() { 0.5 } else { ber.clamp(0.0, 0.5) }
}

/// Success rate of `nbits` CCK 5.5 Mbps bits.
///
/// ```text
/// BER = a1 × exp(-((snr - a2) / a3)^a4)
/// ```
pub fn cck5_5_success_rate(snr: f64, nbits: u64) -> f64 {
    let ber = if snr > CCK_SNR_PERFECT {
        0.0
    } else if snr < CCK_SNR_IMPOSSIBLE {
        0.5
    } else {
        let a1 = 5.368_163_434_405_619_5e-1;
        let a2 = 3.309_243_002_560_858_6e-3;
        let a3 = 4.165_437_236_100_400_0e-1;
        let a4 = 1.028_898_143_435_886_6;
        a1 * (-((snr - a2) / a3).powf(a4)).exp()
    };
    all_bits_survive(ber, nbits)
}

/// Success rate of `nbits` CCK 11 Mbps bits.
///
/// ```text
/// BER = (a1 s² + a2 s + a3) / (s³ + a4 s² + a5 s + a6)
/// ```
pub fn cck11_success_rate(snr: f64, nbits: u64) -> f64 {
    let ber = if snr > CCK_SNR_PERFECT {
        0.0
    } else if snr < CCK_SNR_IMPOSSIBLE {
        0.5
    } else {
        let a1 = 7.905_674_226_533_345_6e-3;
        let a2 = -1.839_744_939_917_636_0e-1;
        let a3 = 1.074_068_946_870_724_1;
        let a4 = 1.052_331_690_450_255_3;
        let a5 = 3.055_229_874_649_668_7e-1;
        let a6 = 2.203_271_512_869_843_5;
        (a1 * snr * snr + a2 * snr + a3) / (snr * snr * snr + a4 * snr * snr + a5 * snr + a6)
    };
    all_bits_survive(ber, nbits)
}
