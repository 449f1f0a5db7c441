//! Power unit conversions and receiver noise.
//!
//! Units:
//! - Power: dBm and W (the interference sums are done in linear watts)
//! - Gains and noise figures: dB, converted to linear ratios where multiplied
//! - Bandwidth: Hz

/// Boltzmann constant in J/K.
pub const BOLTZMANN: f64 = 1.3803e-23;

/// Reference noise temperature in kelvin.
pub const NOISE_TEMPERATURE_K: f64 = 290.0;

/// Convert power from dBm to watts.
///
/// # Formula
///
/// ```text
/// P(W) = 10^(P(dBm) / 10) / 1000
/// ```
///
/// # Examples
///
/// ```text
/// 30 dBm  → 1 W
/// 0 dBm   → 1 mW
/// -30 dBm → 1 µW
/// ```
pub fn dbm_to_w(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0) / 1000.0
}

/// Convert power from watts to dBm.
///
/// # Formula
///
/// ```text
/// P(dBm) = 10 × log₁₀(P(W) × 1000)
/// ```
///
/// # Notes
///
/// - This is the inverse of [`dbm_to_w`]
/// - For `w <= 0` the result is `-inf` or NaN; callers only pass positive powers
pub fn w_to_dbm(w: f64) -> f64 {
    10.0 * (w * 1000.0).log10()
}

/// Convert a gain or loss in dB to a linear ratio.
pub fn db_to_ratio(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// Convert a linear ratio to dB.
pub fn ratio_to_db(ratio: f64) -> f64 {
    10.0 * ratio.log10()
}

/// Receiver noise floor in watts for a channel of the given bandwidth.
///
/// # Formula
///
/// ```text
/// N = F × k × T₀ × B
/// ```
///
/// Where:
/// - `F`: noise figure as a linear ratio (non-idealities of the receiver)
/// - `k`: Boltzmann constant
/// - `T₀`: 290 K
/// - `B`: bandwidth in Hz
pub fn noise_floor_w(bandwidth_hz: u32, noise_figure_ratio: f64) -> f64 {
    let thermal = BOLTZMANN * NOISE_TEMPERATURE_K * bandwidth_hz as f64;
    noise_figure_ratio * thermal
}
