//! Pluggable signal propagation.
//!
//! The interference model only needs two things from propagation physics: the
//! received power at a distance, and the inverse (how far a signal reaches
//! before it drops to a given power). Anything implementing
//! [`PropagationLossModel`] can be plugged into the tracker.

use std::f64::consts::PI;

/// Speed of light in m/s.
const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Distance-based path loss with an inverse.
pub trait PropagationLossModel {
    /// Received power in dBm at `distance` meters from a transmitter sending
    /// with `tx_power_dbm`.
    fn rx_power_dbm(&self, tx_power_dbm: f64, distance: f64) -> f64;

    /// Largest distance at which a transmitter with `tx_power_dbm` still
    /// delivers at least `rx_power_dbm`.
    fn distance(&self, tx_power_dbm: f64, rx_power_dbm: f64) -> f64;
}

/// Log-distance path loss model.
///
/// # Formula
///
/// ```text
/// PL(d) = PL(d₀) + 10 × n × log₁₀(d/d₀)      for d > d₀
/// PL(d) = PL(d₀)                             for d ≤ d₀
/// ```
///
/// There is no shadowing term. The interference tracker adds a signal's power
/// when it starts and subtracts it when it ends, so repeated evaluations for
/// the same geometry must agree exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct LogDistancePropagationLossModel {
    /// Path loss exponent (n). 2.0 for free space, 2.7-3.5 for urban areas.
    pub exponent: f64,
    /// Reference distance d₀ in meters.
    pub reference_distance: f64,
    /// Path loss at the reference distance in dB.
    pub reference_loss: f64,
}

impl LogDistancePropagationLossModel {
    pub const DEFAULT_EXPONENT: f64 = 3.0;
    pub const DEFAULT_REFERENCE_DISTANCE: f64 = 1.0;
    /// Friis loss at 1 m for a 5.15 GHz carrier.
    pub const DEFAULT_REFERENCE_LOSS: f64 = 46.6777;

    pub fn new(exponent: f64, reference_distance: f64, reference_loss: f64) -> Self {
        Self {
            exponent,
            reference_distance,
            reference_loss,
        }
    }

    /// Build a model whose reference loss is the free-space (Friis) loss of
    /// `frequency_hz` at the reference distance.
    pub fn for_frequency(frequency_hz: f64, exponent: f64, reference_distance: f64) -> Self {
        Self::new(exponent, reference_distance, friis_loss_db(frequency_hz, reference_distance))
    }
}

impl Default for LogDistancePropagationLossModel {
    fn default() -> Self {
        Self::new(Self::DEFAULT_EXPONENT, Self::DEFAULT_REFERENCE_DISTANCE, Self::DEFAULT_REFERENCE_LOSS)
    }
}

impl PropagationLossModel for LogDistancePropagationLossModel {
    fn rx_power_dbm(&self, tx_power_dbm: f64, distance: f64) -> f64 {
        if distance <= self.reference_distance {
            return tx_power_dbm - self.reference_loss;
        }
        let path_loss = 10.0 * self.exponent * (distance / self.reference_distance).log10();
        tx_power_dbm - self.reference_loss - path_loss
    }

    // Solving rx = tx - PL(d0) - 10 n log10(d/d0) for d:
    //   d = d0 * 10^((tx - rx - PL(d0)) / (10 n))
    fn distance(&self, tx_power_dbm: f64, rx_power_dbm: f64) -> f64 {
        let numerator = tx_power_dbm - rx_power_dbm - self.reference_loss;
        if numerator < 0.0 {
            // Even at the reference distance the signal is below the target.
            return 0.0;
        }
        self.reference_distance * 10f64.powf(numerator / (10.0 * self.exponent))
    }
}

/// Free-space path loss in dB at `distance` meters for a carrier of `frequency_hz`.
///
/// ```text
/// L = 20 × log₁₀(4π d / λ),  λ = c / f
/// ```
pub fn friis_loss_db(frequency_hz: f64, distance: f64) -> f64 {
    let lambda = SPEED_OF_LIGHT / frequency_hz;
    20.0 * (4.0 * PI * distance / lambda).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_loss_applies_inside_reference_distance() {
        let m = LogDistancePropagationLossModel::default();
        assert_eq!(m.rx_power_dbm(16.0, 0.0), 16.0 - 46.6777);
        assert_eq!(m.rx_power_dbm(16.0, 1.0), 16.0 - 46.6777);
    }

    #[test]
    fn loss_grows_by_ten_n_per_decade() {
        let m = LogDistancePropagationLossModel::default();
        let at10 = m.rx_power_dbm(0.0, 10.0);
        let at100 = m.rx_power_dbm(0.0, 100.0);
        assert!((at10 - at100 - 30.0).abs() < 1e-9);
    }

    #[test]
    fn distance_inverts_rx_power() {
        let m = LogDistancePropagationLossModel::default();
        for d in [2.0, 37.5, 400.0, 12_000.0] {
            let rx = m.rx_power_dbm(20.0, d);
            assert!((m.distance(20.0, rx) - d).abs() / d < 1e-9);
        }
    }

    #[test]
    fn unreachable_target_gives_zero_distance() {
        let m = LogDistancePropagationLossModel::default();
        assert_eq!(m.distance(0.0, 0.0), 0.0);
    }

    #[test]
    fn distance_monotonic_with_tx_power() {
        let m = LogDistancePropagationLossModel::default();
        let low = m.distance(0.0, -120.0);
        let mid = m.distance(10.0, -120.0);
        let high = m.distance(20.0, -120.0);
        assert!(low < mid && mid < high);
    }

    #[test]
    fn friis_matches_default_reference_loss() {
        let loss = friis_loss_db(5.15e9, 1.0);
        assert!((loss - LogDistancePropagationLossModel::DEFAULT_REFERENCE_LOSS).abs() < 0.01);
        let m = LogDistancePropagationLossModel::for_frequency(5.15e9, 3.0, 1.0);
        assert!((m.reference_loss - loss).abs() < 1e-12);
    }
}
