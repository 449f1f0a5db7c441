//! Frame success rate curves in gnuplot format.
//!
//! For each validation mode the chunk success rate of a whole frame is sampled
//! over an SNR sweep. The output is a self-contained gnuplot script: a header
//! followed by one inline data block per mode, each terminated by `e`.

use std::io::Write;

use super::ErrorRateModel;
use crate::simulation::mode::WifiMode;
use crate::simulation::signal_calculations::db_to_ratio;

/// 802.11b and 802.11a rates, in plot order.
pub const VALIDATION_MODES: [WifiMode; 12] = [
    WifiMode::DSSS_1MBPS,
    WifiMode::DSSS_2MBPS,
    WifiMode::DSSS_5_5MBPS,
    WifiMode::DSSS_11MBPS,
    WifiMode::OFDM_6MBPS,
    WifiMode::OFDM_9MBPS,
    WifiMode::OFDM_12MBPS,
    WifiMode::OFDM_18MBPS,
    WifiMode::OFDM_24MBPS,
    WifiMode::OFDM_36MBPS,
    WifiMode::OFDM_48MBPS,
    WifiMode::OFDM_54MBPS,
];

#[derive(Debug, Clone, PartialEq)]
pub struct CurveSettings {
    pub frame_size_bytes: u32,
    /// Lowest SNR in dB (inclusive).
    pub min_snr_db: f64,
    /// Highest SNR in dB (exclusive).
    pub max_snr_db: f64,
    pub step_db: f64,
}

impl Default for CurveSettings {
    fn default() -> Self {
        Self {
            frame_size_bytes: 2000,
            min_snr_db: -5.0,
            max_snr_db: 30.0,
            step_db: 0.01,
        }
    }
}

impl CurveSettings {
    /// SNR sample points in dB. Computed from an index so that small steps do
    /// not accumulate rounding drift.
    pub fn snr_points_db(&self) -> impl Iterator<Item = f64> + '_ {
        let steps = if self.step_db > 0.0 {
            ((self.max_snr_db - self.min_snr_db) / self.step_db).ceil().max(0.0) as u64
        } else {
            0
        };
        (0..steps)
            .map(|i| self.min_snr_db + i as f64 * self.step_db)
            .filter(|snr| *snr < self.max_snr_db)
    }
}

fn write_header<W: Write>(description: &str, settings: &CurveSettings, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "set terminal postscript eps color enh \"Times-BoldItalic\"")?;
    writeln!(out, "set output '{}.eps'", description)?;
    writeln!(out, "set xlabel 'SNR(dB)'")?;
    writeln!(out, "set ylabel 'Frame Success Rate'")?;
    writeln!(out, "set xrange [{}:{}]", settings.min_snr_db, settings.max_snr_db)?;
    writeln!(out, "set yrange [0:1.2]")?;
    for line in 1..=VALIDATION_MODES.len() {
        writeln!(out, "set style line {} linewidth 5", line)?;
    }
    writeln!(out, "set style increment user")?;
    let plots: Vec<String> = VALIDATION_MODES
        .iter()
        .map(|m| format!("'-'  title '{}' with lines", m.name()))
        .collect();
    writeln!(out, "plot {}", plots.join(", "))
}

/// Write the curves of `model` as a gnuplot script titled `description`.
pub fn write_frame_success_curves<W: Write>(
    model: &ErrorRateModel,
    description: &str,
    settings: &CurveSettings,
    out: &mut W,
) -> anyhow::Result<()> {
    write_header(description, settings, out)?;
    let nbits = u64::from(settings.frame_size_bytes) * 8;
    for mode in &VALIDATION_MODES {
        log::debug!("Sampling {} with the {} model", mode.name(), model.kind().name());
        for snr_db in settings.snr_points_db() {
            let rate = model.chunk_success_rate(mode, db_to_ratio(snr_db), nbits)?;
            writeln!(out, "{} {}", snr_db, rate)?;
        }
        writeln!(out, "e")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coarse() -> CurveSettings {
        CurveSettings {
            step_db: 1.0,
            ..CurveSettings::default()
        }
    }

    #[test]
    fn sweep_excludes_upper_bound() {
        let points: Vec<f64> = coarse().snr_points_db().collect();
        assert_eq!(points.len(), 35);
        assert_eq!(points[0], -5.0);
        assert_eq!(points[34], 29.0);
        assert_eq!(CurveSettings::default().snr_points_db().count(), 3500);
    }

    #[test]
    fn non_positive_step_yields_nothing() {
        let settings = CurveSettings {
            step_db: 0.0,
            ..CurveSettings::default()
        };
        assert_eq!(settings.snr_points_db().count(), 0);
    }

    #[test]
    fn gnuplot_output_has_one_block_per_mode() {
        for model in [ErrorRateModel::nist(), ErrorRateModel::yans()] {
            let mut out = Vec::new();
            write_frame_success_curves(&model, "nist-frame-success-rate", &coarse(), &mut out).unwrap();
            let text = String::from_utf8(out).unwrap();
            let lines: Vec<&str> = text.lines().collect();

            assert_eq!(lines[0], "set terminal postscript eps color enh \"Times-BoldItalic\"");
            assert_eq!(lines[1], "set output 'nist-frame-success-rate.eps'");
            assert!(lines.iter().any(|l| l.starts_with("plot '-'  title 'DsssRate1Mbps' with lines")));
            assert_eq!(lines.iter().filter(|l| **l == "e").count(), 12);

            let samples: Vec<f64> = lines
                .iter()
                .filter_map(|l| l.split_once(' '))
                .filter_map(|(snr, rate)| Some((snr.parse::<f64>().ok()?, rate.parse::<f64>().ok()?)))
                .map(|(_, rate)| rate)
                .collect();
            assert_eq!(samples.len(), 12 * 35);
            assert!(samples.iter().all(|r| (0.0..=1.0).contains(r)));
        }
    }

    #[test]
    fn curves_rise_with_snr() {
        let model = ErrorRateModel::nist();
        let settings = coarse();
        let nbits = u64::from(settings.frame_size_bytes) * 8;
        for mode in &VALIDATION_MODES {
            let rates: Vec<f64> = settings
                .snr_points_db()
                .map(|snr| model.chunk_success_rate(mode, db_to_ratio(snr), nbits).unwrap())
                .collect();
            assert!(rates.windows(2).all(|w| w[1] + 1e-12 >= w[0]), "{}", mode.name());
            assert!(rates[rates.len() - 1] > 0.99, "{}", mode.name());
        }
    }
}
