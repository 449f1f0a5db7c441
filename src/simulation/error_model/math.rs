//! Numeric helpers shared by the error rate models.

/// Complementary error function.
///
/// Chebyshev fit from Numerical Recipes (`erfcc`), with a fractional error
/// below 1.2e-7 everywhere. Unlike `1 - erf(x)` it keeps its relative precision
/// in the far tail, where the bit error rates of high-SNR chunks live.
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98 + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let ans = t * (-z * z + poly).exp();
    if x >= 0.0 { ans } else { 2.0 - ans }
}

/// Largest n whose factorial fits in a `u64`.
const MAX_FACTORIAL: usize = 20;

/// Precomputed factorials for the binomial terms of the YANS model.
///
/// Owned by the model instance so independently configured models never
/// share state.
#[derive(Debug, Clone)]
pub struct FactorialTable {
    values: [u64; MAX_FACTORIAL + 1],
}

impl FactorialTable {
    pub fn new() -> Self {
        let mut values = [1u64; MAX_FACTORIAL + 1];
        for n in 1..=MAX_FACTORIAL {
            values[n] = values[n - 1] * n as u64;
        }
        Self { values }
    }

    /// `n!`, or `None` once it no longer fits in a `u64` (`n > 20`).
    pub fn factorial(&self, n: u32) -> Option<u64> {
        self.values.get(n as usize).copied()
    }

    /// Number of ways to choose `k` out of `n`, from the table. `None` when
    /// `n!` is out of the table's range.
    pub fn choose(&self, n: u32, k: u32) -> Option<u64> {
        if k > n {
            return Some(0);
        }
        Some(self.factorial(n)? / (self.factorial(k)? * self.factorial(n - k)?))
    }

    /// Probability of exactly `k` successes in `n` Bernoulli trials.
    ///
    /// ```text
    /// C(n, k) × p^k × (1 - p)^(n - k)
    /// ```
    ///
    /// Past the table the coefficient is built as a running product instead.
    pub fn binomial(&self, k: u32, p: f64, n: u32) -> f64 {
        if k > n {
            return 0.0;
        }
        let coefficient = match self.choose(n, k) {
            Some(c) => c as f64,
            None => {
                let m = k.min(n - k);
                (1..=m).fold(1.0, |acc, i| acc * f64::from(n - m + i) / f64::from(i))
            }
        };
        coefficient * p.powi(k as i32) * (1.0 - p).powi((n - k) as i32)
    }
}

impl Default for FactorialTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Probability that every one of `nbits` bits survives when each is lost with
/// probability `p`.
pub fn all_bits_survive(p: f64, nbits: u64) -> f64 {
    (1.0 - p).powf(nbits as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erfc_reference_values() {
        let cases = [
            (0.0, 1.0),
            (0.5, 0.479_500_122_186_953_5),
            (1.0, 0.157_299_207_050_285_1),
            (2.0, 0.004_677_734_981_047_266),
            (-1.0, 1.842_700_792_949_715),
            (5.0, 1.537_459_794_428_035e-12),
        ];
        for (x, expected) in cases {
            let got = erfc(x);
            assert!((got - expected).abs() / expected < 1.2e-7, "erfc({x}) = {got}, expected {expected}");
        }
    }

    #[test]
    fn erfc_underflows_to_zero() {
        assert_eq!(erfc(40.0), 0.0);
        assert_eq!(erfc(f64::INFINITY), 0.0);
    }

    #[test]
    fn factorials_and_binomials() {
        let table = FactorialTable::new();
        assert_eq!(table.factorial(0), Some(1));
        assert_eq!(table.factorial(5), Some(120));
        assert_eq!(table.factorial(20), Some(2_432_902_008_176_640_000));
        assert_eq!(table.choose(11, 5), Some(462));
        assert_eq!(table.choose(3, 4), Some(0));
        // Binomial pmf sums to one.
        let total: f64 = (0..=10).map(|k| table.binomial(k, 0.3, 10)).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn factorials_past_the_table_are_reported() {
        let table = FactorialTable::new();
        assert_eq!(table.factorial(21), None);
        assert_eq!(table.choose(30, 15), None);
        // C(30, 15) = 155117520, so p = 0.5 gives 155117520 / 2^30.
        let expected = 155_117_520.0 / 2f64.powi(30);
        assert!((table.binomial(15, 0.5, 30) - expected).abs() < 1e-15);
        assert_eq!(table.binomial(31, 0.5, 30), 0.0);
        let total: f64 = (0..=40).map(|k| table.binomial(k, 0.2, 40)).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn survival_of_no_bits_is_certain() {
        assert_eq!(all_bits_survive(0.5, 0), 1.0);
        assert_eq!(all_bits_survive(1.0, 0), 1.0);
        assert!((all_bits_survive(0.5, 2) - 0.25).abs() < 1e-15);
    }
}
