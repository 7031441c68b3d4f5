// =============================================================================
// Residual Normality: Shapiro-Wilk Test
// =============================================================================
//
// The robust fitting loop uses this as its convergence gate: once no
// detector flags an outlier, the residuals must also look normal, or the
// linear assumption is still violated and the worst-fitting point gets
// removed.
//
// The W statistic and p-value follow Royston's AS R94 approximation
// (valid for 3 <= n <= 5000):
//
//   1. coefficients a_i from Blom-approximated normal order statistics
//   2. W = (sum a_i * x_(i))^2 / sum (x_i - x_bar)^2
//   3. transform 1 - W to a z-score (log-normal for n > 11, gamma-shifted
//      log for n <= 11) and read the p-value off the standard normal
//
// References:
// - Shapiro & Wilk (1965), Biometrika 52(3-4), 591-611.
// - Royston (1995), Remark AS R94, Applied Statistics 44(4), 547-551.
//
// =============================================================================

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Result of the Shapiro-Wilk test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapiroWilk {
    /// The W statistic, in (0, 1]. Values near 1 suggest normality.
    pub statistic: f64,
    /// Small values reject the null hypothesis of normality.
    pub p_value: f64,
}

/// Run the Shapiro-Wilk test.
///
/// Returns `None` when the test is not computable: n outside 3..=5000,
/// non-finite values, or zero spread.
pub fn shapiro_wilk(data: &[f64]) -> Option<ShapiroWilk> {
    let n = data.len();
    if !(3..=5000).contains(&n) {
        return None;
    }
    if data.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut x: Vec<f64> = data.to_vec();
    x.sort_by(|a, b| a.partial_cmp(b).expect("finite values compare"));

    if x[n - 1] - x[0] < 1e-300 {
        return None; // zero spread
    }

    if n == 3 {
        return Some(shapiro_wilk_n3(&x));
    }

    let half = n / 2;
    let a = coefficients(n, half)?;
    let w = w_statistic(&x, &a, n, half);
    if !(0.0..=1.0 + 1e-10).contains(&w) {
        return None;
    }
    let w = w.min(1.0);

    Some(ShapiroWilk {
        statistic: w,
        p_value: p_value(w, n).clamp(0.0, 1.0),
    })
}

/// Normality gate for the robust fitting loop: true iff the residuals are
/// consistent with normality at significance `alpha`.
///
/// When the test is not computable (n out of range, zero residual spread,
/// non-finite input) the gate reports normal: an unassessable gate must
/// not drive removals.
pub fn residuals_normal(residuals: &[f64], alpha: f64) -> bool {
    match shapiro_wilk(residuals) {
        Some(result) => result.p_value > alpha,
        None => true,
    }
}

// =============================================================================
// Royston AS R94 internals
// =============================================================================

// Published polynomial coefficients from Royston (1992, 1995).
const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

// c[0] + c[1]*x + c[2]*x^2 + ... via Horner's method
fn poly(c: &[f64], x: f64) -> f64 {
    let mut acc = c[c.len() - 1];
    for i in (0..c.len() - 1).rev() {
        acc = acc * x + c[i];
    }
    acc
}

fn std_normal() -> Normal {
    Normal::new(0.0, 1.0).unwrap()
}

/// Exact small-sample case: a = [1/sqrt(2), 0, -1/sqrt(2)].
fn shapiro_wilk_n3(x: &[f64]) -> ShapiroWilk {
    let mean = (x[0] + x[1] + x[2]) / 3.0;
    let ss: f64 = x.iter().map(|&v| (v - mean) * (v - mean)).sum();
    let numerator = std::f64::consts::FRAC_1_SQRT_2 * (x[2] - x[0]);
    let w = ((numerator * numerator) / ss).clamp(0.75, 1.0);
    // Exact p-value for n = 3
    let p = 1.0 - (6.0 / std::f64::consts::PI) * w.sqrt().acos();
    ShapiroWilk {
        statistic: w,
        p_value: p.clamp(0.0, 1.0),
    }
}

/// Shapiro-Wilk coefficients from Blom-approximated normal order
/// statistics, with Royston's polynomial corrections for the first one or
/// two entries.
fn coefficients(n: usize, half: usize) -> Option<Vec<f64>> {
    let normal = std_normal();
    let nf = n as f64;

    let mut m = vec![0.0; half];
    let mut summ2 = 0.0;
    for (i, mi) in m.iter_mut().enumerate() {
        let p = (i as f64 + 1.0 - 0.375) / (nf + 0.25);
        *mi = normal.inverse_cdf(p);
        summ2 += *mi * *mi;
    }
    summ2 *= 2.0;
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / nf.sqrt();

    let a1 = poly(&C1, rsn) - m[0] / ssumm2;
    let mut a = vec![0.0; half];

    if n <= 5 {
        let fac_sq = summ2 - 2.0 * m[0] * m[0];
        let rem = 1.0 - 2.0 * a1 * a1;
        if fac_sq <= 0.0 || rem <= 0.0 {
            return None;
        }
        let fac = (fac_sq / rem).sqrt();
        a[0] = a1;
        for i in 1..half {
            a[i] = -m[i] / fac;
        }
    } else {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        let fac_sq = summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1];
        let rem = 1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2;
        if fac_sq <= 0.0 || rem <= 0.0 {
            return None;
        }
        let fac = (fac_sq / rem).sqrt();
        a[0] = a1;
        a[1] = a2;
        for i in 2..half {
            a[i] = -m[i] / fac;
        }
    }

    Some(a)
}

fn w_statistic(x: &[f64], a: &[f64], n: usize, half: usize) -> f64 {
    let mut sa = 0.0;
    for i in 0..half {
        sa += a[i] * (x[n - 1 - i] - x[i]);
    }

    let mean = x.iter().sum::<f64>() / n as f64;
    let ss: f64 = x.iter().map(|&v| (v - mean) * (v - mean)).sum();
    if ss < 1e-300 {
        return 1.0;
    }
    (sa * sa) / ss
}

fn p_value(w: f64, n: usize) -> f64 {
    let nf = n as f64;
    let w1 = 1.0 - w;
    if w1 <= 0.0 {
        return 1.0;
    }
    let y = w1.ln();
    let normal = std_normal();

    if n <= 11 {
        let gamma = poly(&G, nf);
        if y >= gamma {
            return 0.0;
        }
        let y2 = -(gamma - y).ln();
        let m = poly(&C3, nf);
        let s = poly(&C4, nf).exp();
        if s < 1e-300 {
            return 0.0;
        }
        1.0 - normal.cdf((y2 - m) / s)
    } else {
        let xx = nf.ln();
        let m = poly(&C5, xx);
        let s = poly(&C6, xx).exp();
        if s < 1e-300 {
            return 0.0;
        }
        1.0 - normal.cdf((y - m) / s)
    }
}

// =============================================================================
// Tests
// =============================================================================
