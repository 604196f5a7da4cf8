pub mod special;

pub use special::{
    AzimuthalRecurrence, GaussLegendreRule, QuadratureError, checked_coefficient_count,
    coefficient_count, coefficient_index, fill_legendre_table, gauss_legendre, legendre_table,
    legendre_table_index, legendre_table_len, real_y_lm,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct NumericTolerance {
    #[serde(rename = "absTol")]
    pub abs_tol: f64,
    #[serde(rename = "relTol")]
    pub rel_tol: f64,
    #[serde(rename = "relativeFloor")]
    pub relative_floor: f64,
}

impl NumericTolerance {
    pub fn accepts(&self, expected: f64, actual: f64) -> bool {
        self.accepts_scaled(expected, actual, expected.abs().max(actual.abs()))
    }

    /// Like [`accepts`](Self::accepts), with the relative bound taken against
    /// `scale` (floored at `relative_floor`) instead of the compared values.
    pub fn accepts_scaled(&self, expected: f64, actual: f64, scale: f64) -> bool {
        let difference = (expected - actual).abs();
        difference <= self.abs_tol
            || difference <= self.rel_tol * scale.abs().max(self.relative_floor)
    }
}

/// Documented accuracy of grid synthesis at `bandwidth`.
///
/// Relative error is bounded by `8 (bw + 1) eps` with respect to the sum of
/// term magnitudes; `relative_floor` keeps the bound meaningful for cells whose
/// value cancels to zero.
pub fn synthesis_tolerance(bandwidth: usize) -> NumericTolerance {
    let scaled_epsilon = 8.0 * (bandwidth as f64 + 1.0) * f64::EPSILON;
    NumericTolerance {
        abs_tol: scaled_epsilon,
        rel_tol: scaled_epsilon,
        relative_floor: 1.0,
    }
}

/// Kahan-compensated running sum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompensatedSum {
    sum: f64,
    correction: f64,
}

impl CompensatedSum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        let corrected = value - self.correction;
        let next = self.sum + corrected;
        self.correction = (next - self.sum) - corrected;
        self.sum = next;
    }

    pub fn value(&self) -> f64 {
        self.sum
    }
}

pub fn stable_weighted_sum(values: &[f64], weights: &[f64]) -> Option<f64> {
    if values.len() != weights.len() {
        return None;
    }

    let mut sum = CompensatedSum::new();
    for (&value, &weight) in values.iter().zip(weights) {
        sum.add(value * weight);
    }

    Some(sum.value())
}
