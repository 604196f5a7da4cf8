//! Real orthonormal spherical harmonics.
//!
//! Coefficients are stored for every degree `0 <= l <= bw` and order
//! `-l <= m <= l` at `l*l + l + m`. Basis functions carry the full `4 pi`
//! normalisation and no Condon-Shortley phase:
//!
//! * `m = 0`: `Pbar_l0(cos theta)`
//! * `m > 0`: `sqrt(2) Pbar_lm(cos theta) cos(m phi)`
//! * `m < 0`: `sqrt(2) Pbar_l|m|(cos theta) sin(|m| phi)`

use crate::common::constants::FOUR_PI;
use num_complex::Complex64;

pub fn coefficient_count(bandwidth: usize) -> usize {
    (bandwidth + 1) * (bandwidth + 1)
}

pub fn checked_coefficient_count(bandwidth: usize) -> Option<usize> {
    let side = bandwidth.checked_add(1)?;
    side.checked_mul(side)
}

/// Position of `(l, m)` in a coefficient buffer, `None` when `|m| > l`.
pub fn coefficient_index(degree: usize, order: isize) -> Option<usize> {
    if order.unsigned_abs() > degree {
        return None;
    }
    Some((degree * degree + degree).wrapping_add_signed(order))
}

pub fn legendre_table_len(bandwidth: usize) -> usize {
    (bandwidth + 1) * (bandwidth + 2) / 2
}

pub fn legendre_table_index(degree: usize, order: usize) -> usize {
    debug_assert!(order <= degree);
    degree * (degree + 1) / 2 + order
}

/// Orthonormal associated Legendre values `Pbar_lm(x)` for `0 <= m <= l <= bw`.
pub fn legendre_table(bandwidth: usize, x: f64) -> Vec<f64> {
    let mut table = vec![0.0; legendre_table_len(bandwidth)];
    fill_legendre_table(bandwidth, x, &mut table);
    table
}

/// In-place variant of [`legendre_table`]; `table` must hold
/// [`legendre_table_len`] values.
pub fn fill_legendre_table(bandwidth: usize, x: f64, table: &mut [f64]) {
    assert_eq!(
        table.len(),
        legendre_table_len(bandwidth),
        "legendre table length must match bandwidth"
    );

    let sine = (1.0 - x * x).max(0.0).sqrt();
    let mut p_mm = (1.0 / FOUR_PI).sqrt();
    for order in 0..=bandwidth {
        if order > 0 {
            let m = order as f64;
            p_mm *= ((2.0 * m + 1.0) / (2.0 * m)).sqrt() * sine;
        }
        table[legendre_table_index(order, order)] = p_mm;
        if order == bandwidth {
            break;
        }

        let mut p_lm2 = p_mm;
        let mut p_lm1 = (2.0 * order as f64 + 3.0).sqrt() * x * p_mm;
        table[legendre_table_index(order + 1, order)] = p_lm1;

        for degree in (order + 2)..=bandwidth {
            let l = degree as f64;
            let m = order as f64;
            let previous = l - 1.0;
            let a = ((4.0 * l * l - 1.0) / (l * l - m * m)).sqrt();
            let b = ((previous * previous - m * m) / (4.0 * previous * previous - 1.0)).sqrt();
            let p_lm = a * (x * p_lm1 - b * p_lm2);
            table[legendre_table_index(degree, order)] = p_lm;
            p_lm2 = p_lm1;
            p_lm1 = p_lm;
        }
    }
}

/// Evaluates one real harmonic at `(theta, phi)`; `None` unless `|m| <= l`.
pub fn real_y_lm(degree: i32, order: i32, theta: f64, phi: f64) -> Option<f64> {
    let degree = usize::try_from(degree).ok()?;
    let abs_order = order.unsigned_abs() as usize;
    if abs_order > degree {
        return None;
    }

    let table = legendre_table(degree, theta.cos());
    let p_lm = table[legendre_table_index(degree, abs_order)];

    Some(match order {
        0 => p_lm,
        order if order > 0 => std::f64::consts::SQRT_2 * p_lm * (order as f64 * phi).cos(),
        _ => std::f64::consts::SQRT_2 * p_lm * (abs_order as f64 * phi).sin(),
    })
}

/// Yields `(cos m phi, sin m phi)` for `m = 0, 1, 2, ...` by repeated rotation.
#[derive(Debug, Clone, Copy)]
pub struct AzimuthalRecurrence {
    rotation: Complex64,
    current: Complex64,
}

impl AzimuthalRecurrence {
    pub fn new(phi: f64) -> Self {
        Self {
            rotation: Complex64::from_polar(1.0, phi),
            current: Complex64::new(1.0, 0.0),
        }
    }
}

impl Iterator for AzimuthalRecurrence {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let value = (self.current.re, self.current.im);
        self.current *= self.rotation;
        Some(value)
    }
}
