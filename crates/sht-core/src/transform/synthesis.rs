use super::cache::{LayoutTableCache, LayoutTables};
use super::layout::GridLayout;
use crate::domain::{ExecutionMode, Hemisphere, ShtError, ShtResult, SynthesisResult};
use crate::numerics::{
    AzimuthalRecurrence, CompensatedSum, checked_coefficient_count, legendre_table_index,
    stable_weighted_sum,
};
use rayon::prelude::*;
use std::f64::consts::SQRT_2;
use tracing::debug;

pub trait HarmonicSynthesisApi {
    fn synthesize(
        &self,
        coefficients: &[f64],
        bandwidth: usize,
        layout: &dyn GridLayout,
    ) -> SynthesisResult<HemisphereGrids>;
}

/// North and south hemisphere grids, each `dimension x dimension`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct HemisphereGrids {
    dimension: usize,
    north: Vec<f64>,
    south: Vec<f64>,
}

impl HemisphereGrids {
    pub fn zeros(dimension: usize) -> Self {
        Self {
            dimension,
            north: vec![0.0; dimension * dimension],
            south: vec![0.0; dimension * dimension],
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn north(&self) -> &[f64] {
        &self.north
    }

    pub fn south(&self) -> &[f64] {
        &self.south
    }

    pub fn hemisphere(&self, hemisphere: Hemisphere) -> &[f64] {
        match hemisphere {
            Hemisphere::North => &self.north,
            Hemisphere::South => &self.south,
        }
    }

    pub fn value(&self, hemisphere: Hemisphere, row: usize, col: usize) -> Option<f64> {
        if row >= self.dimension || col >= self.dimension {
            return None;
        }
        Some(self.hemisphere(hemisphere)[row * self.dimension + col])
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.north, self.south)
    }

    /// Joint minimum and maximum over both hemispheres, ignoring NaN.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.north
            .iter()
            .chain(&self.south)
            .copied()
            .filter(|value| !value.is_nan())
            .fold(None, |range, value| match range {
                None => Some((value, value)),
                Some((min, max)) => Some((min.min(value), max.max(value))),
            })
    }

    /// `sum(w * (north + south))` over all cells for per-cell `weights`.
    ///
    /// With [`GridLayout::solid_angle_weights`] this approximates the integral
    /// over the sphere; for the Legendre layout it is exact for the
    /// synthesized band-limited field.
    pub fn weighted_sum(&self, weights: &[f64]) -> Option<f64> {
        let north = stable_weighted_sum(&self.north, weights)?;
        let south = stable_weighted_sum(&self.south, weights)?;
        Some(north + south)
    }
}

/// Evaluates real spherical-harmonic series on hemisphere grids.
#[derive(Debug, Default)]
pub struct DiscreteHarmonicSynthesizer {
    cache: LayoutTableCache,
    execution_mode: ExecutionMode,
}

impl DiscreteHarmonicSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_execution_mode(execution_mode: ExecutionMode) -> Self {
        Self {
            cache: LayoutTableCache::new(),
            execution_mode,
        }
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }

    pub fn cache(&self) -> &LayoutTableCache {
        &self.cache
    }

    pub fn synthesize(
        &self,
        coefficients: &[f64],
        bandwidth: usize,
        layout: &dyn GridLayout,
    ) -> SynthesisResult<HemisphereGrids> {
        validate_coefficients(coefficients, bandwidth)?;
        let tables = self.cache.tables(bandwidth, layout)?;
        let dimension = tables.dimension();
        debug!(
            bandwidth,
            dimension,
            layout = %layout.kind(),
            mode = ?self.execution_mode,
            "synthesizing hemisphere grids"
        );

        let mut grids = HemisphereGrids::zeros(dimension);
        let fill_row = |row: usize, north_row: &mut [f64], south_row: &mut [f64]| {
            for (col, (north, south)) in north_row.iter_mut().zip(south_row).enumerate() {
                (*north, *south) = evaluate_cell(coefficients, &tables, row, col);
            }
        };

        match self.execution_mode {
            ExecutionMode::Serial => grids
                .north
                .chunks_mut(dimension)
                .zip(grids.south.chunks_mut(dimension))
                .enumerate()
                .for_each(|(row, (north_row, south_row))| fill_row(row, north_row, south_row)),
            ExecutionMode::Parallel => grids
                .north
                .par_chunks_mut(dimension)
                .zip(grids.south.par_chunks_mut(dimension))
                .enumerate()
                .for_each(|(row, (north_row, south_row))| fill_row(row, north_row, south_row)),
        }

        Ok(grids)
    }
}

impl HarmonicSynthesisApi for DiscreteHarmonicSynthesizer {
    fn synthesize(
        &self,
        coefficients: &[f64],
        bandwidth: usize,
        layout: &dyn GridLayout,
    ) -> SynthesisResult<HemisphereGrids> {
        DiscreteHarmonicSynthesizer::synthesize(self, coefficients, bandwidth, layout)
    }
}

pub fn validate_coefficients(coefficients: &[f64], bandwidth: usize) -> ShtResult<()> {
    let expected = checked_coefficient_count(bandwidth).ok_or_else(|| {
        ShtError::shape(
            "SHAPE.BANDWIDTH",
            format!("bandwidth {bandwidth} overflows the coefficient count"),
        )
    })?;
    if coefficients.len() != expected {
        return Err(ShtError::shape(
            "SHAPE.COEFFICIENTS",
            format!(
                "bandwidth {} requires {} coefficients, got {}",
                bandwidth,
                expected,
                coefficients.len()
            ),
        ));
    }
    Ok(())
}

/// Returns `(north, south)` for one cell.
///
/// Terms with even `l + m` are symmetric about the equator and odd ones
/// antisymmetric, so both hemispheres come out of the same partial sums.
fn evaluate_cell(
    coefficients: &[f64],
    tables: &LayoutTables,
    row: usize,
    col: usize,
) -> (f64, f64) {
    let bandwidth = tables.bandwidth();
    let (ring, azimuth) = tables.cell(row, col);
    let legendre = tables.ring_legendre(ring);

    let mut north = CompensatedSum::new();
    let mut south = CompensatedSum::new();
    let azimuthal = AzimuthalRecurrence::new(azimuth).take(bandwidth + 1);
    for (order, (cosine, sine)) in azimuthal.enumerate() {
        let mut even_cos = 0.0;
        let mut odd_cos = 0.0;
        let mut even_sin = 0.0;
        let mut odd_sin = 0.0;

        for degree in order..=bandwidth {
            let p_lm = legendre[legendre_table_index(degree, order)];
            let center = degree * degree + degree;
            let cos_term = coefficients[center + order] * p_lm;
            let sin_term = if order == 0 {
                0.0
            } else {
                coefficients[center - order] * p_lm
            };

            if (degree + order) % 2 == 0 {
                even_cos += cos_term;
                even_sin += sin_term;
            } else {
                odd_cos += cos_term;
                odd_sin += sin_term;
            }
        }

        let scale = if order == 0 { 1.0 } else { SQRT_2 };
        let even = scale * (even_cos * cosine + even_sin * sine);
        let odd = scale * (odd_cos * cosine + odd_sin * sine);
        north.add(even + odd);
        south.add(even - odd);
    }

    (north.value(), south.value())
}

#[cfg(test)]
mod tests {
    use super::{DiscreteHarmonicSynthesizer, HarmonicSynthesisApi, HemisphereGrids};
    use crate::common::constants::FOUR_PI;
    use crate::domain::{ExecutionMode, Hemisphere, ShtErrorCategory};
    use crate::numerics::{coefficient_count, coefficient_index, real_y_lm, synthesis_tolerance};
    use crate::transform::layout::{
        EqualAreaLayout, GridLayout, GridLayoutKind, LegendreLayout, grid_dimension,
    };

    fn pseudo_random_coefficients(bandwidth: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..coefficient_count(bandwidth))
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                ((state >> 11) as f64 / (1_u64 << 53) as f64) - 0.5
            })
            .collect()
    }

    #[test]
    fn mismatched_coefficient_length_is_a_shape_error() {
        let synthesizer = DiscreteHarmonicSynthesizer::new();
        let error = synthesizer
            .synthesize(&[0.0; 8], 2, &LegendreLayout)
            .expect_err("8 coefficients cannot describe bandwidth 2");
        assert_eq!(error.category(), ShtErrorCategory::ShapeError);
        assert_eq!(error.placeholder(), "SHAPE.COEFFICIENTS");
        assert_eq!(synthesizer.cache().builds(), 0);
    }

    #[test]
    fn zero_coefficients_synthesize_zero_grids_for_bandwidth_58() {
        let synthesizer = DiscreteHarmonicSynthesizer::new();
        let coefficients = vec![0.0; coefficient_count(58)];
        for kind in [GridLayoutKind::EqualArea, GridLayoutKind::Legendre] {
            let grids = synthesizer
                .synthesize(&coefficients, 58, kind.layout())
                .expect("synthesis");
            assert_eq!(grids.dimension(), 61);
            assert_eq!(grids.north().len(), 61 * 61);
            assert_eq!(grids.south().len(), 61 * 61);
            assert!(grids.north().iter().all(|&value| value == 0.0));
            assert!(grids.south().iter().all(|&value| value == 0.0));
        }
    }

    #[test]
    fn constant_term_is_isotropic_on_both_hemispheres() {
        let synthesizer = DiscreteHarmonicSynthesizer::new();
        let mut coefficients = vec![0.0; coefficient_count(5)];
        coefficients[0] = 2.0;
        let expected = 2.0 / FOUR_PI.sqrt();

        for layout in [&EqualAreaLayout as &dyn GridLayout, &LegendreLayout] {
            let grids = synthesizer
                .synthesize(&coefficients, 5, layout)
                .expect("synthesis");
            for &value in grids.north().iter().chain(grids.south()) {
                assert!((value - expected).abs() < 1.0e-14);
            }
        }
    }

    #[test]
    fn dipole_term_flips_sign_between_hemispheres() {
        let synthesizer = DiscreteHarmonicSynthesizer::new();
        let bandwidth = 4;
        let mut coefficients = vec![0.0; coefficient_count(bandwidth)];
        coefficients[coefficient_index(1, 0).expect("index")] = 1.0;
        let grids = synthesizer
            .synthesize(&coefficients, bandwidth, &LegendreLayout)
            .expect("synthesis");

        let dimension = grid_dimension(bandwidth);
        let cosines = LegendreLayout.ring_cosines(dimension).expect("cosines");
        let amplitude = (3.0 / FOUR_PI).sqrt();
        for (row, cosine) in cosines.iter().enumerate() {
            for col in 0..dimension {
                let north = grids.value(Hemisphere::North, row, col).expect("cell");
                let south = grids.value(Hemisphere::South, row, col).expect("cell");
                assert!((north - amplitude * cosine).abs() < 1.0e-14);
                assert!((south + amplitude * cosine).abs() < 1.0e-14);
            }
        }
    }

    #[test]
    fn grids_match_direct_basis_summation() {
        let synthesizer = DiscreteHarmonicSynthesizer::new();
        let bandwidth = 9;
        let coefficients = pseudo_random_coefficients(bandwidth, 7);
        let tolerance = synthesis_tolerance(bandwidth);

        for kind in [GridLayoutKind::EqualArea, GridLayoutKind::Legendre] {
            let layout = kind.layout();
            let grids = synthesizer
                .synthesize(&coefficients, bandwidth, layout)
                .expect("synthesis");
            let dimension = grids.dimension();

            for row in 0..dimension {
                for col in 0..dimension {
                    let sample = layout.sample(row, col, dimension).expect("sample");
                    for hemisphere in [Hemisphere::North, Hemisphere::South] {
                        let theta = hemisphere.colatitude(sample.colatitude);
                        let mut expected = 0.0;
                        let mut magnitude = 0.0;
                        for degree in 0..=bandwidth as i32 {
                            for order in -degree..=degree {
                                let index = coefficient_index(degree as usize, order as isize)
                                    .expect("index");
                                let basis = real_y_lm(degree, order, theta, sample.azimuth)
                                    .expect("basis");
                                let term = coefficients[index] * basis;
                                expected += term;
                                magnitude += term.abs();
                            }
                        }
                        let actual = grids.value(hemisphere, row, col).expect("cell");
                        // The reference sum carries its own rounding error.
                        assert!(
                            tolerance.accepts_scaled(expected, actual, 4.0 * magnitude),
                            "{kind} {hemisphere} ({row},{col}) expected={expected} actual={actual}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn synthesis_is_linear_in_the_coefficients() {
        let synthesizer = DiscreteHarmonicSynthesizer::new();
        let bandwidth = 12;
        let first = pseudo_random_coefficients(bandwidth, 1);
        let second = pseudo_random_coefficients(bandwidth, 2);
        let (a, b) = (1.75, -0.4);
        let combined: Vec<f64> = first
            .iter()
            .zip(&second)
            .map(|(lhs, rhs)| a * lhs + b * rhs)
            .collect();

        let layout = &EqualAreaLayout;
        let grids_first = synthesizer.synthesize(&first, bandwidth, layout).expect("first");
        let grids_second = synthesizer.synthesize(&second, bandwidth, layout).expect("second");
        let grids_combined = synthesizer
            .synthesize(&combined, bandwidth, layout)
            .expect("combined");

        for hemisphere in [Hemisphere::North, Hemisphere::South] {
            let expected = grids_first
                .hemisphere(hemisphere)
                .iter()
                .zip(grids_second.hemisphere(hemisphere))
                .map(|(lhs, rhs)| a * lhs + b * rhs);
            for (expected, &actual) in expected.zip(grids_combined.hemisphere(hemisphere)) {
                assert!((expected - actual).abs() < 1.0e-12);
            }
        }
    }

    #[test]
    fn layouts_share_shape_but_sample_differently() {
        let synthesizer = DiscreteHarmonicSynthesizer::new();
        let bandwidth = 7;
        let coefficients = pseudo_random_coefficients(bandwidth, 11);
        let equal_area = synthesizer
            .synthesize(&coefficients, bandwidth, &EqualAreaLayout)
            .expect("equal-area");
        let legendre = synthesizer
            .synthesize(&coefficients, bandwidth, &LegendreLayout)
            .expect("legendre");

        assert_eq!(equal_area.dimension(), legendre.dimension());
        assert_eq!(equal_area.north().len(), legendre.north().len());
        assert_ne!(equal_area.north(), legendre.north());
    }

    #[test]
    fn serial_and_parallel_modes_agree_bit_for_bit() {
        let bandwidth = 16;
        let coefficients = pseudo_random_coefficients(bandwidth, 5);
        let serial = DiscreteHarmonicSynthesizer::with_execution_mode(ExecutionMode::Serial)
            .synthesize(&coefficients, bandwidth, &LegendreLayout)
            .expect("serial");
        let parallel = DiscreteHarmonicSynthesizer::with_execution_mode(ExecutionMode::Parallel)
            .synthesize(&coefficients, bandwidth, &LegendreLayout)
            .expect("parallel");
        assert_eq!(serial, parallel);
    }

    #[test]
    fn legendre_weights_integrate_the_monopole_exactly() {
        let synthesizer = DiscreteHarmonicSynthesizer::new();
        let bandwidth = 10;
        let coefficients = pseudo_random_coefficients(bandwidth, 3);
        let grids = synthesizer
            .synthesize(&coefficients, bandwidth, &LegendreLayout)
            .expect("synthesis");
        let weights = LegendreLayout
            .solid_angle_weights(grids.dimension())
            .expect("weights");

        let integral = grids.weighted_sum(&weights).expect("integral");
        let expected = FOUR_PI.sqrt() * coefficients[0];
        assert!(
            (integral - expected).abs() < 1.0e-12,
            "expected={expected} actual={integral}"
        );
        assert_eq!(grids.weighted_sum(&weights[1..]), None);
    }

    #[test]
    fn trait_seam_forwards_to_the_synthesizer_and_reuses_tables() {
        let synthesizer = DiscreteHarmonicSynthesizer::new();
        let api: &dyn HarmonicSynthesisApi = &synthesizer;
        let coefficients = pseudo_random_coefficients(3, 9);
        let first = api.synthesize(&coefficients, 3, &LegendreLayout).expect("first");
        let second = api.synthesize(&coefficients, 3, &LegendreLayout).expect("second");
        assert_eq!(first, second);
        assert_eq!(synthesizer.cache().builds(), 1);
    }

    #[test]
    fn min_max_spans_both_hemispheres() {
        let mut grids = HemisphereGrids::zeros(3);
        assert_eq!(grids.min_max(), Some((0.0, 0.0)));
        grids.north[4] = 2.5;
        grids.south[0] = -1.0;
        grids.south[1] = f64::NAN;
        assert_eq!(grids.min_max(), Some((-1.0, 2.5)));
        assert_eq!(HemisphereGrids::zeros(0).min_max(), None);
        assert_eq!(grids.value(Hemisphere::North, 3, 0), None);
    }
}
