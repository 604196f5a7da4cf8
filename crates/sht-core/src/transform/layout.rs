use crate::common::constants::{HALF_PI, HEMISPHERE_SOLID_ANGLE, PI, PI2, QUARTER_PI};
use crate::domain::{ShtError, ShtResult};
use crate::numerics::gauss_legendre;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// Side length of the square hemisphere grid used for a given bandwidth.
///
/// Always odd: `bw + 3` for even `bw`, `bw + 2` for odd `bw`.
pub const fn grid_dimension(bandwidth: usize) -> usize {
    if bandwidth % 2 == 0 {
        bandwidth + 3
    } else {
        bandwidth + 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalCoordinate {
    pub colatitude: f64,
    pub azimuth: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GridLayoutKind {
    EqualArea,
    Legendre,
}

impl GridLayoutKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EqualArea => "square lambert",
            Self::Legendre => "square legendre",
        }
    }

    /// Tag stored in simulation metadata (`1` equal-area, `2` Legendre).
    pub const fn lat_grid_type(self) -> i32 {
        match self {
            Self::EqualArea => 1,
            Self::Legendre => 2,
        }
    }

    pub const fn from_lat_grid_type(tag: i32) -> Option<Self> {
        match tag {
            1 => Some(Self::EqualArea),
            2 => Some(Self::Legendre),
            _ => None,
        }
    }

    pub fn layout(self) -> &'static dyn GridLayout {
        match self {
            Self::EqualArea => &EqualAreaLayout,
            Self::Legendre => &LegendreLayout,
        }
    }
}

impl Display for GridLayoutKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Maps square grid cells of one hemisphere onto the sphere.
///
/// Cells sharing a colatitude form a ring; the synthesizer evaluates the
/// Legendre part once per ring. All coordinates describe the north
/// hemisphere, the south hemisphere mirrors them through the equator.
pub trait GridLayout: Send + Sync + Debug {
    fn kind(&self) -> GridLayoutKind;

    /// Key under which layout tables are cached. Layouts that place cells
    /// differently must return different ids, even when they share a `kind`.
    fn cache_id(&self) -> &'static str;

    fn ring_count(&self, dimension: usize) -> usize;

    fn ring_index(&self, row: usize, col: usize, dimension: usize) -> usize;

    /// `cos(colatitude)` of every ring, all in `[0, 1]`.
    fn ring_cosines(&self, dimension: usize) -> ShtResult<Vec<f64>>;

    fn azimuth(&self, row: usize, col: usize, dimension: usize) -> f64;

    /// Solid angle attributed to each cell, row-major, summing to `2 pi`.
    fn solid_angle_weights(&self, dimension: usize) -> ShtResult<Vec<f64>>;

    fn sample(&self, row: usize, col: usize, dimension: usize) -> ShtResult<SphericalCoordinate> {
        validate_cell(row, col, dimension)?;
        let cosines = self.ring_cosines(dimension)?;
        let cosine = cosines[self.ring_index(row, col, dimension)];
        Ok(SphericalCoordinate {
            colatitude: cosine.clamp(-1.0, 1.0).acos(),
            azimuth: self.azimuth(row, col, dimension),
        })
    }
}

pub fn validate_dimension(dimension: usize) -> ShtResult<()> {
    if dimension % 2 == 0 {
        return Err(ShtError::input_validation(
            "INPUT.GRID_DIMENSION",
            format!("hemisphere grid dimension must be odd, got {dimension}"),
        ));
    }
    Ok(())
}

fn validate_cell(row: usize, col: usize, dimension: usize) -> ShtResult<()> {
    validate_dimension(dimension)?;
    if row >= dimension || col >= dimension {
        return Err(ShtError::input_validation(
            "INPUT.GRID_CELL",
            format!("cell ({row}, {col}) lies outside a {dimension}x{dimension} grid"),
        ));
    }
    Ok(())
}

/// Concentric square-to-hemisphere equal-area map.
///
/// The centre cell is the pole and the square boundary is the equator; ring
/// `k` (Chebyshev distance from the centre) sits at `cos theta = 1 - (k/c)^2`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EqualAreaLayout;

impl EqualAreaLayout {
    fn half_width(dimension: usize) -> usize {
        dimension.saturating_sub(1) / 2
    }
}

impl GridLayout for EqualAreaLayout {
    fn kind(&self) -> GridLayoutKind {
        GridLayoutKind::EqualArea
    }

    fn cache_id(&self) -> &'static str {
        "equal-area"
    }

    fn ring_count(&self, dimension: usize) -> usize {
        Self::half_width(dimension) + 1
    }

    fn ring_index(&self, row: usize, col: usize, dimension: usize) -> usize {
        let center = Self::half_width(dimension);
        row.abs_diff(center).max(col.abs_diff(center))
    }

    fn ring_cosines(&self, dimension: usize) -> ShtResult<Vec<f64>> {
        validate_dimension(dimension)?;
        let center = Self::half_width(dimension);
        if center == 0 {
            return Ok(vec![1.0]);
        }

        Ok((0..=center)
            .map(|ring| {
                let radius = ring as f64 / center as f64;
                1.0 - radius * radius
            })
            .collect())
    }

    fn azimuth(&self, row: usize, col: usize, dimension: usize) -> f64 {
        let center = Self::half_width(dimension);
        if center == 0 || (row == center && col == center) {
            return 0.0;
        }

        let x = (col as f64 - center as f64) / center as f64;
        let y = (row as f64 - center as f64) / center as f64;
        let azimuth = if x.abs() >= y.abs() {
            let offset = if x < 0.0 { PI } else { 0.0 };
            QUARTER_PI * y / x + offset
        } else {
            let offset = if y < 0.0 { PI } else { 0.0 };
            HALF_PI - QUARTER_PI * x / y + offset
        };
        azimuth.rem_euclid(PI2)
    }

    fn solid_angle_weights(&self, dimension: usize) -> ShtResult<Vec<f64>> {
        validate_dimension(dimension)?;
        let cells = dimension * dimension;
        Ok(vec![HEMISPHERE_SOLID_ANGLE / cells as f64; cells])
    }
}

/// Rows at Gauss-Legendre abscissae in `cos theta`, columns uniform in azimuth.
///
/// Row `r` uses the `r`-th largest positive node of the order `2 * dim` rule,
/// so no row falls on the equator and the union of both hemispheres is a full
/// quadrature rule in `cos theta`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegendreLayout;

impl LegendreLayout {
    fn row_rule(dimension: usize) -> ShtResult<(Vec<f64>, Vec<f64>)> {
        validate_dimension(dimension)?;
        let rule = gauss_legendre(2 * dimension).map_err(|source| {
            ShtError::internal(
                "SYS.QUADRATURE",
                format!("failed to build {dimension}-row legendre grid: {source}"),
            )
        })?;
        Ok((
            rule.nodes()[..dimension].to_vec(),
            rule.weights()[..dimension].to_vec(),
        ))
    }
}

impl GridLayout for LegendreLayout {
    fn kind(&self) -> GridLayoutKind {
        GridLayoutKind::Legendre
    }

    fn cache_id(&self) -> &'static str {
        "legendre"
    }

    fn ring_count(&self, dimension: usize) -> usize {
        dimension
    }

    fn ring_index(&self, row: usize, _col: usize, _dimension: usize) -> usize {
        row
    }

    fn ring_cosines(&self, dimension: usize) -> ShtResult<Vec<f64>> {
        Self::row_rule(dimension).map(|(nodes, _)| nodes)
    }

    fn azimuth(&self, _row: usize, col: usize, dimension: usize) -> f64 {
        PI2 * col as f64 / dimension as f64
    }

    fn solid_angle_weights(&self, dimension: usize) -> ShtResult<Vec<f64>> {
        let (_, row_weights) = Self::row_rule(dimension)?;
        let column_weight = PI2 / dimension as f64;
        Ok(row_weights
            .iter()
            .flat_map(|&weight| std::iter::repeat_n(weight * column_weight, dimension))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        EqualAreaLayout, GridLayout, GridLayoutKind, LegendreLayout, grid_dimension,
    };
    use crate::common::constants::{HALF_PI, PI, PI2};
    use crate::domain::ShtErrorCategory;

    #[test]
    fn grid_dimension_is_odd_and_follows_parity_rule() {
        for bandwidth in 0..256 {
            let dimension = grid_dimension(bandwidth);
            assert_eq!(dimension % 2, 1, "bw={bandwidth}");
            let expected = if bandwidth % 2 == 0 {
                bandwidth + 3
            } else {
                bandwidth + 2
            };
            assert_eq!(dimension, expected);
        }
        assert_eq!(grid_dimension(58), 61);
        assert_eq!(grid_dimension(0), 3);
        assert_eq!(grid_dimension(1), 3);
    }

    #[test]
    fn equal_area_center_is_pole_and_boundary_is_equator() {
        let layout = EqualAreaLayout;
        let dimension = 7;
        let pole = layout.sample(3, 3, dimension).expect("sample");
        assert_eq!(pole.colatitude, 0.0);

        for (row, col) in [(0, 0), (0, 3), (6, 6), (3, 0), (6, 2)] {
            let sample = layout.sample(row, col, dimension).expect("sample");
            assert!(
                (sample.colatitude - HALF_PI).abs() < 1.0e-12,
                "({row},{col}) colatitude={}",
                sample.colatitude
            );
        }
    }

    #[test]
    fn equal_area_azimuth_follows_square_axes() {
        let layout = EqualAreaLayout;
        let dimension = 9;
        let cases = [
            (4, 8, 0.0),
            (8, 4, HALF_PI),
            (4, 0, PI),
            (0, 4, 1.5 * PI),
            (8, 8, 0.25 * PI),
            (0, 8, 1.75 * PI),
        ];
        for (row, col, expected) in cases {
            let azimuth = layout.azimuth(row, col, dimension);
            assert!(
                (azimuth - expected).abs() < 1.0e-12,
                "({row},{col}) expected={expected} actual={azimuth}"
            );
        }
    }

    #[test]
    fn equal_area_rings_hold_eight_k_cells() {
        let layout = EqualAreaLayout;
        let dimension = 11;
        let mut counts = vec![0_usize; layout.ring_count(dimension)];
        for row in 0..dimension {
            for col in 0..dimension {
                counts[layout.ring_index(row, col, dimension)] += 1;
            }
        }
        assert_eq!(counts[0], 1);
        for (ring, count) in counts.iter().enumerate().skip(1) {
            assert_eq!(*count, 8 * ring);
        }
    }

    #[test]
    fn legendre_rows_are_strictly_inside_the_hemisphere() {
        let layout = LegendreLayout;
        let dimension = 15;
        let cosines = layout.ring_cosines(dimension).expect("cosines");
        assert_eq!(cosines.len(), dimension);
        assert!(cosines.windows(2).all(|pair| pair[0] > pair[1]));
        assert!(cosines.iter().all(|&cosine| cosine > 0.0 && cosine < 1.0));

        let first = layout.sample(0, 0, dimension).expect("sample");
        let next = layout.sample(0, 1, dimension).expect("sample");
        assert_eq!(first.azimuth, 0.0);
        assert!((next.azimuth - PI2 / dimension as f64).abs() < 1.0e-15);
        assert_eq!(first.colatitude, next.colatitude);
    }

    #[test]
    fn solid_angle_weights_cover_one_hemisphere() {
        for kind in [GridLayoutKind::EqualArea, GridLayoutKind::Legendre] {
            let dimension = 21;
            let weights = kind.layout().solid_angle_weights(dimension).expect("weights");
            assert_eq!(weights.len(), dimension * dimension);
            let total: f64 = weights.iter().sum();
            assert!((total - PI2).abs() < 1.0e-12, "{kind}: total={total}");
        }
    }

    #[test]
    fn layouts_sample_distinct_points() {
        let dimension = grid_dimension(10);
        let equal_area = EqualAreaLayout.sample(2, 5, dimension).expect("sample");
        let legendre = LegendreLayout.sample(2, 5, dimension).expect("sample");
        assert_ne!(equal_area, legendre);
    }

    #[test]
    fn sample_rejects_even_dimensions_and_out_of_range_cells() {
        let even = EqualAreaLayout.sample(0, 0, 4).expect_err("even dimension");
        assert_eq!(even.category(), ShtErrorCategory::InputValidationError);
        assert_eq!(even.placeholder(), "INPUT.GRID_DIMENSION");

        let outside = LegendreLayout.sample(5, 0, 5).expect_err("outside");
        assert_eq!(outside.placeholder(), "INPUT.GRID_CELL");
    }

    #[test]
    fn lat_grid_type_tags_round_trip() {
        for kind in [GridLayoutKind::EqualArea, GridLayoutKind::Legendre] {
            assert_eq!(GridLayoutKind::from_lat_grid_type(kind.lat_grid_type()), Some(kind));
            assert_eq!(kind.layout().kind(), kind);
        }
        assert_eq!(GridLayoutKind::from_lat_grid_type(0), None);
        assert_eq!(GridLayoutKind::from_lat_grid_type(3), None);
    }
}
