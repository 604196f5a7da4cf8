//! Shared numeric and file-format constants.

pub const PI: f64 = std::f64::consts::PI;
pub const PI2: f64 = 2.0 * PI;
pub const FOUR_PI: f64 = 4.0 * PI;
pub const HALF_PI: f64 = 0.5 * PI;
pub const QUARTER_PI: f64 = 0.25 * PI;

/// Fixed-point denominator for atom fractional coordinates.
pub const ATOM_COORDINATE_SCALE: u8 = 24;

/// Solid angle of one hemisphere of the unit sphere.
pub const HEMISPHERE_SOLID_ANGLE: f64 = PI2;
