pub mod cache;
pub mod layout;
pub mod synthesis;

pub use cache::{LayoutTableCache, LayoutTableKey, LayoutTables};
pub use layout::{
    EqualAreaLayout, GridLayout, GridLayoutKind, LegendreLayout, SphericalCoordinate,
    grid_dimension, validate_dimension,
};
pub use synthesis::{
    DiscreteHarmonicSynthesizer, HarmonicSynthesisApi, HemisphereGrids, validate_coefficients,
};
