pub mod common;
pub mod domain;
pub mod format;
pub mod numerics;
pub mod spectrum;
pub mod transform;

pub use domain::{
    ExecutionMode, Hemisphere, ParserResult, ShtError, ShtErrorCategory, ShtResult,
    SynthesisResult,
};
pub use format::{ShtFile, SimulationMetadata};
pub use spectrum::{LoadedSpectrum, MasterSpectrum, load_master_spectrum, read_master_spectrum};
pub use transform::{
    DiscreteHarmonicSynthesizer, GridLayout, GridLayoutKind, HemisphereGrids, grid_dimension,
};
