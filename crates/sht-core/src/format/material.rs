use crate::common::constants::ATOM_COORDINATE_SCALE;
use crate::common::elements::element_symbol;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One site of the atomic basis.
///
/// Positions are fixed-point fractions of the unit cell with denominator
/// [`ATOM_COORDINATE_SCALE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomData {
    pub atomic_number: u8,
    pub position: [u8; 3],
    pub occupancy: f32,
    pub debye_waller: f32,
}

impl AtomData {
    /// Builds a site from fractional coordinates, wrapping them into `[0, 1)`
    /// and rounding to the nearest representable step.
    pub fn new(atomic_number: u8, fractional: [f32; 3], occupancy: f32, debye_waller: f32) -> Self {
        Self {
            atomic_number,
            position: fractional.map(scale_coordinate),
            occupancy,
            debye_waller,
        }
    }

    pub fn fractional_position(&self) -> [f32; 3] {
        self.position
            .map(|scaled| f32::from(scaled) / f32::from(ATOM_COORDINATE_SCALE))
    }

    pub fn element_symbol(&self) -> Option<&'static str> {
        element_symbol(usize::from(self.atomic_number))
    }
}

fn scale_coordinate(fraction: f32) -> u8 {
    let scale = u32::from(ATOM_COORDINATE_SCALE);
    let wrapped = fraction.rem_euclid(1.0);
    let scaled = (wrapped * scale as f32).round() as u32 % scale;
    scaled as u8
}

/// One crystal phase: space group, cell, orientation and atomic basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrystalData {
    pub sg_number: u8,
    pub sg_setting: u8,
    pub sg_axis: u8,
    pub sg_cell: u8,
    pub origin: [f32; 3],
    /// `a, b, c` followed by `alpha, beta, gamma`.
    pub lattice: [f32; 6],
    /// Unit quaternion `w, x, y, z`.
    pub orientation: [f32; 4],
    pub weight: f32,
    pub atoms: Vec<AtomData>,
}

impl CrystalData {
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn cell_lengths(&self) -> [f32; 3] {
        [self.lattice[0], self.lattice[1], self.lattice[2]]
    }

    pub fn cell_angles(&self) -> [f32; 3] {
        [self.lattice[3], self.lattice[4], self.lattice[5]]
    }
}

/// Handedness marker stored as a single ASCII byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RotationSense {
    Passive,
    Active,
    Other(u8),
}

impl RotationSense {
    pub const fn from_u8(code: u8) -> Self {
        match code {
            b'p' => Self::Passive,
            b'a' => Self::Active,
            other => Self::Other(other),
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Passive => b'p',
            Self::Active => b'a',
            Self::Other(code) => code,
        }
    }
}

impl Display for RotationSense {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passive => f.write_str("passive"),
            Self::Active => f.write_str("active"),
            Self::Other(code) if code.is_ascii_graphic() => write!(f, "'{}'", char::from(*code)),
            Self::Other(code) => write!(f, "0x{code:02x}"),
        }
    }
}

/// Material description owning its crystal list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDescriptor {
    pub rotation_sense: RotationSense,
    pub pijk: i8,
    pub effective_space_group: u8,
    pub crystals: Vec<CrystalData>,
}

impl Default for MaterialDescriptor {
    fn default() -> Self {
        Self {
            rotation_sense: RotationSense::Passive,
            pijk: 1,
            effective_space_group: 0,
            crystals: Vec::new(),
        }
    }
}

impl MaterialDescriptor {
    pub fn crystal_count(&self) -> usize {
        self.crystals.len()
    }

    pub fn total_weight(&self) -> f64 {
        self.crystals
            .iter()
            .map(|crystal| f64::from(crystal.weight))
            .sum()
    }

    /// Crystal weights normalised to sum to one; `None` when they sum to zero.
    pub fn relative_weights(&self) -> Option<Vec<f64>> {
        let total = self.total_weight();
        if total == 0.0 || !total.is_finite() {
            return None;
        }
        Some(
            self.crystals
                .iter()
                .map(|crystal| f64::from(crystal.weight) / total)
                .collect(),
        )
    }
}
