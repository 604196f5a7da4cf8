//! Simulation provenance blocks.
//!
//! The container stores the block as opaque bytes; its layout is selected by
//! `(vendor, modality, byte length)`. Known keys live in [`METADATA_LAYOUTS`];
//! anything else is kept raw and reported as uninterpretable.

use super::model::{Modality, Vendor};
use super::parser::{push_f32, push_i32, take_f32, take_i32};
use crate::transform::GridLayoutKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const EMSOFT_ED_METADATA_LEN: usize = 80;

/// Metadata bytes exactly as they appear in the container.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawSimulationMetadata {
    bytes: Vec<u8>,
}

impl RawSimulationMetadata {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn interpret(&self, vendor: Vendor, modality: Modality) -> Option<SimulationMetadata> {
        SimulationMetadata::interpret(vendor, modality, &self.bytes)
    }
}

impl From<&SimulationMetadata> for RawSimulationMetadata {
    fn from(metadata: &SimulationMetadata) -> Self {
        Self::new(metadata.to_bytes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetadataKey {
    pub vendor: Vendor,
    pub modality: Modality,
    pub size: usize,
}

pub struct MetadataLayout {
    pub key: MetadataKey,
    pub decode: fn(&[u8]) -> Option<SimulationMetadata>,
}

pub static METADATA_LAYOUTS: &[MetadataLayout] = &[MetadataLayout {
    key: MetadataKey {
        vendor: Vendor::Emsoft,
        modality: Modality::Ebsd,
        size: EMSOFT_ED_METADATA_LEN,
    },
    decode: decode_emsoft_ed,
}];

fn decode_emsoft_ed(bytes: &[u8]) -> Option<SimulationMetadata> {
    EmsoftEdMetadata::from_bytes(bytes).map(SimulationMetadata::EmsoftElectronDiffraction)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SimulationMetadata {
    EmsoftElectronDiffraction(EmsoftEdMetadata),
}

impl SimulationMetadata {
    /// Decodes `bytes` with the layout registered for the key, if any.
    pub fn interpret(vendor: Vendor, modality: Modality, bytes: &[u8]) -> Option<Self> {
        let key = MetadataKey {
            vendor,
            modality,
            size: bytes.len(),
        };
        let Some(layout) = METADATA_LAYOUTS.iter().find(|layout| layout.key == key) else {
            debug!(
                vendor = %vendor,
                modality = %modality,
                size = bytes.len(),
                "no simulation metadata layout registered"
            );
            return None;
        };
        (layout.decode)(bytes)
    }

    pub fn key(&self) -> MetadataKey {
        match self {
            Self::EmsoftElectronDiffraction(_) => MetadataKey {
                vendor: Vendor::Emsoft,
                modality: Modality::Ebsd,
                size: EMSOFT_ED_METADATA_LEN,
            },
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::EmsoftElectronDiffraction(metadata) => metadata.to_bytes(),
        }
    }
}

/// EMsoft Monte-Carlo plus dynamical electron diffraction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmsoftEdMetadata {
    pub sig_start: f32,
    pub sig_end: f32,
    pub sig_step: f32,
    pub omega: f32,
    pub kev: f32,
    pub e_hist_min: f32,
    pub e_bin_size: f32,
    pub depth_max: f32,
    pub depth_step: f32,
    pub thickness: f32,
    pub total_electrons: i32,
    pub num_sx: i32,
    pub c1: f32,
    pub c2: f32,
    pub c3: f32,
    pub sig_db_diff: f32,
    pub d_min: f32,
    pub num_px: i32,
    pub lat_grid_type: i32,
}

impl EmsoftEdMetadata {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != EMSOFT_ED_METADATA_LEN {
            return None;
        }
        let mut offset = 0;
        Some(Self {
            sig_start: take_f32(bytes, &mut offset)?,
            sig_end: take_f32(bytes, &mut offset)?,
            sig_step: take_f32(bytes, &mut offset)?,
            omega: take_f32(bytes, &mut offset)?,
            kev: take_f32(bytes, &mut offset)?,
            e_hist_min: take_f32(bytes, &mut offset)?,
            e_bin_size: take_f32(bytes, &mut offset)?,
            depth_max: take_f32(bytes, &mut offset)?,
            depth_step: take_f32(bytes, &mut offset)?,
            thickness: take_f32(bytes, &mut offset)?,
            total_electrons: take_i32(bytes, &mut offset)?,
            num_sx: take_i32(bytes, &mut offset)?,
            c1: take_f32(bytes, &mut offset)?,
            c2: take_f32(bytes, &mut offset)?,
            c3: take_f32(bytes, &mut offset)?,
            sig_db_diff: take_f32(bytes, &mut offset)?,
            d_min: take_f32(bytes, &mut offset)?,
            num_px: take_i32(bytes, &mut offset)?,
            lat_grid_type: take_i32(bytes, &mut offset)?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(EMSOFT_ED_METADATA_LEN);
        for value in [
            self.sig_start,
            self.sig_end,
            self.sig_step,
            self.omega,
            self.kev,
            self.e_hist_min,
            self.e_bin_size,
            self.depth_max,
            self.depth_step,
            self.thickness,
        ] {
            push_f32(&mut bytes, value);
        }
        push_i32(&mut bytes, self.total_electrons);
        push_i32(&mut bytes, self.num_sx);
        for value in [self.c1, self.c2, self.c3, self.sig_db_diff, self.d_min] {
            push_f32(&mut bytes, value);
        }
        push_i32(&mut bytes, self.num_px);
        push_i32(&mut bytes, self.lat_grid_type);
        bytes.resize(EMSOFT_ED_METADATA_LEN, 0);
        bytes
    }

    pub fn lat_grid_kind(&self) -> Option<GridLayoutKind> {
        GridLayoutKind::from_lat_grid_type(self.lat_grid_type)
    }

    pub fn lat_grid_name(&self) -> &'static str {
        self.lat_grid_kind().map_or("unknown", GridLayoutKind::as_str)
    }
}
