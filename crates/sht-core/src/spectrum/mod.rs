//! Master spectrum model: one coefficient buffer describing the whole sphere.

use crate::domain::{Hemisphere, ShtResult, SynthesisResult};
use crate::format::{
    FileHeader, HarmonicData, MaterialDescriptor, RawSimulationMetadata, ShtFile,
    SimulationMetadata,
};
use crate::transform::{
    GridLayout, HarmonicSynthesisApi, HemisphereGrids, grid_dimension, validate_coefficients,
};
use std::io::Read;
use std::path::Path;

/// Band-limited function on the sphere plus its acquisition context.
///
/// The north and south hemispheres are views of the same buffer; there is no
/// way to update one without the other.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterSpectrum {
    bandwidth: usize,
    kv: f64,
    sig: f64,
    coefficients: Vec<f64>,
}

impl MasterSpectrum {
    pub fn new(bandwidth: usize, kv: f64, sig: f64, coefficients: Vec<f64>) -> ShtResult<Self> {
        validate_coefficients(&coefficients, bandwidth)?;
        Ok(Self {
            bandwidth,
            kv,
            sig,
            coefficients,
        })
    }

    pub fn from_harmonics(harmonics: HarmonicData, kv: f64, sig: f64) -> Self {
        let bandwidth = harmonics.bandwidth();
        Self {
            bandwidth,
            kv,
            sig,
            coefficients: harmonics.into_coefficients(),
        }
    }

    pub fn to_harmonics(&self) -> ShtResult<HarmonicData> {
        HarmonicData::new(self.bandwidth, self.coefficients.clone())
    }

    pub fn bandwidth(&self) -> usize {
        self.bandwidth
    }

    /// Accelerating voltage in kV.
    pub fn kv(&self) -> f64 {
        self.kv
    }

    /// Sample tilt in degrees.
    pub fn sig(&self) -> f64 {
        self.sig
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn dimension(&self) -> usize {
        grid_dimension(self.bandwidth)
    }

    /// Swaps in a new buffer; the old one is kept if the shape is wrong.
    pub fn replace_coefficients(
        &mut self,
        bandwidth: usize,
        coefficients: Vec<f64>,
    ) -> ShtResult<Vec<f64>> {
        validate_coefficients(&coefficients, bandwidth)?;
        self.bandwidth = bandwidth;
        Ok(std::mem::replace(&mut self.coefficients, coefficients))
    }

    pub fn hemisphere(&self, hemisphere: Hemisphere) -> HemisphereView<'_> {
        HemisphereView {
            spectrum: self,
            hemisphere,
        }
    }

    pub fn synthesize(
        &self,
        synthesizer: &dyn HarmonicSynthesisApi,
        layout: &dyn GridLayout,
    ) -> SynthesisResult<HemisphereGrids> {
        synthesizer.synthesize(&self.coefficients, self.bandwidth, layout)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HemisphereView<'a> {
    spectrum: &'a MasterSpectrum,
    hemisphere: Hemisphere,
}

impl<'a> HemisphereView<'a> {
    pub fn hemisphere(&self) -> Hemisphere {
        self.hemisphere
    }

    pub fn spectrum(&self) -> &'a MasterSpectrum {
        self.spectrum
    }

    pub fn dimension(&self) -> usize {
        self.spectrum.dimension()
    }

    /// Row-major `dimension x dimension` grid of this hemisphere.
    pub fn synthesize(
        &self,
        synthesizer: &dyn HarmonicSynthesisApi,
        layout: &dyn GridLayout,
    ) -> SynthesisResult<Vec<f64>> {
        let (north, south) = self.spectrum.synthesize(synthesizer, layout)?.into_parts();
        Ok(match self.hemisphere {
            Hemisphere::North => north,
            Hemisphere::South => south,
        })
    }
}

/// Everything a container yields once decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSpectrum {
    pub header: FileHeader,
    pub material: MaterialDescriptor,
    pub raw_metadata: Option<RawSimulationMetadata>,
    pub metadata: Option<SimulationMetadata>,
    pub spectrum: MasterSpectrum,
}

impl LoadedSpectrum {
    /// kV and sig come from the header beam energy and primary angle.
    pub fn from_file(file: ShtFile) -> Self {
        let metadata = file.simulation_metadata();
        let (header, material, raw_metadata, harmonics) = file.into_parts();
        let spectrum = MasterSpectrum::from_harmonics(
            harmonics,
            f64::from(header.beam_energy),
            f64::from(header.primary_angle),
        );
        Self {
            header,
            material,
            raw_metadata,
            metadata,
            spectrum,
        }
    }

    /// Rebuilds a container, writing kV and sig back into the header.
    ///
    /// An edited `metadata` replaces the raw block. Unrecognised blocks, and
    /// metadata that still matches its raw bytes, are written back verbatim.
    pub fn to_file(&self) -> ShtResult<ShtFile> {
        let header = FileHeader {
            beam_energy: self.spectrum.kv() as f32,
            primary_angle: self.spectrum.sig() as f32,
            ..self.header.clone()
        };
        Ok(ShtFile::from_parts(
            header,
            self.material.clone(),
            self.metadata_block(),
            self.spectrum.to_harmonics()?,
        ))
    }

    fn metadata_block(&self) -> Option<RawSimulationMetadata> {
        let Some(metadata) = &self.metadata else {
            return self.raw_metadata.clone();
        };
        let decoded = self.raw_metadata.as_ref().and_then(|raw| {
            SimulationMetadata::interpret(self.header.vendor, self.header.modality, raw.as_bytes())
        });
        if decoded.as_ref() == Some(metadata) {
            self.raw_metadata.clone()
        } else {
            Some(RawSimulationMetadata::from(metadata))
        }
    }
}

pub fn read_master_spectrum(reader: impl Read) -> ShtResult<LoadedSpectrum> {
    ShtFile::read(reader).map(LoadedSpectrum::from_file)
}

pub fn load_master_spectrum(path: &Path) -> ShtResult<LoadedSpectrum> {
    ShtFile::load(path).map(LoadedSpectrum::from_file)
}
