//! Spherical harmonic container (`*.sht`) codec.
//!
//! Layout, little-endian and unpadded: header, material, optional
//! simulation metadata block (`u32` length, `0` when absent), then the
//! harmonics block (`u32` bandwidth, `u32` count, `count` x `f64`).

pub mod material;
pub mod metadata;
pub mod model;
mod parser;

pub use material::{AtomData, CrystalData, MaterialDescriptor, RotationSense};
pub use metadata::{
    EMSOFT_ED_METADATA_LEN, EmsoftEdMetadata, METADATA_LAYOUTS, MetadataKey, MetadataLayout,
    RawSimulationMetadata, SimulationMetadata,
};
pub use model::{FileHeader, HarmonicData, Modality, Vendor};

use crate::domain::{ParserResult, ShtError};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

pub const FILE_MAGIC: [u8; 4] = *b"SHTF";
pub const CURRENT_FILE_VERSION: [u8; 2] = [1, 0];
pub const SUPPORTED_FILE_VERSIONS: &[[u8; 2]] = &[CURRENT_FILE_VERSION];

#[derive(Debug, Clone, PartialEq)]
pub struct ShtFile {
    header: FileHeader,
    material: MaterialDescriptor,
    metadata: Option<RawSimulationMetadata>,
    harmonics: HarmonicData,
}

impl ShtFile {
    /// An empty metadata block is stored as absent, matching what a reader
    /// would return for it.
    pub fn from_parts(
        header: FileHeader,
        material: MaterialDescriptor,
        metadata: Option<RawSimulationMetadata>,
        harmonics: HarmonicData,
    ) -> Self {
        Self {
            header,
            material,
            metadata: metadata.filter(|block| !block.is_empty()),
            harmonics,
        }
    }

    pub fn into_parts(
        self,
    ) -> (
        FileHeader,
        MaterialDescriptor,
        Option<RawSimulationMetadata>,
        HarmonicData,
    ) {
        (self.header, self.material, self.metadata, self.harmonics)
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn material(&self) -> &MaterialDescriptor {
        &self.material
    }

    pub fn raw_metadata(&self) -> Option<&RawSimulationMetadata> {
        self.metadata.as_ref()
    }

    pub fn harmonics(&self) -> &HarmonicData {
        &self.harmonics
    }

    /// Structured view of the metadata block when its key has a known layout.
    pub fn simulation_metadata(&self) -> Option<SimulationMetadata> {
        self.metadata
            .as_ref()?
            .interpret(self.header.vendor, self.header.modality)
    }

    pub fn from_bytes(bytes: &[u8]) -> ParserResult<Self> {
        parser::decode_file(bytes)
    }

    pub fn to_bytes(&self) -> ParserResult<Vec<u8>> {
        if !SUPPORTED_FILE_VERSIONS.contains(&self.header.file_version) {
            return Err(ShtError::format(
                "FORMAT.VERSION",
                format!(
                    "cannot write unrecognized file version {}",
                    self.header.version_string()
                ),
            ));
        }
        parser::encode_file(self)
    }

    pub fn read(mut reader: impl Read) -> ParserResult<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(|source| {
            ShtError::io_system(
                "IO.SHT_READ",
                format!("failed to read spherical harmonic stream: {source}"),
            )
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn write(&self, mut writer: impl Write) -> ParserResult<()> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes).map_err(|source| {
            ShtError::io_system(
                "IO.SHT_WRITE",
                format!("failed to write spherical harmonic stream: {source}"),
            )
        })
    }

    pub fn load(path: &Path) -> ParserResult<Self> {
        let bytes = fs::read(path).map_err(|source| {
            ShtError::io_system(
                "IO.SHT_READ",
                format!("failed to read '{}': {}", path.display(), source),
            )
        })?;
        let file = Self::from_bytes(&bytes).map_err(|error| {
            ShtError::new(
                error.category(),
                error.placeholder(),
                format!("{}: {}", path.display(), error.message()),
            )
        })?;
        info!(
            path = %path.display(),
            bandwidth = file.harmonics.bandwidth(),
            "loaded spherical harmonic file"
        );
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> ParserResult<()> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes).map_err(|source| {
            ShtError::io_system(
                "IO.SHT_WRITE",
                format!("failed to write '{}': {}", path.display(), source),
            )
        })?;
        info!(path = %path.display(), "saved spherical harmonic file");
        Ok(())
    }
}
