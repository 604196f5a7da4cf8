use crate::domain::{ShtError, ShtResult};
use crate::numerics::checked_coefficient_count;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modality {
    Unknown,
    #[serde(rename = "EBSD")]
    Ebsd,
    #[serde(rename = "ECP")]
    Ecp,
    #[serde(rename = "TKD")]
    Tkd,
    #[serde(rename = "PED")]
    Ped,
    Laue,
}

impl Modality {
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::Ebsd),
            2 => Some(Self::Ecp),
            3 => Some(Self::Tkd),
            4 => Some(Self::Ped),
            5 => Some(Self::Laue),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Ebsd => 1,
            Self::Ecp => 2,
            Self::Tkd => 3,
            Self::Ped => 4,
            Self::Laue => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Ebsd => "EBSD",
            Self::Ecp => "ECP",
            Self::Tkd => "TKD",
            Self::Ped => "PED",
            Self::Laue => "Laue",
        }
    }
}

impl Display for Modality {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vendor {
    Unknown,
    #[serde(rename = "EMsoft")]
    Emsoft,
}

impl Vendor {
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::Emsoft),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Emsoft => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Emsoft => "EMsoft",
        }
    }
}

impl Display for Vendor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Container header: format version, provenance and acquisition geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHeader {
    pub file_version: [u8; 2],
    pub software_version: [u8; 8],
    pub notes: String,
    pub doi: String,
    pub modality: Modality,
    pub vendor: Vendor,
    /// keV.
    pub beam_energy: f32,
    /// Degrees.
    pub primary_angle: f32,
    /// Degrees.
    pub secondary_angle: f32,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            file_version: super::CURRENT_FILE_VERSION,
            software_version: *b"0.0.0\0\0\0",
            notes: String::new(),
            doi: String::new(),
            modality: Modality::Unknown,
            vendor: Vendor::Unknown,
            beam_energy: 0.0,
            primary_angle: 0.0,
            secondary_angle: 0.0,
        }
    }
}

impl FileHeader {
    pub fn version_string(&self) -> String {
        format!("{}.{}", self.file_version[0], self.file_version[1])
    }

    /// Software identifier with trailing NUL padding removed.
    pub fn software_version_string(&self) -> String {
        let end = self
            .software_version
            .iter()
            .rposition(|&byte| byte != 0)
            .map_or(0, |index| index + 1);
        String::from_utf8_lossy(&self.software_version[..end]).into_owned()
    }
}

/// Bandwidth and coefficient payload as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawHarmonicData")]
pub struct HarmonicData {
    bandwidth: usize,
    coefficients: Vec<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHarmonicData {
    bandwidth: usize,
    coefficients: Vec<f64>,
}

impl TryFrom<RawHarmonicData> for HarmonicData {
    type Error = ShtError;

    fn try_from(raw: RawHarmonicData) -> ShtResult<Self> {
        Self::new(raw.bandwidth, raw.coefficients)
    }
}

impl HarmonicData {
    pub fn new(bandwidth: usize, coefficients: Vec<f64>) -> ShtResult<Self> {
        let harmonics = Self {
            bandwidth,
            coefficients,
        };
        harmonics.validate()?;
        Ok(harmonics)
    }

    /// Checks that the buffer holds exactly `(bandwidth + 1)^2` values.
    pub(crate) fn validate(&self) -> ShtResult<()> {
        let bandwidth = self.bandwidth;
        let expected = checked_coefficient_count(bandwidth).ok_or_else(|| {
            ShtError::shape(
                "SHAPE.BANDWIDTH",
                format!("bandwidth {bandwidth} overflows the coefficient count"),
            )
        })?;
        if self.coefficients.len() != expected {
            return Err(ShtError::shape(
                "SHAPE.COEFFICIENTS",
                format!(
                    "bandwidth {} requires {} coefficients, got {}",
                    bandwidth,
                    expected,
                    self.coefficients.len()
                ),
            ));
        }
        Ok(())
    }

    pub fn bandwidth(&self) -> usize {
        self.bandwidth
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn into_coefficients(self) -> Vec<f64> {
        self.coefficients
    }
}
