use super::material::{AtomData, CrystalData, MaterialDescriptor, RotationSense};
use super::metadata::RawSimulationMetadata;
use super::model::{FileHeader, HarmonicData, Modality, Vendor};
use super::{FILE_MAGIC, SUPPORTED_FILE_VERSIONS, ShtFile};
use crate::domain::{ParserResult, ShtError};
use crate::numerics::checked_coefficient_count;
use tracing::debug;

pub(super) fn decode_file(bytes: &[u8]) -> ParserResult<ShtFile> {
    let mut offset = 0;
    let header = decode_header(bytes, &mut offset)?;
    let material = decode_material(bytes, &mut offset)?;
    let metadata = decode_metadata(bytes, &mut offset)?;
    let harmonics = decode_harmonics(bytes, &mut offset)?;

    if offset != bytes.len() {
        return Err(ShtError::format(
            "FORMAT.TRAILING_BYTES",
            format!(
                "{} unexpected bytes after the harmonics block at offset {}",
                bytes.len() - offset,
                offset
            ),
        ));
    }

    debug!(
        size = bytes.len(),
        crystals = material.crystals.len(),
        metadata = metadata.as_ref().map_or(0, RawSimulationMetadata::len),
        bandwidth = harmonics.bandwidth(),
        "decoded spherical harmonic container"
    );

    Ok(ShtFile {
        header,
        material,
        metadata,
        harmonics,
    })
}

pub(super) fn encode_file(file: &ShtFile) -> ParserResult<Vec<u8>> {
    let mut bytes = Vec::new();
    encode_header(&mut bytes, &file.header)?;
    encode_material(&mut bytes, &file.material)?;
    encode_metadata(&mut bytes, file.metadata.as_ref())?;
    encode_harmonics(&mut bytes, &file.harmonics)?;
    Ok(bytes)
}

fn decode_header(bytes: &[u8], offset: &mut usize) -> ParserResult<FileHeader> {
    let magic: [u8; 4] = take_array(bytes, offset).ok_or_else(|| truncated("magic", *offset))?;
    if magic != FILE_MAGIC {
        return Err(ShtError::format(
            "FORMAT.MAGIC",
            format!("expected magic {FILE_MAGIC:?}, found {magic:?}"),
        ));
    }

    let file_version: [u8; 2] =
        take_array(bytes, offset).ok_or_else(|| truncated("file version", *offset))?;
    if !SUPPORTED_FILE_VERSIONS.contains(&file_version) {
        return Err(ShtError::format(
            "FORMAT.VERSION",
            format!(
                "unrecognized file version {}.{}",
                file_version[0], file_version[1]
            ),
        ));
    }

    let software_version: [u8; 8] =
        take_array(bytes, offset).ok_or_else(|| truncated("software version", *offset))?;
    let notes = take_text(bytes, offset, "notes")?;
    let doi = take_text(bytes, offset, "doi")?;

    let modality_code = take_u8(bytes, offset).ok_or_else(|| truncated("modality", *offset))?;
    let modality = Modality::from_u8(modality_code).ok_or_else(|| {
        ShtError::format(
            "FORMAT.MODALITY",
            format!("unknown modality code {modality_code}"),
        )
    })?;
    let vendor_code = take_u8(bytes, offset).ok_or_else(|| truncated("vendor", *offset))?;
    let vendor = Vendor::from_u8(vendor_code).ok_or_else(|| {
        ShtError::format("FORMAT.VENDOR", format!("unknown vendor code {vendor_code}"))
    })?;

    let beam_energy = take_f32(bytes, offset).ok_or_else(|| truncated("beam energy", *offset))?;
    let primary_angle =
        take_f32(bytes, offset).ok_or_else(|| truncated("primary angle", *offset))?;
    let secondary_angle =
        take_f32(bytes, offset).ok_or_else(|| truncated("secondary angle", *offset))?;

    Ok(FileHeader {
        file_version,
        software_version,
        notes,
        doi,
        modality,
        vendor,
        beam_energy,
        primary_angle,
        secondary_angle,
    })
}

fn encode_header(bytes: &mut Vec<u8>, header: &FileHeader) -> ParserResult<()> {
    bytes.extend_from_slice(&FILE_MAGIC);
    bytes.extend_from_slice(&header.file_version);
    bytes.extend_from_slice(&header.software_version);
    push_text(bytes, &header.notes, "notes")?;
    push_text(bytes, &header.doi, "doi")?;
    bytes.push(header.modality.as_u8());
    bytes.push(header.vendor.as_u8());
    push_f32(bytes, header.beam_energy);
    push_f32(bytes, header.primary_angle);
    push_f32(bytes, header.secondary_angle);
    Ok(())
}

fn decode_material(bytes: &[u8], offset: &mut usize) -> ParserResult<MaterialDescriptor> {
    let rotation_sense = take_u8(bytes, offset)
        .map(RotationSense::from_u8)
        .ok_or_else(|| truncated("rotation sense", *offset))?;
    let pijk = take_i8(bytes, offset).ok_or_else(|| truncated("pijk", *offset))?;
    let crystal_count =
        take_u8(bytes, offset).ok_or_else(|| truncated("crystal count", *offset))?;
    let effective_space_group =
        take_u8(bytes, offset).ok_or_else(|| truncated("effective space group", *offset))?;

    let crystals = (0..crystal_count)
        .map(|index| decode_crystal(bytes, offset, index))
        .collect::<ParserResult<Vec<_>>>()?;

    Ok(MaterialDescriptor {
        rotation_sense,
        pijk,
        effective_space_group,
        crystals,
    })
}

fn encode_material(bytes: &mut Vec<u8>, material: &MaterialDescriptor) -> ParserResult<()> {
    bytes.push(material.rotation_sense.as_u8());
    push_i8(bytes, material.pijk);
    bytes.push(count_as_u8(material.crystals.len(), "crystals")?);
    bytes.push(material.effective_space_group);
    for crystal in &material.crystals {
        encode_crystal(bytes, crystal)?;
    }
    Ok(())
}

fn decode_crystal(bytes: &[u8], offset: &mut usize, index: u8) -> ParserResult<CrystalData> {
    let section = || format!("crystal {index}");
    let [sg_number, sg_setting, sg_axis, sg_cell] =
        take_array::<4>(bytes, offset).ok_or_else(|| truncated(&section(), *offset))?;
    let origin: [f32; 3] =
        take_f32_array(bytes, offset).ok_or_else(|| truncated(&section(), *offset))?;
    let lattice: [f32; 6] =
        take_f32_array(bytes, offset).ok_or_else(|| truncated(&section(), *offset))?;
    let orientation: [f32; 4] =
        take_f32_array(bytes, offset).ok_or_else(|| truncated(&section(), *offset))?;
    let weight = take_f32(bytes, offset).ok_or_else(|| truncated(&section(), *offset))?;
    let atom_count = take_u8(bytes, offset).ok_or_else(|| truncated(&section(), *offset))?;

    let atoms = (0..atom_count)
        .map(|atom| {
            decode_atom(bytes, offset)
                .ok_or_else(|| truncated(&format!("crystal {index} atom {atom}"), *offset))
        })
        .collect::<ParserResult<Vec<_>>>()?;

    Ok(CrystalData {
        sg_number,
        sg_setting,
        sg_axis,
        sg_cell,
        origin,
        lattice,
        orientation,
        weight,
        atoms,
    })
}

fn encode_crystal(bytes: &mut Vec<u8>, crystal: &CrystalData) -> ParserResult<()> {
    bytes.extend_from_slice(&[
        crystal.sg_number,
        crystal.sg_setting,
        crystal.sg_axis,
        crystal.sg_cell,
    ]);
    for value in crystal
        .origin
        .iter()
        .chain(&crystal.lattice)
        .chain(&crystal.orientation)
    {
        push_f32(bytes, *value);
    }
    push_f32(bytes, crystal.weight);
    bytes.push(count_as_u8(crystal.atoms.len(), "atoms")?);
    for atom in &crystal.atoms {
        bytes.push(atom.atomic_number);
        bytes.extend_from_slice(&atom.position);
        push_f32(bytes, atom.occupancy);
        push_f32(bytes, atom.debye_waller);
    }
    Ok(())
}

fn decode_atom(bytes: &[u8], offset: &mut usize) -> Option<AtomData> {
    let [atomic_number, x, y, z] = take_array::<4>(bytes, offset)?;
    Some(AtomData {
        atomic_number,
        position: [x, y, z],
        occupancy: take_f32(bytes, offset)?,
        debye_waller: take_f32(bytes, offset)?,
    })
}

fn decode_metadata(
    bytes: &[u8],
    offset: &mut usize,
) -> ParserResult<Option<RawSimulationMetadata>> {
    let length =
        take_u32(bytes, offset).ok_or_else(|| truncated("simulation metadata length", *offset))?;
    if length == 0 {
        return Ok(None);
    }
    let block = take_slice(bytes, offset, length as usize)
        .ok_or_else(|| truncated("simulation metadata", *offset))?;
    Ok(Some(RawSimulationMetadata::new(block.to_vec())))
}

fn encode_metadata(
    bytes: &mut Vec<u8>,
    metadata: Option<&RawSimulationMetadata>,
) -> ParserResult<()> {
    let block = metadata.map_or(&[][..], RawSimulationMetadata::as_bytes);
    let length = u32::try_from(block.len()).map_err(|_| {
        overflow(format!(
            "simulation metadata of {} bytes exceeds the u32 length field",
            block.len()
        ))
    })?;
    push_u32(bytes, length);
    bytes.extend_from_slice(block);
    Ok(())
}

fn decode_harmonics(bytes: &[u8], offset: &mut usize) -> ParserResult<HarmonicData> {
    let bandwidth =
        take_u32(bytes, offset).ok_or_else(|| truncated("harmonics bandwidth", *offset))?;
    let count = take_u32(bytes, offset).ok_or_else(|| truncated("harmonics count", *offset))?;
    let bandwidth = bandwidth as usize;
    let count = count as usize;

    let expected = checked_coefficient_count(bandwidth);
    if expected != Some(count) {
        return Err(ShtError::format(
            "FORMAT.COEFFICIENT_COUNT",
            format!("bandwidth {bandwidth} cannot be described by {count} coefficients"),
        ));
    }

    let byte_len = count
        .checked_mul(std::mem::size_of::<f64>())
        .ok_or_else(|| truncated("harmonics coefficients", *offset))?;
    let block = take_slice(bytes, offset, byte_len)
        .ok_or_else(|| truncated("harmonics coefficients", *offset))?;
    let coefficients = block
        .chunks_exact(std::mem::size_of::<f64>())
        .map(|chunk| {
            let mut raw = [0_u8; 8];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect();

    HarmonicData::new(bandwidth, coefficients)
        .map_err(|error| ShtError::format("FORMAT.COEFFICIENT_COUNT", error.message()))
}

fn encode_harmonics(bytes: &mut Vec<u8>, harmonics: &HarmonicData) -> ParserResult<()> {
    harmonics.validate()?;
    let bandwidth = u32::try_from(harmonics.bandwidth()).map_err(|_| {
        overflow(format!(
            "bandwidth {} exceeds the u32 field",
            harmonics.bandwidth()
        ))
    })?;
    let count = u32::try_from(harmonics.coefficients().len()).map_err(|_| {
        overflow(format!(
            "{} coefficients exceed the u32 count field",
            harmonics.coefficients().len()
        ))
    })?;
    push_u32(bytes, bandwidth);
    push_u32(bytes, count);
    bytes.reserve(harmonics.coefficients().len() * std::mem::size_of::<f64>());
    for &value in harmonics.coefficients() {
        push_f64(bytes, value);
    }
    Ok(())
}

fn truncated(section: &str, offset: usize) -> ShtError {
    ShtError::format(
        "FORMAT.TRUNCATED",
        format!("stream ends inside {section} at offset {offset}"),
    )
}

fn overflow(message: String) -> ShtError {
    ShtError::format("FORMAT.FIELD_OVERFLOW", message)
}

fn count_as_u8(count: usize, what: &str) -> ParserResult<u8> {
    u8::try_from(count)
        .map_err(|_| overflow(format!("{count} {what} exceed the u8 count field")))
}

fn take_text(bytes: &[u8], offset: &mut usize, field: &str) -> ParserResult<String> {
    let length = take_u16(bytes, offset).ok_or_else(|| truncated(field, *offset))?;
    let raw = take_slice(bytes, offset, usize::from(length))
        .ok_or_else(|| truncated(field, *offset))?;
    String::from_utf8(raw.to_vec()).map_err(|source| {
        ShtError::format("FORMAT.TEXT", format!("{field} is not valid UTF-8: {source}"))
    })
}

fn push_text(bytes: &mut Vec<u8>, text: &str, field: &str) -> ParserResult<()> {
    let length = u16::try_from(text.len()).map_err(|_| {
        overflow(format!(
            "{field} of {} bytes exceeds the u16 length field",
            text.len()
        ))
    })?;
    push_u16(bytes, length);
    bytes.extend_from_slice(text.as_bytes());
    Ok(())
}

fn take_slice<'a>(bytes: &'a [u8], offset: &mut usize, len: usize) -> Option<&'a [u8]> {
    let end = offset.checked_add(len)?;
    let slice = bytes.get(*offset..end)?;
    *offset = end;
    Some(slice)
}

fn take_array<const N: usize>(bytes: &[u8], offset: &mut usize) -> Option<[u8; N]> {
    take_slice(bytes, offset, N)?.try_into().ok()
}

fn take_f32_array<const N: usize>(bytes: &[u8], offset: &mut usize) -> Option<[f32; N]> {
    let mut values = [0.0; N];
    for value in &mut values {
        *value = take_f32(bytes, offset)?;
    }
    Some(values)
}

fn take_u8(bytes: &[u8], offset: &mut usize) -> Option<u8> {
    take_array::<1>(bytes, offset).map(|[value]| value)
}

fn take_i8(bytes: &[u8], offset: &mut usize) -> Option<i8> {
    take_array(bytes, offset).map(i8::from_le_bytes)
}

fn take_u16(bytes: &[u8], offset: &mut usize) -> Option<u16> {
    take_array(bytes, offset).map(u16::from_le_bytes)
}

fn take_u32(bytes: &[u8], offset: &mut usize) -> Option<u32> {
    take_array(bytes, offset).map(u32::from_le_bytes)
}

pub(super) fn take_i32(bytes: &[u8], offset: &mut usize) -> Option<i32> {
    take_array(bytes, offset).map(i32::from_le_bytes)
}

pub(super) fn take_f32(bytes: &[u8], offset: &mut usize) -> Option<f32> {
    take_array(bytes, offset).map(f32::from_le_bytes)
}

fn push_i8(target: &mut Vec<u8>, value: i8) {
    target.extend_from_slice(&value.to_le_bytes());
}

fn push_u16(target: &mut Vec<u8>, value: u16) {
    target.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(target: &mut Vec<u8>, value: u32) {
    target.extend_from_slice(&value.to_le_bytes());
}

pub(super) fn push_i32(target: &mut Vec<u8>, value: i32) {
    target.extend_from_slice(&value.to_le_bytes());
}

pub(super) fn push_f32(target: &mut Vec<u8>, value: f32) {
    target.extend_from_slice(&value.to_le_bytes());
}

fn push_f64(target: &mut Vec<u8>, value: f64) {
    target.extend_from_slice(&value.to_le_bytes());
}
