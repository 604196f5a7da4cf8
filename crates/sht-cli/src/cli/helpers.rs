use anyhow::{Context, bail, ensure};
use serde::Serialize;
use sht_core::format::{CrystalData, SimulationMetadata};
use sht_core::spectrum::LoadedSpectrum;
use sht_core::transform::HemisphereGrids;
use std::fmt::Write as _;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Rescales both hemispheres with one shared min/max onto `0..=255`.
///
/// A constant (or non-finite) range maps every sample to `0`.
pub(super) fn quantize_hemispheres(grids: &HemisphereGrids) -> (Vec<u8>, Vec<u8>) {
    let (min, max) = grids.min_max().unwrap_or((0.0, 0.0));
    let delta = max - min;
    let factor = if delta > 0.0 && delta.is_finite() {
        255.0 / delta
    } else {
        0.0
    };
    let quantize = |values: &[f64]| {
        values
            .iter()
            .map(|value| ((value - min) * factor).round().clamp(0.0, 255.0) as u8)
            .collect::<Vec<_>>()
    };
    (quantize(grids.north()), quantize(grids.south()))
}

/// Writes an 8-bit gray (`samples == 1`) or RGB (`samples == 3`) image.
pub(super) fn write_png(
    path: &Path,
    pixels: &[u8],
    width: usize,
    height: usize,
    samples: usize,
) -> anyhow::Result<()> {
    let color = match samples {
        1 => png::ColorType::Grayscale,
        3 => png::ColorType::Rgb,
        other => bail!("unsupported samples per pixel: {other}"),
    };
    ensure!(
        pixels.len() == width * height * samples,
        "pixel buffer holds {} bytes, expected {}x{}x{}",
        pixels.len(),
        width,
        height,
        samples
    );
    let width = u32::try_from(width).context("image width exceeds u32")?;
    let height = u32::try_from(height).context("image height exceeds u32")?;

    let file =
        File::create(path).with_context(|| format!("failed to create '{}'", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(color);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Best);
    let mut writer = encoder.write_header().context("failed to write PNG header")?;
    writer
        .write_image_data(pixels)
        .context("failed to encode PNG image data")?;
    writer.finish().context("failed to finish PNG stream")?;
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HeaderReport<'a> {
    file_version: String,
    software_version: String,
    notes: &'a str,
    doi: &'a str,
    modality: &'static str,
    vendor: &'static str,
    beam_energy: f32,
    primary_angle: f32,
    secondary_angle: f32,
    rotation_sense: String,
    pijk: i8,
    effective_space_group: u8,
    crystals: Vec<CrystalReport>,
    bandwidth: usize,
    grid_dimension: usize,
    simulation_data: bool,
    simulation: Option<&'a SimulationMetadata>,
    simulation_grid: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CrystalReport {
    sg_number: u8,
    sg_setting: u8,
    sg_axis: u8,
    sg_cell: u8,
    origin: [f32; 3],
    lattice: [f32; 6],
    orientation: [f32; 4],
    weight: f32,
    atoms: Vec<AtomReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AtomReport {
    atomic_number: u8,
    symbol: Option<&'static str>,
    position: [f32; 3],
    occupancy: f32,
    debye_waller: f32,
}

impl From<&CrystalData> for CrystalReport {
    fn from(crystal: &CrystalData) -> Self {
        Self {
            sg_number: crystal.sg_number,
            sg_setting: crystal.sg_setting,
            sg_axis: crystal.sg_axis,
            sg_cell: crystal.sg_cell,
            origin: crystal.origin,
            lattice: crystal.lattice,
            orientation: crystal.orientation,
            weight: crystal.weight,
            atoms: crystal
                .atoms
                .iter()
                .map(|atom| AtomReport {
                    atomic_number: atom.atomic_number,
                    symbol: atom.element_symbol(),
                    position: atom.fractional_position(),
                    occupancy: atom.occupancy,
                    debye_waller: atom.debye_waller,
                })
                .collect(),
        }
    }
}

fn header_report(loaded: &LoadedSpectrum) -> HeaderReport<'_> {
    let header = &loaded.header;
    let material = &loaded.material;
    let simulation_grid = loaded.metadata.as_ref().map(|metadata| match metadata {
        SimulationMetadata::EmsoftElectronDiffraction(ed) => ed.lat_grid_name(),
    });
    HeaderReport {
        file_version: header.version_string(),
        software_version: header.software_version_string(),
        notes: &header.notes,
        doi: &header.doi,
        modality: header.modality.as_str(),
        vendor: header.vendor.as_str(),
        beam_energy: header.beam_energy,
        primary_angle: header.primary_angle,
        secondary_angle: header.secondary_angle,
        rotation_sense: material.rotation_sense.to_string(),
        pijk: material.pijk,
        effective_space_group: material.effective_space_group,
        crystals: material.crystals.iter().map(CrystalReport::from).collect(),
        bandwidth: loaded.spectrum.bandwidth(),
        grid_dimension: loaded.spectrum.dimension(),
        simulation_data: loaded.raw_metadata.is_some(),
        simulation: loaded.metadata.as_ref(),
        simulation_grid,
    }
}

pub(super) fn render_json_report(loaded: &LoadedSpectrum) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&header_report(loaded))
}

pub(super) fn render_text_report(loaded: &LoadedSpectrum) -> String {
    let report = header_report(loaded);
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_text_report(&mut out, &report, loaded.metadata.as_ref());
    out
}

fn write_text_report(
    out: &mut String,
    report: &HeaderReport<'_>,
    metadata: Option<&SimulationMetadata>,
) -> std::fmt::Result {
    writeln!(out, "file version {}", report.file_version)?;
    writeln!(out, "written with software version {}", report.software_version)?;
    writeln!(out, "notes   : `{}'", report.notes)?;
    writeln!(out, "doi     : `{}'", report.doi)?;
    writeln!(out, "modality: {}", report.modality)?;
    writeln!(out, "vendor  : {}", report.vendor)?;
    writeln!(out, "beam eng: {}", report.beam_energy)?;
    writeln!(out, "angle 1 : {}", report.primary_angle)?;
    writeln!(out, "angle 2 : {}", report.secondary_angle)?;
    writeln!(
        out,
        "bandwidth {} ({}x{} grid)",
        report.bandwidth, report.grid_dimension, report.grid_dimension
    )?;
    writeln!(
        out,
        "rotations are {} with pijk = {}",
        report.rotation_sense, report.pijk
    )?;
    writeln!(
        out,
        "material has {} crystals with effective sg# {}:",
        report.crystals.len(),
        report.effective_space_group
    )?;

    for crystal in &report.crystals {
        writeln!(out, "\tsg {} setting {}", crystal.sg_number, crystal.sg_setting)?;
        writeln!(
            out,
            "\t\taxis / cell choice: {} / {}",
            crystal.sg_axis, crystal.sg_cell
        )?;
        let [x, y, z] = crystal.origin;
        writeln!(out, "\t\tadditional origin shift: {x}, {y}, {z}")?;
        let [a, b, c, alpha, beta, gamma] = crystal.lattice;
        writeln!(out, "\t\tabc: {a}, {b}, {c}")?;
        writeln!(out, "\t\tabg: {alpha}, {beta}, {gamma}")?;
        let [w, qx, qy, qz] = crystal.orientation;
        writeln!(out, "\t\trot: {w}, {qx}, {qy}, {qz}")?;
        writeln!(out, "\t\twgt: {}", crystal.weight)?;
        writeln!(out, "\t\t{}:", crystal.atoms.len())?;
        for atom in &crystal.atoms {
            let [x, y, z] = atom.position;
            writeln!(
                out,
                "\t\t\t{} ({}): {} {} {} {} {}",
                atom.symbol.unwrap_or("?"),
                atom.atomic_number,
                x,
                y,
                z,
                atom.occupancy,
                atom.debye_waller
            )?;
        }
    }

    if !report.simulation_data {
        return Ok(());
    }
    writeln!(out, "has simulation data")?;
    match metadata {
        Some(SimulationMetadata::EmsoftElectronDiffraction(ed)) => {
            writeln!(out, "\tsigStart : {}", ed.sig_start)?;
            writeln!(out, "\tsigEnd   : {}", ed.sig_end)?;
            writeln!(out, "\tsigStep  : {}", ed.sig_step)?;
            writeln!(out, "\tomega    : {}", ed.omega)?;
            writeln!(out, "\tkeV      : {}", ed.kev)?;
            writeln!(out, "\teHistMin : {}", ed.e_hist_min)?;
            writeln!(out, "\teBinSize : {}", ed.e_bin_size)?;
            writeln!(out, "\tdepthMax : {}", ed.depth_max)?;
            writeln!(out, "\tdepthStep: {}", ed.depth_step)?;
            writeln!(out, "\tthickness: {}", ed.thickness)?;
            writeln!(out, "\ttotNumEl : {}", ed.total_electrons)?;
            writeln!(out, "\tnumSx    : {}", ed.num_sx)?;
            writeln!(out, "\tc1       : {}", ed.c1)?;
            writeln!(out, "\tc2       : {}", ed.c2)?;
            writeln!(out, "\tc3       : {}", ed.c3)?;
            writeln!(out, "\tsigDbDiff: {}", ed.sig_db_diff)?;
            writeln!(out, "\tdMin     : {}", ed.d_min)?;
            writeln!(out, "\tnumPx    : {}", ed.num_px)?;
            writeln!(out, "\tlatGridType: {}", ed.lat_grid_name())?;
        }
        None => writeln!(out, "\t(no interpretable layout)")?,
    }
    Ok(())
}
