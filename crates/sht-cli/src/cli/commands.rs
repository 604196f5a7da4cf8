use super::CliError;
use super::helpers::{quantize_hemispheres, render_json_report, render_text_report, write_png};
use anyhow::Context;
use sht_core::domain::{ExecutionMode, ShtErrorCategory};
use sht_core::spectrum::load_master_spectrum;
use sht_core::transform::{DiscreteHarmonicSynthesizer, GridLayoutKind};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum LayoutArg {
    Legendre,
    EqualArea,
}

impl From<LayoutArg> for GridLayoutKind {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::Legendre => Self::Legendre,
            LayoutArg::EqualArea => Self::EqualArea,
        }
    }
}

#[derive(clap::Args)]
pub(super) struct RenderArgs {
    /// Spherical harmonic file to read (*.sht)
    input: PathBuf,

    /// Location to write the north hemisphere image (*.png)
    north: PathBuf,

    /// Location to write the south hemisphere image (*.png)
    south: PathBuf,

    /// Sampling grid used for the hemisphere images
    #[arg(long, value_enum, default_value_t = LayoutArg::Legendre)]
    layout: LayoutArg,

    /// Evaluate grid rows on the calling thread only
    #[arg(long)]
    serial: bool,
}

#[derive(clap::Args)]
pub(super) struct InfoArgs {
    /// Spherical harmonic file to read (*.sht)
    input: PathBuf,

    /// Emit the report as JSON
    #[arg(long)]
    json: bool,
}

pub(super) fn run_render_command(args: RenderArgs) -> Result<i32, CliError> {
    let loaded = load_master_spectrum(&args.input)?;
    let spectrum = &loaded.spectrum;
    println!("{} {}", spectrum.kv(), spectrum.sig());

    let mode = if args.serial {
        ExecutionMode::Serial
    } else {
        ExecutionMode::Parallel
    };
    let kind = GridLayoutKind::from(args.layout);
    let synthesizer = DiscreteHarmonicSynthesizer::with_execution_mode(mode);
    let grids = spectrum.synthesize(&synthesizer, kind.layout())?;
    let dimension = grids.dimension();
    info!(
        bandwidth = spectrum.bandwidth(),
        dimension,
        layout = %kind,
        "synthesized hemispheres"
    );

    let (north, south) = quantize_hemispheres(&grids);
    write_png(&args.north, &north, dimension, dimension, 1)
        .with_context(|| format!("failed to write north hemisphere '{}'", args.north.display()))?;
    write_png(&args.south, &south, dimension, dimension, 1)
        .with_context(|| format!("failed to write south hemisphere '{}'", args.south.display()))?;

    print!("{}", render_text_report(&loaded));
    Ok(ShtErrorCategory::Success.exit_code())
}

pub(super) fn run_info_command(args: InfoArgs) -> Result<i32, CliError> {
    let loaded = load_master_spectrum(&args.input)?;
    if args.json {
        let report = render_json_report(&loaded).context("failed to serialize header report")?;
        println!("{report}");
    } else {
        print!("{}", render_text_report(&loaded));
    }
    Ok(ShtErrorCategory::Success.exit_code())
}
