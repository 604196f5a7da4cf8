use serde_json::Value;
use sht_core::format::{FileHeader, HarmonicData, MaterialDescriptor, Modality, ShtFile, Vendor};
use sht_core::numerics::{coefficient_count, coefficient_index};
use std::fs::{self, File};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const BANDWIDTH: usize = 4;
const DIMENSION: usize = 7;

fn write_fixture(path: &Path, coefficients: Vec<f64>) {
    let header = FileHeader {
        notes: "dipole".to_string(),
        modality: Modality::Ebsd,
        vendor: Vendor::Emsoft,
        beam_energy: 20.0,
        primary_angle: 70.0,
        ..FileHeader::default()
    };
    let harmonics = HarmonicData::new(BANDWIDTH, coefficients).expect("harmonics");
    ShtFile::from_parts(header, MaterialDescriptor::default(), None, harmonics)
        .save(path)
        .expect("fixture should be written");
}

fn dipole_coefficients() -> Vec<f64> {
    let mut coefficients = vec![0.0; coefficient_count(BANDWIDTH)];
    coefficients[coefficient_index(1, 0).expect("index")] = 1.0;
    coefficients
}

fn run_sht2mp(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sht2mp"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("sht2mp should launch")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are valid UTF-8")
}

fn decode_gray_png(path: &Path) -> (u32, u32, Vec<u8>) {
    let decoder = png::Decoder::new(File::open(path).expect("png should open"));
    let mut reader = decoder.read_info().expect("png header should decode");
    let mut buffer = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buffer).expect("png frame should decode");
    assert_eq!(info.color_type, png::ColorType::Grayscale);
    assert_eq!(info.bit_depth, png::BitDepth::Eight);
    buffer.truncate(info.buffer_size());
    (info.width, info.height, buffer)
}

#[test]
fn render_writes_both_hemispheres_and_reports_the_header() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = temp.path().join("dipole.sht");
    let north = temp.path().join("north.png");
    let south = temp.path().join("south.png");
    write_fixture(&input, dipole_coefficients());

    let output = run_sht2mp(&["render", path_arg(&input), path_arg(&north), path_arg(&south)]);
    assert!(
        output.status.success(),
        "render should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().next(), Some("20 70"));
    assert!(stdout.contains("notes   : `dipole'"));
    assert!(stdout.contains("material has 0 crystals"));

    let (width, height, north_pixels) = decode_gray_png(&north);
    assert_eq!((width as usize, height as usize), (DIMENSION, DIMENSION));
    let (_, _, south_pixels) = decode_gray_png(&south);
    assert_eq!(north_pixels.len(), DIMENSION * DIMENSION);
    assert!(north_pixels.contains(&255));
    assert!(south_pixels.contains(&0));
    assert!(north_pixels.iter().all(|&value| value >= 128));
    assert!(south_pixels.iter().all(|&value| value < 128));
}

#[test]
fn serial_and_equal_area_options_are_accepted() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = temp.path().join("dipole.sht");
    let north = temp.path().join("north.png");
    let south = temp.path().join("south.png");
    write_fixture(&input, dipole_coefficients());

    let output = run_sht2mp(&[
        "render",
        path_arg(&input),
        path_arg(&north),
        path_arg(&south),
        "--layout",
        "equal-area",
        "--serial",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    // The equal-area centre cell is the pole, where the dipole peaks.
    let (_, _, north_pixels) = decode_gray_png(&north);
    let centre = (DIMENSION / 2) * DIMENSION + DIMENSION / 2;
    assert_eq!(north_pixels[centre], 255);
}

#[test]
fn all_zero_coefficients_render_black_images() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = temp.path().join("zero.sht");
    let north = temp.path().join("north.png");
    let south = temp.path().join("south.png");
    write_fixture(&input, vec![0.0; coefficient_count(BANDWIDTH)]);

    let output = run_sht2mp(&["render", path_arg(&input), path_arg(&north), path_arg(&south)]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    for path in [&north, &south] {
        let (_, _, pixels) = decode_gray_png(path);
        assert!(pixels.iter().all(|&value| value == 0));
    }
}

#[test]
fn missing_input_exits_with_io_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = temp.path().join("absent.sht");
    let north = temp.path().join("north.png");
    let south = temp.path().join("south.png");

    let output = run_sht2mp(&["render", path_arg(&input), path_arg(&north), path_arg(&south)]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: [IO.SHT_READ]"), "{stderr}");
    assert!(stderr.contains("FATAL EXIT CODE: 3"), "{stderr}");
    assert!(!north.exists());
}

#[test]
fn corrupt_input_exits_with_format_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = temp.path().join("corrupt.sht");
    fs::write(&input, b"NOPE and some more bytes").expect("corrupt file should be written");
    let north = temp.path().join("north.png");
    let south = temp.path().join("south.png");

    let output = run_sht2mp(&["render", path_arg(&input), path_arg(&north), path_arg(&south)]);
    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: [FORMAT.MAGIC]"), "{stderr}");
    assert!(stderr.contains("FATAL EXIT CODE: 4"), "{stderr}");
}

#[test]
fn unwritable_image_path_reports_cli_io_failure() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = temp.path().join("dipole.sht");
    write_fixture(&input, dipole_coefficients());
    let north = temp.path().join("missing-dir/north.png");
    let south = temp.path().join("south.png");

    let output = run_sht2mp(&["render", path_arg(&input), path_arg(&north), path_arg(&south)]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: [IO.CLI] failed to write north hemisphere"), "{stderr}");
}

#[test]
fn info_json_describes_the_container() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = temp.path().join("dipole.sht");
    write_fixture(&input, dipole_coefficients());

    let output = run_sht2mp(&["info", path_arg(&input), "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["notes"], "dipole");
    assert_eq!(report["vendor"], "EMsoft");
    assert_eq!(report["beamEnergy"], 20.0);
    assert_eq!(report["bandwidth"], BANDWIDTH);
    assert_eq!(report["gridDimension"], DIMENSION);
}

#[test]
fn missing_arguments_exit_with_usage_code() {
    let output = run_sht2mp(&[]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: [INPUT.CLI_USAGE]"), "{stderr}");

    let output = run_sht2mp(&["render", "only-one.sht"]);
    assert_eq!(output.status.code(), Some(2));

    let output = run_sht2mp(&["--help"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("render"));
}
