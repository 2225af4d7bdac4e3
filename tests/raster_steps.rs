// tests/raster_steps.rs

mod common;
use crate::common::builders::TaskConfigBuilder;
use crate::common::{init_tracing, mock_fs, root};

use std::error::Error;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use assetflow::config::StepConfig;
use assetflow::fs::mock::MockFileSystem;
use assetflow::fs::FileSystem;
use assetflow::transform::{RunReport, TransformRunner};

type TestResult = Result<(), Box<dyn Error>>;

fn gradient(size: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(size, size, |x, y| {
        Rgba([(x * 4) as u8, (y * 4) as u8, 128, 255])
    }))
}

/// A PNG written with the cheapest settings, so a careful re-encode wins.
fn loose_png(size: u32) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buf, CompressionType::Fast, FilterType::NoFilter);
    gradient(size).write_with_encoder(encoder)?;
    Ok(buf)
}

fn with_file(path: &str, bytes: &[u8]) -> (MockFileSystem, Arc<dyn FileSystem>) {
    let (mock, fs) = mock_fs(&[]);
    mock.add_file(root().join(path), bytes);
    (mock, fs)
}

fn run(input: &str, step: StepConfig, fs: Arc<dyn FileSystem>) -> Result<RunReport, Box<dyn Error>> {
    let task = TaskConfigBuilder::new(input, "dist/img").step(step).build();
    Ok(TransformRunner::from_config("images", &task, root(), fs)?.execute())
}

#[test]
fn webp_converts_and_renames() -> TestResult {
    init_tracing();
    let (mock, fs) = with_file("src/img/a.png", &loose_png(16)?);

    let report = run("src/img/*.png", StepConfig::Webp, fs)?;

    assert!(report.is_success(), "errors: {:?}", report.errors);
    assert_eq!(report.written, vec![PathBuf::from("dist/img/a.webp")]);
    let bytes = mock.contents(root().join("dist/img/a.webp")).ok_or("webp not written")?;
    assert_eq!(image::guess_format(&bytes)?, ImageFormat::WebP);
    let decoded = image::load_from_memory(&bytes)?;
    assert_eq!((decoded.width(), decoded.height()), (16, 16));
    Ok(())
}

#[test]
fn avif_converts_and_renames() -> TestResult {
    init_tracing();
    let (mock, fs) = with_file("src/img/a.png", &loose_png(16)?);

    let report = run(
        "src/img/*.png",
        StepConfig::Avif {
            quality: 60,
            speed: 10,
        },
        fs,
    )?;

    assert!(report.is_success(), "errors: {:?}", report.errors);
    assert_eq!(report.written, vec![PathBuf::from("dist/img/a.avif")]);
    let bytes = mock.contents(root().join("dist/img/a.avif")).ok_or("avif not written")?;
    // ISO-BMFF `ftyp` box with the `avif` brand.
    assert_eq!(&bytes[4..8], b"ftyp");
    assert_eq!(&bytes[8..12], b"avif");
    Ok(())
}

#[test]
fn undecodable_input_fails_only_that_file() -> TestResult {
    let (mock, fs) = with_file("src/img/a.png", &loose_png(8)?);
    mock.add_file(root().join("src/img/broken.png"), b"not a png");

    let report = run("src/img/*.png", StepConfig::Webp, fs)?;

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].to_string().contains("broken.png"));
    assert_eq!(report.written, vec![PathBuf::from("dist/img/a.webp")]);
    Ok(())
}

#[test]
fn optimize_keeps_the_smaller_encoding() -> TestResult {
    init_tracing();
    let original = loose_png(64)?;
    let (mock, fs) = with_file("src/img/a.png", &original);

    let report = run("src/img/*.png", StepConfig::OptimizeImage { jpeg_quality: 80 }, fs)?;

    assert!(report.is_success(), "errors: {:?}", report.errors);
    assert_eq!(report.written, vec![PathBuf::from("dist/img/a.png")]);
    let optimized = mock.contents(root().join("dist/img/a.png")).ok_or("png not written")?;
    assert!(optimized.len() < original.len());
    let decoded = image::load_from_memory(&optimized)?;
    assert_eq!(decoded.to_rgba8(), gradient(64).to_rgba8());

    // Optimizing the optimized file finds nothing smaller and keeps it as is.
    let (again, fs) = with_file("src/img/a.png", &optimized);
    let report = run("src/img/*.png", StepConfig::OptimizeImage { jpeg_quality: 80 }, fs)?;
    assert!(report.is_success());
    assert_eq!(again.contents(root().join("dist/img/a.png")), Some(optimized));
    Ok(())
}

#[test]
fn optimize_reencodes_jpeg_at_configured_quality() -> TestResult {
    let mut original = Vec::new();
    let rgb = DynamicImage::ImageRgb8(gradient(64).to_rgb8());
    rgb.write_with_encoder(image::codecs::jpeg::JpegEncoder::new_with_quality(
        Cursor::new(&mut original),
        100,
    ))?;
    let (mock, fs) = with_file("src/img/photo.jpg", &original);

    let report = run("src/img/*.jpg", StepConfig::OptimizeImage { jpeg_quality: 50 }, fs)?;

    assert!(report.is_success(), "errors: {:?}", report.errors);
    let optimized = mock.contents(root().join("dist/img/photo.jpg")).ok_or("jpeg not written")?;
    assert!(optimized.len() < original.len());
    assert_eq!(image::guess_format(&optimized)?, ImageFormat::Jpeg);
    Ok(())
}

#[test]
fn optimize_minifies_svg_and_passes_other_files_through() -> TestResult {
    let (mock, fs) = mock_fs(&[
        (
            "src/img/logo.svg",
            "<?xml version=\"1.0\"?>\n<!-- logo -->\n<svg viewBox=\"0 0 4 4\">\n  <text><tspan>a</tspan> <tspan>b</tspan></text>\n</svg>\n",
        ),
        ("src/img/notes.txt", "keep   me"),
    ]);

    let report = run("src/img/*", StepConfig::OptimizeImage { jpeg_quality: 80 }, fs)?;

    assert!(report.is_success(), "errors: {:?}", report.errors);
    assert_eq!(
        mock.contents(root().join("dist/img/logo.svg")),
        Some(
            b"<svg viewBox=\"0 0 4 4\"><text><tspan>a</tspan> <tspan>b</tspan></text></svg>".to_vec()
        )
    );
    assert_eq!(
        mock.contents(root().join("dist/img/notes.txt")),
        Some(b"keep   me".to_vec())
    );
    Ok(())
}
