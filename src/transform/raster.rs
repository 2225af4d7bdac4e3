// src/transform/raster.rs

//! Image steps backed by the `image` crate.
//!
//! `webp` and `avif` convert raster inputs and rename them to the new
//! extension. `optimize_image` re-encodes PNG and JPEG at maximum
//! compression and keeps whichever of the original and the re-encoded bytes
//! is smaller; SVGs go through [`optimize_svg`].

use std::io::Cursor;

use anyhow::{Context, Result};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use super::svg::optimize_svg;
use super::{AssetFile, StepContext, Transform};

fn decode(file: &AssetFile) -> Result<DynamicImage> {
    image::load_from_memory(&file.contents)
        .with_context(|| format!("decoding image {}", file.path.display()))
}

#[derive(Debug, Default)]
pub struct ToWebp;

impl Transform for ToWebp {
    fn name(&self) -> &'static str {
        "webp"
    }

    fn apply(&self, mut file: AssetFile, _ctx: &StepContext) -> Result<Vec<AssetFile>> {
        let img = decode(&file)?;
        // The WebP encoder only accepts 8-bit RGB(A).
        let rgba = DynamicImage::ImageRgba8(img.to_rgba8());

        let mut buf = Vec::new();
        rgba.write_to(&mut Cursor::new(&mut buf), ImageFormat::WebP)
            .context("encoding webp")?;

        file.replace_unmapped(buf);
        file.path.set_extension("webp");
        Ok(vec![file])
    }
}

#[derive(Debug)]
pub struct ToAvif {
    pub quality: u8,
    pub speed: u8,
}

impl Transform for ToAvif {
    fn name(&self) -> &'static str {
        "avif"
    }

    fn apply(&self, mut file: AssetFile, _ctx: &StepContext) -> Result<Vec<AssetFile>> {
        let img = decode(&file)?;
        let rgba = DynamicImage::ImageRgba8(img.to_rgba8());

        let mut buf = Vec::new();
        let encoder = AvifEncoder::new_with_speed_quality(&mut buf, self.speed, self.quality);
        rgba.write_with_encoder(encoder).context("encoding avif")?;

        file.replace_unmapped(buf);
        file.path.set_extension("avif");
        Ok(vec![file])
    }
}

#[derive(Debug)]
pub struct OptimizeImage {
    pub jpeg_quality: u8,
}

impl OptimizeImage {
    fn reencode(&self, file: &AssetFile) -> Result<Option<Vec<u8>>> {
        let format = match file.extension().as_deref() {
            Some("png") => ImageFormat::Png,
            Some("jpg") | Some("jpeg") => ImageFormat::Jpeg,
            _ => return Ok(None),
        };

        let img = decode(file)?;
        let mut buf = Vec::new();
        match format {
            ImageFormat::Png => {
                let encoder = PngEncoder::new_with_quality(
                    &mut buf,
                    CompressionType::Best,
                    FilterType::Adaptive,
                );
                img.write_with_encoder(encoder).context("encoding png")?;
            }
            _ => {
                // JPEG has no alpha channel.
                let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality);
                rgb.write_with_encoder(encoder).context("encoding jpeg")?;
            }
        }
        Ok(Some(buf))
    }
}

impl Transform for OptimizeImage {
    fn name(&self) -> &'static str {
        "optimize_image"
    }

    fn apply(&self, mut file: AssetFile, _ctx: &StepContext) -> Result<Vec<AssetFile>> {
        if file.extension().as_deref() == Some("svg") {
            let optimized = optimize_svg(file.text()?)?;
            file.replace_unmapped(optimized.into_bytes());
            return Ok(vec![file]);
        }

        match self.reencode(&file)? {
            Some(encoded) if encoded.len() < file.contents.len() => {
                debug!(
                    file = %file.path.display(),
                    before = file.contents.len(),
                    after = encoded.len(),
                    "re-encoded image is smaller"
                );
                file.replace_unmapped(encoded);
            }
            Some(_) => {
                debug!(file = %file.path.display(), "original image already smallest");
            }
            None => {
                debug!(file = %file.path.display(), "not an optimizable image; passing through");
            }
        }
        Ok(vec![file])
    }
}
