// src/transform/sprite.rs

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::debug;

use super::svg::{optimize_svg, parse_root};
use super::{AssetFile, Merge, StepContext};

/// Merges every incoming SVG into one "stack" sprite.
///
/// Each icon becomes a nested `<svg id="<file stem>">` that is hidden
/// unless targeted, so `sprite.svg#arrow` renders the `arrow` icon. Non-SVG
/// files are passed through untouched. An icon that does not parse fails
/// the sprite.
#[derive(Debug)]
pub struct SvgSprite {
    sprite: PathBuf,
}

impl SvgSprite {
    pub fn new(sprite: &str) -> Result<Self> {
        if sprite.trim().is_empty() {
            bail!("sprite file name must not be empty");
        }
        Ok(Self {
            sprite: PathBuf::from(sprite),
        })
    }

    fn icon(&self, file: &AssetFile) -> Result<String> {
        let id = file
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let optimized = optimize_svg(file.text()?)?;
        let root = parse_root(&optimized)?;

        let view_box_attr = match root.view_box() {
            Some(vb) => format!(" viewBox=\"{vb}\""),
            None => String::new(),
        };
        Ok(format!("<svg id=\"{id}\"{view_box_attr}>{}</svg>", root.inner))
    }
}

impl Merge for SvgSprite {
    fn name(&self) -> &'static str {
        "svg_sprite"
    }

    fn merge(&self, files: Vec<AssetFile>, _ctx: &StepContext) -> Result<Vec<AssetFile>> {
        let (mut svgs, mut rest): (Vec<AssetFile>, Vec<AssetFile>) = files
            .into_iter()
            .partition(|f| f.extension().as_deref() == Some("svg"));

        if svgs.is_empty() {
            debug!("no svg files; sprite not written");
            return Ok(rest);
        }

        svgs.sort_by(|a, b| a.path.cmp(&b.path));

        let mut body = String::new();
        let mut sprite = AssetFile::new(self.sprite.clone(), Vec::new());
        for svg in &svgs {
            let icon = self
                .icon(svg)
                .with_context(|| format!("adding {} to the sprite", svg.path.display()))?;
            body.push_str(&icon);
            for source in &svg.sources {
                sprite.add_source(source.clone());
            }
        }

        sprite.set_text(format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\"><style>:root>svg{{display:none}}:root>svg:target{{display:block}}</style>{body}</svg>"
        ));
        debug!(icons = svgs.len(), sprite = %self.sprite.display(), "built sprite");

        rest.push(sprite);
        Ok(rest)
    }
}
