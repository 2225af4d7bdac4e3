// src/transform/css.rs

//! CSS steps: `@import` inlining, vendor prefixing and minification.
//!
//! Prefixing and minification are done by `lightningcss`; browser targets
//! come from the step's `browsers` table (`chrome = "95"`, `safari = "13.1"`).

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use regex::Regex;
use tracing::debug;

use super::sourcemap::{compose, position_of, MappedText};
use super::{AssetFile, StepContext, Transform};

/// Matches a comment (group 1) or an `@import` rule (target in group 2,
/// media query in group 3). Comments come first so imports inside them are
/// consumed as part of the comment.
fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?s)(/\*.*?\*/)|@import\s+(?:url\(\s*)?["']?([^"')\s;]+)["']?\s*\)?\s*([^;]*);"#,
        )
        .expect("static import regex")
    })
}

fn is_remote(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://") || target.starts_with("//")
}

/// Inlines local `@import` rules.
///
/// Imports are resolved against the importing file's directory. A file is
/// inlined at most once per output file, which also breaks import cycles.
/// Remote imports and imports inside comments are left untouched. The
/// output carries a map back to every inlined file.
#[derive(Debug, Default)]
pub struct CssImport;

impl CssImport {
    pub fn new() -> Self {
        Self
    }

    fn inline(
        &self,
        css: &str,
        path: &Path,
        ctx: &StepContext,
        seen: &mut HashSet<PathBuf>,
        out: &mut MappedText,
    ) -> Result<()> {
        let source = out.source_index(path);
        let dir = path.parent().unwrap_or(&ctx.root).to_path_buf();
        let mut last = 0;

        let keep = |out: &mut MappedText, range: std::ops::Range<usize>| {
            let (line, column) = position_of(css, range.start);
            out.push_mapped(&css[range], source, line, column);
        };

        for caps in import_regex().captures_iter(css) {
            let Some(whole) = caps.get(0).map(|m| m.range()) else {
                continue;
            };
            if caps.get(1).is_some() {
                // A comment; copied with the surrounding text.
                continue;
            }
            let target = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            let media = caps.get(3).map(|m| m.as_str().trim()).unwrap_or_default();

            keep(out, last..whole.start);
            last = whole.end;

            if is_remote(target) {
                keep(out, whole);
                continue;
            }

            let imported_path = dir.join(target);
            if !seen.insert(imported_path.clone()) {
                debug!(import = %imported_path.display(), "already inlined; skipping");
                continue;
            }

            let imported = ctx
                .fs
                .read_to_string(&imported_path)
                .with_context(|| format!("resolving @import '{target}'"))?;

            if media.is_empty() {
                self.inline(&imported, &imported_path, ctx, seen, out)?;
            } else {
                out.push_unmapped(&format!("@media {media} {{\n"));
                self.inline(&imported, &imported_path, ctx, seen, out)?;
                out.push_unmapped("\n}");
            }
        }

        keep(out, last..css.len());
        Ok(())
    }
}

impl Transform for CssImport {
    fn name(&self) -> &'static str {
        "css_import"
    }

    fn apply(&self, mut file: AssetFile, ctx: &StepContext) -> Result<Vec<AssetFile>> {
        let path = file
            .origin
            .clone()
            .unwrap_or_else(|| ctx.root.join(&file.path));

        let mut seen = HashSet::new();
        seen.insert(path.clone());

        let mut out = MappedText::new();
        self.inline(file.text()?, &path, ctx, &mut seen, &mut out)?;

        let imported: Vec<PathBuf> = out
            .sources()
            .iter()
            .skip(1)
            .map(|p| ctx.project_relative(p))
            .collect();
        for source in imported {
            file.add_source(source);
        }

        let (text, map) = out.finish(&ctx.root)?;
        file.set_text(text);
        file.map = Some(map);
        Ok(vec![file])
    }
}

/// Adds vendor prefixes for the configured browser targets.
/// Output stays readable.
#[derive(Debug)]
pub struct Autoprefix {
    targets: Targets,
}

impl Autoprefix {
    pub fn from_config(browsers: &BTreeMap<String, String>) -> Result<Self> {
        let browsers = browsers_from_config(browsers).map_err(|e| anyhow!(e))?;
        Ok(Self {
            targets: Targets::from(browsers),
        })
    }
}

impl Transform for Autoprefix {
    fn name(&self) -> &'static str {
        "autoprefix"
    }

    fn apply(&self, mut file: AssetFile, ctx: &StepContext) -> Result<Vec<AssetFile>> {
        process_css(&mut file, self.targets, false, ctx)?;
        Ok(vec![file])
    }
}

/// Minifies CSS and drops comments, prefixing for the configured targets.
#[derive(Debug)]
pub struct MinifyCss {
    targets: Targets,
}

impl MinifyCss {
    pub fn from_config(browsers: &BTreeMap<String, String>) -> Result<Self> {
        let browsers = browsers_from_config(browsers).map_err(|e| anyhow!(e))?;
        Ok(Self {
            targets: Targets::from(browsers),
        })
    }
}

impl Transform for MinifyCss {
    fn name(&self) -> &'static str {
        "minify_css"
    }

    fn apply(&self, mut file: AssetFile, ctx: &StepContext) -> Result<Vec<AssetFile>> {
        process_css(&mut file, self.targets, true, ctx)?;
        Ok(vec![file])
    }
}

/// Run the file through lightningcss and chain the printed map onto the
/// file's existing one.
fn process_css(file: &mut AssetFile, targets: Targets, minify: bool, ctx: &StepContext) -> Result<()> {
    let filename = file.map_source_name();
    let source = file.text()?.to_string();
    let mut stylesheet = StyleSheet::parse(
        &source,
        ParserOptions {
            filename: filename.clone(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| anyhow!("CSS parse error: {e}"))?;

    stylesheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| anyhow!("CSS transform error: {e}"))?;

    let mut map = SourceMap::new(&ctx.root.to_string_lossy());
    map.add_source(&filename);
    if let Err(e) = map.set_source_content(0, &source) {
        debug!("could not embed CSS source: {e:?}");
    }

    let result = stylesheet
        .to_css(PrinterOptions {
            minify,
            targets,
            source_map: Some(&mut map),
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("CSS print error: {e}"))?;

    let composed = compose(&ctx.root, map, file.map.as_deref())?;
    file.set_text(result.code);
    file.map = Some(composed);
    Ok(())
}

/// Browser targets used when a step configures none.
fn default_browsers() -> Browsers {
    Browsers {
        chrome: Some(version(95, 0, 0)),
        edge: Some(version(95, 0, 0)),
        firefox: Some(version(90, 0, 0)),
        safari: Some(version(13, 0, 0)),
        ios_saf: Some(version(13, 0, 0)),
        ..Browsers::default()
    }
}

fn version(major: u32, minor: u32, patch: u32) -> u32 {
    (major << 16) | (minor << 8) | patch
}

fn parse_version(raw: &str) -> std::result::Result<u32, String> {
    let mut parts = raw.trim().split('.');
    let mut next = |what: &str| -> std::result::Result<u32, String> {
        match parts.next() {
            None => Ok(0),
            Some(p) => p
                .parse::<u32>()
                .map_err(|_| format!("invalid {what} version component in {raw:?}")),
        }
    };

    let major = next("major")?;
    let minor = next("minor")?;
    let patch = next("patch")?;
    if minor > 255 || patch > 255 {
        return Err(format!("version {raw:?} is out of range"));
    }
    Ok(version(major, minor, patch))
}

/// Parse a `{ browser = "version" }` table into lightningcss targets.
///
/// An empty table yields the default targets.
pub fn browsers_from_config(
    cfg: &BTreeMap<String, String>,
) -> std::result::Result<Browsers, String> {
    if cfg.is_empty() {
        return Ok(default_browsers());
    }

    let mut browsers = Browsers::default();
    for (name, raw) in cfg {
        let v = Some(parse_version(raw)?);
        match name.as_str() {
            "android" => browsers.android = v,
            "chrome" => browsers.chrome = v,
            "edge" => browsers.edge = v,
            "firefox" => browsers.firefox = v,
            "ie" => browsers.ie = v,
            "ios_saf" | "ios" => browsers.ios_saf = v,
            "opera" => browsers.opera = v,
            "safari" => browsers.safari = v,
            "samsung" => browsers.samsung = v,
            other => return Err(format!("unknown browser '{other}'")),
        }
    }
    Ok(browsers)
}
