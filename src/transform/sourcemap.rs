// src/transform/sourcemap.rs

//! Source maps.
//!
//! Steps that rewrite CSS or JS keep a v3 map on the [`AssetFile`] and
//! compose it with whatever map the file already carried, so the final
//! map points at the original sources. `parcel_sourcemap` (the map type
//! lightningcss prints into) does the encoding and the composition.
//! [`MappedText`] covers steps that assemble output from pieces of source
//! files themselves, such as `@import` inlining.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use parcel_sourcemap::{OriginalLocation, SourceMap};
use serde::{Deserialize, Serialize};

use super::{AssetFile, StepContext, Transform};

/// A generated position and the source position it came from. Lines are
/// zero-based; columns count UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source: usize,
    pub original_line: u32,
    pub original_column: u32,
}

/// Text built from pieces of source files, remembering where each piece
/// came from.
#[derive(Debug, Default)]
pub struct MappedText {
    text: String,
    line: u32,
    column: u32,
    sources: Vec<PathBuf>,
    mappings: Vec<Mapping>,
}

impl MappedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `path` in the source list, registering it on first use.
    pub fn source_index(&mut self, path: &Path) -> usize {
        match self.sources.iter().position(|s| s == path) {
            Some(idx) => idx,
            None => {
                self.sources.push(path.to_path_buf());
                self.sources.len() - 1
            }
        }
    }

    /// Append text that has no counterpart in any source.
    pub fn push_unmapped(&mut self, piece: &str) {
        for c in piece.chars() {
            self.advance(c);
        }
        self.text.push_str(piece);
    }

    /// Append `piece`, which starts at `line:column` of `source`. A mapping
    /// is recorded at the start of the piece and of every line in it.
    pub fn push_mapped(&mut self, piece: &str, source: usize, line: u32, column: u32) {
        let (mut line, mut column) = (line, column);
        let mut at_line_start = true;
        for c in piece.chars() {
            if at_line_start {
                self.mappings.push(Mapping {
                    generated_line: self.line,
                    generated_column: self.column,
                    source,
                    original_line: line,
                    original_column: column,
                });
                at_line_start = false;
            }
            self.advance(c);
            if c == '\n' {
                line += 1;
                column = 0;
                at_line_start = true;
            } else {
                column += c.len_utf16() as u32;
            }
        }
        self.text.push_str(piece);
    }

    fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += c.len_utf16() as u32;
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Split into the assembled text and its map as v3 JSON. Source paths
    /// are written relative to `root`.
    pub fn finish(self, root: &Path) -> Result<(String, String)> {
        let mut map = SourceMap::new(&root.to_string_lossy());
        let indices: Vec<u32> = self
            .sources
            .iter()
            .map(|s| map.add_source(&s.to_string_lossy()))
            .collect();
        for m in &self.mappings {
            let Some(&source) = indices.get(m.source) else {
                continue;
            };
            map.add_mapping(
                m.generated_line,
                m.generated_column,
                Some(OriginalLocation::new(
                    m.original_line,
                    m.original_column,
                    source,
                    None,
                )),
            );
        }
        let json = map_json(&mut map)?;
        Ok((self.text, json))
    }
}

/// Zero-based line and UTF-16 column of byte offset `at` in `text`.
pub fn position_of(text: &str, at: usize) -> (u32, u32) {
    let before = &text[..at];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].encode_utf16().count() as u32;
    (line, column)
}

/// Chain `generated` (a map from a step's output to its input) onto the
/// map the input already carried, if any.
pub fn compose(root: &Path, mut generated: SourceMap, previous: Option<&str>) -> Result<String> {
    if let Some(previous) = previous {
        let mut previous = SourceMap::from_json(&root.to_string_lossy(), previous)
            .map_err(|e| anyhow!("reading previous source map: {e:?}"))?;
        generated
            .extends(&mut previous)
            .map_err(|e| anyhow!("composing source maps: {e:?}"))?;
    }
    map_json(&mut generated)
}

/// Same as [`compose`] for a map that arrived as JSON.
pub fn compose_json(root: &Path, generated: &str, previous: Option<&str>) -> Result<String> {
    let generated = SourceMap::from_json(&root.to_string_lossy(), generated)
        .map_err(|e| anyhow!("reading generated source map: {e:?}"))?;
    compose(root, generated, previous)
}

fn map_json(map: &mut SourceMap) -> Result<String> {
    map.to_json(None)
        .map_err(|e| anyhow!("serializing source map: {e:?}"))
}

/// The shape of a map as read back from JSON.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
    #[serde(default)]
    sources: Vec<Option<String>>,
    #[serde(default)]
    sources_content: Vec<Option<String>>,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    mappings: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMapV3 {
    version: u8,
    file: String,
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
    names: Vec<String>,
    mappings: String,
}

/// Writes `<file>.map` next to the file and links it with a
/// `sourceMappingURL` comment. Only CSS and JS files are mapped.
///
/// Files that reach this step without a map get one that maps each line
/// to the same line of the file they were read from.
#[derive(Debug, Default)]
pub struct SourceMapStep;

impl SourceMapStep {
    fn line_map(&self, file: &AssetFile, ctx: &StepContext) -> Result<String> {
        let mut mapped = MappedText::new();
        match &file.origin {
            Some(origin) => {
                let idx = mapped.source_index(origin);
                mapped.push_mapped(file.text()?, idx, 0, 0);
            }
            None => {
                for source in &file.sources {
                    mapped.source_index(&ctx.root.join(source));
                }
            }
        }
        let (_, json) = mapped.finish(&ctx.root)?;
        Ok(json)
    }

    fn build_map(&self, json: &str, file_name: &str, ctx: &StepContext) -> Result<String> {
        let raw: RawSourceMap = serde_json::from_str(json).context("reading source map")?;

        let mut sources = Vec::with_capacity(raw.sources.len());
        let mut contents = Vec::with_capacity(raw.sources.len());
        for (i, source) in raw.sources.iter().enumerate() {
            let source = source.as_deref().unwrap_or_default();
            let rel = project_path(source, ctx);
            let embedded = raw
                .sources_content
                .get(i)
                .cloned()
                .flatten()
                .filter(|c| !c.is_empty());
            let content = embedded.or_else(|| ctx.fs.read_to_string(&ctx.root.join(&rel)).ok());
            sources.push(source_url(&rel));
            contents.push(content);
        }

        let map = SourceMapV3 {
            version: 3,
            file: file_name.to_string(),
            sources,
            sources_content: contents,
            names: raw.names,
            mappings: raw.mappings,
        };
        serde_json::to_string(&map).context("serializing source map")
    }
}

/// Project-relative path of a map source, which may be absolute or
/// already relative to the root.
fn project_path(source: &str, ctx: &StepContext) -> PathBuf {
    let path = Path::new(source);
    if path.is_absolute() {
        ctx.project_relative(path)
    } else {
        PathBuf::from(source.trim_start_matches("./"))
    }
}

/// Project-rooted URL of a source (`/src/css/a.css`).
fn source_url(source: &Path) -> String {
    format!("/{}", super::selector::to_slash(source).trim_start_matches('/'))
}

impl Transform for SourceMapStep {
    fn name(&self) -> &'static str {
        "sourcemap"
    }

    fn apply(&self, mut file: AssetFile, ctx: &StepContext) -> Result<Vec<AssetFile>> {
        let is_css = match file.extension().as_deref() {
            Some("css") => true,
            Some("js") | Some("mjs") => false,
            _ => return Ok(vec![file]),
        };

        let file_name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let map_name = format!("{file_name}.map");

        let json = match file.map.take() {
            Some(json) => json,
            None => self.line_map(&file, ctx)?,
        };
        let map_json = self.build_map(&json, &file_name, ctx)?;

        let mut text = file.text()?.trim_end().to_string();
        if is_css {
            text.push_str(&format!("\n/*# sourceMappingURL={map_name} */\n"));
        } else {
            text.push_str(&format!("\n//# sourceMappingURL={map_name}\n"));
        }
        file.set_text(text);

        let map_path: PathBuf = match file.path.parent() {
            Some(parent) => parent.join(&map_name),
            None => PathBuf::from(&map_name),
        };
        let mut map = AssetFile::new(map_path, map_json.into_bytes());
        map.sources = file.sources.clone();

        Ok(vec![file, map])
    }
}
