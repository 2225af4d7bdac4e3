// src/transform/js.rs

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use super::sourcemap::compose_json;
use super::{AssetFile, StepContext, Transform};

/// Parses the file as an ES module and emits mangled, compressed output
/// plus a map back to the input.
#[derive(Debug, Default)]
pub struct MinifyJs;

impl Transform for MinifyJs {
    fn name(&self) -> &'static str {
        "minify_js"
    }

    fn apply(&self, mut file: AssetFile, ctx: &StepContext) -> Result<Vec<AssetFile>> {
        let name = PathBuf::from(file.map_source_name());
        let minified = minify_js(file.text()?, Some(name))?;
        let map = match &minified.map {
            Some(map) => Some(compose_json(&ctx.root, map, file.map.as_deref())?),
            None => None,
        };
        file.set_text(minified.code);
        file.map = map;
        Ok(vec![file])
    }
}

#[derive(Debug)]
pub struct MinifiedJs {
    pub code: String,
    /// v3 JSON, present when a source name was given.
    pub map: Option<String>,
}

pub fn minify_js(source: &str, source_name: Option<PathBuf>) -> Result<MinifiedJs> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if let Some(err) = ret.errors.first() {
        return Err(anyhow!(
            "JS parse error: {err} ({} error(s) total)",
            ret.errors.len()
        ));
    }

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    let generated = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            source_map_path: source_name,
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program);

    Ok(MinifiedJs {
        code: generated.code,
        map: generated.map.map(|m| m.to_json_string()),
    })
}
