// src/transform/html.rs

//! HTML steps: partial includes and whitespace/comment minification.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use serde_json::Value;

use super::{AssetFile, StepContext, Transform};

const MAX_INCLUDE_DEPTH: usize = 32;

/// Expands `@@include('path')` directives.
///
/// An optional JSON object after the path binds variables inside the
/// included file: `@@include('card.html', {"title": "Hi"})` replaces
/// `@@title` in `card.html`. Paths resolve against `basepath` (relative to
/// the project root) or, when unset, against the including file. A
/// directive that does not parse fails the file.
#[derive(Debug)]
pub struct FileInclude {
    prefix: String,
    basepath: Option<PathBuf>,
    directive: Regex,
}

/// The arguments of one directive; `end` is the byte offset just past its
/// closing parenthesis.
#[derive(Debug)]
struct Directive<'t> {
    target: &'t str,
    params: Option<Value>,
    end: usize,
}

impl FileInclude {
    pub fn new(prefix: &str, basepath: Option<PathBuf>) -> Result<Self> {
        let pattern = format!(r"{}include\(", regex::escape(prefix));
        let directive = Regex::new(&pattern)
            .with_context(|| format!("building include pattern for prefix {prefix:?}"))?;
        Ok(Self {
            prefix: prefix.to_string(),
            basepath,
            directive,
        })
    }

    fn resolve(&self, target: &str, current_dir: &Path, ctx: &StepContext) -> PathBuf {
        match &self.basepath {
            Some(base) => ctx.root.join(base).join(target),
            None => current_dir.join(target),
        }
    }

    /// Parse `'path' [, {json}] )` starting at byte `at` of `text`.
    fn parse_directive<'t>(&self, text: &'t str, at: usize) -> Result<Directive<'t>> {
        let rest = &text[at..];
        let mut pos = skip_ws(rest, 0);

        let quote = match rest[pos..].chars().next() {
            Some(q @ ('\'' | '"')) => q,
            _ => bail!("expected a quoted path"),
        };
        pos += 1;
        let Some(len) = rest[pos..].find(quote) else {
            bail!("unterminated path");
        };
        let target = &rest[pos..pos + len];
        if target.is_empty() {
            bail!("empty path");
        }
        pos = skip_ws(rest, pos + len + 1);

        let params = if rest[pos..].starts_with(',') {
            pos = skip_ws(rest, pos + 1);
            let mut values = serde_json::Deserializer::from_str(&rest[pos..]).into_iter::<Value>();
            let value = match values.next() {
                Some(Ok(value)) => value,
                Some(Err(e)) => bail!("invalid parameters: {e}"),
                None => bail!("missing parameters after ','"),
            };
            pos = skip_ws(rest, pos + values.byte_offset());
            Some(value)
        } else {
            None
        };

        if !rest[pos..].starts_with(')') {
            bail!("expected ')'");
        }
        Ok(Directive {
            target,
            params,
            end: at + pos + 1,
        })
    }

    fn expand(
        &self,
        text: &str,
        current_dir: &Path,
        ctx: &StepContext,
        chain: &mut Vec<PathBuf>,
        sources: &mut Vec<PathBuf>,
    ) -> Result<String> {
        if chain.len() > MAX_INCLUDE_DEPTH {
            bail!("include nesting deeper than {MAX_INCLUDE_DEPTH}");
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        while let Some(found) = self.directive.find_at(text, last) {
            let directive = self.parse_directive(text, found.end()).with_context(|| {
                let line = text[..found.start()].matches('\n').count() + 1;
                format!("malformed {}include on line {line}", self.prefix)
            })?;

            out.push_str(&text[last..found.start()]);
            last = directive.end;

            let path = self.resolve(directive.target, current_dir, ctx);
            if chain.contains(&path) {
                bail!("include cycle through {}", path.display());
            }

            let mut included = ctx
                .fs
                .read_to_string(&path)
                .with_context(|| format!("including '{}'", directive.target))?;
            sources.push(ctx.project_relative(&path));

            if let Some(params) = directive.params {
                included = self.bind_params(&included, params)?;
            }

            let nested_dir = path.parent().unwrap_or(current_dir).to_path_buf();
            chain.push(path);
            let expanded = self.expand(&included, &nested_dir, ctx, chain, sources)?;
            chain.pop();

            out.push_str(&expanded);
        }

        out.push_str(&text[last..]);
        Ok(out)
    }

    fn bind_params(&self, text: &str, value: Value) -> Result<String> {
        let Value::Object(map) = value else {
            return Err(anyhow!("include parameters must be a JSON object"));
        };

        // Longest names first so `@@title` does not clobber `@@titleColor`.
        let mut entries: Vec<(&String, &Value)> = map.iter().collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut out = text.to_string();
        for (key, value) in entries {
            let replacement = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out = out.replace(&format!("{}{}", self.prefix, key), &replacement);
        }
        Ok(out)
    }
}

impl Transform for FileInclude {
    fn name(&self) -> &'static str {
        "file_include"
    }

    fn apply(&self, mut file: AssetFile, ctx: &StepContext) -> Result<Vec<AssetFile>> {
        let dir = file
            .origin_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| ctx.root.clone());
        let mut chain: Vec<PathBuf> = file.origin.iter().cloned().collect();
        let mut sources = Vec::new();

        let text = file.text()?.to_string();
        let expanded = self.expand(&text, &dir, ctx, &mut chain, &mut sources)?;

        for source in sources {
            file.add_source(source);
        }
        file.replace_unmapped(expanded.into_bytes());
        Ok(vec![file])
    }
}

fn raw_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
        )
        .expect("static raw block regex")
    })
}

fn comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Conditional comments (`<!--[if IE]>`) are kept.
    RE.get_or_init(|| Regex::new(r"(?s)<!--[^\[].*?-->|<!---->").expect("static comment regex"))
}

/// HTML whitespace only; `\s` would also match non-breaking spaces.
fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\n\r\x0C]+").expect("static whitespace regex"))
}

/// A single space on either side of a block-level tag, doctype or raw
/// block placeholder.
fn block_gap_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i) ?(<(?:/?(?:{BLOCK_TAGS})\b|!doctype\b|{RAW_MARK}\d+)[^>]*>) ?"
        ))
        .expect("static block gap regex")
    })
}

const BLOCK_TAGS: &str = "html|head|body|title|meta|link|base|style|script|noscript|\
    div|p|ul|ol|li|dl|dt|dd|table|thead|tbody|tfoot|tr|td|th|caption|colgroup|col|\
    section|article|aside|header|footer|nav|main|h[1-6]|hr|form|fieldset|legend|\
    figure|figcaption|blockquote|address|details|summary|dialog|menu|option|optgroup";

/// Removes comments and collapses whitespace.
///
/// Runs of whitespace become one space, which is dropped next to
/// block-level tags and kept between inline content. Bodies of `pre`,
/// `textarea`, `script` and `style` are copied verbatim.
#[derive(Debug, Default)]
pub struct MinifyHtml;

impl MinifyHtml {
    pub fn new() -> Self {
        Self
    }
}

impl Transform for MinifyHtml {
    fn name(&self) -> &'static str {
        "minify_html"
    }

    fn apply(&self, mut file: AssetFile, _ctx: &StepContext) -> Result<Vec<AssetFile>> {
        let minified = minify_html(file.text()?);
        file.replace_unmapped(minified.into_bytes());
        Ok(vec![file])
    }
}

pub fn minify_html(html: &str) -> String {
    // Raw blocks are swapped for tag-shaped placeholders so whitespace
    // between a block and its neighbours still collapses.
    let mut blocks: Vec<String> = Vec::new();
    let masked = raw_block_regex().replace_all(html, |caps: &regex::Captures<'_>| {
        let idx = blocks.len();
        blocks.push(caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default());
        format!("<{RAW_MARK}{idx}>")
    });

    let collapsed = collapse(&masked);

    let mut out = String::with_capacity(collapsed.len());
    let mut rest = collapsed.as_str();
    let open = format!("<{RAW_MARK}");
    while let Some(start) = rest.find(&open) {
        out.push_str(&rest[..start]);
        let after = &rest[start + open.len()..];
        let Some(end) = after.find('>') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        match after[..end].parse::<usize>().ok().and_then(|i| blocks.get(i)) {
            Some(block) => out.push_str(block),
            None => out.push_str(&rest[start..start + open.len() + end + 1]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    out.trim().to_string()
}

const RAW_MARK: &str = "__assetflow_raw_";

fn collapse(fragment: &str) -> String {
    let without_comments = comment_regex().replace_all(fragment, "");
    let single_spaced = whitespace_regex().replace_all(&without_comments, " ");
    block_gap_regex()
        .replace_all(&single_spaced, "$1")
        .into_owned()
}

fn skip_ws(s: &str, from: usize) -> usize {
    s[from..]
        .find(|c: char| !c.is_whitespace())
        .map_or(s.len(), |i| from + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minify_keeps_pre_blocks() {
        let html = "<div>\n  <p>a   b</p>\n  <!-- note -->\n  <pre>  keep\n  me </pre>\n</div>\n";
        assert_eq!(
            minify_html(html),
            "<div><p>a b</p><pre>  keep\n  me </pre></div>"
        );
    }

    #[test]
    fn minify_keeps_spaces_between_inline_elements() {
        assert_eq!(
            minify_html("<p>Hello <b>big</b> <i>world</i></p>"),
            "<p>Hello <b>big</b> <i>world</i></p>"
        );
        assert_eq!(
            minify_html("<ul>\n  <li><a href=\"/\">home</a>\n  </li>\n  <li>x</li>\n</ul>"),
            "<ul><li><a href=\"/\">home</a></li><li>x</li></ul>"
        );
    }

    #[test]
    fn minify_keeps_non_breaking_spaces() {
        assert_eq!(minify_html("<p>a\u{a0} b</p>"), "<p>a\u{a0} b</p>");
    }

    #[test]
    fn minify_keeps_conditional_comments() {
        let html = "<!--[if IE]><p>old</p><![endif]-->";
        assert_eq!(minify_html(html), html);
    }
}
