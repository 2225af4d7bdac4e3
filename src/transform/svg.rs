// src/transform/svg.rs

//! SVG handling on top of `quick-xml`.
//!
//! [`optimize_svg`] re-serializes a document without its prolog, doctype,
//! comments and processing instructions, and drops whitespace-only text
//! except inside `<text>` content where it renders. [`parse_root`] splits a
//! document into its root `<svg>` attributes and inner markup for the
//! sprite builder.

use anyhow::{bail, Context, Result};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

/// Elements whose whitespace-only text is rendered.
const TEXT_ELEMENTS: &[&[u8]] = &[b"text", b"tspan", b"textPath", b"title", b"desc", b"style"];

pub fn optimize_svg(svg: &str) -> Result<String> {
    let mut reader = Reader::from_str(svg);
    let mut writer = Writer::new(Vec::with_capacity(svg.len()));
    // Depth inside elements from TEXT_ELEMENTS.
    let mut text_depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("parsing SVG at byte {}", reader.buffer_position()))?;
        match event {
            Event::Eof => break,
            Event::Decl(_) | Event::DocType(_) | Event::Comment(_) | Event::PI(_) => {}
            Event::Text(ref text) if text_depth == 0 && text.iter().all(u8::is_ascii_whitespace) => {}
            Event::Start(ref start) => {
                if TEXT_ELEMENTS.contains(&start.local_name().as_ref()) || text_depth > 0 {
                    text_depth += 1;
                }
                writer.write_event(event.borrow())?;
            }
            Event::End(_) => {
                text_depth = text_depth.saturating_sub(1);
                writer.write_event(event.borrow())?;
            }
            other => writer.write_event(other)?,
        }
    }

    let out = String::from_utf8(writer.into_inner()).context("optimized SVG is not UTF-8")?;
    Ok(out)
}

/// Root `<svg>` element of a document.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SvgRoot {
    pub view_box: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    /// Markup between the root's start and end tags.
    pub inner: String,
}

impl SvgRoot {
    /// The root's `viewBox`, or one derived from plain `width`/`height`.
    pub fn view_box(&self) -> Option<String> {
        if let Some(vb) = &self.view_box {
            return Some(vb.clone());
        }
        match (&self.width, &self.height) {
            (Some(w), Some(h)) => Some(format!("0 0 {w} {h}")),
            _ => None,
        }
    }
}

/// Find the root element of `svg`. Fails when the document's first element
/// is not `<svg>`.
pub fn parse_root(svg: &str) -> Result<SvgRoot> {
    let mut reader = Reader::from_str(svg);
    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("parsing SVG at byte {}", reader.buffer_position()))?;
        let (start, empty) = match event {
            Event::Start(start) => (start, false),
            Event::Empty(start) => (start, true),
            Event::Eof => bail!("no root element"),
            _ => continue,
        };
        if start.local_name().as_ref() != b"svg" {
            bail!(
                "root element is <{}>, not <svg>",
                String::from_utf8_lossy(start.name().as_ref())
            );
        }

        let mut root = SvgRoot::default();
        for attr in start.attributes() {
            let attr = attr.context("reading <svg> attributes")?;
            let value = String::from_utf8_lossy(&attr.value).into_owned();
            match attr.key.local_name().as_ref() {
                b"viewBox" => root.view_box = Some(value),
                b"width" => root.width = Some(value),
                b"height" => root.height = Some(value),
                _ => {}
            }
        }

        if !empty {
            let span = reader
                .read_to_end(start.to_end().name())
                .context("reading <svg> contents")?;
            root.inner = svg[span.start as usize..span.end as usize].to_string();
        }
        return Ok(root);
    }
}
