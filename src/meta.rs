//! Metadata extraction for text content.
//!
//! Two text formats carry metadata:
//!
//! - **Markdown**: a front matter block of contiguous `key: value` lines at
//!   the top of the file. Indented continuation lines append further values
//!   to the preceding key, and repeated keys do the same, so a key's raw
//!   value is always a list; single-element lists collapse to scalars.
//!   The block ends at the first blank or non-matching line.
//!
//!   ```text
//!   title: My Document
//!   date: October 2, 2007
//!   authors: Waylan Limberg
//!            John Doe
//!
//!   Body starts here.
//!   ```
//!
//! - **HTML fragments**: contiguous leading comment headers of the form
//!   `<!-- key: value -->`, one per line. Later repeats overwrite earlier
//!   ones; scanning stops at the first line that is not a header.
//!
//! Derived defaults are filled only when not set explicitly: `thumbnail`
//! prefers an `images` front matter list's first entry, then the first
//! `<img src>` in the rendered HTML; `summary` is the inner HTML of the
//! first `<p>` block. A `tags` key is additionally split on commas — tags
//! are short labels, never prose with embedded commas.
//!
//! Extraction never overwrites a field already present on the node.

use crate::tree::{FileNode, MetaValue};
use pulldown_cmark::{Options, Parser, html};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static META_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}([A-Za-z0-9_-]+):\s*(.*)$").unwrap());
static META_CONT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ {4,}(\S.*)$").unwrap());
static HTML_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<!--\s*([A-Za-z0-9_-]+)\s*:\s*(.*?)\s*-->\s*$").unwrap());
static FIRST_PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<p>(.*?)</p>").unwrap());
static IMG_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img[^>]*\bsrc\s*=\s*["']([^"']+)["']"#).unwrap());

/// Parse a Markdown front matter block.
///
/// Returns the key → values mapping and the remaining body. Values arrive
/// in source order; repeated keys and continuation lines append.
pub fn parse_front_matter(raw: &str) -> (BTreeMap<String, Vec<String>>, &str) {
    let mut meta: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut current: Option<String> = None;
    let mut consumed = 0;

    for line in raw.split_inclusive('\n') {
        let trimmed_end = line.trim_end_matches(['\n', '\r']);

        if trimmed_end.trim().is_empty() {
            // Blank line ends the block and is consumed with it.
            if !meta.is_empty() {
                consumed += line.len();
            }
            break;
        }

        if let Some(caps) = META_LINE.captures(trimmed_end) {
            let key = caps[1].to_lowercase();
            meta.entry(key.clone())
                .or_default()
                .push(caps[2].trim().to_string());
            current = Some(key);
            consumed += line.len();
        } else if let (Some(key), Some(caps)) = (&current, META_CONT.captures(trimmed_end)) {
            meta.entry(key.clone())
                .or_default()
                .push(caps[1].trim().to_string());
            consumed += line.len();
        } else {
            break;
        }
    }

    (meta, &raw[consumed..])
}

/// Parse contiguous `<!-- key: value -->` header lines at the top of an
/// HTML fragment. Later repeats overwrite earlier ones.
pub fn parse_comment_headers(raw: &str) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    for line in raw.lines() {
        match HTML_HEADER.captures(line) {
            Some(caps) => {
                headers.insert(caps[1].to_lowercase(), caps[2].to_string());
            }
            None => break,
        }
    }
    headers
}

/// Convert Markdown to HTML with the extensions the site relies on
/// (tables, footnotes, strikethrough).
pub fn markdown_to_html(body: &str) -> String {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(body, options);
    let mut out = String::with_capacity(body.len() * 2);
    html::push_html(&mut out, parser);
    out
}

/// Inner HTML of the first `<p>` block, or `None` if no paragraph exists.
pub fn first_paragraph(html: &str) -> Option<String> {
    FIRST_PARAGRAPH
        .captures(html)
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `src` attribute of the first `<img>` tag.
pub fn first_image_src(html: &str) -> Option<String> {
    IMG_SRC.captures(html).map(|caps| caps[1].to_string())
}

/// Extract metadata and rendered content from a Markdown file.
pub fn extract_markdown(node: &mut FileNode, raw: &str) {
    let (front_matter, body) = parse_front_matter(raw);
    let rendered = markdown_to_html(body);

    for (key, values) in front_matter {
        node.meta
            .entry(key)
            .or_insert_with(|| MetaValue::from_values(values));
    }

    apply_special_keys(node);

    if node.content.is_none() {
        node.content = Some(rendered.clone());
    }
    if node.thumbnail.is_none() {
        node.thumbnail = node
            .meta
            .get("images")
            .and_then(|v| v.first())
            .map(str::to_string)
            .or_else(|| first_image_src(&rendered));
    }
    if node.summary.is_none() {
        node.summary = first_paragraph(&rendered);
    }
}

/// Extract metadata from an HTML fragment. The raw fragment (headers
/// included) becomes the content verbatim.
pub fn extract_html(node: &mut FileNode, raw: &str) {
    for (key, value) in parse_comment_headers(raw) {
        node.meta.entry(key).or_insert(MetaValue::Str(value));
    }

    apply_special_keys(node);

    if node.content.is_none() {
        node.content = Some(raw.to_string());
    }
    if node.thumbnail.is_none() {
        node.thumbnail = first_image_src(raw);
    }
    if node.summary.is_none() {
        node.summary = first_paragraph(raw);
    }
}

/// Promote well-known metadata keys to their typed node fields, without
/// overwriting anything already set.
fn apply_special_keys(node: &mut FileNode) {
    if node.summary.is_none()
        && let Some(value) = node.meta.get("summary").and_then(|v| v.first())
        && !value.is_empty()
    {
        node.summary = Some(value.to_string());
    }
    if node.thumbnail.is_none()
        && let Some(value) = node.meta.get("thumbnail").and_then(|v| v.first())
        && !value.is_empty()
    {
        node.thumbnail = Some(value.to_string());
    }
    if node.tags.is_empty()
        && let Some(value) = node.meta.get("tags")
    {
        node.tags = value
            .values()
            .iter()
            .flat_map(|v| v.split(','))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }
}
