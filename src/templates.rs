//! Template loading and convention-based resolution.
//!
//! Templates are plain Tera files in a flat directory, registered once at
//! startup under their file stem (`templates/blog.html` → `blog`). Which
//! template renders a node is decided by convention from its position in
//! the content tree, never configured per file:
//!
//! | Node                      | Candidate            | Fallback     |
//! |---------------------------|----------------------|--------------|
//! | file under `blog/...`     | `blog`               | `default`    |
//! | index of directory `blog` | `blog_index`         | `index`      |
//! | tag pages                 | `tags_index`         | `index`      |
//!
//! The candidate for a file is the *first* segment of its site directory —
//! `blog/2024/post.md` still resolves against `blog`, so one template
//! covers an entire top-level section regardless of nesting depth.
//!
//! Resolution is pure and total: a missing template is an expected case
//! answered with the fallback name, never an error. Rendering with a name
//! that does not exist (no `default.html` in the template dir) surfaces as
//! a Tera error at the call site.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tera::Tera;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("template parse error: {0}")]
    Parse(#[from] tera::Error),
}

/// Fallback template for content files.
pub const DEFAULT_PAGE: &str = "default";
/// Fallback template for directory indexes and tag pages.
pub const DEFAULT_INDEX: &str = "index";
/// Preferred template for tag pages and the tag index.
pub const TAGS_INDEX: &str = "tags_index";

/// Preloaded template set with name-based resolution.
pub struct TemplateSet {
    tera: Tera,
    names: BTreeSet<String>,
}

impl TemplateSet {
    /// Load every `*.html` file in `dir`, registered under its stem.
    /// A missing directory yields an empty set (resolution then always
    /// answers with fallbacks, and rendering fails loudly at first use).
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        let mut names = BTreeSet::new();

        if dir.is_dir() {
            let mut files: Vec<_> = fs::read_dir(dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.is_file() && p.extension().map(|e| e == "html").unwrap_or(false)
                })
                .collect();
            files.sort();

            for path in &files {
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                tera.add_template_file(path, Some(stem))?;
                names.insert(stem.to_string());
            }
        }

        Ok(Self { tera, names })
    }

    /// Build a set from inline (name, source) pairs. Used by tests and
    /// plugin code that supplies templates programmatically.
    pub fn from_sources(sources: &[(&str, &str)]) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(sources.to_vec())?;
        let names = sources.iter().map(|(n, _)| n.to_string()).collect();
        Ok(Self { tera, names })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Template for a content file, from the first segment of its site
    /// directory. Root-level files (`site_dir == "."`) go straight to the
    /// fallback.
    pub fn resolve_page<'a>(&self, site_dir: &'a str) -> &'a str {
        match top_segment(site_dir) {
            Some(section) if self.contains(section) => section,
            _ => DEFAULT_PAGE,
        }
    }

    /// Template for a directory index: `<dirname>_index` when registered,
    /// else the index fallback. An explicit override (from a `.template`
    /// marker) wins when it names a registered template.
    pub fn resolve_index(&self, dir_name: &str, override_name: Option<&str>) -> String {
        if let Some(name) = override_name
            && self.contains(name)
        {
            return name.to_string();
        }
        let candidate = format!("{dir_name}_index");
        if !dir_name.is_empty() && self.contains(&candidate) {
            candidate
        } else {
            DEFAULT_INDEX.to_string()
        }
    }

    /// Template for tag pages and the tag index.
    pub fn resolve_tags(&self) -> &'static str {
        if self.contains(TAGS_INDEX) {
            TAGS_INDEX
        } else {
            DEFAULT_INDEX
        }
    }

    pub fn render(&self, name: &str, ctx: &tera::Context) -> Result<String, tera::Error> {
        self.tera.render(name, ctx)
    }
}

/// First path segment of a site directory; `None` for the root (`"."`).
fn top_segment(site_dir: &str) -> Option<&str> {
    let seg = site_dir.split('/').next()?;
    if seg.is_empty() || seg == "." {
        None
    } else {
        Some(seg)
    }
}
