//! Content tree construction.
//!
//! First stage of the build: the content root is scanned recursively into an
//! in-memory tree that mirrors the filesystem exactly. No file content is
//! read here — only names and paths. The renderer later walks this tree
//! depth-first, filling in the derived fields on each [`FileNode`].
//!
//! ## Tree shape
//!
//! ```text
//! content/                 DirNode { path: "." }
//! ├── bla.md               FileNode { site_dir: ".", site_path: "./bla.md" }
//! ├── blog/                DirNode { path: "blog" }
//! │   ├── .noindex         (marker, consumed as skip_index flag)
//! │   └── post.md          FileNode { site_dir: "blog", site_path: "blog/post.md" }
//! └── projects/            DirNode { path: "projects" }
//!     └── robot.jpg        FileNode { site_dir: "projects" }
//! ```
//!
//! ## Directory markers
//!
//! Dot-files never become nodes. Two of them carry directory flags:
//!
//! - `.noindex` — suppress index page generation for this directory
//! - `.template` — first line names the template used for this directory's
//!   index, overriding the `<dirname>_index` convention
//!
//! ## Error handling
//!
//! An unreadable directory (permission denied) is recorded as an error
//! marker on its node; sibling subtrees continue to scan. Only a missing
//! or non-directory content root is a hard error.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("content root is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Marker file that suppresses index generation for its directory.
pub const SKIP_INDEX_MARKER: &str = ".noindex";

/// Marker file whose first line names the directory's index template.
pub const TEMPLATE_MARKER: &str = ".template";

/// Extracted metadata value: a scalar or a list of strings.
///
/// Front matter values are lists by construction; a single-element list is
/// collapsed to its scalar at parse time, so `Str` is the common case and
/// `List` only appears for genuinely multi-valued keys (multiple authors,
/// multiple images). Serializes untagged so templates see plain strings
/// and arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Str(String),
    List(Vec<String>),
}

impl MetaValue {
    /// Collapse a raw value list into a `MetaValue`. Empty input becomes an
    /// empty scalar (a bare `key:` line still registers the key).
    pub fn from_values(mut values: Vec<String>) -> Self {
        match values.len() {
            0 => MetaValue::Str(String::new()),
            1 => MetaValue::Str(values.remove(0)),
            _ => MetaValue::List(values),
        }
    }

    /// The scalar value, or the first element of a list.
    pub fn first(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s.as_str()),
            MetaValue::List(v) => v.first().map(String::as_str),
        }
    }

    /// All values, regardless of shape.
    pub fn values(&self) -> Vec<&str> {
        match self {
            MetaValue::Str(s) => vec![s.as_str()],
            MetaValue::List(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

/// One entry in the content tree.
#[derive(Debug)]
pub enum Node {
    Dir(DirNode),
    File(FileNode),
}

/// A directory in the content tree.
#[derive(Debug)]
pub struct DirNode {
    /// Path relative to the content root; `"."` for the root itself.
    pub path: String,
    /// Absolute (or caller-relative) source path on disk.
    pub source_path: PathBuf,
    /// Direct children keyed by filesystem name. `BTreeMap` keeps child
    /// order deterministic (sorted by name) for reproducible builds.
    pub children: BTreeMap<String, Node>,
    /// Set by a `.noindex` marker: no index page for this directory.
    pub skip_index: bool,
    /// Set by a `.template` marker: index template name override.
    pub template: Option<String>,
    /// Read failure captured during the scan; the node has no children.
    pub error: Option<String>,
}

impl DirNode {
    /// The directory's own name (last path segment), empty for the root.
    pub fn name(&self) -> &str {
        if self.path == "." {
            ""
        } else {
            self.path.rsplit('/').next().unwrap_or(&self.path)
        }
    }

    /// Whether this directory is a direct child of the content root.
    pub fn is_top_level(&self) -> bool {
        self.path != "." && !self.path.contains('/')
    }
}

/// A file in the content tree.
///
/// The `site_*` fields are derived from the path at scan time; everything
/// after `site_path` is filled in by the metadata extractor and asset
/// processor during rendering.
#[derive(Debug)]
pub struct FileNode {
    pub source_path: PathBuf,
    /// Parent directory relative to the content root (`"."` at root level).
    pub site_dir: String,
    /// Filename stem, without extension.
    pub file_name: String,
    /// Lowercased extension without the dot; empty if none.
    pub ext: String,
    /// `site_dir/filename.ext` — the node's unique relative path.
    pub site_path: String,

    /// Rendered output URL (`blog/post.html`, `projects/robot.jpg`).
    pub url: Option<String>,
    /// Web-sized derivative URL for images, or extracted thumbnail for text.
    pub thumbnail: Option<String>,
    /// Web-sized image derivative URL.
    pub web: Option<String>,
    pub mime_type: Option<String>,
    /// Original raster dimensions (width, height).
    pub size: Option<(u32, u32)>,
    /// SHA-256 of the source file contents (hex).
    pub hash: Option<String>,
    /// Rendered content fragment (HTML).
    pub content: Option<String>,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    /// Open metadata mapping from front matter / comment headers.
    pub meta: BTreeMap<String, MetaValue>,
}

impl FileNode {
    fn new(source_path: &Path, site_dir: &str, name: &str) -> Self {
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), ext.to_lowercase()),
            _ => (name.to_string(), String::new()),
        };
        Self {
            source_path: source_path.to_path_buf(),
            site_dir: site_dir.to_string(),
            file_name: stem,
            ext,
            site_path: format!("{site_dir}/{name}"),
            url: None,
            thumbnail: None,
            web: None,
            mime_type: None,
            size: None,
            hash: None,
            content: None,
            summary: None,
            tags: Vec::new(),
            meta: BTreeMap::new(),
        }
    }

    /// Output URL for a text page: the site path with the extension
    /// replaced by `.html`.
    pub fn page_url(&self) -> String {
        format!("{}/{}.html", self.site_dir, self.file_name)
    }

    /// A metadata value by key, if extracted.
    pub fn meta_value(&self, key: &str) -> Option<&MetaValue> {
        self.meta.get(key)
    }
}

/// Build the content tree for `root`.
///
/// Errors only if the root itself is missing or not a directory; unreadable
/// subdirectories are captured as [`DirNode::error`] markers and traversal
/// continues with their siblings.
pub fn build(root: &Path) -> Result<DirNode, TreeError> {
    if !root.is_dir() {
        return Err(TreeError::NotADirectory(root.to_path_buf()));
    }
    Ok(build_dir(root, "."))
}

fn build_dir(path: &Path, rel: &str) -> DirNode {
    let mut node = DirNode {
        path: rel.to_string(),
        source_path: path.to_path_buf(),
        children: BTreeMap::new(),
        skip_index: false,
        template: None,
        error: None,
    };

    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            node.error = Some(err.to_string());
            return node;
        }
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let child_path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();

        if name.starts_with('.') {
            match name.as_str() {
                SKIP_INDEX_MARKER => node.skip_index = true,
                TEMPLATE_MARKER => {
                    node.template = fs::read_to_string(&child_path)
                        .ok()
                        .and_then(|s| s.lines().next().map(|l| l.trim().to_string()))
                        .filter(|s| !s.is_empty());
                }
                _ => {}
            }
            continue;
        }

        if child_path.is_dir() {
            let child_rel = if rel == "." {
                name.clone()
            } else {
                format!("{rel}/{name}")
            };
            node.children
                .insert(name, Node::Dir(build_dir(&child_path, &child_rel)));
        } else {
            node.children
                .insert(name.clone(), Node::File(FileNode::new(&child_path, rel, &name)));
        }
    }

    node
}
