//! Depth-first site rendering.
//!
//! The render walk is the heart of the build. It traverses the content
//! tree bottom-up and, for every node, does the convention-driven thing:
//!
//! - **Markdown / HTML files** become pages: metadata is extracted, the
//!   body is rendered, and the page template resolved from the file's
//!   top-level section writes `<stem>.html` next to its siblings. Text
//!   pages are always re-rendered; they are cheap and templates change
//!   often.
//! - **Images** go through the asset pipeline (copy, `_web`/`_thumb`
//!   derivatives, staleness checks).
//! - **Everything else** is copied through verbatim, mtime-gated.
//! - **Every directory** (unless marked `.noindex`) gets an `index.html`
//!   listing its rendered children, sorted by `date` descending when all
//!   entries carry one, else by name.
//!
//! After the walk, the collected tag assignments become one page per tag
//! under `tags/` plus a tag index.
//!
//! ## Template contexts
//!
//! Every render context starts from the global parameters
//! ([`Params::base_context`]) plus the navigation list; node fields are
//! layered on top and win on key collisions. Index contexts carry their
//! entries under `entries`; the root index additionally sees `latest`,
//! the newest entry of each navigation section.

use crate::assets::{self, AssetConfig, IMAGE_EXTENSIONS};
use crate::config::Params;
use crate::meta;
use crate::output::BuildStats;
use crate::plugin::{NoopPlugin, Plugin};
use crate::templates::TemplateSet;
use crate::tree::{self, DirNode, FileNode, Node, TreeError};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Everything a build needs: parameters, templates, asset settings and
/// the plugin hook.
pub struct Site {
    pub params: Params,
    pub templates: TemplateSet,
    pub assets: AssetConfig,
    plugin: Box<dyn Plugin>,
}

/// State accumulated across one render walk. Rebuilt from scratch every
/// build so watch-mode rebuilds never see leftovers.
struct BuildContext {
    /// Tag name → contexts of the nodes carrying it.
    tags: BTreeMap<String, Vec<Value>>,
    /// Newest entry per navigation section, in nav order of discovery.
    latest: Vec<Value>,
    /// Top-level sections, explicit from params or derived from the tree.
    nav: Vec<String>,
}

impl Site {
    pub fn new(params: Params, templates: TemplateSet) -> Self {
        Self {
            params,
            templates,
            assets: AssetConfig::default(),
            plugin: Box::new(NoopPlugin),
        }
    }

    pub fn with_plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugin = plugin;
        self
    }

    /// Run a full build: scan `input`, render into `output`, copying
    /// `static_dir` through first. `force` wipes the output tree so every
    /// staleness check regenerates.
    pub fn build(
        &self,
        input: &Path,
        output: &Path,
        static_dir: &Path,
        force: bool,
    ) -> Result<BuildStats, RenderError> {
        if force && output.exists() {
            fs::remove_dir_all(output)?;
        }
        fs::create_dir_all(output)?;

        let mut stats = BuildStats::default();
        stats.static_files = self.copy_static(static_dir, output)?;

        let mut root = tree::build(input)?;
        let mut ctx = BuildContext {
            tags: BTreeMap::new(),
            latest: Vec::new(),
            nav: self.navigation(&root),
        };

        self.render_dir(&mut root, output, &mut ctx, &mut stats)?;
        self.render_tag_pages(&ctx, output, &mut stats)?;

        Ok(stats)
    }

    /// Navigation sections: the explicit `nav` parameter when set, else
    /// every top-level content directory in name order.
    fn navigation(&self, root: &DirNode) -> Vec<String> {
        if let Some(nav) = &self.params.nav {
            return nav.clone();
        }
        root.children
            .iter()
            .filter(|(_, node)| matches!(node, Node::Dir(_)))
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn copy_static(&self, static_dir: &Path, output: &Path) -> io::Result<usize> {
        if !static_dir.is_dir() {
            return Ok(0);
        }
        let mut copied = 0;
        for entry in WalkDir::new(static_dir) {
            let entry = entry.map_err(io::Error::other)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(static_dir)
                .map_err(io::Error::other)?;
            if assets::copy_if_stale(entry.path(), &output.join(rel))? {
                copied += 1;
            }
        }
        Ok(copied)
    }

    /// Render a directory subtree and return the entry representing it in
    /// its parent's index, or `None` when it produced no index page
    /// (unreadable, plugin-claimed, or `.noindex`).
    fn render_dir(
        &self,
        dir: &mut DirNode,
        output: &Path,
        ctx: &mut BuildContext,
        stats: &mut BuildStats,
    ) -> Result<Option<Value>, RenderError> {
        if let Some(err) = &dir.error {
            eprintln!("warning: skipping unreadable directory {}: {err}", dir.path);
            return Ok(None);
        }
        if self.plugin.handle_dir(dir, output)? {
            return Ok(None);
        }

        let mut entries: Vec<Value> = Vec::new();
        for node in dir.children.values_mut() {
            match node {
                Node::Dir(child) => {
                    if let Some(entry) = self.render_dir(child, output, ctx, stats)? {
                        entries.push(entry);
                    }
                }
                Node::File(file) => {
                    if let Some(entry) = self.render_file(file, output, ctx, stats)? {
                        entries.push(entry);
                    }
                }
            }
        }

        if dir.skip_index {
            println!("index skipped: {}", display_dir(&dir.path));
            return Ok(None);
        }

        sort_entries(&mut entries);

        if dir.is_top_level()
            && ctx.nav.contains(&dir.path)
            && let Some(first) = entries.first()
        {
            let mut latest = first.clone();
            if let Value::Object(map) = &mut latest {
                map.insert("section".to_string(), json!(dir.path));
            }
            ctx.latest.push(latest);
        }

        let mut page = self.params.base_context();
        page.insert("nav", &ctx.nav);
        page.insert("dir", dir.name());
        page.insert("path", &dir.path);
        page.insert("entries", &entries);
        if dir.path == "." {
            page.insert("latest", &ctx.latest);
        }

        let template = self
            .templates
            .resolve_index(dir.name(), dir.template.as_deref());
        let html = self.templates.render(&template, &page)?;

        let dest_dir = output.join(&dir.path);
        fs::create_dir_all(&dest_dir)?;
        fs::write(dest_dir.join("index.html"), html)?;
        stats.indexes += 1;

        Ok(Some(json!({
            "name": dir.name(),
            "url": format!("{}/index.html", dir.path),
            "is_dir": true,
        })))
    }

    /// Render a single file node and return its index entry, or `None`
    /// when the node produced no page (plugin-claimed).
    fn render_file(
        &self,
        file: &mut FileNode,
        output: &Path,
        ctx: &mut BuildContext,
        stats: &mut BuildStats,
    ) -> Result<Option<Value>, RenderError> {
        if self.plugin.handle_file(file, output)? {
            return Ok(None);
        }

        match file.ext.as_str() {
            "md" => {
                let raw = fs::read_to_string(&file.source_path)?;
                file.url = Some(file.page_url());
                file.hash = Some(assets::hash_file(&file.source_path)?);
                meta::extract_markdown(file, &raw);
                self.render_page(file, output)?;
                stats.pages += 1;
            }
            "html" => {
                let raw = fs::read_to_string(&file.source_path)?;
                file.url = Some(file.page_url());
                file.hash = Some(assets::hash_file(&file.source_path)?);
                meta::extract_html(file, &raw);
                self.render_page(file, output)?;
                stats.pages += 1;
            }
            ext if IMAGE_EXTENSIONS.contains(&ext) => {
                let outcome = assets::process_image(file, output, &self.assets)?;
                if outcome.encoded {
                    stats.images += 1;
                } else {
                    stats.images_skipped += 1;
                }
            }
            _ => {
                if assets::copy_passthrough(file, output)? {
                    stats.copied += 1;
                }
            }
        }

        let entry = node_context(file);
        for tag in &file.tags {
            ctx.tags.entry(tag.clone()).or_default().push(entry.clone());
        }
        Ok(Some(entry))
    }

    fn render_page(&self, file: &FileNode, output: &Path) -> Result<(), RenderError> {
        let mut page = self.params.base_context();
        if let Value::Object(map) = node_context(file) {
            for (key, value) in map {
                page.insert(key, &value);
            }
        }

        let template = self.templates.resolve_page(&file.site_dir);
        let html = self.templates.render(template, &page)?;

        let dest_dir = output.join(&file.site_dir);
        fs::create_dir_all(&dest_dir)?;
        fs::write(dest_dir.join(format!("{}.html", file.file_name)), html)?;
        Ok(())
    }

    /// One page per tag slug plus a tag index, all under `tags/` at the
    /// output root. Distinct tags that slugify to the same name (`Rust`
    /// and `rust`, `C++` and `C`) share one page listing the union of
    /// their files, so no tag's members ever drop out of the output.
    /// Skipped entirely when no node carries a tag.
    fn render_tag_pages(
        &self,
        ctx: &BuildContext,
        output: &Path,
        stats: &mut BuildStats,
    ) -> Result<(), RenderError> {
        if ctx.tags.is_empty() {
            return Ok(());
        }

        let template = self.templates.resolve_tags();
        let tags_dir = output.join("tags");
        fs::create_dir_all(&tags_dir)?;

        // Group by slug first; ctx.tags is keyed by raw tag name and
        // several names can land on one file.
        let mut pages: BTreeMap<String, TagPage> = BTreeMap::new();
        for (tag, members) in &ctx.tags {
            let page = pages.entry(tag_slug(tag)).or_default();
            page.names.push(tag.clone());
            for member in members {
                let dup = page
                    .entries
                    .iter()
                    .any(|e| e.get("site_path") == member.get("site_path"));
                if !dup {
                    page.entries.push(member.clone());
                }
            }
        }

        let mut listing: Vec<Value> = Vec::new();
        for (slug, mut tag_page) in pages {
            sort_entries(&mut tag_page.entries);
            let display = tag_page.names.join(", ");

            let mut page = self.params.base_context();
            page.insert("nav", &ctx.nav);
            page.insert("tag", &display);
            page.insert("entries", &tag_page.entries);

            let html = self.templates.render(template, &page)?;
            fs::write(tags_dir.join(format!("{slug}.html")), html)?;
            stats.tag_pages += 1;

            listing.push(json!({
                "name": display,
                "url": format!("tags/{slug}.html"),
                "count": tag_page.entries.len(),
            }));
        }

        let mut page = self.params.base_context();
        page.insert("nav", &ctx.nav);
        page.insert("tags", &listing);
        page.insert("entries", &listing);
        let html = self.templates.render(template, &page)?;
        fs::write(tags_dir.join("index.html"), html)?;
        stats.tag_pages += 1;

        Ok(())
    }
}

/// One rendered tag page: every tag name sharing the slug, and the
/// union of their files.
#[derive(Default)]
struct TagPage {
    names: Vec<String>,
    entries: Vec<Value>,
}

/// A file node as templates see it: typed fields first, then open
/// metadata keys (which never shadow the typed ones).
fn node_context(node: &FileNode) -> Value {
    let mut map = Map::new();
    map.insert("name".to_string(), json!(node.file_name));
    map.insert("site_path".to_string(), json!(node.site_path));
    map.insert("url".to_string(), json!(node.url));
    map.insert("thumbnail".to_string(), json!(node.thumbnail));
    map.insert("web".to_string(), json!(node.web));
    map.insert("mime_type".to_string(), json!(node.mime_type));
    map.insert("size".to_string(), json!(node.size));
    map.insert("hash".to_string(), json!(node.hash));
    map.insert("content".to_string(), json!(node.content));
    map.insert("summary".to_string(), json!(node.summary));
    map.insert("tags".to_string(), json!(node.tags));

    for (key, value) in &node.meta {
        if !map.contains_key(key) {
            map.insert(
                key.clone(),
                serde_json::to_value(value).unwrap_or(Value::Null),
            );
        }
    }

    Value::Object(map)
}

/// Index ordering: newest first when every entry is dated, else by name.
/// Dates compare lexicographically, which is chronological for ISO-style
/// dates.
fn sort_entries(entries: &mut [Value]) {
    let all_dated = !entries.is_empty()
        && entries
            .iter()
            .all(|e| e.get("date").and_then(Value::as_str).is_some());

    if all_dated {
        entries.sort_by(|a, b| {
            let a = a.get("date").and_then(Value::as_str).unwrap_or("");
            let b = b.get("date").and_then(Value::as_str).unwrap_or("");
            b.cmp(a)
        });
    } else {
        entries.sort_by(|a, b| {
            let a = a.get("name").and_then(Value::as_str).unwrap_or("");
            let b = b.get("name").and_then(Value::as_str).unwrap_or("");
            a.cmp(b)
        });
    }
}

/// Filesystem-safe slug for a tag name: non-alphanumerics become dashes,
/// runs collapse, edges are trimmed. Lowercased so `Rust` and `rust` land
/// on the same page.
fn tag_slug(tag: &str) -> String {
    let mut slug = String::with_capacity(tag.len());
    let mut prev_dash = false;
    for c in tag.chars() {
        if c.is_ascii_alphanumeric() {
            slug.extend(c.to_lowercase());
            prev_dash = false;
        } else if !prev_dash && !slug.is_empty() {
            slug.push('-');
            prev_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn display_dir(path: &str) -> &str {
    if path == "." { "(root)" } else { path }
}
