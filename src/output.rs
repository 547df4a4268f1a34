//! CLI output formatting.
//!
//! One build prints one summary block:
//!
//! ```text
//! Build complete
//!     4 pages
//!     3 indexes
//!     2 images encoded, 5 cached
//!     1 file copied
//!     3 tag pages
//!     2 static files
//! ```
//!
//! Lines for zero counts are omitted, except the page line, which always
//! shows so an accidentally-empty content directory is visible at a
//! glance.
//!
//! Each summary has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

/// Counters accumulated over one build.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildStats {
    pub pages: usize,
    pub indexes: usize,
    /// Images that went through decode + encode this build.
    pub images: usize,
    /// Images whose derivatives were already fresh.
    pub images_skipped: usize,
    /// Passthrough files copied.
    pub copied: usize,
    pub tag_pages: usize,
    pub static_files: usize,
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Format the end-of-build summary.
pub fn format_summary(stats: &BuildStats) -> Vec<String> {
    let mut lines = vec!["Build complete".to_string()];
    lines.push(format!("    {}", plural(stats.pages, "page")));
    if stats.indexes > 0 {
        let noun = if stats.indexes == 1 { "index" } else { "indexes" };
        lines.push(format!("    {} {noun}", stats.indexes));
    }
    if stats.images > 0 || stats.images_skipped > 0 {
        lines.push(format!(
            "    {} encoded, {} cached",
            plural(stats.images, "image"),
            stats.images_skipped
        ));
    }
    if stats.copied > 0 {
        lines.push(format!("    {} copied", plural(stats.copied, "file")));
    }
    if stats.tag_pages > 0 {
        lines.push(format!("    {}", plural(stats.tag_pages, "tag page")));
    }
    if stats.static_files > 0 {
        lines.push(format!("    {}", plural(stats.static_files, "static file")));
    }
    lines
}

pub fn print_summary(stats: &BuildStats) {
    for line in format_summary(stats) {
        println!("{line}");
    }
}

/// One line announcing a watch-mode rebuild.
pub fn format_rebuild_banner() -> String {
    "Change detected, rebuilding...".to_string()
}
