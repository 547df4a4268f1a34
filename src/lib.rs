//! # Appie
//!
//! A convention-driven static site generator. Your filesystem is the data
//! source: the content tree is scanned into memory, then rendered
//! depth-first, and every file maps to exactly one output artifact decided
//! by its extension — markdown and HTML fragments become templated pages,
//! images get web-size and thumbnail derivatives, everything else is
//! copied through. Every directory gets an index page over its rendered
//! children, and tagged pages are collected into per-tag listings.
//!
//! # Architecture: Scan, Then Render
//!
//! A build has two phases over one in-memory tree:
//!
//! ```text
//! 1. Scan     content/  →  DirNode/FileNode tree   (names and paths only)
//! 2. Render   tree      →  _site/                  (depth-first, fills nodes)
//! ```
//!
//! The scan reads no file contents, so it is cheap enough to redo on every
//! watch-mode rebuild. The render walk fills each node's derived fields
//! (metadata, rendered HTML, derivative URLs) as a side effect of writing
//! its output, and parent indexes consume exactly what their children
//! produced — which is why the walk is bottom-up.
//!
//! # Conventions Over Configuration
//!
//! Nothing is configured per page. Which template renders a file follows
//! from its top-level section ([`templates`]); which pages land in an
//! index follows from the directory they sit in; navigation follows from
//! the top-level directories. The only configuration is site-global
//! (`params.json`, see [`config`]) plus two per-directory marker files
//! (`.noindex`, `.template`, see [`tree`]).
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`tree`] | Content tree scan — `DirNode` / `FileNode`, directory markers |
//! | [`meta`] | Metadata extraction — markdown front matter, HTML comment headers, derived summary/thumbnail |
//! | [`assets`] | Image derivatives, mtime staleness, passthrough copies, hashing |
//! | [`templates`] | Tera template set with convention-based name resolution |
//! | [`render`] | The depth-first render walk: pages, indexes, tag pages |
//! | [`plugin`] | Hook trait letting callers claim nodes before stock handling |
//! | [`config`] | `params.json` loading and the base template context |
//! | [`watch`] | Debounced filesystem watcher driving full rebuilds |
//! | [`output`] | CLI summary formatting |
//!
//! # Incremental Builds
//!
//! Staleness is mtime-based and per-artifact: an output file that is at
//! least as new as its source is left alone. Text pages are the exception
//! and always re-render — they are cheap, and templates change without
//! touching the content files. `--force` wipes the output tree instead of
//! trusting it.

pub mod assets;
pub mod config;
pub mod meta;
pub mod output;
pub mod plugin;
pub mod render;
pub mod templates;
pub mod tree;
pub mod watch;
