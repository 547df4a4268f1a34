//! Build plugins.
//!
//! A plugin sees every node before the stock pipeline does and may claim
//! it by returning `Ok(true)`, in which case the stock handling (metadata
//! extraction, asset processing, index generation) is skipped for that
//! node. Returning `Ok(false)` passes the node through untouched. Errors
//! abort the build.
//!
//! The hooks run during the depth-first render walk, so a directory hook
//! that claims a directory suppresses the entire subtree.

use crate::tree::{DirNode, FileNode};
use std::io;
use std::path::Path;

/// Hook into the render walk. Both hooks default to "not handled".
pub trait Plugin {
    /// Called for every directory before its children are rendered.
    /// `output_root` is the root of the output tree, for plugins that
    /// write their own artifacts.
    fn handle_dir(&self, _dir: &mut DirNode, _output_root: &Path) -> io::Result<bool> {
        Ok(false)
    }

    /// Called for every file before stock processing.
    fn handle_file(&self, _file: &mut FileNode, _output_root: &Path) -> io::Result<bool> {
        Ok(false)
    }
}

/// The stock plugin: handles nothing, every node takes the default path.
pub struct NoopPlugin;

impl Plugin for NoopPlugin {}
