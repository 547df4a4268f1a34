//! Watch mode: rebuild on content changes.
//!
//! A recursive [`notify`] watcher feeds raw filesystem events through a
//! debounce window: the rebuild fires one second after the *last*
//! relevant event, so a burst of saves (or an `rsync` into the content
//! tree) triggers a single rebuild instead of one per file.
//!
//! Irrelevant events never reset the window:
//!
//! - metadata-only changes (mtime/atime/chmod noise, which would
//!   otherwise loop forever against the output's own staleness checks)
//! - editor artifacts: backup/swap extensions, trailing `~`, dot-files
//!
//! The loop runs until the process is interrupted; rebuild failures are
//! reported and watching continues.

use notify::{Event, EventKind, RecursiveMode, Watcher, event::ModifyKind};
use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Quiet period after the last relevant event before a rebuild fires.
pub const DEBOUNCE: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Whether an event should count toward the debounce window.
fn is_relevant(event: &Event) -> bool {
    match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) => {}
        EventKind::Modify(kind) => {
            if matches!(kind, ModifyKind::Metadata(_)) {
                return false;
            }
        }
        _ => return false,
    }
    event.paths.iter().any(|p| !is_temp_file(p))
}

/// Editor artifacts and hidden files that should never trigger rebuilds.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Watch `roots` and invoke `rebuild` after each debounced change burst.
/// Runs forever; only watcher setup failures return.
pub fn watch<F>(roots: &[&Path], mut rebuild: F) -> Result<(), WatchError>
where
    F: FnMut(),
{
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;

    for root in roots {
        if root.exists() {
            watcher.watch(root, RecursiveMode::Recursive)?;
        }
    }

    let mut deadline: Option<Instant> = None;
    loop {
        let timeout = match deadline {
            Some(at) => at.saturating_duration_since(Instant::now()),
            None => Duration::from_secs(3600),
        };

        match rx.recv_timeout(timeout) {
            Ok(event) => {
                if is_relevant(&event) {
                    deadline = Some(Instant::now() + DEBOUNCE);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if deadline.take().is_some() {
                    rebuild();
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, MetadataKind, ModifyKind};
    use std::path::PathBuf;

    fn event(kind: EventKind, path: &str) -> Event {
        Event {
            kind,
            paths: vec![PathBuf::from(path)],
            attrs: Default::default(),
        }
    }

    // =========================================================================
    // Event relevance
    // =========================================================================

    #[test]
    fn content_writes_are_relevant() {
        let ev = event(
            EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Content)),
            "/content/post.md",
        );
        assert!(is_relevant(&ev));
    }

    #[test]
    fn creates_and_removes_are_relevant() {
        assert!(is_relevant(&event(
            EventKind::Create(CreateKind::File),
            "/content/new.md"
        )));
        assert!(is_relevant(&event(
            EventKind::Remove(notify::event::RemoveKind::File),
            "/content/old.md"
        )));
    }

    #[test]
    fn metadata_changes_are_noise() {
        let ev = event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)),
            "/content/post.md",
        );
        assert!(!is_relevant(&ev));
    }

    #[test]
    fn access_events_are_noise() {
        let ev = event(
            EventKind::Access(notify::event::AccessKind::Any),
            "/content/post.md",
        );
        assert!(!is_relevant(&ev));
    }

    #[test]
    fn editor_artifacts_are_filtered() {
        for path in [
            "/content/post.md.swp",
            "/content/post.md~",
            "/content/.post.md.kate-swp",
            "/content/post.bak",
            "/content/post.tmp",
        ] {
            let ev = event(
                EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Content)),
                path,
            );
            assert!(!is_relevant(&ev), "{path} should be filtered");
        }
    }

    #[test]
    fn mixed_paths_count_when_any_is_real() {
        let mut ev = event(
            EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Content)),
            "/content/post.md.swp",
        );
        ev.paths.push(PathBuf::from("/content/post.md"));
        assert!(is_relevant(&ev));
    }
}
