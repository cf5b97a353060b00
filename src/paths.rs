//! Scope-bounded resolution of paths referenced by an export directory.
//!
//! Paths taken from `manifest.json` are relative to the export root. They are
//! resolved lexically first (so `..` cannot climb above the root), then any
//! symlinks along the way are followed and the final location must still be
//! inside the canonical root. Anything else is a [`SaveError::PathEscape`].

use crate::error::{IoContext, Result, SaveError};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve `relative` against `root`, rejecting any path that leaves `root`.
///
/// When the path does not exist, its deepest existing ancestor is resolved and
/// checked instead, and the missing components are appended to it. Opening
/// such a path reports the usual I/O error.
pub fn resolve_in_scope(root: &Path, relative: &str) -> Result<PathBuf> {
    let escape = || SaveError::PathEscape {
        path: relative.to_string(),
        root: root.to_path_buf(),
    };

    let mut normalized = PathBuf::new();
    for comp in Path::new(relative).components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(escape());
                }
            }
            Component::Normal(c) => normalized.push(c),
            Component::RootDir | Component::Prefix(_) => return Err(escape()),
        }
    }

    let canonical_root = root.canonicalize().at_path(root)?;
    let components: Vec<_> = normalized.components().collect();

    for existing in (0..=components.len()).rev() {
        let ancestor = components[..existing]
            .iter()
            .fold(root.to_path_buf(), |path, c| path.join(c));
        match ancestor.canonicalize() {
            Ok(resolved) if resolved.starts_with(&canonical_root) => {
                let mut resolved = resolved;
                for c in &components[existing..] {
                    resolved.push(c);
                }
                return Ok(resolved);
            }
            Ok(_) => return Err(escape()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(SaveError::Io(e, ancestor)),
        }
    }

    Err(SaveError::Io(
        io::Error::new(io::ErrorKind::NotFound, "export directory does not exist"),
        root.to_path_buf(),
    ))
}
