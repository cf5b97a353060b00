//! Re-archive an export directory without the excluded layers.

use crate::error::{IoContext, Result, SaveError};
use crate::tar_extractor::normalize_tar_path;
use std::collections::HashSet;
use std::fs;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tar_rs as tar;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Where the archive goes.
pub enum Destination<W: Write> {
    /// Written to a temporary file next to the path, then renamed over it.
    File(PathBuf),
    Stream(W),
}

impl Destination<io::Stdout> {
    /// A file when `output` is given, otherwise stdout unless it is a terminal.
    pub fn from_output(output: Option<&Path>) -> Result<Self> {
        match output {
            Some(path) => Destination::file(path),
            None => {
                let stdout = io::stdout();
                let is_terminal = stdout.is_terminal();
                Destination::stream(stdout, is_terminal)
            }
        }
    }
}

impl<W: Write> Destination<W> {
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        validate_output_path(path)?;
        Ok(Destination::File(path.to_path_buf()))
    }

    /// Archive bytes are never written to an interactive terminal.
    pub fn stream(writer: W, is_terminal: bool) -> Result<Self> {
        if is_terminal {
            return Err(SaveError::TerminalOutput);
        }
        Ok(Destination::Stream(writer))
    }

    /// Runs `write` against the destination and commits the result.
    ///
    /// A file destination is only replaced once `write` has succeeded.
    pub fn write_with<F>(self, write: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> Result<()>,
    {
        match self {
            Destination::Stream(mut writer) => {
                write(&mut writer)?;
                writer.flush().at_path("<stdout>")
            }
            Destination::File(path) => {
                let parent = match path.parent() {
                    Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                let mut temp = NamedTempFile::new_in(&parent).at_path(&parent)?;

                {
                    let mut writer = BufWriter::new(temp.as_file_mut());
                    write(&mut writer)?;
                    writer.flush().at_path(&path)?;
                }
                temp.as_file().sync_all().at_path(&path)?;

                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    if let Err(e) =
                        fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o644))
                    {
                        log::warn!("Could not set permissions on {}: {}", path.display(), e);
                    }
                }

                temp.persist(&path)
                    .map_err(|e| SaveError::Io(e.error, path.clone()))?;
                log::debug!("Wrote {}", path.display());
                Ok(())
            }
        }
    }
}

/// Rejects output paths that can never be written.
pub fn validate_output_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(SaveError::InvalidOutput(
                path.to_path_buf(),
                format!("directory {} does not exist", parent.display()),
            ));
        }
    }
    if path.is_dir() {
        return Err(SaveError::InvalidOutput(
            path.to_path_buf(),
            "must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepackSummary {
    /// Entries written to the archive.
    pub entries: usize,
    /// Excluded entries (a skipped directory counts once).
    pub skipped: usize,
}

/// Writes an uncompressed tar of everything under `export_dir` to `writer`,
/// leaving out every entry whose relative path is in `excluded`, along with
/// everything below it.
///
/// Entries are written in sorted order; symlinks are stored as symlinks.
pub fn repackage(
    export_dir: &Path,
    excluded: &[String],
    writer: &mut dyn Write,
) -> Result<RepackSummary> {
    let excluded: HashSet<PathBuf> = excluded
        .iter()
        .map(|e| normalize_tar_path(Path::new(e)))
        .collect();

    let mut builder = tar::Builder::new(writer);
    builder.follow_symlinks(false);

    let mut summary = RepackSummary::default();
    let mut walker = WalkDir::new(export_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(walk_error)?;
        let Ok(rel_path) = entry.path().strip_prefix(export_dir) else {
            continue;
        };

        if excluded.contains(rel_path) {
            log::debug!("Excluding {}", rel_path.display());
            summary.skipped += 1;
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        builder
            .append_path_with_name(entry.path(), rel_path)
            .at_path(entry.path())?;
        summary.entries += 1;
    }

    builder.into_inner().at_path(export_dir)?;
    log::info!(
        "Archived {} entries from {}, skipped {} excluded",
        summary.entries,
        export_dir.display(),
        summary.skipped
    );
    Ok(summary)
}

fn walk_error(err: walkdir::Error) -> SaveError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    SaveError::Io(err.into(), path)
}
