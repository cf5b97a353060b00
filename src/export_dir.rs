//! Materialize a runtime's image export on disk.
//!
//! [`ExportDir`] is the extracted form of a `docker save` stream: a directory
//! holding `manifest.json`, the config blobs and one entry per layer. The
//! re-packager and the stats analyzer need random access to individual layer
//! files, which the stream alone cannot give.
//!
//! Key behavior:
//! - Every requested image is inspected first; one unknown reference fails the
//!   whole operation with `SaveError::NotFound` before any directory exists.
//! - A fresh directory named `<prefix>XXXXXX` is created under the workdir and
//!   the stream is extracted into it without touching file ownership.
//! - A caller supplied cache directory is used verbatim and never removed.
//! - Otherwise the directory is removed when the [`ExportDir`] is dropped, on
//!   success and error paths alike, unless the caller asked to keep it.

use crate::error::{IoContext, Result, SaveError};
use crate::metadata::ImageInspect;
use crate::notifier::Notifier;
use crate::options::WorkdirOptions;
use crate::sources::Source;
use crate::tar_extractor;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct ExportDir {
    path: PathBuf,
    cleanup: bool,
}

impl ExportDir {
    /// Exports `images` from `source` and extracts them into a new directory,
    /// or opens `options.cache_dir` when one is given.
    pub fn materialize<S: Source>(
        source: &S,
        images: &[String],
        options: &WorkdirOptions,
        prefix: &str,
        notifier: &Notifier,
    ) -> Result<Self> {
        if let Some(cache_dir) = &options.cache_dir {
            notifier.debug(&format!(
                "Using cached export directory {}",
                cache_dir.display()
            ));
            return Self::cached(cache_dir);
        }

        if images.is_empty() {
            return Err(SaveError::NoImages);
        }

        notifier.info("Checking images...");
        inspect_all(source, images)?;

        let path = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(&options.workdir)
            .at_path(&options.workdir)?
            .keep();
        let export_dir = ExportDir {
            path,
            cleanup: options.should_clean(),
        };
        notifier.debug(&format!(
            "Created export directory {}",
            export_dir.path.display()
        ));

        notifier.info(&format!(
            "Exporting {} image(s) from {}...",
            images.len(),
            source.name()
        ));
        let stream = source.export(images)?;

        notifier.info("Extracting image archive...");
        let entries = tar_extractor::extract_stream(stream, &export_dir.path)?;
        notifier.debug(&format!(
            "Extracted {} entries into {}",
            entries,
            export_dir.path.display()
        ));

        Ok(export_dir)
    }

    /// Wraps an existing, already extracted export directory.
    pub fn cached<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(SaveError::Io(
                io::Error::new(io::ErrorKind::NotFound, "cache directory does not exist"),
                path.to_path_buf(),
            ));
        }

        Ok(ExportDir {
            path: path.to_path_buf(),
            cleanup: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the directory is removed on drop.
    pub fn is_temporary(&self) -> bool {
        self.cleanup
    }
}

impl Drop for ExportDir {
    fn drop(&mut self) {
        if !self.cleanup {
            return;
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => log::debug!("Removed export directory {}", self.path.display()),
            Err(e) => log::warn!(
                "Failed to remove export directory {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Inspects every reference, failing on the first unknown one.
pub fn inspect_all<S: Source>(source: &S, images: &[String]) -> Result<Vec<ImageInspect>> {
    images.iter().map(|image| source.inspect(image)).collect()
}

/// The runtime's export stream, after checking that every image exists.
pub fn export_stream<S: Source>(source: &S, images: &[String]) -> Result<Box<dyn Read>> {
    if images.is_empty() {
        return Err(SaveError::NoImages);
    }
    inspect_all(source, images)?;
    source.export(images)
}
