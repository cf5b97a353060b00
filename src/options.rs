//! Configuration records for the commands.
//!
//! Each command's flags are converted once into one of these records; the
//! pipeline never reads flags or environment on its own.

use crate::retention::RetentionPolicy;
use std::path::PathBuf;

/// Where and how the export directory is materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkdirOptions {
    /// Parent of the temporary export directory. Default: `.`.
    pub workdir: PathBuf,
    /// Leave the temporary export directory behind. Default: `false`.
    pub keep_temp_dir: bool,
    /// Already extracted export directory to use instead of exporting.
    /// Never modified or removed. Default: none.
    pub cache_dir: Option<PathBuf>,
}

impl Default for WorkdirOptions {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            keep_temp_dir: false,
            cache_dir: None,
        }
    }
}

impl WorkdirOptions {
    /// Whether the export directory must be removed once the command is done.
    pub fn should_clean(&self) -> bool {
        !self.keep_temp_dir && self.cache_dir.is_none()
    }
}

/// Options of `save`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
    pub images: Vec<String>,
    /// Archive file to write; `None` writes to stdout.
    pub output: Option<PathBuf>,
    pub workdir: WorkdirOptions,
    pub retention: RetentionPolicy,
}

impl SaveOptions {
    /// Prefix of the temporary export directory.
    pub fn temp_dir_prefix(&self) -> String {
        match self.output.as_ref().and_then(|o| o.file_name()) {
            Some(name) => format!("{}-", name.to_string_lossy()),
            None => crate::sources::naming::images_prefix(&self.images),
        }
    }
}

/// Options of `stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsOptions {
    pub images: Vec<String>,
    pub workdir: WorkdirOptions,
    /// One JSON object per layer instead of text rows.
    pub json: bool,
}

pub const STATS_TEMP_DIR_PREFIX: &str = "docker-stats-";
