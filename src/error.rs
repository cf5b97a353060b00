use std::io;
use std::path::PathBuf;

/// Failures of the export, analysis and re-packaging pipeline.
#[derive(thiserror::Error, Debug)]
pub enum SaveError {
    #[error("No such image: {0}")]
    NotFound(String),

    #[error("Path '{path}' escapes the export directory {}", .root.display())]
    PathEscape { path: String, root: PathBuf },

    #[error("Invalid manifest {}: {source}", .path.display())]
    ManifestCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid image config {}: {source}", .path.display())]
    ConfigCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "Layer data of {image} is inconsistent: {history} non-empty history entries, \
         {diff_ids} diff IDs, {layers} layers"
    )]
    DataInconsistent {
        image: String,
        history: usize,
        diff_ids: usize,
        layers: usize,
    },

    #[error("I/O error in {}: {0}", .1.display())]
    Io(#[source] io::Error, PathBuf),

    #[error("cowardly refusing to save to a terminal. Use the -o flag or redirect")]
    TerminalOutput,

    #[error("Invalid output path {}: {1}", .0.display())]
    InvalidOutput(PathBuf, String),

    #[error("Invalid retention value '{0}': expected a number or comma separated numbers")]
    InvalidRetention(String),

    #[error("No images given: name at least one image or use a cache directory")]
    NoImages,

    #[error("{command} failed: {message}")]
    Runtime { command: String, message: String },
}

pub type Result<T, E = SaveError> = std::result::Result<T, E>;

/// Attach a path to an `io::Result`.
pub(crate) trait IoContext<T> {
    fn at_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| SaveError::Io(e, path.into()))
    }
}
