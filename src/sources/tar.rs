use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use super::Source;
use crate::error::{IoContext, Result, SaveError};
use crate::manifest::{parse_manifest, MANIFEST_FILE_NAME};
use crate::metadata::{ImageConfig, ImageInspect, RootFs};
use crate::tar_extractor::{normalize_tar_path, open_archive};
use tar_rs as tar;

/// Uses a previously saved image archive (plain or gzipped) as the runtime.
///
/// `export` returns the whole archive regardless of which images are asked
/// for; `inspect` answers from the archive's manifest and config blobs.
pub struct TarSource {
    archive: PathBuf,
}

impl TarSource {
    pub fn new(archive: impl Into<PathBuf>) -> Result<Self> {
        let archive = archive.into();

        if !archive.is_file() {
            return Err(SaveError::Io(
                io::Error::new(io::ErrorKind::NotFound, "image archive is not a file"),
                archive,
            ));
        }

        Ok(Self { archive })
    }

    fn open(&self) -> Result<Box<dyn Read>> {
        let file = File::open(&self.archive).at_path(&self.archive)?;
        open_archive(file).at_path(&self.archive)
    }

    /// Reads the content of the member at `name`, if present.
    fn read_member(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let wanted = normalize_tar_path(Path::new(name));
        let mut archive = tar::Archive::new(self.open()?);

        for entry in archive.entries().at_path(&self.archive)? {
            let mut entry = entry.at_path(&self.archive)?;
            let path = normalize_tar_path(&entry.path().at_path(&self.archive)?);
            if path == wanted && entry.header().entry_type().is_file() {
                let mut content = Vec::new();
                entry.read_to_end(&mut content).at_path(&self.archive)?;
                return Ok(Some(content));
            }
        }
        Ok(None)
    }

    fn require_member(&self, name: &str) -> Result<Vec<u8>> {
        self.read_member(name)?.ok_or_else(|| {
            SaveError::Io(
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} not found in archive", name),
                ),
                self.archive.clone(),
            )
        })
    }
}

impl Source for TarSource {
    fn name(&self) -> &str {
        "tar"
    }

    fn export(&self, _images: &[String]) -> Result<Box<dyn Read>> {
        log::info!("Reading image archive {}", self.archive.display());
        self.open()
    }

    fn inspect(&self, image: &str) -> Result<ImageInspect> {
        let manifest = self.require_member(MANIFEST_FILE_NAME)?;
        let records = parse_manifest(&manifest, &self.archive.join(MANIFEST_FILE_NAME))?;
        let record = records
            .into_iter()
            .find(|r| r.matches_reference(image))
            .ok_or_else(|| SaveError::NotFound(image.to_string()))?;

        let content = self.require_member(&record.config)?;
        let config = ImageConfig::from_slice(&content, &self.archive.join(&record.config))?;

        let id = Path::new(&record.config)
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.trim_end_matches(".json"))
            .unwrap_or(&record.config);

        Ok(ImageInspect {
            id: format!("sha256:{}", id),
            repo_tags: record.repo_tags.clone(),
            root_fs: RootFs {
                fs_type: "layers".to_string(),
                layers: config.diff_ids,
            },
        })
    }
}
