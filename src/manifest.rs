//! `manifest.json` of a materialized export directory.

use crate::error::{IoContext, Result, SaveError};
use crate::metadata::null_as_empty;
use crate::paths::resolve_in_scope;
use crate::sources::naming;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// One exported image as listed in `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    #[serde(rename = "Config")]
    pub config: String,
    #[serde(default, rename = "RepoTags", deserialize_with = "null_as_empty")]
    pub repo_tags: Vec<String>,
    /// Layer paths, oldest first.
    #[serde(rename = "Layers")]
    pub layers: Vec<String>,
}

impl ManifestRecord {
    /// Whether `reference` names this image, either by one of its repo tags
    /// or as a prefix of its config blob path.
    ///
    /// Tags are checked before the config path.
    pub fn matches_reference(&self, reference: &str) -> bool {
        let tagged = naming::with_default_tag(reference);
        if self.repo_tags.iter().any(|t| t == reference || *t == tagged) {
            return true;
        }

        let id = reference.strip_prefix("sha256:").unwrap_or(reference);
        if id.is_empty() {
            return false;
        }
        let file_name = Path::new(&self.config)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.config);
        self.config.starts_with(reference) || self.config.starts_with(id) || file_name.starts_with(id)
    }

    /// Short human identity: the first repo tag, or the config id.
    pub fn identity(&self) -> String {
        match self.repo_tags.first() {
            Some(tag) => format!("Image Tag: {}", tag),
            None => format!("Image Id: {}", self.short_id()),
        }
    }

    pub fn short_id(&self) -> String {
        let file_name = Path::new(&self.config)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.config);
        file_name.chars().take(12).collect()
    }
}

/// Read and validate `manifest.json` from an export directory.
///
/// Every config and layer path must stay inside `export_dir`.
pub fn resolve_manifests(export_dir: &Path) -> Result<Vec<ManifestRecord>> {
    let manifest_path = resolve_in_scope(export_dir, MANIFEST_FILE_NAME)?;
    let content = fs::read(&manifest_path).at_path(&manifest_path)?;
    let records = parse_manifest(&content, &manifest_path)?;

    for record in &records {
        resolve_in_scope(export_dir, &record.config)?;
        for layer in &record.layers {
            resolve_in_scope(export_dir, layer)?;
        }
    }

    log::debug!(
        "Resolved {} image(s) from {}",
        records.len(),
        manifest_path.display()
    );
    Ok(records)
}

pub(crate) fn parse_manifest(content: &[u8], path: &Path) -> Result<Vec<ManifestRecord>> {
    serde_json::from_slice(content).map_err(|source| SaveError::ManifestCorrupt {
        path: path.to_path_buf(),
        source,
    })
}
