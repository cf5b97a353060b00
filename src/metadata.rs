use crate::error::{IoContext, Result, SaveError};
use chrono::{DateTime, Utc};
use oci_spec::image::ImageConfiguration;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;

/// The part of `image inspect` output the analyzers need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageInspect {
    #[serde(default, rename = "Id")]
    pub id: String,
    #[serde(default, rename = "RepoTags", deserialize_with = "null_as_empty")]
    pub repo_tags: Vec<String>,
    #[serde(default, rename = "RootFS")]
    pub root_fs: RootFs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootFs {
    #[serde(default, rename = "Type")]
    pub fs_type: String,
    #[serde(default, rename = "Layers", deserialize_with = "null_as_empty")]
    pub layers: Vec<String>,
}

impl ImageInspect {
    /// First repo tag, falling back to the reference the image was asked for.
    pub fn display_name<'a>(&'a self, reference: &'a str) -> &'a str {
        self.repo_tags.first().map(String::as_str).unwrap_or(reference)
    }
}

/// Image config blob reduced to layer bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageConfig {
    pub diff_ids: Vec<String>,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub created_by: String,
    pub created: Option<DateTime<Utc>>,
    pub empty_layer: bool,
}

impl ImageConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read(path).at_path(path)?;
        Self::from_slice(&content, path)
    }

    /// Parses a config blob; `path` only labels errors.
    pub fn from_slice(content: &[u8], path: &Path) -> Result<Self> {
        let config: ImageConfiguration =
            serde_json::from_slice(content).map_err(|source| SaveError::ConfigCorrupt {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_oci_config(&config))
    }

    pub fn from_oci_config(config: &ImageConfiguration) -> Self {
        let history = config
            .history()
            .as_ref()
            .map(|entries| {
                entries
                    .iter()
                    .map(|h| HistoryEntry {
                        created_by: h.created_by().clone().unwrap_or_default(),
                        created: h.created().as_deref().and_then(parse_timestamp),
                        empty_layer: h.empty_layer().unwrap_or(false),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            diff_ids: config.rootfs().diff_ids().clone(),
            history,
        }
    }

    /// History entries that produced a filesystem layer, in build order.
    pub fn layer_history(&self) -> Vec<&HistoryEntry> {
        self.history.iter().filter(|h| !h.empty_layer).collect()
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Runtimes emit `null` instead of `[]` for untagged images.
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
