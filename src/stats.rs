//! Per-layer size and build command statistics.
//!
//! Layer `i` of a manifest record, diff ID `i` of its config and the `i`-th
//! history entry that produced a layer describe the same layer. When the
//! three lists disagree in length they cannot be paired, and the image is
//! reported as [`SaveError::DataInconsistent`] with no rows.

use crate::error::{IoContext, Result, SaveError};
use crate::manifest::ManifestRecord;
use crate::metadata::ImageConfig;
use crate::paths::resolve_in_scope;
use chrono::{DateTime, Utc};
use indicatif::DecimalBytes;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

pub const COMMAND_WIDTH: usize = 64;
const BUILDKIT_SUFFIX: &str = " # buildkit";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerStatsItem {
    pub number: usize,
    pub diff_id: String,
    pub layer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    pub command: String,
    pub size: u64,
}

impl LayerStatsItem {
    pub fn format(&self) -> String {
        let created = self
            .created
            .map(|c| c.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "Layer {:2}: Size {:>8}, Created {}, {:<width$} DiffID: {} Layer: {}",
            self.number,
            DecimalBytes(self.size).to_string(),
            created,
            format_command(&self.command, COMMAND_WIDTH),
            self.diff_id,
            self.layer,
            width = COMMAND_WIDTH
        )
    }
}

/// One row per layer of `record`, read from the export directory.
pub fn layer_stats(export_dir: &Path, record: &ManifestRecord) -> Result<Vec<LayerStatsItem>> {
    let config_path = resolve_in_scope(export_dir, &record.config)?;
    let config = ImageConfig::from_file(&config_path)?;

    let history = config.layer_history();
    if history.len() != config.diff_ids.len() || history.len() != record.layers.len() {
        return Err(SaveError::DataInconsistent {
            image: record
                .repo_tags
                .first()
                .cloned()
                .unwrap_or_else(|| record.config.clone()),
            history: history.len(),
            diff_ids: config.diff_ids.len(),
            layers: record.layers.len(),
        });
    }

    let mut items = Vec::with_capacity(history.len());
    for (i, entry) in history.into_iter().enumerate() {
        let layer_path = resolve_in_scope(export_dir, &record.layers[i])?;
        let size = fs::metadata(&layer_path).at_path(&layer_path)?.len();

        items.push(LayerStatsItem {
            number: i + 1,
            diff_id: config.diff_ids[i].clone(),
            layer: record.layers[i].clone(),
            created: entry.created,
            command: entry.created_by.clone(),
            size,
        });
    }
    Ok(items)
}

/// Header line, then one text or JSON line per layer.
pub fn render_stats<W: Write + ?Sized>(
    out: &mut W,
    record: &ManifestRecord,
    items: &[LayerStatsItem],
    json: bool,
) -> io::Result<()> {
    if json {
        for item in items {
            serde_json::to_writer(&mut *out, item)?;
            writeln!(out)?;
        }
        return Ok(());
    }

    writeln!(out, "Start Stats of {}", record.identity())?;
    for item in items {
        writeln!(out, "{}", item.format())?;
    }
    Ok(())
}

/// Collapses whitespace, drops the buildkit marker and shortens to `width`.
pub fn format_command(command: &str, width: usize) -> String {
    let collapsed = command.split_whitespace().collect::<Vec<_>>().join(" ");
    let command = collapsed
        .strip_suffix(BUILDKIT_SUFFIX)
        .unwrap_or(&collapsed);
    truncate_middle(command, width)
}

/// Keeps the head and tail of `s`, joined by `...`, so that the result is
/// `width` characters long. Two thirds of the budget go to the head.
pub fn truncate_middle(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len <= width {
        return s.to_string();
    }
    let tail = width / 3;
    let head = width.saturating_sub(tail + 3);

    let mut out: String = s.chars().take(head).collect();
    out.push_str("...");
    out.extend(s.chars().skip(len - tail));
    out
}
