//! Which layers survive a filtered save.
//!
//! A [`RetentionPolicy`] says how many of the most recent layers to keep per
//! image. [`layers_to_exclude`] turns that into the oldest-first prefix of
//! `ManifestRecord::layers` that the re-packager leaves out. The newest layer
//! is never dropped: when the policy would keep all layers or fewer than one,
//! nothing is excluded.

use crate::error::{Result, SaveError};
use crate::manifest::ManifestRecord;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Pass-through export.
    #[default]
    KeepAll,
    /// Keep the last N layers of every image.
    Last(usize),
    /// Keep the last N layers per requested image, by position. The final
    /// value applies to every image past the end of the list.
    PerImage(Vec<usize>),
    /// Keep only the newest layer of every image.
    LatestOnly,
}

impl RetentionPolicy {
    /// Combines the `--last` and `--latest` flags.
    pub fn from_flags(last: Option<RetentionPolicy>, latest: bool) -> Self {
        if latest {
            RetentionPolicy::LatestOnly
        } else {
            last.unwrap_or_default()
        }
    }

    /// Whether any layer can be dropped at all.
    pub fn filters(&self) -> bool {
        match self {
            RetentionPolicy::KeepAll | RetentionPolicy::Last(0) => false,
            RetentionPolicy::Last(_) | RetentionPolicy::PerImage(_) => true,
            RetentionPolicy::LatestOnly => true,
        }
    }

    /// Number of trailing layers to keep for `record`; 0 means keep all.
    pub fn keep_count(&self, record: &ManifestRecord, images: &[String]) -> usize {
        match self {
            RetentionPolicy::KeepAll => 0,
            RetentionPolicy::Last(n) => *n,
            RetentionPolicy::LatestOnly => 1,
            RetentionPolicy::PerImage(values) => {
                let Some(position) = images.iter().position(|i| record.matches_reference(i))
                else {
                    log::debug!(
                        "No requested image matches {}, keeping all layers",
                        record.config
                    );
                    return 0;
                };
                values
                    .get(position)
                    .or_else(|| values.last())
                    .copied()
                    .unwrap_or(0)
            }
        }
    }
}

impl FromStr for RetentionPolicy {
    type Err = SaveError;

    /// `"3"` keeps the last 3 layers of every image, `"0,2"` is per image.
    fn from_str(s: &str) -> Result<Self> {
        let parse = |value: &str| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| SaveError::InvalidRetention(s.to_string()))
        };

        if s.contains(',') {
            let values = s.split(',').map(parse).collect::<Result<Vec<_>>>()?;
            Ok(RetentionPolicy::PerImage(values))
        } else {
            Ok(RetentionPolicy::Last(parse(s)?))
        }
    }
}

/// Oldest-first layer paths of `record` to leave out of the archive.
pub fn layers_to_exclude<'a>(
    record: &'a ManifestRecord,
    policy: &RetentionPolicy,
    images: &[String],
) -> &'a [String] {
    let keep = policy.keep_count(record, images);
    if keep == 0 {
        return &[];
    }
    match record.layers.len().checked_sub(keep) {
        Some(end) if end >= 1 => &record.layers[..end],
        _ => &[],
    }
}

/// Union of the excluded layer paths of every image, in manifest order.
pub fn plan_exclusions(
    records: &[ManifestRecord],
    policy: &RetentionPolicy,
    images: &[String],
) -> Vec<String> {
    let mut excluded: Vec<String> = Vec::new();
    for record in records {
        for layer in layers_to_exclude(record, policy, images) {
            if !excluded.contains(layer) {
                excluded.push(layer.clone());
            }
        }
    }
    excluded
}
