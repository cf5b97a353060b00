//! Positional comparison of two images' layer digests.

use crate::stats::truncate_middle;
use std::io::{self, Write};

const COLUMN_WIDTH: usize = 35;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffRow {
    Same(String),
    /// Digest of the first and second image; empty when that image has no
    /// layer at this position.
    Different(String, String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerDiff {
    pub rows: Vec<DiffRow>,
    /// Positions whose digests differ.
    pub different: usize,
    /// Positions from the first difference onward, differing or not: the
    /// layers a filtered save would have to carry.
    pub since_divergence: usize,
}

impl LayerDiff {
    pub fn compute(layers0: &[String], layers1: &[String]) -> Self {
        let mut diff = LayerDiff::default();
        let mut diverged = false;

        for i in 0..layers0.len().max(layers1.len()) {
            let layer0 = layers0.get(i).map(String::as_str).unwrap_or("");
            let layer1 = layers1.get(i).map(String::as_str).unwrap_or("");

            if layer0 == layer1 {
                diff.rows.push(DiffRow::Same(layer0.to_string()));
            } else {
                diff.rows
                    .push(DiffRow::Different(layer0.to_string(), layer1.to_string()));
                diff.different += 1;
                diverged = true;
            }
            if diverged {
                diff.since_divergence += 1;
            }
        }
        diff
    }

    /// Text report: a header with both image names, one line per position,
    /// and the two counters.
    pub fn render<W: Write + ?Sized>(&self, out: &mut W, name0: &str, name1: &str) -> io::Result<()> {
        writeln!(
            out,
            "{:>width$} {:>width$}",
            truncate_middle(name0, COLUMN_WIDTH),
            truncate_middle(name1, COLUMN_WIDTH),
            width = COLUMN_WIDTH
        )?;
        writeln!(out)?;

        for row in &self.rows {
            match row {
                DiffRow::Same(layer) => writeln!(out, "{}", layer)?,
                DiffRow::Different(layer0, layer1) => writeln!(
                    out,
                    "{:>width$} {:>width$}",
                    truncate_middle(layer0, COLUMN_WIDTH),
                    truncate_middle(layer1, COLUMN_WIDTH),
                    width = COLUMN_WIDTH
                )?,
            }
        }

        writeln!(out, "\nNumber of Different Layers: {}", self.different)?;
        writeln!(out, "\nParam of Export Different Layers: {}", self.since_divergence)
    }
}
