//! Command pipelines over a concrete [`Source`].
//!
//! [`ImageProcessor`] ties the pieces together:
//! - `save`: export, extract, plan exclusions, re-archive. When the retention
//!   policy keeps every layer the runtime's stream is copied through untouched.
//! - `diff`: compare the layer digests two images report through `inspect`.
//! - `stats`: per-layer sizes and build commands for every image of an export.
//!
//! Temporary export directories never outlive the call that created them,
//! unless the options say to keep them.

use crate::diff::LayerDiff;
use crate::error::{IoContext, Result, SaveError};
use crate::export_dir::{self, ExportDir};
use crate::manifest::resolve_manifests;
use crate::notifier::Notifier;
use crate::options::{SaveOptions, StatsOptions, STATS_TEMP_DIR_PREFIX};
use crate::repackager::{repackage, Destination};
use crate::retention::plan_exclusions;
use crate::sources::Source;
use crate::stats::{layer_stats, render_stats};
use std::io::{self, Write};
use std::time::Instant;

pub struct ImageProcessor<S: Source> {
    source: S,
    notifier: Notifier,
}

impl<S: Source> ImageProcessor<S> {
    pub fn new(source: S, notifier: Notifier) -> Self {
        Self { source, notifier }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Writes an archive of `options.images` to `destination`, leaving out
    /// the layers the retention policy excludes.
    ///
    /// Every image is checked before anything is exported; an unknown image
    /// fails the call with [`SaveError::NotFound`] and nothing is written.
    pub fn save<W: Write>(&self, options: &SaveOptions, destination: Destination<W>) -> Result<()> {
        let started = Instant::now();
        self.notifier.info(&format!(
            "Saving {} with {} source",
            options.images.join(", "),
            self.source.name()
        ));

        let result = if options.retention.filters() {
            self.save_filtered(options, destination)
        } else {
            self.save_unfiltered(options, destination)
        };

        self.notifier.finish();
        if result.is_ok() {
            self.notifier.debug(&format!(
                "Saved {} image(s) in {:.1?}",
                options.images.len(),
                started.elapsed()
            ));
        }
        result
    }

    fn save_unfiltered<W: Write>(
        &self,
        options: &SaveOptions,
        destination: Destination<W>,
    ) -> Result<()> {
        self.notifier.info("Streaming image archive...");
        let mut stream = export_dir::export_stream(&self.source, &options.images)?;
        let source_name = self.source.name().to_string();

        destination.write_with(|writer| {
            let copied = io::copy(&mut stream, writer).at_path(&source_name)?;
            log::debug!("Copied {} bytes from {}", copied, source_name);
            Ok(())
        })
    }

    fn save_filtered<W: Write>(
        &self,
        options: &SaveOptions,
        destination: Destination<W>,
    ) -> Result<()> {
        let export = ExportDir::materialize(
            &self.source,
            &options.images,
            &options.workdir,
            &options.temp_dir_prefix(),
            &self.notifier,
        )?;

        self.notifier.info("Reading manifest...");
        let records = resolve_manifests(export.path())?;
        self.notifier
            .debug(&format!("Found {} manifest record(s)", records.len()));

        let excluded = plan_exclusions(&records, &options.retention, &options.images);
        for layer in &excluded {
            self.notifier.debug(&format!("Excluding layer {}", layer));
        }

        self.notifier.info(&format!(
            "Writing archive without {} layer(s)...",
            excluded.len()
        ));
        destination.write_with(|writer| {
            repackage(export.path(), &excluded, writer)?;
            Ok(())
        })?;

        if !export.is_temporary() {
            self.notifier.info(&format!(
                "Export directory kept at {}",
                export.path().display()
            ));
        }
        Ok(())
    }

    /// Prints the positional layer comparison of two images.
    pub fn diff<W: Write + ?Sized>(
        &self,
        image0: &str,
        image1: &str,
        out: &mut W,
    ) -> Result<LayerDiff> {
        self.notifier.info(&format!("Inspecting {}...", image0));
        let inspect0 = self.source.inspect(image0)?;
        self.notifier.info(&format!("Inspecting {}...", image1));
        let inspect1 = self.source.inspect(image1)?;
        self.notifier.finish();

        let diff = LayerDiff::compute(&inspect0.root_fs.layers, &inspect1.root_fs.layers);
        diff.render(
            out,
            inspect0.display_name(image0),
            inspect1.display_name(image1),
        )
        .at_path("<stdout>")?;
        Ok(diff)
    }

    /// Prints layer statistics for every image of the export.
    ///
    /// An image whose layer data cannot be paired is reported and skipped;
    /// the others are still printed. The first such error is returned once
    /// every image has been handled.
    pub fn stats<W: Write + ?Sized>(&self, options: &StatsOptions, out: &mut W) -> Result<()> {
        let export = ExportDir::materialize(
            &self.source,
            &options.images,
            &options.workdir,
            STATS_TEMP_DIR_PREFIX,
            &self.notifier,
        )?;

        self.notifier.info("Reading manifest...");
        let records = resolve_manifests(export.path())?;
        self.notifier.finish();

        let mut first_error: Option<SaveError> = None;
        for record in &records {
            match layer_stats(export.path(), record) {
                Ok(items) => {
                    render_stats(out, record, &items, options.json).at_path("<stdout>")?;
                }
                Err(e @ SaveError::DataInconsistent { .. }) => {
                    self.notifier.warn(&e.to_string());
                    first_error.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }
        out.flush().at_path("<stdout>")?;

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
