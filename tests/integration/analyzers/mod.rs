//! `diff` and `stats` over fixture images.

#[cfg(test)]
mod tests {
    use crate::integration::common::fixtures::{base_and_app, ArchiveBuilder, FixtureImage, Layout};
    use crate::integration::common::{dirs_with_prefix, MockSource};
    use docker_save::options::STATS_TEMP_DIR_PREFIX;
    use docker_save::{ImageProcessor, Notifier, SaveError, StatsOptions, WorkdirOptions};
    use tempfile::TempDir;

    fn processor(builder: &ArchiveBuilder) -> ImageProcessor<MockSource> {
        ImageProcessor::new(MockSource::new(builder), Notifier::new(0))
    }

    fn stats_options(workdir: &TempDir, images: &[&str]) -> StatsOptions {
        StatsOptions {
            images: images.iter().map(|s| s.to_string()).collect(),
            workdir: WorkdirOptions {
                workdir: workdir.path().to_path_buf(),
                ..Default::default()
            },
            json: false,
        }
    }

    #[test]
    fn test_diff_base_and_app() {
        let (base, app) = base_and_app();
        let diff_ids = app.diff_ids();
        let processor = processor(&ArchiveBuilder::new(Layout::Legacy).image(base).image(app));

        let mut out = Vec::new();
        let diff = processor.diff("base:1", "app:1", &mut out).unwrap();
        assert_eq!(diff.different, 1);
        assert_eq!(diff.since_divergence, 1);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], format!("{:>35} {:>35}", "base:1", "app:1"));
        assert_eq!(lines[2], diff_ids[0]);
        assert!(lines[5].starts_with(&" ".repeat(35)), "{}", lines[5]);
        assert!(text.ends_with("Param of Export Different Layers: 1\n"));
    }

    #[test]
    fn test_diff_identical_and_unknown_images() {
        let (base, _) = base_and_app();
        let builder = ArchiveBuilder::new(Layout::Legacy).image(base);
        let processor = processor(&builder);

        let mut out = Vec::new();
        let diff = processor.diff("base:1", "base:1", &mut out).unwrap();
        assert_eq!(diff.different, 0);

        let result = processor.diff("base:1", "ghost:1", &mut Vec::new());
        assert!(matches!(result, Err(SaveError::NotFound(_))));
    }

    #[test]
    fn test_stats_text() {
        let workdir = TempDir::new().unwrap();
        let (base, app) = base_and_app();
        let other = FixtureImage::new("other:1", 'e', &[("e1", "ADD rootfs.tar /")]);
        let processor = processor(
            &ArchiveBuilder::new(Layout::Legacy)
                .image(base)
                .image(app)
                .image(other),
        );

        let mut out = Vec::new();
        processor
            .stats(&stats_options(&workdir, &["base:1", "app:1"]), &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Start Stats of Image Tag: base:1\n"), "{text}");
        assert!(text.contains("Start Stats of Image Tag: app:1\n"), "{text}");
        let rows: Vec<&str> = text.lines().filter(|l| l.starts_with("Layer ")).collect();
        // Every record of the export is reported, requested or not.
        assert_eq!(rows.len(), 3 + 4 + 1);
        assert!(rows[0].starts_with("Layer  1: Size "), "{}", rows[0]);
        assert!(rows[0].contains("Created 2024-01-02T03:04:05Z, "), "{}", rows[0]);
        assert!(rows[1].contains("RUN apk add --no-cache curl "), "{}", rows[1]);
        assert!(!rows[1].contains("buildkit"), "{}", rows[1]);

        assert!(dirs_with_prefix(workdir.path(), STATS_TEMP_DIR_PREFIX).is_empty());
    }

    #[test]
    fn test_stats_json() {
        let workdir = TempDir::new().unwrap();
        let (base, _) = base_and_app();
        let diff_ids = base.diff_ids();
        let processor = processor(&ArchiveBuilder::new(Layout::Oci).image(base));

        let mut options = stats_options(&workdir, &["base:1"]);
        options.json = true;
        let mut out = Vec::new();
        processor.stats(&options, &mut out).unwrap();

        let rows: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2]["number"], 3);
        assert_eq!(rows[2]["diff_id"], diff_ids[2].as_str());
        assert!(rows[2]["size"].as_u64().unwrap() > 0);
        assert_eq!(
            rows[0]["layer"],
            format!("blobs/sha256/{:0>64}", "a1").as_str()
        );
    }

    #[test]
    fn test_stats_inconsistent_image_is_skipped() {
        let workdir = TempDir::new().unwrap();
        let (base, mut app) = base_and_app();
        app.missing_diff_ids = 1;
        let processor = processor(&ArchiveBuilder::new(Layout::Legacy).image(app).image(base));

        let mut out = Vec::new();
        let result = processor.stats(&stats_options(&workdir, &["app:1", "base:1"]), &mut out);

        match result {
            Err(SaveError::DataInconsistent {
                image,
                history,
                diff_ids,
                layers,
            }) => {
                assert_eq!(image, "app:1");
                assert_eq!((history, diff_ids, layers), (4, 3, 4));
            }
            other => panic!("expected DataInconsistent, got {other:?}"),
        }

        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("Image Tag: app:1"), "{text}");
        assert!(text.contains("Start Stats of Image Tag: base:1"), "{text}");
        assert!(dirs_with_prefix(workdir.path(), STATS_TEMP_DIR_PREFIX).is_empty());
    }

    #[test]
    fn test_stats_from_cache_without_images() {
        let workdir = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let (base, _) = base_and_app();
        let builder = ArchiveBuilder::new(Layout::Legacy).image(base.untagged());
        builder.extract_to(cache.path());

        let mut options = stats_options(&workdir, &[]);
        options.workdir.cache_dir = Some(cache.path().to_path_buf());

        let processor = processor(&builder);
        let mut out = Vec::new();
        processor.stats(&options, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Start Stats of Image Id: bbbbbbbbbbbb\n"), "{text}");
        assert_eq!(processor.source().exports(), 0);
        assert!(cache.path().join("manifest.json").is_file());
    }
}
