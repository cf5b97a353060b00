//! Export directory lifecycle tests
//!
//! The directory must be created only once every image is known, and removed
//! on every exit path unless the caller keeps it or supplied it.

#[cfg(test)]
mod tests {
    use crate::integration::common::fixtures::{base_and_app, ArchiveBuilder, Layout};
    use crate::integration::common::{dirs_with_prefix, tree_members, MockSource};
    use docker_save::export_dir::{export_stream, ExportDir};
    use docker_save::{Notifier, SaveError, WorkdirOptions};
    use std::io::Read;
    use tempfile::TempDir;

    fn source() -> MockSource {
        let (base, app) = base_and_app();
        MockSource::new(&ArchiveBuilder::new(Layout::Legacy).image(base).image(app))
    }

    fn options(workdir: &TempDir) -> WorkdirOptions {
        WorkdirOptions {
            workdir: workdir.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_unknown_image_creates_no_directory() {
        let workdir = TempDir::new().unwrap();
        let source = source();
        let images = vec!["app:1".to_string(), "missing:1".to_string()];

        let result = ExportDir::materialize(
            &source,
            &images,
            &options(&workdir),
            "app-1-",
            &Notifier::new(0),
        );

        match result {
            Err(SaveError::NotFound(image)) => assert_eq!(image, "missing:1"),
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert_eq!(source.exports(), 0);
        assert!(dirs_with_prefix(workdir.path(), "app-1-").is_empty());
    }

    #[test]
    fn test_directory_removed_on_drop() {
        let workdir = TempDir::new().unwrap();
        let source = source();
        let images = vec!["app:1".to_string()];

        let export = ExportDir::materialize(
            &source,
            &images,
            &options(&workdir),
            "app-1-",
            &Notifier::new(0),
        )
        .unwrap();

        let path = export.path().to_path_buf();
        assert!(export.is_temporary());
        assert!(path.starts_with(workdir.path()));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("app-1-"));
        assert!(path.join("manifest.json").is_file());
        assert_eq!(source.exports(), 1);

        drop(export);
        assert!(!path.exists());
    }

    #[test]
    fn test_keep_leaves_directory_behind() {
        let workdir = TempDir::new().unwrap();
        let source = source();
        let images = vec!["base:1".to_string()];
        let options = WorkdirOptions {
            keep_temp_dir: true,
            ..options(&workdir)
        };

        let export =
            ExportDir::materialize(&source, &images, &options, "base-1-", &Notifier::new(0))
                .unwrap();
        let path = export.path().to_path_buf();
        assert!(!export.is_temporary());
        drop(export);

        assert!(path.join("manifest.json").is_file());
    }

    #[test]
    fn test_cache_dir_is_used_and_never_removed() {
        let workdir = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let (base, app) = base_and_app();
        let builder = ArchiveBuilder::new(Layout::Legacy).image(base).image(app);
        builder.extract_to(cache.path());
        let before = tree_members(cache.path());

        let source = MockSource::new(&builder);
        let options = WorkdirOptions {
            cache_dir: Some(cache.path().to_path_buf()),
            ..options(&workdir)
        };

        // A cache needs no image list and no runtime round-trip.
        let export =
            ExportDir::materialize(&source, &[], &options, "unused-", &Notifier::new(0)).unwrap();
        assert_eq!(export.path(), cache.path());
        assert!(!export.is_temporary());
        drop(export);

        assert_eq!(source.exports(), 0);
        assert_eq!(tree_members(cache.path()), before);
    }

    #[test]
    fn test_missing_cache_dir_fails() {
        let workdir = TempDir::new().unwrap();
        let options = WorkdirOptions {
            cache_dir: Some(workdir.path().join("nope")),
            ..options(&workdir)
        };

        let result = ExportDir::materialize(&source(), &[], &options, "x-", &Notifier::new(0));
        assert!(matches!(result, Err(SaveError::Io(..))));
    }

    #[test]
    fn test_no_images() {
        let workdir = TempDir::new().unwrap();
        let result =
            ExportDir::materialize(&source(), &[], &options(&workdir), "x-", &Notifier::new(0));
        assert!(matches!(result, Err(SaveError::NoImages)));
        assert!(matches!(
            export_stream(&source(), &[]),
            Err(SaveError::NoImages)
        ));
    }

    #[test]
    fn test_export_stream_checks_images_first() {
        let source = source();
        let result = export_stream(&source, &["nope:1".to_string()]);
        assert!(matches!(result, Err(SaveError::NotFound(_))));
        assert_eq!(source.exports(), 0);

        let mut stream = export_stream(&source, &["base:1".to_string()]).unwrap();
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, source.archive());
    }

    #[test]
    fn test_oci_layout_extracts() {
        let workdir = TempDir::new().unwrap();
        let (base, _) = base_and_app();
        let source = MockSource::new(&ArchiveBuilder::new(Layout::Oci).image(base));

        let export = ExportDir::materialize(
            &source,
            &["base:1".to_string()],
            &options(&workdir),
            "base-1-",
            &Notifier::new(0),
        )
        .unwrap();

        let members = tree_members(export.path());
        assert!(members.contains(&"oci-layout".to_string()), "{members:?}");
        assert!(members.contains(&format!("blobs/sha256/{}", "b".repeat(64))));
    }
}
