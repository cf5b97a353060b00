//! Docker integration tests
//!
//! Need a running docker daemon and network access to pull the test images.
//! Enabled with `--features docker`.

#[cfg(all(test, feature = "docker"))]
mod tests {
    use crate::integration::common::*;
    use docker_save::{
        Destination, DockerSource, ImageProcessor, Notifier, RetentionPolicy, SaveError,
        SaveOptions, Source, StatsOptions, WorkdirOptions,
    };
    use std::process::Command;
    use tempfile::TempDir;

    fn pull(image: &str) {
        let status = Command::new("docker")
            .args(["pull", "-q", image])
            .status()
            .expect("Should run docker pull");
        assert!(status.success(), "Should pull {image}");
    }

    #[test]
    fn test_docker_source_creation() {
        let docker_source = DockerSource::new();
        assert!(
            docker_source.is_ok(),
            "Should be able to create DockerSource"
        );

        let source = docker_source.unwrap();
        assert_eq!(source.name(), "docker");
    }

    #[test]
    fn test_docker_inspect() {
        let image = TEST_IMAGES[0];
        pull(image);
        let source = DockerSource::new().expect("Should create DockerSource");

        let inspect = source.inspect(image).expect("Should inspect image");
        assert!(inspect.id.starts_with("sha256:"));
        assert!(inspect.repo_tags.iter().any(|t| t == image));
        assert!(!inspect.root_fs.layers.is_empty());
    }

    #[test]
    fn test_docker_inspect_nonexistent() {
        let source = DockerSource::new().expect("Should create DockerSource");
        let result = source.inspect(NONEXISTENT_IMAGE);
        assert!(
            matches!(result, Err(SaveError::NotFound(_))),
            "Should report the image as not found: {result:?}"
        );
    }

    #[test]
    fn test_docker_save_latest_layer() {
        let image = TEST_IMAGES[1];
        pull(image);
        let workdir = TempDir::new().unwrap();
        let processor = ImageProcessor::new(
            DockerSource::new().expect("Should create DockerSource"),
            Notifier::new(0),
        );

        let options = SaveOptions {
            images: vec![image.to_string()],
            output: None,
            workdir: WorkdirOptions {
                workdir: workdir.path().to_path_buf(),
                ..Default::default()
            },
            retention: RetentionPolicy::LatestOnly,
        };
        let mut out = Vec::new();
        processor
            .save(&options, Destination::stream(&mut out, false).unwrap())
            .expect("Should save image");

        let members = archive_members(&out);
        assert!(members.contains(&"manifest.json".to_string()));
        assert!(dirs_with_prefix(workdir.path(), "busybox-latest-").is_empty());
    }

    #[test]
    fn test_docker_stats_and_diff() {
        for image in TEST_IMAGES {
            pull(image);
        }
        let workdir = TempDir::new().unwrap();
        let processor = ImageProcessor::new(
            DockerSource::new().expect("Should create DockerSource"),
            Notifier::new(0),
        );

        let options = StatsOptions {
            images: vec![TEST_IMAGES[1].to_string()],
            workdir: WorkdirOptions {
                workdir: workdir.path().to_path_buf(),
                ..Default::default()
            },
            json: false,
        };
        let mut out = Vec::new();
        processor.stats(&options, &mut out).expect("Should print stats");
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Start Stats of Image Tag: busybox:latest"), "{text}");

        let mut out = Vec::new();
        let diff = processor
            .diff(TEST_IMAGES[0], TEST_IMAGES[1], &mut out)
            .expect("Should diff images");
        assert!(diff.different > 0);
    }
}
