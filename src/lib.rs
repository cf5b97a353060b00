pub mod diff;
pub mod error;
pub mod export_dir;
pub mod manifest;
pub mod metadata;
pub mod notifier;
pub mod options;
pub mod paths;
pub mod processor;
pub mod repackager;
pub mod retention;
pub mod sources;
pub mod stats;
pub mod tar_extractor;

// Re-exports for easy access
pub use error::{Result, SaveError};
pub use export_dir::ExportDir;
pub use manifest::ManifestRecord;
pub use notifier::Notifier;
pub use options::{SaveOptions, StatsOptions, WorkdirOptions};
pub use processor::ImageProcessor;
pub use repackager::Destination;
pub use retention::RetentionPolicy;
pub use sources::DockerSource;
pub use sources::NerdctlSource;
pub use sources::Source;
pub use sources::TarSource;
