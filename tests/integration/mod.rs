//! Integration tests for docker-save
//!
//! The pipeline tests run against in-memory fixture archives; the docker and
//! nerdctl modules need a real runtime and are behind cargo features.

pub mod analyzers;
pub mod docker;
pub mod export_dir;
