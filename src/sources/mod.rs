mod command;
pub mod docker;
pub mod naming;
pub mod nerdctl;
pub mod source;
pub mod tar;

pub use docker::DockerSource;
pub use nerdctl::NerdctlSource;
pub use source::Source;
pub use tar::TarSource;
