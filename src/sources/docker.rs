use std::io::Read;

use super::command::CommandRuntime;
use super::Source;
use crate::error::Result;
use crate::metadata::ImageInspect;

/// Docker implementation of the Source trait
pub struct DockerSource {
    runtime: CommandRuntime,
}

impl DockerSource {
    pub fn new() -> Result<Self> {
        let runtime = CommandRuntime::new("docker");
        runtime.check_available()?;
        Ok(Self { runtime })
    }
}

impl Source for DockerSource {
    fn name(&self) -> &str {
        self.runtime.program()
    }

    fn export(&self, images: &[String]) -> Result<Box<dyn Read>> {
        Ok(Box::new(self.runtime.save(images)?))
    }

    fn inspect(&self, image: &str) -> Result<ImageInspect> {
        self.runtime.inspect(image)
    }
}
