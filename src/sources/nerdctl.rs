use std::io::Read;

use super::command::CommandRuntime;
use super::Source;
use crate::error::Result;
use crate::metadata::ImageInspect;

/// nerdctl speaks the docker CLI dialect for `save` and `image inspect`.
pub struct NerdctlSource {
    runtime: CommandRuntime,
}

impl NerdctlSource {
    pub fn new() -> Result<Self> {
        let runtime = CommandRuntime::new("nerdctl");
        runtime.check_available()?;
        Ok(Self { runtime })
    }
}

impl Source for NerdctlSource {
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
