use crate::error::Result;
use crate::metadata::ImageInspect;
use std::io::Read;

/// A container runtime able to export and describe images.
///
/// Passed explicitly into the pipeline; nothing looks one up from global state.
pub trait Source {
    /// Returns the name of the source for identification purposes
    fn name(&self) -> &str;

    /// Streams the runtime's native tar export (`manifest.json` plus layer
    /// directories) of `images`.
    fn export(&self, images: &[String]) -> Result<Box<dyn Read>>;

    /// Metadata of a single image, or `SaveError::NotFound`.
    fn inspect(&self, image: &str) -> Result<ImageInspect>;
}

impl<S: Source + ?Sized> Source for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn export(&self, images: &[String]) -> Result<Box<dyn Read>> {
        (**self).export(images)
    }

    fn inspect(&self, image: &str) -> Result<ImageInspect> {
        (**self).inspect(image)
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn export(&self, images: &[String]) -> Result<Box<dyn Read>> {
        (**self).export(images)
    }

    fn inspect(&self, image: &str) -> Result<ImageInspect> {
        (**self).inspect(image)
    }
}
