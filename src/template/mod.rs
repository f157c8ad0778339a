//! Template storage and planning utilities.

use crate::image::{Image, ImageView};
use crate::util::PrepResult;

mod plan;

pub use plan::TemplatePlan;

/// Immutable grayscale reference image of the vessel.
///
/// Loaded once per run and shared read-only by every correlation.
#[derive(Clone, Debug)]
pub struct Template {
    img: Image,
}

impl Template {
    /// Creates a template from a contiguous grayscale buffer.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> PrepResult<Self> {
        let img = Image::gray(data, width, height)?;
        Ok(Self { img })
    }

    /// Creates a template from any image, converting color to intensity.
    pub fn from_image(img: &Image) -> Self {
        Self { img: img.to_gray() }
    }

    pub fn width(&self) -> usize {
        self.img.width()
    }

    pub fn height(&self) -> usize {
        self.img.height()
    }

    /// Returns a borrowed view of the template data.
    pub fn view(&self) -> ImageView<'_, u8> {
        self.img
            .view()
            .expect("template images are single channel by construction")
    }
}
