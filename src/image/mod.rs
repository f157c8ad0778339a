//! Owned images, borrowed grayscale views, and pyramid utilities.
//!
//! `Image` owns an interleaved 8-bit buffer with 1, 3 or 4 channels and is the
//! unit every pipeline stage consumes and produces. `ImageView` is a borrowed
//! single-channel 2D view into a 1D buffer with an explicit stride; the stride
//! counts elements between the starts of consecutive rows.

use crate::util::{PrepError, PrepResult};
use image::GrayImage;

#[cfg(feature = "image-io")]
pub mod io;
pub mod pyramid;

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> PrepResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> PrepResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(PrepError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> PrepResult<usize> {
    if width == 0 || height == 0 {
        return Err(PrepError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(PrepError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(PrepError::InvalidDimensions { width, height })
}

/// Owned interleaved 8-bit image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: usize,
}

impl Image {
    /// Wraps a row-major interleaved buffer of exactly `width * height * channels` samples.
    pub fn new(data: Vec<u8>, width: usize, height: usize, channels: usize) -> PrepResult<Self> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(PrepError::InvalidInput("channel count must be 1, 3 or 4"));
        }
        if width == 0 || height == 0 {
            return Err(PrepError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(channels))
            .ok_or(PrepError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(PrepError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(PrepError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Wraps a single-channel buffer.
    pub fn gray(data: Vec<u8>, width: usize, height: usize) -> PrepResult<Self> {
        Self::new(data, width, height, 1)
    }

    /// Allocates an image filled with `value`.
    pub fn filled(width: usize, height: usize, channels: usize, value: u8) -> PrepResult<Self> {
        let len = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(channels))
            .ok_or(PrepError::InvalidDimensions { width, height })?;
        Self::new(vec![value; len], width, height, channels)
    }

    /// Copies a binary mask into a single-channel image.
    pub fn from_mask(mask: &GrayImage) -> PrepResult<Self> {
        let (width, height) = mask.dimensions();
        Self::gray(mask.as_raw().clone(), width as usize, height as usize)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the raw interleaved samples.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Returns the samples of pixel `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y * self.width + x) * self.channels;
        self.data.get(start..start + self.channels)
    }

    pub(crate) fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [u8] {
        let start = (y * self.width + x) * self.channels;
        &mut self.data[start..start + self.channels]
    }

    /// Converts to a single-channel intensity image.
    ///
    /// Color pixels use the BT.601 luma weights `0.299 R + 0.587 G + 0.114 B`
    /// in fixed point with rounding; alpha is ignored. A single-channel image
    /// is returned as a copy.
    pub fn to_gray(&self) -> Image {
        if self.channels == 1 {
            return self.clone();
        }
        let gray = self
            .data
            .chunks_exact(self.channels)
            .map(|px| {
                let luma =
                    299 * u32::from(px[0]) + 587 * u32::from(px[1]) + 114 * u32::from(px[2]);
                ((luma + 500) / 1000) as u8
            })
            .collect();
        Image {
            data: gray,
            width: self.width,
            height: self.height,
            channels: 1,
        }
    }

    /// Borrows a single-channel image as an `ImageView`.
    pub fn view(&self) -> PrepResult<ImageView<'_, u8>> {
        if self.channels != 1 {
            return Err(PrepError::InvalidInput("grayscale view needs a single-channel image"));
        }
        ImageView::from_slice(&self.data, self.width, self.height)
    }

    /// Copies the rectangle with top-left `(x, y)` and size `width x height`.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> PrepResult<Image> {
        if width == 0 || height == 0 {
            return Err(PrepError::InvalidDimensions { width, height });
        }
        let fits = x
            .checked_add(width)
            .zip(y.checked_add(height))
            .is_some_and(|(end_x, end_y)| end_x <= self.width && end_y <= self.height);
        if !fits {
            return Err(PrepError::InvalidInput("crop rectangle exceeds image bounds"));
        }

        let row_len = width * self.channels;
        let mut data = Vec::with_capacity(row_len * height);
        for row in y..y + height {
            let start = (row * self.width + x) * self.channels;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Image::new(data, width, height, self.channels)
    }

    /// Converts a single-channel image into an `image::GrayImage`.
    pub fn to_gray_image(&self) -> PrepResult<GrayImage> {
        if self.channels != 1 {
            return Err(PrepError::InvalidInput("expected a single-channel image"));
        }
        GrayImage::from_raw(self.width as u32, self.height as u32, self.data.clone()).ok_or(
            PrepError::InvalidDimensions {
                width: self.width,
                height: self.height,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Image;
    use crate::util::PrepError;

    #[test]
    fn to_gray_uses_bt601_weights() {
        let img = Image::new(vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 10, 10, 10], 4, 1, 3).unwrap();
        let gray = img.to_gray();
        assert_eq!(gray.channels(), 1);
        assert_eq!(gray.data(), &[76, 150, 29, 10]);
    }

    #[test]
    fn crop_copies_interior_rows() {
        let data: Vec<u8> = (0u8..24).collect();
        let img = Image::new(data, 4, 2, 3).unwrap();
        let crop = img.crop(1, 1, 2, 1).unwrap();
        assert_eq!(crop.data(), &[15, 16, 17, 18, 19, 20]);
    }

    #[test]
    fn crop_rejects_out_of_bounds() {
        let img = Image::filled(4, 4, 1, 0).unwrap();
        assert!(matches!(
            img.crop(3, 0, 2, 2),
            Err(PrepError::InvalidInput(_))
        ));
    }

    #[test]
    fn view_requires_single_channel() {
        let img = Image::filled(2, 2, 3, 7).unwrap();
        assert!(img.view().is_err());
        assert_eq!(img.to_gray().view().unwrap().get(1, 1).copied(), Some(7));
    }
}
