//! Grayscale pyramid construction for coarse-to-fine correlation.
//!
//! Downsampling uses a 2x2 box filter with integer rounding:
//! `dst = ((a + b + c + d) + 2) / 4`. An odd trailing row or column is dropped.

use crate::image::{Image, ImageView};
use crate::util::{PrepError, PrepResult};

/// Halves a grayscale view with the 2x2 box filter.
pub fn downsample_u8(src: ImageView<'_, u8>) -> PrepResult<Image> {
    let dst_width = src.width() / 2;
    let dst_height = src.height() / 2;
    if dst_width == 0 || dst_height == 0 {
        return Err(PrepError::InvalidDimensions {
            width: dst_width,
            height: dst_height,
        });
    }

    let mut dst = Vec::with_capacity(dst_width * dst_height);
    for y in 0..dst_height {
        let (Some(row0), Some(row1)) = (src.row(y * 2), src.row(y * 2 + 1)) else {
            return Err(PrepError::BufferTooSmall {
                needed: (y * 2 + 2) * src.stride(),
                got: 0,
            });
        };
        for x in 0..dst_width {
            let sum = u16::from(row0[2 * x])
                + u16::from(row0[2 * x + 1])
                + u16::from(row1[2 * x])
                + u16::from(row1[2 * x + 1]);
            dst.push(((sum + 2) / 4) as u8);
        }
    }
    Image::gray(dst, dst_width, dst_height)
}

/// Owned image pyramid built from a base level.
pub struct ImagePyramid {
    levels: Vec<Image>,
}

impl ImagePyramid {
    /// Builds up to `max_levels` levels from a grayscale base view.
    ///
    /// `max_levels` is clamped to at least 1 so the base level is always
    /// present; building stops early once a level is narrower than 2 pixels.
    pub fn build_u8(base: ImageView<'_, u8>, max_levels: usize) -> PrepResult<Self> {
        let max_levels = max_levels.max(1);
        let mut base_data = Vec::with_capacity(base.width() * base.height());
        for y in 0..base.height() {
            let row = base.row(y).ok_or(PrepError::BufferTooSmall {
                needed: (y + 1) * base.stride(),
                got: 0,
            })?;
            base_data.extend_from_slice(row);
        }
        let mut levels = vec![Image::gray(base_data, base.width(), base.height())?];

        while levels.len() < max_levels {
            let prev = &levels[levels.len() - 1];
            if prev.width() < 2 || prev.height() < 2 {
                break;
            }
            let next = downsample_u8(prev.view()?)?;
            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// Returns all pyramid levels (level 0 is the base resolution).
    pub fn levels(&self) -> &[Image] {
        &self.levels
    }

    /// Returns a view for a specific pyramid level.
    pub fn level(&self, index: usize) -> Option<ImageView<'_, u8>> {
        self.levels.get(index).and_then(|level| level.view().ok())
    }
}
