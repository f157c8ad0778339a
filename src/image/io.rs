//! Conversions between `Image` and the `image` crate, plus disk codecs.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::Image;
use crate::util::{PrepError, PrepResult};
use image::{ColorType, DynamicImage, GrayImage, RgbImage, RgbaImage};
use std::path::Path;

/// Creates an owned image from a dynamic image.
///
/// Luma sources stay single channel; every other color type is converted to
/// 8-bit RGB, dropping alpha.
pub fn image_from_dynamic(img: &DynamicImage) -> PrepResult<Image> {
    match img.color() {
        ColorType::L8 | ColorType::L16 | ColorType::La8 | ColorType::La16 => {
            let gray = img.to_luma8();
            let (w, h) = gray.dimensions();
            Image::gray(gray.into_raw(), w as usize, h as usize)
        }
        _ => {
            let rgb = img.to_rgb8();
            let (w, h) = rgb.dimensions();
            Image::new(rgb.into_raw(), w as usize, h as usize, 3)
        }
    }
}

/// Converts an owned image into a dynamic image for encoding.
pub fn dynamic_from_image(img: &Image) -> PrepResult<DynamicImage> {
    let (w, h) = (img.width() as u32, img.height() as u32);
    let data = img.data().to_vec();
    let dims = PrepError::InvalidDimensions {
        width: img.width(),
        height: img.height(),
    };
    let dynamic = match img.channels() {
        1 => DynamicImage::ImageLuma8(GrayImage::from_raw(w, h, data).ok_or(dims)?),
        3 => DynamicImage::ImageRgb8(RgbImage::from_raw(w, h, data).ok_or(dims)?),
        _ => DynamicImage::ImageRgba8(RgbaImage::from_raw(w, h, data).ok_or(dims)?),
    };
    Ok(dynamic)
}

/// Loads an image from disk, keeping color.
pub fn load_image<P: AsRef<Path>>(path: P) -> PrepResult<Image> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PrepError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let img = image::open(path).map_err(|err| PrepError::Unreadable {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    image_from_dynamic(&img)
}

/// Loads an image from disk and converts it to a single channel.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> PrepResult<Image> {
    Ok(load_image(path)?.to_gray())
}

/// Encodes an image to disk; the format follows the file extension.
pub fn save_image<P: AsRef<Path>>(path: P, img: &Image) -> PrepResult<()> {
    let path = path.as_ref();
    dynamic_from_image(img)?
        .save(path)
        .map_err(|err| PrepError::WriteFailed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
}
