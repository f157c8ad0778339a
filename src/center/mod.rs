//! Domain reduction and centroid re-centering.

use crate::image::Image;
use crate::util::{PrepError, PrepResult};
use crate::BinaryMask;

/// Offset applied to move the region centroid onto the image center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TranslationVector {
    pub dx: f64,
    pub dy: f64,
}

/// Output of [`recenter`].
#[derive(Clone, Debug)]
pub struct Recentered {
    /// Background-suppressed image with the region centroid at `(W/2, H/2)`.
    pub image: Image,
    /// Centroid of the mask before translation.
    pub centroid: (f64, f64),
    pub translation: TranslationVector,
}

fn check_dimensions(image: &Image, mask: &BinaryMask) -> PrepResult<()> {
    if mask.width() as usize != image.width() || mask.height() as usize != image.height() {
        return Err(PrepError::InvalidInput("mask and image dimensions differ"));
    }
    Ok(())
}

/// Zeroes every channel of the pixels where `mask` is 0.
pub fn reduce_domain(image: &Image, mask: &BinaryMask) -> PrepResult<Image> {
    check_dimensions(image, mask)?;
    let channels = image.channels();
    let mut data = image.data().to_vec();
    for (px, m) in data.chunks_exact_mut(channels).zip(mask.as_raw()) {
        if *m == 0 {
            px.fill(0);
        }
    }
    Image::new(data, image.width(), image.height(), channels)
}

/// Intensity-weighted centroid `(m10 / m00, m01 / m00)` of a mask.
///
/// Pixel `(x, y)` sits at coordinate `(x, y)`. Fails with `DegenerateMask`
/// when the mask carries no mass.
pub fn centroid(mask: &BinaryMask) -> PrepResult<(f64, f64)> {
    let mut m00 = 0u64;
    let mut m10 = 0u64;
    let mut m01 = 0u64;
    for (x, y, p) in mask.enumerate_pixels() {
        let w = u64::from(p[0]);
        m00 += w;
        m10 += w * u64::from(x);
        m01 += w * u64::from(y);
    }
    if m00 == 0 {
        return Err(PrepError::DegenerateMask);
    }
    Ok((m10 as f64 / m00 as f64, m01 as f64 / m00 as f64))
}

/// Translation taking `centroid` to `(width / 2, height / 2)`.
pub fn translation_to_center(
    width: usize,
    height: usize,
    centroid: (f64, f64),
) -> TranslationVector {
    TranslationVector {
        dx: width as f64 / 2.0 - centroid.0,
        dy: height as f64 / 2.0 - centroid.1,
    }
}

/// Translates an image with bilinear interpolation onto a same-sized canvas.
///
/// Destination pixel `(x, y)` samples the source at `(x - dx, y - dy)`.
/// Neighbors that fall outside the source contribute `fill` (constant
/// border), and results are rounded to the nearest integer. An integer
/// translation copies samples exactly; a zero translation returns the input.
pub fn translate(image: &Image, t: TranslationVector, fill: u8) -> Image {
    let (width, height, channels) = (image.width(), image.height(), image.channels());
    let mut out = image.clone();
    if t.dx == 0.0 && t.dy == 0.0 {
        return out;
    }

    let fetch = |sx: i64, sy: i64, c: usize| -> f64 {
        if sx < 0 || sy < 0 || sx >= width as i64 || sy >= height as i64 {
            f64::from(fill)
        } else {
            f64::from(image.data()[(sy as usize * width + sx as usize) * channels + c])
        }
    };

    for y in 0..height {
        let src_y = y as f64 - t.dy;
        let y0 = src_y.floor();
        let fy = src_y - y0;
        let y0 = y0 as i64;
        for x in 0..width {
            let src_x = x as f64 - t.dx;
            let x0 = src_x.floor();
            let fx = src_x - x0;
            let x0 = x0 as i64;

            let px = out.pixel_mut(x, y);
            for (c, sample) in px.iter_mut().enumerate() {
                let a = fetch(x0, y0, c);
                let b = fetch(x0 + 1, y0, c);
                let d = fetch(x0, y0 + 1, c);
                let e = fetch(x0 + 1, y0 + 1, c);
                let value = a * (1.0 - fx) * (1.0 - fy)
                    + b * fx * (1.0 - fy)
                    + d * (1.0 - fx) * fy
                    + e * fx * fy;
                *sample = value.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

/// Suppresses the background outside `mask` and moves the mask centroid to
/// the crop center, filling uncovered pixels with black.
pub fn recenter(crop: &Image, mask: &BinaryMask) -> PrepResult<Recentered> {
    let reduced = reduce_domain(crop, mask)?;
    let centroid = centroid(mask)?;
    let translation = translation_to_center(crop.width(), crop.height(), centroid);
    let image = translate(&reduced, translation, 0);
    Ok(Recentered {
        image,
        centroid,
        translation,
    })
}
