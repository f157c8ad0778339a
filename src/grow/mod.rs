//! Solid region rendering and single-pass disk dilation.

use crate::raster::fill_polygon;
use crate::segment::Region;
use crate::BinaryMask;
use image::Luma;
use imageproc::morphology::{grayscale_dilate, Mask};

/// Renders the region as a filled 0/255 mask of the given size.
///
/// The interior comes from the even-odd fill of the boundary polygon; the
/// boundary pixels are set as well, so thin parts of the region survive.
pub fn render_region(width: u32, height: u32, region: &Region) -> BinaryMask {
    let mut mask = BinaryMask::new(width, height);
    if region.points.is_empty() {
        return mask;
    }

    let mut closed: Vec<[f64; 2]> = region
        .points
        .iter()
        .map(|p| [f64::from(p.x), f64::from(p.y)])
        .collect();
    closed.push(closed[0]);
    fill_polygon(&mut mask, &closed, 255);

    for p in &region.points {
        if p.x >= 0 && p.y >= 0 && (p.x as u32) < width && (p.y as u32) < height {
            mask.put_pixel(p.x as u32, p.y as u32, Luma([255]));
        }
    }
    mask
}

/// Grows a binary mask by a disk of `radius` pixels in one dilation pass.
///
/// A pixel is set when some foreground pixel lies at an integer offset
/// `(dx, dy)` with `dx^2 + dy^2 <= radius^2`. An empty mask stays empty.
pub fn dilate(mask: &BinaryMask, radius: u8) -> BinaryMask {
    grayscale_dilate(mask, &Mask::disk(radius))
}

/// Renders `region` and dilates it by `radius`.
pub fn grow_region(width: u32, height: u32, region: &Region, radius: u8) -> BinaryMask {
    dilate(&render_region(width, height, region), radius)
}
