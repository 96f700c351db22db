//! Rotation, mirroring and cropping.
//!
//! Pure pixel reshuffles ([`rotate`], [`flip_horizontal`]) never fail. Crops
//! validate their rectangle against the image and report
//! [`PipelineError::BoundsError`] without touching the input.

use super::calculations::{centre_offset, cover_dimensions};
use super::gravity::Gravity;
use super::normalize::clear_orientation;
use super::resize::resample;
use crate::error::{PipelineError, Result};
use crate::raster::Image;

/// Clockwise rotation by a multiple of 90°.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Angle {
    D0,
    D90,
    D180,
    D270,
}

impl Angle {
    /// Nearest lower multiple of 90° for any integer angle, negatives
    /// included (`-90` is `D270`).
    pub fn from_degrees(degrees: i32) -> Self {
        match (degrees / 90).rem_euclid(4) {
            1 => Angle::D90,
            2 => Angle::D180,
            3 => Angle::D270,
            _ => Angle::D0,
        }
    }
}

/// Rotate clockwise by `degrees` (a multiple of 90) and clear the
/// orientation tag.
pub fn rotate(image: &Image, degrees: i32) -> Image {
    let angle = Angle::from_degrees(degrees);
    tracing::debug!(degrees, ?angle, "rotating");
    let mut out = rotate_by(image, angle);
    clear_orientation(&mut out);
    out
}

/// Rotation without metadata changes.
pub(crate) fn rotate_by(image: &Image, angle: Angle) -> Image {
    let (w, h) = (image.width() as usize, image.height() as usize);
    match angle {
        Angle::D0 => image.clone(),
        // Output is h wide, w high.
        Angle::D90 => image.remap(h as u32, w as u32, |i| {
            let (ox, oy) = (i % h, i / h);
            (h - 1 - ox) * w + oy
        }),
        Angle::D180 => image.remap(w as u32, h as u32, |i| w * h - 1 - i),
        Angle::D270 => image.remap(h as u32, w as u32, |i| {
            let (ox, oy) = (i % h, i / h);
            ox * w + (w - 1 - oy)
        }),
    }
}

/// Mirror left to right.
pub fn flip_horizontal(image: &Image) -> Image {
    let w = image.width() as usize;
    image.remap(image.width(), image.height(), |i| {
        let (x, y) = (i % w, i / w);
        y * w + (w - 1 - x)
    })
}

/// Copy out the `width` × `height` rectangle whose top-left corner is
/// (`left`, `top`). The rectangle must lie entirely inside the image.
pub fn extract_area(image: &Image, left: i64, top: i64, width: u32, height: u32) -> Result<Image> {
    let inside = left >= 0
        && top >= 0
        && width > 0
        && height > 0
        && left
            .checked_add(i64::from(width))
            .is_some_and(|right| right <= i64::from(image.width()))
        && top
            .checked_add(i64::from(height))
            .is_some_and(|bottom| bottom <= i64::from(image.height()));
    if !inside {
        return Err(PipelineError::BoundsError {
            left,
            top,
            width,
            height,
            image_width: image.width(),
            image_height: image.height(),
        });
    }
    tracing::debug!(left, top, width, height, "extracting area");
    Ok(image.region(left as u32, top as u32, width, height))
}

/// Crop to `width` × `height`, positioned on the image by `gravity`.
pub fn crop(image: &Image, width: u32, height: u32, gravity: Gravity) -> Result<Image> {
    let (left, top) = gravity.point_watermark(
        image.width() as i64,
        image.height() as i64,
        width as i64,
        height as i64,
    );
    extract_area(image, left, top, width, height)
}

/// Resize to cover `dst_width` × `dst_height`, then crop to exactly that size
/// around `gravity`.
///
/// A zero target edge, or a target no smaller than the image on both axes,
/// returns an unmodified copy. Negative targets are rejected. Images with
/// alpha are resampled premultiplied.
pub fn fill(image: &Image, dst_width: i64, dst_height: i64, gravity: Gravity) -> Result<Image> {
    if dst_width < 0 || dst_height < 0 {
        return Err(PipelineError::InvalidArgument(format!(
            "fill dimensions must be non-negative, got {dst_width}x{dst_height}"
        )));
    }
    let (src_w, src_h) = (image.width() as i64, image.height() as i64);
    if dst_width == 0 || dst_height == 0 || (dst_width >= src_w && dst_height >= src_h) {
        return Ok(image.clone());
    }
    let target = (dst_width as u32, dst_height as u32);
    let (cover_w, cover_h) = cover_dimensions((image.width(), image.height()), target);
    tracing::debug!(
        dst_width,
        dst_height,
        cover_w,
        cover_h,
        %gravity,
        "filling"
    );
    let resized = resample(image, cover_w, cover_h, image.has_alpha())?;
    crop(&resized, target.0, target.1, gravity)
}

/// Crop to `width` × `height` around the region with the most detail.
///
/// Detail is the summed gradient magnitude over the colour bands; the window
/// with the highest total wins, ties going to the most central window.
pub fn smart_crop(image: &Image, width: u32, height: u32) -> Result<Image> {
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidArgument(format!(
            "smart crop size must be positive, got {width}x{height}"
        )));
    }
    if width > image.width() || height > image.height() {
        return Err(PipelineError::BoundsError {
            left: 0,
            top: 0,
            width,
            height,
            image_width: image.width(),
            image_height: image.height(),
        });
    }
    let energy = detail_map(image);
    let (left, top) = best_window(&energy, image.width(), image.height(), width, height);
    tracing::debug!(width, height, left, top, "smart crop");
    extract_area(image, left as i64, top as i64, width, height)
}

/// Per-pixel forward-difference gradient summed over the colour bands, on
/// samples normalised to 0–1.
fn detail_map(image: &Image) -> Vec<f64> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let bands = image.bands() as usize;
    let colour = image.colour_bands();
    let max = image.max_value() as f64;
    let samples = image.samples_f32();
    let at = |x: usize, y: usize, band: usize| samples[(y * w + x) * bands + band] as f64 / max;

    let mut energy = vec![0.0; w * h];
    for y in 0..h {
        for x in 0..w {
            let (xr, yd) = ((x + 1).min(w - 1), (y + 1).min(h - 1));
            energy[y * w + x] = (0..colour)
                .map(|band| {
                    let here = at(x, y, band);
                    (at(xr, y, band) - here).abs() + (at(x, yd, band) - here).abs()
                })
                .sum();
        }
    }
    energy
}

/// Top-left corner of the `win_w` × `win_h` window with the largest total
/// in `values`, found through a summed-area table.
fn best_window(values: &[f64], width: u32, height: u32, win_w: u32, win_h: u32) -> (u32, u32) {
    let (w, h) = (width as usize, height as usize);
    let stride = w + 1;
    let mut table = vec![0.0; stride * (h + 1)];
    for y in 0..h {
        let mut row = 0.0;
        for x in 0..w {
            row += values[y * w + x];
            table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row;
        }
    }
    let sum = |x: usize, y: usize| {
        let (x1, y1) = (x + win_w as usize, y + win_h as usize);
        table[y1 * stride + x1] - table[y * stride + x1] - table[y1 * stride + x] + table[y * stride + x]
    };

    let centre = (
        centre_offset(width, win_w) as i64,
        centre_offset(height, win_h) as i64,
    );
    let distance = |x: u32, y: u32| (x as i64 - centre.0).abs() + (y as i64 - centre.1).abs();

    let mut best = (centre.0 as u32, centre.1 as u32);
    let mut best_score = sum(best.0 as usize, best.1 as usize);
    for y in 0..=(height - win_h) {
        for x in 0..=(width - win_w) {
            let score = sum(x as usize, y as usize);
            let better = score > best_score + 1e-9
                || ((score - best_score).abs() <= 1e-9 && distance(x, y) < distance(best.0, best.1));
            if better {
                best = (x, y);
                best_score = score;
            }
        }
    }
    best
}
