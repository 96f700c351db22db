//! Lanczos3 resampling, plain or alpha-premultiplied.
//!
//! Resampling straight RGBA mixes the colour of transparent pixels into their
//! opaque neighbours, which shows up as dark or coloured fringes along alpha
//! edges. [`resize_premultiplied`] multiplies colour by alpha before the
//! kernel runs and divides it back out afterwards; [`resize`] skips both
//! steps for images that have no alpha or where fringing does not matter.
//!
//! Either way the result has the input's sample type.

use super::calculations::scaled_extent;
use crate::error::{PipelineError, Result};
use crate::raster::{Image, planes};
use image::imageops::{self, FilterType};

/// Upper bound on the pixel count a resize may produce.
pub const MAX_OUTPUT_PIXELS: u64 = 1 << 30;

/// A scale that cannot produce an image is a resize failure.
fn check_scale(scale: f64) -> Result<()> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(PipelineError::ResizeFailure(format!(
            "scale must be a positive number, got {scale}"
        )))
    }
}

/// Resize by `scale` without premultiplying.
pub fn resize(image: &Image, scale: f64) -> Result<Image> {
    check_scale(scale)?;
    let (w, h) = (scaled_extent(image.width(), scale), scaled_extent(image.height(), scale));
    tracing::debug!(scale, w, h, "resizing");
    resample(image, w, h, false)
}

/// Resize by `scale`, premultiplying colour by alpha around the resample.
pub fn resize_premultiplied(image: &Image, scale: f64) -> Result<Image> {
    check_scale(scale)?;
    let (w, h) = (scaled_extent(image.width(), scale), scaled_extent(image.height(), scale));
    tracing::debug!(scale, w, h, "resizing premultiplied");
    resample(image, w, h, true)
}

/// Resample to exactly `width` × `height`.
pub(crate) fn resample(image: &Image, width: u32, height: u32, premultiply: bool) -> Result<Image> {
    let pixels = width as u64 * height as u64;
    if width == 0 || height == 0 || pixels > MAX_OUTPUT_PIXELS {
        return Err(PipelineError::ResizeFailure(format!(
            "cannot resample {}x{} to {width}x{height}",
            image.width(),
            image.height()
        )));
    }
    if (width, height) == (image.width(), image.height()) {
        return Ok(image.clone());
    }
    let premultiply = premultiply && image.has_alpha();
    let resized: Vec<_> = planes::from_image(image, premultiply)
        .iter()
        .map(|plane| imageops::resize(plane, width, height, FilterType::Lanczos3))
        .collect();
    Ok(planes::to_image(image, &resized, premultiply))
}
