//! Gaussian blur and unsharp-mask sharpening.
//!
//! | Operation | Kernel |
//! |-----------|--------|
//! | [`blur`] | `image::imageops::blur` per band |
//! | [`sharpen`] | `original + (original - blurred)` where the difference exceeds the threshold |
//!
//! Both run on normalised planes, premultiplied when the image has alpha,
//! and return the input's shape and sample type.

use crate::error::{PipelineError, Result};
use crate::raster::{Image, planes};
use image::imageops;
use serde::{Deserialize, Serialize};

/// Unsharp-mask parameters.
///
/// - `sigma`: standard deviation of the Gaussian (higher = wider halo)
/// - `threshold`: minimum difference, on a 0–255 scale, before a sample is
///   sharpened (0 = sharpen everything)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sharpening {
    pub sigma: f32,
    #[serde(default)]
    pub threshold: f32,
}

impl Sharpening {
    /// Light sharpening suitable for downscaled output.
    pub fn light() -> Self {
        Self {
            sigma: 0.5,
            threshold: 0.0,
        }
    }
}

fn check_sigma(sigma: f32) -> Result<()> {
    if sigma.is_finite() && sigma > 0.0 {
        Ok(())
    } else {
        Err(PipelineError::InvalidArgument(format!(
            "sigma must be a positive number, got {sigma}"
        )))
    }
}

/// Gaussian blur with standard deviation `sigma` pixels.
pub fn blur(image: &Image, sigma: f32) -> Result<Image> {
    check_sigma(sigma)?;
    tracing::debug!(sigma, "blurring");
    let premultiply = image.has_alpha();
    let blurred: Vec<_> = planes::from_image(image, premultiply)
        .iter()
        .map(|plane| imageops::blur(plane, sigma))
        .collect();
    Ok(planes::to_image(image, &blurred, premultiply))
}

/// Unsharp mask. Alpha is left as it was.
pub fn sharpen(image: &Image, params: Sharpening) -> Result<Image> {
    check_sigma(params.sigma)?;
    if !(params.threshold >= 0.0) {
        return Err(PipelineError::InvalidArgument(format!(
            "threshold must be non-negative, got {}",
            params.threshold
        )));
    }
    tracing::debug!(sigma = params.sigma, threshold = params.threshold, "sharpening");
    let threshold = params.threshold / 255.0;
    let premultiply = image.has_alpha();
    let mut planes = planes::from_image(image, premultiply);
    let colour = image.colour_bands();
    for plane in planes.iter_mut().take(colour) {
        let blurred = imageops::blur(&*plane, params.sigma);
        for (v, b) in plane.iter_mut().zip(blurred.as_raw()) {
            let diff = *v - b;
            if diff.abs() > threshold {
                *v = (*v + diff).clamp(0.0, 1.0);
            }
        }
    }
    Ok(planes::to_image(image, &planes, premultiply))
}
