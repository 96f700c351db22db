//! Planar working copies of interleaved images.
//!
//! The `image` crate's resampling and blur kernels work on whole pixels of a
//! fixed layout, and clamp `f32` samples to 0–1. Splitting each band into its
//! own normalised single-channel `f32` buffer lets those kernels run over any
//! band count (1–5, CMYK included) at any sample depth.
//!
//! With `premultiply` set, colour planes are multiplied by alpha on the way
//! in and divided by it on the way out, so kernels never mix the colour of
//! transparent pixels into opaque ones.

use super::Image;
use image::{ImageBuffer, Luma};

pub(crate) type Plane = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Split interleaved samples into one plane per band.
pub(crate) fn split(samples: &[f32], width: u32, height: u32, bands: usize) -> Vec<Plane> {
    (0..bands)
        .map(|band| {
            let data: Vec<f32> = samples.iter().skip(band).step_by(bands).copied().collect();
            // Length is width * height by construction.
            Plane::from_raw(width, height, data).unwrap_or_else(|| Plane::new(width, height))
        })
        .collect()
}

/// Interleave planes of identical size back into one sample vector.
pub(crate) fn merge(planes: &[Plane]) -> Vec<f32> {
    let bands = planes.len();
    let Some(first) = planes.first() else {
        return Vec::new();
    };
    let pixels = first.as_raw().len();
    let mut out = vec![0.0; pixels * bands];
    for (band, plane) in planes.iter().enumerate() {
        for (i, &v) in plane.as_raw().iter().enumerate() {
            out[i * bands + band] = v;
        }
    }
    out
}

/// Normalised planes of `image`, colour premultiplied by alpha on request.
pub(crate) fn from_image(image: &Image, premultiply: bool) -> Vec<Plane> {
    let bands = image.bands() as usize;
    let scale = 1.0 / image.max_value();
    let mut samples: Vec<f32> = image.samples_f32().into_iter().map(|s| s * scale).collect();
    if premultiply && image.has_alpha() {
        for px in samples.chunks_exact_mut(bands) {
            let (colour, alpha) = px.split_at_mut(bands - 1);
            for c in colour {
                *c *= alpha[0];
            }
        }
    }
    split(&samples, image.width(), image.height(), bands)
}

/// Rebuild an image shaped like `template` from planes produced by
/// [`from_image`] (possibly resampled to a new size).
pub(crate) fn to_image(template: &Image, planes: &[Plane], premultiplied: bool) -> Image {
    let (width, height) = planes
        .first()
        .map(|p| p.dimensions())
        .unwrap_or((template.width(), template.height()));
    let bands = template.bands() as usize;
    let mut samples = merge(planes);
    if premultiplied && template.has_alpha() {
        for px in samples.chunks_exact_mut(bands) {
            let (colour, alpha) = px.split_at_mut(bands - 1);
            let a = alpha[0];
            for c in colour {
                *c = if a > 0.0 { (*c / a).clamp(0.0, 1.0) } else { 0.0 };
            }
        }
    }
    let max = template.max_value();
    for s in &mut samples {
        *s *= max;
    }
    Image::from_samples(
        width,
        height,
        template.bands(),
        template.interpretation(),
        template.band_format(),
        &samples,
        template.metadata().clone(),
    )
}
