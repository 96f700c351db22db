//! Autocrop: remove a uniform border.
//!
//! 1. Flatten alpha onto black to get an opaque working copy.
//! 2. Pick the background: the working copy's top-left pixel
//!    ([`Background::Smart`]) or a caller-supplied RGB triple.
//! 3. [`find_trim`] the tightest box holding every pixel that differs from
//!    the background by more than the threshold in any band.
//! 4. Optionally [`equalize_margins`] per axis.
//! 5. Extract that box from the *original* image, alpha intact. An empty box
//!    returns the original unchanged.

use super::calculations::equalize_margins;
use super::geometry::extract_area;
use super::normalize::flatten;
use crate::error::{PipelineError, Result};
use crate::raster::{Image, Interpretation};

/// Where the trim background colour comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    /// Sample the top-left pixel of the flattened image.
    Smart,
    /// A fixed colour. Values are used as given, outside 0–255 included.
    Rgb([f64; 3]),
}

impl From<Option<[f64; 3]>> for Background {
    /// `None` means [`Background::Smart`].
    fn from(rgb: Option<[f64; 3]>) -> Self {
        rgb.map_or(Background::Smart, Background::Rgb)
    }
}

impl Background {
    /// Background vector with one entry per band of `flat`.
    fn resolve(self, flat: &Image) -> Result<Vec<f64>> {
        match self {
            Background::Smart => flat
                .get_point(0, 0)
                .ok_or_else(|| PipelineError::TrimFailure("cannot sample the top-left pixel".into())),
            Background::Rgb(rgb) => Ok(match (flat.bands(), flat.interpretation()) {
                (1, _) => vec![0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2]],
                (4, Interpretation::Cmyk) => vec![rgb[0], rgb[1], rgb[2], 0.0],
                (bands, _) => (0..bands as usize)
                    .map(|i| rgb.get(i).copied().unwrap_or(0.0))
                    .collect(),
            }),
        }
    }
}

/// Bounding box of the foreground, as (`left`, `top`, `width`, `height`).
///
/// A pixel is foreground when any band differs from `background` by more
/// than `threshold`. An all-background image yields `(0, 0, 0, 0)`.
pub fn find_trim(image: &Image, threshold: f64, background: &[f64]) -> (u32, u32, u32, u32) {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let bands = image.bands() as usize;
    let samples = image.samples_f32();

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (usize::MAX, usize::MAX, 0, 0);
    for y in 0..h {
        for x in 0..w {
            let px = &samples[(y * w + x) * bands..(y * w + x + 1) * bands];
            let foreground = px.iter().enumerate().any(|(band, &v)| {
                let bg = background.get(band).copied().unwrap_or(0.0);
                (v as f64 - bg).abs() > threshold
            });
            if foreground {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }
    if min_x == usize::MAX {
        return (0, 0, 0, 0);
    }
    (
        min_x as u32,
        min_y as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    )
}

/// Trim a uniform border.
///
/// `threshold` must be non-negative. See the [module docs](self) for the
/// steps.
pub fn trim(
    image: &Image,
    threshold: f64,
    background: Background,
    equalize_horizontal: bool,
    equalize_vertical: bool,
) -> Result<Image> {
    if !(threshold >= 0.0) {
        return Err(PipelineError::TrimFailure(format!(
            "threshold must be non-negative, got {threshold}"
        )));
    }
    let flat = flatten(image, &[0.0; 3]);
    let bg = background.resolve(&flat)?;
    let (mut left, mut top, mut width, mut height) = find_trim(&flat, threshold, &bg);
    tracing::debug!(threshold, ?bg, left, top, width, height, "trim box");

    if equalize_horizontal {
        (left, width) = equalize_margins(left, width, image.width());
    }
    if equalize_vertical {
        (top, height) = equalize_margins(top, height, image.height());
    }

    if width == 0 || height == 0 {
        return Ok(image.clone());
    }
    extract_area(image, left as i64, top as i64, width, height)
        .map_err(|e| PipelineError::TrimFailure(e.to_string()))
}
