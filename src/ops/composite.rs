//! Watermark compositing with the "over" operator.
//!
//! The overlay always carries an alpha band (one is added if missing); with
//! `opacity < 1` that band is scaled linearly first. Blending runs on samples
//! normalised to 0–1 in the base image's colour space:
//!
//! ```text
//! a_out = a_src + a_dst (1 - a_src)
//! c_out = (c_src a_src + c_dst a_dst (1 - a_src)) / a_out
//! ```
//!
//! which is the premultiplied "over" expressed on straight colour. The
//! result keeps the base image's bands, interpretation and sample type.

use super::gravity::Gravity;
use super::normalize::ensure_alpha;
use crate::error::{PipelineError, Result};
use crate::raster::{Image, Interpretation};

/// Rec. 601 luma weights, used when a colour overlay lands on a grey base.
const LUMA: [f32; 3] = [0.299, 0.587, 0.114];

/// Overlay `watermark` on `base` with its top-left corner at (`left`, `top`).
///
/// `opacity` is clamped to 0–1. Parts of the watermark outside the base are
/// clipped. Fails with [`PipelineError::CompositeFailure`] when the two
/// colour spaces cannot be reconciled or `opacity` is NaN.
pub fn composite(base: &Image, watermark: &Image, left: i64, top: i64, opacity: f64) -> Result<Image> {
    if opacity.is_nan() {
        return Err(PipelineError::CompositeFailure("opacity is NaN".into()));
    }
    let opacity = opacity.clamp(0.0, 1.0) as f32;
    tracing::debug!(
        left,
        top,
        opacity,
        wm_width = watermark.width(),
        wm_height = watermark.height(),
        "compositing"
    );

    // Overlap of the overlay with the base, in base coordinates.
    let (base_w, base_h) = (i64::from(base.width()), i64::from(base.height()));
    let (x0, x1) = (left.max(0), left.saturating_add(i64::from(watermark.width())).min(base_w));
    let (y0, y1) = (top.max(0), top.saturating_add(i64::from(watermark.height())).min(base_h));
    if x0 >= x1 || y0 >= y1 {
        return Ok(base.clone());
    }

    let overlay = ensure_alpha(watermark);
    let src_bands = overlay.bands() as usize;
    let src_colour = src_bands - 1;
    let src_max = overlay.max_value();
    let src = overlay.samples_f32();

    let dst_bands = base.bands() as usize;
    let dst_colour = base.colour_bands();
    let dst_alpha = base.has_alpha();
    let dst_max = base.max_value();
    let mut out = base.samples_f32();

    let mut mapped = vec![0.0; dst_colour];
    for y in y0..y1 {
        let wy = y - top;
        for x in x0..x1 {
            let wx = x - left;
            let s = ((wy * overlay.width() as i64 + wx) as usize) * src_bands;
            let px = &src[s..s + src_bands];
            let a_src = (px[src_colour] / src_max).clamp(0.0, 1.0) * opacity;
            if a_src <= 0.0 {
                continue;
            }
            map_colour(
                &px[..src_colour],
                src_max,
                overlay.interpretation(),
                base.interpretation(),
                &mut mapped,
            )?;

            let d = ((y * base_w + x) as usize) * dst_bands;
            let a_dst = if dst_alpha {
                (out[d + dst_colour] / dst_max).clamp(0.0, 1.0)
            } else {
                1.0
            };
            let a_out = a_src + a_dst * (1.0 - a_src);
            for (band, &c_src) in mapped.iter().enumerate() {
                let c_dst = out[d + band] / dst_max;
                let c = (c_src * a_src + c_dst * a_dst * (1.0 - a_src)) / a_out;
                out[d + band] = c * dst_max;
            }
            if dst_alpha {
                out[d + dst_colour] = a_out * dst_max;
            }
        }
    }

    Ok(Image::from_samples(
        base.width(),
        base.height(),
        base.bands(),
        base.interpretation(),
        base.band_format(),
        &out,
        base.metadata().clone(),
    ))
}

/// Convert one overlay pixel's colour into the base's colour bands,
/// normalised to 0–1.
fn map_colour(
    colour: &[f32],
    max: f32,
    from: Interpretation,
    to: Interpretation,
    out: &mut [f32],
) -> Result<()> {
    let norm = |i: usize| (colour[i] / max).clamp(0.0, 1.0);
    match (colour.len(), out.len()) {
        (n, m) if n == m && (from == Interpretation::Cmyk) == (to == Interpretation::Cmyk) => {
            for (i, o) in out.iter_mut().enumerate() {
                *o = norm(i);
            }
        }
        (1, _) if to != Interpretation::Cmyk => out.fill(norm(0)),
        (3, 1) => out[0] = LUMA.iter().enumerate().map(|(i, w)| w * norm(i)).sum(),
        (3, 4) if to == Interpretation::Cmyk => {
            let rgb = [norm(0), norm(1), norm(2)];
            let k = 1.0 - rgb.iter().copied().fold(0.0, f32::max);
            for (o, c) in out.iter_mut().zip(rgb) {
                *o = if k < 1.0 { (1.0 - c - k) / (1.0 - k) } else { 0.0 };
            }
            out[3] = k;
        }
        (n, m) => {
            return Err(PipelineError::CompositeFailure(format!(
                "cannot composite {n}-band {from:?} onto {m}-band {to:?}"
            )));
        }
    }
    Ok(())
}

/// Composite `watermark` at the `gravity` anchor of `base`.
pub fn apply_watermark(base: &Image, watermark: &Image, gravity: Gravity, opacity: f64) -> Result<Image> {
    let (left, top) = gravity.point_watermark(
        base.width() as i64,
        base.height() as i64,
        watermark.width() as i64,
        watermark.height() as i64,
    );
    composite(base, watermark, left, top, opacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::PixelBuffer;

    fn rgb(width: u32, height: u32, value: [u8; 3]) -> Image {
        let data = value.repeat((width * height) as usize);
        Image::new(width, height, 3, Interpretation::Srgb, PixelBuffer::U8(data)).unwrap()
    }

    fn checker_rgba(width: u32, height: u32) -> Image {
        let data = (0..width * height)
            .flat_map(|i| [(i * 37 % 256) as u8, (i * 91 % 256) as u8, 200, (i * 53 % 256) as u8])
            .collect();
        Image::from_rgba8(width, height, data).unwrap()
    }

    #[test]
    fn opaque_overlay_replaces_pixels() {
        let base = rgb(3, 3, [0, 0, 0]);
        let wm = Image::from_rgba8(1, 1, vec![10, 20, 30, 255]).unwrap();
        let out = composite(&base, &wm, 1, 1, 1.0).unwrap();
        assert_eq!(out.get_point(1, 1), Some(vec![10.0, 20.0, 30.0]));
        assert_eq!(out.get_point(0, 0), Some(vec![0.0, 0.0, 0.0]));
        assert_eq!(out.bands(), 3);
    }

    #[test]
    fn half_opacity_blends() {
        let base = rgb(1, 1, [0, 0, 0]);
        let wm = Image::from_rgba8(1, 1, vec![200, 100, 50, 255]).unwrap();
        let out = composite(&base, &wm, 0, 0, 0.5).unwrap();
        assert_eq!(out.get_point(0, 0), Some(vec![100.0, 50.0, 25.0]));
    }

    #[test]
    fn zero_opacity_leaves_base_untouched() {
        let base = checker_rgba(5, 4);
        let wm = checker_rgba(3, 3);
        let out = composite(&base, &wm, 1, 1, 0.0).unwrap();
        assert_eq!(out, base);
    }

    #[test]
    fn full_opacity_equals_unscaled_alpha() {
        let base = checker_rgba(4, 4);
        let wm = checker_rgba(2, 2);
        let full = composite(&base, &wm, 1, 1, 1.0).unwrap();
        let above = composite(&base, &wm, 1, 1, 7.5).unwrap();
        assert_eq!(full, above);
    }

    #[test]
    fn translucent_overlay_on_transparent_base() {
        let base = Image::from_rgba8(1, 1, vec![0, 0, 0, 0]).unwrap();
        let wm = Image::from_rgba8(1, 1, vec![255, 0, 0, 128]).unwrap();
        let out = composite(&base, &wm, 0, 0, 1.0).unwrap();
        assert_eq!(out.get_point(0, 0), Some(vec![255.0, 0.0, 0.0, 128.0]));
    }

    #[test]
    fn overlay_is_clipped_to_base() {
        let base = rgb(2, 2, [0, 0, 0]);
        let wm = rgb(3, 3, [255, 255, 255]);
        let out = composite(&base, &wm, -2, -2, 1.0).unwrap();
        assert_eq!(out.get_point(0, 0), Some(vec![255.0; 3]));
        assert_eq!(out.get_point(1, 1), Some(vec![0.0; 3]));
    }

    #[test]
    fn overlay_far_outside_base_is_a_no_op() {
        let base = checker_rgba(4, 4);
        let wm = checker_rgba(2, 2);
        for (left, top) in [(i64::MAX, 0), (0, i64::MAX), (i64::MIN, i64::MIN), (4, 0), (-2, 1)] {
            assert_eq!(composite(&base, &wm, left, top, 1.0).unwrap(), base);
        }
    }

    #[test]
    fn output_keeps_base_sample_type() {
        let base = Image::new(1, 1, 3, Interpretation::Rgb16, PixelBuffer::U16(vec![0; 3])).unwrap();
        let wm = Image::from_rgba8(1, 1, vec![255, 255, 255, 255]).unwrap();
        let out = composite(&base, &wm, 0, 0, 1.0).unwrap();
        assert_eq!(out.pixels(), &PixelBuffer::U16(vec![65535; 3]));
    }

    #[test]
    fn grey_overlay_on_colour_base() {
        let base = rgb(1, 1, [0, 0, 0]);
        let wm = Image::new(1, 1, 1, Interpretation::BW, PixelBuffer::U8(vec![90])).unwrap();
        let out = composite(&base, &wm, 0, 0, 1.0).unwrap();
        assert_eq!(out.get_point(0, 0), Some(vec![90.0; 3]));
    }

    #[test]
    fn incompatible_bands_are_composite_failure() {
        let base = Image::new(1, 1, 2, Interpretation::BW, PixelBuffer::U8(vec![0, 255])).unwrap();
        let wm = Image::new(1, 1, 4, Interpretation::Cmyk, PixelBuffer::U8(vec![0, 0, 0, 0])).unwrap();
        assert!(matches!(
            composite(&base, &wm, 0, 0, 1.0),
            Err(PipelineError::CompositeFailure(_))
        ));
    }

    #[test]
    fn nan_opacity_rejected() {
        let base = rgb(1, 1, [0, 0, 0]);
        assert!(matches!(
            composite(&base, &base, 0, 0, f64::NAN),
            Err(PipelineError::CompositeFailure(_))
        ));
    }

    #[test]
    fn apply_watermark_uses_gravity() {
        let base = rgb(4, 4, [0, 0, 0]);
        let wm = rgb(1, 1, [255, 255, 255]);
        let out = apply_watermark(&base, &wm, Gravity::BottomRight, 1.0).unwrap();
        assert_eq!(out.get_point(3, 3), Some(vec![255.0; 3]));
        assert_eq!(out.get_point(0, 0), Some(vec![0.0; 3]));
    }
}
