//! Orientation and alpha normalisation.
//!
//! | Operation | Result |
//! |---|---|
//! | [`get_orientation`] | EXIF orientation 1–8, defaulting to 1 |
//! | [`auto_orient`] | pixels transformed so orientation becomes 1 |
//! | [`ensure_alpha`] | opaque alpha band appended when missing |
//! | [`is_animated`] | all three animation fields present and well-typed |
//! | [`flatten`] | alpha composited onto an opaque background |

use super::geometry::{Angle, flip_horizontal, rotate_by};
use crate::raster::{Image, MetaValue, fields};

/// EXIF orientation tag, or 1 when absent or malformed.
///
/// The integer `orientation` field wins. A string-typed
/// `exif-ifd0-Orientation` (e.g. `"6 (Right-top, Short, 1 components)"`) is
/// read by its leading integer.
pub fn get_orientation(image: &Image) -> i32 {
    let metadata = image.metadata();
    let from_int = metadata.get(fields::ORIENTATION).and_then(MetaValue::as_int);
    let from_str = || {
        metadata
            .get(fields::EXIF_ORIENTATION)
            .and_then(MetaValue::as_str)
            .and_then(leading_int)
    };
    from_int
        .or_else(from_str)
        .filter(|o| (1..=8).contains(o))
        .unwrap_or(1)
}

/// Parse the leading decimal digits of `text`, like C's `atoi`.
fn leading_int(text: &str) -> Option<i32> {
    let trimmed = text.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

/// Apply the rotation/flip implied by the orientation tag, then clear it.
pub fn auto_orient(image: &Image) -> Image {
    let orientation = get_orientation(image);
    tracing::debug!(orientation, "auto-orienting");
    let (angle, flip) = match orientation {
        2 => (Angle::D0, true),
        3 => (Angle::D180, false),
        4 => (Angle::D180, true),
        5 => (Angle::D90, true),
        6 => (Angle::D90, false),
        7 => (Angle::D270, true),
        8 => (Angle::D270, false),
        _ => (Angle::D0, false),
    };
    let rotated = rotate_by(image, angle);
    let mut out = if flip {
        flip_horizontal(&rotated)
    } else {
        rotated
    };
    clear_orientation(&mut out);
    out
}

pub(crate) fn clear_orientation(image: &mut Image) {
    let metadata = image.metadata_mut();
    metadata.remove(fields::ORIENTATION);
    metadata.remove(fields::EXIF_ORIENTATION);
}

/// Copy with an alpha band. Images that already have one are returned as-is;
/// otherwise a fully opaque band is appended.
pub fn ensure_alpha(image: &Image) -> Image {
    if image.has_alpha() {
        return image.clone();
    }
    let bands = image.bands() as usize;
    let opaque = image.max_value();
    let samples = image.samples_f32();
    let mut out = Vec::with_capacity(samples.len() / bands * (bands + 1));
    for px in samples.chunks_exact(bands) {
        out.extend_from_slice(px);
        out.push(opaque);
    }
    Image::from_samples(
        image.width(),
        image.height(),
        image.bands() + 1,
        image.interpretation(),
        image.band_format(),
        &out,
        image.metadata().clone(),
    )
}

/// True when `page-height`, `gif-delay` and `gif-loop` are all present with
/// their expected types.
pub fn is_animated(image: &Image) -> bool {
    let metadata = image.metadata();
    matches!(metadata.get(fields::PAGE_HEIGHT), Some(MetaValue::Int(_)))
        && matches!(metadata.get(fields::GIF_DELAY), Some(MetaValue::IntArray(_)))
        && matches!(metadata.get(fields::GIF_LOOP), Some(MetaValue::Int(_)))
}

/// Composite the alpha band onto an opaque `background` (one value per
/// colour band, missing entries read as 0) and drop it.
pub fn flatten(image: &Image, background: &[f64]) -> Image {
    if !image.has_alpha() {
        return image.clone();
    }
    let bands = image.bands() as usize;
    let colour = bands - 1;
    let max = image.max_value();
    let samples = image.samples_f32();
    let mut out = Vec::with_capacity(samples.len() / bands * colour);
    for px in samples.chunks_exact(bands) {
        let alpha = (px[colour] / max).clamp(0.0, 1.0);
        for (band, &value) in px[..colour].iter().enumerate() {
            let bg = background.get(band).copied().unwrap_or(0.0) as f32;
            out.push(value * alpha + bg * (1.0 - alpha));
        }
    }
    Image::from_samples(
        image.width(),
        image.height(),
        colour as u8,
        image.interpretation(),
        image.band_format(),
        &out,
        image.metadata().clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Interpretation, PixelBuffer};

    fn rgb(width: u32, height: u32, data: Vec<u8>) -> Image {
        Image::new(width, height, 3, Interpretation::Srgb, PixelBuffer::U8(data)).unwrap()
    }

    fn with_orientation(value: MetaValue, field: &str) -> Image {
        let mut img = Image::pixel();
        img.metadata_mut().set(field, value);
        img
    }

    // =========================================================================
    // get_orientation
    // =========================================================================

    #[test]
    fn orientation_defaults_to_identity() {
        assert_eq!(get_orientation(&Image::pixel()), 1);
    }

    #[test]
    fn orientation_reads_int_field() {
        let img = with_orientation(MetaValue::Int(6), fields::ORIENTATION);
        assert_eq!(get_orientation(&img), 6);
    }

    #[test]
    fn orientation_ignores_wrong_type() {
        let img = with_orientation(MetaValue::Str("6".into()), fields::ORIENTATION);
        assert_eq!(get_orientation(&img), 1);
    }

    #[test]
    fn orientation_reads_exif_string() {
        let img = with_orientation(
            MetaValue::Str("8 (Left-bottom, Short, 1 components, 2 bytes)".into()),
            fields::EXIF_ORIENTATION,
        );
        assert_eq!(get_orientation(&img), 8);
    }

    #[test]
    fn orientation_out_of_range_is_identity() {
        let img = with_orientation(MetaValue::Int(42), fields::ORIENTATION);
        assert_eq!(get_orientation(&img), 1);
    }

    #[test]
    fn leading_int_behaves_like_atoi() {
        assert_eq!(leading_int(" 3 (Bottom-right)"), Some(3));
        assert_eq!(leading_int("x3"), None);
    }

    // =========================================================================
    // auto_orient
    // =========================================================================

    #[test]
    fn auto_orient_rotates_and_clears_tag() {
        // 2x1: [A, B]; orientation 6 means rotate 90° clockwise.
        let mut img = rgb(2, 1, vec![1, 1, 1, 2, 2, 2]);
        img.metadata_mut().set(fields::ORIENTATION, MetaValue::Int(6));
        let out = auto_orient(&img);
        assert_eq!((out.width(), out.height()), (1, 2));
        assert_eq!(out.pixels(), &PixelBuffer::U8(vec![1, 1, 1, 2, 2, 2]));
        assert_eq!(get_orientation(&out), 1);
        assert!(!out.metadata().contains(fields::ORIENTATION));
    }

    #[test]
    fn auto_orient_mirror() {
        let mut img = rgb(2, 1, vec![1, 1, 1, 2, 2, 2]);
        img.metadata_mut().set(fields::ORIENTATION, MetaValue::Int(2));
        let out = auto_orient(&img);
        assert_eq!(out.pixels(), &PixelBuffer::U8(vec![2, 2, 2, 1, 1, 1]));
    }

    #[test]
    fn auto_orient_transpose() {
        // 2x2 [[a, b], [c, d]] transposed is [[a, c], [b, d]].
        let grey = Image::new(2, 2, 1, Interpretation::BW, PixelBuffer::U8(vec![1, 2, 3, 4]))
            .unwrap();
        let mut img = grey;
        img.metadata_mut().set(fields::ORIENTATION, MetaValue::Int(5));
        let out = auto_orient(&img);
        assert_eq!(out.pixels(), &PixelBuffer::U8(vec![1, 3, 2, 4]));
    }

    // =========================================================================
    // ensure_alpha
    // =========================================================================

    #[test]
    fn ensure_alpha_appends_opaque_band() {
        let out = ensure_alpha(&rgb(1, 1, vec![10, 20, 30]));
        assert_eq!(out.bands(), 4);
        assert!(out.has_alpha());
        assert_eq!(out.pixels(), &PixelBuffer::U8(vec![10, 20, 30, 255]));
    }

    #[test]
    fn ensure_alpha_is_idempotent() {
        let once = ensure_alpha(&rgb(2, 1, vec![1, 2, 3, 4, 5, 6]));
        let twice = ensure_alpha(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn ensure_alpha_uses_full_scale_for_sixteen_bit() {
        let img = Image::new(1, 1, 1, Interpretation::Grey16, PixelBuffer::U16(vec![7])).unwrap();
        assert_eq!(ensure_alpha(&img).pixels(), &PixelBuffer::U16(vec![7, 65535]));
    }

    // =========================================================================
    // is_animated
    // =========================================================================

    #[test]
    fn animated_needs_all_three_fields() {
        let mut img = Image::pixel();
        assert!(!is_animated(&img));
        img.metadata_mut().set(fields::PAGE_HEIGHT, MetaValue::Int(1));
        img.metadata_mut().set(fields::GIF_DELAY, MetaValue::IntArray(vec![100]));
        assert!(!is_animated(&img));
        img.metadata_mut().set(fields::GIF_LOOP, MetaValue::Int(0));
        assert!(is_animated(&img));
    }

    #[test]
    fn animated_rejects_mistyped_delay() {
        let mut img = Image::pixel();
        img.metadata_mut().set(fields::PAGE_HEIGHT, MetaValue::Int(1));
        img.metadata_mut().set(fields::GIF_DELAY, MetaValue::Int(100));
        img.metadata_mut().set(fields::GIF_LOOP, MetaValue::Int(0));
        assert!(!is_animated(&img));
    }

    // =========================================================================
    // flatten
    // =========================================================================

    #[test]
    fn flatten_blends_onto_background() {
        let img = Image::from_rgba8(2, 1, vec![200, 100, 0, 255, 200, 100, 0, 0]).unwrap();
        let out = flatten(&img, &[0.0, 0.0, 255.0]);
        assert_eq!(out.bands(), 3);
        assert_eq!(out.pixels(), &PixelBuffer::U8(vec![200, 100, 0, 0, 0, 255]));
    }

    #[test]
    fn flatten_without_alpha_is_copy() {
        let img = rgb(1, 1, vec![1, 2, 3]);
        assert_eq!(flatten(&img, &[0.0; 3]), img);
    }
}
