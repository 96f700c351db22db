//! Conversions between [`Image`] and the `image` crate's `DynamicImage`.
//!
//! Decoding maps every `DynamicImage` variant onto a native-depth [`Image`].
//! Encoding goes the other way and then narrows to what a particular
//! encoder accepts (no 16-bit JPEG, no alpha in JPEG, 8-bit only WebP).

use crate::error::{PipelineError, Result};
use crate::raster::{BandFormat, Image, Interpretation, PixelBuffer};
use image::{
    DynamicImage, GrayAlphaImage, GrayImage, ImageBuffer, Rgb32FImage, RgbImage, Rgba32FImage,
    RgbaImage,
};

pub(crate) fn from_dynamic(img: DynamicImage) -> Result<Image> {
    let (width, height) = (img.width(), img.height());
    let (bands, pixels) = match img {
        DynamicImage::ImageLuma8(b) => (1, PixelBuffer::U8(b.into_raw())),
        DynamicImage::ImageLumaA8(b) => (2, PixelBuffer::U8(b.into_raw())),
        DynamicImage::ImageRgb8(b) => (3, PixelBuffer::U8(b.into_raw())),
        DynamicImage::ImageRgba8(b) => (4, PixelBuffer::U8(b.into_raw())),
        DynamicImage::ImageLuma16(b) => (1, PixelBuffer::U16(b.into_raw())),
        DynamicImage::ImageLumaA16(b) => (2, PixelBuffer::U16(b.into_raw())),
        DynamicImage::ImageRgb16(b) => (3, PixelBuffer::U16(b.into_raw())),
        DynamicImage::ImageRgba16(b) => (4, PixelBuffer::U16(b.into_raw())),
        DynamicImage::ImageRgb32F(b) => (3, PixelBuffer::F32(b.into_raw())),
        DynamicImage::ImageRgba32F(b) => (4, PixelBuffer::F32(b.into_raw())),
        other => (4, PixelBuffer::U8(other.to_rgba8().into_raw())),
    };
    let interpretation = Interpretation::default_for(bands, pixels.format());
    Image::new(width, height, bands, interpretation, pixels)
        .map_err(|e| PipelineError::DecodeFailure(e.to_string()))
}

/// Build a `DynamicImage` carrying the image's pixels.
///
/// CMYK is converted to sRGB first. Float images are rescaled to 0–1 with
/// grey replicated into RGB, since `image` has no single-channel float type.
pub(crate) fn to_dynamic(image: &Image) -> Result<DynamicImage> {
    let image = if image.interpretation() == Interpretation::Cmyk {
        cmyk_to_srgb(image)
    } else {
        image.clone()
    };
    let (w, h) = (image.width(), image.height());
    let bad = || PipelineError::EncodeFailure(format!("{w}x{h} pixel buffer is malformed"));

    let dynamic = match (image.pixels(), image.bands()) {
        (PixelBuffer::U8(v), 1) => GrayImage::from_raw(w, h, v.clone()).map(DynamicImage::ImageLuma8),
        (PixelBuffer::U8(v), 2) => {
            GrayAlphaImage::from_raw(w, h, v.clone()).map(DynamicImage::ImageLumaA8)
        }
        (PixelBuffer::U8(v), 3) => RgbImage::from_raw(w, h, v.clone()).map(DynamicImage::ImageRgb8),
        (PixelBuffer::U8(v), 4) => RgbaImage::from_raw(w, h, v.clone()).map(DynamicImage::ImageRgba8),
        (PixelBuffer::U16(v), 1) => ImageBuffer::from_raw(w, h, v.clone()).map(DynamicImage::ImageLuma16),
        (PixelBuffer::U16(v), 2) => {
            ImageBuffer::from_raw(w, h, v.clone()).map(DynamicImage::ImageLumaA16)
        }
        (PixelBuffer::U16(v), 3) => ImageBuffer::from_raw(w, h, v.clone()).map(DynamicImage::ImageRgb16),
        (PixelBuffer::U16(v), 4) => {
            ImageBuffer::from_raw(w, h, v.clone()).map(DynamicImage::ImageRgba16)
        }
        (PixelBuffer::F32(v), bands @ 1..=4) => {
            let scale = 1.0 / image.max_value();
            let alpha = bands == 2 || bands == 4;
            let colour = if bands <= 2 { 1 } else { 3 };
            let mut out = Vec::with_capacity(w as usize * h as usize * if alpha { 4 } else { 3 });
            for px in v.chunks_exact(bands as usize) {
                let rgb = if colour == 1 { [px[0]; 3] } else { [px[0], px[1], px[2]] };
                out.extend(rgb.map(|s| s * scale));
                if alpha {
                    out.push(px[bands as usize - 1] * scale);
                }
            }
            if alpha {
                Rgba32FImage::from_raw(w, h, out).map(DynamicImage::ImageRgba32F)
            } else {
                Rgb32FImage::from_raw(w, h, out).map(DynamicImage::ImageRgb32F)
            }
        }
        (_, bands) => {
            return Err(PipelineError::EncodeFailure(format!(
                "cannot encode a {bands}-band {:?} image",
                image.interpretation()
            )));
        }
    };
    dynamic.ok_or_else(bad)
}

/// Naive subtractive CMYK(A) → sRGB(A), 8-bit output.
fn cmyk_to_srgb(image: &Image) -> Image {
    let max = image.max_value();
    let bands = image.bands() as usize;
    let alpha = image.has_alpha();
    let out_bands: u8 = if alpha { 4 } else { 3 };
    let samples = image.samples_f32();
    let mut out = Vec::with_capacity(samples.len() / bands * out_bands as usize);
    for px in samples.chunks_exact(bands) {
        let k = 1.0 - px[3] / max;
        for &ink in &px[..3] {
            out.push(255.0 * (1.0 - ink / max) * k);
        }
        if alpha {
            out.push(px[4] / max * 255.0);
        }
    }
    Image::from_samples(
        image.width(),
        image.height(),
        out_bands,
        Interpretation::Srgb,
        BandFormat::U8,
        &out,
        image.metadata().clone(),
    )
}

/// What an encoder can take.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Accepts {
    pub alpha: bool,
    pub grey: bool,
    pub wide: bool,
}

impl Accepts {
    pub const JPEG: Self = Self {
        alpha: false,
        grey: true,
        wide: false,
    };
    pub const RGB8: Self = Self {
        alpha: true,
        grey: false,
        wide: false,
    };
    pub const ANY: Self = Self {
        alpha: true,
        grey: true,
        wide: true,
    };
}

/// Narrow a `DynamicImage` to the layouts an encoder accepts.
pub(crate) fn narrow(img: DynamicImage, accepts: Accepts) -> DynamicImage {
    let color = img.color();
    let alpha = color.has_alpha() && accepts.alpha;
    let grey = !color.has_color() && accepts.grey;
    let wide = accepts.wide && color.bytes_per_pixel() / color.channel_count() > 1;
    match (wide, grey, alpha) {
        (false, true, false) => DynamicImage::ImageLuma8(img.to_luma8()),
        (false, true, true) => DynamicImage::ImageLumaA8(img.to_luma_alpha8()),
        (false, false, false) => DynamicImage::ImageRgb8(img.to_rgb8()),
        (false, false, true) => DynamicImage::ImageRgba8(img.to_rgba8()),
        (true, true, false) => DynamicImage::ImageLuma16(img.to_luma16()),
        (true, true, true) => DynamicImage::ImageLumaA16(img.to_luma_alpha16()),
        (true, false, false) => DynamicImage::ImageRgb16(img.to_rgb16()),
        (true, false, true) => DynamicImage::ImageRgba16(img.to_rgba16()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ColorType;

    #[test]
    fn dynamic_roundtrip_keeps_depth_and_bands() {
        let img = Image::new(2, 1, 3, Interpretation::Rgb16, PixelBuffer::U16(vec![1, 2, 3, 4, 5, 6]))
            .unwrap();
        let dynamic = to_dynamic(&img).unwrap();
        assert_eq!(dynamic.color(), ColorType::Rgb16);
        let back = from_dynamic(dynamic).unwrap();
        assert_eq!(back.pixels(), img.pixels());
        assert_eq!(back.interpretation(), Interpretation::Rgb16);
    }

    #[test]
    fn cmyk_converts_to_srgb() {
        // Pure cyan ink, no black.
        let img = Image::new(1, 1, 4, Interpretation::Cmyk, PixelBuffer::U8(vec![255, 0, 0, 0]))
            .unwrap();
        let dynamic = to_dynamic(&img).unwrap();
        assert_eq!(dynamic.color(), ColorType::Rgb8);
        assert_eq!(dynamic.to_rgb8().into_raw(), vec![0, 255, 255]);
    }

    #[test]
    fn float_grey_is_rescaled_into_rgb() {
        let img = Image::new(1, 1, 1, Interpretation::BW, PixelBuffer::F32(vec![255.0])).unwrap();
        let dynamic = to_dynamic(&img).unwrap();
        assert_eq!(dynamic.color(), ColorType::Rgb32F);
        assert_eq!(dynamic.to_rgb8().into_raw(), vec![255, 255, 255]);
    }

    #[test]
    fn narrow_for_jpeg_drops_alpha_and_depth() {
        let rgba16 = DynamicImage::ImageRgba16(ImageBuffer::from_pixel(1, 1, image::Rgba([65535u16; 4])));
        assert_eq!(narrow(rgba16, Accepts::JPEG).color(), ColorType::Rgb8);

        let grey = DynamicImage::ImageLuma8(GrayImage::new(1, 1));
        assert_eq!(narrow(grey.clone(), Accepts::JPEG).color(), ColorType::L8);
        assert_eq!(narrow(grey, Accepts::RGB8).color(), ColorType::Rgb8);
    }

    #[test]
    fn narrow_any_keeps_sixteen_bits() {
        let la16 = DynamicImage::ImageLumaA16(ImageBuffer::new(1, 1));
        assert_eq!(narrow(la16, Accepts::ANY).color(), ColorType::La16);
    }
}
