//! Pure Rust codec: everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Format | Decode | Encode |
//! |---|---|---|
//! | JPEG, PNG, TIFF, BMP, ICO | `image` | `image` |
//! | WEBP | `image` | `image` (lossless only) |
//! | GIF | `image`, all frames | `image`, animated when `page-height` is set |
//! | AVIF | `avif-parse` + `rav1d` | `image` (rav1e, speed 6) |
//! | HEIF | `avif-parse` + `rav1d`, AV1 items only | AVIF encoder when `compression = av1` |
//! | SVG, PDF | unsupported | unsupported |
//!
//! Options a codec cannot honour (progressive JPEG, interlaced or palette PNG,
//! lossy WEBP, TIFF quality, HEIF lossless) are accepted, logged at `warn`
//! and ignored.

use super::convert::{self, Accepts};
use super::{Codec, DecodeOptions, EncodeOptions, HeifCompression, Quality, animation, avif};
use crate::error::{PipelineError, Result};
use crate::format::ImageFormat;
use crate::raster::{Image, MetaValue, fields};
use image::codecs::png::{CompressionType, FilterType as PngFilter};
use image::{DynamicImage, ImageDecoder, ImageEncoder, ImageReader};
use std::io::Cursor;

/// Largest edge the ICO container can describe.
pub const ICO_MAX_DIMENSION: u32 = 256;

/// Formats whose decoders are compiled into [`RustCodec`].
pub const DECODABLE: &[ImageFormat] = &[
    ImageFormat::Avif,
    ImageFormat::Bmp,
    ImageFormat::Gif,
    ImageFormat::Heif,
    ImageFormat::Ico,
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Tiff,
    ImageFormat::Webp,
];

/// Pure Rust codec using the `image` crate ecosystem.
///
/// See the [module docs](self) for the format-to-crate mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

fn reader_format(format: ImageFormat) -> Option<image::ImageFormat> {
    match format {
        ImageFormat::Jpeg => Some(image::ImageFormat::Jpeg),
        ImageFormat::Png => Some(image::ImageFormat::Png),
        ImageFormat::Webp => Some(image::ImageFormat::WebP),
        ImageFormat::Tiff => Some(image::ImageFormat::Tiff),
        ImageFormat::Bmp => Some(image::ImageFormat::Bmp),
        ImageFormat::Ico => Some(image::ImageFormat::Ico),
        _ => None,
    }
}

/// Decode a single-frame raster through `image`, lifting orientation, ICC
/// profile and EXIF into the metadata map.
fn decode_raster(bytes: &[u8], format: image::ImageFormat) -> Result<Image> {
    let failure = |e: image::ImageError| PipelineError::DecodeFailure(e.to_string());
    let mut decoder = ImageReader::with_format(Cursor::new(bytes), format)
        .into_decoder()
        .map_err(failure)?;

    let icc = decoder.icc_profile().ok().flatten();
    let exif = decoder.exif_metadata().ok().flatten();
    let orientation = exif
        .as_ref()
        .and_then(|_| decoder.orientation().ok())
        .map(|o| o.to_exif());

    let mut image = convert::from_dynamic(DynamicImage::from_decoder(decoder).map_err(failure)?)?;
    let metadata = image.metadata_mut();
    if let Some(orientation) = orientation {
        metadata.set(fields::ORIENTATION, MetaValue::Int(i32::from(orientation)));
        metadata.set(
            fields::EXIF_ORIENTATION,
            MetaValue::Str(format!("{orientation} ({})", orientation_name(orientation))),
        );
    }
    if let Some(exif) = exif {
        metadata.set(fields::EXIF, MetaValue::Blob(exif));
    }
    if let Some(icc) = icc {
        metadata.set(fields::ICC_PROFILE, MetaValue::Blob(icc));
    }
    Ok(image)
}

/// TIFF names for the eight EXIF orientations.
fn orientation_name(orientation: u8) -> &'static str {
    match orientation {
        1 => "Top-left",
        2 => "Top-right",
        3 => "Bottom-right",
        4 => "Bottom-left",
        5 => "Left-top",
        6 => "Right-top",
        7 => "Right-bottom",
        8 => "Left-bottom",
        _ => "Unknown",
    }
}

fn unhonoured(format: ImageFormat, option: &str) {
    tracing::warn!(%format, option, "encode option not supported by the built-in codec, ignoring");
}

/// Write with `encoder`, embedding the ICC profile unless stripping.
fn write_with(
    encoder: impl ImageEncoder,
    img: &DynamicImage,
    source: &Image,
    strip: bool,
) -> Result<()> {
    let mut encoder = encoder;
    if !strip {
        if let Some(icc) = source.metadata().get(fields::ICC_PROFILE).and_then(|v| v.as_blob()) {
            if let Err(e) = encoder.set_icc_profile(icc.to_vec()) {
                tracing::debug!("ICC profile not embedded: {e}");
            }
        }
    }
    img.write_with_encoder(encoder)
        .map_err(|e| PipelineError::EncodeFailure(e.to_string()))
}

fn png_compression(level: u8) -> CompressionType {
    match level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

fn encode_avif(image: &Image, quality: Quality) -> Result<Vec<u8>> {
    let img = convert::narrow(convert::to_dynamic(image)?, Accepts::RGB8);
    let mut buf = Vec::new();
    let encoder = image::codecs::avif::AvifEncoder::new_with_speed_quality(
        &mut buf,
        6,
        quality.value() as u8,
    );
    write_with(encoder, &img, image, false)?;
    Ok(buf)
}

impl Codec for RustCodec {
    fn decode(
        &self,
        bytes: &[u8],
        format: ImageFormat,
        options: &DecodeOptions,
    ) -> Result<Image> {
        match format {
            ImageFormat::Gif => animation::decode_gif(bytes, options),
            ImageFormat::Avif | ImageFormat::Heif => avif::decode(bytes),
            ImageFormat::Svg | ImageFormat::Pdf | ImageFormat::Unknown => {
                Err(PipelineError::UnsupportedFormat(format))
            }
            _ => match reader_format(format) {
                Some(reader) => decode_raster(bytes, reader),
                None => Err(PipelineError::UnsupportedFormat(format)),
            },
        }
    }

    fn encode(&self, image: &Image, options: &EncodeOptions) -> Result<Vec<u8>> {
        let format = options.format();
        let strip = options.strip();
        let dynamic = || convert::to_dynamic(image);
        let mut buf = Vec::new();

        match options {
            EncodeOptions::Jpeg(o) => {
                if o.interlace {
                    unhonoured(format, "interlace");
                }
                let img = convert::narrow(dynamic()?, Accepts::JPEG);
                let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut buf,
                    o.quality.value() as u8,
                );
                write_with(encoder, &img, image, strip)?;
            }
            EncodeOptions::Png(o) => {
                if o.interlace {
                    unhonoured(format, "interlace");
                }
                if o.palette {
                    unhonoured(format, "palette");
                }
                let img = convert::narrow(dynamic()?, Accepts::ANY);
                let encoder = image::codecs::png::PngEncoder::new_with_quality(
                    &mut buf,
                    png_compression(o.compression),
                    PngFilter::Adaptive,
                );
                write_with(encoder, &img, image, strip)?;
            }
            EncodeOptions::Webp(o) => {
                if !o.lossless {
                    unhonoured(format, "lossy quality");
                }
                let img = convert::narrow(dynamic()?, Accepts::RGB8);
                let encoder = image::codecs::webp::WebPEncoder::new_lossless(&mut buf);
                write_with(encoder, &img, image, strip)?;
            }
            EncodeOptions::Gif => return animation::encode_gif(image),
            EncodeOptions::Tiff { .. } => {
                unhonoured(format, "quality");
                let img = convert::narrow(dynamic()?, Accepts::ANY);
                let encoder = image::codecs::tiff::TiffEncoder::new(Cursor::new(&mut buf));
                write_with(encoder, &img, image, strip)?;
            }
            EncodeOptions::Avif { quality } => return encode_avif(image, *quality),
            EncodeOptions::Heif(o) => {
                if o.compression != HeifCompression::Av1 {
                    return Err(PipelineError::UnsupportedFormat(format));
                }
                if o.lossless {
                    unhonoured(format, "lossless");
                }
                return encode_avif(image, o.quality);
            }
            EncodeOptions::Bmp => {
                let img = convert::narrow(dynamic()?, Accepts::RGB8);
                let encoder = image::codecs::bmp::BmpEncoder::new(&mut buf);
                write_with(encoder, &img, image, strip)?;
            }
            EncodeOptions::Ico => {
                if image.width() > ICO_MAX_DIMENSION || image.height() > ICO_MAX_DIMENSION {
                    return Err(PipelineError::EncodeFailure(format!(
                        "ICO images are limited to {ICO_MAX_DIMENSION}x{ICO_MAX_DIMENSION}, got {}x{}",
                        image.width(),
                        image.height()
                    )));
                }
                let img = convert::narrow(dynamic()?, Accepts::RGB8);
                let encoder = image::codecs::ico::IcoEncoder::new(&mut buf);
                write_with(encoder, &img, image, strip)?;
            }
        }
        Ok(buf)
    }
}
