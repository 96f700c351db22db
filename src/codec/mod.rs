//! Format dispatch: bytes ⇄ [`Image`].
//!
//! The [`Codec`] trait is the collaborator boundary. The dispatcher owns
//! option normalisation and the format checks that must happen before any
//! byte is inspected; the codec owns everything format-specific.
//!
//! The production implementation is [`RustCodec`], pure Rust and built on the
//! `image` crate plus `rav1d` for AV1 stills.
//!
//! | Entry point | Behaviour |
//! |---|---|
//! | [`decode`] | `Unknown` fails fast, page options normalised, then codec |
//! | [`decode_auto`] | magic-number sniff, then [`decode`] |
//! | [`decode_pdf_pages`] | sniff must say PDF, then [`decode`] |
//! | [`encode`] | codec, with the target format taken from the options |

mod animation;
mod avif;
mod convert;
pub mod options;
pub mod rust_codec;

pub use options::{
    AccessHint, DecodeOptions, EncodeOptions, HeifCompression, HeifOptions, JpegOptions,
    PngOptions, Quality, WebpOptions,
};
pub use rust_codec::RustCodec;

use crate::error::{PipelineError, Result};
use crate::format::ImageFormat;
use crate::raster::Image;

/// A decode/encode collaborator.
///
/// Implementations must be `Sync` so batches can share one codec across
/// worker threads.
pub trait Codec: Sync {
    /// Decode `bytes` known to be `format`. Options arrive normalised.
    fn decode(&self, bytes: &[u8], format: ImageFormat, options: &DecodeOptions)
    -> Result<Image>;

    /// Encode `image` with the format and settings carried by `options`.
    fn encode(&self, image: &Image, options: &EncodeOptions) -> Result<Vec<u8>>;
}

/// Decode bytes of a declared format.
///
/// `Unknown` fails with [`PipelineError::UnsupportedFormat`] before the codec
/// sees a single byte.
pub fn decode(
    codec: &impl Codec,
    bytes: &[u8],
    format: ImageFormat,
    options: &DecodeOptions,
) -> Result<Image> {
    if format == ImageFormat::Unknown {
        return Err(PipelineError::UnsupportedFormat(format));
    }
    let options = options.normalized();
    tracing::debug!(
        %format,
        len = bytes.len(),
        page = options.page,
        page_count = options.page_count,
        "decoding"
    );
    let image = codec.decode(bytes, format, &options)?;
    tracing::debug!(
        %format,
        width = image.width(),
        height = image.height(),
        bands = image.bands(),
        "decoded"
    );
    Ok(image)
}

/// Decode bytes whose format is identified by their magic number.
pub fn decode_auto(codec: &impl Codec, bytes: &[u8], options: &DecodeOptions) -> Result<Image> {
    decode(codec, bytes, ImageFormat::sniff(bytes), options)
}

/// Decode `page_count` pages of a PDF starting at `page`.
pub fn decode_pdf_pages(
    codec: &impl Codec,
    bytes: &[u8],
    page: i32,
    page_count: i32,
) -> Result<Image> {
    let found = ImageFormat::sniff(bytes);
    if found != ImageFormat::Pdf {
        return Err(PipelineError::FormatMismatch {
            expected: ImageFormat::Pdf,
            found,
        });
    }
    decode(
        codec,
        bytes,
        ImageFormat::Pdf,
        &DecodeOptions::pages(page, page_count),
    )
}

/// Encode an image.
pub fn encode(codec: &impl Codec, image: &Image, options: &EncodeOptions) -> Result<Vec<u8>> {
    tracing::debug!(
        format = %options.format(),
        width = image.width(),
        height = image.height(),
        "encoding"
    );
    codec.encode(image, options)
}
