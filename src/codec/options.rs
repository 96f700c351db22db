//! Typed option records for decode and encode.
//!
//! These structs describe *what* the caller wants, not *how* a codec achieves
//! it. They are the interface between the dispatcher and a
//! [`Codec`](super::Codec) implementation, so a mock codec can record them
//! without any pixel work.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`DecodeOptions`]: page selection for paged formats plus an access hint.
//! - [`EncodeOptions`]: one variant per encodable format, carrying exactly the
//!   fields that format accepts.

use crate::config::EncodeConfig;
use crate::error::{PipelineError, Result};
use crate::format::ImageFormat;
use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// How the decoder will be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessHint {
    /// Top-to-bottom, single pass.
    #[default]
    Sequential,
    Random,
}

/// Decode-side options.
///
/// `page` and `page_count` only matter for paged formats (PDF, animated GIF).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    pub page: i32,
    pub page_count: i32,
    pub access: AccessHint,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            page: 0,
            page_count: 1,
            access: AccessHint::Sequential,
        }
    }
}

impl DecodeOptions {
    pub fn pages(page: i32, page_count: i32) -> Self {
        Self {
            page,
            page_count,
            ..Self::default()
        }
    }

    /// Clamp `page` to `>= 0`; a non-positive `page_count` means one page.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(0),
            page_count: if self.page_count <= 0 {
                1
            } else {
                self.page_count
            },
            access: self.access,
        }
    }
}

/// HEIF compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeifCompression {
    #[default]
    Hevc,
    Avc,
    Jpeg,
    Av1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegOptions {
    pub quality: Quality,
    pub strip: bool,
    pub interlace: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngOptions {
    /// zlib effort, 0–9.
    pub compression: u8,
    pub strip: bool,
    pub interlace: bool,
    pub palette: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebpOptions {
    pub quality: Quality,
    pub strip: bool,
    pub lossless: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeifOptions {
    pub quality: Quality,
    pub compression: HeifCompression,
    pub lossless: bool,
}

/// Per-format encode configuration. The variant is the output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeOptions {
    Jpeg(JpegOptions),
    Png(PngOptions),
    Webp(WebpOptions),
    Gif,
    Tiff { quality: Quality },
    /// AV1 compression is implied.
    Avif { quality: Quality },
    Heif(HeifOptions),
    Bmp,
    Ico,
}

impl EncodeOptions {
    pub fn format(&self) -> ImageFormat {
        match self {
            EncodeOptions::Jpeg(_) => ImageFormat::Jpeg,
            EncodeOptions::Png(_) => ImageFormat::Png,
            EncodeOptions::Webp(_) => ImageFormat::Webp,
            EncodeOptions::Gif => ImageFormat::Gif,
            EncodeOptions::Tiff { .. } => ImageFormat::Tiff,
            EncodeOptions::Avif { .. } => ImageFormat::Avif,
            EncodeOptions::Heif(_) => ImageFormat::Heif,
            EncodeOptions::Bmp => ImageFormat::Bmp,
            EncodeOptions::Ico => ImageFormat::Ico,
        }
    }

    /// Build the options for `format` from configured defaults.
    ///
    /// Formats with no encoder (PDF, SVG, unknown) fail with
    /// [`PipelineError::UnsupportedFormat`].
    pub fn for_format(format: ImageFormat, defaults: &EncodeConfig) -> Result<Self> {
        let quality = Quality::new(defaults.quality);
        Ok(match format {
            ImageFormat::Jpeg => EncodeOptions::Jpeg(JpegOptions {
                quality,
                strip: defaults.strip,
                interlace: defaults.interlace,
            }),
            ImageFormat::Png => EncodeOptions::Png(PngOptions {
                compression: defaults.compression,
                strip: defaults.strip,
                interlace: defaults.interlace,
                palette: defaults.palette,
            }),
            ImageFormat::Webp => EncodeOptions::Webp(WebpOptions {
                quality,
                strip: defaults.strip,
                lossless: defaults.lossless,
            }),
            ImageFormat::Gif => EncodeOptions::Gif,
            ImageFormat::Tiff => EncodeOptions::Tiff { quality },
            ImageFormat::Avif => EncodeOptions::Avif { quality },
            ImageFormat::Heif => EncodeOptions::Heif(HeifOptions {
                quality,
                compression: defaults.heif_compression,
                lossless: defaults.lossless,
            }),
            ImageFormat::Bmp => EncodeOptions::Bmp,
            ImageFormat::Ico => EncodeOptions::Ico,
            ImageFormat::Pdf | ImageFormat::Svg | ImageFormat::Unknown => {
                return Err(PipelineError::UnsupportedFormat(format));
            }
        })
    }

    /// Whether metadata should be dropped on save.
    pub fn strip(&self) -> bool {
        match self {
            EncodeOptions::Jpeg(o) => o.strip,
            EncodeOptions::Png(o) => o.strip,
            EncodeOptions::Webp(o) => o.strip,
            _ => false,
        }
    }
}
