//! In-memory raster model.
//!
//! An [`Image`] is a fully decoded, row-major, band-interleaved pixel buffer
//! plus its [`Metadata`]. Samples are stored in their native type
//! ([`PixelBuffer`]), so a 16-bit PNG stays 16-bit through the pipeline.
//!
//! ## Invariants
//!
//! - `width > 0`, `height > 0`, `1 <= bands <= 5`
//! - `pixels.len() == width * height * bands` (samples, not bytes)
//! - the alpha band, when present, is always the last band
//!
//! Transforms never mutate an image in place: they borrow their input and
//! return a freshly owned [`Image`].

pub mod metadata;
pub(crate) mod planes;

pub use metadata::{MetaValue, Metadata, fields};

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Numeric type of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandFormat {
    U8,
    U16,
    F32,
}

impl BandFormat {
    /// Bytes per sample.
    pub fn sample_size(self) -> usize {
        match self {
            BandFormat::U8 => 1,
            BandFormat::U16 => 2,
            BandFormat::F32 => 4,
        }
    }

    /// Round and clip an `f32` into this sample type's range.
    fn clip(self, value: f32) -> f32 {
        match self {
            BandFormat::U8 => value.round().clamp(0.0, u8::MAX as f32),
            BandFormat::U16 => value.round().clamp(0.0, u16::MAX as f32),
            BandFormat::F32 => value,
        }
    }
}

/// How the bands of an image are to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpretation {
    /// Multi-band data with no colour meaning.
    Multiband,
    /// Greyscale, 0–255 range.
    BW,
    /// Greyscale, 0–65535 range.
    Grey16,
    /// sRGB, 0–255 range.
    Srgb,
    /// sRGB, 0–65535 range.
    Rgb16,
    /// Linear light RGB, 0–1 range.
    Scrgb,
    /// Subtractive ink coverage, 0–255 range.
    Cmyk,
}

impl Interpretation {
    /// Natural interpretation for a band count and sample type.
    pub fn default_for(bands: u8, format: BandFormat) -> Self {
        match (bands, format) {
            (1 | 2, BandFormat::U16) => Interpretation::Grey16,
            (1 | 2, _) => Interpretation::BW,
            (3 | 4, BandFormat::U8) => Interpretation::Srgb,
            (3 | 4, BandFormat::U16) => Interpretation::Rgb16,
            (3 | 4, BandFormat::F32) => Interpretation::Scrgb,
            (5, _) => Interpretation::Cmyk,
            _ => Interpretation::Multiband,
        }
    }

    /// Sample value of "full intensity", and therefore of an opaque alpha.
    pub fn max_value(self) -> f32 {
        match self {
            Interpretation::Grey16 | Interpretation::Rgb16 => 65535.0,
            Interpretation::Scrgb => 1.0,
            _ => 255.0,
        }
    }
}

/// Sample storage, one variant per [`BandFormat`].
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl PixelBuffer {
    pub fn format(&self) -> BandFormat {
        match self {
            PixelBuffer::U8(_) => BandFormat::U8,
            PixelBuffer::U16(_) => BandFormat::U16,
            PixelBuffer::F32(_) => BandFormat::F32,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            PixelBuffer::U8(v) => v.len(),
            PixelBuffer::U16(v) => v.len(),
            PixelBuffer::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sample(&self, index: usize) -> f32 {
        match self {
            PixelBuffer::U8(v) => v[index] as f32,
            PixelBuffer::U16(v) => v[index] as f32,
            PixelBuffer::F32(v) => v[index],
        }
    }

    fn to_f32(&self) -> Vec<f32> {
        match self {
            PixelBuffer::U8(v) => v.iter().map(|&s| s as f32).collect(),
            PixelBuffer::U16(v) => v.iter().map(|&s| s as f32).collect(),
            PixelBuffer::F32(v) => v.clone(),
        }
    }

    /// Build a buffer of `format` from `f32` samples, rounding and clipping.
    fn from_f32(format: BandFormat, samples: &[f32]) -> Self {
        match format {
            BandFormat::U8 => {
                PixelBuffer::U8(samples.iter().map(|&s| format.clip(s) as u8).collect())
            }
            BandFormat::U16 => {
                PixelBuffer::U16(samples.iter().map(|&s| format.clip(s) as u16).collect())
            }
            BandFormat::F32 => PixelBuffer::F32(samples.to_vec()),
        }
    }

    /// Gather the samples of a `w` × `h` rectangle whose top-left pixel has
    /// index `origin`, in an image `stride` pixels wide.
    fn extract(&self, stride: usize, bands: usize, origin: usize, w: usize, h: usize) -> Self {
        let rows = (0..h).map(move |row| {
            let start = (origin + row * stride) * bands;
            start..start + w * bands
        });
        match self {
            PixelBuffer::U8(v) => PixelBuffer::U8(rows.flat_map(|r| v[r].iter().copied()).collect()),
            PixelBuffer::U16(v) => {
                PixelBuffer::U16(rows.flat_map(|r| v[r].iter().copied()).collect())
            }
            PixelBuffer::F32(v) => {
                PixelBuffer::F32(rows.flat_map(|r| v[r].iter().copied()).collect())
            }
        }
    }

    /// Reorder whole pixels: output pixel `i` is input pixel `source(i)`.
    fn remap(&self, bands: usize, count: usize, source: impl Fn(usize) -> usize) -> Self {
        fn gather<T: Copy>(
            src: &[T],
            bands: usize,
            count: usize,
            source: &dyn Fn(usize) -> usize,
        ) -> Vec<T> {
            let mut out = Vec::with_capacity(count * bands);
            for i in 0..count {
                let at = source(i) * bands;
                out.extend_from_slice(&src[at..at + bands]);
            }
            out
        }
        match self {
            PixelBuffer::U8(v) => PixelBuffer::U8(gather(v, bands, count, &source)),
            PixelBuffer::U16(v) => PixelBuffer::U16(gather(v, bands, count, &source)),
            PixelBuffer::F32(v) => PixelBuffer::F32(gather(v, bands, count, &source)),
        }
    }
}

/// A decoded raster image.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    bands: u8,
    interpretation: Interpretation,
    metadata: Metadata,
    pixels: PixelBuffer,
}

impl Image {
    /// Wrap a pixel buffer, checking the size invariants.
    pub fn new(
        width: u32,
        height: u32,
        bands: u8,
        interpretation: Interpretation,
        pixels: PixelBuffer,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidArgument(format!(
                "image dimensions must be positive, got {width}x{height}"
            )));
        }
        if !(1..=5).contains(&bands) {
            return Err(PipelineError::InvalidArgument(format!(
                "band count must be 1-5, got {bands}"
            )));
        }
        let expected = width as usize * height as usize * bands as usize;
        if pixels.len() != expected {
            return Err(PipelineError::InvalidArgument(format!(
                "{width}x{height}x{bands} image needs {expected} samples, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            bands,
            interpretation,
            metadata: Metadata::new(),
            pixels,
        })
    }

    /// Interleaved 8-bit RGBA pixels.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Self::new(width, height, 4, Interpretation::Srgb, PixelBuffer::U8(data))
    }

    /// A single opaque white RGBA pixel.
    pub fn pixel() -> Self {
        Self {
            width: 1,
            height: 1,
            bands: 4,
            interpretation: Interpretation::Srgb,
            metadata: Metadata::new(),
            pixels: PixelBuffer::U8(vec![255, 255, 255, 255]),
        }
    }

    /// Build from `f32` samples, cast to `format`. Callers guarantee the
    /// sample count.
    pub(crate) fn from_samples(
        width: u32,
        height: u32,
        bands: u8,
        interpretation: Interpretation,
        format: BandFormat,
        samples: &[f32],
        metadata: Metadata,
    ) -> Self {
        debug_assert_eq!(
            samples.len(),
            width as usize * height as usize * bands as usize
        );
        Self {
            width,
            height,
            bands,
            interpretation,
            metadata,
            pixels: PixelBuffer::from_f32(format, samples),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bands(&self) -> u8 {
        self.bands
    }

    pub fn band_format(&self) -> BandFormat {
        self.pixels.format()
    }

    pub fn interpretation(&self) -> Interpretation {
        self.interpretation
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    /// Size of the pixel data in bytes.
    pub fn byte_len(&self) -> usize {
        self.pixels.len() * self.band_format().sample_size()
    }

    /// True when the last band is alpha.
    pub fn has_alpha(&self) -> bool {
        match self.bands {
            2 => true,
            4 => self.interpretation != Interpretation::Cmyk,
            5 => true,
            _ => false,
        }
    }

    /// Number of non-alpha bands.
    pub fn colour_bands(&self) -> usize {
        self.bands as usize - usize::from(self.has_alpha())
    }

    /// Full-intensity sample value for this image's interpretation.
    pub fn max_value(&self) -> f32 {
        self.interpretation.max_value()
    }

    /// Band vector at (`x`, `y`), or `None` outside the image.
    pub fn get_point(&self, x: u32, y: u32) -> Option<Vec<f64>> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bands = self.bands as usize;
        let start = (y as usize * self.width as usize + x as usize) * bands;
        Some(
            (start..start + bands)
                .map(|i| self.pixels.sample(i) as f64)
                .collect(),
        )
    }

    /// All samples widened to `f32`, native range.
    pub(crate) fn samples_f32(&self) -> Vec<f32> {
        self.pixels.to_f32()
    }

    /// Numeric cast to another sample type, clipping to its range. Values are
    /// not rescaled, matching a plain type conversion.
    pub fn cast(&self, format: BandFormat) -> Self {
        if format == self.band_format() {
            return self.clone();
        }
        Self {
            pixels: PixelBuffer::from_f32(format, &self.pixels.to_f32()),
            ..self.clone()
        }
    }

    /// Copy out a rectangle. Callers have already bounds-checked.
    pub(crate) fn region(&self, left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bands: self.bands,
            interpretation: self.interpretation,
            metadata: self.metadata.clone(),
            pixels: self.pixels.extract(
                self.width as usize,
                self.bands as usize,
                top as usize * self.width as usize + left as usize,
                width as usize,
                height as usize,
            ),
        }
    }

    /// Rebuild with new dimensions, each output pixel taken from the input
    /// pixel index that `source` returns.
    pub(crate) fn remap(&self, width: u32, height: u32, source: impl Fn(usize) -> usize) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            bands: self.bands,
            interpretation: self.interpretation,
            metadata: self.metadata.clone(),
            pixels: self.pixels.remap(self.bands as usize, count, source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grey(width: u32, height: u32, data: Vec<u8>) -> Image {
        Image::new(width, height, 1, Interpretation::BW, PixelBuffer::U8(data)).unwrap()
    }

    #[test]
    fn new_checks_sample_count() {
        let err = Image::new(2, 2, 3, Interpretation::Srgb, PixelBuffer::U8(vec![0; 11]));
        assert!(matches!(err, Err(PipelineError::InvalidArgument(_))));
        assert!(Image::new(2, 2, 3, Interpretation::Srgb, PixelBuffer::U8(vec![0; 12])).is_ok());
    }

    #[test]
    fn new_rejects_zero_dimensions_and_bad_band_counts() {
        assert!(Image::new(0, 1, 1, Interpretation::BW, PixelBuffer::U8(vec![])).is_err());
        assert!(Image::new(1, 1, 6, Interpretation::Multiband, PixelBuffer::U8(vec![0; 6])).is_err());
    }

    #[test]
    fn byte_len_accounts_for_sample_size() {
        let img = Image::new(2, 3, 4, Interpretation::Rgb16, PixelBuffer::U16(vec![0; 24])).unwrap();
        assert_eq!(img.byte_len(), 2 * 3 * 4 * 2);
        let img = Image::new(1, 1, 3, Interpretation::Scrgb, PixelBuffer::F32(vec![0.0; 3])).unwrap();
        assert_eq!(img.byte_len(), 12);
    }

    #[test]
    fn alpha_detection_follows_band_layout() {
        assert!(!grey(1, 1, vec![0]).has_alpha());
        assert!(Image::pixel().has_alpha());
        let la = Image::new(1, 1, 2, Interpretation::BW, PixelBuffer::U8(vec![0, 0])).unwrap();
        assert!(la.has_alpha());
        let cmyk = Image::new(1, 1, 4, Interpretation::Cmyk, PixelBuffer::U8(vec![0; 4])).unwrap();
        assert!(!cmyk.has_alpha());
        assert_eq!(cmyk.colour_bands(), 4);
        let cmyka = Image::new(1, 1, 5, Interpretation::Cmyk, PixelBuffer::U8(vec![0; 5])).unwrap();
        assert!(cmyka.has_alpha());
    }

    #[test]
    fn get_point_reads_band_vector() {
        let img = Image::from_rgba8(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(img.get_point(1, 0), Some(vec![5.0, 6.0, 7.0, 8.0]));
        assert_eq!(img.get_point(2, 0), None);
    }

    #[test]
    fn cast_clips_without_rescaling() {
        let img = Image::new(1, 1, 3, Interpretation::Scrgb, PixelBuffer::F32(vec![-4.0, 127.6, 300.0]))
            .unwrap();
        let cast = img.cast(BandFormat::U8);
        assert_eq!(cast.pixels(), &PixelBuffer::U8(vec![0, 128, 255]));
        assert_eq!(cast.interpretation(), Interpretation::Scrgb);
    }

    #[test]
    fn region_copies_rows() {
        let img = grey(3, 3, (0..9).collect());
        let region = img.region(1, 1, 2, 2);
        assert_eq!(region.pixels(), &PixelBuffer::U8(vec![4, 5, 7, 8]));
    }

    #[test]
    fn default_interpretations() {
        assert_eq!(Interpretation::default_for(1, BandFormat::U8), Interpretation::BW);
        assert_eq!(Interpretation::default_for(2, BandFormat::U16), Interpretation::Grey16);
        assert_eq!(Interpretation::default_for(4, BandFormat::F32), Interpretation::Scrgb);
        assert_eq!(Interpretation::default_for(5, BandFormat::U8), Interpretation::Cmyk);
        assert_eq!(Interpretation::Rgb16.max_value(), 65535.0);
    }
}
