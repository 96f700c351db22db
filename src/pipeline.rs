//! Recipes: decode, an ordered list of transforms, encode.
//!
//! A recipe is a small TOML document. Steps run in the order written, each
//! one consuming the previous step's image:
//!
//! ```toml
//! output = "webp"          # omit to keep the input format
//!
//! [[steps]]
//! op = "auto_orient"
//!
//! [[steps]]
//! op = "trim"
//! threshold = 10
//! equalize_horizontal = true
//!
//! [[steps]]
//! op = "resize"
//! scale = 0.5
//!
//! [[steps]]
//! op = "watermark"
//! image = "logo.png"
//! gravity = "bottom-right"
//! opacity = 0.4
//!
//! [[steps]]
//! op = "strip"
//! ```
//!
//! Watermark steps name their overlay; the caller decodes those images up
//! front and hands them in as [`Watermarks`]. The library never touches the
//! filesystem.
//!
//! ## Batches
//!
//! [`process_batch`] runs one job per input on the rayon pool. Jobs share the
//! codec, the recipe and the watermarks read-only and nothing else, so a
//! failing input never affects its neighbours.

use crate::codec::{self, Codec, DecodeOptions, EncodeOptions};
use crate::config::{ConfigError, EncodeConfig};
use crate::error::{PipelineError, Result};
use crate::format::ImageFormat;
use crate::ops::{self, Background, Gravity, Sharpening};
use crate::raster::{BandFormat, Image};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Decoded overlay images, keyed by the name used in watermark steps.
pub type Watermarks = HashMap<String, Image>;

fn default_trim_threshold() -> f64 {
    10.0
}

fn default_true() -> bool {
    true
}

fn full_opacity() -> f64 {
    1.0
}

fn light_sharpen_sigma() -> f32 {
    Sharpening::light().sigma
}

/// One transform in a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// Apply and clear the EXIF orientation.
    AutoOrient,
    /// Clockwise rotation by a multiple of 90°.
    Rotate { degrees: i32 },
    /// Mirror left to right.
    Flip,
    EnsureAlpha,
    /// Drop alpha onto an opaque colour, black by default.
    Flatten {
        #[serde(default)]
        background: [f64; 3],
    },
    /// Remove a uniform border. Without `background` the top-left pixel is
    /// used.
    Trim {
        #[serde(default = "default_trim_threshold")]
        threshold: f64,
        #[serde(default)]
        background: Option<[f64; 3]>,
        #[serde(default)]
        equalize_horizontal: bool,
        #[serde(default)]
        equalize_vertical: bool,
    },
    Resize {
        scale: f64,
        #[serde(default = "default_true")]
        premultiply: bool,
    },
    /// Resize to cover, then crop to exactly `width` × `height`.
    Fill {
        width: i64,
        height: i64,
        #[serde(default)]
        gravity: Gravity,
    },
    Crop {
        width: u32,
        height: u32,
        #[serde(default)]
        gravity: Gravity,
    },
    SmartCrop { width: u32, height: u32 },
    Extract {
        left: i64,
        top: i64,
        width: u32,
        height: u32,
    },
    /// Overlay a named watermark, at an explicit offset or a gravity anchor.
    Watermark {
        image: String,
        #[serde(default)]
        gravity: Gravity,
        #[serde(default = "full_opacity")]
        opacity: f64,
        #[serde(default)]
        offset: Option<(i64, i64)>,
    },
    Blur { sigma: f32 },
    /// Unsharp mask; `sigma` defaults to light sharpening.
    Sharpen {
        #[serde(default = "light_sharpen_sigma")]
        sigma: f32,
        #[serde(default)]
        threshold: f32,
    },
    Cast { format: BandFormat },
    /// Keep only the colour profile.
    Strip,
}

impl Step {
    /// Run this step on `image`.
    pub fn apply(&self, image: &Image, watermarks: &Watermarks) -> Result<Image> {
        tracing::debug!(step = ?self, "applying");
        match self {
            Step::AutoOrient => Ok(ops::auto_orient(image)),
            Step::Rotate { degrees } => Ok(ops::rotate(image, *degrees)),
            Step::Flip => Ok(ops::flip_horizontal(image)),
            Step::EnsureAlpha => Ok(ops::ensure_alpha(image)),
            Step::Flatten { background } => Ok(ops::flatten(image, background)),
            Step::Trim {
                threshold,
                background,
                equalize_horizontal,
                equalize_vertical,
            } => ops::trim(
                image,
                *threshold,
                Background::from(*background),
                *equalize_horizontal,
                *equalize_vertical,
            ),
            Step::Resize { scale, premultiply: true } => ops::resize_premultiplied(image, *scale),
            Step::Resize { scale, premultiply: false } => ops::resize(image, *scale),
            Step::Fill { width, height, gravity } => ops::fill(image, *width, *height, *gravity),
            Step::Crop { width, height, gravity } => ops::crop(image, *width, *height, *gravity),
            Step::SmartCrop { width, height } => ops::smart_crop(image, *width, *height),
            Step::Extract { left, top, width, height } => {
                ops::extract_area(image, *left, *top, *width, *height)
            }
            Step::Watermark {
                image: name,
                gravity,
                opacity,
                offset,
            } => {
                let overlay = watermarks.get(name).ok_or_else(|| {
                    PipelineError::InvalidArgument(format!("no watermark named {name:?}"))
                })?;
                match offset {
                    Some((left, top)) => ops::composite(image, overlay, *left, *top, *opacity),
                    None => ops::apply_watermark(image, overlay, *gravity, *opacity),
                }
            }
            Step::Blur { sigma } => ops::blur(image, *sigma),
            Step::Sharpen { sigma, threshold } => ops::sharpen(
                image,
                Sharpening {
                    sigma: *sigma,
                    threshold: *threshold,
                },
            ),
            Step::Cast { format } => Ok(image.cast(*format)),
            Step::Strip => Ok(ops::strip(image)),
        }
    }
}

/// A complete job description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Recipe {
    /// Declared input format. `None` sniffs the bytes.
    pub input: Option<ImageFormat>,
    /// Output format. `None` keeps the input's.
    pub output: Option<ImageFormat>,
    /// First page (or frame) to decode.
    pub page: i32,
    /// Number of pages to decode; 0 means one.
    pub page_count: i32,
    pub steps: Vec<Step>,
}

impl Recipe {
    /// Parse and validate a recipe document.
    pub fn from_toml(text: &str) -> std::result::Result<Self, ConfigError> {
        let recipe: Recipe = toml::from_str(text)?;
        recipe.validate()?;
        Ok(recipe)
    }

    /// Reject recipes that can never succeed.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if let Some(format) = self.output.filter(|f| !f.is_encodable()) {
            return Err(ConfigError::Validation(format!(
                "cannot encode {format} output"
            )));
        }
        if self.watermark_names().contains(&"") {
            return Err(ConfigError::Validation(
                "watermark step needs an image name".into(),
            ));
        }
        Ok(())
    }

    /// Names of every watermark the steps refer to, in order of first use.
    pub fn watermark_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for step in &self.steps {
            if let Step::Watermark { image, .. } = step {
                if !names.contains(&image.as_str()) {
                    names.push(image);
                }
            }
        }
        names
    }

    /// Run every step in order.
    pub fn apply(&self, image: &Image, watermarks: &Watermarks) -> Result<Image> {
        let mut current = image.clone();
        for step in &self.steps {
            current = step.apply(&current, watermarks)?;
        }
        Ok(current)
    }

    fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::pages(self.page, self.page_count)
    }
}

/// Decode `input`, run the recipe and encode the result.
pub fn process(
    codec: &impl Codec,
    input: &[u8],
    recipe: &Recipe,
    watermarks: &Watermarks,
    encode: &EncodeConfig,
) -> Result<Vec<u8>> {
    let source_format = match recipe.input {
        Some(format) => format,
        None => ImageFormat::sniff(input),
    };
    let image = codec::decode(codec, input, source_format, &recipe.decode_options())?;
    let image = recipe.apply(&image, watermarks)?;
    let options = EncodeOptions::for_format(recipe.output.unwrap_or(source_format), encode)?;
    codec::encode(codec, &image, &options)
}

/// [`process`] every input in parallel. Results keep the input order.
pub fn process_batch<B>(
    codec: &impl Codec,
    inputs: &[B],
    recipe: &Recipe,
    watermarks: &Watermarks,
    encode: &EncodeConfig,
) -> Vec<Result<Vec<u8>>>
where
    B: AsRef<[u8]> + Sync,
{
    tracing::debug!(jobs = inputs.len(), "processing batch");
    inputs
        .par_iter()
        .map(|input| process(codec, input.as_ref(), recipe, watermarks, encode))
        .collect()
}
