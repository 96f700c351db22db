//! Engine configuration.
//!
//! Handles loading, validating, and merging an `imgpipe.toml` file. Stock
//! defaults are serialised to a TOML table and the user file is merged on top,
//! so a config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [encode]
//! quality = 95              # JPEG/WEBP/TIFF/AVIF/HEIF quality (1-100)
//! compression = 6           # PNG zlib effort (0-9)
//! heif_compression = "hevc" # hevc | avc | jpeg | av1
//! interlace = true          # Progressive JPEG / interlaced PNG
//! lossless = true           # WEBP / HEIF lossless mode
//! palette = true            # PNG palette quantisation
//! strip = false             # Drop metadata on save
//!
//! [processing]
//! max_threads = 4           # Worker pool size (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::codec::HeifCompression;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Engine configuration loaded from `imgpipe.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Encoder defaults applied when a caller does not pass explicit options.
    pub encode: EncodeConfig,
    /// Worker pool settings.
    pub processing: ProcessingConfig,
}

impl EngineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.encode.quality) {
            return Err(ConfigError::Validation(
                "encode.quality must be 1-100".into(),
            ));
        }
        if self.encode.compression > 9 {
            return Err(ConfigError::Validation(
                "encode.compression must be 0-9".into(),
            ));
        }
        if self.processing.max_threads == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Encoder defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeConfig {
    pub quality: u32,
    pub compression: u8,
    pub heif_compression: HeifCompression,
    pub interlace: bool,
    pub lossless: bool,
    pub palette: bool,
    pub strip: bool,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            quality: 95,
            compression: 6,
            heif_compression: HeifCompression::Hevc,
            interlace: true,
            lossless: true,
            palette: true,
            strip: false,
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_threads: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_threads.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(EngineConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse config text, merge it over the stock defaults and validate.
pub fn parse_config(text: &str) -> Result<EngineConfig, ConfigError> {
    let overlay: toml::Value = toml::from_str(text)?;
    let merged = merge_toml(stock_defaults_value()?, overlay);
    let config: EngineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file path.
///
/// A missing file yields the stock defaults; invalid TOML, unknown keys and
/// out-of-range values are errors.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `imgpipe.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgpipe configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Encoder defaults
# ---------------------------------------------------------------------------
[encode]
# Lossy quality for JPEG, WEBP, TIFF, AVIF and HEIF (1 = worst, 100 = best).
quality = 95

# PNG zlib effort (0 = fastest, 9 = smallest).
compression = 6

# HEIF codec: "hevc", "avc", "jpeg" or "av1".
heif_compression = "hevc"

# Progressive JPEG / Adam7 PNG.
interlace = true

# Lossless WEBP and HEIF.
lossless = true

# Quantise PNG output to a palette.
palette = true

# Drop metadata (EXIF, XMP, ICC) when saving.
strip = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for batch processing.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4
"##
}
