//! # imgpipe
//!
//! Deterministic, format-agnostic image post-processing. Bytes come in, a
//! decoded [`Image`](raster::Image) flows through a caller-chosen sequence of
//! transforms, and bytes go out:
//!
//! ```text
//! bytes → codec::decode → Image → ops::* (any order) → codec::encode → bytes
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`format`] | The closed set of container formats, extension parsing, magic-number sniffing |
//! | [`raster`] | The in-memory image: native-depth pixel buffer plus named metadata fields |
//! | [`codec`] | Decode/encode dispatch over the [`Codec`](codec::Codec) trait, and the pure-Rust [`RustCodec`](codec::RustCodec) |
//! | [`ops`] | Orientation, alpha, trim, resize, crop, composite, filters, metadata stripping |
//! | [`pipeline`] | TOML recipes and parallel batch processing |
//! | [`config`] | `imgpipe.toml` loading, merging and validation |
//! | [`error`] | The shared [`PipelineError`](error::PipelineError) |
//!
//! # Design Decisions
//!
//! ## Transforms Borrow, Results Are Fresh
//!
//! Every transform takes `&Image` and returns a new [`Image`](raster::Image).
//! There is no in-place mutation and no shared handle, so a failed step leaves
//! its input exactly as it was and images can move freely between threads.
//!
//! ## Native Sample Depth
//!
//! A 16-bit PNG stays 16-bit from decode to encode. Operations that need
//! floating point (resampling, blending, blur) work on normalised copies and
//! convert back to the input's sample type at the end.
//!
//! ## Codecs Behind a Trait
//!
//! The dispatcher owns the checks that must not depend on a codec (unknown
//! formats, page option normalisation); everything format-specific lives in a
//! [`Codec`](codec::Codec). Hosts with their own SVG or PDF rasteriser plug it
//! in without touching the rest of the crate, and tests use a recording mock.
//!
//! ## No I/O in the Library
//!
//! Images travel as byte slices. Reading and writing files is the binary's
//! job (and the host's, when embedded).

pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod ops;
pub mod pipeline;
pub mod raster;

pub use error::{PipelineError, Result};
pub use format::ImageFormat;
pub use raster::Image;

use std::sync::OnceLock;

static INIT: OnceLock<Result<()>> = OnceLock::new();

/// One-time process setup. Call before any other entry point.
///
/// Validates `engine`, sizes the global rayon pool from
/// `engine.processing` and logs the compiled-in decoders. Only the first
/// call does any work; later calls return its outcome.
///
/// If the host already built the global pool, that pool is kept.
pub fn initialize(engine: &config::EngineConfig) -> Result<()> {
    INIT.get_or_init(|| setup(engine)).clone()
}

fn setup(engine: &config::EngineConfig) -> Result<()> {
    engine
        .validate()
        .map_err(|e| PipelineError::InitError(e.to_string()))?;

    let threads = config::effective_threads(&engine.processing);
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        tracing::warn!(error = %e, "keeping existing worker pool");
    }

    tracing::debug!(
        threads,
        decoders = ?codec::rust_codec::DECODABLE,
        "initialized"
    );
    Ok(())
}
