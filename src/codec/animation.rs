//! Multi-frame GIF.
//!
//! An animation is held as one tall image: frames stacked top to bottom, each
//! `page-height` rows high. `gif-delay` carries one delay per frame in
//! milliseconds and `gif-loop` the repeat count (0 = forever).

use super::convert;
use crate::codec::DecodeOptions;
use crate::error::{PipelineError, Result};
use crate::raster::{Image, MetaValue, fields};
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::{AnimationDecoder, Delay, DynamicImage, Frame, RgbaImage};
use std::io::Cursor;

/// Frame delay used when an animation carries no usable `gif-delay`.
pub(crate) const DEFAULT_DELAY_MS: i32 = 100;

/// Decode `page_count` frames starting at `page`.
pub(crate) fn decode_gif(bytes: &[u8], options: &DecodeOptions) -> Result<Image> {
    let failure = |e: image::ImageError| PipelineError::DecodeFailure(e.to_string());
    let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(failure)?;
    let frames = decoder.into_frames().collect_frames().map_err(failure)?;
    let total = frames.len();

    // Callers may reach the codec without going through the dispatcher.
    let options = options.normalized();
    let first = options.page as usize;
    if first >= total {
        return Err(PipelineError::DecodeFailure(format!(
            "page {first} requested but the GIF has {total} frame(s)"
        )));
    }
    let last = first.saturating_add(options.page_count as usize).min(total);
    let selected = &frames[first..last];

    let (width, page_height) = selected[0].buffer().dimensions();
    let mut data = Vec::with_capacity(selected.len() * selected[0].buffer().as_raw().len());
    let mut delays = Vec::with_capacity(selected.len());
    for frame in selected {
        if frame.buffer().dimensions() != (width, page_height) {
            return Err(PipelineError::DecodeFailure(
                "GIF frames differ in size".into(),
            ));
        }
        data.extend_from_slice(frame.buffer().as_raw());
        let (numer, denom) = frame.delay().numer_denom_ms();
        delays.push((numer / denom.max(1)) as i32);
    }

    let height = page_height * selected.len() as u32;
    let stacked = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
        PipelineError::DecodeFailure("stacked GIF frames have the wrong size".into())
    })?;
    let mut image = convert::from_dynamic(DynamicImage::ImageRgba8(stacked))?;

    let metadata = image.metadata_mut();
    metadata.set(fields::N_PAGES, MetaValue::Int(total as i32));
    if selected.len() > 1 {
        metadata.set(fields::PAGE_HEIGHT, MetaValue::Int(page_height as i32));
        metadata.set(fields::GIF_DELAY, MetaValue::IntArray(delays));
        // `image` does not expose the NETSCAPE loop count; loop forever.
        metadata.set(fields::GIF_LOOP, MetaValue::Int(0));
    }
    tracing::debug!(total, selected = selected.len(), "decoded GIF frames");
    Ok(image)
}

/// Frame height of a stacked animation, if the metadata describes one that
/// tiles the image exactly.
fn page_height(image: &Image) -> Option<u32> {
    let page_height = image.metadata().get(fields::PAGE_HEIGHT)?.as_int()?;
    let page_height = u32::try_from(page_height).ok().filter(|&h| h > 0)?;
    (page_height < image.height() && image.height() % page_height == 0).then_some(page_height)
}

/// Encode as GIF, splitting stacked frames back into an animation.
pub(crate) fn encode_gif(image: &Image) -> Result<Vec<u8>> {
    let failure = |e: image::ImageError| PipelineError::EncodeFailure(e.to_string());
    let rgba = convert::to_dynamic(image)?.to_rgba8();
    let width = rgba.width();
    let page_height = page_height(image).unwrap_or(rgba.height());
    let pages = rgba.height() / page_height;

    let delays = image
        .metadata()
        .get(fields::GIF_DELAY)
        .and_then(|v| v.as_int_array())
        .unwrap_or(&[]);
    let repeat = match image.metadata().get(fields::GIF_LOOP).and_then(|v| v.as_int()) {
        Some(n) if n > 0 => Repeat::Finite(n.min(u16::MAX as i32) as u16),
        _ => Repeat::Infinite,
    };

    let stride = (width * page_height * 4) as usize;
    let mut frames = Vec::with_capacity(pages as usize);
    for (index, chunk) in rgba.as_raw().chunks_exact(stride).enumerate() {
        let buffer = RgbaImage::from_raw(width, page_height, chunk.to_vec()).ok_or_else(|| {
            PipelineError::EncodeFailure("GIF frame has the wrong size".into())
        })?;
        let ms = delays.get(index).copied().unwrap_or(DEFAULT_DELAY_MS).max(0);
        frames.push(Frame::from_parts(
            buffer,
            0,
            0,
            Delay::from_numer_denom_ms(ms as u32, 1),
        ));
    }

    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        if pages > 1 {
            encoder.set_repeat(repeat).map_err(failure)?;
        }
        encoder.encode_frames(frames).map_err(failure)?;
    }
    tracing::debug!(pages, "encoded GIF");
    Ok(buf)
}
