//! End-to-end: real encoded bytes through decode, transforms and encode.

use imgpipe::codec::{self, DecodeOptions, EncodeOptions, RustCodec};
use imgpipe::config::{self, EncodeConfig};
use imgpipe::ops::{self, Background, Gravity};
use imgpipe::pipeline::{self, Recipe, Watermarks};
use imgpipe::raster::{BandFormat, Image, Interpretation, MetaValue, PixelBuffer, fields};
use imgpipe::{ImageFormat, PipelineError};

fn encode(image: &Image, format: ImageFormat) -> Vec<u8> {
    let options = EncodeOptions::for_format(format, &EncodeConfig::default()).unwrap();
    codec::encode(&RustCodec::new(), image, &options).unwrap()
}

fn decode(bytes: &[u8]) -> Image {
    codec::decode_auto(&RustCodec::new(), bytes, &DecodeOptions::default()).unwrap()
}

/// Transparent canvas with an opaque `colour` square.
fn sticker(size: u32, inner: u32, at: u32, colour: [u8; 3]) -> Image {
    let data = (0..size)
        .flat_map(|y| {
            (0..size).flat_map(move |x| {
                let inside = (at..at + inner).contains(&x) && (at..at + inner).contains(&y);
                if inside {
                    [colour[0], colour[1], colour[2], 255]
                } else {
                    [0, 0, 0, 0]
                }
            })
        })
        .collect();
    Image::from_rgba8(size, size, data).unwrap()
}

fn solid_rgb(width: u32, height: u32, colour: [u8; 3]) -> Image {
    let data = colour.repeat((width * height) as usize);
    Image::new(width, height, 3, Interpretation::Srgb, PixelBuffer::U8(data)).unwrap()
}

// =============================================================================
// Full pipeline
// =============================================================================

#[test]
fn trim_resize_watermark_strip_png() {
    let input = encode(&sticker(40, 20, 10, [200, 30, 30]), ImageFormat::Png);
    let logo = Image::from_rgba8(2, 2, vec![0, 0, 255, 255].repeat(4)).unwrap();
    let mut watermarks = Watermarks::new();
    watermarks.insert("logo".into(), logo);

    let recipe = Recipe::from_toml(
        r#"
        output = "png"

        [[steps]]
        op = "trim"
        threshold = 0

        [[steps]]
        op = "resize"
        scale = 0.5

        [[steps]]
        op = "watermark"
        image = "logo"
        gravity = "br"

        [[steps]]
        op = "strip"
        "#,
    )
    .unwrap();

    let out = pipeline::process(
        &RustCodec::new(),
        &input,
        &recipe,
        &watermarks,
        &EncodeConfig::default(),
    )
    .unwrap();
    assert_eq!(ImageFormat::sniff(&out), ImageFormat::Png);

    let image = decode(&out);
    assert_eq!((image.width(), image.height(), image.bands()), (10, 10, 4));
    assert_eq!(image.get_point(9, 9), Some(vec![0.0, 0.0, 255.0, 255.0]));
    let centre = image.get_point(4, 4).unwrap();
    assert!(centre[0] > 190.0 && centre[3] == 255.0, "{centre:?}");
}

#[test]
fn transparent_border_is_trimmed_but_alpha_kept() {
    let image = sticker(9, 3, 3, [10, 250, 10]);
    let out = ops::trim(&image, 0.0, Background::Smart, false, false).unwrap();
    assert_eq!((out.width(), out.height(), out.bands()), (3, 3, 4));
    assert!(out.has_alpha());
}

#[test]
fn jpeg_fill_to_thumbnail() {
    let input = encode(&solid_rgb(64, 48, [120, 120, 120]), ImageFormat::Jpeg);
    let image = decode(&input);
    let thumb = ops::fill(&image, 16, 16, Gravity::Center).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (16, 16));
    let out = encode(&thumb, ImageFormat::Webp);
    assert_eq!(ImageFormat::sniff(&out), ImageFormat::Webp);
}

#[test]
fn sixteen_bit_png_survives_pipeline() {
    let data: Vec<u16> = (0..16 * 16).map(|i| (i * 200) as u16).collect();
    let image = Image::new(16, 16, 1, Interpretation::Grey16, PixelBuffer::U16(data)).unwrap();
    let recipe = Recipe::from_toml("[[steps]]\nop = \"resize\"\nscale = 0.5\n").unwrap();
    let out = pipeline::process(
        &RustCodec::new(),
        &encode(&image, ImageFormat::Png),
        &recipe,
        &Watermarks::new(),
        &EncodeConfig::default(),
    )
    .unwrap();
    let decoded = decode(&out);
    assert_eq!(decoded.band_format(), BandFormat::U16);
    assert_eq!((decoded.width(), decoded.height()), (8, 8));
}

// =============================================================================
// Animation
// =============================================================================

#[test]
fn gif_animation_round_trips_frames() {
    // Three 4x2 frames stacked into a 4x6 image.
    let mut data = Vec::new();
    for colour in [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]] {
        for _ in 0..8 {
            data.extend(colour);
        }
    }
    let mut frames = Image::from_rgba8(4, 6, data).unwrap();
    let metadata = frames.metadata_mut();
    metadata.set(fields::PAGE_HEIGHT, MetaValue::Int(2));
    metadata.set(fields::GIF_DELAY, MetaValue::IntArray(vec![50, 50, 50]));
    metadata.set(fields::GIF_LOOP, MetaValue::Int(0));
    assert!(ops::is_animated(&frames));

    let bytes = encode(&frames, ImageFormat::Gif);
    let all = codec::decode(
        &RustCodec::new(),
        &bytes,
        ImageFormat::Gif,
        &DecodeOptions::pages(0, 3),
    )
    .unwrap();
    assert_eq!((all.width(), all.height()), (4, 6));
    assert!(ops::is_animated(&all));
    assert_eq!(all.metadata().get(fields::N_PAGES), Some(&MetaValue::Int(3)));
    assert_eq!(all.get_point(0, 4), Some(vec![0.0, 0.0, 255.0, 255.0]));

    let second = codec::decode(
        &RustCodec::new(),
        &bytes,
        ImageFormat::Gif,
        &DecodeOptions::pages(1, 1),
    )
    .unwrap();
    assert_eq!((second.width(), second.height()), (4, 2));
    assert!(!ops::is_animated(&second));
    assert_eq!(second.get_point(0, 0), Some(vec![0.0, 255.0, 0.0, 255.0]));
}

// =============================================================================
// Failure modes
// =============================================================================

#[test]
fn unknown_bytes_are_unsupported() {
    let result = codec::decode_auto(&RustCodec::new(), b"not an image", &DecodeOptions::default());
    assert_eq!(result, Err(PipelineError::UnsupportedFormat(ImageFormat::Unknown)));
}

#[test]
fn truncated_png_is_decode_failure() {
    let bytes = encode(&solid_rgb(8, 8, [1, 2, 3]), ImageFormat::Png);
    let result = codec::decode_auto(&RustCodec::new(), &bytes[..20], &DecodeOptions::default());
    assert!(matches!(result, Err(PipelineError::DecodeFailure(_))));
}

#[test]
fn pdf_loader_rejects_other_formats() {
    let bytes = encode(&solid_rgb(2, 2, [0, 0, 0]), ImageFormat::Png);
    assert_eq!(
        codec::decode_pdf_pages(&RustCodec::new(), &bytes, 0, 1),
        Err(PipelineError::FormatMismatch {
            expected: ImageFormat::Pdf,
            found: ImageFormat::Png,
        })
    );
}

#[test]
fn extract_out_of_bounds_leaves_source_intact() {
    let image = solid_rgb(10, 10, [5, 5, 5]);
    let before = image.clone();
    assert!(matches!(
        ops::extract_area(&image, 5, 0, 6, 1),
        Err(PipelineError::BoundsError { .. })
    ));
    assert_eq!(image, before);
}

#[test]
fn batch_isolates_failures() {
    let good = encode(&solid_rgb(4, 4, [9, 9, 9]), ImageFormat::Png);
    let inputs = vec![good.clone(), b"garbage".to_vec(), good];
    let results = pipeline::process_batch(
        &RustCodec::new(),
        &inputs[..],
        &Recipe::default(),
        &Watermarks::new(),
        &EncodeConfig::default(),
    );
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn config_file_drives_encoder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imgpipe.toml");
    std::fs::write(&path, "[encode]\nquality = 10\n[processing]\nmax_threads = 2\n").unwrap();

    let engine = config::load_config(&path).unwrap();
    assert_eq!(engine.encode.quality, 10);
    assert_eq!(engine.encode.compression, 6);
    imgpipe::initialize(&engine).unwrap();

    let noisy: Vec<u8> = (0..32 * 32 * 3).map(|i| (i * 7919 % 251) as u8).collect();
    let image = Image::new(32, 32, 3, Interpretation::Srgb, PixelBuffer::U8(noisy)).unwrap();
    let low = EncodeOptions::for_format(ImageFormat::Jpeg, &engine.encode).unwrap();
    let high = EncodeOptions::for_format(ImageFormat::Jpeg, &EncodeConfig::default()).unwrap();
    let codec = RustCodec::new();
    let small = codec::encode(&codec, &image, &low).unwrap();
    let large = codec::encode(&codec, &image, &high).unwrap();
    assert!(small.len() < large.len());
}

#[test]
fn missing_config_file_means_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let engine = config::load_config(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(engine, config::EngineConfig::default());
}
