use clap::{Parser, Subcommand};
use imgpipe::codec::{self, DecodeOptions, EncodeOptions, RustCodec};
use imgpipe::pipeline::{self, Recipe, Watermarks};
use imgpipe::{ImageFormat, config, ops};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imgpipe")]
#[command(about = "Deterministic image post-processing")]
#[command(long_about = "\
Deterministic image post-processing

Decode an image, run an ordered list of transforms (orientation, trim,
resize, crop, watermark, filters, metadata stripping) and encode it again.

Recipe example (recipe.toml):

  output = \"webp\"

  [[steps]]
  op = \"auto_orient\"

  [[steps]]
  op = \"trim\"
  threshold = 10

  [[steps]]
  op = \"watermark\"
  image = \"logo.png\"          # relative to the recipe file
  gravity = \"bottom-right\"
  opacity = 0.4

Set RUST_LOG=debug to trace every step.
Run 'imgpipe gen-config' to generate a documented imgpipe.toml.")]
#[command(version)]
struct Cli {
    /// Engine configuration file (missing file = defaults)
    #[arg(long, default_value = "imgpipe.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Describe an image as JSON
    Info { input: PathBuf },
    /// Re-encode an image; the output format follows the file extension
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Apply the EXIF orientation before encoding
        #[arg(long)]
        auto_orient: bool,
        /// Drop all metadata except the colour profile
        #[arg(long)]
        strip: bool,
    },
    /// Run a recipe over one or more images
    Run {
        /// Recipe file
        #[arg(long)]
        recipe: PathBuf,
        /// Directory for the results
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Print a stock imgpipe.toml with all options documented
    GenConfig,
}

#[derive(Serialize)]
struct ImageInfo {
    format: ImageFormat,
    width: u32,
    height: u32,
    bands: u8,
    band_format: imgpipe::raster::BandFormat,
    interpretation: imgpipe::raster::Interpretation,
    orientation: i32,
    animated: bool,
    metadata: Vec<(String, String)>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(())
        }
        command => execute(command, &cli.config),
    }
}

/// Every command that needs the engine configuration and a codec.
fn execute(command: Command, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let engine = config::load_config(config_path)?;
    imgpipe::initialize(&engine)?;
    let codec = RustCodec::new();

    match command {
        Command::Info { input } => {
            let bytes = std::fs::read(&input)?;
            let format = ImageFormat::sniff(&bytes);
            let image = codec::decode(&codec, &bytes, format, &DecodeOptions::default())?;
            let info = ImageInfo {
                format,
                width: image.width(),
                height: image.height(),
                bands: image.bands(),
                band_format: image.band_format(),
                interpretation: image.interpretation(),
                orientation: ops::get_orientation(&image),
                animated: ops::is_animated(&image),
                metadata: image
                    .metadata()
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Convert {
            input,
            output,
            auto_orient,
            strip,
        } => {
            let bytes = std::fs::read(&input)?;
            let mut image = codec::decode_auto(&codec, &bytes, &DecodeOptions::default())?;
            if auto_orient {
                image = ops::auto_orient(&image);
            }
            if strip {
                image = ops::strip(&image);
            }
            let format = format_of(&output);
            let options = EncodeOptions::for_format(format, &engine.encode)?;
            std::fs::write(&output, codec::encode(&codec, &image, &options)?)?;
            println!("{} → {}", input.display(), output.display());
        }
        Command::Run {
            recipe,
            out_dir,
            inputs,
        } => {
            let recipe_text = std::fs::read_to_string(&recipe)?;
            let parsed = Recipe::from_toml(&recipe_text)?;
            let base = recipe.parent().unwrap_or(Path::new("."));
            let watermarks = load_watermarks(&codec, &parsed, base)?;

            let mut sources = Vec::with_capacity(inputs.len());
            for path in &inputs {
                sources.push(std::fs::read(path)?);
            }
            let results =
                pipeline::process_batch(&codec, &sources[..], &parsed, &watermarks, &engine.encode);

            std::fs::create_dir_all(&out_dir)?;
            let mut failures = 0;
            for ((path, source), result) in inputs.iter().zip(&sources).zip(results) {
                match result {
                    Ok(encoded) => {
                        let format = parsed.output.unwrap_or_else(|| {
                            parsed.input.unwrap_or_else(|| ImageFormat::sniff(source))
                        });
                        let target = output_path(&out_dir, path, format);
                        std::fs::write(&target, encoded)?;
                        println!("{} → {}", path.display(), target.display());
                    }
                    Err(e) => {
                        failures += 1;
                        eprintln!("{}: {e}", path.display());
                    }
                }
            }
            if failures > 0 {
                return Err(format!("{failures} of {} images failed", inputs.len()).into());
            }
        }
        Command::GenConfig => unreachable!("gen-config is handled before loading the config"),
    }

    Ok(())
}

/// Format implied by a path's extension.
fn format_of(path: &Path) -> ImageFormat {
    path.extension()
        .and_then(|e| e.to_str())
        .map(ImageFormat::from_extension)
        .unwrap_or_default()
}

/// `out_dir/<stem>.<ext>` for an input path and output format.
fn output_path(out_dir: &Path, input: &Path, format: ImageFormat) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    let mut target = out_dir.join(stem);
    if let Some(ext) = format.extension() {
        target.set_extension(ext);
    }
    target
}

/// Decode every watermark a recipe names, resolving paths against `base`.
fn load_watermarks(
    codec: &RustCodec,
    recipe: &Recipe,
    base: &Path,
) -> Result<Watermarks, Box<dyn std::error::Error>> {
    let mut watermarks = Watermarks::new();
    for name in recipe.watermark_names() {
        let bytes = std::fs::read(base.join(name))?;
        let image = codec::decode_auto(codec, &bytes, &DecodeOptions::default())?;
        watermarks.insert(name.to_string(), image);
    }
    Ok(watermarks)
}
