use banner_press::batch::{BatchDriver, CancelToken};
use banner_press::compress::AdaptiveCompressor;
use banner_press::imaging::{
    Background, CropRegion, Format, PngStrategy, RustBackend, load_source, write_atomic,
};
use banner_press::naming::compressed_output_path;
use banner_press::stitch::{CropStitchPipeline, Side, StitchInputs};
use banner_press::{config, output};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Flags shared by commands that compress images. They override the config file.
#[derive(clap::Args, Clone)]
struct CompressArgs {
    /// Size ceiling in megabytes
    #[arg(long)]
    max_mb: Option<u64>,

    /// Starting JPEG quality (1-100)
    #[arg(long)]
    quality: Option<u32>,

    /// Keep PNG/GIF sources in their format instead of converting to JPEG
    #[arg(long)]
    keep_png: bool,
}

impl CompressArgs {
    fn apply(&self, config: &mut config::ToolConfig) {
        if let Some(mb) = self.max_mb {
            config.compression.ceiling_mb = mb;
        }
        if let Some(q) = self.quality {
            config.compression.quality = q;
        }
        if self.keep_png {
            config.compression.png_strategy = PngStrategy::KeepPng;
        }
    }
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        let dirty = if env!("GIT_DIRTY") == "true" { "+dirty" } else { "" };
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}{dirty}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "banner-press")]
#[command(about = "Crop-and-stitch banners and squeeze images under a size ceiling")]
#[command(long_about = "\
Crop-and-stitch banners and squeeze images under a size ceiling

stitch    crops two images to fixed aspect ratios (2.35:1 on top, 1:1 below
          by default) and stacks them into one banner.

compress  re-encodes one image until it fits under a size ceiling: first at
          the starting quality, then at lower qualities, then at smaller sizes.

batch     does the same for every JPEG/PNG/BMP/GIF under a directory, skipping
          files that already fit.

Outputs are written next to the source as <name>_compressed_q<quality>.<ext>;
sources are never overwritten.

Run 'banner-press gen-config' to generate a documented banner-press.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: ./banner-press.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crop two images to their ratios and stack them into one banner
    Stitch {
        /// Image for the top part
        #[arg(long)]
        top: PathBuf,

        /// Crop rectangle on the top image as x1,y1,x2,y2 (default: whole image)
        #[arg(long)]
        top_region: Option<CropRegion>,

        /// Image for the bottom part
        #[arg(long)]
        bottom: PathBuf,

        /// Crop rectangle on the bottom image as x1,y1,x2,y2 (default: whole image)
        #[arg(long)]
        bottom_region: Option<CropRegion>,

        /// Canvas fill
        #[arg(long, value_enum)]
        background: Option<Background>,

        /// Output file; .png or .jpg
        #[arg(short, long, default_value = "banner.png")]
        output: PathBuf,
    },
    /// Compress one image under the size ceiling
    Compress {
        file: PathBuf,

        #[command(flatten)]
        args: CompressArgs,
    },
    /// Compress every image under a directory
    Batch {
        dir: PathBuf,

        /// Only process the top level of DIR
        #[arg(long)]
        no_recursive: bool,

        #[command(flatten)]
        args: CompressArgs,

        /// Write a JSON report of every file's outcome
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print a stock banner-press.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.clone();
    let load_config = || -> Result<config::ToolConfig, Box<dyn std::error::Error>> {
        let cwd = std::env::current_dir()?;
        Ok(config::load_config(config_path.as_deref(), &cwd)?)
    };

    match cli.command {
        Command::Stitch {
            top,
            top_region,
            bottom,
            bottom_region,
            background,
            output: output_path,
        } => {
            let tool_config = load_config()?;
            let format = stitch_output_format(&output_path)?;
            let background = background.unwrap_or(tool_config.stitch.background);
            let pipeline =
                CropStitchPipeline::new(RustBackend::new(), tool_config.stitch_settings()?);

            let mut inputs = StitchInputs::new();
            for (side, path, region) in [
                (Side::Top, &top, top_region),
                (Side::Bottom, &bottom, bottom_region),
            ] {
                let source = load_source(&RustBackend::new(), path)?;
                let (w, h) = source.raster.dimensions();
                let region = region.unwrap_or(CropRegion::full(w, h));
                let ratio = pipeline.settings().ratio_for(side);
                let crop = pipeline.commit(&source.raster, region, ratio, 1.0)?;
                inputs = inputs.with(side, crop);
            }

            let banner = pipeline.stitch(&inputs, background)?;
            let bytes = pipeline.export(&banner, format)?;
            write_atomic(&output_path, &bytes)?;
            output::print_stitch_result(&output_path, banner.dimensions(), bytes.len() as u64);
        }
        Command::Compress { file, args } => {
            let mut tool_config = load_config()?;
            args.apply(&mut tool_config);
            tool_config.validate()?;
            let spec = tool_config.compression_spec()?;

            let original_size = std::fs::metadata(&file)?.len();
            let source = load_source(&RustBackend::new(), &file)?;
            let compressor = AdaptiveCompressor::new(RustBackend::new(), tool_config.policy);
            let result = compressor.compress(&source, &spec)?;

            let output_path = compressed_output_path(&file, spec.quality, result.format);
            write_atomic(&output_path, &result.bytes)?;
            output::print_compress_result(
                &file,
                original_size,
                source.raster.dimensions(),
                &result,
                &output_path,
            );
        }
        Command::Batch {
            dir,
            no_recursive,
            args,
            report,
        } => {
            let mut tool_config = load_config()?;
            args.apply(&mut tool_config);
            tool_config.validate()?;
            let spec = tool_config.compression_spec()?;
            init_thread_pool(&tool_config.processing);

            let driver = BatchDriver::new(AdaptiveCompressor::new(
                RustBackend::new(),
                tool_config.policy,
            ));
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let cancel = CancelToken::new();
            ctrlc::set_handler(cancel.interrupt_handler())?;
            let result = driver.run(&dir, !no_recursive, &spec, &cancel, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let batch_report = result?;

            output::print_batch_summary(&batch_report.summary);
            if let Some(report_path) = report {
                let json = serde_json::to_string_pretty(&batch_report)?;
                write_atomic(&report_path, json.as_bytes())?;
                println!("Report: {}", report_path.display());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Route `tracing` output to stderr so it never interleaves with command output.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "banner_press=debug"
    } else {
        "banner_press=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the config can lower the count but not raise it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Banners are written as PNG or JPEG, chosen by the output extension.
fn stitch_output_format(path: &Path) -> Result<Format, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match Format::from_extension(ext) {
        Some(format @ (Format::Png | Format::Jpeg)) => Ok(format),
        _ => Err(format!(
            "unsupported banner extension '{}': use .png or .jpg",
            path.display()
        )),
    }
}
