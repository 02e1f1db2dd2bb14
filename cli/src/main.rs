//! pdfshrink CLI - grayscale, downsample and compress PDF files

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;

use pdfshrink::{
    CompressOptions, DownsampleOptions, DownsampleReport, Downsampler, PageSelection,
    PdfCompressor, QualityPreset, ResampleFilter, ShrinkOptions, ShrinkReport, Shrinker,
    SizingBasis,
};

#[derive(Parser)]
#[command(name = "pdfshrink")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Grayscale, downsample and compress the images of a PDF", long_about = None)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file (defaults to <FILE>_shrunk.pdf)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Quality preset for the Ghostscript pass
    #[arg(long, value_enum, default_value = "balanced")]
    preset: Preset,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Downsample images, then compress with Ghostscript
    Shrink {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to <FILE>_shrunk.pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Quality preset for the Ghostscript pass
        #[arg(long, value_enum, default_value = "balanced")]
        preset: Preset,

        #[command(flatten)]
        downsample: DownsampleArgs,

        #[command(flatten)]
        gs: GhostscriptArgs,

        /// Skip the Ghostscript pass
        #[arg(long)]
        no_gs: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Grayscale and downsample images only
    #[command(alias = "ds")]
    Downsample {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to <FILE>_gray.pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        downsample: DownsampleArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compress with Ghostscript only
    Compress {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to <FILE>_compressed.pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Quality preset
        #[arg(long, value_enum, default_value = "balanced")]
        preset: Preset,

        #[command(flatten)]
        gs: GhostscriptArgs,
    },

    /// List the images of each page with their target sizes
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Target resolution used for the size column
        #[arg(long, default_value_t = pdfshrink::downsample::DEFAULT_TARGET_DPI)]
        dpi: f32,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct DownsampleArgs {
    /// Target resolution in dots per inch
    #[arg(long, default_value_t = pdfshrink::downsample::DEFAULT_TARGET_DPI)]
    dpi: f32,

    /// Resampling filter
    #[arg(long, value_enum, default_value = "lanczos3")]
    filter: Filter,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Abort on the first image that cannot be processed
    #[arg(long)]
    strict: bool,
}

#[derive(Args)]
struct GhostscriptArgs {
    /// Ghostscript executable
    #[arg(long = "gs", value_name = "PATH", env = "PDFSHRINK_GS")]
    binary: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// Prepress settings, 300 dpi images
    HighQuality,
    /// E-book settings, 300 dpi images (default)
    Balanced,
    /// Screen settings, 150 dpi images
    MaxCompression,
}

impl From<Preset> for QualityPreset {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::HighQuality => QualityPreset::HighQuality,
            Preset::Balanced => QualityPreset::Balanced,
            Preset::MaxCompression => QualityPreset::MaxCompression,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Filter {
    /// Lanczos with a 3-lobe window (default)
    Lanczos3,
    /// Cubic Catmull-Rom
    CatmullRom,
    /// Bilinear
    Triangle,
    /// Nearest neighbor
    Nearest,
}

impl From<Filter> for ResampleFilter {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Lanczos3 => ResampleFilter::Lanczos3,
            Filter::CatmullRom => ResampleFilter::CatmullRom,
            Filter::Triangle => ResampleFilter::Triangle,
            Filter::Nearest => ResampleFilter::Nearest,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Shrink {
            input,
            output,
            preset,
            downsample,
            gs,
            no_gs,
            json,
        }) => cmd_shrink(
            &input,
            output.as_deref(),
            preset,
            &downsample,
            gs.binary,
            no_gs,
            json,
        ),
        Some(Commands::Downsample {
            input,
            output,
            downsample,
            json,
        }) => cmd_downsample(&input, output.as_deref(), &downsample, json),
        Some(Commands::Compress {
            input,
            output,
            preset,
            gs,
        }) => cmd_compress(&input, output.as_deref(), preset, gs.binary),
        Some(Commands::Info {
            input,
            dpi,
            pages,
            json,
        }) => cmd_info(&input, dpi, pages.as_deref(), json),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: full shrink if input is provided
            if let Some(input) = cli.input {
                let defaults = DownsampleArgs {
                    dpi: pdfshrink::downsample::DEFAULT_TARGET_DPI,
                    filter: Filter::Lanczos3,
                    pages: None,
                    strict: false,
                };
                let binary = std::env::var_os("PDFSHRINK_GS").map(PathBuf::from);
                cmd_shrink(
                    &input,
                    cli.output.as_deref(),
                    cli.preset,
                    &defaults,
                    binary,
                    false,
                    false,
                )
            } else {
                println!("{}", "Usage: pdfshrink <FILE> [OUTPUT]".yellow());
                println!("       pdfshrink --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn default_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{}_{}.pdf", stem, suffix))
}

fn downsample_options(args: &DownsampleArgs) -> Result<DownsampleOptions, Box<dyn std::error::Error>> {
    let mut options = DownsampleOptions::new()
        .with_dpi(args.dpi)
        .with_filter(args.filter.into());
    if let Some(p) = args.pages.as_deref() {
        options = options.with_pages(PageSelection::parse(p)?);
    }
    if args.strict {
        options = options.strict();
    }
    Ok(options)
}

fn cmd_shrink(
    input: &Path,
    output: Option<&Path>,
    preset: Preset,
    args: &DownsampleArgs,
    binary: Option<PathBuf>,
    no_gs: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(input, "shrunk"));

    let mut compress = CompressOptions::new().with_preset(preset.into());
    if let Some(binary) = binary {
        compress = compress.with_binary(binary);
    }

    let mut options = ShrinkOptions::new()
        .with_downsample(downsample_options(args)?)
        .with_compress(compress);
    if no_gs {
        options = options.without_external();
    }

    let report = Shrinker::new(options)?.shrink_file(input, &output)?;

    if json {
        println!("{}", report.to_json(true)?);
    } else {
        print_downsample_summary(&report.downsample);
        print_shrink_summary(&report);
        println!("{} {}", "Saved to".green(), output.display());
    }

    Ok(())
}

fn cmd_downsample(
    input: &Path,
    output: Option<&Path>,
    args: &DownsampleArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(input, "gray"));

    let report = Downsampler::new(downsample_options(args)?)?.process_file(input, &output)?;

    if json {
        println!("{}", report.to_json(true)?);
    } else {
        print_downsample_summary(&report);
        print_sizes(report.input_bytes, report.output_bytes, report.ratio());
        println!("{} {}", "Saved to".green(), output.display());
    }

    Ok(())
}

fn cmd_compress(
    input: &Path,
    output: Option<&Path>,
    preset: Preset,
    binary: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(input, "compressed"));
    if output == input {
        return Err("output must differ from input".into());
    }

    let mut options = CompressOptions::new().with_preset(preset.into());
    if let Some(binary) = binary {
        options = options.with_binary(binary);
    }

    let compressor = options.compressor();
    compressor.compress(input, &output, options.preset)?;

    let input_bytes = fs::metadata(input)?.len();
    let output_bytes = fs::metadata(&output)?.len();
    let ratio = (input_bytes > 0).then(|| output_bytes as f64 / input_bytes as f64);
    print_sizes(input_bytes, output_bytes, ratio);
    println!("{} {}", "Saved to".green(), output.display());

    Ok(())
}

fn cmd_info(
    input: &Path,
    dpi: f32,
    pages: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = DownsampleOptions::new().with_dpi(dpi);
    if let Some(p) = pages {
        options = options.with_pages(PageSelection::parse(p)?);
    }
    let pages = Downsampler::new(options)?.inspect_file(input)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&pages)?);
        return Ok(());
    }

    println!("{}", "Document Images".cyan().bold());
    println!("{}", "─".repeat(60).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {} dpi", "Target".bold(), dpi);

    let mut total = 0;
    let mut oversized = 0;
    for page in &pages {
        if page.is_empty() {
            continue;
        }
        println!();
        println!(
            "{} {} ({:.0} x {:.0} pt)",
            "Page".bold(),
            page.page.number,
            page.page.rect.width(),
            page.page.rect.height()
        );

        for info in &page.images {
            total += 1;
            let needs = info.needs_downsampling();
            if needs {
                oversized += 1;
            }

            let basis = match info.sizing {
                SizingBasis::Placement => "placed",
                SizingBasis::Page => "page",
            };
            let current = info
                .effective_dpi()
                .map(|d| format!("{:.0} dpi", d))
                .unwrap_or_else(|| "-".to_string());
            let line = format!(
                "  {} {}x{} -> {}x{} ({}, {}, {})",
                info.image.name,
                info.image.width,
                info.image.height,
                info.target.width,
                info.target.height,
                basis,
                current,
                info.image.color_space.as_deref().unwrap_or("?")
            );
            if needs {
                println!("{}", line.yellow());
            } else {
                println!("{}", line);
            }
        }
    }

    println!();
    println!("{}: {}", "Images".bold(), total);
    println!("{}: {}", "Above target".bold(), oversized);

    Ok(())
}

fn print_downsample_summary(report: &DownsampleReport) {
    println!("{}", "Images".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Pages".bold(), report.pages_visited);
    println!("{}: {}", "Found".bold(), report.images_seen());
    println!("{}: {}", "Replaced".bold(), report.images_replaced());
    println!("{}: {}", "Downsampled".bold(), report.images_downsampled());

    let skipped = report.images_skipped();
    if skipped > 0 {
        println!("{}: {}", "Skipped".bold(), skipped.to_string().yellow());
        for outcome in &report.images {
            if let pdfshrink::ImageStatus::Skipped { reason } = &outcome.status {
                println!(
                    "  {} page {} {}: {}",
                    "├─".dimmed(),
                    outcome.page,
                    outcome.name,
                    reason
                );
            }
        }
    }
}

fn print_shrink_summary(report: &ShrinkReport) {
    match (&report.compressor, report.preset) {
        (Some(name), Some(preset)) => {
            println!("{}: {} ({})", "Compressor".bold(), name, preset)
        }
        _ => println!("{}: {}", "Compressor".bold(), "skipped".dimmed()),
    }
    print_sizes(report.input_bytes, report.output_bytes, report.ratio());
}

fn print_sizes(input_bytes: u64, output_bytes: u64, ratio: Option<f64>) {
    let ratio = ratio
        .map(|r| format!(" ({:.1}%)", r * 100.0))
        .unwrap_or_default();
    println!(
        "{}: {} -> {}{}",
        "Size".bold(),
        human_bytes(input_bytes),
        human_bytes(output_bytes),
        ratio.green()
    );
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn cmd_version() {
    println!("{} {}", "pdfshrink".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF image downsampling and compression tool");
    println!();
    println!(
        "Ghostscript: {}",
        pdfshrink::compress::default_binary().dimmed()
    );
    println!("License: MIT");
}
