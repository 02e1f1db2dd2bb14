//! # pdfshrink
//!
//! Make scanned and image-heavy PDFs smaller.
//!
//! Every raster image in the document is converted to 8-bit gray and, when
//! it carries more pixels than its on-page size needs at the target density
//! (300 DPI by default), resampled down to fit. The result can then be passed
//! through Ghostscript for a final whole-document compression pass.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfshrink::downsample_file;
//!
//! fn main() -> pdfshrink::Result<()> {
//!     let report = downsample_file("scan.pdf", "scan_gray.pdf")?;
//!     println!(
//!         "{} of {} images replaced",
//!         report.images_replaced(),
//!         report.images_seen()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Placement-aware sizing**: each image is sized from the rectangle it
//!   is drawn into, falling back to the page when that is unknown
//! - **Downsample only**: images already small enough are never enlarged
//! - **Safe by default**: images that cannot be decoded are left untouched,
//!   and a document with nothing to change is copied byte for byte
//! - **External compression**: Ghostscript presets for the final pass

pub mod compress;
pub mod detect;
pub mod downsample;
pub mod error;
pub mod imaging;
pub mod model;
pub mod parser;
pub mod pipeline;

#[cfg(feature = "ffi")]
pub mod ffi;

// Re-export commonly used types
pub use compress::{CompressOptions, GhostscriptCompressor, PdfCompressor, QualityPreset};
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf, PdfFormat};
pub use downsample::{DownsampleOptions, Downsampler, ErrorMode, PageSelection};
pub use error::{Error, Result};
pub use imaging::ResampleFilter;
pub use model::{
    target_pixels, DownsampleReport, ImageInfo, ImageOutcome, ImageRef, ImageStatus, PageImages,
    PageInfo, Rect, SaveMode, SizingBasis, SkipReason, TargetResolution,
};
pub use pipeline::{ShrinkOptions, ShrinkReport, Shrinker};

use std::path::Path;

/// Grayscale and downsample the images of a PDF file at 300 DPI.
///
/// # Arguments
///
/// * `input` - Path to the source PDF
/// * `output` - Where to write the result (overwritten if present)
///
/// # Example
///
/// ```no_run
/// use pdfshrink::downsample_file;
///
/// let report = downsample_file("in.pdf", "out.pdf").unwrap();
/// println!("modified: {}", report.modified());
/// ```
pub fn downsample_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
) -> Result<DownsampleReport> {
    downsample_file_with_options(input, output, DownsampleOptions::default())
}

/// Grayscale and downsample with custom options.
///
/// # Example
///
/// ```no_run
/// use pdfshrink::{downsample_file_with_options, DownsampleOptions, PageSelection};
///
/// let options = DownsampleOptions::new()
///     .with_dpi(150.0)
///     .with_pages(PageSelection::parse("1-3").unwrap());
/// let report = downsample_file_with_options("in.pdf", "out.pdf", options).unwrap();
/// ```
pub fn downsample_file_with_options<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    options: DownsampleOptions,
) -> Result<DownsampleReport> {
    Downsampler::new(options)?.process_file(input, output)
}

/// List the images of every page with their placement and target size at
/// 300 DPI.
pub fn inspect_file<P: AsRef<Path>>(path: P) -> Result<Vec<PageImages>> {
    inspect_file_with_options(path, DownsampleOptions::default())
}

/// List images using the DPI and page selection of `options`.
pub fn inspect_file_with_options<P: AsRef<Path>>(
    path: P,
    options: DownsampleOptions,
) -> Result<Vec<PageImages>> {
    Downsampler::new(options)?.inspect_file(path)
}

/// Downsample and then compress with Ghostscript.
///
/// # Example
///
/// ```no_run
/// use pdfshrink::{shrink_file, QualityPreset};
///
/// let report = shrink_file("in.pdf", "out.pdf", QualityPreset::Balanced).unwrap();
/// println!("{} -> {} bytes", report.input_bytes, report.output_bytes);
/// ```
pub fn shrink_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    preset: QualityPreset,
) -> Result<ShrinkReport> {
    Shrinker::new(ShrinkOptions::new().with_preset(preset))?.shrink_file(input, output)
}

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
