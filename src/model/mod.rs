//! Data model shared by the downsampler, the inspector and the CLI.
//!
//! Geometry is kept in PDF points throughout; pixel sizes only appear as
//! [`TargetResolution`] and in the per-image report.

mod geometry;
mod image_ref;
mod report;

pub use geometry::{
    effective_dpi, target_pixels, Matrix, Rect, TargetResolution, LETTER, POINTS_PER_INCH,
};
pub use image_ref::{ImageInfo, ImageRef, PageImages, PageInfo, SizingBasis};
pub use report::{DownsampleReport, ImageOutcome, ImageStatus, SaveMode, SkipReason};
