//! Grayscale conversion and downsample-only resizing.

use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::TargetResolution;

/// Resampling filter used when an image is shrunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleFilter {
    /// Windowed sinc, sharpest result
    #[default]
    Lanczos3,
    CatmullRom,
    /// Bilinear
    Triangle,
    Nearest,
}

impl ResampleFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResampleFilter::Lanczos3 => "lanczos3",
            ResampleFilter::CatmullRom => "catmull-rom",
            ResampleFilter::Triangle => "triangle",
            ResampleFilter::Nearest => "nearest",
        }
    }

    fn filter_type(self) -> FilterType {
        match self {
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::Nearest => FilterType::Nearest,
        }
    }
}

impl FromStr for ResampleFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lanczos3" | "lanczos" => Ok(ResampleFilter::Lanczos3),
            "catmull-rom" | "catmullrom" | "cubic" => Ok(ResampleFilter::CatmullRom),
            "triangle" | "bilinear" | "linear" => Ok(ResampleFilter::Triangle),
            "nearest" => Ok(ResampleFilter::Nearest),
            other => Err(Error::InvalidOption(format!("unknown resample filter '{}'", other))),
        }
    }
}

impl std::fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-channel 8-bit luminance, whatever the source mode.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => other.to_luma8(),
    }
}

/// Size that fits `width` x `height` inside `target` with the aspect ratio
/// kept. Images already inside the box keep their size.
pub fn fit_within(width: u32, height: u32, target: TargetResolution) -> (u32, u32) {
    if width == 0 || height == 0 || !target.is_exceeded_by(width, height) {
        return (width, height);
    }

    let box_w = target.width.max(1);
    let box_h = target.height.max(1);
    let scale = (f64::from(box_w) / f64::from(width)).min(f64::from(box_h) / f64::from(height));

    let fit = |side: u32, limit: u32| {
        let scaled = (f64::from(side) * scale).round() as u32;
        scaled.clamp(1, limit.min(side))
    };
    (fit(width, box_w), fit(height, box_h))
}

/// Shrink `gray` to fit `target`. Never enlarges.
pub fn downsample(gray: GrayImage, target: TargetResolution, filter: ResampleFilter) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (new_w, new_h) = fit_within(width, height, target);
    if (new_w, new_h) == (width, height) {
        return gray;
    }
    imageops::resize(&gray, new_w, new_h, filter.filter_type())
}
