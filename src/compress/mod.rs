//! External PDF-to-PDF compression.
//!
//! The downsampled document is handed to an outside tool that re-distills
//! the whole file. The tool sits behind the [`PdfCompressor`] trait;
//! [`GhostscriptCompressor`] is the implementation shipped here.
//!
//! # Example
//!
//! ```no_run
//! use pdfshrink::compress::{GhostscriptCompressor, PdfCompressor, QualityPreset};
//! use std::path::Path;
//!
//! fn main() -> pdfshrink::Result<()> {
//!     let gs = GhostscriptCompressor::new();
//!     gs.compress(Path::new("mid.pdf"), Path::new("out.pdf"), QualityPreset::Balanced)?;
//!     Ok(())
//! }
//! ```

mod ghostscript;

pub use ghostscript::{default_binary, GhostscriptCompressor};

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Named bundle of resolution and distiller settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreset {
    /// Prepress settings, images kept at 300 dpi
    HighQuality,
    /// E-book settings, images kept at 300 dpi
    #[default]
    Balanced,
    /// Screen settings, images reduced to 150 dpi
    MaxCompression,
}

impl QualityPreset {
    pub const ALL: [QualityPreset; 3] = [
        QualityPreset::HighQuality,
        QualityPreset::Balanced,
        QualityPreset::MaxCompression,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::HighQuality => "high_quality",
            QualityPreset::Balanced => "balanced",
            QualityPreset::MaxCompression => "max_compression",
        }
    }

    /// Parse a preset name, falling back to [`QualityPreset::Balanced`] for
    /// anything unknown.
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            log::warn!("unknown preset '{}', using balanced", name);
            QualityPreset::Balanced
        })
    }

    /// Image resolution the preset asks the compressor for.
    pub fn image_dpi(&self) -> u32 {
        match self {
            QualityPreset::HighQuality | QualityPreset::Balanced => 300,
            QualityPreset::MaxCompression => 150,
        }
    }

    /// Ghostscript `-dPDFSETTINGS` value.
    pub fn pdf_settings(&self) -> &'static str {
        match self {
            QualityPreset::HighQuality => "/prepress",
            QualityPreset::Balanced => "/ebook",
            QualityPreset::MaxCompression => "/screen",
        }
    }
}

impl FromStr for QualityPreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "high_quality" | "high" => Ok(QualityPreset::HighQuality),
            "balanced" => Ok(QualityPreset::Balanced),
            "max_compression" | "max" => Ok(QualityPreset::MaxCompression),
            _ => Err(Error::InvalidOption(format!(
                "unknown preset '{}' (expected high_quality, balanced or max_compression)",
                s
            ))),
        }
    }
}

impl std::fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A whole-document PDF compressor.
///
/// Implementations read `input` and write `output`; they must not modify
/// `input`.
pub trait PdfCompressor: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &str;

    /// Compress `input` into `output` using `preset`.
    fn compress(&self, input: &Path, output: &Path, preset: QualityPreset) -> Result<()>;
}

/// Options for the compression pass.
#[derive(Debug, Clone, Default)]
pub struct CompressOptions {
    /// Quality preset
    pub preset: QualityPreset,

    /// Compressor executable; the platform default when `None`
    pub binary: Option<PathBuf>,
}

impl CompressOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the quality preset.
    pub fn with_preset(mut self, preset: QualityPreset) -> Self {
        self.preset = preset;
        self
    }

    /// Use a specific compressor executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    /// Build the compressor these options describe.
    pub fn compressor(&self) -> GhostscriptCompressor {
        match &self.binary {
            Some(binary) => GhostscriptCompressor::with_binary(binary),
            None => GhostscriptCompressor::new(),
        }
    }
}
