//! What a downsampling run did, image by image.

use lopdf::ObjectId;
use serde::{Deserialize, Serialize};

use super::geometry::TargetResolution;
use super::image_ref::SizingBasis;
use crate::error::Result;

/// How the output file was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    /// At least one image was replaced and the document was re-serialized.
    Rewritten,
    /// Nothing changed; the input bytes were copied as-is.
    #[default]
    CopiedVerbatim,
}

/// Why an image was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Filter or color space we cannot turn into pixels
    Unsupported(String),
    /// Pixel data could not be decoded
    DecodeFailed(String),
    /// The processed buffer could not be encoded
    EncodeFailed(String),
    /// The new stream could not be written back into the document
    ReinsertFailed(String),
    /// Stencil masks are painted with the fill color and are left alone
    StencilMask,
    /// Already replaced while visiting an earlier page
    AlreadyProcessed,
    /// Also drawn on a page outside the selection
    SharedWithUnselectedPage,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Unsupported(what) => write!(f, "unsupported: {}", what),
            SkipReason::DecodeFailed(e) => write!(f, "decode failed: {}", e),
            SkipReason::EncodeFailed(e) => write!(f, "encode failed: {}", e),
            SkipReason::ReinsertFailed(e) => write!(f, "re-insertion failed: {}", e),
            SkipReason::StencilMask => write!(f, "stencil mask"),
            SkipReason::AlreadyProcessed => write!(f, "already processed"),
            SkipReason::SharedWithUnselectedPage => write!(f, "shared with an unselected page"),
        }
    }
}

/// Result of processing a single image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageStatus {
    Replaced {
        /// Pixel size before processing
        original: (u32, u32),
        /// Pixel size written back
        output: (u32, u32),
    },
    Skipped {
        reason: SkipReason,
    },
}

/// One entry per (page, image) visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOutcome {
    pub page: u32,
    pub object_id: ObjectId,
    pub name: String,
    pub sizing: SizingBasis,
    pub target: TargetResolution,
    #[serde(flatten)]
    pub status: ImageStatus,
}

impl ImageOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self.status, ImageStatus::Replaced { .. })
    }

    /// True when the image was made smaller, not just converted to gray.
    pub fn was_downsampled(&self) -> bool {
        matches!(self.status, ImageStatus::Replaced { original, output } if original != output)
    }
}

/// Summary of a downsampling run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownsampleReport {
    /// Pages visited (after page selection)
    pub pages_visited: u32,
    /// Per-image outcomes in visiting order
    pub images: Vec<ImageOutcome>,
    pub save_mode: SaveMode,
    /// Size of the input file in bytes
    pub input_bytes: u64,
    /// Size of the written output in bytes
    pub output_bytes: u64,
}

impl DownsampleReport {
    pub fn images_seen(&self) -> usize {
        self.images.len()
    }

    pub fn images_replaced(&self) -> usize {
        self.images.iter().filter(|o| o.is_replaced()).count()
    }

    pub fn images_downsampled(&self) -> usize {
        self.images.iter().filter(|o| o.was_downsampled()).count()
    }

    pub fn images_skipped(&self) -> usize {
        self.images_seen() - self.images_replaced()
    }

    /// Whether any image was replaced. Decides save vs. copy.
    pub fn modified(&self) -> bool {
        self.images.iter().any(ImageOutcome::is_replaced)
    }

    /// Output size relative to input, e.g. `0.25` for a 4x reduction.
    pub fn ratio(&self) -> Option<f64> {
        if self.input_bytes == 0 {
            return None;
        }
        Some(self.output_bytes as f64 / self.input_bytes as f64)
    }

    /// Render as JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: ImageStatus) -> ImageOutcome {
        ImageOutcome {
            page: 1,
            object_id: (7, 0),
            name: "Im0".to_string(),
            sizing: SizingBasis::Placement,
            target: TargetResolution::new(600, 300),
            status,
        }
    }

    #[test]
    fn test_report_counts() {
        let report = DownsampleReport {
            pages_visited: 1,
            images: vec![
                outcome(ImageStatus::Replaced {
                    original: (1200, 600),
                    output: (600, 300),
                }),
                outcome(ImageStatus::Replaced {
                    original: (100, 50),
                    output: (100, 50),
                }),
                outcome(ImageStatus::Skipped {
                    reason: SkipReason::Unsupported("JPXDecode".to_string()),
                }),
            ],
            save_mode: SaveMode::Rewritten,
            input_bytes: 1000,
            output_bytes: 250,
        };

        assert_eq!(report.images_seen(), 3);
        assert_eq!(report.images_replaced(), 2);
        assert_eq!(report.images_downsampled(), 1);
        assert_eq!(report.images_skipped(), 1);
        assert!(report.modified());
        assert_eq!(report.ratio(), Some(0.25));
    }

    #[test]
    fn test_empty_report_not_modified() {
        let report = DownsampleReport::default();
        assert!(!report.modified());
        assert_eq!(report.save_mode, SaveMode::CopiedVerbatim);
        assert_eq!(report.ratio(), None);
    }

    #[test]
    fn test_report_json() {
        let report = DownsampleReport {
            pages_visited: 1,
            images: vec![outcome(ImageStatus::Skipped {
                reason: SkipReason::DecodeFailed("short data".to_string()),
            })],
            ..Default::default()
        };

        let json = report.to_json(false).unwrap();
        assert!(json.contains("\"save_mode\":\"copied_verbatim\""));
        assert!(json.contains("\"status\":\"skipped\""));
        assert!(json.contains("\"kind\":\"decode_failed\""));
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(
            SkipReason::Unsupported("JBIG2Decode".to_string()).to_string(),
            "unsupported: JBIG2Decode"
        );
        assert_eq!(SkipReason::AlreadyProcessed.to_string(), "already processed");
        assert_eq!(
            SkipReason::SharedWithUnselectedPage.to_string(),
            "shared with an unselected page"
        );
    }
}
